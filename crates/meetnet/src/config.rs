//! CLI configuration: thin wrapper around `meetnet_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--base-url, --username, etc.).

use std::time::Duration;

use meetnet_api::MeetnetClient;
use meetnet_core::CoordinatorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use meetnet_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// The profile a command runs against, with flag overrides applied.
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub name: String,
    pub profile: Profile,
    pub defaults: Defaults,
}

impl ResolvedProfile {
    /// Build an API client from the resolved profile.
    pub fn client(&self) -> Result<MeetnetClient, CliError> {
        Ok(meetnet_config::profile_to_client(
            &self.profile,
            &self.name,
            &self.defaults,
        )?)
    }

    /// Coordinator settings, with an explicit location list and interval
    /// taking priority over the profile.
    pub fn coordinator_config(
        &self,
        locations: &[String],
        interval_secs: Option<u64>,
    ) -> CoordinatorConfig {
        let mut config = meetnet_config::profile_to_coordinator_config(&self.profile, &self.defaults);
        if !locations.is_empty() {
            config.locations = normalize_locations(locations);
        }
        if let Some(secs) = interval_secs {
            config.scan_interval = Duration::from_secs(secs);
        }
        config
    }
}

/// Pick the active profile and layer the global flags on top of it.
///
/// An explicitly named profile must exist. When the implicit default is
/// missing, an empty profile is used so env-only setups still work.
pub fn resolve_profile(global: &GlobalOpts, config: &Config) -> Result<ResolvedProfile, CliError> {
    let name = active_profile_name(global, config);
    let mut profile = match config.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(config),
                name,
            });
        }
        None => Profile::default(),
    };

    if let Some(ref url) = global.base_url {
        profile.base_url = Some(url.clone());
    }
    if let Some(ref user) = global.username {
        profile.username = Some(user.clone());
    }
    if let Some(schema) = global.schema {
        profile.schema = schema.into();
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok(ResolvedProfile {
        name,
        profile,
        defaults: config.defaults.clone(),
    })
}

/// Comma-separated profile names, or a placeholder when there are none.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Split `NPT,OST` style input, trim, upper-case, and drop duplicates.
pub fn normalize_locations<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in raw
        .iter()
        .flat_map(|s| s.as_ref().split(','))
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
    {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["meetnet"];
        argv.extend_from_slice(args);
        argv.push("check");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with(name: &str, profile: Profile) -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(name.into(), profile);
        cfg
    }

    #[test]
    fn flags_override_profile_values() {
        let cfg = config_with(
            "default",
            Profile {
                username: Some("file@example.com".into()),
                base_url: Some("https://file.example".into()),
                timeout: Some(10),
                ..Profile::default()
            },
        );
        let resolved = resolve_profile(
            &global(&["--username", "flag@example.com", "--timeout", "5", "--schema", "legacy"]),
            &cfg,
        )
        .unwrap();
        assert_eq!(resolved.name, "default");
        assert_eq!(resolved.profile.username.as_deref(), Some("flag@example.com"));
        assert_eq!(resolved.profile.base_url.as_deref(), Some("https://file.example"));
        assert_eq!(resolved.profile.timeout, Some(5));
        assert_eq!(resolved.profile.schema, meetnet_api::SchemaVariant::Legacy);
    }

    #[test]
    fn explicit_missing_profile_is_an_error() {
        let cfg = config_with("home", Profile::default());
        let err = resolve_profile(&global(&["--profile", "work"]), &cfg).unwrap_err();
        assert!(
            matches!(err, CliError::ProfileNotFound { ref name, ref available } if name == "work" && available == "home")
        );
    }

    #[test]
    fn implicit_missing_default_falls_back_to_empty_profile() {
        let resolved = resolve_profile(&global(&[]), &Config::default()).unwrap();
        assert_eq!(resolved.name, "default");
        assert_eq!(resolved.profile, Profile::default());
    }

    #[test]
    fn location_flags_replace_profile_selection() {
        let cfg = config_with(
            "default",
            Profile {
                locations: vec!["NPT".into()],
                scan_interval: Some(60),
                ..Profile::default()
            },
        );
        let resolved = resolve_profile(&global(&[]), &cfg).unwrap();

        let from_profile = resolved.coordinator_config(&[], None);
        assert_eq!(from_profile.locations, ["NPT"]);
        assert_eq!(from_profile.scan_interval, Duration::from_secs(60));

        let overridden = resolved.coordinator_config(&["ost, wdl".into(), "OST".into()], Some(5));
        assert_eq!(overridden.locations, ["OST", "WDL"]);
        assert_eq!(overridden.scan_interval, Duration::from_secs(5));
    }
}
