//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Select};
use meetnet_api::{Credentials, MeetnetClient};
use secrecy::SecretString;
use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "scan_interval = {}", cfg.defaults.scan_interval);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        let _ = writeln!(out, "locations = [{}]", quoted_list(&p.locations));
        let _ = writeln!(out, "schema = \"{}\"", p.schema);
        if let Some(ref url) = p.base_url {
            let _ = writeln!(out, "base_url = \"{url}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(interval) = p.scan_interval {
            let _ = writeln!(out, "scan_interval = {interval}");
        }
    }

    out
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Copy of the config with plaintext passwords masked, for structured output.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("****".into());
        }
    }
    cfg
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_secs(field: &str, value: &str) -> Result<u64, CliError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| CliError::Validation {
            field: field.into(),
            reason: "must be a positive number (seconds)".into(),
        })
}

/// Apply `config set <key> <value>` to a profile.
fn apply_setting(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "username" => profile.username = Some(value),
        "password_env" | "password-env" => profile.password_env = Some(value),
        "locations" => profile.locations = config::normalize_locations(&[value]),
        "schema" => {
            profile.schema = value.parse().map_err(|reason| CliError::Validation {
                field: "schema".into(),
                reason,
            })?;
        }
        "base_url" | "base-url" => {
            meetnet_api::Endpoints::new(&value).map_err(|_| CliError::Validation {
                field: "base_url".into(),
                reason: format!("invalid URL: {value}"),
            })?;
            profile.base_url = Some(value);
        }
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "timeout" => profile.timeout = Some(parse_secs("timeout", &value)?),
        "scan_interval" | "scan-interval" => {
            profile.scan_interval = Some(parse_secs("scan_interval", &value)?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: username, password_env, \
                     locations, schema, base_url, ca_cert, timeout, scan_interval"
                ),
            });
        }
    }
    Ok(())
}

/// Offer to store the password in the system keyring or return it for plaintext config.
///
/// Returns `Some(password)` if the user chose plaintext, `None` if stored in keyring.
/// Connection settings for `config init`, taken from the global flags.
fn init_profile(global: &GlobalOpts) -> Profile {
    Profile {
        base_url: global.base_url.clone(),
        schema: global.schema.map(Into::into).unwrap_or_default(),
        timeout: global.timeout,
        ..Profile::default()
    }
}

fn prompt_password_storage(profile_name: &str, password: String) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        meetnet_config::store_password(profile_name, &SecretString::from(password))?;
        eprintln!("   ✓ Password stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(password))
    }
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Locations")]
    locations: String,
}

#[derive(serde::Serialize)]
struct ProfileSummary {
    name: String,
    default: bool,
    username: Option<String>,
    locations: Vec<String>,
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("Meetnet CLI configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let username: String = Input::new()
                .with_prompt("Username (e-mail)")
                .interact_text()
                .map_err(prompt_err)?;
            let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if username.is_empty() || password.is_empty() {
                return Err(CliError::Validation {
                    field: "credentials".into(),
                    reason: "username and password cannot be empty".into(),
                });
            }

            // Validate before anything is written.
            let connection = init_profile(global);
            let client = MeetnetClient::new(
                Credentials::new(username.clone(), password.clone()),
                &meetnet_config::profile_to_transport(&connection, &config::Defaults::default()),
            )
            .with_endpoints(meetnet_config::profile_to_endpoints(&connection)?)
            .with_schema(connection.schema);
            eprintln!("   Checking credentials...");
            if !client.validate_credentials().await? {
                return Err(CliError::AuthFailed {
                    profile: profile_name,
                    message: "the API rejected these credentials".into(),
                });
            }

            let catalog = client.get_catalog(false).await?;
            client.close();
            let locations = catalog.sorted_locations();
            let labels: Vec<String> = locations
                .iter()
                .map(|l| format!("{} ({})", l.name, l.id))
                .collect();
            let picked = dialoguer::MultiSelect::new()
                .with_prompt("Locations to monitor (space to toggle)")
                .items(labels.as_slice())
                .interact()
                .map_err(prompt_err)?;
            let selected: Vec<String> = picked
                .into_iter()
                .filter_map(|i| locations.get(i).map(|l| l.id.clone()))
                .collect();

            let stored_password = prompt_password_storage(&profile_name, password)?;

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    username: Some(username),
                    password: stored_password,
                    locations: selected,
                    ..connection
                },
            );
            cfg.default_profile = Some(profile_name.clone());
            save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: meetnet sensors");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(
                &global.output,
                &redacted(&cfg),
                format_config_redacted,
                |_| "config".into(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            apply_setting(profile, &key, value)?;
            save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let active = config::active_profile_name(global, &cfg);
            let summaries: Vec<ProfileSummary> = cfg
                .profiles
                .iter()
                .map(|(name, p)| ProfileSummary {
                    default: *name == active,
                    name: name.clone(),
                    username: p.username.clone(),
                    locations: p.locations.clone(),
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &summaries,
                |s| ProfileRow {
                    name: s.name.clone(),
                    default: if s.default { "*".into() } else { String::new() },
                    username: s.username.clone().unwrap_or_default(),
                    locations: s.locations.join(", "),
                },
                |s| s.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Use <name> ──────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let password = rpassword::prompt_password(format!("Password for '{profile_name}': "))
                .map_err(prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            meetnet_config::store_password(&profile_name, &SecretString::from(password))?;
            if !global.quiet {
                eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}
