//! Credential check handler.

use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct CheckReport {
    profile: String,
    username: String,
    base_url: String,
    valid: bool,
}

pub async fn handle(profile: &ResolvedProfile, global: &GlobalOpts) -> Result<(), CliError> {
    let client = profile.client()?;
    let valid = client.validate_credentials().await?;
    client.close();

    if !valid {
        return Err(CliError::AuthFailed {
            profile: profile.name.clone(),
            message: "the API rejected these credentials".into(),
        });
    }

    let report = CheckReport {
        profile: profile.name.clone(),
        username: client.username().to_owned(),
        base_url: client.endpoints().base_url().to_string(),
        valid,
    };
    let out = output::render_single(
        &global.output,
        &report,
        |r| format!("✓ Credentials accepted for {} at {}", r.username, r.base_url),
        |r| r.valid.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
