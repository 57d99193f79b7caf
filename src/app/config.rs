use std::path::Path;

use anyhow::Result;

use super::login::credentials_file;
use super::types::ConfigOutput;
use crate::config::Config;
use crate::duration::format_duration;

pub fn config_output(config: &Config, config_path: &Path) -> Result<ConfigOutput> {
    let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let credentials = credentials_file(config, config_dir)?;

    Ok(ConfigOutput {
        config_file: config_path.display().to_string(),
        config_file_exists: config_path.exists(),
        idp_id: config.idp_id.clone(),
        sp_id: config.sp_id.clone(),
        username: config.username.clone(),
        profile: config.profile.clone(),
        region: config.region.clone(),
        role_arn: config.role_arn.as_ref().map(ToString::to_string),
        principal_arn: config.principal_arn.as_ref().map(ToString::to_string),
        session_duration: config.session_duration.map(format_duration),
        request_timeout: format_duration(config.request_timeout),
        credentials_file: credentials.path().display().to_string(),
        password_source: config.password.as_ref().map(|p| p.build().describe()),
    })
}
