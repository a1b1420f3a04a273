//! Loading `AppConfig` from TOML.

use std::path::Path;

use tracing::debug;

use accredit_contracts::{
    config::AppConfig,
    error::{AccreditError, AccreditResult},
};

/// Parse `s` as an `AppConfig`. Missing sections take their defaults.
pub fn parse_config(s: &str) -> AccreditResult<AppConfig> {
    let config: AppConfig = toml::from_str(s).map_err(|e| AccreditError::Config {
        reason: format!("failed to parse config TOML: {}", e),
    })?;
    check(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> AccreditResult<AppConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| AccreditError::Config {
        reason: format!("failed to read config file '{}': {}", path.display(), e),
    })?;
    let config = parse_config(&contents)?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Reject values that parse but cannot be meant.
fn check(config: &AppConfig) -> AccreditResult<()> {
    let due = &config.due_soon;
    if !(due.ratio.is_finite() && due.ratio >= 0.0) {
        return Err(config_error(format!(
            "due_soon.ratio must be a non-negative number, got {}",
            due.ratio
        )));
    }
    if due.min_days < 0 || due.min_days > due.max_days {
        return Err(config_error(format!(
            "due_soon needs 0 <= min_days <= max_days, got {}..{}",
            due.min_days, due.max_days
        )));
    }
    if config.audit.default_page_size == 0 || config.audit.max_page_size == 0 {
        return Err(config_error("audit page sizes must be positive"));
    }
    Ok(())
}

fn config_error(reason: impl Into<String>) -> AccreditError {
    AccreditError::Config {
        reason: reason.into(),
    }
}
