use crate::config::types::{Config, RefreshConfig, UpstreamConfig};
use crate::ConfigError;

/// Minimum time between refresh cycles
const MIN_INTERVAL_SECS: u64 = 60;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_upstream_config(&config.upstream)?;
    config.target_url()?;
    validate_refresh_config(&config.refresh)?;
    config.listen_addr()?;
    Ok(())
}

/// Validates upstream timeouts
fn validate_upstream_config(config: &UpstreamConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates refresh cycle settings
fn validate_refresh_config(config: &RefreshConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.interval_secs < MIN_INTERVAL_SECS {
        return Err(ConfigError::Validation(format!(
            "interval_secs must be >= {}s, got {}s",
            MIN_INTERVAL_SECS, config.interval_secs
        )));
    }

    if config.cycle_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "cycle_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}
