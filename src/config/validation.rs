use super::{AppConfig, ConfigError};

const VALID_LOG_LEVELS: &[&str] = &[
    "DEBUG", "INFO", "WARNING", "WARN", "ERROR", "CRITICAL", "TRACE", "DISABLED",
];

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_upstream_config(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.port == 0 {
        return Err(validation_err("server.port must be greater than 0"));
    }
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if server.max_request_body_bytes == 0 {
        return Err(validation_err(
            "server.max_request_body_bytes must be greater than 0",
        ));
    }
    if let Some(worker_threads) = server.runtime_worker_threads {
        if worker_threads == 0 {
            return Err(validation_err(
                "server.runtime_worker_threads must be greater than 0 when set",
            ));
        }
    }
    if server.tcp_reuse_port_listener_count == Some(0) {
        return Err(validation_err(
            "server.tcp_reuse_port_listener_count must be greater than 0 when set",
        ));
    }
    Ok(())
}

fn validate_upstream_config(config: &AppConfig) -> Result<(), ConfigError> {
    let upstream = &config.upstream;
    if upstream.base_url.trim().is_empty() {
        return Err(validation_err("upstream.base_url must not be empty"));
    }
    if url::Url::parse(&upstream.base_url).is_err() {
        return Err(validation_err(format!(
            "upstream.base_url is not a valid URL: '{}'",
            upstream.base_url
        )));
    }
    if upstream.api_version.trim().is_empty() {
        return Err(validation_err("upstream.api_version must not be empty"));
    }
    if upstream.default_model.trim().is_empty() {
        return Err(validation_err("upstream.default_model must not be empty"));
    }
    if upstream.default_embeddings_model.trim().is_empty() {
        return Err(validation_err(
            "upstream.default_embeddings_model must not be empty",
        ));
    }
    if upstream.harm_categories.iter().any(|c| c.trim().is_empty()) {
        return Err(validation_err(
            "upstream.harm_categories must not contain empty entries",
        ));
    }
    Ok(())
}

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "features.log_level must be one of {VALID_LOG_LEVELS:?}, got '{}'",
            config.features.log_level
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = AppConfig::default();
        config.upstream.base_url = "not a url".into();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("upstream.base_url"));
    }

    #[test]
    fn test_rejects_empty_default_model() {
        let mut config = AppConfig::default();
        config.upstream.default_model = "  ".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_pool_size() {
        let mut config = AppConfig::default();
        config.server.http_pool_max_idle_per_host = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_log_level_aliases_accepted() {
        let mut config = AppConfig::default();
        for level in ["warning", "CRITICAL", "disabled", "debug"] {
            config.features.log_level = level.into();
            assert!(validate_config(&config).is_ok(), "level {level}");
        }
        config.features.log_level = "verbose".into();
        assert!(validate_config(&config).is_err());
    }
}
