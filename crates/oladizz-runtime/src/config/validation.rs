//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    HealthConfig, LogLevel, LogOutput, LoggingConfig, OladizzConfig, RuntimeConfig,
    TelegramConfig, ToolsConfig,
};

/// Validates the entire configuration.
pub fn validate_config(config: &OladizzConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_telegram_config(&config.telegram)?;
    validate_runtime_config(&config.runtime)?;
    validate_health_config(&config.health)?;
    validate_tools_config(&config.tools)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    for (module, level) in &logging.filters {
        if level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::validation(format!(
                "Invalid log level for '{module}': {level}. Valid values are: {:?}",
                LogLevel::NAMES
            )));
        }
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    Ok(())
}

fn validate_telegram_config(telegram: &TelegramConfig) -> ConfigResult<()> {
    if telegram.token.trim().is_empty() {
        return Err(ConfigError::missing_field("telegram.token"));
    }

    validate_url(&telegram.api_base)?;

    if telegram.poll_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Poll timeout must be greater than 0",
        ));
    }

    if telegram.request_timeout_secs <= telegram.poll_timeout_secs {
        return Err(ConfigError::validation(format!(
            "Request timeout ({}s) must exceed the poll timeout ({}s)",
            telegram.request_timeout_secs, telegram.poll_timeout_secs
        )));
    }

    Ok(())
}

fn validate_runtime_config(runtime: &RuntimeConfig) -> ConfigResult<()> {
    if runtime.task_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Background task timeout must be greater than 0",
        ));
    }

    if runtime.max_concurrent_events == 0 {
        return Err(ConfigError::validation(
            "Max concurrent events must be greater than 0",
        ));
    }

    if runtime.temp_dir.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("runtime.temp_dir"));
    }

    Ok(())
}

fn validate_health_config(health: &HealthConfig) -> ConfigResult<()> {
    if !health.enabled {
        return Ok(());
    }

    if health.port == 0 {
        return Err(ConfigError::validation(
            "Health port must be non-zero when the endpoint is enabled",
        ));
    }

    if health.host.is_empty() {
        return Err(ConfigError::missing_field("health.host"));
    }

    Ok(())
}

fn validate_tools_config(tools: &ToolsConfig) -> ConfigResult<()> {
    for (name, path) in tools.binaries() {
        if path.trim().is_empty() {
            return Err(ConfigError::missing_field(format!("tools.{name}")));
        }
    }

    for (_, url) in tools.endpoints() {
        validate_url(url)?;
    }

    if tools.http_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "HTTP timeout must be greater than 0",
        ));
    }

    if tools.gemini_model.is_empty() {
        return Err(ConfigError::missing_field("tools.gemini_model"));
    }

    Ok(())
}

/// Accepts `http://` and `https://` URLs with a host.
fn validate_url(url: &str) -> ConfigResult<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| ConfigError::invalid_url(url, "URL must start with http:// or https://"))?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(ConfigError::invalid_url(url, "URL has no host"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> OladizzConfig {
        let mut config = OladizzConfig::default();
        config.telegram.token = "123:abc".into();
        config
    }

    #[test]
    fn test_defaults_with_token_are_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = validate_config(&OladizzConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field } if field == "telegram.token"));
    }

    #[test]
    fn test_unknown_filter_level_rejected() {
        let mut config = valid();
        config
            .logging
            .filters
            .insert("oladizz_tools".into(), "loud".into());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = valid();
        config.runtime.max_concurrent_events = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.runtime.task_timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.tools.http_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_health_port_zero_only_matters_when_enabled() {
        let mut config = valid();
        config.health.port = 0;
        assert!(validate_config(&config).is_err());

        config.health.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_tool_path_rejected() {
        let mut config = valid();
        config.tools.tesseract = "  ".into();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field } if field == "tools.tesseract"));
    }

    #[test]
    fn test_poll_timeout_must_fit_request_timeout() {
        let mut config = valid();
        config.telegram.poll_timeout_secs = 60;
        config.telegram.request_timeout_secs = 60;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_url("https://api.github.com").is_ok());
        assert!(validate_url("http://localhost:8080/v1").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("https://").is_err());
    }
}
