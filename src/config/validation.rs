use crate::config::types::{AuthConfig, Config, ScraperConfig, ServerConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_storage_config(&config.storage)?;
    validate_server_config(&config.server)?;
    validate_auth_config(&config.auth)?;
    Ok(())
}

/// Validates scraper configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.page_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "page_delay_ms must be <= 60000ms, got {}ms",
            config.page_delay_ms
        )));
    }

    if config.max_pages_per_category < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_category must be >= 1, got {}",
            config.max_pages_per_category
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.export_path.is_empty() {
        return Err(ConfigError::Validation(
            "export_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.host.is_empty() {
        return Err(ConfigError::Validation("host cannot be empty".to_string()));
    }

    if config.port == 0 {
        return Err(ConfigError::Validation("port must be non-zero".to_string()));
    }

    Ok(())
}

/// Validates bearer token entries
fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    for entry in &config.tokens {
        if entry.token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "auth token cannot be empty".to_string(),
            ));
        }

        if entry.token.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "auth token cannot contain whitespace".to_string(),
            ));
        }

        if entry.role.trim().is_empty() {
            return Err(ConfigError::Validation(
                "auth token role cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
