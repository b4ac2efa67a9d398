use crate::config::types::{
    AuditConfig, CrawlerConfig, LimitsConfig, ThresholdsConfig, TimeoutsConfig,
};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &AuditConfig) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_limits_config(&config.limits)?;
    validate_timeouts_config(&config.timeouts)?;
    validate_thresholds_config(&config.thresholds)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.workers < 1 || config.workers > 32 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 32, got {}",
            config.workers
        )));
    }

    if config.crawl_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "crawl-delay-ms must be <= 60000ms, got {}ms",
            config.crawl_delay_ms
        )));
    }

    if config.max_retries > 5 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 5, got {}",
            config.max_retries
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "user-agent cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates size and budget limits
fn validate_limits_config(config: &LimitsConfig) -> Result<(), ConfigError> {
    if config.max_html_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max-html-bytes must be >= 1024, got {}",
            config.max_html_bytes
        )));
    }

    if config.max_content_text_chars < 300 {
        return Err(ConfigError::Validation(format!(
            "max-content-text-chars must be >= 300, got {}",
            config.max_content_text_chars
        )));
    }

    if config.max_sitemap_files < 1 {
        return Err(ConfigError::Validation(
            "max-sitemap-files must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates request timeouts
fn validate_timeouts_config(config: &TimeoutsConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("page-secs", config.page_secs),
        ("status-secs", config.status_secs),
        ("resource-secs", config.resource_secs),
        ("connect-secs", config.connect_secs),
    ] {
        if value == 0 || value > 300 {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and 300, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates check thresholds
fn validate_thresholds_config(config: &ThresholdsConfig) -> Result<(), ConfigError> {
    if config.title_min >= config.title_max {
        return Err(ConfigError::Validation(format!(
            "title-min ({}) must be lower than title-max ({})",
            config.title_min, config.title_max
        )));
    }

    if config.description_min >= config.description_max {
        return Err(ConfigError::Validation(format!(
            "description-min ({}) must be lower than description-max ({})",
            config.description_min, config.description_max
        )));
    }

    if !(config.ttfb_warning > 0.0 && config.ttfb_warning < config.ttfb_critical) {
        return Err(ConfigError::Validation(format!(
            "ttfb-warning ({}) must be positive and lower than ttfb-critical ({})",
            config.ttfb_warning, config.ttfb_critical
        )));
    }

    if config.very_thin_words > config.thin_words {
        return Err(ConfigError::Validation(format!(
            "very-thin-words ({}) cannot exceed thin-words ({})",
            config.very_thin_words, config.thin_words
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&AuditConfig::default()).is_ok());
        assert!(validate(&AuditConfig::constrained()).is_ok());
    }

    #[test]
    fn test_validate_workers() {
        let mut config = AuditConfig::default();
        config.crawler.workers = 0;
        assert!(validate(&config).is_err());

        config.crawler.workers = 33;
        assert!(validate(&config).is_err());

        config.crawler.workers = 32;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_max_pages() {
        let mut config = AuditConfig::default();
        config.crawler.max_pages = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_user_agent() {
        let mut config = AuditConfig::default();
        config.crawler.user_agent = "   ".to_string();
        assert!(validate(&config).is_err());

        config.crawler.user_agent = "bot\n".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_timeouts() {
        let mut config = AuditConfig::default();
        config.timeouts.status_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_thresholds() {
        let mut config = AuditConfig::default();
        config.thresholds.title_min = 80;
        assert!(validate(&config).is_err());

        let mut config = AuditConfig::default();
        config.thresholds.ttfb_warning = 4.0;
        assert!(validate(&config).is_err());

        let mut config = AuditConfig::default();
        config.thresholds.very_thin_words = 500;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_constrained_preset_is_tighter() {
        let default = AuditConfig::default();
        let constrained = AuditConfig::constrained();
        assert!(constrained.crawler.workers < default.crawler.workers);
        assert!(constrained.limits.max_html_bytes < default.limits.max_html_bytes);
        assert!(constrained.limits.max_similarity_pairs < default.limits.max_similarity_pairs);
    }
}
