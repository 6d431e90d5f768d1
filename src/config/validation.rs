use super::schema::Config;

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.repos.is_empty() {
        errors.push(
            "repos: at least one repository is required (config file, REPO_NAMES or REPO_NAME; \
             format owner/repo, comma-separated for several)"
                .to_string(),
        );
    }

    for (i, repo) in config.repos.iter().enumerate() {
        if !is_repo_slug(repo) {
            errors.push(format!(
                "repos[{}]: invalid '{}' - expected owner/repo (e.g. paradigmxyz/reth)",
                i, repo
            ));
        }
    }

    if config.telegram.bot_token.is_none() {
        errors.push("TELEGRAM_BOT_TOKEN is required".to_string());
    }

    if config.telegram.chat_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        errors.push("telegram.chat_id (or TELEGRAM_CHAT_ID) is required".to_string());
    }

    match config.poll_interval() {
        Ok(interval) if interval.is_zero() => {
            errors.push("poll_interval: must be greater than zero".to_string());
        }
        Ok(_) => {}
        Err(e) => errors.push(format!("poll_interval: {:#}", e)),
    }

    if config.max_consecutive_errors() == 0 {
        errors.push("max_consecutive_errors: must be at least 1".to_string());
    }

    let staleness = &config.staleness;
    for (name, value) in [
        ("staleness.stale_threshold", staleness.stale_threshold()),
        ("staleness.max_new_ratio", staleness.max_new_ratio()),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            errors.push(format!("{}: must be in (0, 1], got {}", name, value));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_repo_slug(repo: &str) -> bool {
    let mut parts = repo.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config {
            repos: vec!["paradigmxyz/reth".to_string()],
            ..Config::default()
        };
        config.telegram.bot_token = Some("123:abc".to_string());
        config.telegram.chat_id = Some("-100".to_string());
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_config_reports_every_missing_field() {
        let errors = validate_config(&Config::default()).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("repos:"));
        assert!(errors[1].contains("TELEGRAM_BOT_TOKEN"));
        assert!(errors[2].contains("chat_id"));
    }

    #[test]
    fn test_malformed_repo_slugs() {
        let mut config = valid_config();
        config.repos = vec![
            "good/repo".to_string(),
            "no-slash".to_string(),
            "too/many/parts".to_string(),
            "/missing-owner".to_string(),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("repos[1]"));
    }

    #[test]
    fn test_threshold_bounds() {
        let mut config = valid_config();
        config.staleness.stale_threshold = Some(0.0);
        config.staleness.max_new_ratio = Some(1.5);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("stale_threshold"));
        assert!(errors[1].contains("max_new_ratio"));
    }

    #[test]
    fn test_zero_interval_and_error_limit() {
        let mut config = valid_config();
        config.poll_interval = Some("0s".to_string());
        config.max_consecutive_errors = Some(0);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
