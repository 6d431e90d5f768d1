mod schema;
mod validation;

pub use schema::{
    Config, StalenessConfig, TelegramConfig, DEFAULT_MAX_CONSECUTIVE_ERRORS,
    DEFAULT_POLL_INTERVAL,
};
pub use validation::validate_config;

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_REPO_NAMES: &str = "REPO_NAMES";
pub const ENV_REPO_NAME: &str = "REPO_NAME";
pub const ENV_AUTHOR_NAME: &str = "AUTHOR_NAME";
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL";
pub const ENV_STATE_FILE: &str = "STATE_FILE";

/// Get the config directory path (~/.config/issue-relay/)
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config").join("issue-relay"))
        .unwrap_or_else(|| PathBuf::from(".issue-relay"))
}

/// Get the default config file path (~/.config/issue-relay/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Load configuration from a YAML file, then apply environment overrides.
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses the default path,
///   and a missing default file is treated as an empty config so that a
///   purely environment-driven deployment works.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    let mut config = if config_path.exists() {
        let config_content = fs::read_to_string(&config_path).with_context(|| {
            format!("Failed to read config file at {}", config_path.display())
        })?;

        serde_saphyr::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse config: invalid YAML in {}",
                config_path.display()
            )
        })?
    } else if explicit {
        anyhow::bail!("Config file not found at {}", config_path.display());
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Overlay environment variables onto a loaded config.
///
/// Empty values count as unset. `lookup` is injectable for tests.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(token) = get(ENV_GITHUB_TOKEN) {
        config.github_token = Some(token);
    }
    if let Some(token) = get(ENV_TELEGRAM_BOT_TOKEN) {
        config.telegram.bot_token = Some(token);
    }
    if let Some(chat_id) = get(ENV_TELEGRAM_CHAT_ID) {
        config.telegram.chat_id = Some(chat_id);
    }
    if let Some(raw) = get(ENV_REPO_NAMES).or_else(|| get(ENV_REPO_NAME)) {
        config.repos = parse_repo_list(&raw);
    }
    if let Some(author) = get(ENV_AUTHOR_NAME) {
        config.author = Some(author);
    }
    if let Some(seconds) = get(ENV_POLL_INTERVAL) {
        // Plain numbers are seconds; anything else goes through humantime
        config.poll_interval = Some(if seconds.chars().all(|c| c.is_ascii_digit()) {
            format!("{}s", seconds)
        } else {
            seconds
        });
    }
    if let Some(path) = get(ENV_STATE_FILE) {
        config.state_file = Some(PathBuf::from(path));
    }
}

/// Split a comma- or newline-separated repository list
pub fn parse_repo_list(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|repo| !repo.is_empty())
        .map(str::to_string)
        .collect()
}
