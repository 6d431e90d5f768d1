use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::poll::DEFAULT_MAX_NEW_RATIO;
use crate::state::DEFAULT_STALE_THRESHOLD;

pub const DEFAULT_POLL_INTERVAL: &str = "15m";
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 10;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Repositories to watch, as `owner/name`
    #[serde(default)]
    pub repos: Vec<String>,
    /// Only alert on issues opened by this GitHub user
    pub author: Option<String>,
    /// Time between poll cycles, e.g. "15m" or "90s"
    pub poll_interval: Option<String>,
    pub state_file: Option<PathBuf>,
    pub max_consecutive_errors: Option<u32>,
    #[serde(default)]
    pub staleness: StalenessConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Secrets are only read from the environment
    #[serde(skip)]
    pub github_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StalenessConfig {
    /// Resync when fewer than this share of tracked issues are still open
    pub stale_threshold: Option<f64>,
    /// Resync instead of alerting when more than this share of open issues look new
    pub max_new_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub chat_id: Option<String>,
    #[serde(skip)]
    pub bot_token: Option<String>,
}

impl Config {
    pub fn poll_interval(&self) -> Result<Duration> {
        let raw = self.poll_interval.as_deref().unwrap_or(DEFAULT_POLL_INTERVAL);
        humantime::parse_duration(raw.trim())
            .with_context(|| format!("Invalid poll interval '{}'", raw))
    }

    pub fn max_consecutive_errors(&self) -> u32 {
        self.max_consecutive_errors
            .unwrap_or(DEFAULT_MAX_CONSECUTIVE_ERRORS)
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(crate::state::get_state_path)
    }
}

impl StalenessConfig {
    pub fn stale_threshold(&self) -> f64 {
        self.stale_threshold.unwrap_or(DEFAULT_STALE_THRESHOLD)
    }

    pub fn max_new_ratio(&self) -> f64 {
        self.max_new_ratio.unwrap_or(DEFAULT_MAX_NEW_RATIO)
    }
}
