pub mod format;
pub mod telegram;

pub use format::{escape_html, format_issue_alert};
pub use telegram::TelegramNotifier;

use std::future::Future;
use thiserror::Error;

use crate::github::types::Issue;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to reach chat service: {0}")]
    Transport(String),

    #[error("chat service rejected the message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
}

/// Delivers one alert per call. A single attempt; callers decide what a
/// failure means.
pub trait Notifier {
    fn deliver(
        &self,
        issue: &Issue,
        repo: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}
