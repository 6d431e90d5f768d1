//! Issue provider error types.
//!
//! GitHub failures are sorted into a closed set of kinds so the poll driver
//! can decide what to log and whether to retry by matching, never by
//! inspecting message strings.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("repository '{repo}' not found; check it exists, is accessible, and is written as owner/repo")]
    NotFound { repo: String },

    #[error("authentication failed; check the GitHub token is valid and not expired")]
    Unauthorized,

    #[error("GitHub API rate limit exceeded; wait or configure a token for higher limits")]
    RateLimited,

    #[error("access to '{repo}' is forbidden; private repositories need a token with 'repo' scope")]
    Forbidden { repo: String },

    #[error("network error while fetching issues from '{repo}': {message}")]
    Network { repo: String, message: String },

    #[error("GitHub API error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Other { status: Option<u16>, message: String },
}

impl ProviderError {
    /// Categorize an octocrab error for a request against `repo`.
    pub fn from_octocrab(repo: &str, err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. } => {
                Self::from_status(repo, source.status_code.as_u16(), &source.message)
            }
            octocrab::Error::Service { .. } | octocrab::Error::Hyper { .. } => Self::Network {
                repo: repo.to_string(),
                message: describe(&err),
            },
            _ => {
                let message = describe(&err);
                if is_network_error(&message) {
                    Self::Network {
                        repo: repo.to_string(),
                        message,
                    }
                } else {
                    Self::Other {
                        status: None,
                        message,
                    }
                }
            }
        }
    }

    /// Categorize an HTTP status and GitHub's accompanying message.
    pub fn from_status(repo: &str, status: u16, message: &str) -> Self {
        match status {
            404 => Self::NotFound {
                repo: repo.to_string(),
            },
            401 => Self::Unauthorized,
            429 => Self::RateLimited,
            403 if is_rate_limit_error(message) => Self::RateLimited,
            403 => Self::Forbidden {
                repo: repo.to_string(),
            },
            _ => Self::Other {
                status: Some(status),
                message: message.to_string(),
            },
        }
    }

    /// Request exceeded its deadline.
    pub fn timeout(repo: &str) -> Self {
        Self::Network {
            repo: repo.to_string(),
            message: "request timed out".to_string(),
        }
    }

    /// Worth retrying within the same poll cycle
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// The cause chain of an octocrab error, without the backtrace its
/// `Display` appends.
fn describe(err: &octocrab::Error) -> String {
    let mut causes = Vec::new();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }

    if causes.is_empty() {
        err.to_string().lines().next().unwrap_or_default().to_string()
    } else {
        causes.join(": ")
    }
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("timed out")
        || message_lower.contains("connect")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("hyper")
}
