//! Poll loop: fetch open issues, reconcile against tracked state, alert.

pub mod driver;
pub mod policy;

pub use driver::{CycleSummary, PollDriver, PollSettings, RepoOutcome, RepoReport};
pub use policy::{reconcile, Reconciliation, StalenessPolicy, DEFAULT_MAX_NEW_RATIO};

use std::future::Future;

use crate::github::{Issue, ProviderError};

/// Anything that can list a repository's open issues, newest first.
pub trait IssueSource {
    fn list_open_issues(
        &self,
        repo: &str,
        author: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Issue>, ProviderError>> + Send;
}
