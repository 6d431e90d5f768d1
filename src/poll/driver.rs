use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::policy::{reconcile, Reconciliation, StalenessPolicy};
use super::IssueSource;
use crate::config::{Config, DEFAULT_MAX_CONSECUTIVE_ERRORS};
use crate::github::{Issue, ProviderError};
use crate::notify::Notifier;
use crate::state::StateStore;

/// Everything the driver needs to know about what to poll and how often
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub repos: Vec<String>,
    pub author: Option<String>,
    pub interval: Duration,
    pub policy: StalenessPolicy,
    pub max_consecutive_errors: u32,
}

impl PollSettings {
    /// Build settings from a validated config
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            repos: config.repos.clone(),
            author: config.author.clone(),
            interval: config.poll_interval()?,
            policy: StalenessPolicy {
                stale_threshold: config.staleness.stale_threshold(),
                max_new_ratio: config.staleness.max_new_ratio(),
            },
            max_consecutive_errors: config.max_consecutive_errors(),
        })
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            repos: Vec::new(),
            author: None,
            interval: Duration::from_secs(900),
            policy: StalenessPolicy::default(),
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

/// What happened to one repository during a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    /// First run: existing issues adopted without alerts
    Bootstrapped { adopted: usize },
    /// Tracked state had drifted: re-adopted without alerts
    Resynced { adopted: usize },
    /// Too many issues looked new: re-adopted without alerts
    SafetyValve { new_count: usize, observed: usize },
    /// Alerts attempted for new issues
    Alerted { sent: usize, failed: usize },
    /// Nothing new
    UpToDate { checked: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReport {
    pub repo: String,
    pub outcome: RepoOutcome,
}

/// Totals for one pass over every configured repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub excluded: usize,
    pub total: usize,
}

impl CycleSummary {
    /// True when at least one repository was polled and none succeeded
    pub fn all_failed(&self) -> bool {
        self.succeeded == 0 && self.failed > 0
    }
}

/// Polls repositories sequentially and relays alerts for new issues.
///
/// Owns the state store, so every mutation happens on this one task.
pub struct PollDriver<S, N> {
    source: S,
    notifier: N,
    store: StateStore,
    settings: PollSettings,
    error_counts: HashMap<String, u32>,
}

impl<S: IssueSource, N: Notifier> PollDriver<S, N> {
    pub fn new(source: S, notifier: N, store: StateStore, settings: PollSettings) -> Self {
        Self {
            source,
            notifier,
            store,
            settings,
            error_counts: HashMap::new(),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Consecutive provider errors recorded for `repo`
    pub fn error_count(&self, repo: &str) -> u32 {
        self.error_counts.get(repo).copied().unwrap_or(0)
    }

    /// A repository is dropped from future cycles after too many consecutive errors
    pub fn is_excluded(&self, repo: &str) -> bool {
        self.error_count(repo) >= self.settings.max_consecutive_errors
    }

    /// Fetch, reconcile and alert for one repository.
    pub async fn poll_repo(&mut self, repo: &str) -> Result<RepoReport, ProviderError> {
        let issues = self
            .source
            .list_open_issues(repo, self.settings.author.as_deref())
            .await?;

        let outcome = self.apply(repo, &issues).await;
        Ok(RepoReport {
            repo: repo.to_string(),
            outcome,
        })
    }

    async fn apply(&mut self, repo: &str, issues: &[Issue]) -> RepoOutcome {
        let malformed = issues.iter().filter(|i| i.number.is_none()).count();
        if malformed > 0 {
            tracing::warn!(repo = %repo, malformed, "Skipping issues without a number");
        }

        let decision = reconcile(&self.store, repo, issues, &self.settings.policy);
        if decision.is_resync() {
            self.store.sync_with_current(repo, issues);
        }

        match decision {
            Reconciliation::Bootstrap => {
                tracing::info!(
                    repo = %repo,
                    count = issues.len(),
                    "First run, marking existing issues as notified (no alerts sent)"
                );
                RepoOutcome::Bootstrapped {
                    adopted: issues.len(),
                }
            }
            Reconciliation::Resync => {
                tracing::info!(
                    repo = %repo,
                    count = issues.len(),
                    "Stale state detected, re-syncing with current issues (no alerts sent)"
                );
                RepoOutcome::Resynced {
                    adopted: issues.len(),
                }
            }
            Reconciliation::SafetyValve { new_count } => {
                tracing::warn!(
                    repo = %repo,
                    new_count,
                    observed = issues.len(),
                    "Too many issues appear new, re-syncing state to prevent spam (no alerts sent)"
                );
                RepoOutcome::SafetyValve {
                    new_count,
                    observed: issues.len(),
                }
            }
            Reconciliation::UpToDate => {
                tracing::info!(repo = %repo, checked = issues.len(), "No new issues");
                RepoOutcome::UpToDate {
                    checked: issues.len(),
                }
            }
            Reconciliation::Alert(new_issues) => {
                tracing::info!(repo = %repo, count = new_issues.len(), "Found new issues");
                let mut sent = 0;
                let mut failed = 0;
                for issue in new_issues {
                    // reconcile only yields numbered issues
                    let Some(number) = issue.number else { continue };
                    match self.notifier.deliver(issue, repo).await {
                        Ok(()) => {
                            self.store.mark_notified(repo, number);
                            sent += 1;
                            tracing::info!("Alert sent for {}", issue.short_ref(repo));
                        }
                        Err(e) => {
                            failed += 1;
                            tracing::warn!(
                                "Failed to send alert for {}, will retry next poll: {}",
                                issue.short_ref(repo),
                                e
                            );
                        }
                    }
                }
                RepoOutcome::Alerted { sent, failed }
            }
        }
    }

    /// Poll every configured repository once, in order.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        self.cycle(&CancellationToken::new()).await
    }

    /// One cycle that stops before the next repository once `shutdown` fires.
    /// A repository already being polled always finishes, so a delivered
    /// alert is recorded before the cycle returns.
    async fn cycle(&mut self, shutdown: &CancellationToken) -> CycleSummary {
        let repos = self.settings.repos.clone();
        let mut summary = CycleSummary {
            total: repos.len(),
            ..CycleSummary::default()
        };

        for repo in &repos {
            if shutdown.is_cancelled() {
                tracing::info!("Shutdown requested, skipping remaining repositories");
                break;
            }
            if self.is_excluded(repo) {
                summary.excluded += 1;
                continue;
            }

            match self.poll_repo(repo).await {
                Ok(report) => {
                    self.error_counts.remove(repo);
                    summary.succeeded += 1;
                    if let RepoOutcome::Alerted { sent, failed } = report.outcome {
                        summary.alerts_sent += sent;
                        summary.alerts_failed += failed;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    let count = self.error_counts.entry(repo.clone()).or_insert(0);
                    *count += 1;
                    let count = *count;
                    let max = self.settings.max_consecutive_errors;

                    match &e {
                        ProviderError::Unauthorized
                        | ProviderError::Forbidden { .. }
                        | ProviderError::NotFound { .. } => {
                            tracing::error!(repo = %repo, "GitHub API error: {}", e)
                        }
                        ProviderError::RateLimited
                        | ProviderError::Network { .. }
                        | ProviderError::Other { .. } => {
                            tracing::warn!(repo = %repo, "GitHub API error: {}", e)
                        }
                    }

                    if count < max {
                        tracing::info!(repo = %repo, "Will retry on next poll (error {}/{})", count, max);
                    } else {
                        tracing::warn!(repo = %repo, "Too many consecutive errors, skipping in future checks");
                    }
                }
            }
        }

        if summary.alerts_sent > 0 {
            tracing::info!(
                "Summary: {} new issue(s) alerted across {}/{} repositories",
                summary.alerts_sent,
                summary.succeeded,
                summary.total
            );
        } else {
            tracing::info!(
                "Summary: no new issues across {}/{} repositories",
                summary.succeeded,
                summary.total
            );
        }

        summary
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// Only the wait between cycles is interrupted. A cycle in progress
    /// finishes its current repository first.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        let interval = self.settings.interval;
        loop {
            let summary = self.cycle(&shutdown).await;
            if shutdown.is_cancelled() {
                tracing::info!("Monitoring stopped");
                break;
            }

            if summary.excluded == summary.total && summary.total > 0 {
                tracing::error!("Every repository has been excluded after repeated errors");
            } else if summary.all_failed() {
                tracing::warn!("All repositories are failing, retrying after the poll interval");
            }

            tracing::info!("Next check in {}", humantime::format_duration(interval));
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("Monitoring stopped");
                    break;
                }
            }
        }
    }
}
