use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::github::{RepoAccess, TokenInfo};
use crate::state::{StateSnapshot, LEGACY_REPO_KEY};

/// One tracked repository as shown by `status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus<'a> {
    pub repo: &'a str,
    pub count: usize,
    pub lowest: Option<u64>,
    pub highest: Option<u64>,
}

/// Summarize each tracked repository, sorted by name
pub fn repo_statuses(snapshot: &StateSnapshot) -> Vec<RepoStatus<'_>> {
    let mut statuses: Vec<RepoStatus> = snapshot
        .repos
        .iter()
        .map(|(repo, ids)| RepoStatus {
            repo: repo.as_str(),
            count: ids.len(),
            lowest: ids.iter().min().copied(),
            highest: ids.iter().max().copied(),
        })
        .collect();
    statuses.sort_by(|a, b| a.repo.cmp(b.repo));
    statuses
}

/// Format tracked state as one line per repository:
/// "{repo}  {count} tracked  #{lowest}..#{highest}"
pub fn format_status(snapshot: &StateSnapshot, use_colors: bool) -> String {
    let statuses = repo_statuses(snapshot);
    if statuses.is_empty() {
        return "No repositories tracked yet.".to_string();
    }

    let name_width = statuses.iter().map(|s| s.repo.len()).max().unwrap_or(0);

    statuses
        .iter()
        .map(|status| {
            let name = format!("{:<width$}", status.repo, width = name_width);
            let count = format!("{:>5} tracked", status.count);
            let range = match (status.lowest, status.highest) {
                (Some(lo), Some(hi)) if lo == hi => format!("#{}", lo),
                (Some(lo), Some(hi)) => format!("#{}..#{}", lo, hi),
                _ => "-".to_string(),
            };
            let legacy = status.repo == LEGACY_REPO_KEY;

            if use_colors {
                let name = if legacy {
                    name.dimmed().to_string()
                } else {
                    name.cyan().to_string()
                };
                format!("{}  {}  {}", name, count.bold(), range.dimmed())
            } else {
                format!("{}  {}  {}", name, count, range)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line report of what a token can do
pub fn format_token_report(info: &TokenInfo, use_colors: bool) -> String {
    let scopes = if info.scopes.is_empty() {
        "(none, fine-grained or no scopes)".to_string()
    } else {
        info.scopes.join(", ")
    };
    let private_access = if info.has_repo_scope() {
        "yes"
    } else if info.has_public_repo_scope() {
        "no (public_repo only)"
    } else {
        "no"
    };
    let rate = match info.rate_limit {
        Some(limit) => format!("{}/{} remaining", limit.remaining, limit.limit),
        None => "unknown".to_string(),
    };

    if use_colors {
        format!(
            "Token valid for {}\n  Scopes: {}\n  Private repositories: {}\n  Rate limit: {}",
            info.user.bold().green(),
            scopes,
            private_access,
            rate
        )
    } else {
        format!(
            "Token valid for {}\n  Scopes: {}\n  Private repositories: {}\n  Rate limit: {}",
            info.user, scopes, private_access, rate
        )
    }
}

pub fn format_repo_access(repo: &str, access: &RepoAccess, use_colors: bool) -> String {
    if !use_colors {
        return format!("{}: {}", repo, access);
    }
    match access {
        RepoAccess::Granted { .. } => format!("{}: {}", repo.cyan(), access.green()),
        _ => format!("{}: {}", repo.cyan(), access.red()),
    }
}

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}
