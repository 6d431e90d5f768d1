//! Token introspection: who a token belongs to, which scopes it carries, how
//! much rate limit is left, and whether it can see a given repository.

use anyhow::{Context, Result};
use http::StatusCode;
use serde::Deserialize;

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("issue-relay/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub user: String,
    pub scopes: Vec<String>,
    pub rate_limit: Option<RateLimit>,
}

impl TokenInfo {
    /// `repo` scope grants access to private repositories
    pub fn has_repo_scope(&self) -> bool {
        self.scopes.iter().any(|s| s == "repo")
    }

    pub fn has_public_repo_scope(&self) -> bool {
        self.scopes.iter().any(|s| s == "public_repo")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoAccess {
    Granted { private: bool },
    NotFound,
    Forbidden,
    Unexpected(u16),
}

impl std::fmt::Display for RepoAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoAccess::Granted { private: true } => write!(f, "access granted (private repository)"),
            RepoAccess::Granted { private: false } => write!(f, "access granted (public repository)"),
            RepoAccess::NotFound => write!(f, "not found, or the token cannot see it"),
            RepoAccess::Forbidden => write!(f, "access forbidden; check repository permissions"),
            RepoAccess::Unexpected(status) => write!(f, "unexpected response (HTTP {})", status),
        }
    }
}

#[derive(Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Deserialize)]
struct RateLimitResources {
    core: RateLimit,
}

#[derive(Deserialize)]
struct RepoResponse {
    #[serde(default)]
    private: bool,
}

/// Parse the comma-separated `X-OAuth-Scopes` header value
pub fn parse_scopes(header: &str) -> Vec<String> {
    header
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn get(http: &reqwest::Client, token: &str, path: &str) -> reqwest::RequestBuilder {
    http.get(format!("{}{}", GITHUB_API, path))
        .header("Authorization", format!("Bearer {}", token))
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", USER_AGENT)
}

/// Check that `token` is accepted and collect its user, scopes and rate limit.
///
/// A failing rate limit lookup is not an error; the field is left empty.
pub async fn validate_token(http: &reqwest::Client, token: &str) -> Result<TokenInfo> {
    let response = get(http, token, "/user")
        .send()
        .await
        .context("Network error while validating token")?;

    if response.status() == StatusCode::UNAUTHORIZED {
        anyhow::bail!("Token is invalid or expired");
    }
    if !response.status().is_success() {
        anyhow::bail!("GitHub API error while validating token: {}", response.status());
    }

    let scopes = response
        .headers()
        .get("x-oauth-scopes")
        .and_then(|v| v.to_str().ok())
        .map(parse_scopes)
        .unwrap_or_default();

    let user: UserResponse = response
        .json()
        .await
        .context("Failed to parse user response")?;

    let rate_limit = match get(http, token, "/rate_limit").send().await {
        Ok(resp) if resp.status().is_success() => resp
            .json::<RateLimitResponse>()
            .await
            .ok()
            .map(|r| r.resources.core),
        _ => None,
    };

    Ok(TokenInfo {
        user: user.login,
        scopes,
        rate_limit,
    })
}

/// Probe whether `token` can read `repo`.
pub async fn check_repo_access(
    http: &reqwest::Client,
    token: &str,
    repo: &str,
) -> Result<RepoAccess> {
    let response = get(http, token, &format!("/repos/{}", repo))
        .send()
        .await
        .with_context(|| format!("Network error while checking access to {}", repo))?;

    let access = match response.status() {
        StatusCode::NOT_FOUND => RepoAccess::NotFound,
        StatusCode::FORBIDDEN => RepoAccess::Forbidden,
        status if status.is_success() => {
            let body: RepoResponse = response
                .json()
                .await
                .context("Failed to parse repository response")?;
            RepoAccess::Granted {
                private: body.private,
            }
        }
        status => RepoAccess::Unexpected(status.as_u16()),
    };

    Ok(access)
}
