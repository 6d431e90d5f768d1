use anyhow::{Context, Result};
use octocrab::Octocrab;

/// Create a GitHub client, authenticated with a personal access token when
/// one is available. Anonymous clients work for public repositories at a
/// much lower rate limit.
pub fn create_client(token: Option<&str>) -> Result<Octocrab> {
    let mut builder = Octocrab::builder();
    if let Some(token) = token {
        builder = builder.personal_token(token.to_string());
    }
    builder.build().context("Failed to create GitHub client")
}
