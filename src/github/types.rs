use serde::Deserialize;

use crate::state::Tracked;

#[derive(Debug, Clone)]
pub struct Issue {
    pub number: Option<u64>,    // None only for malformed provider data
    pub title: String,
    pub author: String,
    pub body: Option<String>,
    pub labels: Vec<String>,
    pub url: String,            // HTML URL for browser
}

impl Issue {
    /// Return a short reference in the format "owner/repo#123"
    pub fn short_ref(&self, repo: &str) -> String {
        match self.number {
            Some(number) => format!("{}#{}", repo, number),
            None => format!("{}#?", repo),
        }
    }
}

impl Tracked for Issue {
    fn tracked_id(&self) -> Option<u64> {
        self.number
    }
}

/// Issue as returned by the REST API, decoded leniently so one bad item
/// cannot fail a whole page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawIssue {
    number: Option<u64>,
    title: Option<String>,
    user: Option<RawUser>,
    body: Option<String>,
    labels: Vec<RawLabel>,
    html_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUser {
    login: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLabel {
    name: String,
}

impl From<RawIssue> for Issue {
    fn from(raw: RawIssue) -> Self {
        Self {
            number: raw.number,
            title: raw.title.unwrap_or_default(),
            author: raw
                .user
                .map(|user| user.login)
                .filter(|login| !login.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            body: raw.body,
            labels: raw
                .labels
                .into_iter()
                .map(|label| label.name)
                .filter(|name| !name.is_empty())
                .collect(),
            url: raw.html_url.unwrap_or_default(),
        }
    }
}
