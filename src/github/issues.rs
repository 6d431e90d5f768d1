use octocrab::{Octocrab, Page};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};

use crate::github::error::ProviderError;
use crate::github::types::{Issue, RawIssue};

const PER_PAGE: u8 = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry strategy for transient failures: exponential backoff with 3 attempts
fn retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(100)
        .max_delay(Duration::from_secs(5))
        .take(3)
}

/// Run one GitHub request under the request timeout, classifying failures
async fn request<T, F>(repo: &str, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = octocrab::Result<T>>,
{
    match tokio::time::timeout(REQUEST_TIMEOUT, fut).await {
        Ok(result) => result.map_err(|e| ProviderError::from_octocrab(repo, e)),
        Err(_) => Err(ProviderError::timeout(repo)),
    }
}

#[derive(Serialize)]
struct ListIssues<'a> {
    state: &'a str,
    sort: &'a str,
    direction: &'a str,
    per_page: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    creator: Option<&'a str>,
}

async fn fetch_first_page(
    client: &Octocrab,
    route: &str,
    repo: &str,
    author: Option<&str>,
) -> Result<Page<RawIssue>, ProviderError> {
    let params = ListIssues {
        state: "open",
        sort: "created",
        direction: "desc",
        per_page: PER_PAGE,
        creator: author,
    };

    request(repo, client.get(route, Some(&params))).await
}

/// List every open issue in `repo` (format "owner/name"), newest first.
///
/// Follows pagination links until exhausted. Items are decoded leniently; an
/// item without a number comes back with `number: None` for the caller to skip. When `author` is set only issues
/// opened by that user are returned. Network failures are retried with
/// backoff; every other failure is returned immediately.
pub async fn list_open_issues(
    client: &Octocrab,
    repo: &str,
    author: Option<&str>,
) -> Result<Vec<Issue>, ProviderError> {
    let (owner, name) = repo.split_once('/').ok_or_else(|| ProviderError::NotFound {
        repo: repo.to_string(),
    })?;
    let route = format!("/repos/{}/{}/issues", owner, name);

    let mut page = RetryIf::spawn(
        retry_strategy(),
        || fetch_first_page(client, &route, repo, author),
        ProviderError::is_transient,
    )
    .await?;

    let mut issues = Vec::new();
    let mut pages = 1;
    loop {
        let Page { items, next, .. } = page;
        issues.extend(items.into_iter().map(Issue::from));

        if next.is_none() {
            break;
        }

        page = match RetryIf::spawn(
            retry_strategy(),
            || request(repo, client.get_page::<RawIssue>(&next)),
            ProviderError::is_transient,
        )
        .await?
        {
            Some(page) => page,
            None => break,
        };
        pages += 1;
    }

    tracing::debug!(repo = %repo, pages, count = issues.len(), "Listed open issues");

    Ok(issues)
}

/// Production [`IssueSource`](crate::poll::IssueSource) backed by the GitHub REST API
#[derive(Clone)]
pub struct GithubSource {
    client: Octocrab,
}

impl GithubSource {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

impl crate::poll::IssueSource for GithubSource {
    async fn list_open_issues(
        &self,
        repo: &str,
        author: Option<&str>,
    ) -> Result<Vec<Issue>, ProviderError> {
        list_open_issues(&self.client, repo, author).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    type Route = fn(&str, &str) -> (&'static str, String, String);

    /// Answer every request on a local port with `route(base, path)`,
    /// recording request paths.
    async fn serve(route: Route) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let server_base = base.clone();
        let server_seen = seen.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                server_seen.lock().unwrap().push(path.clone());

                let (status, headers, body) = route(&server_base, &path);
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n{}\r\n{}",
                    status,
                    body.len(),
                    headers,
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (base, seen)
    }

    fn client(base: &str) -> Octocrab {
        let _ = rustls::crypto::ring::default_provider().install_default();
        Octocrab::builder()
            .base_uri(base)
            .unwrap()
            .build()
            .unwrap()
    }

    fn issue_json(number: u64) -> String {
        format!(
            r#"{{"number":{n},"title":"Issue {n}","user":{{"login":"octocat"}},"labels":[],"html_url":"https://github.com/owner/repo/issues/{n}"}}"#,
            n = number
        )
    }

    #[tokio::test]
    async fn lists_issues_across_pages() {
        let (base, seen) = serve(|base, path| {
            if path.contains("page=2") {
                ("200 OK", String::new(), format!("[{}]", issue_json(1)))
            } else {
                let link = format!(
                    "link: <{}/repos/owner/repo/issues?page=2>; rel=\"next\"\r\n",
                    base
                );
                ("200 OK", link, format!("[{},{}]", issue_json(3), issue_json(2)))
            }
        })
        .await;

        let issues = list_open_issues(&client(&base), "owner/repo", Some("octocat"))
            .await
            .unwrap();

        let numbers: Vec<Option<u64>> = issues.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![Some(3), Some(2), Some(1)]);

        let seen = seen.lock().unwrap();
        assert!(seen[0].starts_with("/repos/owner/repo/issues?"));
        assert!(seen[0].contains("state=open"));
        assert!(seen[0].contains("sort=created"));
        assert!(seen[0].contains("direction=desc"));
        assert!(seen[0].contains("per_page=100"));
        assert!(seen[0].contains("creator=octocat"));
    }

    #[tokio::test]
    async fn item_without_number_does_not_fail_the_page() {
        let (base, _) = serve(|_, _| {
            (
                "200 OK",
                String::new(),
                format!(r#"[{},{{"title":"broken"}}]"#, issue_json(5)),
            )
        })
        .await;

        let issues = list_open_issues(&client(&base), "owner/repo", None)
            .await
            .unwrap();

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].number, Some(5));
        assert_eq!(issues[1].number, None);
    }

    #[tokio::test]
    async fn missing_repository_is_not_found() {
        let (base, seen) = serve(|_, _| {
            (
                "404 Not Found",
                String::new(),
                r#"{"message":"Not Found","documentation_url":"https://docs.github.com/rest"}"#
                    .to_string(),
            )
        })
        .await;

        let err = list_open_issues(&client(&base), "owner/gone", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NotFound { ref repo } if repo == "owner/gone"));
        // Not transient, so no backoff retries
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let (base, _) = serve(|_, _| {
            (
                "401 Unauthorized",
                String::new(),
                r#"{"message":"Bad credentials"}"#.to_string(),
            )
        })
        .await;

        let err = list_open_issues(&client(&base), "owner/repo", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized));
    }

    #[tokio::test]
    async fn forbidden_rate_limit_message_is_rate_limited() {
        let (base, _) = serve(|_, _| {
            (
                "403 Forbidden",
                String::new(),
                r#"{"message":"API rate limit exceeded for 127.0.0.1."}"#.to_string(),
            )
        })
        .await;

        let err = list_open_issues(&client(&base), "owner/repo", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited));
    }

    #[tokio::test]
    async fn malformed_repo_slug_is_not_found() {
        let err = list_open_issues(&client("http://127.0.0.1:9"), "no-slash", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }
}
