pub mod client;
pub mod error;
pub mod issues;
pub mod token;
pub mod types;

pub use client::create_client;
pub use error::ProviderError;
pub use issues::{list_open_issues, GithubSource};
pub use token::{check_repo_access, validate_token, RepoAccess, TokenInfo};
pub use types::Issue;
