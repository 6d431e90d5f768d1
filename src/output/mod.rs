pub mod formatter;

pub use formatter::{
    format_repo_access, format_status, format_token_report, repo_statuses, should_use_colors,
    RepoStatus,
};
