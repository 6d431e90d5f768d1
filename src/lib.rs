pub mod config;
pub mod github;
pub mod notify;
pub mod output;
pub mod poll;
pub mod shutdown;
pub mod state;
