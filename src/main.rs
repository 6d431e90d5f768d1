use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use issue_relay::config::{self, Config};
use issue_relay::github::{self, GithubSource};
use issue_relay::notify::TelegramNotifier;
use issue_relay::output;
use issue_relay::poll::{PollDriver, PollSettings};
use issue_relay::state::StateStore;

const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Poll continuously and relay alerts (default if no subcommand)
    Watch,
    /// Run a single poll cycle and exit (for cron or CI)
    Check,
    /// Show what the configured GitHub token can access
    Token,
    /// Print tracked issue state per repository
    Status,
}

#[derive(Parser, Debug)]
#[command(name = "issue-relay")]
#[command(about = "Relay newly opened GitHub issues to Telegram", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/issue-relay/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the notification state file
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    // rustls 0.23 needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Watch);

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match config::load_config(cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    if let Some(path) = cli.state_file {
        config.state_file = Some(path);
    }

    let code = match command {
        Commands::Status => run_status(&config),
        Commands::Token => run_token(&config).await,
        Commands::Check | Commands::Watch => {
            if let Err(errors) = config::validate_config(&config) {
                eprintln!("Configuration errors:");
                for error in errors {
                    eprintln!("  - {}", error);
                }
                std::process::exit(EXIT_CONFIG);
            }
            run_poll(&config, command == Commands::Watch).await
        }
    };

    std::process::exit(code);
}

fn run_status(config: &Config) -> i32 {
    let path = config.state_file();
    let store = StateStore::open(&path);
    let use_colors = output::should_use_colors();

    println!("State file: {}", path.display());
    println!("{}", output::format_status(store.snapshot(), use_colors));
    EXIT_SUCCESS
}

async fn run_token(config: &Config) -> i32 {
    let Some(token) = config.github_token.as_deref() else {
        eprintln!("No GitHub token configured. Set {}.", config::ENV_GITHUB_TOKEN);
        return EXIT_AUTH;
    };

    let http = reqwest::Client::new();
    let use_colors = output::should_use_colors();

    let info = match github::validate_token(&http, token).await {
        Ok(info) => info,
        Err(e) => {
            eprintln!("Token validation failed: {:#}", e);
            return EXIT_AUTH;
        }
    };
    println!("{}", output::format_token_report(&info, use_colors));

    if !config.repos.is_empty() {
        println!();
        println!("Repository access:");
    }
    for repo in &config.repos {
        match github::check_repo_access(&http, token, repo).await {
            Ok(access) => println!("  {}", output::format_repo_access(repo, &access, use_colors)),
            Err(e) => println!("  {}: {:#}", repo, e),
        }
    }

    EXIT_SUCCESS
}

/// Log the token owner and reachable repositories before the first cycle
async fn report_token(config: &Config) {
    let Some(token) = config.github_token.as_deref() else {
        tracing::warn!("GitHub authentication disabled: 60 requests/hour, public repositories only");
        return;
    };

    let http = reqwest::Client::new();
    match github::validate_token(&http, token).await {
        Ok(info) => {
            tracing::info!(user = %info.user, scopes = %info.scopes.join(","), "GitHub token valid");
            if !info.has_repo_scope() {
                tracing::warn!("Token lacks 'repo' scope, private repositories are not reachable");
            }
            if let Some(limit) = info.rate_limit {
                tracing::info!("Rate limit: {}/{} remaining", limit.remaining, limit.limit);
            }
        }
        Err(e) => {
            tracing::warn!("Token validation failed: {:#}", e);
            return;
        }
    }

    for repo in &config.repos {
        match github::check_repo_access(&http, token, repo).await {
            Ok(access) => tracing::info!(repo = %repo, "{}", access),
            Err(e) => tracing::warn!(repo = %repo, "Could not check access: {:#}", e),
        }
    }
}

async fn run_poll(config: &Config, continuous: bool) -> i32 {
    let settings = match PollSettings::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            return EXIT_CONFIG;
        }
    };

    let client = match github::create_client(config.github_token.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create GitHub client: {:#}", e);
            return EXIT_NETWORK;
        }
    };

    // validate_config guarantees both are present
    let (Some(bot_token), Some(chat_id)) = (
        config.telegram.bot_token.clone(),
        config.telegram.chat_id.clone(),
    ) else {
        return EXIT_CONFIG;
    };
    let notifier = TelegramNotifier::new(reqwest::Client::new(), bot_token, chat_id);

    let store = StateStore::open(config.state_file());
    tracing::info!(
        repos = settings.repos.len(),
        author = settings.author.as_deref().unwrap_or("(any)"),
        interval = %humantime::format_duration(settings.interval),
        state = %store.path().display(),
        "Starting issue relay"
    );

    let mut driver = PollDriver::new(GithubSource::new(client), notifier, store, settings);

    if continuous {
        report_token(config).await;
        let shutdown = issue_relay::shutdown::install_signal_handler();
        driver.run(shutdown).await;
        return EXIT_SUCCESS;
    }

    let start = Instant::now();
    let summary = driver.run_cycle().await;
    tracing::debug!("Cycle finished in {:?}", start.elapsed());

    if summary.all_failed() {
        eprintln!("All repositories failed. Check your network connection and GitHub token.");
        return EXIT_NETWORK;
    }
    EXIT_SUCCESS
}
