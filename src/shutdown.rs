//! Signal handling for the watch loop.
//!
//! The first SIGINT, SIGTERM or SIGHUP cancels the returned token so the
//! poll loop stops after its current repository. A second signal exits.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Exit status used when a second signal forces the process down
pub const FORCE_EXIT_CODE: i32 = 130;

pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let count = Arc::new(AtomicU32::new(0));

    let handler_token = token.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let signals = {
            use tokio::signal::unix::{signal, SignalKind};
            match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
                (Ok(term), Ok(hup)) => Some((term, hup)),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!("Could not register SIGTERM/SIGHUP handlers: {}", e);
                    None
                }
            }
        };
        #[cfg(unix)]
        let mut signals = signals;

        loop {
            #[cfg(unix)]
            {
                match signals.as_mut() {
                    Some((term, hup)) => {
                        tokio::select! {
                            _ = tokio::signal::ctrl_c() => {}
                            _ = term.recv() => {}
                            _ = hup.recv() => {}
                        }
                    }
                    None => {
                        if tokio::signal::ctrl_c().await.is_err() {
                            return;
                        }
                    }
                }
            }

            #[cfg(not(unix))]
            {
                if tokio::signal::ctrl_c().await.is_err() {
                    tracing::warn!("Could not listen for Ctrl+C");
                    return;
                }
            }

            if register_signal(&count, &handler_token) {
                tracing::warn!("Force exit requested");
                std::process::exit(FORCE_EXIT_CODE);
            }
        }
    });

    token
}

/// Record one signal. Cancels on the first; returns true when the process
/// should exit immediately.
fn register_signal(count: &AtomicU32, token: &CancellationToken) -> bool {
    let prev = count.fetch_add(1, Ordering::SeqCst);
    if prev == 0 {
        tracing::info!("Received shutdown signal, stopping after the current repository...");
        tracing::info!("Press Ctrl+C again to force exit");
        token.cancel();
        false
    } else {
        true
    }
}
