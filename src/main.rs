//! token-watch: single-shot entrypoint.
//! Loads `.env` + config, performs one run and exits. Schedule it with cron
//! or a systemd timer; never start two at once against the same state files.

use std::process::ExitCode;

use token_watch::AppConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact human logs by default, JSON lines when `LOG_FORMAT=json`.
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("token_watch=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Local/dev convenience; absent file is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = ?e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match token_watch::run_from_config(&cfg).await {
        Ok(report) => {
            tracing::info!(?report, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = ?e, "run aborted, state may be incomplete");
            ExitCode::FAILURE
        }
    }
}
