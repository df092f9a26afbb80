//! SQLInsight - Main entry point.
//!
//! Interactive terminal chat that answers questions about a SQL database.

use sql_insight::config::Config;
use sql_insight::llm::CompletionClient;
use sql_insight::session::repl::{ExitReason, shutdown_signal};
use sql_insight::session::{Repl, Session, SessionOptions};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so they never interleave with the chat on stdout.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();

    if config.enable_logs {
        init_tracing(&config);
    }

    info!(
        model = %config.model,
        "Starting SQLInsight v{}",
        env!("CARGO_PKG_VERSION")
    );

    let settings = config.connection_settings()?;
    let completion_config = config.completion_config()?;
    if completion_config.api_key.is_empty() {
        eprintln!(
            "Warning: no API key configured. Set SQLINSIGHT_API_KEY (or GROQ_API_KEY) or pass --api-key."
        );
    }

    let completion = Arc::new(CompletionClient::new(completion_config)?);
    let session = Session::new(completion, settings, SessionOptions::from_config(&config));

    let stdin = BufReader::new(tokio::io::stdin());
    let mut repl = Repl::new(session, stdin, tokio::io::stdout())
        .with_show_sql(config.show_sql)
        .with_connect_on_start(config.connect);

    let reason = match repl.run_until(shutdown_signal()).await {
        Ok(reason) => reason,
        Err(e) => {
            error!(error = %e, "Session error");
            return Err(e.into());
        }
    };

    if reason == ExitReason::Signal {
        // The pending stdin read cannot be interrupted
        info!("Exiting process");
        std::process::exit(0);
    }

    info!("Shutdown complete");
    Ok(())
}
