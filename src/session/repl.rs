//! Line-oriented chat front end.
//!
//! Lines starting with `/` are session commands; any other non-empty line is a
//! question for [`Session::handle_input`]. The REPL is generic over its input
//! and output so it can be driven from a byte buffer in tests.

use super::render::{
    CONNECTED_MESSAGE, HELP, render_error, render_history, render_reply, render_settings,
    render_sql, render_turn,
};
use super::{ReplySource, Session};
use crate::error::{InsightError, InsightResult};
use crate::llm::CompletionService;
use crate::models::{SettingsField, Turn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::signal;
use tracing::{info, warn};

const PROMPT: &str = "> ";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Set { field: String, value: String },
    Settings,
    History,
    Help,
    Quit,
    Unknown(String),
    /// Free text for the assistant.
    Chat(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Self::Chat(line.to_string());
        };

        let mut parts = rest.splitn(3, ' ');
        let name = parts.next().unwrap_or("").to_ascii_lowercase();
        match name.as_str() {
            "connect" => Self::Connect,
            "set" => Self::Set {
                field: parts.next().unwrap_or("").to_string(),
                value: parts.next().unwrap_or("").to_string(),
            },
            "settings" => Self::Settings,
            "history" => Self::History,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(name),
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    EndOfInput,
    /// The shutdown future resolved; stdin may still be blocked on a read.
    Signal,
}

pub struct Repl<C, R, W> {
    session: Session<C>,
    lines: Lines<R>,
    out: W,
    show_sql: bool,
    connect_on_start: bool,
}

impl<C, R, W> Repl<C, R, W>
where
    C: CompletionService,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(session: Session<C>, input: R, out: W) -> Self {
        Self {
            session,
            lines: input.lines(),
            out,
            show_sql: false,
            connect_on_start: false,
        }
    }

    /// Print the synthesized SQL before each answer.
    pub fn with_show_sql(mut self, show_sql: bool) -> Self {
        self.show_sql = show_sql;
        self
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    /// Connect with the current settings right after the greeting.
    pub fn with_connect_on_start(mut self, connect: bool) -> Self {
        self.connect_on_start = connect;
        self
    }

    /// Run until `/quit`, end of input or `shutdown` resolves, then close the
    /// connection.
    pub async fn run_until<F>(&mut self, shutdown: F) -> InsightResult<ExitReason>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let greeting = render_history(self.session.history());
        self.write_line(&greeting).await?;
        if self.connect_on_start {
            self.run_connect().await?;
        }

        let reason = loop {
            self.write(PROMPT).await?;

            let line = tokio::select! {
                line = self.lines.next_line() => line.map_err(io_error)?,
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break ExitReason::Signal;
                }
            };

            let Some(line) = line else {
                break ExitReason::EndOfInput;
            };
            if line.is_empty() {
                continue;
            }

            if !self.dispatch(Command::parse(&line)).await? {
                break ExitReason::Quit;
            }
        };

        self.session.close().await;
        info!(reason = ?reason, turns = self.session.history().len(), "Session ended");
        Ok(reason)
    }

    /// Handle one command. Returns `false` when the session should end.
    async fn dispatch(&mut self, command: Command) -> InsightResult<bool> {
        match command {
            Command::Connect => self.run_connect().await?,
            Command::Set { field, value } => self.run_set(&field, &value).await?,
            Command::Settings => {
                let text = render_settings(self.session.settings());
                self.write_line(&text).await?;
            }
            Command::History => {
                let text = render_history(self.session.history());
                self.write_line(&text).await?;
            }
            Command::Help => self.write_line(HELP).await?,
            Command::Quit => return Ok(false),
            Command::Unknown(name) => {
                let err = InsightError::invalid_input(format!(
                    "Unknown command '/{}'. Type /help for the list.",
                    name
                ));
                self.write_line(&render_error(&err)).await?;
            }
            Command::Chat(text) => self.run_turn(&text).await?,
        }
        Ok(true)
    }

    async fn run_connect(&mut self) -> InsightResult<()> {
        let text = match self.session.connect().await {
            Ok(connection) => match connection.server_version() {
                Some(version) => format!("{} ({})", CONNECTED_MESSAGE, version),
                None => CONNECTED_MESSAGE.to_string(),
            },
            Err(e) => render_error(&e),
        };
        self.write_line(&text).await
    }

    async fn run_set(&mut self, field: &str, value: &str) -> InsightResult<()> {
        let result = match SettingsField::parse(field) {
            Some(field) => self
                .session
                .set_setting(field, value)
                .map(|()| format!("{} updated", field.name())),
            None => Err(InsightError::invalid_input(format!(
                "Unknown setting '{}'. Expected one of: scheme, host, port, user, password, database",
                field
            ))),
        };

        let text = match result {
            Ok(text) => text,
            Err(e) => render_error(&e),
        };
        self.write_line(&text).await
    }

    async fn run_turn(&mut self, text: &str) -> InsightResult<()> {
        self.write_line(&render_turn(&Turn::user(text))).await?;

        let report = match self.session.handle_input(text).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Input rejected");
                return self.write_line(&render_error(&e)).await;
            }
        };

        if self.show_sql {
            if let Some(query) = &report.query {
                self.write_line(&render_sql(query)).await?;
            }
        }

        self.write_line(&render_reply(&report.reply)).await?;
        if let ReplySource::Failed(e) = &report.source {
            if let Some(hint) = e.suggestion() {
                self.write_line(&format!("   hint: {}", hint)).await?;
            }
        }
        Ok(())
    }

    async fn write(&mut self, text: &str) -> InsightResult<()> {
        self.out.write_all(text.as_bytes()).await.map_err(io_error)?;
        self.out.flush().await.map_err(io_error)
    }

    async fn write_line(&mut self, text: &str) -> InsightResult<()> {
        self.write(&format!("{}\n", text)).await
    }
}

fn io_error(e: std::io::Error) -> InsightError {
    InsightError::internal(format!("Terminal I/O failed: {}", e))
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
///
/// A handler that cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
