//! Chat session: conversation state plus the turn orchestrator.
//!
//! A [`Session`] owns everything one user conversation needs: the history,
//! the connection settings form, at most one open [`Connection`] and the two
//! synthesizers. It is driven one turn at a time through `&mut self`.

pub mod render;
pub mod repl;

use crate::chain::validator::check_syntax;
use crate::chain::{AnswerSynthesizer, QuerySynthesizer, ShortcutResponder};
use crate::config::{Config, DEFAULT_MAX_ROWS, DEFAULT_SAMPLE_ROWS};
use crate::db::{Connection, QueryExecutor, SchemaInspector};
use crate::error::{InsightError, InsightResult};
use crate::llm::CompletionService;
use crate::models::{ConnectionSettings, ConversationHistory, SettingsField, SqlQuery, Turn};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use repl::Repl;

/// Pipeline knobs that do not change during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Sample rows per table in the schema description.
    pub sample_rows: u32,
    /// Rows kept from a query result.
    pub max_rows: u32,
    /// Parse synthesized SQL before running it.
    pub check_sql: bool,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sample_rows: config.sample_rows,
            max_rows: config.effective_max_rows(),
            check_sql: config.check_sql,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sample_rows: DEFAULT_SAMPLE_ROWS,
            max_rows: DEFAULT_MAX_ROWS,
            check_sql: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A turn has started and its assistant reply is not appended yet.
    Processing,
}

/// Where a turn's reply came from.
#[derive(Debug)]
pub enum ReplySource {
    Shortcut,
    Answer,
    /// The chain stopped early; the reply is the error text.
    Failed(InsightError),
}

/// Outcome of one handled input.
#[derive(Debug)]
pub struct TurnReport {
    /// Text of the assistant turn appended to the history.
    pub reply: String,
    pub source: ReplySource,
    /// SQL returned by the query stage, when it ran.
    pub query: Option<SqlQuery>,
    /// What the answer stage was given as the SQL response: the rendered
    /// result, or the error text when execution failed.
    pub result_text: Option<String>,
}

impl TurnReport {
    fn new(source: ReplySource) -> Self {
        Self {
            reply: String::new(),
            source,
            query: None,
            result_text: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.source, ReplySource::Failed(_))
    }
}

/// Assistant reply recorded for a turn dropped before it produced one.
pub const INTERRUPTED_REPLY: &str = "Error: Turn interrupted before a reply was produced.";

pub struct Session<C> {
    history: ConversationHistory,
    settings: ConnectionSettings,
    connection: Option<Connection>,
    shortcuts: ShortcutResponder,
    chain: Chain<C>,
    state: SessionState,
}

/// Schema, query, execution and answer stages of a turn.
struct Chain<C> {
    query_synthesizer: QuerySynthesizer<C>,
    answer_synthesizer: AnswerSynthesizer<C>,
    executor: QueryExecutor,
    options: SessionOptions,
}

/// Keeps the history paired while a turn is in flight.
///
/// Created when the user turn is appended. If it is dropped before
/// [`TurnGuard::finish`], the turn was abandoned: a placeholder reply is
/// appended and the session returns to idle.
struct TurnGuard<'a> {
    history: &'a mut ConversationHistory,
    state: &'a mut SessionState,
    finished: bool,
}

impl<'a> TurnGuard<'a> {
    fn begin(
        history: &'a mut ConversationHistory,
        state: &'a mut SessionState,
        input: &str,
    ) -> Self {
        *state = SessionState::Processing;
        history.push(Turn::user(input));
        Self {
            history,
            state,
            finished: false,
        }
    }

    fn history(&self) -> &ConversationHistory {
        self.history
    }

    fn finish(mut self, reply: String) {
        self.history.push(Turn::assistant(reply));
        *self.state = SessionState::Idle;
        self.finished = true;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Turn abandoned before completion");
            self.history.push(Turn::assistant(INTERRUPTED_REPLY));
            *self.state = SessionState::Idle;
        }
    }
}

impl<C: CompletionService> Session<C> {
    pub fn new(completion: Arc<C>, settings: ConnectionSettings, options: SessionOptions) -> Self {
        Self {
            history: ConversationHistory::new(),
            settings,
            connection: None,
            shortcuts: ShortcutResponder::new(),
            chain: Chain {
                query_synthesizer: QuerySynthesizer::new(Arc::clone(&completion)),
                answer_synthesizer: AnswerSynthesizer::new(completion),
                executor: QueryExecutor::with_max_rows(options.max_rows),
                options,
            },
            state: SessionState::Idle,
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn options(&self) -> SessionOptions {
        self.chain.options
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Change one connection setting. Takes effect on the next [`Session::connect`].
    pub fn set_setting(&mut self, field: SettingsField, value: &str) -> InsightResult<()> {
        self.settings
            .set_field(field, value)
            .map_err(InsightError::invalid_input)?;
        debug!(field = field.name(), "Setting updated");
        Ok(())
    }

    /// Open a connection with the current settings.
    ///
    /// On success the previous connection, if any, is closed and replaced. On
    /// failure it stays in place. The history is never touched.
    pub async fn connect(&mut self) -> InsightResult<&Connection> {
        let connection = Connection::connect(&self.settings).await?;
        if let Some(previous) = self.connection.replace(connection) {
            previous.close().await;
        }
        self.connection
            .as_ref()
            .ok_or_else(|| InsightError::internal("connection missing after connect"))
    }

    /// Close the connection, if any.
    pub async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
    }

    /// Handle one line of user input.
    ///
    /// Appends the user turn, answers it from the shortcut table or the full
    /// chain, and appends the assistant turn. Every accepted input adds exactly
    /// two turns, failures included; a turn whose future is dropped midway
    /// gets [`INTERRUPTED_REPLY`]. Input arriving while a turn is still in
    /// progress is rejected with [`InsightError::InvalidInput`] and leaves the
    /// history untouched.
    pub async fn handle_input(&mut self, input: &str) -> InsightResult<TurnReport> {
        if self.state == SessionState::Processing {
            return Err(InsightError::invalid_input(
                "A turn is already being processed",
            ));
        }

        let turn = TurnGuard::begin(&mut self.history, &mut self.state, input);

        let report = match self.shortcuts.respond(input) {
            Some(reply) => {
                debug!("Answered from shortcuts");
                TurnReport {
                    reply: reply.to_string(),
                    ..TurnReport::new(ReplySource::Shortcut)
                }
            }
            None => {
                self.chain
                    .run(self.connection.as_ref(), input, turn.history())
                    .await
            }
        };

        turn.finish(report.reply.clone());
        Ok(report)
    }
}

impl<C: CompletionService> Chain<C> {
    async fn run(
        &self,
        connection: Option<&Connection>,
        question: &str,
        history: &ConversationHistory,
    ) -> TurnReport {
        let mut report = TurnReport::new(ReplySource::Answer);
        match self.answer(connection, question, history, &mut report).await {
            Ok(answer) => {
                info!(history_len = history.len() + 1, "Turn answered");
                report.reply = answer;
            }
            Err(e) => {
                warn!(error = %e, "Turn failed");
                report.reply = e.as_result_text();
                report.source = ReplySource::Failed(e);
            }
        }
        report
    }

    /// Schema, query, execution, answer, in strict sequence.
    async fn answer(
        &self,
        connection: Option<&Connection>,
        question: &str,
        history: &ConversationHistory,
        report: &mut TurnReport,
    ) -> InsightResult<String> {
        let connection = connection.ok_or(InsightError::NotConnected)?;

        let schema =
            SchemaInspector::describe_database(connection.pool(), self.options.sample_rows).await?;

        let query = self
            .query_synthesizer
            .synthesize(question, history, &schema)
            .await?;
        report.query = Some(query.clone());

        let result_text = self.execute(connection, &query).await?;
        report.result_text = Some(result_text.clone());

        self.answer_synthesizer
            .synthesize(question, history, &schema, &query, &result_text)
            .await
    }

    /// Run the query and render what the answer stage sees.
    ///
    /// Query errors become the result text; anything else aborts the turn.
    async fn execute(&self, connection: &Connection, query: &SqlQuery) -> InsightResult<String> {
        let outcome = match self.options.check_sql {
            true => match check_syntax(query, connection.db_type()) {
                Ok(()) => self.executor.execute(connection.pool(), query).await,
                Err(e) => Err(e),
            },
            false => self.executor.execute(connection.pool(), query).await,
        };

        match outcome {
            Ok(result) => {
                debug!(
                    rows = result.row_count(),
                    truncated = result.truncated,
                    "Query executed"
                );
                Ok(result.to_text())
            }
            Err(e @ InsightError::Query { .. }) => {
                warn!(error = %e, "Query failed, passing error to the answer stage");
                Ok(e.as_result_text())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replies from a fixed script and records every prompt.
    struct Scripted {
        replies: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl CompletionService for Scripted {
        async fn complete(&self, prompt: &str) -> InsightResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| InsightError::synthesis("completion", "script exhausted"))
        }
    }

    fn session(completion: Arc<Scripted>) -> Session<Scripted> {
        Session::new(
            completion,
            ConnectionSettings::sqlite(""),
            SessionOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_shortcut_adds_two_turns() {
        let completion = Scripted::new(&[]);
        let mut session = session(completion.clone());

        let report = session.handle_input("Ok").await.unwrap();
        assert!(matches!(report.source, ReplySource::Shortcut));
        assert_eq!(report.reply, "Got it! Anything else I can help with?");
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(completion.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_connected_reports_error_turn() {
        let completion = Scripted::new(&["SELECT 1;", "unused"]);
        let mut session = session(completion.clone());

        let report = session.handle_input("How many artists?").await.unwrap();
        assert!(matches!(
            report.source,
            ReplySource::Failed(InsightError::NotConnected)
        ));
        assert_eq!(
            report.reply,
            "Error: Not connected to a database. Use /connect first."
        );
        assert_eq!(session.history().len(), 3);
        assert_eq!(
            session.history().last(),
            Some(&Turn::assistant(report.reply.clone()))
        );
        assert!(completion.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_connect_keeps_state() {
        let mut session = session(Scripted::new(&[]));
        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, InsightError::Connection { .. }));
        assert!(!session.is_connected());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_dropped_turn_guard_appends_reply() {
        let mut history = ConversationHistory::new();
        let mut state = SessionState::Idle;

        let turn = TurnGuard::begin(&mut history, &mut state, "How many artists?");
        drop(turn);
        assert_eq!(state, SessionState::Idle);
        assert_eq!(history.len(), 3);
        assert_eq!(history.last(), Some(&Turn::assistant(INTERRUPTED_REPLY)));

        let turn = TurnGuard::begin(&mut history, &mut state, "ok");
        turn.finish("Got it!".to_string());
        assert_eq!(history.len(), 5);
        assert_eq!(history.last(), Some(&Turn::assistant("Got it!")));
    }

    #[test]
    fn test_set_setting_validates() {
        let mut session = session(Scripted::new(&[]));
        session.set_setting(SettingsField::Port, "5433").unwrap();
        assert_eq!(session.settings().port, 5433);

        let err = session.set_setting(SettingsField::Port, "abc").unwrap_err();
        assert!(matches!(err, InsightError::InvalidInput { .. }));
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default_config();
        config.max_rows = 0;
        config.check_sql = true;
        let options = SessionOptions::from_config(&config);
        assert_eq!(options.max_rows, 1);
        assert!(options.check_sql);
        assert_eq!(options.sample_rows, DEFAULT_SAMPLE_ROWS);
    }
}
