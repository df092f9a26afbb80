//! Question to SQL.

use super::prompt::{QueryPromptVars, render_query_prompt};
use crate::error::InsightResult;
use crate::llm::CompletionService;
use crate::models::{ConversationHistory, SchemaDescription, SqlQuery};
use std::sync::Arc;
use tracing::debug;

pub const STAGE: &str = "sql query";

/// Turns a question into a SQL statement with one completion request.
pub struct QuerySynthesizer<C> {
    completion: Arc<C>,
}

impl<C: CompletionService> QuerySynthesizer<C> {
    pub fn new(completion: Arc<C>) -> Self {
        Self { completion }
    }

    /// Ask the model for SQL answering `question`.
    ///
    /// The reply is returned whole as the query: no fence stripping, no
    /// trimming, no validation.
    pub async fn synthesize(
        &self,
        question: &str,
        history: &ConversationHistory,
        schema: &SchemaDescription,
    ) -> InsightResult<SqlQuery> {
        let prompt = render_query_prompt(&QueryPromptVars {
            schema,
            chat_history: history,
            question,
        });

        let sql = self
            .completion
            .complete(&prompt)
            .await
            .map_err(|e| e.at_stage(STAGE))?;

        debug!(sql = %sql, "Synthesized query");
        Ok(SqlQuery::new(sql))
    }
}
