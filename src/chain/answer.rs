//! Query result to a natural-language answer.

use super::prompt::{AnswerPromptVars, render_answer_prompt};
use crate::error::InsightResult;
use crate::llm::CompletionService;
use crate::models::{ConversationHistory, SchemaDescription, SqlQuery};
use std::sync::Arc;
use tracing::debug;

pub const STAGE: &str = "answer";

/// Explains a query result in plain language with one completion request.
pub struct AnswerSynthesizer<C> {
    completion: Arc<C>,
}

impl<C: CompletionService> AnswerSynthesizer<C> {
    pub fn new(completion: Arc<C>) -> Self {
        Self { completion }
    }

    /// `response` is the rendered result, or the error text when execution failed.
    /// The reply is returned verbatim.
    pub async fn synthesize(
        &self,
        question: &str,
        history: &ConversationHistory,
        schema: &SchemaDescription,
        query: &SqlQuery,
        response: &str,
    ) -> InsightResult<String> {
        let prompt = render_answer_prompt(&AnswerPromptVars {
            schema,
            chat_history: history,
            query,
            question,
            response,
        });

        let answer = self
            .completion
            .complete(&prompt)
            .await
            .map_err(|e| e.at_stage(STAGE))?;

        debug!(answer_chars = answer.len(), "Synthesized answer");
        Ok(answer)
    }
}
