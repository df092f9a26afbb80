//! Prompt templates for the two completion stages.
//!
//! Each template is a function over a typed variable struct, so a missing or
//! misspelled placeholder is a compile error rather than a runtime surprise.
//! The wording, indentation and few-shot examples are fixed.

use crate::models::{ConversationHistory, SchemaDescription, SqlQuery};

/// Variables of the query-writing prompt.
#[derive(Debug, Clone, Copy)]
pub struct QueryPromptVars<'a> {
    pub schema: &'a SchemaDescription,
    pub chat_history: &'a ConversationHistory,
    pub question: &'a str,
}

/// Variables of the answer-writing prompt.
#[derive(Debug, Clone, Copy)]
pub struct AnswerPromptVars<'a> {
    pub schema: &'a SchemaDescription,
    pub chat_history: &'a ConversationHistory,
    pub query: &'a SqlQuery,
    pub question: &'a str,
    /// Rendered query result, or the error text when execution failed.
    pub response: &'a str,
}

/// Prompt asking for a single SQL statement and nothing else.
pub fn render_query_prompt(vars: &QueryPromptVars<'_>) -> String {
    format!(
        r#"
    You are a data analyst at a company. You are interacting with a user who is asking you questions about the company's database.
    Based on the table schema below, write a SQL query that would answer the user's question. Take the conversation history into account.
    
    <SCHEMA>{schema}</SCHEMA>
    
    Conversation History: {chat_history}
    
    Write only the SQL query and nothing else. Do not wrap the SQL query in any other text, not even backticks.
    
    For example:
    Question: which 3 artists have the most tracks?
    SQL Query: SELECT ArtistId, COUNT(*) as track_count FROM Track GROUP BY ArtistId ORDER BY track_count DESC LIMIT 3;
    Question: Name 10 artists
    SQL Query: SELECT Name FROM Artist LIMIT 10;
    
    Your turn:
    
    Question: {question}
    SQL Query:
    "#,
        schema = vars.schema,
        chat_history = vars.chat_history.to_prompt_text(),
        question = vars.question,
    )
}

/// Prompt asking for a natural-language answer grounded in the query result.
pub fn render_answer_prompt(vars: &AnswerPromptVars<'_>) -> String {
    format!(
        r#"
    You are a data analyst at a company. You are interacting with a user who is asking you questions about the company's database.
    Based on the table schema below, question, sql query, and sql response, write a natural language response.
    <SCHEMA>{schema}</SCHEMA>

    Conversation History: {chat_history}
    SQL Query: <SQL>{query}</SQL>
    User question: {question}
    SQL Response: {response}"#,
        schema = vars.schema,
        chat_history = vars.chat_history.to_prompt_text(),
        query = vars.query,
        question = vars.question,
        response = vars.response,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Turn;

    fn fixtures() -> (SchemaDescription, ConversationHistory) {
        let schema = SchemaDescription::new("CREATE TABLE Artist (\n\tName NVARCHAR(120)\n)");
        let mut history = ConversationHistory::new();
        history.push(Turn::user("Name 10 artists"));
        (schema, history)
    }

    #[test]
    fn test_query_prompt_placeholders_filled() {
        let (schema, history) = fixtures();
        let prompt = render_query_prompt(&QueryPromptVars {
            schema: &schema,
            chat_history: &history,
            question: "Name 10 artists",
        });

        assert!(prompt.contains("<SCHEMA>CREATE TABLE Artist (\n\tName NVARCHAR(120)\n)</SCHEMA>"));
        assert!(prompt.contains("Conversation History: AI: Hello! I'm a SQL assistant"));
        assert!(prompt.contains("\nHuman: Name 10 artists"));
        assert!(prompt.ends_with("Question: Name 10 artists\n    SQL Query:\n    "));
        assert!(!prompt.contains("{schema}"));
    }

    #[test]
    fn test_query_prompt_few_shot_examples() {
        let (schema, history) = fixtures();
        let prompt = render_query_prompt(&QueryPromptVars {
            schema: &schema,
            chat_history: &history,
            question: "q",
        });

        assert!(prompt.contains("Question: which 3 artists have the most tracks?"));
        assert!(prompt.contains("SQL Query: SELECT Name FROM Artist LIMIT 10;"));
        assert!(prompt.contains("not even backticks"));
    }

    #[test]
    fn test_answer_prompt_carries_query_and_response() {
        let (schema, history) = fixtures();
        let query = SqlQuery::new("SELECT Name FROM Artist LIMIT 10;");
        let prompt = render_answer_prompt(&AnswerPromptVars {
            schema: &schema,
            chat_history: &history,
            query: &query,
            question: "Name 10 artists",
            response: "| AC/DC |",
        });

        assert!(prompt.contains("SQL Query: <SQL>SELECT Name FROM Artist LIMIT 10;</SQL>"));
        assert!(prompt.contains("User question: Name 10 artists"));
        assert!(prompt.ends_with("SQL Response: | AC/DC |"));
    }
}
