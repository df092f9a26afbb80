//! Terminal rendering for the chat surface.

use crate::error::InsightError;
use crate::models::{ConnectionSettings, ConversationHistory, SettingsField, SqlQuery, Turn};

pub const ASSISTANT_GLYPH: &str = "🟢";
pub const USER_GLYPH: &str = "✍️";
/// Marks a reply produced in the current turn.
pub const REPLY_GLYPH: &str = "💡";
pub const FAILURE_GLYPH: &str = "❌";

pub const CONNECTED_MESSAGE: &str = "Connected to database!";

pub const HELP: &str = "\
Commands:
  /connect               Connect with the current settings
  /set <field> <value>   Change a setting (scheme, host, port, user, password, database)
  /settings              Show the current settings
  /history               Show the conversation so far
  /help                  Show this help
  /quit                  Leave the session

Anything else is sent to the assistant as a question.";

/// One history turn, as shown when replaying the conversation.
pub fn render_turn(turn: &Turn) -> String {
    match turn {
        Turn::User(text) => format!("{USER_GLYPH} {text}"),
        Turn::Assistant(text) => format!("{ASSISTANT_GLYPH} {text}"),
    }
}

pub fn render_history(history: &ConversationHistory) -> String {
    history
        .turns()
        .iter()
        .map(render_turn)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_reply(reply: &str) -> String {
    format!("{REPLY_GLYPH} {reply}")
}

pub fn render_sql(query: &SqlQuery) -> String {
    format!("SQL: {query}")
}

/// An error plus its suggestion on a second line, when there is one.
pub fn render_error(error: &InsightError) -> String {
    match error.suggestion() {
        Some(hint) => format!("{FAILURE_GLYPH} {error}\n   hint: {hint}"),
        None => format!("{FAILURE_GLYPH} {error}"),
    }
}

/// The settings form, password masked.
pub fn render_settings(settings: &ConnectionSettings) -> String {
    let width = SettingsField::ALL
        .iter()
        .map(|field| field.name().len())
        .max()
        .unwrap_or(0);

    let mut lines = vec!["Database settings:".to_string()];
    lines.extend(SettingsField::ALL.iter().map(|field| {
        format!(
            "  {:<width$}  {}",
            field.name(),
            settings.display_value(*field),
            width = width
        )
    }));
    lines.push(format!("  target    {}", settings.masked_uri()));
    lines.join("\n")
}
