//! The question-answering chain.
//!
//! A turn that is not a shortcut goes through two completion stages:
//! - [`QuerySynthesizer`] writes SQL from the question, history and schema
//! - [`AnswerSynthesizer`] explains the result of running that SQL
//!
//! [`ShortcutResponder`] short-circuits both for literal acknowledgements.

pub mod answer;
pub mod prompt;
pub mod query;
pub mod shortcut;
pub mod validator;

pub use answer::AnswerSynthesizer;
pub use query::QuerySynthesizer;
pub use shortcut::ShortcutResponder;
