//! Canned replies for a handful of literal inputs.

/// Literal inputs (already lowercase) and their replies.
const DEFAULT_SHORTCUTS: &[(&str, &str)] = &[
    ("ok", "Got it! Anything else I can help with?"),
    ("thank you", "You're welcome! Happy to assist."),
    ("alright", "Okay, let me know if there's anything else."),
];

/// Answers acknowledgements without touching the database or the model.
#[derive(Debug, Clone)]
pub struct ShortcutResponder {
    entries: Vec<(String, String)>,
}

impl ShortcutResponder {
    pub fn new() -> Self {
        Self::from_pairs(DEFAULT_SHORTCUTS.iter().copied())
    }

    /// Build a responder from `(input, reply)` pairs. Inputs are stored lowercased.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(input, reply)| (input.to_lowercase(), reply.to_string()))
                .collect(),
        }
    }

    /// The canned reply for `input`, if the whole input matches a key.
    ///
    /// Only case is normalized: surrounding whitespace or punctuation makes the
    /// input a regular question.
    pub fn respond(&self, input: &str) -> Option<&str> {
        let lowered = input.to_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| *key == lowered)
            .map(|(_, reply)| reply.as_str())
    }
}

impl Default for ShortcutResponder {
    fn default() -> Self {
        Self::new()
    }
}
