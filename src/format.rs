//! Text formatting for query results and schema samples.
//!
//! Everything the language model sees about data goes through here, so the
//! rendering is plain text: ASCII tables for results, tab-separated lines for
//! sample rows.

use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Cell values longer than this are cut and suffixed with `...`.
pub const MAX_VALUE_CHARS: usize = 300;

static NULL: JsonValue = JsonValue::Null;

#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

pub fn format_value(value: &JsonValue) -> String {
    let text = match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    };
    truncate_chars(&text, MAX_VALUE_CHARS)
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn format_as_table(
    columns: &[ColumnInfo],
    rows: &[Vec<JsonValue>],
    row_count: usize,
    execution_time_ms: u64,
) -> String {
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.name.width()).collect();
    for row in rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(format_value(value).width());
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("| {} ", pad(&col.name, *w, Align::Center)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in rows {
        let row_str: String = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let value = row.get(i).unwrap_or(&NULL);
                let formatted = format_value(value);
                let align = if matches!(value, JsonValue::Number(_)) {
                    Align::Right
                } else {
                    Align::Left
                };
                format!("| {} ", pad(&formatted, *w, align))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_text = if row_count == 1 { "row" } else { "rows" };
    output.push_str(&format!(
        "{} {} in set ({:.2} sec)\n",
        row_count,
        row_text,
        execution_time_ms as f64 / 1000.0
    ));

    output
}

/// Render sample rows as a header line plus one tab-separated line per row.
pub fn format_as_tsv(columns: &[ColumnInfo], rows: &[Vec<JsonValue>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join("\t"),
    );
    for row in rows {
        lines.push(
            (0..columns.len())
                .map(|i| {
                    row.get(i)
                        .map(format_value)
                        .unwrap_or_else(|| "NULL".to_string())
                        .replace(['\t', '\n'], " ")
                })
                .collect::<Vec<_>>()
                .join("\t"),
        );
    }
    lines.join("\n")
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
    Center,
}

/// Pad by display width, so CJK and emoji cells keep the borders aligned.
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{}{}", text, " ".repeat(fill)),
        Align::Right => format!("{}{}", " ".repeat(fill), text),
        Align::Center => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(fill - left))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value_variants() {
        assert_eq!(format_value(&JsonValue::Null), "NULL");
        assert_eq!(format_value(&json!(true)), "true");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!("text")), "text");
        assert_eq!(format_value(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_long_values_truncated() {
        let long = "x".repeat(MAX_VALUE_CHARS + 10);
        let formatted = format_value(&json!(long));
        assert_eq!(formatted.chars().count(), MAX_VALUE_CHARS + 3);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[test]
    fn test_table_layout() {
        let columns = vec![ColumnInfo::new("id"), ColumnInfo::new("name")];
        let rows = vec![vec![json!(7), json!("Jazz")]];
        let table = format_as_table(&columns, &rows, 1, 0);
        let expected = "\
+----+------+
| id | name |
+----+------+
|  7 | Jazz |
+----+------+
1 row in set (0.00 sec)
";
        assert_eq!(table, expected);
    }

    #[test]
    fn test_table_wide_characters_align() {
        let columns = vec![ColumnInfo::new("city")];
        let rows = vec![vec![json!("東京")]];
        let table = format_as_table(&columns, &rows, 1, 0);
        assert!(table.contains("| 東京 |"));
    }

    #[test]
    fn test_table_keeps_duplicate_column_names() {
        let columns = vec![ColumnInfo::new("Name"), ColumnInfo::new("Name")];
        let rows = vec![vec![json!("AC/DC"), json!("Back in Black")]];
        let table = format_as_table(&columns, &rows, 1, 0);
        assert!(table.contains("| AC/DC | Back in Black |"));
    }

    #[test]
    fn test_empty_columns() {
        assert_eq!(format_as_table(&[], &[], 0, 0), "Empty set");
    }

    #[test]
    fn test_tsv_rendering() {
        let columns = vec![ColumnInfo::new("ArtistId"), ColumnInfo::new("Name")];
        let rows = vec![
            vec![json!(1), json!("AC/DC")],
            vec![json!(2), JsonValue::Null],
        ];
        assert_eq!(
            format_as_tsv(&columns, &rows),
            "ArtistId\tName\n1\tAC/DC\n2\tNULL"
        );
    }
}
