//! Response parsing for LLM outputs.
//!
//! Extracts the SQL query from a reply containing a fenced ```sql block.

use regex::Regex;
use std::sync::OnceLock;

/// Matches the first fenced code block explicitly tagged as SQL.
///
/// The tag match is case-insensitive; the body is multiline. Untagged or
/// differently-tagged blocks do not count: their absence is the signal that
/// the model answered in plain text.
fn sql_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)```sql\s+(.*?)```").expect("SQL block pattern is valid")
    })
}

/// Extracts the SQL query from the first fenced ```sql block in `reply`.
///
/// Returns the trimmed body, or None when no tagged block is present or the
/// block is empty.
pub fn extract_sql(reply: &str) -> Option<String> {
    let captures = sql_block_pattern().captures(reply)?;
    let sql = captures.get(1)?.as_str().trim();
    if sql.is_empty() {
        None
    } else {
        Some(sql.to_string())
    }
}
