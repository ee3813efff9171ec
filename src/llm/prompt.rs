//! Prompt construction for LLM requests.
//!
//! Builds the schema-grounded SQL prompt and the result-synthesis follow-up.

use crate::db::{QueryResult, Schema};

/// Prompt template for the SQL generation step.
const SQL_PROMPT_TEMPLATE: &str = r#"You are a MySQL expert.
Database Schema:
{schema}

The user asks: '{query}'.

If the user asks for a query, provide ONLY the SQL query in a code block (```sql ... ```).
If the user asks a general question, answer it using the schema context."#;

/// Prompt template for the natural-language synthesis step.
const SYNTHESIS_PROMPT_TEMPLATE: &str = r#"The database returned this data:
{data}

Based on this data, please answer the user's original question: '{query}'.
Answer in a friendly, natural language sentence.
Do NOT show the SQL query or the raw data structure in your final response."#;

/// Builds the grounding prompt with the schema text and the user's question.
pub fn build_sql_prompt(schema: &Schema, query: &str) -> String {
    SQL_PROMPT_TEMPLATE
        .replace("{schema}", &schema.format_for_prompt())
        .replace("{query}", query)
}

/// Builds the follow-up prompt embedding the query result and the original
/// question, sent in the same chat session as the SQL prompt.
pub fn build_synthesis_prompt(result: &QueryResult, query: &str) -> String {
    SYNTHESIS_PROMPT_TEMPLATE
        .replace("{data}", &format_result_data(result))
        .replace("{query}", query)
}

/// Renders column names and rows as compact text for the synthesis prompt.
fn format_result_data(result: &QueryResult) -> String {
    let columns = result.columns.join(", ");

    let rows = result
        .rows
        .iter()
        .map(|row| {
            let values = row
                .iter()
                .map(|value| value.to_display_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("({values})")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Columns: {columns}\nRows:\n{rows}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Table, Value};

    fn sample_schema() -> Schema {
        Schema {
            tables: vec![Table::new("users")
                .with_column("id", "int")
                .with_column("email", "varchar(255)")],
        }
    }

    #[test]
    fn test_sql_prompt_contains_schema_and_question() {
        let prompt = build_sql_prompt(&sample_schema(), "How many users are there?");

        assert!(prompt.contains("Table: users"));
        assert!(prompt.contains("email (varchar(255))"));
        assert!(prompt.contains("How many users are there?"));
        assert!(prompt.contains("```sql"));
    }

    #[test]
    fn test_synthesis_prompt_embeds_columns_and_rows() {
        let result = QueryResult::with_data(
            vec!["id".to_string(), "email".to_string()],
            vec![
                vec![Value::Int(1), Value::String("a@example.com".to_string())],
                vec![Value::Int(2), Value::Null],
            ],
        );

        let prompt = build_synthesis_prompt(&result, "Who signed up?");

        assert!(prompt.contains("Columns: id, email"));
        assert!(prompt.contains("(1, a@example.com)"));
        assert!(prompt.contains("(2, NULL)"));
        assert!(prompt.contains("Who signed up?"));
        assert!(prompt.contains("Do NOT show the SQL query"));
    }

    #[test]
    fn test_synthesis_prompt_empty_result() {
        let result = QueryResult::new();
        let prompt = build_synthesis_prompt(&result, "Anything?");

        assert!(prompt.contains("Columns: \nRows:\n"));
        assert!(prompt.contains("Anything?"));
    }
}
