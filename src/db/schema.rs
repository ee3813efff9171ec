//! Database schema types for Converse.
//!
//! Represents the structure of a database as an ordered list of tables and
//! columns, rendered as text for prompt embedding.

use serde::{Deserialize, Serialize};

/// Represents the schema of a connected database.
///
/// Invalidated (and refreshed) whenever the connection profile changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// All tables in the schema, ordered by name.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats the schema for inclusion in an LLM prompt.
    ///
    /// Produces one block per table:
    ///
    /// ```text
    /// Table: users
    /// Columns: id (int), email (varchar(255))
    /// ```
    pub fn format_for_prompt(&self) -> String {
        self.tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|col| format!("{} ({})", col.name, col.data_type))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Table: {}\nColumns: {}", table.name, columns)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Returns the table names in schema order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Returns true if the schema has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in the table, in ordinal order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Adds a column to the table.
    pub fn with_column(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Data type as reported by the database (e.g., "int", "varchar(255)").
    pub data_type: String,
}

impl Column {
    /// Creates a new column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}
