use clap::Subcommand;

use crate::data_types::TableId;

/// Commands available from the command line
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Define a table from a `{"name": ..., "fields": [...]}` document
    Define {
        /// The definition as JSON, or `-` to read it from stdin
        definition: String,
    },
    /// Insert a `{"attribute": value, ...}` document into a table
    Insert {
        table_id: TableId,
        /// The values as JSON, or `-` to read them from stdin
        values: String,
    },
    /// List the tables with an attribute matching any `name=value` criterion
    Filter {
        #[clap(value_parser = parse_criterion)]
        criteria: Vec<(String, String)>,
    },
    /// Print the schema of a table
    Schema { table_id: TableId },
    /// Print the current values of a table
    Data { table_id: TableId },
    /// List all tables with their values
    List,
    /// Delete a table
    Delete { table_id: TableId },
}

pub fn parse_criterion(criterion: &str) -> Result<(String, String), String> {
    match criterion.split_once('=') {
        Some((name, value)) if !name.is_empty() => {
            Ok((name.to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got {criterion:?}")),
    }
}
