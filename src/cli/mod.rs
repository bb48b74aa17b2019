mod commands;

use std::io::{Read, Write};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::catalog::CatalogError;
use crate::context::EavContext;

pub use commands::{parse_criterion, Command};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed parsing JSON argument: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed writing output: {0}")]
    Io(#[from] std::io::Error),
}

pub struct EavCli {
    ctx: EavContext,
}

impl EavCli {
    pub fn new(ctx: EavContext) -> Self {
        EavCli { ctx }
    }

    // Run a single command, writing its result to `out` as one JSON document
    pub async fn run<W: Write>(&self, command: Command, out: &mut W) -> Result<(), CliError> {
        debug!("Running {command:?}");

        match command {
            Command::Define { definition } => {
                let definition = read_json(&definition)?;
                let created = self.ctx.define_table(definition).await?;
                print_json(out, &created)
            }
            Command::Insert { table_id, values } => {
                let values = read_json(&values)?;
                self.ctx.insert_data(table_id, values).await?;
                let data = self.ctx.get_data(table_id).await?;
                print_json(out, &data)
            }
            Command::Filter { criteria } => {
                let tables = self.ctx.filter_tables(&criteria).await?;
                print_json(out, &tables)
            }
            Command::Schema { table_id } => {
                print_json(out, &self.ctx.get_schema(table_id).await?)
            }
            Command::Data { table_id } => {
                print_json(out, &self.ctx.get_data(table_id).await?)
            }
            Command::List => print_json(out, &self.ctx.list_tables().await?),
            Command::Delete { table_id } => {
                self.ctx.delete_table(table_id).await?;
                print_json(out, &serde_json::json!({ "deleted": table_id }))
            }
        }
    }
}

fn read_json(argument: &str) -> Result<Value, CliError> {
    if argument == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(serde_json::from_str(&buffer)?)
    } else {
        Ok(serde_json::from_str(argument)?)
    }
}

fn print_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), CliError> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
