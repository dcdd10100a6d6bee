mod cli;

use std::process::ExitCode;

use airtable_core::config::{ENV_API_ROOT, ENV_BASE_ID, ENV_TIMEOUT_MS};
use airtable_core::{AirtableError, BaseClient, ClientConfig, QueryParams};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Args, Command};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Airtable(#[from] AirtableError),
    #[error("could not render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Environment first, then flags on top.
fn load_config(args: &Args) -> Result<ClientConfig, AirtableError> {
    ClientConfig::from_lookup(|key| {
        let flag = match key {
            ENV_BASE_ID => args.base_id.clone(),
            ENV_API_ROOT => args.api_root.clone(),
            ENV_TIMEOUT_MS => args.timeout_ms.map(|ms| ms.to_string()),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    })
}

fn print<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let client = BaseClient::from_config(load_config(&args)?);

    match args.command {
        Command::List { table, params, all } => {
            let params = QueryParams::from_pairs(params)?;
            if all {
                print(&client.list_all(&table, &params)?)
            } else {
                print(&client.list(&table, &params)?)
            }
        }
        Command::Get { table, id } => print(&client.get(&table, &id)?),
        Command::Create { table, records } => match records.0.as_slice() {
            [fields] => print(&client.create(&table, fields)?),
            batch => print(&client.create_many(&table, batch)?),
        },
        Command::Update { table, id, fields } => print(&client.update(&table, &id, &fields)?),
        Command::Patch { table, id, fields } => print(&client.patch(&table, &id, &fields)?),
        Command::Delete { table, id } => print(&client.delete(&table, &id)?),
    }
}

fn main() -> ExitCode {
    let args = cli::parse();

    // Logs go to stderr so stdout stays valid JSON.
    let log_directive = args.log_level.as_deref().unwrap_or("airtable_core=warn");
    let filter = match log_directive.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::new("airtable_core=warn"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
