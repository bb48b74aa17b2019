use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use tracing::{error, info};
use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

use eavstore::{
    cli::{Command, EavCli},
    config::{
        context::build_context,
        schema::{load_config, EavConfig},
    },
};

pub const DEFAULT_CONFIG_PATH: &str = "eavstore.toml";

#[derive(Debug, Parser)]
#[clap(name = "eavstore", about = "A typed entity-attribute-value store", version)]
struct Args {
    #[clap(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,

    #[clap(long, help = "Emit log records as JSON")]
    json_logs: bool,

    #[clap(subcommand)]
    command: Command,
}

fn prepare_tracing(json_logs: bool) {
    // Route `log` records (e.g. from sqlx) through tracing
    LogTracer::init().expect("Failed to set up the log bridge");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("eavstore=info"));
    let sub = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter);

    // stdout is reserved for command output
    let result = if json_logs {
        tracing::subscriber::set_global_default(sub.json().finish())
    } else {
        tracing::subscriber::set_global_default(sub.compact().finish())
    };
    result.expect("Failed to set up tracing");
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    prepare_tracing(args.json_logs);

    let config = if args.config_path.exists() {
        info!("Loading the configuration from {:?}", args.config_path);
        match load_config(&args.config_path) {
            Ok(config) => config,
            Err(e) => {
                error!("Error loading the config file: {e}");
                eprintln!("{e}");
                exit(1);
            }
        }
    } else {
        info!(
            "Config file {:?} not found, using an in-memory catalog",
            args.config_path
        );
        EavConfig::default()
    };

    let context = match build_context(config).await {
        Ok(context) => context,
        Err(e) => {
            error!("Error setting up the catalog: {e}");
            eprintln!("{e}");
            exit(1);
        }
    };

    let cli = EavCli::new(context);
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = cli.run(args.command, &mut stdout).await {
        eprintln!("{e}");
        exit(1);
    }
}
