//! Binary entry point for the sandbox server and operator utilities.
#![forbid(unsafe_code)]

use std::error::Error;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sqlpen::config::Config;
use sqlpen::executor::SandboxExecutor;
use sqlpen::server;

#[derive(Parser, Debug)]
#[command(
    name = "sqlpen",
    version,
    about = "SQL practice sandbox: admission-filtered, bounded query execution",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server.
    Serve(ServeCmd),
    /// Execute one statement and print the result envelope as JSON.
    Exec(ExecCmd),
}

#[derive(Args, Debug)]
struct ServeCmd {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, env = "SQLPEN_HOST", help = "Network interface to bind to")]
    host: Option<IpAddr>,

    #[arg(long, env = "SQLPEN_PORT", help = "Listening port")]
    port: Option<u16>,

    #[arg(
        long,
        value_name = "ORIGIN",
        help = "Allowed CORS origin (repeatable)"
    )]
    allow_origin: Vec<String>,

    #[arg(
        long,
        value_name = "FILE",
        env = "SQLPEN_ASSIGNMENTS",
        help = "Assignment seed file (TOML)"
    )]
    assignments: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExecCmd {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(value_name = "SQL", help = "Statement to run through the sandbox")]
    query: String,
}

#[derive(Args, Debug)]
struct CommonArgs {
    #[arg(
        long,
        value_name = "FILE",
        env = "SQLPEN_CONFIG",
        help = "Configuration file (TOML); defaults to the per-user config if present"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        env = "SQLPEN_DATABASE_URL",
        help = "PostgreSQL connection string for the sandbox database"
    )]
    database_url: Option<String>,

    #[arg(long, env = "SQLPEN_POOL_MAX", help = "Maximum pooled connections")]
    pool_max: Option<u32>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => {
            let mut config = load_config(&cmd.common)?;
            if let Some(host) = cmd.host {
                config.host = host;
            }
            if let Some(port) = cmd.port {
                config.port = port;
            }
            if !cmd.allow_origin.is_empty() {
                config.allow_origins = cmd.allow_origin;
            }
            if cmd.assignments.is_some() {
                config.assignments_path = cmd.assignments;
            }
            server::serve(config).await?;
        }
        Command::Exec(cmd) => {
            let config = load_config(&cmd.common)?;
            let pool = server::build_pool(&config)?;
            let executor = SandboxExecutor::new(pool)
                .with_statement_timeout(Duration::from_millis(config.statement_timeout_ms));
            let result = executor.execute(&cmd.query).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_success() {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

fn load_config(common: &CommonArgs) -> Result<Config, Box<dyn Error>> {
    let mut config = match &common.config {
        Some(path) => Config::from_file(path)?,
        None => match Config::default_path().filter(|path| path.is_file()) {
            Some(path) => Config::from_file(&path)?,
            None => Config::default(),
        },
    };

    if let Some(url) = &common.database_url {
        config.database_url = url.clone();
    }
    if let Some(max) = common.pool_max {
        config.pool_max_connections = max;
    }
    Ok(config)
}
