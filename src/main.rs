use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use todo_api::{config::Config, server::Application, telemetry::init_telemetry};

#[derive(Debug, Parser)]
#[command(name = "todo-api", version, about = "Todo CRUD HTTP API")]
struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", env = "TODO_CONFIG_FILE")]
    config: Option<PathBuf>,
}

// Entry point of the application
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "fatal error");
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load(args.config.as_deref())?;
    init_telemetry(&config.log)?;

    tracing::debug!(
        server_address = %config.server_address(),
        database_url = %config.database.url,
        max_connections = config.database.max_connections,
        "configuration loaded"
    );

    let app = Application::build(config).await?;
    app.run().await
}
