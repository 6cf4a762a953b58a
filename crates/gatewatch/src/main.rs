mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gatewatch_core::Session;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "gatewatch", &mut std::io::stdout());
            Ok(())
        }

        // Orchestrator commands don't need a stream session
        Command::Devices(args) => commands::devices::handle(args, &cli.global).await,

        // All other commands drive a stream session
        cmd => {
            let file_config = config::load_config_or_default();
            let url = config::resolve_stream_url(&cli.global, &file_config);

            let capacity = match cmd {
                Command::Watch(ref args) => args.capacity,
                _ => None,
            };
            let session = Session::new(config::session_config(&file_config, capacity));

            tracing::debug!(url, command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &session, &url, &cli.global).await
        }
    }
}
