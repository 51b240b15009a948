mod cli;
mod commands;
mod config;
mod error;
mod output;
mod presenter;
mod prompt;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use netspeed_core::SessionController;

use crate::cli::{Cli, Command};
use crate::commands::Ui;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Ctrl-C wins over whatever is in flight, including an open prompt
    let result = tokio::select! {
        result = run(cli) => result,
        Ok(()) = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
    };

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = result {
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
        // Config commands don't need a session
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "netspeed", &mut std::io::stdout());
            Ok(())
        }

        // Everything else runs against a session controller
        cmd => {
            let cfg = config::load_config()?;
            let resolved = config::resolve(&cfg, &cli.global)?;
            let ui = Ui::new(&cli.global, &cfg);

            tracing::debug!(
                endpoint = %resolved.probe.endpoint,
                preconfigured_proxy = resolved.seed.is_some(),
                "starting session controller"
            );
            let session = SessionController::from_config(&resolved.probe, resolved.seed);

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &session, &ui).await
        }
    }
}
