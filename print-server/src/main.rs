use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use print_server::core::state::build_printer;
use print_server::{Cli, CliCommand, Config, Server, ServerState, print_banner, setup_environment};
use station_printer::Printer;

#[tokio::main]
async fn main() -> ExitCode {
    // .env before clap so its values act as environment defaults
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = setup_environment(&cli.config) {
        eprintln!("Failed to prepare work directory: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command.unwrap_or(CliCommand::Serve) {
        CliCommand::Serve => serve(cli.config).await,
        CliCommand::Test => print_test_receipt(&cli.config).await,
        CliCommand::Config => {
            println!("{}", cli.config);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate().context("Invalid configuration")?;

    print_banner();
    tracing::info!("Station 134 print server starting...");
    tracing::info!("\n{}", config);

    let state = ServerState::initialize(&config).context("Failed to initialize server state")?;

    if config.dispatcher_enabled {
        state
            .printer
            .test_connection()
            .await
            .with_context(|| format!("Printer {} unreachable", state.printer.addr()))?;
        tracing::info!(printer = %state.printer.addr(), "Printer reachable");
    }

    Server::new(config, state)
        .run()
        .await
        .context("Server error")?;
    Ok(())
}

async fn print_test_receipt(config: &Config) -> anyhow::Result<()> {
    config.validate().context("Invalid configuration")?;

    let printer = build_printer(config)?;
    let renderer = print_server::ReceiptRenderer::new(config.timezone, config.printer_charset)
        .with_open_drawer(config.printer_open_drawer);

    printer
        .print(&renderer.render_test(Utc::now()))
        .await
        .with_context(|| format!("Test print to {} failed", printer.addr()))?;

    tracing::info!(printer = %printer.addr(), "Test receipt printed");
    println!("Test receipt sent to {}", printer.addr());
    Ok(())
}
