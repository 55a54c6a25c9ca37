//! Matchday CLI - Main entry point

use std::process;

use clap::Parser;
use matchday_client::{
    Cli, ClientConfig, CredentialStore, NoopObserver, PollOutcome, PollingClient, SessionSignal,
};
use matchday_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Verbose mode logs debug to console, otherwise only warnings
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("matchday-cli")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // CLI should work without logging
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> matchday_client::Result<()> {
    let mut config = ClientConfig::from_env()?;
    config.server_url = cli.server_url.clone();
    if let Some(max_retries) = cli.max_retries {
        config.max_retries = max_retries;
    }

    let credentials = match &cli.token {
        Some(token) => CredentialStore::with_token(token.as_str()),
        None => CredentialStore::new(),
    };
    let client = PollingClient::new(config, credentials, SessionSignal::new())?;
    let spec = cli.command.request_spec()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling request");
            on_interrupt.cancel();
        }
    });

    match client
        .execute::<serde_json::Value>(&spec, &cancel, &NoopObserver)
        .await?
    {
        PollOutcome::Ready(Some(body)) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
        },
        PollOutcome::Ready(None) => println!("(no content)"),
        PollOutcome::Cancelled => eprintln!("Cancelled"),
    }

    Ok(())
}
