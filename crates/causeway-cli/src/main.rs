// ABOUTME: Entry point for the causeway CLI.
// ABOUTME: Parses arguments, wires cancellation, and dispatches login/logout.

mod diagnostics;
mod login;
mod logout;

use anyhow::Result;
use causeway_auth::TokenAcquirer;
use causeway_host::DiscoveryClient;
use clap::{Parser, Subcommand};
use colored::Colorize;
use login::LoginFlow;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "causeway")]
#[command(about = "Command-line access to causeway service hosts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Obtain and save a credential for a remote host
    Login {
        /// Host to log in to (defaults to app.causeway.dev)
        hostname: Option<String>,

        /// Override the credentials file the token is written to
        #[arg(long = "into-file")]
        into_file: Option<PathBuf>,

        /// Abort the login if approval takes longer than this many seconds
        #[arg(long, default_value_t = 900)]
        timeout: u64,
    },

    /// Remove the saved credential for a remote host
    Logout {
        /// Host to log out from (defaults to app.causeway.dev)
        hostname: Option<String>,

        /// Override the credentials file the token is removed from
        #[arg(long = "into-file")]
        into_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Login {
            hostname,
            into_file,
            timeout,
        } => run_login(hostname, into_file, timeout).await,
        Commands::Logout {
            hostname,
            into_file,
        } => run_logout(hostname, into_file),
    }
}

/// Run the interactive login flow
async fn run_login(
    hostname: Option<String>,
    into_file: Option<PathBuf>,
    timeout: u64,
) -> Result<()> {
    let raw = hostname.unwrap_or_default();

    // Ctrl-C aborts the pending handshake instead of killing the process
    // mid-write.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let discoverer = DiscoveryClient::new()?;
    let acquirer = TokenAcquirer::new(Duration::from_secs(timeout))?;
    let flow = LoginFlow::new(discoverer, acquirer, into_file);

    match flow.run(&raw, cancel).await {
        Ok(report) => {
            println!();
            println!(
                "{}",
                format!("Logged in to {}.", report.hostname.display())
                    .green()
                    .bold()
            );
            println!();
            println!(
                "  Credentials saved to: {}",
                report.credentials_path.display()
            );
            Ok(())
        }
        Err(diagnostics) => {
            diagnostics.report();
            if diagnostics.has_errors() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Remove the stored credential for a host
fn run_logout(hostname: Option<String>, into_file: Option<PathBuf>) -> Result<()> {
    let raw = hostname.unwrap_or_default();

    match logout::run(&raw, into_file) {
        Ok(report) if report.removed => {
            println!(
                "{}",
                format!("Logged out of {}.", report.hostname.display())
                    .green()
                    .bold()
            );
            println!(
                "  Credential removed from: {}",
                report.credentials_path.display()
            );
            Ok(())
        }
        Ok(report) => {
            println!(
                "No credential was stored for {}.",
                report.hostname.display()
            );
            Ok(())
        }
        Err(diagnostics) => {
            diagnostics.report();
            if diagnostics.has_errors() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
