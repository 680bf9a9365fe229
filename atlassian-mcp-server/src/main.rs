//! Atlassian MCP Server
//!
//! Model Context Protocol server for Atlassian Jira and Confluence, with
//! API token setup backed by the system keychain.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

mod cli;
mod logging;
mod server;
mod shutdown;
mod tools;

use atlassian_mcp_shared::{
    CredentialStore, InMemorySecretStore, ProcessEnvironment, ServerSettings,
};
use cli::Cli;
use server::AtlassianMcpServer;
use shutdown::Shutdown;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&cli.logging_config()?)?;

    info!("Starting Atlassian MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let settings = ServerSettings::from_environment(&ProcessEnvironment);
    let store = if cli.no_keyring {
        warn!("System keychain disabled, API tokens will not persist across restarts");
        CredentialStore::new(
            Arc::new(InMemorySecretStore::new()),
            Arc::new(ProcessEnvironment),
        )
    } else {
        CredentialStore::system()
    };

    let server = AtlassianMcpServer::new(settings, store)?;

    info!("Atlassian MCP Server initialized, starting main loop");

    let outcome = tokio::select! {
        result = server.run() => Shutdown::from_result(result),
        _ = interrupted() => Shutdown::Interrupted,
    };

    let status = i32::from(outcome.exit_status());
    match outcome {
        Shutdown::Completed => {
            info!("Atlassian MCP Server shut down gracefully");
            Ok(ExitCode::SUCCESS)
        }
        Shutdown::Interrupted => {
            warn!("Received interrupt, shutting down");
            std::process::exit(status);
        }
        Shutdown::BrokenPipe => {
            warn!("Client closed the connection");
            std::process::exit(status);
        }
        Shutdown::Failed(e) => {
            error!("Atlassian MCP Server error: {}", e);
            Err(e.into())
        }
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
