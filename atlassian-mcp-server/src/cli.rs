//! Command line arguments

use anyhow::{Context, Result};
use atlassian_mcp_shared::{LogLevel, LoggingConfig};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Atlassian MCP Server - Model Context Protocol access to Jira and Confluence
#[derive(Parser, Debug)]
#[command(name = "atlassian-mcp-server", author, version, about, long_about = None)]
pub struct Cli {
    /// Log level (TRACE, DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(long, default_value = "INFO", value_parser = parse_log_level)]
    pub log_level: LogLevel,

    /// Append logs to this file in addition to stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Write the log file as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Keep API tokens in memory instead of the system keychain
    #[arg(long)]
    pub no_keyring: bool,
}

fn parse_log_level(value: &str) -> std::result::Result<LogLevel, String> {
    value.parse::<LogLevel>().map_err(|_| {
        format!("invalid log level '{value}' (expected TRACE, DEBUG, INFO, WARNING, ERROR or CRITICAL)")
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    Ok(cwd.join(path))
}

impl Cli {
    pub fn logging_config(&self) -> Result<LoggingConfig> {
        let log_file = self.log_file.as_deref().map(absolute).transpose()?;

        Ok(LoggingConfig {
            level: self.log_level,
            log_file,
            json: self.log_json,
        })
    }
}
