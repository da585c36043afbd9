//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use logiflow_core::config::AppConfig;
use logiflow_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the merged configuration
    Show,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => match format {
            OutputFormat::Json => output::print_item(config, format),
            OutputFormat::Table => {
                println!("[api]");
                output::print_item(&config.api, format);
                println!("[realtime]");
                output::print_item(&config.realtime, format);
                println!("[storage]");
                output::print_item(&config.storage, format);
                println!("[orders]");
                output::print_item(&config.orders, format);
                println!("[logging]");
                output::print_item(&config.logging, format);
            }
        },
    }

    Ok(())
}
