//! Sync relay CLI
//!
//! Command-line entry point for the sync relay.
//!
//! # Commands
//!
//! - `serve` - Run the HTTP relay (`--memory` with `--tenant` for a self-contained instance)
//! - `version` - Show version information
//!
//! Configuration comes from the environment; a `.env` file in the working
//! directory is loaded first when present.

mod commands;

use clap::{Parser, Subcommand};
use syncrelay_store::Tenant;
use tracing_subscriber::EnvFilter;

/// Token-gated sync relay.
#[derive(Parser)]
#[command(name = "syncrelay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP relay
    Serve {
        /// Use an in-memory store instead of PostgreSQL
        #[arg(long)]
        memory: bool,

        /// Tenant for the in-memory store, as client_id:access_token:db_user:db_password
        #[arg(
            long = "tenant",
            env = "SYNCRELAY_TENANTS",
            value_delimiter = ',',
            value_parser = commands::serve::parse_tenant
        )]
        tenants: Vec<Tenant>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve { memory, tenants } => commands::serve::run(memory, tenants).await?,
        Commands::Version => {
            println!("syncrelay v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_memory_flag() {
        let cli = Cli::parse_from(["syncrelay", "serve", "--memory"]);
        assert!(matches!(cli.command, Commands::Serve { memory: true, .. }));
        assert!(!cli.verbose);
    }

    #[test]
    fn serve_memory_tenants() {
        let cli = Cli::parse_from([
            "syncrelay",
            "serve",
            "--memory",
            "--tenant",
            "c1:t1:u1:p1,c2:t2:u2:p2",
            "--tenant",
            "c3:t3:u3:p3",
        ]);
        let Commands::Serve { tenants, .. } = cli.command else {
            panic!("expected serve");
        };
        let ids: Vec<_> = tenants.iter().map(|t| t.client_id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2", "c3"]);
    }

    #[test]
    fn malformed_tenant_is_rejected() {
        let result = Cli::try_parse_from(["syncrelay", "serve", "--memory", "--tenant", "c1:t1"]);
        assert!(result.is_err());
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::parse_from(["syncrelay", "version", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Version));
    }
}
