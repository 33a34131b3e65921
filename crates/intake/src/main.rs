// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intake - an order-intake chat bot.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod orders;
mod serve;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use intake_config::{ConfigError, IntakeConfig};

/// Intake - an order-intake chat bot.
#[derive(Parser, Debug)]
#[command(name = "intake", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot until interrupted.
    Serve,
    /// Inspect stored orders.
    Orders {
        #[command(subcommand)]
        action: Option<OrdersAction>,
        /// Only orders placed by this user.
        #[arg(long)]
        user: Option<i64>,
        /// Show at most this many orders.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Check configuration, database and Telegram connectivity.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[derive(Subcommand, Debug)]
enum OrdersAction {
    /// Show a single order in full.
    Show {
        /// Order id.
        id: i64,
    },
}

fn load_config(path: Option<&Path>) -> Result<IntakeConfig, Vec<ConfigError>> {
    match path {
        Some(path) => intake_config::load_and_validate_path(path),
        None => intake_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => {
            eprintln!("intake: config loaded (bot.name={})", config.bot.name);
            config
        }
        Err(errors) => {
            intake_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Orders {
            action,
            user,
            limit,
            json,
            plain,
        }) => match action {
            Some(OrdersAction::Show { id }) => orders::run_show(&config, id, json, plain).await,
            None => orders::run_list(&config, user, limit, json, plain).await,
        },
        Some(Commands::Doctor { plain }) => {
            doctor::run_doctor(&config, cli.config.as_deref(), plain).await
        }
        None => {
            println!("intake: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_orders_filters() {
        let cli = Cli::try_parse_from(["intake", "orders", "--user", "42", "--limit", "5"]).unwrap();
        match cli.command {
            Some(Commands::Orders {
                action: None,
                user,
                limit,
                ..
            }) => {
                assert_eq!(user, Some(42));
                assert_eq!(limit, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_orders_show() {
        let cli = Cli::try_parse_from(["intake", "orders", "show", "7"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Orders {
                action: Some(OrdersAction::Show { id: 7 }),
                ..
            })
        ));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["intake", "doctor", "--config", "/tmp/x.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/x.toml")));
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intake.toml");
        std::fs::write(&path, "[bot]\nname = \"pizza-intake\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.bot.name, "pizza-intake");
    }
}
