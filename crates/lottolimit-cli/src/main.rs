//! lottolimit - command-line client for the betting-limit service.
//!
//! Records bets against 2-digit and 3-digit numbers, shows how close each
//! number is to its limit, and manages settings, users and the activity log.

mod commands;
mod output;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use lottolimit_core::models::{LimitCategory, StatusFilter};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Context;

#[derive(Parser, Debug)]
#[command(name = "lottolimit", version, about = "Track wagered amounts against per-number limits")]
struct Cli {
    /// Base URL of the limits service (overrides LOTTOLIMIT_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session for 24 hours
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Totals per category, near-limit alerts and active numbers
    Dashboard,
    /// List the limit table of one category
    Limits {
        /// 2digit, 3digit-tode or 3digit-teng
        category: LimitCategory,
        /// all, has-amount, near-limit or over-limit
        #[arg(long, default_value = "all")]
        filter: StatusFilter,
        /// Only numbers containing these digits
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a wagered amount to a number
    Bet {
        category: LimitCategory,
        number: String,
        amount: f64,
    },
    /// Set the limit of one number, keeping its amount
    SetLimit {
        category: LimitCategory,
        number: String,
        limit: f64,
    },
    /// Delete one 3-digit record
    DeleteLimit {
        category: LimitCategory,
        number: String,
    },
    /// Give every number of a category the same limit (2-digit: 00-99, 3-digit: stored numbers)
    DefaultLimit {
        category: LimitCategory,
        limit: f64,
        #[arg(long)]
        yes: bool,
    },
    /// Zero every amount of a category, keeping limits
    ResetAmounts {
        category: LimitCategory,
        #[arg(long)]
        yes: bool,
    },
    /// Activity log
    #[command(subcommand)]
    Transactions(TransactionsCommand),
    /// Alert threshold and default limits
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Account management
    #[command(subcommand)]
    Users(UsersCommand),
    /// Save a full snapshot of the service state to a file
    Export { file: PathBuf },
    /// Replace the service state with a snapshot file
    Import {
        file: PathBuf,
        #[arg(long)]
        yes: bool,
    },
    /// Zero all amounts in every category, keeping limits
    ClearAmounts {
        #[arg(long)]
        yes: bool,
    },
    /// Delete all limits, amounts and transactions
    ClearAll {
        #[arg(long)]
        yes: bool,
    },
    /// Show what the service reports about its database
    DbInfo,
}

#[derive(Subcommand, Debug)]
enum TransactionsCommand {
    /// List logged transactions, newest first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete one transaction by id
    Delete { id: String },
    /// Delete every transaction
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    /// Set the near-limit alert threshold in percent (1-100)
    Threshold { percent: u32 },
    /// Set the default limits used for numbers without a record
    Defaults {
        #[arg(long)]
        two: Option<f64>,
        #[arg(long)]
        tode: Option<f64>,
        #[arg(long)]
        teng: Option<f64>,
    },
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    List,
    Add { username: String },
    /// Change the signed-in user's password
    Passwd,
    Delete {
        username: String,
        #[arg(long)]
        yes: bool,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "lottolimit.log".into());
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref());
    info!(command = ?cli.command, "lottolimit starting");

    let mut ctx = Context::new(cli.api_url.as_deref(), cli.json)?;

    match cli.command {
        Command::Login { username } => commands::login(&mut ctx, username).await,
        Command::Logout => commands::logout(&mut ctx),
        Command::Whoami => commands::whoami(&ctx),
        Command::Dashboard => commands::dashboard(&ctx).await,
        Command::Limits { category, filter, search } => {
            commands::limits(&ctx, category, filter, search.as_deref()).await
        }
        Command::Bet { category, number, amount } => commands::bet(&ctx, category, &number, amount).await,
        Command::SetLimit { category, number, limit } => commands::set_limit(&ctx, category, &number, limit).await,
        Command::DeleteLimit { category, number } => commands::delete_limit(&ctx, category, &number).await,
        Command::DefaultLimit { category, limit, yes } => commands::default_limit(&ctx, category, limit, yes).await,
        Command::ResetAmounts { category, yes } => commands::reset_amounts(&ctx, category, yes).await,
        Command::Transactions(cmd) => match cmd {
            TransactionsCommand::List { limit } => commands::list_transactions(&ctx, limit).await,
            TransactionsCommand::Delete { id } => commands::delete_transaction(&ctx, &id).await,
            TransactionsCommand::Clear { yes } => commands::clear_transactions(&ctx, yes).await,
        },
        Command::Settings(cmd) => match cmd {
            SettingsCommand::Show => commands::show_settings(&ctx).await,
            SettingsCommand::Threshold { percent } => commands::set_threshold(&ctx, percent).await,
            SettingsCommand::Defaults { two, tode, teng } => commands::set_defaults(&ctx, two, tode, teng).await,
        },
        Command::Users(cmd) => match cmd {
            UsersCommand::List => commands::list_users(&ctx).await,
            UsersCommand::Add { username } => commands::add_user(&ctx, &username).await,
            UsersCommand::Passwd => commands::change_password(&mut ctx).await,
            UsersCommand::Delete { username, yes } => commands::delete_user(&ctx, &username, yes).await,
        },
        Command::Export { file } => commands::export(&ctx, &file).await,
        Command::Import { file, yes } => commands::import(&ctx, &file, yes).await,
        Command::ClearAmounts { yes } => commands::clear_amounts(&ctx, yes).await,
        Command::ClearAll { yes } => commands::clear_all(&ctx, yes).await,
        Command::DbInfo => commands::db_info(&ctx).await,
    }
}
