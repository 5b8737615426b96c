mod app;
mod commands;
mod render;
mod utils;

use std::env;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use urd_core::config::UrdConfig;

#[derive(Parser)]
#[command(name = "urd")]
#[command(about = "Lay out your remind and task events as an hourly schedule")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the schedule around a date
    View {
        /// Day to show (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Slot size in minutes (15, 30 or 60)
        #[arg(short, long)]
        increment: Option<u32>,

        /// Screen rows for the schedule grid
        #[arg(long, default_value_t = 24)]
        rows: u16,

        /// Screen columns, including the time column
        #[arg(long, default_value_t = 80)]
        width: u16,
    },
    /// List events grouped by day
    Events {
        /// Show events from this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Show events until this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
    /// Add a reminder, e.g. `urd add "fri 3pm" Call the bank`
    Add {
        /// When, in natural language ("tomorrow 6pm", "mar 20")
        when: String,

        /// Reminder text; without it the template line is opened in the editor
        description: Vec<String>,

        /// How long ("30m", "1h 30m"); timed reminders only
        #[arg(short, long)]
        duration: Option<String>,
    },
    /// Remove a reminder from the first reminder file
    Remove {
        /// Line number (1-indexed)
        #[arg(required_unless_present = "matching")]
        line: Option<u32>,

        /// Remove the first line containing this text instead
        #[arg(long, conflicts_with = "line")]
        matching: Option<String>,
    },
    /// Find the next event matching a term, starting now
    Search { term: String },
    /// Open the first reminder file in the editor
    Edit {
        /// Line to jump to, defaults to the end of the file
        #[arg(short, long)]
        line: Option<u32>,
    },
    /// Live schedule driven by line commands on stdin
    Watch {
        #[arg(long, default_value_t = 24)]
        rows: u16,

        #[arg(long, default_value_t = 80)]
        width: u16,
    },
    /// Check that every configured source can be run
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = UrdConfig::load()?;

    match cli.command {
        None => commands::view::run(&config, None, None, 24, 80).await,
        Some(Commands::View {
            date,
            increment,
            rows,
            width,
        }) => commands::view::run(&config, date, increment, rows, width).await,
        Some(Commands::Events { from, to }) => {
            commands::events::run(&config, from.as_deref(), to.as_deref()).await
        }
        Some(Commands::Add {
            when,
            description,
            duration,
        }) => commands::add::run(&config, &when, &description.join(" "), duration.as_deref()).await,
        Some(Commands::Remove { line, matching }) => commands::remove::run(&config, line, matching),
        Some(Commands::Search { term }) => commands::search::run(&config, &term).await,
        Some(Commands::Edit { line }) => commands::edit::run(&config, line).await,
        Some(Commands::Watch { rows, width }) => commands::watch::run(&config, rows, width).await,
        Some(Commands::Check) => commands::check::run(&config).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("URD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "urd=debug,info"
        } else {
            "urd=info,warn"
        })
    });

    let format = env::var("URD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}
