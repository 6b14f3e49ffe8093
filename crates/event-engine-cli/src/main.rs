//! `event-engine` CLI — expand recurring events in a JSON catalog.
//!
//! ## Usage
//!
//! ```sh
//! # Expand a catalog (stdin → stdout)
//! cat catalog.json | event-engine expand
//!
//! # Expand from file to file, pretty-printed
//! event-engine expand -i catalog.json -o expanded.json --pretty
//!
//! # Clamp "fifth Friday" recurrences to the last Friday of short months
//! event-engine expand -i catalog.json --fifth-week clamp
//!
//! # Skip unknown frequencies / repeat codes with a warning instead of failing
//! event-engine expand -i catalog.json --lenient
//!
//! # List every occurrence, sorted by start
//! event-engine instances -i catalog.json
//!
//! # Print the aggregated event categories
//! event-engine categories -i catalog.json
//! ```
//!
//! Logs go to stderr; `-v` / `-vv` or `RUST_LOG` control verbosity.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use event_engine::datemath::format_timestamp;
use event_engine::{
    expand_all, Expansion, ExpansionOptions, FifthWeekPolicy, MemoryCatalog, MemoryTaxonomy,
    Record,
};
use std::io::{self, IsTerminal, Read};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "event-engine",
    version,
    about = "Expand recurring event records into dated catalog instances"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a catalog and write it back as JSON
    Expand {
        /// Input catalog file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Print one line per occurrence: start, end, route
    Instances {
        /// Input catalog file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Print the sorted event categories of a catalog
    Categories {
        /// Input catalog file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[command(flatten)]
        options: OptionArgs,
    },
}

#[derive(Args)]
struct OptionArgs {
    /// Months after start used as `until` when a recurring event has none
    #[arg(long, default_value_t = 6)]
    default_until_months: u32,
    /// Monthly occurrences in a week the month does not have
    #[arg(long, value_enum, default_value_t = FifthWeek::Skip)]
    fifth_week: FifthWeek,
    /// Warn about unknown frequencies or repeat codes instead of failing
    #[arg(long)]
    lenient: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FifthWeek {
    Skip,
    Clamp,
}

impl From<&OptionArgs> for ExpansionOptions {
    fn from(args: &OptionArgs) -> Self {
        ExpansionOptions {
            default_until_months: args.default_until_months,
            fifth_week: match args.fifth_week {
                FifthWeek::Skip => FifthWeekPolicy::Skip,
                FifthWeek::Clamp => FifthWeekPolicy::ClampToLast,
            },
            strict: !args.lenient,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Expand {
            input,
            output,
            pretty,
            options,
        } => {
            let (catalog, _) = run(input.as_deref(), &options)?;
            let records = catalog.into_records();
            let json = if pretty {
                serde_json::to_string_pretty(&records)?
            } else {
                serde_json::to_string(&records)?
            };
            write_output(output.as_deref(), &json)?;
        }
        Commands::Instances { input, options } => {
            let (catalog, _) = run(input.as_deref(), &options)?;
            let mut rows: Vec<_> = catalog
                .records()
                .iter()
                .filter_map(|r| r.schedule.as_ref().map(|s| (s.start, s.end, r.route.as_str())))
                .collect();
            rows.sort();
            for (start, end, route) in rows {
                println!(
                    "{}\t{}\t{}",
                    format_timestamp(start),
                    format_timestamp(end),
                    route
                );
            }
        }
        Commands::Categories { input, options } => {
            let (_, expansion) = run(input.as_deref(), &options)?;
            for category in expansion.event_categories() {
                println!("{}", category);
            }
        }
    }

    Ok(())
}

/// Load the catalog and run one full expansion pass over it.
fn run(input: Option<&str>, options: &OptionArgs) -> Result<(MemoryCatalog, Expansion)> {
    let json = read_input(input)?;
    let records: Vec<Record> =
        serde_json::from_str(&json).context("Failed to parse catalog JSON")?;
    let mut catalog = MemoryCatalog::from_records(records).context("Invalid catalog")?;
    let mut taxonomy = MemoryTaxonomy::new();

    let expansion = expand_all(&mut catalog, &mut taxonomy, &ExpansionOptions::from(options))
        .context("Failed to expand events")?;

    let report = &expansion.report;
    if !report.warnings.is_empty() {
        warn!(count = report.warnings.len(), "catalog expanded with warnings");
    }
    info!(
        input = input.unwrap_or("<stdin>"),
        records = catalog.len(),
        added = expansion.instances_added(),
        categories = expansion.categories.len(),
        "catalog expanded"
    );
    Ok((catalog, expansion))
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
