mod catalog;
mod logging;
mod render;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use weave_core::{Event, RootTables};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Weave binding-table compiler.
#[derive(Parser)]
#[command(name = "weave", version, about = "Weave binding-table compiler")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Log filter in env_logger syntax (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the bundled catalog and print its binding tables
    Tables {
        /// Only print the root with this local name
        #[arg(long)]
        root: Option<String>,
    },

    /// Assemble a document from a JSON event file using the catalog tables
    Assemble {
        /// Path to a JSON array of events
        events: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    logging::init(cli.log.as_deref(), cli.output);

    match cli.command {
        Commands::Tables { root } => {
            cmd_tables(root.as_deref(), cli.output);
        }
        Commands::Assemble { events } => {
            cmd_assemble(&events, cli.output);
        }
    }
}

fn compile_catalog(output: OutputFormat) -> RootTables {
    match catalog::tables() {
        Ok(tables) => tables,
        Err(e) => {
            report_json(&e.to_json_value(), output);
            process::exit(1);
        }
    }
}

fn cmd_tables(root: Option<&str>, output: OutputFormat) {
    let tables = compile_catalog(output);
    let summaries: Vec<_> = tables
        .summaries()
        .into_iter()
        .filter(|(name, _)| root.map_or(true, |r| name.local_name == r))
        .collect();

    if summaries.is_empty() {
        if let Some(r) = root {
            report_error(&format!("no root table named '{}'", r), output);
            process::exit(1);
        }
    }

    match output {
        OutputFormat::Json => {
            let value: Vec<serde_json::Value> = summaries
                .iter()
                .map(|(name, summary)| {
                    serde_json::json!({
                        "root": name.to_string(),
                        "table": summary,
                    })
                })
                .collect();
            let pretty = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            for (name, summary) in &summaries {
                print!("{}", render::render_table(&name.to_string(), summary));
            }
        }
    }
}

fn cmd_assemble(events_path: &Path, output: OutputFormat) {
    let events_str = match std::fs::read_to_string(events_path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", events_path.display(), e);
            report_error(&msg, output);
            process::exit(1);
        }
    };

    let events: Vec<Event> = match serde_json::from_str(&events_str) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing events in '{}': {}", events_path.display(), e);
            report_error(&msg, output);
            process::exit(1);
        }
    };

    let tables = compile_catalog(output);
    let value = match weave_core::assemble(&tables, events) {
        Ok(value) => value,
        Err(e) => {
            report_json(&e.to_json_value(), output);
            process::exit(1);
        }
    };

    match catalog::to_json(value) {
        Some(json) => {
            let pretty = serde_json::to_string_pretty(&json)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        None => {
            report_error("assembled value is not a catalog type", output);
            process::exit(1);
        }
    }
}

/// Report a structured error: pretty JSON under `--output json`, the bare
/// message otherwise.
fn report_json(err: &serde_json::Value, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let err_json =
                serde_json::to_string_pretty(err).unwrap_or_else(|_| err.to_string());
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            let msg = err["message"].as_str().unwrap_or_default();
            eprintln!("error: {}", msg);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat) {
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
