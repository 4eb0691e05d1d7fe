//! Logging for the `weave` binary.
//!
//! Records from `weave-core` and the CLI go through `env_logger` to stderr,
//! leaving stdout to tables and assembled documents.

use env_logger::{Builder, Target, WriteStyle};

use crate::OutputFormat;

/// Used when neither `--log` nor `RUST_LOG` is set.
const DEFAULT_FILTER: &str = "warn";

/// `--log` wins over `RUST_LOG`; an empty value counts as unset.
fn filter_spec(flag: Option<&str>, env: Option<String>) -> String {
    flag.map(str::to_string)
        .or(env)
        .filter(|spec| !spec.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// JSON mode writes error documents to stderr, so no color codes there.
fn write_style(output: OutputFormat) -> WriteStyle {
    match output {
        OutputFormat::Text => WriteStyle::Auto,
        OutputFormat::Json => WriteStyle::Never,
    }
}

/// Installs the global logger. Later calls leave the first logger in place.
pub fn init(flag: Option<&str>, output: OutputFormat) {
    let spec = filter_spec(flag, std::env::var("RUST_LOG").ok());
    let mut builder = Builder::new();
    builder
        .parse_filters(&spec)
        .write_style(write_style(output))
        .format_timestamp(None)
        .target(Target::Stderr);
    if builder.try_init().is_ok() {
        log::debug!("logging to stderr with filter '{}'", spec);
    }
}
