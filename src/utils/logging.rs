// file: src/utils/logging.rs
// description: Tracing subscriber initialization with optional ANSI coloring
//              and a json-lines execution log

use crate::error::{CompileError, Result};
use colored::*;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Console logging only.
pub fn init_logger(colored_output: bool, verbose: bool) {
    let fmt_layer = console_layer(colored_output);

    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(fmt_layer)
        .init();
}

/// Console logging plus one json object per line in `log_path`.
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_logger_with_file(
    colored_output: bool,
    verbose: bool,
    log_path: &Path,
) -> Result<WorkerGuard> {
    let directory = log_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(directory).map_err(|source| CompileError::FileOperation {
        path: directory.to_path_buf(),
        source,
    })?;

    let file_name = log_path
        .file_name()
        .ok_or_else(|| CompileError::Config(format!("invalid log path {}", log_path.display())))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .with_target(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(console_layer(colored_output))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn console_layer<S>(colored_output: bool) -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_ansi(colored_output)
}

pub fn format_success(msg: &str) -> String {
    format!("{} {}", "✓".green().bold(), msg.green())
}

pub fn format_error(msg: &str) -> String {
    format!("{} {}", "✗".red().bold(), msg.red())
}

pub fn format_warning(msg: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), msg.yellow())
}

pub fn format_info(msg: &str) -> String {
    format!("{} {}", "ℹ".blue().bold(), msg)
}

pub fn format_step(step: usize, total: usize, msg: &str) -> String {
    format!("{} {}", format!("[{}/{}]", step, total).cyan().bold(), msg)
}
