// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use test_collator::utils::logging::{
    format_error, format_info, format_step, format_success, format_warning, init_logger,
    init_logger_with_file,
};
use test_collator::config::DEFAULT_CONFIG_PATH;
use test_collator::{CompileOutcome, Compiler, Config, ConfigSource, DuplicateStrategy};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "test_collator")]
#[command(version)]
#[command(
    about = "Compiles per-test score spreadsheets into one verified results workbook",
    long_about = None
)]
struct Cli {
    /// Defaults to config/default.toml, then to built-in settings
    #[arg(short, long, value_name = "FILE", env = "COLLATOR_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge every test file into one workbook and write the run reports
    Compile {
        input_dir: PathBuf,

        output_dir: PathBuf,

        #[arg(long, value_enum, value_name = "STRATEGY")]
        duplicate_strategy: Option<DuplicateStrategy>,

        /// Compile even when some test slots have no file
        #[arg(long)]
        allow_partial: bool,

        /// Minimum share of participants the merge must retain
        #[arg(long, value_name = "RATIO")]
        min_retention: Option<f64>,
    },

    /// Check every test file without merging
    Validate {
        input_dir: PathBuf,

        #[arg(long)]
        allow_partial: bool,
    },

    /// Show which file is bound to each test slot
    Discover { input_dir: PathBuf },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let colored = cli.color;
    colored::control::set_override(colored);

    if let Err(e) = run(cli).await {
        eprintln!("{}", format_error(&format!("{:#}", e)));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (mut config, source) =
        Config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;

    // Keep the guard alive so the execution log is flushed on exit.
    let _guard = match &cli.command {
        Commands::Compile { output_dir, .. } => {
            let log_path = output_dir.join(&config.output.execution_log);
            Some(
                init_logger_with_file(cli.color, cli.verbose, &log_path)
                    .context("Failed to open execution log")?,
            )
        }
        _ => {
            init_logger(cli.color, cli.verbose);
            None
        }
    };

    info!("Test collator");
    match source {
        ConfigSource::File(path) => info!("Loaded configuration from: {}", path.display()),
        ConfigSource::BuiltIn => warn!(
            "Config file {} not found; using built-in defaults",
            DEFAULT_CONFIG_PATH
        ),
    }

    match cli.command {
        Commands::Compile {
            input_dir,
            output_dir,
            duplicate_strategy,
            allow_partial,
            min_retention,
        } => {
            if let Some(strategy) = duplicate_strategy {
                config.compile.duplicate_strategy = strategy;
            }
            if let Some(ratio) = min_retention {
                config.compile.min_retention_ratio = ratio;
            }
            config.compile.allow_partial |= allow_partial;

            cmd_compile(config, cli.color, &input_dir, &output_dir).await?;
        }
        Commands::Validate {
            input_dir,
            allow_partial,
        } => {
            config.compile.allow_partial |= allow_partial;
            cmd_validate(config, &input_dir)?;
        }
        Commands::Discover { input_dir } => {
            cmd_discover(config, &input_dir)?;
        }
    }

    Ok(())
}

async fn cmd_compile(
    config: Config,
    colored: bool,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<()> {
    let compiler = Compiler::new(config)
        .context("Invalid configuration")?
        .with_color(colored);

    let outcome = compiler
        .compile(input_dir, output_dir)
        .await
        .with_context(|| format!("Compilation of {} failed", input_dir.display()))?;

    print_summary(&outcome);
    Ok(())
}

fn print_summary(outcome: &CompileOutcome) {
    let report = &outcome.report;
    println!(
        "{}",
        format_success(&format!(
            "Compiled {} participant(s) from {} test file(s)",
            report.output.rows,
            report.inputs.len()
        ))
    );

    if let Some(path) = &report.output_path {
        println!("  Workbook:            {}", path.display());
    }
    if let Some(manifest) = &outcome.reports {
        println!(
            "  Compilation report:  {}",
            manifest.compilation_report.display()
        );
        println!(
            "  Deduplication report: {}",
            manifest.deduplication_report.display()
        );
    }

    let dedup = &outcome.deduplication;
    if dedup.total_removed > 0 || dedup.total_flagged > 0 {
        println!(
            "{}",
            format_warning(&format!(
                "Duplicates ({}): {} removed, {} flagged",
                dedup.strategy, dedup.total_removed, dedup.total_flagged
            ))
        );
    }
    for input in report.inputs.iter().filter(|i| i.all_scores_null) {
        println!(
            "{}",
            format_warning(&format!(
                "Test {}: no score could be read from column '{}'",
                input.test, input.columns.score.header
            ))
        );
    }
}

fn cmd_validate(config: Config, input_dir: &Path) -> Result<()> {
    let allow_partial = config.compile.allow_partial;
    let compiler = Compiler::new(config).context("Invalid configuration")?;
    let batch = compiler
        .validate(input_dir)
        .with_context(|| format!("Could not validate {}", input_dir.display()))?;

    let total = batch.outcomes.len();
    for (position, (slot, outcome)) in batch.outcomes.iter().enumerate() {
        let label = format!("Test {}: {}", slot, outcome.file.display());
        let line = if outcome.passed {
            format_success(&label)
        } else {
            format_error(&format!("{} - {}", label, outcome.reason))
        };
        println!("{} {}", format_step(position + 1, total, "validate"), line);
    }
    for slot in &batch.missing {
        println!(
            "{}",
            format_warning(&format!("Test {}: no matching file", slot))
        );
    }

    if !batch.all_passed {
        let failed = batch.outcomes.iter().filter(|(_, o)| !o.passed).count();
        bail!("{} of {} file(s) failed validation", failed, total);
    }
    if total == 0 {
        bail!("No test files found in {}", input_dir.display());
    }

    println!("{}", format_success("All test files found passed validation"));
    if !batch.missing.is_empty() && !allow_partial {
        println!(
            "{}",
            format_warning(&format!(
                "{} test slot(s) have no file; compile needs --allow-partial to proceed",
                batch.missing.len()
            ))
        );
    }
    Ok(())
}

fn cmd_discover(config: Config, input_dir: &Path) -> Result<()> {
    let compiler = Compiler::new(config).context("Invalid configuration")?;
    let discovery = compiler
        .discover(input_dir)
        .with_context(|| format!("Could not scan {}", input_dir.display()))?;

    for (slot, path) in &discovery.files {
        println!("{}", format_info(&format!("Test {}: {}", slot, path.display())));
    }

    for slot in &discovery.missing {
        println!(
            "{}",
            format_warning(&format!("Test {}: no matching file", slot))
        );
    }
    discovery.require_complete().with_context(|| {
        format!(
            "{} of {} test slot(s) bound",
            discovery.files.len(),
            discovery.expected
        )
    })?;

    println!(
        "{}",
        format_success(&format!("All {} test slots bound", discovery.expected))
    );
    Ok(())
}
