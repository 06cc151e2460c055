use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// Import from orabricks-core
use orabricks_core::{ConverterConfig, RuleEngine, EXAMPLE_ORACLE_SQL};

// Import CLI utilities
use orabricks::output::{self, OutputFormat};
use orabricks::panics::with_quiet_panics;

/// Exit code for a conversion that needs review, when --fail-on-review is set
const EXIT_NEEDS_REVIEW: i32 = 2;

#[derive(Parser)]
#[command(name = "orabricks")]
#[command(about = "Convert Oracle SQL scripts to Databricks SQL, flagging what needs manual review")]
struct Args {
    /// Path to the Oracle SQL script (reads stdin if not specified)
    #[arg(short, long, conflicts_with = "example")]
    input: Option<String>,

    /// Convert the built-in example script instead of reading input
    #[arg(long)]
    example: bool,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<String>,

    /// Write the conversion log to this file instead of stderr
    #[arg(long)]
    log: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Output format: text (the converted script) or json (full report)
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// List the rules in pipeline order and exit
    #[arg(long)]
    list_rules: bool,

    /// Exit with code 2 when any construct needs manual review
    #[arg(long)]
    fail_on_review: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = ConverterConfig::load(args.config.as_deref())?;
    match &args.config {
        Some(path) => debug!(path = %path, "config loaded"),
        None => debug!("using default config"),
    }
    let engine = RuleEngine::new(config)?;

    if args.list_rules {
        list_rules(&engine);
        return Ok(());
    }

    let source = if args.example {
        EXAMPLE_ORACLE_SQL.to_string()
    } else {
        output::read_input(args.input.as_deref())?
    };
    info!(bytes = source.len(), "converting script");

    let result = with_quiet_panics(|| engine.convert(&source));
    let rendered = output::write_result(
        &result,
        args.format,
        args.output.as_deref(),
        args.log.as_deref(),
    )?;

    if !result.success {
        std::process::exit(1);
    }
    if args.fail_on_review && !rendered.status.is_clean() {
        std::process::exit(EXIT_NEEDS_REVIEW);
    }
    Ok(())
}

/// Diagnostics go to stderr so stdout carries only the converted script
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn list_rules(engine: &RuleEngine) {
    println!("Rules, in the order they run:");
    for (position, rule) in engine.rules().iter().enumerate() {
        match &rule.note {
            Some(note) => println!("  {:>2}. {:<24} {}", position + 1, rule.name, note),
            None => println!("  {:>2}. {}", position + 1, rule.name),
        }
    }
}
