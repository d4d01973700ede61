//! # packgen
//!
//! Generates MessagePack codecs from Rust schema files.
//!
//! ## Usage
//!
//! ```bash
//! # Generate codecs for every schema under ./schema
//! packgen generate
//!
//! # Generate specific files into a directory, with round-trip tests
//! packgen generate -i schema/user.rs -i schema/events -o src/generated --tests
//!
//! # Preview without writing
//! packgen generate --dry-run
//!
//! # Fail (exit code 2) when generated files are out of date
//! packgen check
//!
//! # Inspect the resolved type graph
//! packgen dump -i schema/user.rs
//!
//! # Write a default packgen.toml
//! packgen init
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use packgen_cli::{
    config::{CliArgs, Config, ConfigManager, CONFIG_FILENAME},
    error::CliError,
    pipeline::{Batch, UnitGenerator},
    scanner::SourceScanner,
    writer::{Freshness, OutputWriter, WriteResult},
};

#[derive(Parser)]
#[command(name = "packgen")]
#[command(author, version, about = "Generate MessagePack codecs from Rust schema files", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that generate units.
#[derive(Args)]
struct UnitArgs {
    /// Schema file or directory; repeatable. Defaults to the configured paths.
    #[arg(short, long = "input")]
    inputs: Vec<PathBuf>,

    /// Output directory. Defaults to next to each input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also emit round-trip test files
    #[arg(long)]
    tests: bool,

    /// Format outputs with rustfmt
    #[arg(long)]
    rustfmt: bool,

    /// Fail a file when any of its types fails
    #[arg(long)]
    strict: bool,

    /// Filter schema files by path pattern (glob)
    #[arg(long)]
    filter: Option<String>,

    /// Runtime crate path used by generated code
    #[arg(long)]
    runtime: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate codecs for schema files
    Generate {
        #[command(flatten)]
        unit: UnitArgs,

        /// Preview changes without writing files
        #[arg(long)]
        dry_run: bool,
    },

    /// Verify that generated files are up to date
    Check {
        #[command(flatten)]
        unit: UnitArgs,
    },

    /// Print the resolved type graph of a schema file as JSON
    Dump {
        /// Schema file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new packgen configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = CONFIG_FILENAME)]
        output: PathBuf,

        /// Overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate { unit, dry_run } => cmd_generate(unit, dry_run),
        Commands::Check { unit } => cmd_check(unit),
        Commands::Dump { input } => cmd_dump(&input),
        Commands::Init { output, force } => cmd_init(&output, force),
    }
}

fn load_config(args: &UnitArgs) -> anyhow::Result<Config> {
    let config = ConfigManager::load(args.config.as_deref())?;
    let config = ConfigManager::merge_cli_args(
        config,
        &CliArgs {
            inputs: args.inputs.clone(),
            filter: args.filter.clone(),
            output: args.output.clone(),
            tests: args.tests.then_some(true),
            rustfmt: args.rustfmt.then_some(true),
            runtime: args.runtime.clone(),
            strict: args.strict.then_some(true),
        },
    );
    config.validate().map_err(CliError::from)?;
    Ok(config)
}

/// Scans the configured inputs and generates every unit in memory.
fn build(config: &Config) -> anyhow::Result<Option<Batch>> {
    println!("{}", "Scanning for schema files...".cyan());

    let mut scanner = SourceScanner::new(config.input.paths.iter().cloned());
    if let Some(pattern) = &config.input.filter {
        scanner = scanner.with_filter(pattern).map_err(CliError::from)?;
    }
    let files = scanner.scan_allow_empty()?;
    if files.is_empty() {
        println!("{}", "No schema files found.".yellow());
        return Ok(None);
    }
    println!("  Found {} schema file(s)", files.len().to_string().green());

    println!("{}", "Generating codecs...".cyan());
    let batch = UnitGenerator::new(config).generate_all(&files);

    for unit in &batch.units {
        for warning in &unit.warnings {
            println!("  {} {}: {}", "Warning:".yellow(), unit.source.display(), warning);
        }
    }
    for failure in &batch.failures {
        println!("  {} {}", "Failed:".red(), failure);
    }
    let types: usize = batch.units.iter().map(|u| u.generated).sum();
    println!(
        "  Generated {} type(s) in {} file(s)",
        types.to_string().green(),
        batch.units.len().to_string().green()
    );
    Ok(Some(batch))
}

fn fail_on_errors(batch: &Batch) -> anyhow::Result<()> {
    match batch.failures.len() {
        0 => Ok(()),
        n => anyhow::bail!("{n} schema file(s) failed to generate"),
    }
}

fn cmd_generate(args: UnitArgs, dry_run: bool) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let Some(batch) = build(&config)? else {
        return Ok(());
    };

    let writer = OutputWriter::new(dry_run);
    let files = batch.units.iter().flat_map(|u| u.files.iter());
    let summary = writer.write_all(files, |result| match result {
        WriteResult::Created { path, bytes } => {
            println!("{} Created {} ({} bytes)", "✓".green(), path.display(), bytes);
        }
        WriteResult::Updated { path, bytes } => {
            println!("{} Updated {} ({} bytes)", "✓".green(), path.display(), bytes);
        }
        WriteResult::Unchanged { path } => {
            println!("{} Unchanged {}", "·".dimmed(), path.display());
        }
        WriteResult::DryRun {
            path,
            content,
            freshness,
        } => {
            let verb = match freshness {
                Freshness::Missing => "create",
                Freshness::Outdated => "update",
                Freshness::Current => "keep",
            };
            println!("{} Would {} {}:", "[dry-run]".yellow(), verb, path.display());
            if *freshness != Freshness::Current {
                println!("{}", "─".repeat(60).dimmed());
                println!("{}", content);
                println!("{}", "─".repeat(60).dimmed());
            }
        }
    })?;
    if !writer.is_dry_run() {
        println!(
            "  {} created, {} updated, {} unchanged",
            summary.created.to_string().green(),
            summary.updated.to_string().green(),
            summary.unchanged
        );
    }

    fail_on_errors(&batch)
}

fn cmd_check(args: UnitArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let Some(batch) = build(&config)? else {
        return Ok(());
    };
    fail_on_errors(&batch)?;

    let stale = batch.stale_files();
    if stale.is_empty() {
        println!("{} Generated files are up to date", "✓".green());
        return Ok(());
    }

    for path in &stale {
        println!("{} {}", "✗ stale:".red(), path.display());
    }
    println!("  Run 'packgen generate' to update");
    Err(CliError::Stale { count: stale.len() }.into())
}

fn cmd_dump(input: &Path) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let file = syn::parse_file(&source).with_context(|| format!("parsing {}", input.display()))?;
    let analysis = packgen_codegen::analyze(&file)
        .map_err(|e| CliError::codegen(input, e))?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn cmd_init(output: &Path, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        println!("  Use --force to overwrite");
        return Err(CliError::Refused(format!(
            "Configuration file already exists: {}",
            output.display()
        ))
        .into());
    }

    std::fs::write(output, ConfigManager::default_config_content())
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "{} Created configuration file: {}",
        "✓".green(),
        output.display()
    );
    Ok(())
}
