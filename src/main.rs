//! TaskGroup CLI - resolve and validate TaskGroup manifests

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::debug;

use taskgroup::{
    output, Catalog, FixSuggestion, Manifests, OutputFormat, ResolveError, ResolvedReferences,
    TaskGroupError, TaskLookup, Validator,
};

#[derive(Parser)]
#[command(name = "taskgroup")]
#[command(about = "Resolve TaskGroup manifests into flat, executable task specifications")]
#[command(version)]
struct Cli {
    /// Log resolution details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a TaskGroup into a single Task
    Resolve {
        /// YAML file with a TaskGroup (and optionally the Tasks it uses)
        file: PathBuf,

        /// Directory of Task manifests (repeatable)
        #[arg(short, long = "tasks")]
        tasks: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// Check a TaskGroup and its referenced Tasks without resolving
    Validate {
        /// YAML file with a TaskGroup (and optionally the Tasks it uses)
        file: PathBuf,

        /// Directory of Task manifests (repeatable)
        #[arg(short, long = "tasks")]
        tasks: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // stdout carries the manifest; logs go to stderr
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let result = match cli.command {
        Commands::Resolve {
            file,
            tasks,
            format,
        } => resolve_group(&file, &tasks, format),
        Commands::Validate { file, tasks } => validate_group(&file, &tasks),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = fix_suggestion(&e) {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn fix_suggestion(error: &anyhow::Error) -> Option<&str> {
    if let Some(e) = error.downcast_ref::<TaskGroupError>() {
        return e.fix_suggestion();
    }
    error
        .downcast_ref::<ResolveError>()
        .and_then(|e| e.fix_suggestion())
}

/// Read the input file and build a catalog from inline tasks plus `--tasks` dirs
fn load(file: &Path, task_dirs: &[PathBuf]) -> Result<(Manifests, Catalog)> {
    let yaml = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let manifests = Manifests::from_yaml(&yaml, &file.to_string_lossy())?;

    let mut catalog = Catalog::new();
    for task in &manifests.tasks {
        catalog.add(task.clone(), file)?;
    }
    for dir in task_dirs {
        let count = catalog.load_dir(dir)?;
        debug!(dir = %dir.display(), count, "loaded task directory");
    }

    Ok((manifests, catalog))
}

fn resolve_group(file: &Path, task_dirs: &[PathBuf], format: OutputFormat) -> Result<()> {
    let (manifests, catalog) = load(file, task_dirs)?;
    let task = manifests.group.resolve_with(&catalog)?;
    print!("{}", output::render(&task, format)?);
    Ok(())
}

fn validate_group(file: &Path, task_dirs: &[PathBuf]) -> Result<()> {
    let (manifests, catalog) = load(file, task_dirs)?;
    let group = &manifests.group;

    // Unknown tasks become diagnostics instead of aborting the run
    let references: ResolvedReferences = group
        .spec
        .references()
        .filter_map(|(index, uses)| {
            catalog
                .lookup(&uses.task_ref.name)
                .map(|spec| (index, spec.clone()))
        })
        .collect();

    let report = Validator::new().validate(&group.spec, &references);

    for error in &report.errors {
        println!("  {} {}", "✗".red(), error);
        if let Some(suggestion) = error.suggestion() {
            println!("    {} {}", "Fix:".yellow(), suggestion);
        }
    }
    for warning in &report.warnings {
        println!("  {} {}", "!".yellow(), warning);
        if let Some(suggestion) = warning.suggestion() {
            println!("    {} {}", "Fix:".yellow(), suggestion);
        }
    }

    if !report.is_valid() {
        return Err(TaskGroupError::Invalid {
            errors: report.errors.len(),
        }
        .into());
    }

    println!("{} TaskGroup '{}' is valid", "✓".green(), group.name());
    println!("  Steps: {}", report.step_count);
    println!("  Uses: {}", report.reference_count);
    println!("  Catalog tasks: {}", catalog.len());
    if report.has_warnings() {
        println!("  Warnings: {}", report.warnings.len());
    }
    Ok(())
}
