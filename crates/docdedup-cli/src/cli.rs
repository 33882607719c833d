//! Argument parsing and command execution.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docdedup_reduce::{DedupConfig, Document};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Top-level arguments
#[derive(Parser)]
#[command(name = "docdedup")]
#[command(about = "Merge structurally identical objects in a document snapshot", long_about = None)]
pub struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, env = "DOCDEDUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Deduplicate INPUT and write the result to OUTPUT
    Dedup {
        /// Snapshot to read
        input: PathBuf,
        /// Snapshot to write
        output: PathBuf,
        /// Compare decoded stream payloads too
        #[arg(long, conflicts_with = "standard")]
        aggressive: bool,
        /// Compare dictionaries only, ignoring stream payloads
        #[arg(long)]
        standard: bool,
    },
    /// List duplicate groups without changing anything
    Plan {
        /// Snapshot to read
        input: PathBuf,
        /// Compare decoded stream payloads too
        #[arg(long, conflicts_with = "standard")]
        aggressive: bool,
        /// Compare dictionaries only, ignoring stream payloads
        #[arg(long)]
        standard: bool,
    },
}

fn resolve_aggressive(config: &DedupConfig, aggressive: bool, standard: bool) -> bool {
    if aggressive {
        true
    } else if standard {
        false
    } else {
        config.aggressive
    }
}

impl Cli {
    /// Configuration from `--config`, or defaults when none is given.
    pub fn load_config(&self) -> Result<DedupConfig> {
        match &self.config {
            Some(path) => DedupConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display())),
            None => Ok(DedupConfig::default()),
        }
    }

    /// Execute the subcommand, writing human-readable output to `out`.
    pub fn run(&self, config: DedupConfig, out: &mut dyn Write) -> Result<()> {
        match &self.command {
            Command::Dedup {
                input,
                output,
                aggressive,
                standard,
            } => {
                let aggressive = resolve_aggressive(&config, *aggressive, *standard);
                dedup(input, output, aggressive, config, out)
            }
            Command::Plan {
                input,
                aggressive,
                standard,
            } => {
                let aggressive = resolve_aggressive(&config, *aggressive, *standard);
                plan(input, aggressive, config, out)
            }
        }
    }
}

fn load(input: &Path, config: DedupConfig) -> Result<Document> {
    Document::load(input, config).with_context(|| format!("reading {}", input.display()))
}

fn dedup(
    input: &Path,
    output: &Path,
    aggressive: bool,
    config: DedupConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let mut doc = load(input, config)?;
    writeln!(out, "Original document has {} objects.", doc.object_count())?;
    writeln!(
        out,
        "Performing {} deduplication...",
        if aggressive { "aggressive" } else { "standard" }
    )?;

    let report = doc.deduplicate_with_report(aggressive)?;
    tracing::debug!(report = %serde_json::to_string(&report)?, "Run report");

    writeln!(out, "Document now has {} objects.", doc.object_count())?;
    doc.save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    writeln!(out, "Deduplicated document saved to: {}", output.display())?;
    Ok(())
}

fn plan(input: &Path, aggressive: bool, config: DedupConfig, out: &mut dyn Write) -> Result<()> {
    let doc = load(input, config)?;
    let plan = doc.plan(aggressive)?;
    for group in &plan.groups {
        let dups: Vec<String> = group.duplicates.iter().map(|r| r.to_string()).collect();
        writeln!(
            out,
            "{} keep {} replace {}",
            &group.digest.to_hex()[..16],
            group.canonical,
            dups.join(", ")
        )?;
    }
    writeln!(
        out,
        "{} duplicate groups, {} objects would be removed",
        plan.groups.len(),
        plan.duplicate_count()
    )?;
    Ok(())
}
