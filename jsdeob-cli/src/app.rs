use std::path::PathBuf;

use clap::Parser;

/// jsdeob - deobfuscate bundler-protected anti-bot JavaScript
#[derive(Debug, Parser)]
#[command(name = "jsdeob", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(flatten)]
    pub deobfuscate: DeobfuscateArgs,
}

/// Options controlling how results are reported.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit the report as JSON on stdout instead of human-readable text.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Input, output and pipeline options.
#[derive(Debug, Parser)]
pub struct DeobfuscateArgs {
    /// Path to the obfuscated script.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file (default: <input>.deobfuscated.js).
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Show per-pass rewrite counts and timings.
    #[arg(long)]
    pub stats: bool,

    /// Write a JSON report.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Name of the global object aliased by the script.
    #[arg(long, value_name = "NAME", default_value = "window")]
    pub global_object: String,

    /// Skip switch unflattening.
    #[arg(long)]
    pub no_unflatten: bool,

    /// Skip opaque predicate removal.
    #[arg(long)]
    pub no_predicates: bool,

    /// Sandbox loop iteration limit.
    #[arg(long, value_name = "N")]
    pub loop_limit: Option<u64>,
}
