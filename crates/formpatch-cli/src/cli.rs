use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "formpatch",
    about = "Row-aware JSON patches for form data",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with a [diff] table
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute the patch from one document to another
    Diff(DiffArgs),
    /// Apply a patch to a document
    Apply(ApplyArgs),
    /// Check that the computed patch reproduces the target document
    Verify(VerifyArgs),
}

/// Flags that override the `[diff]` table of the config file.
#[derive(Args, Clone, Debug, Default)]
pub struct DiffFlags {
    /// Identifier property of array rows
    #[arg(long)]
    pub row_id: Option<String>,
    /// Treat arrays at this path as opaque values (`*` matches one segment)
    #[arg(long = "leaf-array")]
    pub leaf_arrays: Vec<String>,
}

#[derive(Args)]
pub struct DiffArgs {
    pub prev: PathBuf,
    pub next: PathBuf,
    /// Live document to reconcile against
    #[arg(long)]
    pub current: Option<PathBuf>,
    #[command(flatten)]
    pub flags: DiffFlags,
    /// Drop `test` operations from the output
    #[arg(long)]
    pub no_tests: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    pub document: PathBuf,
    pub patch: PathBuf,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub prev: PathBuf,
    pub next: PathBuf,
    #[command(flatten)]
    pub flags: DiffFlags,
}
