use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};

use formpatch_diff::{values_equal, DiffOptions, DiffOutcome, Differ, JsonPatch, PatchOperation};
use formpatch_patch::apply_patch;

use crate::cli::*;
use crate::config::Config;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Command::Diff(args) => cmd_diff(args, &config, cli.format),
        Command::Apply(args) => cmd_apply(args, cli.format),
        Command::Verify(args) => cmd_verify(args, &config, cli.format),
    }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn read_patch(path: &Path) -> anyhow::Result<JsonPatch> {
    let value = read_json(path)?;
    serde_json::from_value(value).with_context(|| format!("{} is not a JSON patch", path.display()))
}

fn compute_diff(args: &DiffArgs, options: DiffOptions) -> anyhow::Result<DiffOutcome> {
    let prev = read_json(&args.prev)?;
    let next = read_json(&args.next)?;
    let differ = Differ::new(options);
    let mut outcome = match &args.current {
        Some(path) => differ.diff_against(&prev, &next, &read_json(path)?)?,
        None => differ.diff(&prev, &next)?,
    };
    if args.no_tests {
        outcome.patch = outcome.patch.without_tests();
    }
    Ok(outcome)
}

fn cmd_diff(args: DiffArgs, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = compute_diff(&args, config.diff_options(&args.flags)?)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome.patch)?),
        OutputFormat::Text => print!("{}", render_outcome(&outcome)),
    }
    Ok(())
}

fn cmd_apply(args: ApplyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let doc = read_json(&args.document)?;
    let patch = read_patch(&args.patch)?;
    let patched = apply_patch(&doc, &patch)
        .with_context(|| format!("applying {}", args.patch.display()))?;
    let rendered = serde_json::to_string_pretty(&patched)?;

    match &args.output {
        Some(out) => {
            fs::write(out, rendered + "\n").with_context(|| format!("writing {}", out.display()))?;
            if format == OutputFormat::Text {
                eprintln!(
                    "{} Applied {} operations to {}",
                    "✓".green().bold(),
                    patch.len(),
                    out.display().to_string().bold()
                );
            }
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn cmd_verify(args: VerifyArgs, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let options = config.diff_options(&args.flags)?;
    let prev = read_json(&args.prev)?;
    let next = read_json(&args.next)?;
    let (ok, ops) = verify(&prev, &next, options)?;

    match format {
        OutputFormat::Json => println!("{}", json!({"ok": ok, "operations": ops})),
        OutputFormat::Text if ok => {
            println!("{} Patch of {} operations reproduces {}", "✓".green().bold(), ops, args.next.display());
        }
        OutputFormat::Text => {
            println!("{} Patch does not reproduce {}", "✗".red().bold(), args.next.display());
        }
    }
    if !ok {
        bail!("round trip mismatch");
    }
    Ok(())
}

/// Diff, apply, and compare. Returns whether the result matched and the
/// number of operations.
fn verify(prev: &Value, next: &Value, options: DiffOptions) -> anyhow::Result<(bool, usize)> {
    let outcome = Differ::new(options).diff(prev, next)?;
    let patched = apply_patch(prev, &outcome.patch)?;
    Ok((values_equal(&patched, next), outcome.patch.len()))
}

fn render_op(op: &PatchOperation) -> String {
    let kind = format!("{:<7}", op.kind());
    let kind = match op {
        PatchOperation::Add { .. } => kind.green(),
        PatchOperation::Remove { .. } => kind.red(),
        PatchOperation::Replace { .. } => kind.yellow(),
        PatchOperation::Test { .. } => kind.dimmed(),
    };
    let path = if op.path().is_root() {
        "/".to_string()
    } else {
        op.path().to_string()
    };
    match op.value() {
        Some(value) => format!("{kind} {} {value}", path.bold()),
        None => format!("{kind} {}", path.bold()),
    }
}

fn render_outcome(outcome: &DiffOutcome) -> String {
    let mut out = String::new();
    if outcome.patch.is_empty() {
        out.push_str("No changes.\n");
    }
    for op in &outcome.patch {
        out.push_str(&render_op(op));
        out.push('\n');
    }
    for diagnostic in &outcome.diagnostics {
        out.push_str(&format!("{} {diagnostic}\n", "warning:".yellow().bold()));
    }
    out
}
