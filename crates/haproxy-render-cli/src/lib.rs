mod logging;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use haproxy_render_config::{Config, LoadOptions};
use haproxy_render_core::{build_unified_diff, ExitCode, RenderOutput, Renderer};
use serde_json::json;
use tracing::debug;

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.verbose > 0);

    let mut options = LoadOptions::default();
    if let Some(dir) = cli.working_dir {
        options = options.with_working_dir(dir);
    }
    if let Some(path) = cli.config {
        options = options.with_override_path(path);
    }

    let config = match Config::load(options) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("haproxy-render: {err}");
            return Ok(err.exit_code().code());
        }
    };
    debug!(
        layers = config.sources.layers.len(),
        working_dir = %config.sources.working_directory.display(),
        "configuration resolved"
    );

    let output = match Renderer::new(&config.settings).render(&config.declarations) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("haproxy-render: {err}");
            return Ok(err.exit_code().code());
        }
    };

    match cli.command {
        Command::Render(args) => handle_render(&output, args),
        Command::Check(args) => handle_check(&output, &config.sources.working_directory, args),
        Command::Validate(args) => handle_validate(&output, args),
    }
}

fn handle_render(output: &RenderOutput, args: RenderArgs) -> Result<i32> {
    let RenderArgs { target, format } = args;

    if let Some(target) = target {
        let Some(file) = output.file(&target) else {
            eprintln!("haproxy-render: nothing renders into {target}");
            return Ok(ExitCode::InvalidArgument.code());
        };
        match format.unwrap_or(RenderFormatValue::Plain) {
            RenderFormatValue::Plain => print!("{}", file.content),
            RenderFormatValue::Json => emit(&serde_json::to_string_pretty(file)?)?,
        }
        return Ok(ExitCode::Success.code());
    }

    match format.unwrap_or(RenderFormatValue::Plain) {
        RenderFormatValue::Plain => {
            for file in &output.files {
                println!("# ==> {} <==", file.target);
                print!("{}", file.content);
            }
        }
        RenderFormatValue::Json => {
            let payload = json!({
                "files": output.files,
                "fragments": output.fragments,
            });
            emit(&serde_json::to_string_pretty(&payload)?)?;
        }
    }
    Ok(ExitCode::Success.code())
}

fn handle_check(output: &RenderOutput, working_dir: &Path, args: CheckArgs) -> Result<i32> {
    let CheckArgs { diff, quiet } = args;
    let mut drifted = 0usize;

    for file in &output.files {
        let path = resolve_target(working_dir, &file.target);
        let current = match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };

        let Some(patch) = build_unified_diff(
            current.as_deref().unwrap_or_default(),
            &file.content,
            &file.target,
        ) else {
            debug!(target_file = %file.target, "up to date");
            continue;
        };

        drifted += 1;
        if diff {
            emit(&patch)?;
        } else if !quiet {
            let state = if current.is_some() { "differs" } else { "missing" };
            emit(&format!("{}: {state}", file.target))?;
        }
    }

    if drifted > 0 {
        return Ok(ExitCode::Drift.code());
    }
    if !quiet {
        emit(&format!("ok: {} file(s) up to date", output.files.len()))?;
    }
    Ok(ExitCode::Success.code())
}

fn handle_validate(output: &RenderOutput, args: ValidateArgs) -> Result<i32> {
    if !args.quiet {
        emit(&format!(
            "ok: {} fragment(s) across {} file(s)",
            output.fragments.len(),
            output.files.len()
        ))?;
    }
    Ok(ExitCode::Success.code())
}

/// Relative targets are read from the working directory.
fn resolve_target(working_dir: &Path, target: &str) -> PathBuf {
    let path = Path::new(target);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

fn emit(content: &str) -> Result<()> {
    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Render HAProxy configuration from TOML declarations",
    propagate_version = true
)]
struct Cli {
    /// Additional config file layered over haproxy-render.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory to resolve haproxy-render.toml and relative targets from
    #[arg(long = "working-dir", global = true, value_name = "DIR")]
    working_dir: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every rendered file
    Render(RenderArgs),
    /// Compare rendered files with what is on disk
    Check(CheckArgs),
    /// Run a full render pass and report problems
    Validate(ValidateArgs),
}

#[derive(Args)]
struct RenderArgs {
    /// Print only this target file
    #[arg(long, value_name = "PATH")]
    target: Option<String>,
    /// Output format
    #[arg(long, value_enum)]
    format: Option<RenderFormatValue>,
}

#[derive(Args)]
struct CheckArgs {
    /// Print unified diffs for files that differ
    #[arg(long)]
    diff: bool,
    /// Suppress output; rely on the exit code
    #[arg(long, conflicts_with = "diff")]
    quiet: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// Suppress successful output
    #[arg(long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum RenderFormatValue {
    Plain,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_targets_resolve_against_working_dir() {
        let base = Path::new("/srv/site");
        assert_eq!(
            resolve_target(base, "out/haproxy.cfg"),
            PathBuf::from("/srv/site/out/haproxy.cfg")
        );
        assert_eq!(
            resolve_target(base, "/etc/haproxy/haproxy.cfg"),
            PathBuf::from("/etc/haproxy/haproxy.cfg")
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
