//! `interactive-feedback`: ask a human a question from an agent.
//!
//! Subcommands: `serve` (stdio tool server), `ask` (one-shot request) and
//! `surface` (the built-in terminal presentation surface).

mod logging;
mod surface;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use feedback_core::{encode, split_options, FeedbackService, SurfaceConfig};
use feedback_runtime::{BlockingFeedbackHandler, ToolServer};

#[derive(Parser, Debug)]
#[command(name = "interactive-feedback")]
#[command(version, about = "Request interactive feedback from a human")]
struct Cli {
    /// YAML file with surface settings (executable, args, timeout, inherit_stderr)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Presentation surface executable; defaults to this binary's `surface` command
    #[arg(long, global = true, value_name = "PATH")]
    surface: Option<PathBuf>,

    /// Give up on an unanswered request after this long (e.g. 90s, 5m)
    #[arg(long, global = true, value_name = "DURATION")]
    timeout: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the interactive_feedback tool over stdio until EOF
    Serve,
    /// Ask one question and print the answer as JSON
    Ask(AskArgs),
    /// Run the terminal presentation surface
    Surface(SurfaceArgs),
}

#[derive(clap::Args, Debug)]
struct AskArgs {
    /// Question shown to the human
    #[arg(long, allow_hyphen_values = true)]
    prompt: String,

    /// Predefined option; repeat for several
    #[arg(long = "option", value_name = "TEXT", allow_hyphen_values = true)]
    options: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct SurfaceArgs {
    /// Question shown to the human
    #[arg(long, allow_hyphen_values = true, default_value = DEFAULT_SURFACE_PROMPT)]
    prompt: String,

    /// Options joined with `|||`
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    predefined_options: String,

    /// Where to write the result document; printed to stdout when absent
    #[arg(long, value_name = "PATH")]
    output_file: Option<PathBuf>,
}

const DEFAULT_SURFACE_PROMPT: &str = "I have implemented the changes you requested.";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;

    match &cli.command {
        Command::Serve => serve(load_config(&cli)?),
        Command::Ask(args) => ask(load_config(&cli)?, args),
        Command::Surface(args) => surface::run(
            &args.prompt,
            &split_options(&args.predefined_options),
            args.output_file.as_deref(),
        ),
    }
}

/// Resolve the surface config: defaults, then file, then env, then flags.
fn load_config(cli: &Cli) -> anyhow::Result<SurfaceConfig> {
    let config = match &cli.config {
        Some(path) => SurfaceConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SurfaceConfig::default(),
    };

    let config = config
        .apply_env()
        .context("Invalid INTERACTIVE_FEEDBACK_* environment")?
        .apply_overrides(cli.surface.clone(), cli.timeout.clone())
        .context("Invalid command-line override")?;

    let current = std::env::current_exe().context("Failed to locate own executable")?;
    let config = config.or_default_surface(current, ["surface"]);

    tracing::debug!(
        executable = ?config.executable,
        args = ?config.args,
        timeout = ?config.timeout,
        "Surface configured"
    );
    Ok(config)
}

fn serve(config: SurfaceConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let handler = BlockingFeedbackHandler::new(FeedbackService::new(config));
    runtime
        .block_on(ToolServer::new(handler).serve_stdio())
        .context("Tool server failed")
}

fn ask(config: SurfaceConfig, args: &AskArgs) -> anyhow::Result<()> {
    let options = (!args.options.is_empty()).then(|| args.options.clone());
    let result = FeedbackService::new(config)
        .request_feedback(args.prompt.clone(), options)
        .context("Feedback request failed")?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&encode(&result))?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}
