//! idwflow - interactive shell for the nitrate/cancer IDW pipeline.

mod console;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use idwflow::core::{K_MAX, K_MIN};
use idwflow::prelude::*;
use idwflow::testing::WorkspaceFixture;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use console::ConsoleSink;

#[derive(Parser)]
#[command(name = "idwflow")]
#[command(author, version, about = "IDW nitrate interpolation and tract regression", long_about = None)]
struct Cli {
    /// Workspace directory holding the inputs and artifacts
    /// [default: $IDWFLOW_WORKSPACE, else ./idw_output]
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Run once with this power exponent instead of prompting
    #[arg(short)]
    k: Option<String>,

    /// Print every pipeline event as a JSON line
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic sample workspace
    InitDemo {
        /// Random seed for the generated wells and rates
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let workspace = match &cli.workspace {
        Some(dir) => WorkspaceContext::open(dir)
            .with_context(|| format!("Failed to open workspace {}", dir.display()))?,
        None => WorkspaceContext::from_env().context("Failed to open workspace")?,
    };

    if let Some(Commands::InitDemo { seed }) = cli.command {
        WorkspaceFixture::new()
            .with_seed(seed)
            .write_to(workspace.workspace_directory())
            .context("Failed to write demo workspace")?;
        println!(
            "Demo workspace written to {}",
            workspace.workspace_directory().display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    for missing in workspace.missing_inputs() {
        warn!(path = %missing.display(), "Input file missing");
    }

    info!(workspace = %workspace.workspace_directory().display(), "Workspace ready");
    let pipeline =
        Pipeline::new(workspace, NativeBackend::new()).with_event_sink(ConsoleSink::new(cli.json));

    match cli.k {
        Some(k) => Ok(exit_code(&pipeline.run(&k))),
        None => prompt_loop(&pipeline),
    }
}

fn exit_code(result: &PipelineResult) -> ExitCode {
    match result {
        PipelineResult::Succeeded(_) => ExitCode::SUCCESS,
        PipelineResult::Rejected(_) => ExitCode::from(2),
        PipelineResult::Failed(_) => ExitCode::FAILURE,
    }
}

/// Prompts for `k` until end of input. Rejected input is asked for again.
fn prompt_loop(pipeline: &Pipeline) -> Result<ExitCode> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut last = ExitCode::SUCCESS;

    loop {
        print!("Enter k ({K_MIN}-{K_MAX}), Ctrl-D to quit: ");
        std::io::stdout().flush().context("Failed to write prompt")?;

        let Some(line) = lines.next() else {
            println!();
            return Ok(last);
        };
        let line = line.context("Failed to read input")?;

        let result = pipeline.run(&line);
        if !result.is_rejected() {
            last = exit_code(&result);
        }
    }
}
