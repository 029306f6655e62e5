//! Command-line front end for acton-chain.
//!
//! ```sh
//! # List the built-in tools as JSON descriptors
//! acton-chain tools
//!
//! # Run a chain starting at smart_calculator
//! acton-chain run smart_calculator --args '{"expression": "6 * 7"}'
//!
//! # Tighter limits, sensitive tools denied without asking
//! acton-chain run analyze_and_search --args '{"text": "add 5 + 3"}' \
//!   --max-iterations 3 --max-depth 1 --deny
//! ```

use acton_chain::chain::{ApprovalHandler, AutoApprove, AutoDeny, ChannelApproval};
use acton_chain::config::{self, ChainConfig};
use acton_chain::logging;
use acton_chain::orchestrator::{ChainOrchestrator, ChainRequest};
use acton_chain::recorder::InMemoryRecorder;
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run tool chains over the built-in tools.
#[derive(Parser)]
#[command(name = "acton-chain", version)]
struct Cli {
    /// Configuration file (defaults to ./acton-chain.toml, then the XDG config dir)
    #[arg(long, global = true, env = "ACTON_CHAIN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every registered tool descriptor as JSON
    Tools,
    /// Run a chain and print its result and summary as JSON
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Tool to invoke first
    tool: String,

    /// Arguments for the first tool, as a JSON object
    #[arg(long, default_value = "{}")]
    args: String,

    /// Maximum invocations, initial one included
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Maximum trigger nesting
    #[arg(long)]
    max_depth: Option<usize>,

    /// Approve every sensitive tool without asking
    #[arg(long, conflicts_with = "deny")]
    approve: bool,

    /// Deny every sensitive tool without asking
    #[arg(long)]
    deny: bool,

    /// Conversation the run is recorded under
    #[arg(long, default_value = "cli")]
    conversation: String,

    /// Message the run is recorded under
    #[arg(long, default_value = "cli")]
    message: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let config = match cli.config {
        Some(ref path) => config::from_path(path)?,
        None => config::load()?,
    };
    logging::init_and_store_logging(&config.logging)?;

    let recorder = Arc::new(InMemoryRecorder::new());
    let orchestrator = orchestrator(&config)?.with_recorder(recorder.clone());

    match cli.command {
        Command::Tools => {
            println!(
                "{}",
                serde_json::to_string_pretty(&orchestrator.available_tools())?
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Run(args) => {
            let arguments: Value = serde_json::from_str(&args.args)
                .map_err(|e| format!("--args is not valid JSON: {e}"))?;

            let cancellation = CancellationToken::new();
            let on_interrupt = cancellation.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let mut request = ChainRequest::new(args.tool, arguments)
                .in_conversation(args.conversation.clone(), args.message.clone())
                .with_approval_handler(approval_handler(args.approve, args.deny))
                .with_cancellation(cancellation);
            if let Some(max_iterations) = args.max_iterations {
                request = request.with_max_iterations(max_iterations);
            }
            if let Some(max_depth) = args.max_depth {
                request = request.with_max_depth(max_depth);
            }

            let result = orchestrator.execute_tool_chain(request).await;
            let summary = recorder
                .summaries(&args.conversation, &args.message)
                .pop();

            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "result": result,
                    "summary": summary,
                }))?
            );

            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn orchestrator(config: &ChainConfig) -> Result<ChainOrchestrator, Box<dyn Error>> {
    Ok(ChainOrchestrator::with_builtins()?
        .with_limits(config.chain_limits())
        .with_policy(config.approval_policy())
        .with_extractor(config.parameter_extractor()))
}

fn approval_handler(approve: bool, deny: bool) -> Arc<dyn ApprovalHandler> {
    if approve {
        return Arc::new(AutoApprove);
    }
    if deny {
        return Arc::new(AutoDeny);
    }

    let (handler, mut requests) = ChannelApproval::channel(1);
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let prompt = format!(
                "Tool '{}' requires approval.\nArguments: {}\nApprove? [y/N] ",
                request.invocation.tool_name, request.invocation.arguments
            );
            let approved = tokio::task::spawn_blocking(move || ask(&prompt))
                .await
                .unwrap_or(false);
            request.respond(approved);
        }
    });
    Arc::new(handler)
}

/// Prompts on stderr and reads a yes/no answer from stdin.
fn ask(prompt: &str) -> bool {
    let mut stderr = io::stderr();
    if write!(stderr, "{prompt}").and_then(|()| stderr.flush()).is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
