//! CLI: replay a workspace session script.
//!
//! The script is a JSON array of workspace inputs, commands and pointer events alike:
//!
//! ```json
//! [
//!   {"command": "add-container", "image": "quay.io/acme/web"},
//!   {"command": "add-ingress", "port": 80},
//!   {"pointer": "down", "x": 60, "y": 110},
//!   {"pointer": "up", "x": 139, "y": 10},
//!   {"command": "commit"}
//! ]
//! ```
//!
//! Notifications are printed as they arrive. Exits non-zero when a commit fails as a whole.
//!
//! Set RUST_LOG=cim_domain_topology=debug to follow the gestures.

use anyhow::Context;
use cim_domain_topology::{
    ExecutorKind, WorkspaceConfig, WorkspaceEvent, WorkspaceInput, WorkspaceSession,
};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replay a workspace session script and deploy what it draws.
#[derive(Parser, Debug)]
#[command(name = "topology")]
#[command(
    after_help = r#"Environment variables (overridden by the matching flags):
  TOPOLOGY_PROVIDER_URL    Image metadata provider base URL
  TOPOLOGY_EXECUTOR        http | kubectl | dry-run
  TOPOLOGY_EXECUTOR_URL    HTTP executor bridge base URL
  TOPOLOGY_KUBECTL         kubectl binary for the kubectl executor
  TOPOLOGY_FAILURE_MARKER  Reply prefix that marks a failed executor call

Examples:
  topology session.json
  topology --executor dry-run --provider-url http://registry.local:9090 session.json"#
)]
struct Args {
    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    executor: Option<ExecutorKind>,

    #[arg(long, value_name = "URL")]
    provider_url: Option<String>,

    #[arg(long, value_name = "URL")]
    executor_url: Option<String>,

    /// Print every event except redraws as one JSON line
    #[arg(long)]
    json: bool,

    /// Session script
    #[arg(value_name = "script.json")]
    script: PathBuf,
}

/// Tracks whether the most recent commit failed as a whole
#[derive(Debug, Default)]
struct CommitOutcome {
    failed: bool,
}

impl CommitOutcome {
    fn observe(&mut self, event: &WorkspaceEvent) {
        match event {
            WorkspaceEvent::CommitFailed { .. } => self.failed = true,
            WorkspaceEvent::CommitFinished(_) => self.failed = false,
            _ => {}
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<WorkspaceConfig> {
    let mut config = match &args.config {
        Some(path) => WorkspaceConfig::from_file(path)?,
        None => WorkspaceConfig::default(),
    };
    config.apply_env().context("applying TOPOLOGY_* environment")?;
    if let Some(executor) = args.executor {
        config.executor = executor;
    }
    if let Some(url) = &args.provider_url {
        config.provider_url = url.clone();
    }
    if let Some(url) = &args.executor_url {
        config.executor_url = url.clone();
    }
    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let config = load_config(&args)?;
    info!(executor = %config.executor, provider = %config.provider_url, "configuration");

    let script = fs::read_to_string(&args.script)
        .with_context(|| format!("reading {}", args.script.display()))?;
    let inputs: Vec<WorkspaceInput> = serde_json::from_str(&script)
        .with_context(|| format!("parsing {}", args.script.display()))?;
    info!(inputs = inputs.len(), "replaying script");

    let session = WorkspaceSession::new(config.build_provider(), config.build_compiler());
    let (handle, mut events, task) = cim_domain_topology::spawn(session, config.channel_capacity);

    let json = args.json;
    let printer = tokio::spawn(async move {
        let mut outcome = CommitOutcome::default();
        while let Some(event) = events.next().await {
            outcome.observe(&event);
            if json {
                if !matches!(event, WorkspaceEvent::Redraw(_)) {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(err) => eprintln!("unprintable event: {err}"),
                    }
                }
            } else if let WorkspaceEvent::Notification(notification) = &event {
                println!("{notification}");
            }
        }
        outcome.failed
    });

    for input in inputs {
        handle.send(input).await?;
    }
    handle.shutdown().await?;
    let session = task.await.context("session task")?;
    info!(
        nodes = session.graph().nodes().len(),
        edges = session.graph().edges().len(),
        "session finished"
    );

    let commit_failed = printer.await.context("event printer")?;
    Ok(!commit_failed)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(2);
        }
    }
}
