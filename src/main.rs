//! Taskforge - LLM task orchestration engine.
//!
//! Thin CLI entry point: wires tracing, config, storage, and the model
//! gateway together, then drives one task to completion and prints the
//! final report.

use std::sync::Arc;

use taskforge_core::config::EngineConfig;
use taskforge_core::types::TaskMode;
use taskforge_engine::TaskRunner;
use taskforge_model_gateway::gateways_for;
use taskforge_store::{SqliteTaskStore, TaskFileSink};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn configure_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,taskforge=debug".into()),
    );
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn usage() -> ! {
    eprintln!("usage: taskforge <goal> [--mode plan|explore|write|research|debate] [--source <selector>]");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    configure_tracing();

    let mut args = std::env::args().skip(1);
    let Some(goal) = args.next() else { usage() };
    let mut mode = TaskMode::Explore;
    let mut knowledge_selector = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mode" => {
                let value = args.next().unwrap_or_else(|| usage());
                mode = TaskMode::parse(&value).unwrap_or_else(|| usage());
            }
            "--source" => {
                knowledge_selector = Some(args.next().unwrap_or_else(|| usage()));
            }
            _ => usage(),
        }
    }

    let config = EngineConfig::load_or_default();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir,
        "Starting Taskforge"
    );

    std::fs::create_dir_all(&config.data_dir)?;
    let store = Arc::new(SqliteTaskStore::open(
        std::path::Path::new(&config.data_dir).join("tasks.db"),
    )?);
    let files = TaskFileSink::new(&config.data_dir)?;
    let (gateway, bulk_gateway) = gateways_for(&config.models)?;

    let runner = TaskRunner::new(config, store, gateway, bulk_gateway, files);

    let task_id = runner.run(&goal, mode, knowledge_selector).await?;
    let snapshot = runner.status(&task_id).await?;

    tracing::info!(task_id = %task_id, status = %snapshot.status, "Task finished");
    println!("{}", snapshot.final_report);
    Ok(())
}
