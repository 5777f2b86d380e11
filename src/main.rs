use anyhow::{Context, Result};
use cspstrategy::{
    config::EngineConfig, fetch::FsDocumentStore, init_logging, DocumentRef, EventDocuments,
    NarrativeOptions, StrategyEngine,
};
use std::{
    env, fs,
    path::{Path, PathBuf},
    process::exit,
    sync::Arc,
    time::Instant,
};
use tracing::{error, info};

fn print_usage_and_exit(prog: &str) -> ! {
    eprintln!(
        "Usage: {} <EVENT_ID> <TRANSACTIONS_CSV> <OPPORTUNITIES_CSV> [--instructions TEXT] [--knowledge TEXT]...",
        prog
    );
    exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let mut args = env::args();
    let prog = args.next().unwrap_or_else(|| "cspstrategy".into());
    let (event_id, tx_path, opp_path) = match (args.next(), args.next(), args.next()) {
        (Some(e), Some(t), Some(o)) => (e, PathBuf::from(t), PathBuf::from(o)),
        _ => print_usage_and_exit(&prog),
    };

    let mut options = NarrativeOptions::default();
    while let Some(flag) = args.next() {
        match (flag.as_str(), args.next()) {
            ("--instructions", Some(text)) => options.instructions = Some(text),
            ("--knowledge", Some(text)) => options.knowledge.push(text),
            _ => print_usage_and_exit(&prog),
        }
    }

    let cfg = EngineConfig::load().context("loading configuration")?;
    let tx_path = fs::canonicalize(&tx_path)
        .with_context(|| format!("resolving {}", tx_path.display()))?;
    let opp_path = fs::canonicalize(&opp_path)
        .with_context(|| format!("resolving {}", opp_path.display()))?;

    // closest directory holding both exports
    let root = tx_path
        .ancestors()
        .skip(1)
        .find(|dir| opp_path.starts_with(dir))
        .map(Path::to_path_buf)
        .context("input files share no common directory")?;
    let relative = |path: &Path| -> Result<String> {
        Ok(path.strip_prefix(&root)?.to_string_lossy().into_owned())
    };
    let docs = EventDocuments {
        documents: vec![
            DocumentRef::transactions(relative(&tx_path)?),
            DocumentRef::opportunities(relative(&opp_path)?),
        ],
    };
    let engine = StrategyEngine::from_config(&cfg)?
        .with_documents(Arc::new(FsDocumentStore::new(&root)));

    let start = Instant::now();
    match engine.refresh(&event_id, &docs, &options).await {
        Ok(summary) => {
            info!(
                event_id = %event_id,
                elapsed_s = start.elapsed().as_secs_f64(),
                "strategy refresh complete"
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(e) => {
            error!(event_id = %event_id, status = e.status_code(), error = %e, "strategy refresh failed");
            Err(e.into())
        }
    }
}
