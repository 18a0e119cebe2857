use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use pullmon_core::job::registry::JobRegistry;
use pullmon_core::session::manifest::FileManifestStore;
use pullmon_core::session::observer_session::{resolve_category, ObserverSession};
use pullmon_core::types::types::Category;

mod pull_driver;
mod terminal_observer;
use terminal_observer::TerminalPullObserver;

#[derive(Parser)]
#[command(name = "pullmon", about = "Pull progress monitor")]
struct Args {
    /// Images to pull
    #[arg(required = true)]
    images: Vec<String>,

    /// Observer group the pulls belong to
    #[arg(short, long, default_value = "ivi")]
    category: String,

    /// Milliseconds between simulated progress ticks
    #[arg(short, long, default_value = "40")]
    tick_ms: u64,

    /// Simulate a failure once each pull reaches this percent
    #[arg(long)]
    fail_at: Option<u8>,
}

/// Manifest location: `$PULLMON_MANIFEST_DIR`, falling back to the local
/// data directory.
fn manifest_path() -> PathBuf {
    let dir = if let Ok(env_dir) = std::env::var("PULLMON_MANIFEST_DIR") {
        PathBuf::from(env_dir)
    } else {
        dirs_next::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pullmon")
    };
    dir.join("manifest.json")
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let registry = Arc::new(JobRegistry::default());
    let manifest = Arc::new(FileManifestStore::new(manifest_path()));
    let observer = Arc::new(TerminalPullObserver::new());
    let category = resolve_category(Some(args.category.as_str()), None)
        .unwrap_or_else(|| Category::new("default"));

    let session = ObserverSession::new(
        Arc::clone(&registry),
        manifest,
        observer,
        Some(category.clone()),
    );

    // Resume watching anything a previous run left behind.
    match session.reconcile().await {
        Ok(resumed) if !resumed.is_empty() => {
            println!("Resumed watching: {}", resumed.join(", "));
        }
        Ok(_) => {}
        Err(e) => eprintln!("Reconciliation failed: {}", e),
    }

    let tick = Duration::from_millis(args.tick_ms);
    let mut drivers = Vec::new();
    for image in &args.images {
        if let Err(e) = session.start_pull(image, category.clone()).await {
            eprintln!("Could not start pull for {}: {}", image, e);
            continue;
        }
        drivers.push(tokio::spawn(pull_driver::drive_pull(
            Arc::clone(&registry),
            image.clone(),
            tick,
            args.fail_at,
        )));
    }

    for driver in drivers {
        let _ = driver.await;
    }

    // Let the final events reach the bars before detaching.
    tokio::time::sleep(Duration::from_millis(250)).await;
    session.detach();
}
