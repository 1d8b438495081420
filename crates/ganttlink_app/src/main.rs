// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ganttlink - dependency linking for timeline task bars
//!
//! Loads a scenario (tasks on a timeline plus a script of gestures), lays the
//! tasks out, and replays the gestures through the connection controller.
//!
//! ## Architecture
//!
//! All graph logic lives in `ganttlink_graph`. This binary supplies the host
//! side: scenario files, bar layout for connector geometry, and a
//! persistence adapter that mirrors connections into a RON file.

mod error;
mod layout;
mod persistence;
mod replay;
mod scenario;

use clap::{Parser, ValueEnum};
use error::Result;
use ganttlink_graph::{
    Connection, ConnectionController, ConnectionStore, FnRule, NoopAdapter, PersistenceAdapter, WorkItem,
};
use layout::TimelineLayout;
use persistence::{RejectingAdapter, RonFileAdapter};
use scenario::Scenario;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Output encoding for the replay report
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Ron,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "ganttlink", version, about = "Replay dependency-linking gestures against a schedule")]
struct Args {
    /// Scenario file (RON)
    scenario: PathBuf,

    /// Persist connections to this RON file
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Fail every persistence call, exercising rollback
    #[arg(long, conflicts_with = "store")]
    reject_writes: bool,

    /// Report encoding
    #[arg(long, value_enum, default_value_t = Format::Ron)]
    format: Format,

    /// Pixels per time unit
    #[arg(long, default_value_t = 40.0)]
    zoom: f32,
}

/// What the replay produced
#[derive(Debug, Serialize)]
struct Report {
    scenario: String,
    events: Vec<String>,
    errors_visible: Option<String>,
    connections: Vec<Connection>,
}

fn main() {
    let args = Args::parse();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    match "ganttlink_app=debug".parse() {
        Ok(directive) => env_filter = env_filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring log directive: {e}"),
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Ganttlink v{}", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(args)) {
        tracing::error!("Replay failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;

    let (adapter, initial): (Arc<dyn PersistenceAdapter>, Vec<Connection>) = if args.reject_writes {
        (Arc::new(RejectingAdapter::new("Connection storage is read-only")), scenario.connections.clone())
    } else if let Some(path) = &args.store {
        let (adapter, stored) = RonFileAdapter::open(path).await?;
        let initial = if stored.is_empty() {
            adapter.overwrite(scenario.connections.clone()).await?;
            scenario.connections.clone()
        } else {
            stored
        };
        (Arc::new(adapter), initial)
    } else {
        (Arc::new(NoopAdapter), scenario.connections.clone())
    };

    let mut store = ConnectionStore::new(scenario.config.clone()).with_adapter(adapter);
    if let Some(locked) = scenario.locked_status.clone() {
        store = store.with_rule(Arc::new(FnRule(move |from: &WorkItem, to: &WorkItem| {
            let is_locked = |item: &WorkItem| item.status.as_deref() == Some(locked.as_str());
            if is_locked(from) && is_locked(to) {
                Err(format!("Tasks in '{locked}' cannot be linked to each other"))
            } else {
                Ok(())
            }
        })));
    }
    store.set_tasks(scenario.work_items());
    store.replace_all(initial);

    let layout = TimelineLayout::default().with_zoom(args.zoom);
    let resolver = layout.resolver(&scenario.tasks);
    if resolver.is_empty() {
        tracing::warn!("No task is on screen; pointer gestures will be ignored");
    } else {
        tracing::debug!("{} of {} tasks on screen", resolver.len(), store.tasks().len());
    }
    let mut controller = ConnectionController::new(store, resolver);

    let events = replay::replay(&mut controller, &scenario.gestures).await;
    let summary = controller.summary();
    tracing::info!("Replay finished: {} connections, {} pending", summary.total, summary.pending);

    let report = Report {
        scenario: scenario.name.clone(),
        events: events.iter().map(ToString::to_string).collect(),
        errors_visible: controller.current_error(std::time::Instant::now()).map(str::to_string),
        connections: controller.connections(),
    };

    let text = match args.format {
        Format::Ron => ron::ser::to_string_pretty(&report, ron::ser::PrettyConfig::default())?,
        Format::Json => serde_json::to_string_pretty(&report)?,
    };
    println!("{text}");
    Ok(())
}
