//! Handler ordering demo.
//!
//! Registers a parent handler and a nested child handler on one dispatcher,
//! replays a synthetic back gesture, and reports which handler ran.

mod notify;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use navevent::{NavigationConfig, NavigationEvent, NavigationEventDispatcher, RunStatus, SwipeEdge};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::notify::{ConsoleNotifier, Notifier, announce};

/// Demo command line arguments.
#[derive(Parser, Debug)]
#[command(name = "navevent-demo")]
#[command(about = "Shows which of two nested back handlers receives a gesture")]
struct Args {
	/// Dispatcher configuration file (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Number of progress updates in the replayed gesture
	#[arg(long, default_value_t = 5)]
	steps: u32,

	/// Register the nested handler disabled so the parent handles the gesture
	#[arg(long)]
	disable_child: bool,

	/// End the gesture with a cancellation instead of a completion
	#[arg(long)]
	cancel: bool,

	/// Send a single-shot back action instead of a predictive gesture
	#[arg(long, conflicts_with = "cancel")]
	single_shot: bool,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let default_level = if args.verbose { "debug" } else { "info" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let config = match &args.config {
		Some(path) => NavigationConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => NavigationConfig::default(),
	};
	info!(capacity = config.progress_capacity, class = config.task_class.as_str(), "starting navevent-demo");

	let dispatcher = NavigationEventDispatcher::with_config(&config);
	let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

	let _parent = dispatcher.register(|| true, announce(Arc::clone(&notifier), "Parent handler called"));
	let child_enabled = !args.disable_child;
	let _child = dispatcher.register(move || child_enabled, announce(Arc::clone(&notifier), "Child handler called"));

	let Some(target) = dispatcher.current_target() else {
		info!("no enabled handler, gesture is unhandled");
		return Ok(());
	};

	if args.single_shot {
		dispatcher.on_completed();
	} else {
		replay(&dispatcher, args.steps, args.cancel).await;
	}

	let Some(mut status) = target.run_status() else {
		info!(callback = %target.id(), "gesture produced no run");
		return Ok(());
	};
	let outcome = tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| s.is_terminal()))
		.await
		.context("handler did not finish within 5s")?
		.map(|status| *status)
		.unwrap_or(RunStatus::Failed);
	info!(callback = %target.id(), outcome = ?outcome, "gesture finished");
	Ok(())
}

/// Raises a predictive gesture: start, `steps` progress updates, then the terminal phase.
async fn replay(dispatcher: &NavigationEventDispatcher, steps: u32, cancel: bool) {
	let started = std::time::Instant::now();
	let frame = |progress: f32| {
		let elapsed = started.elapsed().as_millis() as u64;
		NavigationEvent::new(8.0, 400.0, progress, SwipeEdge::Left, elapsed)
	};

	dispatcher.on_started(frame(0.0));
	for step in 1..=steps {
		let progress = step as f32 / steps.max(1) as f32;
		dispatcher.on_progressed(frame(progress)).await;
		tokio::time::sleep(Duration::from_millis(16)).await;
	}
	if cancel {
		dispatcher.on_cancelled();
	} else {
		dispatcher.on_completed();
	}
}
