//! Enable-gated participant in back navigation.
//!
//! A [`HandlerCallback`] turns the four gesture phases into at most one live
//! [`RunInstance`] at a time:
//!
//! * `on_started` cancels whatever run is still around, then launches a
//!   predictive run when enabled.
//! * `on_progressed` forwards into the live run, if any.
//! * `on_completed` replaces a leftover single-shot run with a fresh one,
//!   launches one if none exists, and closes it.
//! * `on_cancelled` cancels the live run.
//!
//! Disabling a callback between gestures cancels its lingering run. Disabling
//! it mid-gesture has no effect until the next gesture starts.

use std::fmt;
use std::sync::Arc;

use navevent_worker::RunId;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::config::NavigationConfig;
use crate::event::{GesturePhase, NavigationEvent};
use crate::progress::OnBack;
use crate::run::{RunInstance, RunSettings, RunStatus};

/// Predicate deciding whether a callback currently wants back events.
pub type EnabledPredicate = Box<dyn Fn() -> bool + Send + Sync>;

/// Identifier of a callback within its dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub(crate) u64);

impl fmt::Display for CallbackId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "cb#{}", self.0)
	}
}

struct CallbackState {
	enabled: bool,
	active: bool,
	run: Option<RunInstance>,
	on_back: Arc<dyn OnBack>,
}

/// Registered back handler with its gesture state machine.
pub struct HandlerCallback {
	id: CallbackId,
	predicate: EnabledPredicate,
	settings: RunSettings,
	state: Mutex<CallbackState>,
}

impl fmt::Debug for HandlerCallback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("HandlerCallback")
			.field("id", &self.id)
			.field("enabled", &state.enabled)
			.field("active", &state.active)
			.field("run", &state.run.as_ref().map(RunInstance::id))
			.finish_non_exhaustive()
	}
}

impl HandlerCallback {
	/// Creates a standalone callback with default settings.
	///
	/// `enabled` is evaluated once now and again on every [`Self::refresh_enabled`].
	pub fn new(enabled: impl Fn() -> bool + Send + Sync + 'static, on_back: impl OnBack) -> Self {
		Self::with_settings(CallbackId(0), Box::new(enabled), Arc::new(on_back), RunSettings::default())
	}

	/// Creates a standalone callback whose runs follow `config`.
	///
	/// A `progress_capacity` of 0 is raised to 1, as in
	/// [`NavigationEventDispatcher::with_config`](crate::NavigationEventDispatcher::with_config).
	pub fn with_config(config: &NavigationConfig, enabled: impl Fn() -> bool + Send + Sync + 'static, on_back: impl OnBack) -> Self {
		Self::with_settings(CallbackId(0), Box::new(enabled), Arc::new(on_back), RunSettings::from_config(config))
	}

	pub(crate) fn with_settings(id: CallbackId, predicate: EnabledPredicate, on_back: Arc<dyn OnBack>, settings: RunSettings) -> Self {
		let enabled = predicate();
		Self {
			id,
			predicate,
			settings,
			state: Mutex::new(CallbackState {
				enabled,
				active: false,
				run: None,
				on_back,
			}),
		}
	}

	pub fn id(&self) -> CallbackId {
		self.id
	}

	/// Starts a predictive gesture.
	pub fn on_started(&self, event: &NavigationEvent) {
		let mut state = self.state.lock();
		// A single-shot run may still be finishing its body.
		if let Some(previous) = state.run.take() {
			previous.cancel();
		}
		if state.enabled {
			let run = RunInstance::launch_with(&self.settings, true, true, Arc::clone(&state.on_back));
			state.run = Some(run);
		}
		state.active = true;
		self.trace(GesturePhase::Started, &state);
		tracing::trace!(callback = %self.id, progress = event.progress, edge = ?event.swipe_edge, "navevent.callback.start_event");
	}

	/// Forwards one progress event to the live run.
	///
	/// Waits while the run's queue is full. Without a live run, or when the
	/// run no longer accepts events, this does nothing.
	pub async fn on_progressed(&self, event: NavigationEvent) {
		let sender = {
			let state = self.state.lock();
			self.trace(GesturePhase::Progressed, &state);
			state.run.as_ref().map(RunInstance::sender)
		};
		let Some(sender) = sender else {
			return;
		};
		if let Err(err) = sender.send(event).await {
			tracing::trace!(callback = %self.id, %err, "navevent.callback.progress_ignored");
		}
	}

	/// Completes the gesture, or performs a single-shot back action.
	pub fn on_completed(&self) {
		let mut state = self.state.lock();
		// A single-shot run from an earlier back action is restarted, not reused.
		if let Some(stale) = state.run.take_if(|run| !run.is_predictive()) {
			stale.cancel();
		}
		if state.run.is_none() {
			let run = RunInstance::launch_with(&self.settings, false, state.enabled, Arc::clone(&state.on_back));
			state.run = Some(run);
		}
		if let Some(run) = state.run.as_mut() {
			run.close();
			run.set_predictive(false);
		}
		state.active = false;
		self.trace(GesturePhase::Completed, &state);
	}

	/// Cancels the gesture and its run.
	pub fn on_cancelled(&self) {
		let mut state = self.state.lock();
		if let Some(run) = state.run.take() {
			run.cancel();
		}
		state.active = false;
		self.trace(GesturePhase::Cancelled, &state);
	}

	/// Updates the enabled flag.
	pub fn set_enabled(&self, enabled: bool) {
		let mut state = self.state.lock();
		if !enabled && state.enabled && !state.active {
			if let Some(run) = state.run.take() {
				run.cancel();
			}
		}
		if state.enabled != enabled {
			tracing::debug!(callback = %self.id, enabled, active = state.active, "navevent.callback.set_enabled");
		}
		state.enabled = enabled;
	}

	/// Re-evaluates the enabled predicate and applies it.
	pub fn refresh_enabled(&self) -> bool {
		let enabled = (self.predicate)();
		self.set_enabled(enabled);
		enabled
	}

	/// Replaces the handler body. The next run picks it up; a live run keeps its body.
	pub fn set_on_back(&self, on_back: impl OnBack) {
		self.state.lock().on_back = Arc::new(on_back);
	}

	pub fn is_enabled(&self) -> bool {
		self.state.lock().enabled
	}

	/// True between a gesture start and its completion or cancellation.
	pub fn is_active(&self) -> bool {
		self.state.lock().active
	}

	/// True when the current run was started by a gesture start.
	pub fn is_predictive(&self) -> bool {
		self.state.lock().run.as_ref().is_some_and(RunInstance::is_predictive)
	}

	/// True when a run exists that has not been cancelled and whose body is still running.
	pub fn has_live_run(&self) -> bool {
		self.state
			.lock()
			.run
			.as_ref()
			.is_some_and(|run| !run.is_cancelled() && run.current_status() == RunStatus::Running)
	}

	/// Id of the current run, if any.
	pub fn run_id(&self) -> Option<RunId> {
		self.state.lock().run.as_ref().map(RunInstance::id)
	}

	/// Status watcher of the current run, if any.
	pub fn run_status(&self) -> Option<watch::Receiver<RunStatus>> {
		self.state.lock().run.as_ref().map(RunInstance::status)
	}

	/// Cancels everything this callback owns. Used when it leaves its dispatcher.
	pub(crate) fn detach(&self) {
		let mut state = self.state.lock();
		state.active = false;
		if let Some(run) = state.run.take() {
			run.cancel();
		}
		tracing::debug!(callback = %self.id, "navevent.callback.detach");
	}

	fn trace(&self, phase: GesturePhase, state: &CallbackState) {
		tracing::trace!(
			callback = %self.id,
			phase = phase.as_str(),
			enabled = state.enabled,
			active = state.active,
			run_id = state.run.as_ref().map(|run| run.id().get()),
			predictive = state.run.as_ref().is_some_and(RunInstance::is_predictive),
			"navevent.callback.transition"
		);
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::time::Duration;

	use pretty_assertions::assert_eq;

	use super::*;
	use crate::progress::ProgressStream;

	const WAIT: Duration = Duration::from_secs(2);

	async fn settled(mut status: watch::Receiver<RunStatus>) -> RunStatus {
		let seen = tokio::time::timeout(WAIT, status.wait_for(|s| s.is_terminal()))
			.await
			.expect("run should settle")
			.expect("status is published before the sender drops");
		*seen
	}

	fn draining(calls: &Arc<AtomicUsize>) -> impl OnBack {
		let calls = Arc::clone(calls);
		move |progress: ProgressStream| {
			calls.fetch_add(1, Ordering::SeqCst);
			progress.drain()
		}
	}

	#[tokio::test]
	async fn start_launches_a_predictive_run_only_when_enabled() {
		let calls = Arc::new(AtomicUsize::new(0));
		let callback = HandlerCallback::new(|| true, draining(&calls));

		callback.on_started(&NavigationEvent::default());
		assert!(callback.is_active());
		assert!(callback.is_predictive());
		assert!(callback.run_id().is_some());

		callback.set_enabled(false);
		callback.on_cancelled();
		callback.on_started(&NavigationEvent::default());
		assert!(callback.is_active(), "active flag moves even when disabled");
		assert!(callback.run_id().is_none(), "no run is created while disabled");
	}

	#[tokio::test]
	async fn second_start_cancels_the_first_run() {
		let calls = Arc::new(AtomicUsize::new(0));
		let callback = HandlerCallback::new(|| true, draining(&calls));

		callback.on_started(&NavigationEvent::default());
		let first = callback.run_status().unwrap();
		let first_id = callback.run_id();

		callback.on_started(&NavigationEvent::default());
		let second = callback.run_status().unwrap();
		assert_ne!(callback.run_id(), first_id);

		assert_eq!(settled(first).await, RunStatus::Cancelled);
		callback.on_completed();
		assert_eq!(settled(second).await, RunStatus::Completed);
	}

	#[tokio::test]
	async fn completion_without_start_runs_a_single_shot() {
		let calls = Arc::new(AtomicUsize::new(0));
		let callback = HandlerCallback::new(|| true, draining(&calls));

		callback.on_completed();
		assert!(!callback.is_active());
		assert!(!callback.is_predictive());
		assert_eq!(settled(callback.run_status().unwrap()).await, RunStatus::Completed);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn single_shot_is_replaced_by_the_next_completion() {
		let release = Arc::new(tokio::sync::Notify::new());
		let gate = Arc::clone(&release);
		let callback = HandlerCallback::new(|| true, move |progress: ProgressStream| {
			let gate = Arc::clone(&gate);
			async move {
				progress.drain().await;
				gate.notified().await;
			}
		});

		callback.on_completed();
		let first = callback.run_status().unwrap();
		callback.on_completed();
		let second = callback.run_status().unwrap();

		assert_eq!(settled(first).await, RunStatus::Cancelled);
		release.notify_one();
		assert_eq!(settled(second).await, RunStatus::Completed);
	}

	#[tokio::test]
	async fn progress_without_a_run_is_ignored() {
		let calls = Arc::new(AtomicUsize::new(0));
		let callback = HandlerCallback::new(|| false, draining(&calls));

		callback.on_progressed(NavigationEvent::at_progress(0.5)).await;
		callback.on_cancelled();
		callback.on_cancelled();
		assert!(!callback.is_active());
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn completion_while_disabled_skips_the_body() {
		let calls = Arc::new(AtomicUsize::new(0));
		let callback = HandlerCallback::new(|| false, draining(&calls));

		callback.on_completed();
		let status = *callback.run_status().unwrap().borrow();
		assert_eq!(status, RunStatus::Skipped);
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn disabling_between_gestures_cancels_the_lingering_run() {
		let release = Arc::new(tokio::sync::Notify::new());
		let gate = Arc::clone(&release);
		let callback = HandlerCallback::new(|| true, move |progress: ProgressStream| {
			let gate = Arc::clone(&gate);
			async move {
				progress.drain().await;
				gate.notified().await;
			}
		});

		callback.on_completed();
		let lingering = callback.run_status().unwrap();
		callback.set_enabled(false);

		assert_eq!(settled(lingering).await, RunStatus::Cancelled);
		assert!(callback.run_id().is_none());
	}

	#[tokio::test]
	async fn disabling_mid_gesture_keeps_the_run() {
		let calls = Arc::new(AtomicUsize::new(0));
		let callback = HandlerCallback::new(|| true, draining(&calls));

		callback.on_started(&NavigationEvent::default());
		callback.set_enabled(false);
		assert!(callback.has_live_run());

		callback.on_progressed(NavigationEvent::at_progress(0.3)).await;
		callback.on_completed();
		assert_eq!(settled(callback.run_status().unwrap()).await, RunStatus::Completed);
	}

	#[tokio::test]
	async fn refresh_enabled_reads_the_predicate() {
		let flag = Arc::new(AtomicBool::new(true));
		let source = Arc::clone(&flag);
		let calls = Arc::new(AtomicUsize::new(0));
		let callback = HandlerCallback::new(move || source.load(Ordering::SeqCst), draining(&calls));
		assert!(callback.is_enabled());

		flag.store(false, Ordering::SeqCst);
		assert!(callback.is_enabled(), "predicate is not polled");
		assert!(!callback.refresh_enabled());
		assert!(!callback.is_enabled());
	}

	#[tokio::test]
	async fn replaced_body_is_used_by_the_next_run() {
		let old_calls = Arc::new(AtomicUsize::new(0));
		let new_calls = Arc::new(AtomicUsize::new(0));
		let callback = HandlerCallback::new(|| true, draining(&old_calls));

		callback.set_on_back(draining(&new_calls));
		callback.on_completed();
		settled(callback.run_status().unwrap()).await;

		assert_eq!(old_calls.load(Ordering::SeqCst), 0);
		assert_eq!(new_calls.load(Ordering::SeqCst), 1);
	}
}
