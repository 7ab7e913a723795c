//! Per-gesture execution unit.
//!
//! A [`RunInstance`] owns the producer half of a bounded progress queue and
//! the task that feeds the consumer half to an [`OnBack`] body. Completion
//! closes the queue so the body sees the end of its stream; cancellation
//! purges the queue and aborts the task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use navevent_worker::{HandoffQueue, QueueSendError, QueueSender, RunClock, RunId, RunToken, TaskClass, join_error_panic_message};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::NavigationConfig;
use crate::event::NavigationEvent;
use crate::progress::{OnBack, ProgressStream};

/// Panic message raised when a handler body returns before its stream ended.
pub const DRAIN_VIOLATION: &str = "progress stream must be collected before on_back returns";

/// Lifecycle of one run as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
	/// The handler was disabled when the run was created; its body never ran.
	Skipped,
	/// The body is executing.
	Running,
	/// The body read its stream to the end and returned.
	Completed,
	/// The run was cancelled and its task aborted.
	Cancelled,
	/// The body panicked or returned without draining its stream.
	Failed,
}

impl RunStatus {
	pub const fn is_terminal(self) -> bool {
		!matches!(self, Self::Running)
	}
}

/// Settings every run created by one dispatcher shares.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
	pub(crate) clock: RunClock,
	pub(crate) capacity: usize,
	pub(crate) class: TaskClass,
}

impl RunSettings {
	pub(crate) fn from_config(config: &NavigationConfig) -> Self {
		Self {
			clock: RunClock::new(),
			capacity: config.progress_capacity.max(1),
			class: config.task_class,
		}
	}
}

impl Default for RunSettings {
	fn default() -> Self {
		Self::from_config(&NavigationConfig::default())
	}
}

/// Live execution context bridging pushed progress events to one body.
#[derive(Debug)]
pub struct RunInstance {
	id: RunId,
	predictive: bool,
	sender: QueueSender<NavigationEvent>,
	token: RunToken,
	task: Option<JoinHandle<()>>,
	status: watch::Receiver<RunStatus>,
}

impl RunInstance {
	/// Creates the run and, when `enabled`, starts `on_back` on its own task.
	///
	/// A disabled run has no task: sends are rejected, `close` and `cancel`
	/// still work, and its status is [`RunStatus::Skipped`].
	pub fn launch(id: RunId, predictive: bool, enabled: bool, on_back: Arc<dyn OnBack>, capacity: usize, class: TaskClass) -> Self {
		let (sender, receiver) = HandoffQueue::new(capacity).split();
		let token = RunToken::new(id);

		if !enabled {
			tracing::debug!(run_id = %id, predictive, "navevent.run.skipped");
			let (_, status) = watch::channel(RunStatus::Skipped);
			drop(receiver);
			return Self {
				id,
				predictive,
				sender,
				token,
				task: None,
				status,
			};
		}

		let (status_tx, status) = watch::channel(RunStatus::Running);
		let drained = Arc::new(AtomicBool::new(false));
		let stream = ProgressStream::new(id, receiver, Arc::clone(&drained));
		let guard = StatusGuard {
			id,
			status: status_tx,
			token: token.clone(),
			sender: sender.clone(),
			finished: false,
		};
		let task_token = token.clone();

		tracing::debug!(run_id = %id, predictive, worker_class = class.as_str(), "navevent.run.launch");
		let task = navevent_worker::spawn(class, async move {
			let mut guard = guard;
			tokio::select! {
				biased;
				_ = task_token.cancelled() => {}
				_ = on_back.on_back(stream) => {
					if task_token.is_cancelled() {
						return;
					}
					if !drained.load(Ordering::Acquire) {
						tracing::error!(run_id = %guard.id, "navevent.run.drain_violation");
						panic!("{DRAIN_VIOLATION}");
					}
					guard.finished = true;
				}
			}
		});

		Self {
			id,
			predictive,
			sender,
			token,
			task: Some(task),
			status,
		}
	}

	/// Launches a run with the shared dispatcher settings.
	pub(crate) fn launch_with(settings: &RunSettings, predictive: bool, enabled: bool, on_back: Arc<dyn OnBack>) -> Self {
		Self::launch(settings.clock.next(), predictive, enabled, on_back, settings.capacity, settings.class)
	}

	pub fn id(&self) -> RunId {
		self.id
	}

	/// True when the run was created by a gesture start rather than a single-shot back action.
	pub fn is_predictive(&self) -> bool {
		self.predictive
	}

	pub(crate) fn set_predictive(&mut self, predictive: bool) {
		self.predictive = predictive;
	}

	/// Enqueues one progress event, waiting while the queue is full.
	pub async fn send(&self, event: NavigationEvent) -> Result<(), QueueSendError> {
		self.sender.send(event).await
	}

	/// Producer handle usable without borrowing the instance across an await.
	pub(crate) fn sender(&self) -> QueueSender<NavigationEvent> {
		self.sender.clone()
	}

	/// Ends the stream. Buffered events are still delivered. Idempotent.
	pub fn close(&self) {
		if self.sender.close() {
			tracing::trace!(run_id = %self.id, buffered = self.sender.len(), "navevent.run.close");
		}
	}

	/// Purges buffered events and aborts the body. Idempotent.
	pub fn cancel(&self) {
		if self.token.is_cancelled() {
			return;
		}
		self.token.cancel();
		let purged = self.sender.cancel().unwrap_or(0);
		if let Some(task) = &self.task {
			task.abort();
		}
		tracing::debug!(run_id = %self.id, purged, "navevent.run.cancel");
	}

	/// True once [`Self::close`] or [`Self::cancel`] was called.
	pub fn is_closed(&self) -> bool {
		self.sender.is_closed()
	}

	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Current status.
	pub fn current_status(&self) -> RunStatus {
		*self.status.borrow()
	}

	/// Status watcher that keeps working after the instance is dropped.
	pub fn status(&self) -> watch::Receiver<RunStatus> {
		self.status.clone()
	}

	/// Waits for the task to end and returns its final status.
	///
	/// A panicking body, including one that broke the drain contract, is
	/// reported as `Err` with the panic message. Waiting on a run that is
	/// neither closed nor cancelled blocks until the gesture source ends it.
	pub async fn join(mut self) -> Result<RunStatus, String> {
		let Some(task) = self.task.take() else {
			return Ok(self.current_status());
		};
		match task.await {
			Ok(()) => Ok(self.current_status()),
			Err(err) => match join_error_panic_message(err) {
				Some(message) => Err(message),
				None => Ok(RunStatus::Cancelled),
			},
		}
	}
}

impl Drop for RunInstance {
	fn drop(&mut self) {
		self.cancel();
	}
}

/// Publishes the final status of a run task however the task ends.
struct StatusGuard {
	id: RunId,
	status: watch::Sender<RunStatus>,
	token: RunToken,
	sender: QueueSender<NavigationEvent>,
	finished: bool,
}

impl Drop for StatusGuard {
	fn drop(&mut self) {
		let status = if self.finished {
			RunStatus::Completed
		} else if self.token.is_cancelled() {
			RunStatus::Cancelled
		} else {
			RunStatus::Failed
		};
		if status != RunStatus::Completed {
			// Producers must never park on a queue nobody reads.
			self.sender.cancel();
		}
		tracing::debug!(run_id = %self.id, status = ?status, "navevent.run.finish");
		self.status.send_replace(status);
	}
}
