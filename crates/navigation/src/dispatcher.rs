//! Precedence routing of gestures to registered callbacks.
//!
//! ## Target selection
//!
//! - Callbacks are searched most recently registered first, so a nested
//!   handler registered after its parent always wins while enabled.
//! - The first enabled callback is picked once per gesture, when it starts,
//!   and keeps receiving that gesture even if enablement changes midway.
//! - A gesture that starts with no enabled callback stays unhandled until it
//!   ends, as does the rest of a gesture whose owner was unregistered.
//! - Progress or completion that arrives with no gesture started (a
//!   single-shot back action) picks the top-most enabled callback at that
//!   point. A bare cancellation has nothing to cancel and is dropped.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::callback::{CallbackId, HandlerCallback};
use crate::config::NavigationConfig;
use crate::event::{GesturePhase, NavigationEvent};
use crate::progress::OnBack;
use crate::registration::HandlerRegistration;
use crate::run::RunSettings;

/// Routing of the gesture between its first phase and its terminal phase.
#[derive(Default)]
enum Gesture {
	#[default]
	Idle,
	Routed(Arc<HandlerCallback>),
	/// Started with no target, or lost its target mid-gesture.
	Unhandled,
}

impl Gesture {
	fn owner(&self) -> Option<&Arc<HandlerCallback>> {
		match self {
			Self::Routed(callback) => Some(callback),
			Self::Idle | Self::Unhandled => None,
		}
	}
}

#[derive(Default)]
struct DispatcherState {
	/// Highest precedence first.
	callbacks: Vec<Arc<HandlerCallback>>,
	gesture: Gesture,
}

impl DispatcherState {
	fn top_enabled(&self) -> Option<Arc<HandlerCallback>> {
		self.callbacks.iter().find(|callback| callback.is_enabled()).cloned()
	}

	fn route_top_enabled(&mut self) -> Option<Arc<HandlerCallback>> {
		let target = self.top_enabled();
		self.gesture = match &target {
			Some(callback) => Gesture::Routed(Arc::clone(callback)),
			None => Gesture::Unhandled,
		};
		target
	}
}

pub(crate) struct DispatcherInner {
	settings: RunSettings,
	next_callback: AtomicU64,
	state: Mutex<DispatcherState>,
}

impl DispatcherInner {
	/// Cancels the callback's gesture if it owns one, then detaches it.
	pub(crate) fn remove(&self, callback: &Arc<HandlerCallback>) -> bool {
		let mut state = self.state.lock();
		let Some(index) = state.callbacks.iter().position(|c| Arc::ptr_eq(c, callback)) else {
			return false;
		};
		if state.gesture.owner().is_some_and(|c| Arc::ptr_eq(c, callback)) {
			state.gesture = Gesture::Unhandled;
			callback.on_cancelled();
		}
		callback.detach();
		state.callbacks.remove(index);
		tracing::debug!(callback = %callback.id(), remaining = state.callbacks.len(), "navevent.dispatcher.remove");
		true
	}
}

/// Ordered registry of back handlers for one UI scope.
///
/// Cloning yields another handle to the same registry. The gesture source
/// must raise phases sequentially: at most one `on_started`, any number of
/// `on_progressed`, then exactly one of `on_completed` or `on_cancelled`.
#[derive(Clone)]
pub struct NavigationEventDispatcher {
	inner: Arc<DispatcherInner>,
}

impl fmt::Debug for NavigationEventDispatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("NavigationEventDispatcher")
			.field("callbacks", &state.callbacks.len())
			.field("in_progress", &state.gesture.owner().map(|c| c.id()))
			.finish_non_exhaustive()
	}
}

impl Default for NavigationEventDispatcher {
	fn default() -> Self {
		Self::new()
	}
}

impl NavigationEventDispatcher {
	/// Creates a dispatcher with default settings.
	pub fn new() -> Self {
		Self::with_config(&NavigationConfig::default())
	}

	/// Creates a dispatcher whose runs follow `config`.
	///
	/// `config` is taken as is: a hand-built `progress_capacity` of 0 is
	/// raised to 1. Call [`NavigationConfig::validate`] first to reject it.
	pub fn with_config(config: &NavigationConfig) -> Self {
		Self {
			inner: Arc::new(DispatcherInner {
				settings: RunSettings::from_config(config),
				next_callback: AtomicU64::new(1),
				state: Mutex::new(DispatcherState::default()),
			}),
		}
	}

	/// Registers a handler with the highest precedence so far.
	///
	/// `enabled` is evaluated now and on every
	/// [`HandlerRegistration::refresh_enabled`]. Dropping the returned
	/// registration unregisters the handler.
	#[must_use = "dropping the registration unregisters the handler"]
	pub fn register(&self, enabled: impl Fn() -> bool + Send + Sync + 'static, on_back: impl OnBack) -> HandlerRegistration {
		let id = CallbackId(self.inner.next_callback.fetch_add(1, Ordering::Relaxed));
		let callback = Arc::new(HandlerCallback::with_settings(
			id,
			Box::new(enabled),
			Arc::new(on_back),
			self.inner.settings.clone(),
		));
		let mut state = self.inner.state.lock();
		state.callbacks.insert(0, Arc::clone(&callback));
		tracing::debug!(callback = %id, enabled = callback.is_enabled(), total = state.callbacks.len(), "navevent.dispatcher.register");
		drop(state);
		HandlerRegistration::new(callback, Arc::downgrade(&self.inner))
	}

	/// Starts a gesture, cancelling any gesture still in progress.
	pub fn on_started(&self, event: NavigationEvent) {
		let (previous, target) = {
			let mut state = self.inner.state.lock();
			let previous = match std::mem::take(&mut state.gesture) {
				Gesture::Routed(callback) => Some(callback),
				Gesture::Idle | Gesture::Unhandled => None,
			};
			let target = state.route_top_enabled();
			(previous, target)
		};
		if let Some(previous) = previous {
			tracing::debug!(callback = %previous.id(), "navevent.dispatcher.restart");
			previous.on_cancelled();
		}
		match target {
			Some(callback) => {
				self.trace_route(GesturePhase::Started, Some(callback.id()));
				callback.on_started(&event);
			}
			None => self.trace_route(GesturePhase::Started, None),
		}
	}

	/// Forwards progress to the gesture's target, waiting on backpressure.
	pub async fn on_progressed(&self, event: NavigationEvent) {
		let target = {
			let mut state = self.inner.state.lock();
			match &state.gesture {
				Gesture::Idle => state.route_top_enabled(),
				Gesture::Routed(callback) => Some(Arc::clone(callback)),
				Gesture::Unhandled => None,
			}
		};
		self.trace_route(GesturePhase::Progressed, target.as_ref().map(|c| c.id()));
		if let Some(callback) = target {
			callback.on_progressed(event).await;
		}
	}

	/// Completes the gesture, or performs a single-shot back action.
	pub fn on_completed(&self) {
		let target = {
			let mut state = self.inner.state.lock();
			match std::mem::take(&mut state.gesture) {
				Gesture::Idle => state.top_enabled(),
				Gesture::Routed(callback) => Some(callback),
				Gesture::Unhandled => None,
			}
		};
		self.trace_route(GesturePhase::Completed, target.as_ref().map(|c| c.id()));
		if let Some(callback) = target {
			callback.on_completed();
		}
	}

	/// Cancels the gesture in progress.
	pub fn on_cancelled(&self) {
		let target = match std::mem::take(&mut self.inner.state.lock().gesture) {
			Gesture::Routed(callback) => Some(callback),
			Gesture::Idle | Gesture::Unhandled => None,
		};
		self.trace_route(GesturePhase::Cancelled, target.as_ref().map(|c| c.id()));
		if let Some(callback) = target {
			callback.on_cancelled();
		}
	}

	/// True when at least one registered callback is enabled.
	pub fn has_enabled_callbacks(&self) -> bool {
		self.inner.state.lock().callbacks.iter().any(|c| c.is_enabled())
	}

	/// Callback that would receive a gesture starting now.
	pub fn current_target(&self) -> Option<Arc<HandlerCallback>> {
		self.inner.state.lock().top_enabled()
	}

	/// Callback owning the gesture in progress.
	pub fn in_progress(&self) -> Option<Arc<HandlerCallback>> {
		self.inner.state.lock().gesture.owner().cloned()
	}

	/// Number of registered callbacks.
	pub fn len(&self) -> usize {
		self.inner.state.lock().callbacks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn trace_route(&self, phase: GesturePhase, target: Option<CallbackId>) {
		match target {
			Some(id) => tracing::trace!(phase = phase.as_str(), callback = %id, "navevent.dispatcher.route"),
			None => tracing::trace!(phase = phase.as_str(), "navevent.dispatcher.unhandled"),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use super::*;
	use crate::progress::ProgressStream;
	use crate::run::RunStatus;

	fn counting(calls: &Arc<AtomicUsize>) -> impl OnBack {
		let calls = Arc::clone(calls);
		move |progress: ProgressStream| {
			calls.fetch_add(1, Ordering::SeqCst);
			progress.drain()
		}
	}

	#[tokio::test]
	async fn later_registrations_take_precedence() {
		let dispatcher = NavigationEventDispatcher::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let parent = dispatcher.register(|| true, counting(&calls));
		let child = dispatcher.register(|| true, counting(&calls));

		let target = dispatcher.current_target().unwrap();
		assert_eq!(target.id(), child.callback().id());

		child.set_enabled(false);
		let target = dispatcher.current_target().unwrap();
		assert_eq!(target.id(), parent.callback().id());
	}

	#[tokio::test]
	async fn no_enabled_callback_drops_every_phase() {
		let dispatcher = NavigationEventDispatcher::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let _disabled = dispatcher.register(|| false, counting(&calls));

		assert!(!dispatcher.has_enabled_callbacks());
		dispatcher.on_started(NavigationEvent::default());
		dispatcher.on_progressed(NavigationEvent::at_progress(0.5)).await;
		dispatcher.on_completed();
		dispatcher.on_cancelled();

		assert!(dispatcher.in_progress().is_none());
		tokio::task::yield_now().await;
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn target_is_fixed_at_gesture_start() {
		let dispatcher = NavigationEventDispatcher::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let parent = dispatcher.register(|| true, counting(&calls));
		let child = dispatcher.register(|| true, counting(&calls));

		dispatcher.on_started(NavigationEvent::default());
		child.set_enabled(false);
		dispatcher.on_progressed(NavigationEvent::at_progress(0.2)).await;

		let owner = dispatcher.in_progress().unwrap();
		assert_eq!(owner.id(), child.callback().id());
		assert!(!parent.callback().is_active());

		dispatcher.on_completed();
		assert!(dispatcher.in_progress().is_none());
		assert!(!child.callback().is_active());
	}

	#[tokio::test]
	async fn gesture_started_without_a_target_stays_unhandled() {
		let dispatcher = NavigationEventDispatcher::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let late = dispatcher.register(|| false, counting(&calls));

		dispatcher.on_started(NavigationEvent::default());
		late.set_enabled(true);
		dispatcher.on_progressed(NavigationEvent::at_progress(0.5)).await;
		assert!(dispatcher.in_progress().is_none());
		dispatcher.on_completed();

		tokio::task::yield_now().await;
		assert_eq!(calls.load(Ordering::SeqCst), 0);
		assert!(late.callback().run_id().is_none());

		// The next gesture sees the callback enabled.
		dispatcher.on_started(NavigationEvent::default());
		assert_eq!(dispatcher.in_progress().unwrap().id(), late.callback().id());
	}

	#[tokio::test]
	async fn bare_cancel_leaves_a_finishing_single_shot_alone() {
		let dispatcher = NavigationEventDispatcher::new();
		let release = Arc::new(tokio::sync::Notify::new());
		let gate = Arc::clone(&release);
		let registration = dispatcher.register(|| true, move |progress: ProgressStream| {
			let gate = Arc::clone(&gate);
			async move {
				progress.drain().await;
				gate.notified().await;
			}
		});

		dispatcher.on_completed();
		let mut status = registration.callback().run_status().unwrap();
		dispatcher.on_cancelled();
		release.notify_one();

		let settled = tokio::time::timeout(std::time::Duration::from_secs(2), status.wait_for(|s| s.is_terminal()))
			.await
			.unwrap()
			.map(|s| *s)
			.unwrap();
		assert_eq!(settled, RunStatus::Completed);
	}

	#[tokio::test]
	async fn remove_is_idempotent_and_releases_the_gesture() {
		let dispatcher = NavigationEventDispatcher::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let registration = dispatcher.register(|| true, counting(&calls));
		let callback = Arc::clone(registration.callback());

		dispatcher.on_started(NavigationEvent::default());
		assert!(callback.is_active());

		assert!(registration.unregister());
		assert!(!registration.unregister());
		assert!(dispatcher.is_empty());
		assert!(dispatcher.in_progress().is_none());
		assert!(!callback.is_active());
		assert!(callback.run_id().is_none());
	}
}
