use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::callback::HandlerCallback;
use crate::dispatcher::DispatcherInner;
use crate::progress::OnBack;

/// Handle the hosting layer keeps for one registered back handler.
///
/// Dropping it unregisters the handler.
#[derive(Debug)]
pub struct HandlerRegistration {
	callback: Arc<HandlerCallback>,
	dispatcher: Weak<DispatcherInner>,
	registered: AtomicBool,
}

impl HandlerRegistration {
	pub(crate) fn new(callback: Arc<HandlerCallback>, dispatcher: Weak<DispatcherInner>) -> Self {
		Self {
			callback,
			dispatcher,
			registered: AtomicBool::new(true),
		}
	}

	/// Enables or disables the handler.
	pub fn set_enabled(&self, enabled: bool) {
		self.callback.set_enabled(enabled);
	}

	/// Re-evaluates the enabled predicate given at registration.
	pub fn refresh_enabled(&self) -> bool {
		self.callback.refresh_enabled()
	}

	/// Replaces the handler body for subsequent gestures.
	pub fn set_on_back(&self, on_back: impl OnBack) {
		self.callback.set_on_back(on_back);
	}

	pub fn is_enabled(&self) -> bool {
		self.callback.is_enabled()
	}

	pub fn is_registered(&self) -> bool {
		self.registered.load(Ordering::Acquire)
	}

	/// The underlying callback.
	pub fn callback(&self) -> &Arc<HandlerCallback> {
		&self.callback
	}

	/// Removes the handler from its dispatcher, cancelling its gesture and run.
	///
	/// Returns `false` when it was already unregistered.
	pub fn unregister(&self) -> bool {
		if !self.registered.swap(false, Ordering::AcqRel) {
			return false;
		}
		match self.dispatcher.upgrade() {
			Some(dispatcher) => {
				dispatcher.remove(&self.callback);
			}
			None => self.callback.detach(),
		}
		true
	}
}

impl Drop for HandlerRegistration {
	fn drop(&mut self) {
		self.unregister();
	}
}
