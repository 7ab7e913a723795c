use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Identifier of one gesture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(u64);

impl RunId {
	/// Returns the raw id.
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for RunId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "run#{}", self.0)
	}
}

/// Monotonic id clock shared by every run spawned from one dispatcher.
#[derive(Debug, Default, Clone)]
pub struct RunClock {
	next: Arc<AtomicU64>,
}

impl RunClock {
	/// Creates a new clock starting at id 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next run id.
	pub fn next(&self) -> RunId {
		RunId(self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
	}
}

/// Run-scoped cancellation token.
#[derive(Debug, Clone)]
pub struct RunToken {
	id: RunId,
	cancel: CancellationToken,
}

impl RunToken {
	/// Creates a fresh, uncancelled token for `id`.
	pub fn new(id: RunId) -> Self {
		Self {
			id,
			cancel: CancellationToken::new(),
		}
	}

	/// Returns the run id.
	pub const fn id(&self) -> RunId {
		self.id
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation. Idempotent.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clock_is_monotonic_across_clones() {
		let clock = RunClock::new();
		let other = clock.clone();
		assert_eq!(clock.next().get(), 1);
		assert_eq!(other.next().get(), 2);
		assert_eq!(clock.next().to_string(), "run#3");
	}

	#[tokio::test]
	async fn cancel_wakes_waiters_and_is_idempotent() {
		let token = RunToken::new(RunClock::new().next());
		let waiter = token.clone();
		let task = tokio::spawn(async move { waiter.cancelled().await });
		token.cancel();
		token.cancel();
		task.await.unwrap();
		assert!(token.is_cancelled());
	}
}
