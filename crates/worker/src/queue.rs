//! Bounded hand-off queue between a gesture source and one run task.
//!
//! Senders wait for capacity instead of dropping. The queue ends in one of two
//! ways: [`QueueSender::close`] lets the receiver drain what is buffered and
//! then observe [`Recv::Closed`], while [`QueueSender::cancel`] purges the
//! buffer and makes the receiver observe [`Recv::Cancelled`] immediately.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;

/// Error returned when an item cannot be enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueSendError {
	/// Queue is at capacity and the non-blocking path was used.
	#[error("hand-off queue is full")]
	Full,
	/// Queue was closed; no more items are accepted.
	#[error("hand-off queue is closed")]
	Closed,
	/// Queue was cancelled and its buffer purged.
	#[error("hand-off queue was cancelled")]
	Cancelled,
	/// The receiver was dropped.
	#[error("hand-off queue receiver is gone")]
	Disconnected,
}

/// Outcome of one receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recv<T> {
	/// Next buffered item, in send order.
	Item(T),
	/// Queue was closed and every buffered item has been delivered.
	Closed,
	/// Queue was cancelled. Buffered items were discarded.
	Cancelled,
}

struct QueueState<T> {
	items: VecDeque<T>,
	closed: bool,
	cancelled: bool,
	disconnected: bool,
}

struct QueueInner<T> {
	capacity: usize,
	state: Mutex<QueueState<T>>,
	notify_recv: Notify,
	notify_send: Notify,
}

impl<T> QueueInner<T> {
	fn wake_all(&self) {
		self.notify_recv.notify_waiters();
		self.notify_send.notify_waiters();
	}
}

/// Bounded single-consumer queue with backpressure, close and cancel.
pub struct HandoffQueue<T> {
	sender: QueueSender<T>,
	receiver: QueueReceiver<T>,
}

/// Producer half. Cheap to clone.
pub struct QueueSender<T> {
	inner: Arc<QueueInner<T>>,
}

/// Consumer half. There is exactly one per queue.
pub struct QueueReceiver<T> {
	inner: Arc<QueueInner<T>>,
}

impl<T> Clone for QueueSender<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> std::fmt::Debug for QueueSender<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("QueueSender").field("capacity", &self.inner.capacity).finish_non_exhaustive()
	}
}

impl<T> std::fmt::Debug for QueueReceiver<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("QueueReceiver").field("capacity", &self.inner.capacity).finish_non_exhaustive()
	}
}

impl<T> HandoffQueue<T> {
	/// Creates a queue holding at most `capacity` undelivered items.
	pub fn new(capacity: usize) -> Self {
		assert!(capacity > 0, "hand-off queue capacity must be > 0");
		let inner = Arc::new(QueueInner {
			capacity,
			state: Mutex::new(QueueState {
				items: VecDeque::with_capacity(capacity),
				closed: false,
				cancelled: false,
				disconnected: false,
			}),
			notify_recv: Notify::new(),
			notify_send: Notify::new(),
		});
		Self {
			sender: QueueSender { inner: Arc::clone(&inner) },
			receiver: QueueReceiver { inner },
		}
	}

	/// Splits the queue into its producer and consumer halves.
	pub fn split(self) -> (QueueSender<T>, QueueReceiver<T>) {
		(self.sender, self.receiver)
	}
}

impl<T> QueueSender<T> {
	/// Enqueues `item`, waiting while the queue is full.
	///
	/// A sender parked on a full queue is woken with an error when the queue
	/// is closed or cancelled underneath it.
	pub async fn send(&self, item: T) -> Result<(), QueueSendError> {
		loop {
			let notified = self.inner.notify_send.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();

			{
				let mut state = self.inner.state.lock();
				check_open(&state)?;
				if state.items.len() < self.inner.capacity {
					state.items.push_back(item);
					drop(state);
					self.inner.notify_recv.notify_one();
					return Ok(());
				}
			}
			notified.await;
		}
	}

	/// Enqueues `item` without waiting.
	pub fn try_send(&self, item: T) -> Result<(), QueueSendError> {
		let mut state = self.inner.state.lock();
		check_open(&state)?;
		if state.items.len() >= self.inner.capacity {
			return Err(QueueSendError::Full);
		}
		state.items.push_back(item);
		drop(state);
		self.inner.notify_recv.notify_one();
		Ok(())
	}

	/// Stops accepting items. Buffered items are still delivered.
	///
	/// Returns `false` when the queue was already closed or cancelled.
	pub fn close(&self) -> bool {
		let mut state = self.inner.state.lock();
		if state.closed {
			return false;
		}
		state.closed = true;
		drop(state);
		self.inner.wake_all();
		true
	}

	/// Stops accepting items and discards everything buffered.
	///
	/// Returns the number of purged items, or `None` when the queue was
	/// already cancelled.
	pub fn cancel(&self) -> Option<usize> {
		let mut state = self.inner.state.lock();
		if state.cancelled {
			return None;
		}
		state.cancelled = true;
		state.closed = true;
		let purged = state.items.len();
		state.items.clear();
		drop(state);
		self.inner.wake_all();
		Some(purged)
	}

	/// Returns the number of buffered items.
	pub fn len(&self) -> usize {
		self.inner.state.lock().items.len()
	}

	/// Returns true when nothing is buffered.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns queue capacity.
	pub fn capacity(&self) -> usize {
		self.inner.capacity
	}

	/// Returns true once the queue was closed or cancelled.
	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	/// Returns true once the queue was cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.inner.state.lock().cancelled
	}
}

impl<T> QueueReceiver<T> {
	/// Receives the next item in send order.
	pub async fn recv(&mut self) -> Recv<T> {
		loop {
			let notified = self.inner.notify_recv.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();

			{
				let mut state = self.inner.state.lock();
				if state.cancelled {
					return Recv::Cancelled;
				}
				if let Some(item) = state.items.pop_front() {
					drop(state);
					self.inner.notify_send.notify_one();
					return Recv::Item(item);
				}
				if state.closed {
					return Recv::Closed;
				}
			}
			notified.await;
		}
	}

	/// Returns true once the queue was cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.inner.state.lock().cancelled
	}
}

impl<T> Drop for QueueReceiver<T> {
	fn drop(&mut self) {
		let mut state = self.inner.state.lock();
		state.disconnected = true;
		state.items.clear();
		drop(state);
		self.inner.wake_all();
	}
}

fn check_open<T>(state: &QueueState<T>) -> Result<(), QueueSendError> {
	if state.cancelled {
		Err(QueueSendError::Cancelled)
	} else if state.closed {
		Err(QueueSendError::Closed)
	} else if state.disconnected {
		Err(QueueSendError::Disconnected)
	} else {
		Ok(())
	}
}
