//! Consumer-side view of one run's progress events.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use navevent_worker::{QueueReceiver, Recv, RunId};

use crate::event::NavigationEvent;

/// Lazy, single-pass stream of the progress events of one gesture.
///
/// The stream ends when the gesture completes. A handler body must read it to
/// the end before returning; the run task fails otherwise. When the gesture
/// is cancelled the stream also yields `None`, but the run task is aborted
/// and [`ProgressStream::is_cancelled`] reports it.
#[derive(Debug)]
pub struct ProgressStream {
	run_id: RunId,
	rx: QueueReceiver<NavigationEvent>,
	drained: Arc<AtomicBool>,
	cancelled: bool,
}

impl ProgressStream {
	pub(crate) fn new(run_id: RunId, rx: QueueReceiver<NavigationEvent>, drained: Arc<AtomicBool>) -> Self {
		Self {
			run_id,
			rx,
			drained,
			cancelled: false,
		}
	}

	/// Waits for the next progress event.
	pub async fn next(&mut self) -> Option<NavigationEvent> {
		match self.rx.recv().await {
			Recv::Item(event) => Some(event),
			Recv::Closed => {
				self.drained.store(true, Ordering::Release);
				None
			}
			Recv::Cancelled => {
				self.cancelled = true;
				None
			}
		}
	}

	/// Reads and discards every remaining event.
	pub async fn drain(mut self) {
		while self.next().await.is_some() {}
	}

	/// Reads every remaining event into a vector.
	pub async fn collect(mut self) -> Vec<NavigationEvent> {
		let mut events = Vec::new();
		while let Some(event) = self.next().await {
			events.push(event);
		}
		events
	}

	/// Returns true once the stream observed cancellation of its gesture.
	pub fn is_cancelled(&self) -> bool {
		self.cancelled || self.rx.is_cancelled()
	}

	/// Id of the run feeding this stream.
	pub fn run_id(&self) -> RunId {
		self.run_id
	}
}

/// Body of a back handler, run once per gesture with that gesture's progress.
#[async_trait]
pub trait OnBack: Send + Sync + 'static {
	async fn on_back(&self, progress: ProgressStream);
}

#[async_trait]
impl<F, Fut> OnBack for F
where
	F: Fn(ProgressStream) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = ()> + Send + 'static,
{
	async fn on_back(&self, progress: ProgressStream) {
		self(progress).await;
	}
}
