use std::sync::Arc;

use navevent::{OnBack, ProgressStream};

/// Sink for user-visible messages.
pub trait Notifier: Send + Sync + 'static {
	fn notify(&self, message: &str);
}

/// Prints messages to stdout, the way a toast would show them.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
	fn notify(&self, message: &str) {
		tracing::info!(message, "demo.notify");
		println!("[toast] {message}");
	}
}

/// Handler body that ignores in-progress updates and announces the back action.
pub fn announce(notifier: Arc<dyn Notifier>, message: &'static str) -> impl OnBack {
	move |progress: ProgressStream| {
		let notifier = Arc::clone(&notifier);
		async move {
			progress.drain().await;
			notifier.notify(message);
		}
	}
}
