use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

use crate::TaskClass;

/// Multi-thread runtime for runs launched from synchronous code.
fn fallback_runtime() -> &'static Runtime {
	static FALLBACK: OnceLock<Runtime> = OnceLock::new();
	FALLBACK.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("navevent-run")
			.build()
			.expect("failed to build the navevent fallback runtime")
	})
}

/// Spawns a run task on the ambient runtime.
///
/// Gesture phases may be raised from a plain UI thread. In that case the
/// task lands on a shared fallback runtime instead.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	match Handle::try_current() {
		Ok(handle) => {
			tracing::trace!(worker_class = class.as_str(), "worker.spawn");
			handle.spawn(fut)
		}
		Err(_) => {
			tracing::trace!(worker_class = class.as_str(), "worker.spawn.fallback");
			fallback_runtime().spawn(fut)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn spawn_runs_on_the_current_runtime() {
		let out = spawn(TaskClass::Interactive, async { 7 }).await.unwrap();
		assert_eq!(out, 7);
	}

	#[test]
	fn spawn_from_a_plain_thread_uses_the_fallback_runtime() {
		let handle = spawn(TaskClass::Background, async { std::thread::current().name().map(str::to_owned) });
		let (tx, rx) = std::sync::mpsc::channel();
		std::thread::spawn(move || {
			let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
			let _ = tx.send(rt.block_on(handle).unwrap());
		});
		let name = rx.recv().unwrap();
		assert_eq!(name.as_deref(), Some("navevent-run"));
	}
}
