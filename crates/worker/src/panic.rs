use tokio::task::JoinError;

/// Extracts the panic message from a failed task, if it panicked.
///
/// Returns `None` for tasks that were aborted, which is how run tasks end
/// when their gesture is cancelled.
pub fn join_error_panic_message(err: JoinError) -> Option<String> {
	if !err.is_panic() {
		return None;
	}
	let payload = err.into_panic();
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		return Some((*msg).to_owned());
	}
	if let Some(msg) = payload.downcast_ref::<String>() {
		return Some(msg.clone());
	}
	Some("non-string panic payload".to_owned())
}
