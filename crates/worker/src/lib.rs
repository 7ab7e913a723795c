//! Runtime primitives shared by navigation event handlers.
//!
//! * [`spawn`] routes run tasks onto the ambient tokio runtime.
//! * [`RunClock`] and [`RunToken`] identify and cancel individual runs.
//! * [`queue`] hands progress events from the gesture source to a run task.

mod class;
mod panic;
pub mod queue;
mod spawn;
mod token;

pub use class::TaskClass;
pub use panic::join_error_panic_message;
pub use queue::{HandoffQueue, QueueReceiver, QueueSendError, QueueSender, Recv};
pub use spawn::spawn;
pub use token::{RunClock, RunId, RunToken};
