//! Cancellable dispatch of back navigation gestures.
//!
//! A hosting surface raises gesture phases into a [`NavigationEventDispatcher`].
//! The dispatcher picks one registered [`HandlerCallback`] per gesture (the
//! most recently registered enabled one) and that callback streams the
//! gesture's progress into a [`RunInstance`], whose task feeds a
//! [`ProgressStream`] to the handler's [`OnBack`] body.
//!
//! ```no_run
//! # async fn demo() {
//! use navevent::{NavigationEvent, NavigationEventDispatcher, ProgressStream};
//!
//! let dispatcher = NavigationEventDispatcher::new();
//! let _handler = dispatcher.register(|| true, |progress: ProgressStream| async move {
//! 	let events = progress.collect().await;
//! 	println!("back after {} updates", events.len());
//! });
//!
//! dispatcher.on_started(NavigationEvent::at_progress(0.0));
//! dispatcher.on_progressed(NavigationEvent::at_progress(0.5)).await;
//! dispatcher.on_completed();
//! # }
//! ```

mod callback;
mod config;
mod dispatcher;
pub mod error;
mod event;
mod progress;
mod registration;
mod run;

pub use callback::{CallbackId, EnabledPredicate, HandlerCallback};
pub use config::{DEFAULT_PROGRESS_CAPACITY, NavigationConfig};
pub use dispatcher::NavigationEventDispatcher;
pub use error::ConfigError;
pub use event::{GesturePhase, NavigationEvent, SwipeEdge};
pub use navevent_worker::{QueueSendError, RunId, TaskClass, join_error_panic_message};
pub use progress::{OnBack, ProgressStream};
pub use registration::HandlerRegistration;
pub use run::{DRAIN_VIOLATION, RunInstance, RunStatus};
