//! Gesture values delivered by the hosting surface.

/// Screen edge a back swipe started from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SwipeEdge {
	Left,
	Right,
	/// Not edge-driven, e.g. a hardware key or a button.
	#[default]
	None,
}

/// One moment of a back gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NavigationEvent {
	pub touch_x: f32,
	pub touch_y: f32,
	/// Fraction of the gesture completed, in `0.0..=1.0`.
	pub progress: f32,
	pub swipe_edge: SwipeEdge,
	pub frame_time_millis: u64,
}

impl NavigationEvent {
	/// Creates an event, clamping `progress` into `0.0..=1.0`.
	///
	/// A NaN progress is treated as zero.
	pub fn new(touch_x: f32, touch_y: f32, progress: f32, swipe_edge: SwipeEdge, frame_time_millis: u64) -> Self {
		let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
		Self {
			touch_x,
			touch_y,
			progress,
			swipe_edge,
			frame_time_millis,
		}
	}

	/// Event with only a progress fraction set.
	pub fn at_progress(progress: f32) -> Self {
		Self::new(0.0, 0.0, progress, SwipeEdge::None, 0)
	}
}

/// Phase of a gesture, as raised by the hosting surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GesturePhase {
	Started,
	Progressed,
	Completed,
	Cancelled,
}

impl GesturePhase {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Started => "started",
			Self::Progressed => "progressed",
			Self::Completed => "completed",
			Self::Cancelled => "cancelled",
		}
	}

	/// Returns true for the phases that end a gesture.
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Completed | Self::Cancelled)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn progress_is_clamped() {
		assert_eq!(NavigationEvent::at_progress(1.5).progress, 1.0);
		assert_eq!(NavigationEvent::at_progress(-0.2).progress, 0.0);
		assert_eq!(NavigationEvent::at_progress(f32::NAN).progress, 0.0);
		assert_eq!(NavigationEvent::at_progress(0.25).progress, 0.25);
	}

	#[test]
	fn only_completion_and_cancellation_are_terminal() {
		assert!(!GesturePhase::Started.is_terminal());
		assert!(!GesturePhase::Progressed.is_terminal());
		assert!(GesturePhase::Completed.is_terminal());
		assert!(GesturePhase::Cancelled.is_terminal());
	}
}
