/// Execution classes used for run task scheduling and observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work that directly follows a user gesture, such as back handler bodies.
	#[default]
	Interactive,
	/// Work that may lag behind the gesture that triggered it.
	Background,
}

impl TaskClass {
	/// Stable name used in tracing fields and configuration files.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
		}
	}
}

impl std::str::FromStr for TaskClass {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"interactive" => Ok(Self::Interactive),
			"background" => Ok(Self::Background),
			other => Err(format!("unknown task class '{other}' (expected 'interactive' or 'background')")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names_round_trip_through_from_str() {
		for class in [TaskClass::Interactive, TaskClass::Background] {
			assert_eq!(class.as_str().parse::<TaskClass>(), Ok(class));
		}
		assert!("blocking".parse::<TaskClass>().is_err());
	}
}
