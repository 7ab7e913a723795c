//! Dispatcher configuration.

use std::path::Path;

use navevent_worker::TaskClass;
use serde::{Deserialize, Deserializer};

use crate::error::{ConfigError, Result};

/// Default number of progress events buffered per run before senders wait.
pub const DEFAULT_PROGRESS_CAPACITY: usize = 64;

/// Tunables shared by every handler registered on one dispatcher.
///
/// ```toml
/// progress_capacity = 16
/// task_class = "background"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationConfig {
	/// Bound of each run's progress queue.
	pub progress_capacity: usize,
	/// Class that run tasks are spawned under.
	#[serde(deserialize_with = "deserialize_task_class")]
	pub task_class: TaskClass,
}

impl Default for NavigationConfig {
	fn default() -> Self {
		Self {
			progress_capacity: DEFAULT_PROGRESS_CAPACITY,
			task_class: TaskClass::Interactive,
		}
	}
}

impl NavigationConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self> {
		let config: Self = toml::from_str(input)?;
		config.validate()
	}

	/// Reads, parses and validates a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}

	/// Rejects values the dispatcher cannot run with.
	pub fn validate(self) -> Result<Self> {
		if self.progress_capacity == 0 {
			return Err(ConfigError::InvalidCapacity(self.progress_capacity));
		}
		Ok(self)
	}
}

fn deserialize_task_class<'de, D>(deserializer: D) -> std::result::Result<TaskClass, D::Error>
where
	D: Deserializer<'de>,
{
	let name = String::deserialize(deserializer)?;
	name.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config = NavigationConfig::from_toml_str("").unwrap();
		assert_eq!(config, NavigationConfig::default());
		assert_eq!(config.progress_capacity, 64);
	}

	#[test]
	fn parses_all_fields() {
		let config = NavigationConfig::from_toml_str("progress_capacity = 8\ntask_class = \"background\"\n").unwrap();
		assert_eq!(config.progress_capacity, 8);
		assert_eq!(config.task_class, TaskClass::Background);
	}

	#[test]
	fn zero_capacity_is_rejected() {
		let err = NavigationConfig::from_toml_str("progress_capacity = 0").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidCapacity(0)), "got {err}");
	}

	#[test]
	fn unknown_keys_and_classes_are_rejected() {
		assert!(matches!(NavigationConfig::from_toml_str("capacity = 3"), Err(ConfigError::Toml(_))));
		assert!(matches!(NavigationConfig::from_toml_str("task_class = \"blocking\""), Err(ConfigError::Toml(_))));
	}

	#[test]
	fn load_reads_file_and_reports_missing_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "progress_capacity = 2").unwrap();
		assert_eq!(NavigationConfig::load(file.path()).unwrap().progress_capacity, 2);

		let missing = file.path().with_extension("missing");
		let err = NavigationConfig::load(&missing).unwrap_err();
		assert!(matches!(err, ConfigError::Io { ref path, .. } if *path == missing), "got {err}");
	}
}
