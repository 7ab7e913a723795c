//! Error types for navigation configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading a [`NavigationConfig`](crate::NavigationConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or types.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// The progress queue needs room for at least one event.
	#[error("invalid progress_capacity: {0} (must be at least 1)")]
	InvalidCapacity(usize),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
