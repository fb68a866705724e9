//! Debug kit error types.

use thiserror::Error;

/// Result type for toolbar operations.
pub type ToolbarResult<T> = Result<T, ToolbarError>;

/// Errors raised inside the debug kit.
///
/// Only configuration parsing hands these back to callers. During a request
/// they are logged and turned into partial toolbar output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolbarError {
	/// Invalid or unusable configuration.
	#[error("configuration error: {0}")]
	Configuration(String),

	/// A configured panel could not be created.
	#[error("could not load debug toolbar panel {0}")]
	PanelLoad(String),

	/// A panel hook failed.
	#[error("panel '{panel}' failed during {phase}: {message}")]
	PanelRuntime {
		/// Panel key.
		panel: String,
		/// Lifecycle phase (startup, before_render, before_redirect).
		phase: &'static str,
		/// Error message.
		message: String,
	},

	/// Cache backend failure.
	#[error("cache error: {0}")]
	Cache(String),

	/// Duration string could not be parsed.
	#[error("invalid duration: {0}")]
	InvalidDuration(String),

	/// JSON (de)serialization failure.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// TOML parsing failure.
	#[error("TOML parse error: {0}")]
	TomlParse(#[from] toml::de::Error),

	/// IO error.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl ToolbarError {
	/// Build a runtime error for a panel hook.
	pub fn panel_runtime(
		panel: impl Into<String>,
		phase: &'static str,
		message: impl std::fmt::Display,
	) -> Self {
		Self::PanelRuntime {
			panel: panel.into(),
			phase,
			message: message.to_string(),
		}
	}
}
