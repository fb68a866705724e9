//! Toolbar configuration.
//!
//! Settings come from two layers: the process-wide [`DebugKitConfig`] and the
//! overrides given when the toolbar is attached. [`ToolbarSettings::resolve`]
//! merges both into the immutable settings used for one request.

use crate::error::{ToolbarError, ToolbarResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Panels loaded when no override is given, in display order.
pub const DEFAULT_PANELS: [&str; 8] = [
	"DebugKit.History",
	"DebugKit.Session",
	"DebugKit.Request",
	"DebugKit.SqlLog",
	"DebugKit.Timer",
	"DebugKit.Log",
	"DebugKit.Variables",
	"DebugKit.Include",
];

/// Number of past requests kept in the history buffer by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Default lifetime of the history cache.
pub const DEFAULT_CACHE_DURATION: &str = "+4 hours";

/// Storage engine for the history cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEngine {
	/// Process memory.
	#[default]
	Memory,
	/// JSON files below `cache_path`.
	File,
}

/// Process-wide debug kit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugKitConfig {
	/// Global debug flag; the toolbar stays off without it unless force-enabled.
	pub debug: bool,
	/// Disable every cache, which turns history off.
	pub cache_disabled: bool,
	/// History storage engine.
	pub cache_engine: CacheEngine,
	/// Directory for the file engine.
	pub cache_path: PathBuf,
	/// Process-wide toolbar defaults.
	pub defaults: SettingsOverrides,
}

impl Default for DebugKitConfig {
	fn default() -> Self {
		Self {
			debug: false,
			cache_disabled: false,
			cache_engine: CacheEngine::Memory,
			cache_path: std::env::temp_dir().join("reinhardt_debug_kit"),
			defaults: SettingsOverrides::default(),
		}
	}
}

impl DebugKitConfig {
	/// Parse a TOML document.
	///
	/// A top-level `[debug_kit]` table is used when present, otherwise the whole
	/// document is read as the configuration.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_debug_kit::DebugKitConfig;
	///
	/// let config = DebugKitConfig::from_toml_str(r#"
	/// [debug_kit]
	/// debug = true
	///
	/// [debug_kit.defaults]
	/// history_limit = 5
	///
	/// [debug_kit.defaults.panels]
	/// remove = ["DebugKit.SqlLog"]
	/// "#).unwrap();
	///
	/// assert!(config.debug);
	/// assert_eq!(config.defaults.history_limit, Some(5));
	/// ```
	pub fn from_toml_str(source: &str) -> ToolbarResult<Self> {
		let mut table: toml::Table = toml::from_str(source)?;
		let config: Self = match table.remove("debug_kit") {
			Some(section) => section.try_into()?,
			None => toml::Value::Table(table).try_into()?,
		};
		Ok(config)
	}

	/// Whether the toolbar may run at all under `settings`.
	///
	/// This is the global switch: debug mode or an explicit force-enable.
	pub fn allows(&self, settings: &ToolbarSettings) -> bool {
		self.debug || settings.force_enable
	}
}

/// Explicit add/remove edits applied to the default panel list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelOverrides {
	/// Identifiers appended after the defaults.
	pub add: Vec<String>,
	/// Identifiers (or bare names) removed from the defaults.
	pub remove: Vec<String>,
}

impl PanelOverrides {
	/// Whether the overrides change nothing.
	pub fn is_empty(&self) -> bool {
		self.add.is_empty() && self.remove.is_empty()
	}

	/// Append an identifier.
	pub fn add(mut self, identifier: impl Into<String>) -> Self {
		self.add.push(identifier.into());
		self
	}

	/// Remove an identifier.
	pub fn remove(mut self, identifier: impl Into<String>) -> Self {
		self.remove.push(identifier.into());
		self
	}
}

/// Optional setting values; unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsOverrides {
	/// Show the toolbar even when the debug flag is off.
	pub force_enable: Option<bool>,
	/// Show the toolbar without the `debug` query parameter.
	pub auto_run: Option<bool>,
	/// Panel list edits.
	pub panels: Option<PanelOverrides>,
	/// Maximum number of history entries.
	pub history_limit: Option<usize>,
	/// History lifetime, e.g. `"+4 hours"` or `"3600"`.
	pub cache_duration: Option<String>,
}

/// Resolved settings for one toolbar attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarSettings {
	/// Show the toolbar even when the debug flag is off.
	pub force_enable: bool,
	/// Show the toolbar without the `debug` query parameter.
	pub auto_run: bool,
	/// Panel list edits, merged from both layers.
	pub panels: PanelOverrides,
	/// Maximum number of history entries.
	pub history_limit: usize,
	/// History lifetime.
	pub cache_duration: Duration,
}

impl Default for ToolbarSettings {
	fn default() -> Self {
		Self {
			force_enable: false,
			auto_run: true,
			panels: PanelOverrides::default(),
			history_limit: DEFAULT_HISTORY_LIMIT,
			cache_duration: Duration::from_secs(4 * 3600),
		}
	}
}

impl ToolbarSettings {
	/// Merge process-wide defaults with per-attach overrides.
	///
	/// Scalar values from `attach` win. Panel edits from both layers are
	/// concatenated, process-wide first. An unparsable duration falls back to
	/// the default with a warning.
	pub fn resolve(global: &SettingsOverrides, attach: &SettingsOverrides) -> Self {
		let base = Self::default();

		let mut panels = PanelOverrides::default();
		for layer in [&global.panels, &attach.panels].into_iter().flatten() {
			panels.add.extend(layer.add.iter().cloned());
			panels.remove.extend(layer.remove.iter().cloned());
		}

		let cache_duration = attach
			.cache_duration
			.as_deref()
			.or(global.cache_duration.as_deref())
			.map(|raw| {
				parse_duration(raw).unwrap_or_else(|err| {
					tracing::warn!(error = %err, "falling back to {DEFAULT_CACHE_DURATION}");
					base.cache_duration
				})
			})
			.unwrap_or(base.cache_duration);

		Self {
			force_enable: attach
				.force_enable
				.or(global.force_enable)
				.unwrap_or(base.force_enable),
			auto_run: attach.auto_run.or(global.auto_run).unwrap_or(base.auto_run),
			panels,
			history_limit: attach
				.history_limit
				.or(global.history_limit)
				.unwrap_or(base.history_limit),
			cache_duration,
		}
	}
}

/// Parse a relative duration such as `"+4 hours"`, `"30 minutes"` or `"90"` (seconds).
///
/// # Examples
///
/// ```
/// use reinhardt_debug_kit::config::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("+4 hours").unwrap(), Duration::from_secs(14_400));
/// assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
/// ```
pub fn parse_duration(raw: &str) -> ToolbarResult<Duration> {
	let invalid = || ToolbarError::InvalidDuration(raw.to_string());
	let trimmed = raw.trim().trim_start_matches('+').trim();

	if let Ok(secs) = trimmed.parse::<u64>() {
		return Ok(Duration::from_secs(secs));
	}

	let (amount, unit) = trimmed.split_once(char::is_whitespace).ok_or_else(invalid)?;
	let amount: u64 = amount.parse().map_err(|_| invalid())?;
	let unit_secs = match unit.trim().trim_end_matches('s') {
		"second" | "sec" => 1,
		"minute" | "min" => 60,
		"hour" => 3_600,
		"day" => 86_400,
		"week" => 604_800,
		_ => return Err(invalid()),
	};
	Ok(Duration::from_secs(amount * unit_secs))
}
