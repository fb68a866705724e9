//! Panel system
//!
//! A panel is a unit of diagnostic output. Each panel is created for a single
//! request, receives the lifecycle hooks in load order and contributes one entry
//! to the toolbar output.

pub mod history;
pub mod include;
pub mod log;
pub mod registry;
pub mod request;
pub mod session;
pub mod sql;
pub mod timer;
pub mod variables;

use crate::config::ToolbarSettings;
use crate::context::ToolbarContext;
use crate::error::ToolbarResult;
use crate::history::HistoryCache;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

pub use registry::{PanelFactory, PanelRegistry};

/// Plugin tag of the built-in panels.
pub const DEFAULT_PLUGIN: &str = "DebugKit";

/// Panels in load order, keyed by identifier without the plugin prefix.
pub type LoadedPanels = IndexMap<String, Box<dyn Panel>>;

/// Lifecycle contract every panel implements.
#[async_trait]
pub trait Panel: Send + Sync {
	/// Title shown on the toolbar tab.
	fn title(&self) -> &str;

	/// Plugin (namespace) that owns the panel's element.
	fn plugin(&self) -> &str {
		DEFAULT_PLUGIN
	}

	/// Element rendering the panel; `None` selects `<key>_panel`.
	fn element_name(&self) -> Option<&str> {
		None
	}

	/// Called once the controller is ready, before the action runs.
	async fn startup(&mut self, _ctx: &ToolbarContext) -> ToolbarResult<()> {
		Ok(())
	}

	/// Produce the panel content for the current request.
	async fn before_render(&mut self, ctx: &ToolbarContext) -> ToolbarResult<Value>;

	/// Called when the action ends in a redirect, before the content is gathered.
	async fn before_redirect(&mut self, _ctx: &ToolbarContext) -> ToolbarResult<()> {
		Ok(())
	}
}

/// Everything a panel factory may need.
#[derive(Debug, Clone)]
pub struct PanelInit {
	/// Resolved toolbar settings.
	pub settings: ToolbarSettings,
	/// History of the current client, when history is enabled.
	pub history: Option<HistoryCache>,
}

impl PanelInit {
	/// Create an init block without history access.
	pub fn new(settings: ToolbarSettings) -> Self {
		Self {
			settings,
			history: None,
		}
	}
}
