//! Toolbar orchestration.
//!
//! [`Toolbar`] is created once per request. It decides whether the toolbar is
//! enabled, loads the configured panels and drives their hooks through the
//! request lifecycle:
//!
//! 1. [`Toolbar::attach`] records the initialization checkpoint and loads panels
//! 2. [`Toolbar::startup`] runs before the action
//! 3. [`Toolbar::before_render`] or [`Toolbar::before_redirect`] gathers the
//!    panel output and stores it in the history
//!
//! Panel failures, including panics, are contained per panel.

use crate::config::{DEFAULT_PANELS, DebugKitConfig, SettingsOverrides, ToolbarSettings};
use crate::context::ToolbarContext;
use crate::error::ToolbarResult;
use crate::history::{self, CACHE_NAMESPACE, CacheBackend, CacheConfig, HistoryCache};
use crate::panels::{LoadedPanels, PanelInit, PanelRegistry};
use crate::utils::inflector::{plugin_split, underscore};
use futures::FutureExt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Key of the history panel in [`RenderedContent`].
pub const HISTORY_PANEL_KEY: &str = "history";

/// Timer label covering toolbar initialization and panel startup.
pub const TIMER_COMPONENT_INIT: &str = "componentInit";
/// Timer label covering the controller action.
pub const TIMER_CONTROLLER_ACTION: &str = "controllerAction";
/// Timer label covering view rendering.
pub const TIMER_CONTROLLER_RENDER: &str = "controllerRender";

/// Panel output keyed by underscored panel name, in load order.
pub type RenderedContent = IndexMap<String, PanelOutput>;

/// One panel's contribution to the toolbar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelOutput {
	/// Serializable content produced by the panel.
	pub content: Value,
	/// Element used to render the content.
	pub element_name: String,
	/// Plugin that owns the element.
	pub plugin: String,
	/// Tab title.
	pub title: String,
	/// Keeps the toolbar's own rendering out of the timer panel.
	pub disable_timer: bool,
}

impl PanelOutput {
	/// Create an output entry.
	pub fn new(
		content: Value,
		element_name: impl Into<String>,
		plugin: impl Into<String>,
		title: impl Into<String>,
	) -> Self {
		Self {
			content,
			element_name: element_name.into(),
			plugin: plugin.into(),
			title: title.into(),
			disable_timer: true,
		}
	}
}

/// How the toolbar output should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
	/// HTML overlay for regular page views.
	Html,
	/// Machine readable log channel for AJAX and non-HTML responses.
	Log,
}

/// Settings handed to the toolbar view helper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HelperConfig {
	/// Output format.
	pub output: OutputFormat,
	/// History cache key of the client.
	pub cache_key: String,
	/// History cache namespace.
	pub cache_config: String,
	/// Whether the toolbar was force-enabled.
	pub force_enable: bool,
}

/// Variables made available to the rendering stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolbarVars {
	/// Gathered panel output.
	pub debug_toolbar_panels: RenderedContent,
	/// Script assets used by the toolbar.
	pub debug_toolbar_javascript: IndexMap<String, String>,
	/// View helper settings.
	pub helper: HelperConfig,
}

/// Why the toolbar is not active for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
	/// Debug mode is off and the toolbar is not force-enabled.
	DebugOff,
	/// Auto run is off and the request did not ask for the toolbar.
	NotRequested,
}

/// Result of attaching the toolbar to a request.
#[derive(Debug)]
pub enum Attachment {
	/// The toolbar runs for this request.
	Enabled(Box<Toolbar>),
	/// The toolbar stays out of the way.
	Disabled(DisabledReason),
}

impl Attachment {
	/// Whether the toolbar is active.
	pub fn is_enabled(&self) -> bool {
		matches!(self, Self::Enabled(_))
	}

	/// The active toolbar.
	pub fn toolbar(&self) -> Option<&Toolbar> {
		match self {
			Self::Enabled(toolbar) => Some(&**toolbar),
			Self::Disabled(_) => None,
		}
	}

	/// Take the active toolbar.
	pub fn into_toolbar(self) -> Option<Toolbar> {
		match self {
			Self::Enabled(toolbar) => Some(*toolbar),
			Self::Disabled(_) => None,
		}
	}

	/// History entry at `index`; always empty when the toolbar is disabled.
	pub async fn load_state(&self, index: usize) -> RenderedContent {
		match self {
			Self::Enabled(toolbar) => toolbar.load_state(index).await,
			Self::Disabled(_) => RenderedContent::new(),
		}
	}
}

/// Per-request toolbar orchestrator.
pub struct Toolbar {
	settings: ToolbarSettings,
	panels: LoadedPanels,
	history: Option<HistoryCache>,
	javascript: IndexMap<String, String>,
	helper: HelperConfig,
}

impl Toolbar {
	/// Attach the toolbar to the request described by `ctx`.
	///
	/// Returns [`Attachment::Disabled`] without touching timers, panels or the
	/// cache when the toolbar should not run.
	pub async fn attach(
		config: &DebugKitConfig,
		overrides: &SettingsOverrides,
		ctx: &ToolbarContext,
		registry: &PanelRegistry,
		backend: Arc<dyn CacheBackend>,
	) -> Attachment {
		let settings = ToolbarSettings::resolve(&config.defaults, overrides);

		if !config.allows(&settings) {
			tracing::debug!("debug toolbar disabled: debug mode is off");
			return Attachment::Disabled(DisabledReason::DebugOff);
		}
		if !settings.auto_run && !ctx.request.has_query_param("debug") {
			tracing::debug!("debug toolbar disabled: auto run is off and not requested");
			return Attachment::Disabled(DisabledReason::NotRequested);
		}

		ctx.timer.record("Component initialization");
		ctx.timer
			.start(TIMER_COMPONENT_INIT, "Component initialization and startup");

		let panel_list = PanelRegistry::resolve_panel_list(&DEFAULT_PANELS, &settings.panels);
		let fingerprint = ctx.request.user_agent();

		let wants_history = panel_list.iter().any(|p| is_history(plugin_split(p).1));
		let history = if wants_history && !config.cache_disabled {
			let history = HistoryCache::new(backend, fingerprint, settings.history_limit);
			history
				.configure(CacheConfig {
					duration: settings.cache_duration,
					engine: config.cache_engine,
					path: config.cache_path.clone(),
				})
				.await;
			Some(history)
		} else {
			None
		};

		let init = PanelInit {
			settings: settings.clone(),
			history: history.clone(),
		};
		let panels = registry.load(&panel_list, &init);
		tracing::debug!(panels = ?panels.keys().collect::<Vec<_>>(), "debug toolbar enabled");

		let helper = HelperConfig {
			output: OutputFormat::Html,
			cache_key: history::cache_key(fingerprint),
			cache_config: CACHE_NAMESPACE.to_string(),
			force_enable: settings.force_enable,
		};

		Attachment::Enabled(Box::new(Self {
			settings,
			panels,
			history,
			javascript: default_javascript(),
			helper,
		}))
	}

	/// Run panel startup hooks and open the controller action timer.
	pub async fn startup(&mut self, ctx: &ToolbarContext) {
		let request = &ctx.request;
		let is_html = matches!(request.extension(), None | Some("html"));
		self.helper.output = if !request.is_ajax() && is_html {
			OutputFormat::Html
		} else {
			OutputFormat::Log
		};

		for (name, panel) in self.panels.iter_mut() {
			guarded(name, "startup", panel.startup(ctx)).await;
		}

		ctx.timer.stop(TIMER_COMPONENT_INIT);
		ctx.timer
			.start(TIMER_CONTROLLER_ACTION, "Controller action");
		ctx.timer.record("Controller action start");
	}

	/// Gather and persist panel output, then open the render timer.
	pub async fn before_render(&mut self, ctx: &ToolbarContext) -> ToolbarVars {
		ctx.timer.stop(TIMER_CONTROLLER_ACTION);
		let vars = self.gather_vars(ctx).await;
		self.save_state(&vars).await;

		ctx.timer
			.start(TIMER_CONTROLLER_RENDER, "Render Controller Action");
		ctx.timer.record("Controller render start");

		ToolbarVars {
			debug_toolbar_panels: vars,
			debug_toolbar_javascript: self.javascript.clone(),
			helper: self.helper.clone(),
		}
	}

	/// Gather and persist panel output for a request ending in a redirect.
	pub async fn before_redirect(&mut self, ctx: &ToolbarContext) -> RenderedContent {
		ctx.timer.stop(TIMER_CONTROLLER_ACTION);
		for (name, panel) in self.panels.iter_mut() {
			guarded(name, "before_redirect", panel.before_redirect(ctx)).await;
		}
		let vars = self.gather_vars(ctx).await;
		self.save_state(&vars).await;
		vars
	}

	/// Collect `before_render` output of every panel in load order.
	///
	/// A failing panel contributes a `null` content entry.
	pub async fn gather_vars(&mut self, ctx: &ToolbarContext) -> RenderedContent {
		let mut vars = RenderedContent::with_capacity(self.panels.len());
		for (name, panel) in self.panels.iter_mut() {
			let key = underscore(name);
			let content = guarded(name, "before_render", panel.before_render(ctx))
				.await
				.unwrap_or(Value::Null);
			let element_name = panel
				.element_name()
				.map(str::to_string)
				.unwrap_or_else(|| format!("{key}_panel"));
			let output = PanelOutput::new(content, element_name, panel.plugin(), panel.title());
			vars.insert(key, output);
		}
		vars
	}

	/// History entry at `index`, or an empty map.
	pub async fn load_state(&self, index: usize) -> RenderedContent {
		match &self.history {
			Some(history) => history.load(index).await,
			None => RenderedContent::new(),
		}
	}

	/// Push `vars` into the history without the history panel's own entry.
	///
	/// Does nothing unless the history panel is loaded and the cache is usable.
	pub async fn save_state(&self, vars: &RenderedContent) {
		if !self.has_history_panel() {
			return;
		}
		let Some(history) = &self.history else {
			return;
		};
		let mut entry = vars.clone();
		entry.shift_remove(HISTORY_PANEL_KEY);
		history.push(entry).await;
	}

	/// Resolved settings.
	pub fn settings(&self) -> &ToolbarSettings {
		&self.settings
	}

	/// Loaded panels in load order.
	pub fn panels(&self) -> &LoadedPanels {
		&self.panels
	}

	/// Keys of the loaded panels in load order.
	pub fn panel_names(&self) -> Vec<&str> {
		self.panels.keys().map(String::as_str).collect()
	}

	/// History cache key of the client.
	pub fn cache_key(&self) -> &str {
		&self.helper.cache_key
	}

	/// Current view helper settings.
	pub fn helper_config(&self) -> &HelperConfig {
		&self.helper
	}

	/// Client history, when history is enabled.
	pub fn history(&self) -> Option<&HistoryCache> {
		self.history.as_ref()
	}

	fn has_history_panel(&self) -> bool {
		self.panels.keys().any(|name| is_history(name))
	}
}

impl std::fmt::Debug for Toolbar {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Toolbar")
			.field("settings", &self.settings)
			.field("panels", &self.panel_names())
			.field("history", &self.history)
			.field("helper", &self.helper)
			.finish()
	}
}

fn is_history(name: &str) -> bool {
	underscore(name) == HISTORY_PANEL_KEY
}

fn default_javascript() -> IndexMap<String, String> {
	IndexMap::from([
		("jquery".to_string(), "/debug_kit/js/jquery".to_string()),
		("libs".to_string(), "/debug_kit/js/js_debug_toolbar".to_string()),
	])
}

/// Await a panel hook, logging errors and panics instead of propagating them.
async fn guarded<T, F>(panel: &str, phase: &'static str, hook: F) -> Option<T>
where
	F: Future<Output = ToolbarResult<T>>,
{
	match AssertUnwindSafe(hook).catch_unwind().await {
		Ok(Ok(value)) => Some(value),
		Ok(Err(err)) => {
			tracing::warn!(panel, phase, error = %err, "debug toolbar panel failed");
			None
		}
		Err(payload) => {
			tracing::warn!(
				panel,
				phase,
				error = panic_message(payload.as_ref()),
				"debug toolbar panel panicked"
			);
			None
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		msg
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg
	} else {
		"unknown panic"
	}
}
