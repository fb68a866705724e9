//! Static panel registry and loader.
//!
//! Panels are looked up by identifier in a table of factory functions filled by
//! explicit registration. Identifiers have the form `Plugin.Name`; the plugin
//! part is optional for lookups and removed from the keys of loaded panels.

use super::{
	DEFAULT_PLUGIN, LoadedPanels, Panel, PanelInit, history::HistoryPanel, include::IncludePanel,
	log::LogPanel, request::RequestPanel, session::SessionPanel, sql::SqlLogPanel,
	timer::TimerPanel, variables::VariablesPanel,
};
use crate::config::PanelOverrides;
use crate::error::{ToolbarError, ToolbarResult};
use crate::utils::inflector::{plugin_split, underscore};
use indexmap::IndexMap;
use std::sync::Arc;

/// Builds a panel for one request.
pub type PanelFactory = Arc<dyn Fn(&PanelInit) -> ToolbarResult<Box<dyn Panel>> + Send + Sync>;

/// Registry mapping panel identifiers to factories.
#[derive(Clone, Default)]
pub struct PanelRegistry {
	factories: IndexMap<String, PanelFactory>,
}

impl PanelRegistry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a registry holding the built-in panels.
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry.register("DebugKit.History", |init| {
			Ok(Box::new(HistoryPanel::new(init.history.clone())))
		});
		registry.register("DebugKit.Session", |_| Ok(Box::new(SessionPanel)));
		registry.register("DebugKit.Request", |_| Ok(Box::new(RequestPanel)));
		registry.register("DebugKit.SqlLog", |_| Ok(Box::new(SqlLogPanel::new())));
		registry.register("DebugKit.Timer", |_| Ok(Box::new(TimerPanel)));
		registry.register("DebugKit.Log", |_| Ok(Box::new(LogPanel)));
		registry.register("DebugKit.Variables", |_| Ok(Box::new(VariablesPanel)));
		registry.register("DebugKit.Include", |_| Ok(Box::new(IncludePanel)));
		registry
	}

	/// Register `factory` under `identifier`, replacing any earlier factory.
	pub fn register<F>(&mut self, identifier: impl Into<String>, factory: F)
	where
		F: Fn(&PanelInit) -> ToolbarResult<Box<dyn Panel>> + Send + Sync + 'static,
	{
		self.factories.insert(identifier.into(), Arc::new(factory));
	}

	/// Registered identifiers in registration order.
	pub fn identifiers(&self) -> impl Iterator<Item = &str> {
		self.factories.keys().map(String::as_str)
	}

	/// Whether `identifier` resolves to a factory.
	pub fn contains(&self, identifier: &str) -> bool {
		self.lookup(identifier).is_some()
	}

	/// Apply `overrides` to `defaults`.
	///
	/// Each removal drops the first matching entry, compared by full identifier
	/// or, for unqualified names, by underscored bare name. Additions are
	/// appended in order and skipped when a matching entry already exists, so the
	/// result never contains duplicates.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_debug_kit::{PanelOverrides, PanelRegistry};
	///
	/// let panels = PanelRegistry::resolve_panel_list(
	///     &["DebugKit.History", "DebugKit.SqlLog", "DebugKit.Timer"],
	///     &PanelOverrides::default().remove("sqlLog").add("App.Cache"),
	/// );
	/// assert_eq!(panels, ["DebugKit.History", "DebugKit.Timer", "App.Cache"]);
	/// ```
	pub fn resolve_panel_list<S: AsRef<str>>(
		defaults: &[S],
		overrides: &PanelOverrides,
	) -> Vec<String> {
		let mut panels: Vec<String> = Vec::with_capacity(defaults.len() + overrides.add.len());
		for panel in defaults.iter().map(AsRef::as_ref) {
			if !panels.iter().any(|p| p == panel) {
				panels.push(panel.to_string());
			}
		}

		for name in &overrides.remove {
			if let Some(index) = panels.iter().position(|p| identifier_matches(p, name)) {
				panels.remove(index);
			}
		}

		for name in &overrides.add {
			if !panels.iter().any(|p| identifier_matches(p, name)) {
				panels.push(name.clone());
			}
		}

		panels
	}

	/// Instantiate `identifiers` in order.
	///
	/// Identifiers without a factory, and factories that fail, are skipped with a
	/// warning. Keys are the identifiers without their plugin prefix.
	pub fn load<S: AsRef<str>>(&self, identifiers: &[S], init: &PanelInit) -> LoadedPanels {
		let mut panels = LoadedPanels::with_capacity(identifiers.len());
		for identifier in identifiers.iter().map(AsRef::as_ref) {
			let (_, name) = plugin_split(identifier);
			let created = self
				.lookup(identifier)
				.ok_or_else(|| ToolbarError::PanelLoad(identifier.to_string()))
				.and_then(|factory| factory(init));

			match created {
				Ok(panel) => {
					if panels.insert(name.to_string(), panel).is_some() {
						tracing::warn!(
							panel = %identifier,
							"panel key '{name}' loaded twice, keeping the later one"
						);
					}
				}
				Err(err) => {
					tracing::warn!(panel = %identifier, error = %err, "skipping debug toolbar panel");
				}
			}
		}
		panels
	}

	fn lookup(&self, identifier: &str) -> Option<&PanelFactory> {
		if let Some(factory) = self.factories.get(identifier) {
			return Some(factory);
		}
		let (plugin, name) = plugin_split(identifier);
		if plugin.is_none() {
			if let Some(factory) = self.factories.get(&format!("{DEFAULT_PLUGIN}.{name}")) {
				return Some(factory);
			}
		}
		let wanted = underscore(name);
		self.factories
			.iter()
			.find(|(registered, _)| {
				let (reg_plugin, reg_name) = plugin_split(registered);
				(plugin.is_none() || plugin == reg_plugin) && underscore(reg_name) == wanted
			})
			.map(|(_, factory)| factory)
	}
}

impl std::fmt::Debug for PanelRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PanelRegistry")
			.field("panels", &self.factories.keys().collect::<Vec<_>>())
			.finish()
	}
}

fn identifier_matches(entry: &str, name: &str) -> bool {
	if entry == name {
		return true;
	}
	let (name_plugin, bare) = plugin_split(name);
	name_plugin.is_none() && underscore(plugin_split(entry).1) == underscore(bare)
}
