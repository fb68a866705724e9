//! Debug toolbar Tower layer

use crate::config::{DebugKitConfig, SettingsOverrides, ToolbarSettings};
use crate::history::{self, CacheBackend};
use crate::middleware::DebugToolbarService;
use crate::panels::PanelRegistry;
use std::sync::Arc;
use tower::Layer;

/// Tower layer for debug toolbar middleware
#[derive(Clone)]
pub struct DebugToolbarLayer {
	pub(crate) config: Arc<DebugKitConfig>,
	pub(crate) overrides: Arc<SettingsOverrides>,
	pub(crate) registry: Arc<PanelRegistry>,
	pub(crate) backend: Arc<dyn CacheBackend>,
}

impl DebugToolbarLayer {
	/// Create new toolbar layer with configuration, panel registry and history backend
	pub fn new(
		config: DebugKitConfig,
		registry: PanelRegistry,
		backend: Arc<dyn CacheBackend>,
	) -> Self {
		Self {
			config: Arc::new(config),
			overrides: Arc::new(SettingsOverrides::default()),
			registry: Arc::new(registry),
			backend,
		}
	}

	/// Create toolbar layer with the built-in panels and the configured cache engine
	pub fn from_config(config: DebugKitConfig) -> Self {
		let backend = history::backend_for(&config);
		Self::new(config, PanelRegistry::with_defaults(), backend)
	}

	/// Settings applied on top of the configured defaults for every request
	pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
		self.overrides = Arc::new(overrides);
		self
	}

	/// Shared configuration
	pub fn config(&self) -> &DebugKitConfig {
		&self.config
	}
}

impl Default for DebugToolbarLayer {
	fn default() -> Self {
		Self::from_config(DebugKitConfig::default())
	}
}

impl std::fmt::Debug for DebugToolbarLayer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DebugToolbarLayer")
			.field("config", &self.config)
			.field("overrides", &self.overrides)
			.field("registry", &self.registry)
			.finish_non_exhaustive()
	}
}

impl<S> Layer<S> for DebugToolbarLayer {
	type Service = DebugToolbarService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		let settings = ToolbarSettings::resolve(&self.config.defaults, &self.overrides);
		DebugToolbarService {
			inner,
			active: self.config.allows(&settings),
			config: self.config.clone(),
			overrides: self.overrides.clone(),
			registry: self.registry.clone(),
			backend: self.backend.clone(),
		}
	}
}
