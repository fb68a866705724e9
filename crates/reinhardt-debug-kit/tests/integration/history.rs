//! History persistence across requests

use crate::common::fixtures::*;
use reinhardt_debug_kit::config::CacheEngine;
use reinhardt_debug_kit::history::{self, CACHE_NAMESPACE};
use reinhardt_debug_kit::{
	CacheBackend, DebugKitConfig, HistoryCache, PanelRegistry, SettingsOverrides, Toolbar,
};
use rstest::*;
use std::sync::Arc;

fn limited(limit: usize) -> SettingsOverrides {
	SettingsOverrides {
		history_limit: Some(limit),
		..Default::default()
	}
}

async fn saved_paths(backend: &Arc<dyn CacheBackend>, agent: &str) -> Vec<String> {
	HistoryCache::new(backend.clone(), agent, 10)
		.entries()
		.await
		.iter()
		.map(|entry| entry["request"].content["path"].as_str().unwrap().to_string())
		.collect()
}

#[rstest]
#[tokio::test]
async fn test_history_keeps_most_recent_within_limit(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	for path in ["/r1", "/r2", "/r3", "/r4"] {
		render_request(&debug_config, &limited(3), &registry, &backend, path)
			.await
			.unwrap();
	}

	assert_eq!(saved_paths(&backend, TEST_AGENT).await, ["/r4", "/r3", "/r2"]);
}

#[rstest]
#[tokio::test]
async fn test_history_panel_lists_previous_requests(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	render_request(&debug_config, &limited(3), &registry, &backend, "/first")
		.await
		.unwrap();
	let vars = render_request(&debug_config, &limited(3), &registry, &backend, "/second")
		.await
		.unwrap();

	let content = &vars.debug_toolbar_panels["history"].content;
	assert_eq!(content["limit"], 3);
	assert_eq!(content["entries"].as_array().unwrap().len(), 1);
	assert_eq!(content["entries"][0]["path"], "/first");
	assert_eq!(content["entries"][0]["method"], "GET");
}

#[rstest]
#[tokio::test]
async fn test_load_state_by_index(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	for path in ["/a", "/b"] {
		render_request(&debug_config, &SettingsOverrides::default(), &registry, &backend, path)
			.await
			.unwrap();
	}

	let ctx = context("/c", TEST_AGENT);
	let toolbar = Toolbar::attach(
		&debug_config,
		&SettingsOverrides::default(),
		&ctx,
		&registry,
		backend.clone(),
	)
	.await
	.into_toolbar()
	.unwrap();

	assert_eq!(toolbar.load_state(0).await["request"].content["path"], "/b");
	assert_eq!(toolbar.load_state(1).await["request"].content["path"], "/a");
	assert!(toolbar.load_state(2).await.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_clients_have_separate_histories(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	render_request(&debug_config, &SettingsOverrides::default(), &registry, &backend, "/mine")
		.await
		.unwrap();

	let ctx = context("/theirs", "other-client/2.0");
	let mut toolbar = Toolbar::attach(
		&debug_config,
		&SettingsOverrides::default(),
		&ctx,
		&registry,
		backend.clone(),
	)
	.await
	.into_toolbar()
	.unwrap();
	toolbar.startup(&ctx).await;
	toolbar.before_render(&ctx).await;

	assert_ne!(toolbar.cache_key(), history::cache_key(TEST_AGENT));
	assert_eq!(saved_paths(&backend, TEST_AGENT).await, ["/mine"]);
	assert_eq!(saved_paths(&backend, "other-client/2.0").await, ["/theirs"]);
}

#[rstest]
#[tokio::test]
async fn test_cache_disabled_turns_history_off(
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let config = DebugKitConfig {
		debug: true,
		cache_disabled: true,
		..Default::default()
	};

	let vars = render_request(&config, &SettingsOverrides::default(), &registry, &backend, "/")
		.await
		.unwrap();

	assert_eq!(vars.debug_toolbar_panels.len(), 8);
	assert_eq!(vars.debug_toolbar_panels["history"].content["limit"], 0);
	assert!(!backend.is_configured(CACHE_NAMESPACE).await);
	assert!(saved_paths(&backend, TEST_AGENT).await.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_zero_limit_stores_nothing(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	render_request(&debug_config, &limited(0), &registry, &backend, "/")
		.await
		.unwrap();

	assert!(backend.is_configured(CACHE_NAMESPACE).await);
	assert!(saved_paths(&backend, TEST_AGENT).await.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_file_engine_persists_history(registry: PanelRegistry) {
	let dir = tempfile::tempdir().unwrap();
	let config = DebugKitConfig {
		debug: true,
		cache_engine: CacheEngine::File,
		cache_path: dir.path().to_path_buf(),
		..Default::default()
	};
	let backend = history::backend_for(&config);

	for path in ["/one", "/two"] {
		render_request(&config, &SettingsOverrides::default(), &registry, &backend, path)
			.await
			.unwrap();
	}

	let file = dir
		.path()
		.join(CACHE_NAMESPACE)
		.join(format!("{}.json", history::cache_key(TEST_AGENT)));
	assert!(file.exists());
	assert_eq!(saved_paths(&backend, TEST_AGENT).await, ["/two", "/one"]);
}
