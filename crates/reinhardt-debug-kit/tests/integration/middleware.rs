//! Tower middleware integration

use crate::common::fixtures::*;
use reinhardt_debug_kit::context::{LogLevel, SqlQuery, current_context};
use reinhardt_debug_kit::{
	CacheBackend, DebugKitConfig, DebugToolbarLayer, HistoryCache, PanelRegistry, SessionData,
	SettingsOverrides, ToolbarContext, ToolbarVars,
};
use rstest::*;
use serde_json::{Map, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tower::{Service, ServiceBuilder, ServiceExt, service_fn};

async fn handler(req: http::Request<()>) -> Result<http::Response<()>, Infallible> {
	if let Some(ctx) = current_context() {
		ctx.record_sql(SqlQuery::new(
			"SELECT * FROM articles WHERE id = 7",
			Duration::from_millis(2),
		));
		ctx.log(LogLevel::Info, "article loaded");
		ctx.set_var("title", json!("Hello"));
		ctx.add_include("src/views/articles.rs");
	}
	let status = if req.uri().path() == "/redirect" { 302 } else { 200 };
	let has_context = req.extensions().get::<Arc<ToolbarContext>>().is_some();
	let scoped = current_context().is_some();
	let response = http::Response::builder()
		.status(status)
		.header("X-Context", if has_context { "1" } else { "0" })
		.header("X-Scoped", if scoped { "1" } else { "0" })
		.body(())
		.unwrap();
	Ok(response)
}

fn service(
	config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) -> impl Service<http::Request<()>, Response = http::Response<()>, Error = Infallible> + Clone {
	ServiceBuilder::new()
		.layer(DebugToolbarLayer::new(config, registry, backend))
		.service(service_fn(handler))
}

#[rstest]
#[tokio::test]
async fn test_rendered_response_carries_toolbar_vars(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let svc = service(debug_config, registry, backend.clone());
	let response = svc.oneshot(request("/articles/7", TEST_AGENT)).await.unwrap();

	assert_eq!(response.status(), 200);
	assert_eq!(response.headers()["X-Context"], "1");
	assert_eq!(response.headers()["X-Scoped"], "1");
	let vars = response
		.extensions()
		.get::<ToolbarVars>()
		.expect("toolbar vars on rendered response");
	let panels = &vars.debug_toolbar_panels;
	assert_eq!(panels["sql_log"].content["total_queries"], 1);
	assert_eq!(panels["log"].content["info"][0]["message"], "article loaded");
	assert_eq!(panels["variables"].content["title"], "Hello");
	assert_eq!(panels["request"].content["path"], "/articles/7");

	let entries = HistoryCache::new(backend, TEST_AGENT, 10).entries().await;
	assert_eq!(entries.len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_redirect_saves_history_without_vars(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let svc = service(debug_config, registry, backend.clone());
	let response = svc.oneshot(request("/redirect", TEST_AGENT)).await.unwrap();

	assert_eq!(response.status(), 302);
	assert!(response.extensions().get::<ToolbarVars>().is_none());

	let entries = HistoryCache::new(backend, TEST_AGENT, 10).entries().await;
	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0]["request"].content["path"], "/redirect");
}

#[rstest]
#[tokio::test]
async fn test_disabled_toolbar_passes_through(
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let svc = service(DebugKitConfig::default(), registry, backend.clone());
	let response = svc.oneshot(request("/", TEST_AGENT)).await.unwrap();

	assert_eq!(response.status(), 200);
	assert_eq!(response.headers()["X-Context"], "0");
	assert_eq!(response.headers()["X-Scoped"], "0");
	assert!(response.extensions().get::<ToolbarVars>().is_none());
	assert!(!backend.is_configured("debug_kit").await);
}

#[rstest]
#[tokio::test]
async fn test_force_enable_overrides_debug_off(
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let layer = DebugToolbarLayer::new(DebugKitConfig::default(), registry, backend).with_overrides(
		SettingsOverrides {
			force_enable: Some(true),
			..Default::default()
		},
	);
	let svc = ServiceBuilder::new().layer(layer).service(service_fn(handler));
	let response = svc.oneshot(request("/", TEST_AGENT)).await.unwrap();

	assert_eq!(response.headers()["X-Context"], "1");
	let vars = response.extensions().get::<ToolbarVars>().unwrap();
	assert!(vars.helper.force_enable);
}

#[rstest]
#[tokio::test]
async fn test_auto_run_off_builds_context_but_skips_toolbar(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let layer = DebugToolbarLayer::new(debug_config, registry, backend).with_overrides(
		SettingsOverrides {
			auto_run: Some(false),
			..Default::default()
		},
	);
	let svc = ServiceBuilder::new().layer(layer).service(service_fn(handler));
	let response = svc.oneshot(request("/", TEST_AGENT)).await.unwrap();

	assert_eq!(response.headers()["X-Scoped"], "0");
	assert!(response.extensions().get::<ToolbarVars>().is_none());
}

#[rstest]
#[tokio::test]
async fn test_session_extension_reaches_session_panel(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let mut session = Map::new();
	session.insert("user_id".to_string(), json!(42));
	let mut req = request("/", TEST_AGENT);
	req.extensions_mut().insert(SessionData(session));

	let response = service(debug_config, registry, backend)
		.oneshot(req)
		.await
		.unwrap();
	let vars = response.extensions().get::<ToolbarVars>().unwrap();
	assert_eq!(vars.debug_toolbar_panels["session"].content["user_id"], 42);
}

#[rstest]
#[tokio::test]
async fn test_layer_serves_multiple_requests(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let mut svc = service(debug_config, registry, backend.clone());
	for path in ["/one", "/two", "/three"] {
		let response = svc
			.ready()
			.await
			.unwrap()
			.call(request(path, TEST_AGENT))
			.await
			.unwrap();
		assert!(response.extensions().get::<ToolbarVars>().is_some());
	}

	let entries = HistoryCache::new(backend, TEST_AGENT, 10).entries().await;
	assert_eq!(entries.len(), 3);
	assert_eq!(entries[0]["request"].content["path"], "/three");
}
