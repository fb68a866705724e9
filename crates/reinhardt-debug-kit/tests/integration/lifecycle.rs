//! Toolbar enablement, panel ordering and failure isolation

use crate::common::fixtures::*;
use crate::common::mock_panel::{CallLog, MockPanel};
use reinhardt_debug_kit::{
	Attachment, CacheBackend, DebugKitConfig, DisabledReason, HistoryCache, PanelOverrides,
	PanelRegistry, SettingsOverrides, Toolbar,
};
use rstest::*;
use serde_json::Value;
use std::sync::Arc;

fn with_panels(panels: PanelOverrides) -> SettingsOverrides {
	SettingsOverrides {
		panels: Some(panels),
		..Default::default()
	}
}

/// Registry holding the built-ins plus mock panels A, B and C
fn mock_registry(a: &MockPanel, b: &MockPanel, c: &MockPanel) -> PanelRegistry {
	let mut registry = PanelRegistry::with_defaults();
	a.register(&mut registry, "Test.A");
	b.register(&mut registry, "Test.B");
	c.register(&mut registry, "Test.C");
	registry
}

#[rstest]
#[tokio::test]
async fn test_default_panels_render_in_order(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let vars = render_request(
		&debug_config,
		&SettingsOverrides::default(),
		&registry,
		&backend,
		"/articles",
	)
	.await
	.expect("toolbar should be enabled");

	let keys: Vec<&str> = vars.debug_toolbar_panels.keys().map(String::as_str).collect();
	assert_eq!(
		keys,
		[
			"history",
			"session",
			"request",
			"sql_log",
			"timer",
			"log",
			"variables",
			"include"
		]
	);
	assert_eq!(vars.debug_toolbar_panels["sql_log"].title, "Sql Log");
	assert_eq!(vars.debug_toolbar_panels["timer"].element_name, "timer_panel");
	assert_eq!(vars.helper.cache_config, "debug_kit");
	assert!(vars.helper.cache_key.starts_with("toolbar_cache"));
	assert_eq!(vars.debug_toolbar_javascript["jquery"], "/debug_kit/js/jquery");
	assert_eq!(
		vars.debug_toolbar_javascript["libs"],
		"/debug_kit/js/js_debug_toolbar"
	);

	let entries = HistoryCache::new(backend, TEST_AGENT, 10).entries().await;
	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0].len(), 7);
	assert!(!entries[0].contains_key("history"));
}

#[rstest]
#[tokio::test]
async fn test_removed_panel_is_not_loaded(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let overrides = with_panels(PanelOverrides::default().remove("DebugKit.SqlLog"));
	let vars = render_request(&debug_config, &overrides, &registry, &backend, "/")
		.await
		.unwrap();

	assert_eq!(vars.debug_toolbar_panels.len(), 7);
	assert!(!vars.debug_toolbar_panels.contains_key("sql_log"));
}

#[rstest]
#[tokio::test]
async fn test_hooks_follow_load_order(debug_config: DebugKitConfig, backend: Arc<dyn CacheBackend>) {
	let log = CallLog::default();
	let (a, b, c) = (
		MockPanel::new("A", log.clone()),
		MockPanel::new("B", log.clone()),
		MockPanel::new("C", log.clone()),
	);
	let registry = mock_registry(&a, &b, &c);
	let overrides = with_panels(
		PanelOverrides::default()
			.add("Test.A")
			.add("Test.B")
			.add("Test.C"),
	);

	let vars = render_request(&debug_config, &overrides, &registry, &backend, "/")
		.await
		.unwrap();

	assert_eq!(
		*log.lock(),
		[
			"A.startup",
			"B.startup",
			"C.startup",
			"A.before_render",
			"B.before_render",
			"C.before_render"
		]
	);
	let tail: Vec<&str> = vars.debug_toolbar_panels.keys().skip(8).map(String::as_str).collect();
	assert_eq!(tail, ["a", "b", "c"]);
	assert_eq!(vars.debug_toolbar_panels["a"].plugin, "Test");
}

#[rstest]
#[tokio::test]
async fn test_failing_panel_does_not_affect_others(
	debug_config: DebugKitConfig,
	backend: Arc<dyn CacheBackend>,
) {
	let log = CallLog::default();
	let a = MockPanel::new("A", log.clone());
	let b = MockPanel::new("B", log.clone()).with_render_failure();
	let c = MockPanel::new("C", log.clone()).with_startup_failure();
	let registry = mock_registry(&a, &b, &c);
	let overrides = with_panels(
		PanelOverrides::default()
			.add("Test.A")
			.add("Test.B")
			.add("Test.C"),
	);

	let vars = render_request(&debug_config, &overrides, &registry, &backend, "/orders")
		.await
		.unwrap()
		.debug_toolbar_panels;

	assert_eq!(vars["a"].content["panel"], "A");
	assert_eq!(vars["b"].content, Value::Null);
	assert_eq!(vars["c"].content["path"], "/orders");
	assert_eq!(c.startup_count(), 1);
	assert_eq!(c.before_render_count(), 1);
	assert_eq!(vars.len(), 11);
}

#[rstest]
#[tokio::test]
async fn test_panicking_panel_is_contained(
	debug_config: DebugKitConfig,
	backend: Arc<dyn CacheBackend>,
) {
	let log = CallLog::default();
	let a = MockPanel::new("A", log.clone()).with_render_panic();
	let b = MockPanel::new("B", log.clone());
	let c = MockPanel::new("C", log.clone());
	let registry = mock_registry(&a, &b, &c);
	let overrides = with_panels(PanelOverrides::default().add("Test.A").add("Test.B"));

	let vars = render_request(&debug_config, &overrides, &registry, &backend, "/")
		.await
		.unwrap()
		.debug_toolbar_panels;

	assert_eq!(vars["a"].content, Value::Null);
	assert_eq!(vars["b"].content["panel"], "B");
	assert_eq!(c.startup_count(), 0);
}

#[rstest]
#[tokio::test]
async fn test_debug_off_disables_everything(
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let config = DebugKitConfig::default();
	let ctx = context("/", TEST_AGENT);
	let attachment = Toolbar::attach(
		&config,
		&SettingsOverrides::default(),
		&ctx,
		&registry,
		backend.clone(),
	)
	.await;

	assert!(matches!(attachment, Attachment::Disabled(DisabledReason::DebugOff)));
	assert!(attachment.load_state(0).await.is_empty());
	assert!(ctx.timer.timers().is_empty());
	assert!(!backend.is_configured("debug_kit").await);
}

#[rstest]
#[tokio::test]
async fn test_force_enable_from_process_defaults(
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
) {
	let config = DebugKitConfig::from_toml_str(
		r#"
		[debug_kit.defaults]
		force_enable = true
		"#,
	)
	.unwrap();

	let vars = render_request(&config, &SettingsOverrides::default(), &registry, &backend, "/")
		.await
		.expect("force enabled toolbar");
	assert!(vars.helper.force_enable);
}

#[rstest]
#[case("/reports", false)]
#[case("/reports?debug=1", true)]
#[case("/reports?page=2&debug", true)]
#[tokio::test]
async fn test_auto_run_off_requires_debug_param(
	debug_config: DebugKitConfig,
	registry: PanelRegistry,
	backend: Arc<dyn CacheBackend>,
	#[case] uri: &str,
	#[case] enabled: bool,
) {
	let overrides = SettingsOverrides {
		auto_run: Some(false),
		..Default::default()
	};
	let vars = render_request(&debug_config, &overrides, &registry, &backend, uri).await;
	assert_eq!(vars.is_some(), enabled);
}

#[rstest]
#[tokio::test]
async fn test_redirect_runs_panel_redirect_hooks(
	debug_config: DebugKitConfig,
	backend: Arc<dyn CacheBackend>,
) {
	let log = CallLog::default();
	let a = MockPanel::new("A", log.clone());
	let b = MockPanel::new("B", log.clone());
	let c = MockPanel::new("C", log.clone());
	let registry = mock_registry(&a, &b, &c);
	let overrides = with_panels(PanelOverrides::default().add("Test.A").add("Test.B"));

	let ctx = context("/login", TEST_AGENT);
	let mut toolbar = Toolbar::attach(&debug_config, &overrides, &ctx, &registry, backend.clone())
		.await
		.into_toolbar()
		.unwrap();
	toolbar.startup(&ctx).await;
	log.lock().clear();

	let vars = toolbar.before_redirect(&ctx).await;

	assert_eq!(
		*log.lock(),
		[
			"A.before_redirect",
			"B.before_redirect",
			"A.before_render",
			"B.before_render"
		]
	);
	assert_eq!(a.before_redirect_count(), 1);
	assert_eq!(vars.len(), 10);
	assert_eq!(toolbar.load_state(0).await.len(), 9);
}
