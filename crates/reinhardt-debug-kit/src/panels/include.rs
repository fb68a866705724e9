//! Included files panel

use crate::context::ToolbarContext;
use crate::error::ToolbarResult;
use crate::panels::Panel;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Files or templates used while handling the request.
///
/// Paths under `plugins/` are grouped as plugin files, paths under `src/`,
/// `templates/` or `app/` as application files, everything else as other.
#[derive(Debug, Default)]
pub struct IncludePanel;

fn group_of(path: &str) -> &'static str {
	let normalized = path.trim_start_matches("./");
	if normalized.starts_with("plugins/") || normalized.contains("/plugins/") {
		"plugins"
	} else if ["src/", "templates/", "app/"]
		.iter()
		.any(|prefix| normalized.starts_with(prefix))
	{
		"app"
	} else {
		"other"
	}
}

#[async_trait]
impl Panel for IncludePanel {
	fn title(&self) -> &str {
		"Include"
	}

	async fn before_render(&mut self, ctx: &ToolbarContext) -> ToolbarResult<Value> {
		let mut app = Vec::new();
		let mut plugins = Vec::new();
		let mut other = Vec::new();
		for path in ctx.includes.lock().iter() {
			match group_of(path) {
				"plugins" => plugins.push(path.clone()),
				"app" => app.push(path.clone()),
				_ => other.push(path.clone()),
			}
		}
		Ok(json!({ "app": app, "plugins": plugins, "other": other }))
	}
}
