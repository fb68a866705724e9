//! Log panel

use crate::context::{LogLevel, ToolbarContext};
use crate::error::ToolbarResult;
use crate::panels::Panel;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Value, json};

/// Log lines captured during the request, grouped by level.
#[derive(Debug, Default)]
pub struct LogPanel;

#[async_trait]
impl Panel for LogPanel {
	fn title(&self) -> &str {
		"Log"
	}

	async fn before_render(&mut self, ctx: &ToolbarContext) -> ToolbarResult<Value> {
		let mut grouped: IndexMap<LogLevel, Vec<Value>> = IndexMap::new();
		for entry in ctx.logs.lock().iter() {
			grouped.entry(entry.level).or_default().push(json!({
				"message": entry.message,
				"timestamp": entry.timestamp.to_rfc3339(),
			}));
		}
		grouped.sort_keys();
		Ok(serde_json::to_value(grouped)?)
	}
}
