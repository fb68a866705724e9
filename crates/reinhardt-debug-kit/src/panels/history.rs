//! History panel

use crate::context::ToolbarContext;
use crate::error::ToolbarResult;
use crate::history::HistoryCache;
use crate::panels::Panel;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Lists the toolbar snapshots stored for the current client.
#[derive(Debug)]
pub struct HistoryPanel {
	history: Option<HistoryCache>,
}

impl HistoryPanel {
	/// Create the panel; without a cache it reports an empty history.
	pub fn new(history: Option<HistoryCache>) -> Self {
		Self { history }
	}

	/// Configured history size, 0 when history is unavailable.
	pub fn limit(&self) -> usize {
		self.history.as_ref().map_or(0, HistoryCache::limit)
	}
}

#[async_trait]
impl Panel for HistoryPanel {
	fn title(&self) -> &str {
		"History"
	}

	async fn before_render(&mut self, _ctx: &ToolbarContext) -> ToolbarResult<Value> {
		let Some(history) = &self.history else {
			return Ok(json!({ "limit": 0, "entries": [] }));
		};

		let entries: Vec<Value> = history
			.entries()
			.await
			.iter()
			.enumerate()
			.map(|(index, snapshot)| {
				let request = snapshot.get("request").map(|r| &r.content);
				json!({
					"index": index,
					"method": request.and_then(|r| r.get("method")).cloned().unwrap_or(Value::Null),
					"path": request.and_then(|r| r.get("path")).cloned().unwrap_or(Value::Null),
					"panels": snapshot.keys().collect::<Vec<_>>(),
				})
			})
			.collect();

		Ok(json!({ "limit": history.limit(), "entries": entries }))
	}
}
