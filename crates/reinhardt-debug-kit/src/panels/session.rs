//! Session panel

use crate::context::ToolbarContext;
use crate::error::ToolbarResult;
use crate::panels::Panel;
use async_trait::async_trait;
use serde_json::Value;

/// Dumps the session values of the request.
#[derive(Debug, Default)]
pub struct SessionPanel;

#[async_trait]
impl Panel for SessionPanel {
	fn title(&self) -> &str {
		"Session"
	}

	async fn before_render(&mut self, ctx: &ToolbarContext) -> ToolbarResult<Value> {
		Ok(Value::Object(ctx.session.read().clone()))
	}
}
