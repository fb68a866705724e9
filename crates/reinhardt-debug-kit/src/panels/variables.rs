//! View variables panel

use crate::context::ToolbarContext;
use crate::error::ToolbarResult;
use crate::panels::Panel;
use async_trait::async_trait;
use serde_json::Value;

/// Variables handed to the view by the action.
#[derive(Debug, Default)]
pub struct VariablesPanel;

#[async_trait]
impl Panel for VariablesPanel {
	fn title(&self) -> &str {
		"Variables"
	}

	async fn before_render(&mut self, ctx: &ToolbarContext) -> ToolbarResult<Value> {
		Ok(serde_json::to_value(&*ctx.view_vars.lock())?)
	}
}
