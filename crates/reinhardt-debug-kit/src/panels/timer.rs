//! Timer panel

use crate::context::ToolbarContext;
use crate::error::ToolbarResult;
use crate::panels::Panel;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Shows request timers and memory checkpoints.
#[derive(Debug, Default)]
pub struct TimerPanel;

#[async_trait]
impl Panel for TimerPanel {
	fn title(&self) -> &str {
		"Timer"
	}

	async fn before_render(&mut self, ctx: &ToolbarContext) -> ToolbarResult<Value> {
		let timer = &ctx.timer;
		Ok(json!({
			"request_time_ms": timer.request_elapsed().as_secs_f64() * 1000.0,
			"peak_memory": timer.peak_memory(),
			"timers": timer.timers(),
			"memory": timer.memory_points(),
		}))
	}
}
