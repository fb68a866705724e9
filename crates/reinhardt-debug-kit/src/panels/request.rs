//! Request information panel

use crate::context::ToolbarContext;
use crate::error::ToolbarResult;
use crate::panels::Panel;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Headers whose values are masked in the panel output.
const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "cookie", "proxy-authorization"];

/// Shows method, path, query parameters and headers of the request.
#[derive(Debug, Default)]
pub struct RequestPanel;

#[async_trait]
impl Panel for RequestPanel {
	fn title(&self) -> &str {
		"Request"
	}

	async fn before_render(&mut self, ctx: &ToolbarContext) -> ToolbarResult<Value> {
		let request = &ctx.request;
		let headers: Vec<Value> = request
			.headers
			.iter()
			.map(|(name, value)| {
				let shown = if SENSITIVE_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
					"********"
				} else {
					value.as_str()
				};
				json!([name, shown])
			})
			.collect();

		Ok(json!({
			"method": request.method,
			"path": request.path,
			"query": request.query_params(),
			"extension": request.extension(),
			"ajax": request.is_ajax(),
			"headers": headers,
			"client_ip": request.client_ip,
			"timestamp": request.timestamp.to_rfc3339(),
		}))
	}
}
