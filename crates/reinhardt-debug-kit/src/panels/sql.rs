//! SQL log panel

use crate::context::ToolbarContext;
use crate::error::ToolbarResult;
use crate::panels::Panel;
use crate::utils::sql_normalization::{detect_n_plus_one, fingerprint, fingerprint_counts};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

/// Lists executed SQL with duplicate, slow query and N+1 markers.
#[derive(Debug)]
pub struct SqlLogPanel {
	/// Queries at or above this duration are flagged as slow.
	slow_threshold: Duration,
	/// Queries seen at startup; they belong to earlier middleware, not the action.
	baseline: usize,
}

impl SqlLogPanel {
	/// Create the panel with a 100ms slow query threshold.
	pub fn new() -> Self {
		Self::with_threshold(Duration::from_millis(100))
	}

	/// Create the panel with a custom slow query threshold.
	pub fn with_threshold(slow_threshold: Duration) -> Self {
		Self {
			slow_threshold,
			baseline: 0,
		}
	}
}

impl Default for SqlLogPanel {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Panel for SqlLogPanel {
	fn title(&self) -> &str {
		"Sql Log"
	}

	async fn startup(&mut self, ctx: &ToolbarContext) -> ToolbarResult<()> {
		self.baseline = ctx.sql_queries.lock().len();
		Ok(())
	}

	async fn before_render(&mut self, ctx: &ToolbarContext) -> ToolbarResult<Value> {
		let queries = ctx.sql_queries.lock();
		let counts = fingerprint_counts(&queries);
		let n_plus_one = detect_n_plus_one(&counts);
		let total_time: Duration = queries.iter().map(|q| q.duration).sum();

		let mut slow_count = 0;
		let rows: Vec<Value> = queries
			.iter()
			.enumerate()
			.map(|(index, q)| {
				let fp = fingerprint(&q.sql);
				let is_slow = q.duration >= self.slow_threshold;
				slow_count += usize::from(is_slow);
				json!({
					"index": index,
					"sql": q.sql,
					"params": q.params,
					"connection": q.connection,
					"affected_rows": q.affected_rows,
					"duration_ms": q.duration.as_secs_f64() * 1000.0,
					"before_action": index < self.baseline,
					"is_duplicate": counts.get(&fp).is_some_and(|&c| c > 1),
					"is_slow": is_slow,
					"is_n_plus_one": n_plus_one.contains(&fp),
				})
			})
			.collect();

		Ok(json!({
			"total_queries": queries.len(),
			"total_time_ms": total_time.as_secs_f64() * 1000.0,
			"duplicate_count": counts.values().filter(|&&c| c > 1).count(),
			"slow_queries_count": slow_count,
			"n_plus_one_count": n_plus_one.len(),
			"slow_threshold_ms": self.slow_threshold.as_millis() as u64,
			"queries": rows,
		}))
	}
}
