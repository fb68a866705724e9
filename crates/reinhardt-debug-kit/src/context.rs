//! Per-request toolbar context.
//!
//! The context is what panels read from. Application code records SQL queries,
//! log lines, view variables and included files into it while the request runs,
//! either through the `Arc<ToolbarContext>` placed in the request extensions or
//! through [`TOOLBAR_CONTEXT`] inside the middleware scope.

use crate::timer::DebugTimer;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

tokio::task_local! {
	/// Context of the request currently handled by the toolbar middleware.
	pub static TOOLBAR_CONTEXT: Arc<ToolbarContext>;
}

/// Return the context of the surrounding toolbar scope, if any.
pub fn current_context() -> Option<Arc<ToolbarContext>> {
	TOOLBAR_CONTEXT.try_with(Arc::clone).ok()
}

/// Session values exposed to the session panel.
///
/// Session middleware inserts this into the request extensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData(pub Map<String, Value>);

/// Snapshot of the incoming request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestInfo {
	/// HTTP method.
	pub method: String,
	/// Request path.
	pub path: String,
	/// Raw query string.
	pub query: Option<String>,
	/// Request headers in arrival order.
	pub headers: Vec<(String, String)>,
	/// Client address, when known.
	pub client_ip: String,
	/// Time the request was received.
	pub timestamp: DateTime<Utc>,
}

impl RequestInfo {
	/// Build a snapshot from an `http::Request`.
	///
	/// The client IP is taken from `X-Forwarded-For` or `X-Real-IP` when present.
	pub fn from_http<B>(request: &http::Request<B>) -> Self {
		let headers: Vec<(String, String)> = request
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value
					.to_str()
					.ok()
					.map(|v| (name.as_str().to_string(), v.to_string()))
			})
			.collect();

		let client_ip = ["x-forwarded-for", "x-real-ip"]
			.iter()
			.find_map(|name| request.headers().get(*name))
			.and_then(|v| v.to_str().ok())
			.and_then(|v| v.split(',').next())
			.map(|v| v.trim().to_string())
			.unwrap_or_default();

		Self {
			method: request.method().to_string(),
			path: request.uri().path().to_string(),
			query: request.uri().query().map(str::to_string),
			headers,
			client_ip,
			timestamp: Utc::now(),
		}
	}

	/// Decoded query parameters in order.
	pub fn query_params(&self) -> Vec<(String, String)> {
		self.query
			.as_deref()
			.and_then(|q| serde_urlencoded::from_str(q).ok())
			.unwrap_or_default()
	}

	/// Whether the query string carries `name`, with or without a value.
	pub fn has_query_param(&self, name: &str) -> bool {
		self.query_params().iter().any(|(k, _)| k == name)
	}

	/// Case-insensitive header lookup.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(k, _)| k.eq_ignore_ascii_case(name))
			.map(|(_, v)| v.as_str())
	}

	/// `User-Agent` header, or an empty string.
	pub fn user_agent(&self) -> &str {
		self.header("user-agent").unwrap_or("")
	}

	/// Whether the request was sent by a script (`X-Requested-With: XMLHttpRequest`).
	pub fn is_ajax(&self) -> bool {
		self.header("x-requested-with")
			.is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
	}

	/// File extension of the last path segment (`/posts/index.json` → `json`).
	pub fn extension(&self) -> Option<&str> {
		let segment = self.path.rsplit('/').next()?;
		match segment.rsplit_once('.') {
			Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
			_ => None,
		}
	}
}

/// An executed SQL statement.
#[derive(Debug, Clone, Serialize)]
pub struct SqlQuery {
	/// SQL text.
	pub sql: String,
	/// Bound parameters, rendered as strings.
	pub params: Vec<String>,
	/// Execution time.
	pub duration: Duration,
	/// Rows affected or returned, if the driver reports it.
	pub affected_rows: Option<u64>,
	/// Connection or database alias.
	pub connection: Option<String>,
	/// Time the statement finished.
	pub timestamp: DateTime<Utc>,
}

impl SqlQuery {
	/// Create a query record without parameters.
	pub fn new(sql: impl Into<String>, duration: Duration) -> Self {
		Self {
			sql: sql.into(),
			params: Vec::new(),
			duration,
			affected_rows: None,
			connection: None,
			timestamp: Utc::now(),
		}
	}
}

/// Severity of a recorded log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	/// Debug output.
	Debug,
	/// Informational output.
	Info,
	/// Something unexpected.
	Warning,
	/// Failure.
	Error,
}

/// A log line captured during the request.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
	/// Severity.
	pub level: LogLevel,
	/// Message text.
	pub message: String,
	/// Capture time.
	pub timestamp: DateTime<Utc>,
}

/// Everything the panels can observe about one request.
#[derive(Debug)]
pub struct ToolbarContext {
	/// Request snapshot.
	pub request: RequestInfo,
	/// Request timers and memory checkpoints.
	pub timer: DebugTimer,
	/// Session values.
	pub session: RwLock<Map<String, Value>>,
	/// Executed SQL statements.
	pub sql_queries: Mutex<Vec<SqlQuery>>,
	/// Captured log lines.
	pub logs: Mutex<Vec<LogEntry>>,
	/// Variables handed to the view.
	pub view_vars: Mutex<IndexMap<String, Value>>,
	/// Files or templates pulled in while handling the request.
	pub includes: Mutex<Vec<String>>,
}

impl ToolbarContext {
	/// Create a context with a fresh process-memory timer.
	pub fn new(request: RequestInfo) -> Self {
		Self::with_timer(request, DebugTimer::new())
	}

	/// Create a context with an explicit timer.
	pub fn with_timer(request: RequestInfo, timer: DebugTimer) -> Self {
		Self {
			request,
			timer,
			session: RwLock::new(Map::new()),
			sql_queries: Mutex::new(Vec::new()),
			logs: Mutex::new(Vec::new()),
			view_vars: Mutex::new(IndexMap::new()),
			includes: Mutex::new(Vec::new()),
		}
	}

	/// Replace the session values.
	pub fn set_session(&self, session: Map<String, Value>) {
		*self.session.write() = session;
	}

	/// Record an executed SQL statement.
	pub fn record_sql(&self, query: SqlQuery) {
		self.sql_queries.lock().push(query);
	}

	/// Record a log line.
	pub fn log(&self, level: LogLevel, message: impl Into<String>) {
		self.logs.lock().push(LogEntry {
			level,
			message: message.into(),
			timestamp: Utc::now(),
		});
	}

	/// Set a view variable, replacing an earlier value with the same name.
	pub fn set_var(&self, name: impl Into<String>, value: Value) {
		self.view_vars.lock().insert(name.into(), value);
	}

	/// Record an included file.
	pub fn add_include(&self, path: impl Into<String>) {
		self.includes.lock().push(path.into());
	}
}
