//! Toolbar history storage.
//!
//! Snapshots of past requests are kept in a bounded buffer, newest first,
//! stored under a per-client key in a [`CacheBackend`]. A missing or disabled
//! cache simply means that no history is available.

use crate::config::{CacheEngine, DebugKitConfig};
use crate::error::{ToolbarError, ToolbarResult};
use crate::toolbar::RenderedContent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// Cache namespace holding toolbar history.
pub const CACHE_NAMESPACE: &str = "debug_kit";

/// Prefix of every history cache key.
pub const CACHE_KEY_PREFIX: &str = "toolbar_cache";

/// Namespace configuration handed to [`CacheBackend::configure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
	/// Entry lifetime.
	pub duration: Duration,
	/// Requested storage engine.
	pub engine: CacheEngine,
	/// Storage directory for file based engines.
	pub path: PathBuf,
}

/// Keyed cache with per-namespace configuration.
#[async_trait]
pub trait CacheBackend: Send + Sync {
	/// Create or replace the configuration of `namespace`.
	async fn configure(&self, namespace: &str, config: CacheConfig);

	/// Whether `namespace` has been configured.
	async fn is_configured(&self, namespace: &str) -> bool;

	/// Read `key`; expired or missing entries yield `None`.
	async fn read(&self, key: &str, namespace: &str) -> ToolbarResult<Option<Value>>;

	/// Write `key` with the namespace lifetime.
	async fn write(&self, key: &str, value: &Value, namespace: &str) -> ToolbarResult<()>;
}

/// Pick the backend matching the configured engine.
pub fn backend_for(config: &DebugKitConfig) -> Arc<dyn CacheBackend> {
	match config.cache_engine {
		CacheEngine::Memory => Arc::new(InMemoryCacheBackend::new()),
		#[cfg(feature = "file-cache")]
		CacheEngine::File => Arc::new(FileCacheBackend::new()),
		#[cfg(not(feature = "file-cache"))]
		CacheEngine::File => {
			tracing::warn!("file cache engine requested without the `file-cache` feature");
			Arc::new(InMemoryCacheBackend::new())
		}
	}
}

/// Cache entry with expiration
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
	value: Value,
	expires_at: Option<SystemTime>,
}

impl CacheEntry {
	fn new(value: Value, ttl: Duration) -> Self {
		Self {
			value,
			expires_at: SystemTime::now().checked_add(ttl),
		}
	}

	fn is_expired(&self) -> bool {
		self.expires_at
			.is_some_and(|expires_at| SystemTime::now() > expires_at)
	}
}

#[derive(Debug)]
struct Namespace {
	config: CacheConfig,
	entries: HashMap<String, CacheEntry>,
}

/// In-memory cache backend
#[derive(Clone, Default)]
pub struct InMemoryCacheBackend {
	namespaces: Arc<RwLock<HashMap<String, Namespace>>>,
}

impl InMemoryCacheBackend {
	/// Create an empty backend with no configured namespaces.
	pub fn new() -> Self {
		Self::default()
	}

	/// Drop expired entries from every namespace.
	pub async fn cleanup_expired(&self) {
		let mut namespaces = self.namespaces.write().await;
		for ns in namespaces.values_mut() {
			ns.entries.retain(|_, entry| !entry.is_expired());
		}
	}
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
	async fn configure(&self, namespace: &str, config: CacheConfig) {
		let mut namespaces = self.namespaces.write().await;
		match namespaces.get_mut(namespace) {
			Some(ns) => ns.config = config,
			None => {
				namespaces.insert(
					namespace.to_string(),
					Namespace {
						config,
						entries: HashMap::new(),
					},
				);
			}
		}
	}

	async fn is_configured(&self, namespace: &str) -> bool {
		self.namespaces.read().await.contains_key(namespace)
	}

	async fn read(&self, key: &str, namespace: &str) -> ToolbarResult<Option<Value>> {
		let namespaces = self.namespaces.read().await;
		let ns = namespaces
			.get(namespace)
			.ok_or_else(|| ToolbarError::Cache(format!("namespace '{namespace}' not configured")))?;
		Ok(ns
			.entries
			.get(key)
			.filter(|entry| !entry.is_expired())
			.map(|entry| entry.value.clone()))
	}

	async fn write(&self, key: &str, value: &Value, namespace: &str) -> ToolbarResult<()> {
		let mut namespaces = self.namespaces.write().await;
		let ns = namespaces
			.get_mut(namespace)
			.ok_or_else(|| ToolbarError::Cache(format!("namespace '{namespace}' not configured")))?;
		let entry = CacheEntry::new(value.clone(), ns.config.duration);
		ns.entries.insert(key.to_string(), entry);
		Ok(())
	}
}

/// File cache backend storing one JSON document per key.
///
/// Files live in `<path>/<namespace>/<key>.json`. Keys made only of
/// `[A-Za-z0-9_-]` are used as file names directly; any other key is stored
/// under `h_<sha256 of key>.json`.
#[cfg(feature = "file-cache")]
#[derive(Clone, Default)]
pub struct FileCacheBackend {
	configs: Arc<RwLock<HashMap<String, CacheConfig>>>,
}

#[cfg(feature = "file-cache")]
impl FileCacheBackend {
	/// Create a backend with no configured namespaces.
	pub fn new() -> Self {
		Self::default()
	}

	async fn file_path(&self, key: &str, namespace: &str) -> ToolbarResult<(PathBuf, Duration)> {
		let configs = self.configs.read().await;
		let config = configs
			.get(namespace)
			.ok_or_else(|| ToolbarError::Cache(format!("namespace '{namespace}' not configured")))?;
		let path = config
			.path
			.join(namespace)
			.join(format!("{}.json", file_stem(key)));
		Ok((path, config.duration))
	}
}

#[cfg(feature = "file-cache")]
fn file_stem(key: &str) -> String {
	let plain = !key.is_empty()
		&& key
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
	if plain {
		key.to_string()
	} else {
		format!("h_{:x}", Sha256::digest(key.as_bytes()))
	}
}

#[cfg(feature = "file-cache")]
#[async_trait]
impl CacheBackend for FileCacheBackend {
	async fn configure(&self, namespace: &str, config: CacheConfig) {
		self.configs
			.write()
			.await
			.insert(namespace.to_string(), config);
	}

	async fn is_configured(&self, namespace: &str) -> bool {
		self.configs.read().await.contains_key(namespace)
	}

	async fn read(&self, key: &str, namespace: &str) -> ToolbarResult<Option<Value>> {
		let (path, _) = self.file_path(key, namespace).await?;
		let bytes = match tokio::fs::read(&path).await {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		let entry: CacheEntry = serde_json::from_slice(&bytes)?;
		if entry.is_expired() {
			if let Err(err) = tokio::fs::remove_file(&path).await {
				tracing::debug!(
					error = %err,
					path = %path.display(),
					"failed to remove expired cache file"
				);
			}
			return Ok(None);
		}
		Ok(Some(entry.value))
	}

	async fn write(&self, key: &str, value: &Value, namespace: &str) -> ToolbarResult<()> {
		let (path, ttl) = self.file_path(key, namespace).await?;
		if let Some(dir) = path.parent() {
			tokio::fs::create_dir_all(dir).await?;
		}
		let bytes = serde_json::to_vec(&CacheEntry::new(value.clone(), ttl))?;
		tokio::fs::write(&path, bytes).await?;
		Ok(())
	}
}

/// Derive the history key for a client fingerprint such as its user agent.
///
/// The fingerprint is hashed so raw header values never end up in key names.
pub fn cache_key(fingerprint: &str) -> String {
	let digest = Sha256::digest(fingerprint.as_bytes());
	format!("{CACHE_KEY_PREFIX}{digest:x}")
}

/// Bounded, newest-first history of toolbar snapshots for one client.
#[derive(Clone)]
pub struct HistoryCache {
	backend: Arc<dyn CacheBackend>,
	key: String,
	limit: usize,
}

impl HistoryCache {
	/// Create a history view for the client identified by `fingerprint`.
	pub fn new(backend: Arc<dyn CacheBackend>, fingerprint: &str, limit: usize) -> Self {
		Self {
			backend,
			key: cache_key(fingerprint),
			limit,
		}
	}

	/// Configure the history namespace on the backend.
	pub async fn configure(&self, config: CacheConfig) {
		self.backend.configure(CACHE_NAMESPACE, config).await;
	}

	/// Cache key of this client.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Maximum number of stored snapshots.
	pub fn limit(&self) -> usize {
		self.limit
	}

	/// Whether the backend has a history namespace.
	pub async fn is_available(&self) -> bool {
		self.backend.is_configured(CACHE_NAMESPACE).await
	}

	/// All stored snapshots, newest first. Failures read as an empty history.
	pub async fn entries(&self) -> Vec<RenderedContent> {
		if !self.is_available().await {
			return Vec::new();
		}
		let raw = match self.backend.read(&self.key, CACHE_NAMESPACE).await {
			Ok(Some(raw)) => raw,
			Ok(None) => return Vec::new(),
			Err(err) => {
				tracing::warn!(error = %err, key = %self.key, "failed to read toolbar history");
				return Vec::new();
			}
		};
		serde_json::from_value(raw).unwrap_or_else(|err| {
			tracing::warn!(error = %err, key = %self.key, "discarding unreadable toolbar history");
			Vec::new()
		})
	}

	/// Snapshot at `index` (0 is the most recent), or an empty one.
	pub async fn load(&self, index: usize) -> RenderedContent {
		self.entries()
			.await
			.into_iter()
			.nth(index)
			.unwrap_or_default()
	}

	/// Insert `entry` at the head, evicting from the tail to stay within the limit.
	///
	/// Returns whether the history was written.
	pub async fn push(&self, entry: RenderedContent) -> bool {
		if self.limit == 0 || !self.is_available().await {
			return false;
		}
		let mut history = self.entries().await;
		while history.len() >= self.limit {
			history.pop();
		}
		history.insert(0, entry);

		let result = match serde_json::to_value(&history) {
			Ok(value) => self.backend.write(&self.key, &value, CACHE_NAMESPACE).await,
			Err(err) => Err(err.into()),
		};
		match result {
			Ok(()) => {
				tracing::debug!(key = %self.key, entries = history.len(), "saved toolbar history");
				true
			}
			Err(err) => {
				tracing::warn!(error = %err, key = %self.key, "failed to write toolbar history");
				false
			}
		}
	}
}

impl std::fmt::Debug for HistoryCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HistoryCache")
			.field("key", &self.key)
			.field("limit", &self.limit)
			.finish()
	}
}
