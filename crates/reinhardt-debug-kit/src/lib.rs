//! # Reinhardt Debug Kit
//!
//! Request lifecycle instrumentation for the Reinhardt web framework, inspired by
//! the classic "debug kit" toolbars.
//!
//! The kit times the phases of a request, records memory checkpoints, asks a set
//! of diagnostic panels for their output and keeps a short per-client history of
//! those snapshots so the toolbar can page back through earlier requests.
//!
//! Built-in panels:
//! - History of previous requests
//! - Session state
//! - Request information
//! - SQL log with duplicate, slow and N+1 detection
//! - Timers and memory checkpoints
//! - Log records
//! - View variables
//! - Included files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reinhardt_debug_kit::{DebugKitConfig, DebugToolbarLayer, InMemoryCacheBackend, PanelRegistry};
//! use std::sync::Arc;
//!
//! let config = DebugKitConfig {
//!     debug: true,
//!     ..Default::default()
//! };
//!
//! let app = tower::ServiceBuilder::new()
//!     .layer(DebugToolbarLayer::new(
//!         config,
//!         PanelRegistry::with_defaults(),
//!         Arc::new(InMemoryCacheBackend::new()),
//!     ))
//!     .service(handler);
//! ```
//!
//! ## Architecture
//!
//! 1. **Timer layer**: [`DebugTimer`] scoped to a single request
//! 2. **Panel layer**: the [`Panel`] trait and the static [`PanelRegistry`]
//! 3. **History layer**: [`HistoryCache`] on top of a pluggable [`CacheBackend`]
//! 4. **Orchestration**: [`Toolbar`] drives the lifecycle hooks in order
//! 5. **Middleware**: [`DebugToolbarLayer`] wires the toolbar into a Tower stack
//!
//! The toolbar never fails the request it observes. Errors raised by panels or
//! the cache are logged through `tracing` and degrade the toolbar output.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

// Module declarations following Rust 2024 module system (no mod.rs)
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod middleware;
pub mod panels;
pub mod timer;
pub mod toolbar;
pub mod utils;

// Re-export main types
pub use config::{DebugKitConfig, PanelOverrides, SettingsOverrides, ToolbarSettings};
pub use context::{RequestInfo, SessionData, ToolbarContext};
pub use error::{ToolbarError, ToolbarResult};
#[cfg(feature = "file-cache")]
pub use history::FileCacheBackend;
pub use history::{CacheBackend, CacheConfig, HistoryCache, InMemoryCacheBackend};
pub use middleware::{DebugToolbarLayer, DebugToolbarService};
pub use panels::{LoadedPanels, Panel, PanelInit, PanelRegistry};
pub use timer::{DebugTimer, MemoryProbe, MemorySnapshot};
pub use toolbar::{
	Attachment, DisabledReason, HelperConfig, OutputFormat, PanelOutput, RenderedContent, Toolbar,
	ToolbarVars,
};
