//! Middleware components
//!
//! This module provides Tower middleware integration for the debug toolbar.

pub mod layer;
pub mod service;

pub use layer::DebugToolbarLayer;
pub use service::DebugToolbarService;
