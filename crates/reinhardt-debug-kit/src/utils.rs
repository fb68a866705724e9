//! Utility functions

pub mod inflector;
pub mod sql_normalization;
