//! Label Store - persistence layer for an image annotation tool.
//!
//! Loads and saves per-image label files (JSON) and resolves the tool's
//! layered YAML configuration.

pub mod config;
pub mod format;
pub mod model;

#[cfg(test)]
mod test_logging;
