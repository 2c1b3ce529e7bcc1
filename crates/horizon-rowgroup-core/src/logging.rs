//! Logging facilities for Horizon Rowgroup.
//!
//! This module provides:
//! - Integration with the `tracing` crate for structured logging
//! - Fixed target names so applications can filter by subsystem
//! - Performance tracing hooks for profiling whole-model operations
//!
//! # Tracing Integration
//!
//! Horizon Rowgroup uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_rowgroup=debug")
//!         .init();
//! }
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_rowgroup_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_rowgroup_core::signal";
    /// Grouped row model target (structural mutations, value resolution).
    pub const MODEL: &str = "horizon_rowgroup::model";
    /// Identity-indexed list target (key bookkeeping).
    pub const INDEX: &str = "horizon_rowgroup::index";
    /// Change journal target (pending adds, deletes and edits).
    pub const JOURNAL: &str = "horizon_rowgroup::journal";
    /// Performance spans.
    pub const PERF: &str = "horizon_rowgroup::perf";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations such as a full
/// offset rebuild, a commit or a revert.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_rowgroup::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns.
///
/// These are thin wrappers around the `tracing` crate macros with consistent
/// target naming.
#[macro_export]
macro_rules! rowgroup_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_rowgroup_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! rowgroup_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_rowgroup_core", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        // Just ensure it compiles and doesn't panic without a subscriber
        let _span = PerfSpan::new("test_operation");
        rowgroup_debug!(value = 3, "inside span");
    }

    #[test]
    fn test_targets_are_prefixed() {
        for target in [
            targets::SIGNAL,
            targets::MODEL,
            targets::INDEX,
            targets::JOURNAL,
            targets::PERF,
        ] {
            assert!(target.starts_with("horizon_rowgroup"));
        }
    }
}
