//! Core systems for Horizon Rowgroup.
//!
//! This crate provides the foundational components shared by the grouped-row
//! table models:
//!
//! - **Signal/Slot System**: Synchronous, single-actor change notification
//! - **Errors**: The crate-wide [`RowGroupError`] and column adapter errors
//! - **Logging**: `tracing` targets and performance spans
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_rowgroup_core::Signal;
//!
//! // Create a signal that notifies when rows are removed
//! let rows_removed = Signal::<(usize, usize)>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = rows_removed.connect(|(first, last)| {
//!     println!("rows {first}..={last} removed");
//! });
//!
//! // Emit the signal
//! rows_removed.emit((2, 3));
//!
//! // Disconnect when done
//! rows_removed.disconnect(conn_id);
//! ```

mod error;
pub mod logging;
pub mod signal;

pub use error::{ColumnError, Result, RowGroupError};
pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
