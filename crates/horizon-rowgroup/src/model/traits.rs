//! Core traits for flat, grouped table models.
//!
//! This module defines the surface the presentation layer sees: a flat,
//! randomly-indexable row sequence plus the signals that announce changes to
//! it.

use horizon_rowgroup_core::{Result, Signal};

use super::value::CellValue;

/// Where a flat row lives in the group hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowPosition {
    /// The lead row of a group: its header bean or its section marker.
    Lead {
        /// The group number.
        group: usize,
    },
    /// A sub-row of a group.
    Detail {
        /// The group number.
        group: usize,
        /// The sub-row index within the group.
        detail: usize,
    },
}

impl RowPosition {
    /// The group number this row belongs to.
    pub fn group(&self) -> usize {
        match *self {
            RowPosition::Lead { group } | RowPosition::Detail { group, .. } => group,
        }
    }

    /// The sub-row index, or `None` for a lead row.
    pub fn detail(&self) -> Option<usize> {
        match *self {
            RowPosition::Lead { .. } => None,
            RowPosition::Detail { detail, .. } => Some(detail),
        }
    }

    /// Returns `true` for lead (header or section) rows.
    pub fn is_lead(&self) -> bool {
        matches!(self, RowPosition::Lead { .. })
    }
}

/// The trait flat table views consume.
///
/// Row indices are flat: the concatenation of every group's lead row followed
/// by its sub-rows. Reads take `&self`; edits take `&mut self` since a model
/// is owned by a single actor.
pub trait FlatTableModel {
    /// Total number of flat rows.
    fn row_count(&self) -> usize;

    /// Number of columns, identical for every row type.
    fn column_count(&self) -> usize;

    /// The value at `row`, `column`.
    ///
    /// Returns [`CellValue::None`] for out-of-range positions and for cells
    /// whose column adapter fails.
    fn value_at(&self, row: usize, column: usize) -> CellValue;

    /// Writes `value` at `row`, `column`.
    fn set_value_at(&mut self, row: usize, column: usize, value: CellValue) -> Result<()>;

    /// Returns `true` if the cell may be edited.
    fn is_cell_editable(&self, row: usize, column: usize) -> bool;

    /// Returns `true` if `row` is the lead row of a group.
    fn is_section_or_header_row(&self, row: usize) -> bool;

    /// The group number `row` belongs to.
    fn group_number(&self, row: usize) -> Option<usize>;

    /// The flat row index of the lead row of `group`.
    fn lead_row_of_group(&self, group: usize) -> Option<usize>;

    /// Returns the signals for this model.
    fn signals(&self) -> &RowSignals;

    /// The column name, used for headers.
    fn column_name(&self, _column: usize) -> Option<String> {
        None
    }
}

/// Collection of signals emitted by flat table models.
///
/// All row ranges are inclusive and expressed in flat rows as they are
/// *after* the change (for removals: as they were before).
pub struct RowSignals {
    /// Emitted after rows have been inserted.
    /// Args: (first row, last row)
    pub rows_inserted: Signal<(usize, usize)>,

    /// Emitted after rows have been removed.
    /// Args: (first row, last row)
    pub rows_removed: Signal<(usize, usize)>,

    /// Emitted when values (or the pending state) of existing rows change.
    /// Args: (first row, last row)
    pub rows_updated: Signal<(usize, usize)>,

    /// Emitted after the group order changed (e.g., sorting).
    pub layout_changed: Signal<()>,

    /// Emitted after the model has been reset.
    pub model_reset: Signal<()>,
}

impl Default for RowSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl RowSignals {
    /// Creates a new set of row signals.
    pub fn new() -> Self {
        Self {
            rows_inserted: Signal::new(),
            rows_removed: Signal::new(),
            rows_updated: Signal::new(),
            layout_changed: Signal::new(),
            model_reset: Signal::new(),
        }
    }

    /// Blocks or unblocks every signal at once.
    pub fn set_blocked(&self, blocked: bool) {
        self.rows_inserted.set_blocked(blocked);
        self.rows_removed.set_blocked(blocked);
        self.rows_updated.set_blocked(blocked);
        self.layout_changed.set_blocked(blocked);
        self.model_reset.set_blocked(blocked);
    }

    /// Emits `rows_updated` for a single row.
    pub fn emit_row_updated(&self, row: usize) {
        self.rows_updated.emit((row, row));
    }

    /// Runs `reset_fn`, then emits `model_reset`.
    pub fn emit_reset<F, R>(&self, reset_fn: F) -> R
    where
        F: FnOnce() -> R,
    {
        let result = reset_fn();
        self.model_reset.emit(());
        result
    }

    /// Runs `change_fn`, then emits `layout_changed`.
    pub fn emit_layout_changed<F, R>(&self, change_fn: F) -> R
    where
        F: FnOnce() -> R,
    {
        let result = change_fn();
        self.layout_changed.emit(());
        result
    }
}

impl std::fmt::Debug for RowSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowSignals").finish_non_exhaustive()
    }
}

static_assertions::assert_not_impl_any!(RowSignals: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_row_signals_creation() {
        let signals = RowSignals::new();
        assert_eq!(signals.rows_inserted.connection_count(), 0);
        assert_eq!(signals.rows_updated.connection_count(), 0);
    }

    #[test]
    fn test_emit_reset_runs_closure_first() {
        let signals = RowSignals::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let recv = log.clone();
        signals.model_reset.connect(move |_| recv.lock().push("reset"));

        let inner = log.clone();
        let value = signals.emit_reset(|| {
            inner.lock().push("mutate");
            7
        });

        assert_eq!(value, 7);
        assert_eq!(*log.lock(), vec!["mutate", "reset"]);
    }

    #[test]
    fn test_set_blocked_silences_everything() {
        let signals = RowSignals::new();
        let count = Arc::new(Mutex::new(0));

        let c = count.clone();
        signals.rows_inserted.connect(move |_| *c.lock() += 1);
        let c = count.clone();
        signals.layout_changed.connect(move |_| *c.lock() += 1);

        signals.set_blocked(true);
        signals.rows_inserted.emit((0, 0));
        signals.layout_changed.emit(());
        signals.set_blocked(false);
        signals.emit_row_updated(1);
        signals.rows_inserted.emit((0, 0));

        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_row_position_accessors() {
        let lead = RowPosition::Lead { group: 2 };
        let detail = RowPosition::Detail { group: 2, detail: 1 };
        assert!(lead.is_lead());
        assert_eq!(lead.detail(), None);
        assert_eq!(detail.group(), 2);
        assert_eq!(detail.detail(), Some(1));
    }
}
