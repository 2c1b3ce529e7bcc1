//! Pending adds, deletes and per-cell edits awaiting commit or revert.
//!
//! A [`ChangeJournal`] never touches row storage. It only records which rows
//! are new, which are marked for deletion and what each edited cell held
//! before its first edit; turning that record into model mutations is the
//! caller's job, through [`JournalCallbacks`].
//!
//! Row status transitions:
//!
//! ```text
//! CLEAN --edit--> DIRTY --undo every edit--> CLEAN
//! CLEAN --delete--> PENDING_DELETE --undo_delete--> CLEAN (earlier edits kept)
//!       --add--> PENDING_ADD --commit--> CLEAN
//!                            --revert / delete--> (gone)
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use horizon_rowgroup_core::PerfSpan;
use horizon_rowgroup_core::logging::targets;

use super::value::CellValue;

/// Receives the model mutations a journal operation implies.
///
/// Every method has a no-op default so callers implement only what they need.
pub trait JournalCallbacks<K, V = CellValue> {
    /// The row must disappear from the model.
    fn item_deleted(&mut self, _row: &K) {}

    /// The row's presentation changed (status or values).
    fn item_updated(&mut self, _row: &K) {}

    /// `value` must be written back to `column` of the row.
    ///
    /// Returns `false` if the write failed; the journal then keeps the cell
    /// marked changed.
    fn restore_value(&mut self, _row: &K, _column: usize, _value: &V) -> bool {
        true
    }
}

/// No-op callbacks.
impl<K, V> JournalCallbacks<K, V> for () {}

/// The transactional record of pending changes.
///
/// `K` identifies a row; `V` is the cell value type.
///
/// # Example
///
/// ```
/// use horizon_rowgroup::model::{CellValue, ChangeJournal};
///
/// let mut journal: ChangeJournal<u32> = ChangeJournal::new();
/// journal.record_cell_change(&7, 0, CellValue::from("old"), &CellValue::from("new"));
/// assert!(journal.is_changed(&7, 0));
///
/// // Editing back to the original erases the entry.
/// journal.record_cell_change(&7, 0, CellValue::from("new"), &CellValue::from("old"));
/// assert!(journal.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ChangeJournal<K, V = CellValue> {
    adds: HashSet<K>,
    deletes: HashSet<K>,
    originals: HashMap<K, HashMap<usize, V>>,
}

impl<K, V> Default for ChangeJournal<K, V> {
    fn default() -> Self {
        Self {
            adds: HashSet::new(),
            deletes: HashSet::new(),
            originals: HashMap::new(),
        }
    }
}

impl<K, V> ChangeJournal<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: PartialEq,
{
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `row` as a pending add.
    pub fn record_add(&mut self, row: K) {
        tracing::trace!(target: targets::JOURNAL, ?row, "pending add");
        self.deletes.remove(&row);
        self.originals.remove(&row);
        self.adds.insert(row);
    }

    /// Marks `row` for deletion.
    ///
    /// A pending add is dropped instead, leaving no trace. Returns `true` if
    /// a delete was queued, `false` if a pending add vanished.
    pub fn record_delete(&mut self, row: &K) -> bool {
        if self.adds.remove(row) {
            tracing::trace!(target: targets::JOURNAL, ?row, "pending add dropped");
            return false;
        }
        tracing::trace!(target: targets::JOURNAL, ?row, "pending delete");
        self.deletes.insert(row.clone());
        true
    }

    /// Records an edit of `column` of `row` from `old` to `new`.
    ///
    /// Only the first original value of a cell is kept. An edit that returns
    /// the cell to its original erases the entry, and an edit that does not
    /// change anything records nothing. Pending adds are not tracked.
    pub fn record_cell_change(&mut self, row: &K, column: usize, old: V, new: &V) {
        if self.adds.contains(row) {
            return;
        }
        let back_to_original = self
            .originals
            .get(row)
            .and_then(|columns| columns.get(&column))
            .map(|original| original == new);
        match back_to_original {
            Some(true) => {
                self.forget(row, column);
                tracing::trace!(target: targets::JOURNAL, ?row, column, "edit returned to original");
            }
            Some(false) => {}
            None if old != *new => {
                tracing::trace!(target: targets::JOURNAL, ?row, column, "first edit");
                self.originals.entry(row.clone()).or_default().insert(column, old);
            }
            None => {}
        }
    }

    /// Hands the original value of `column` of `row` to `restore` and
    /// forgets the edit once `restore` succeeds.
    ///
    /// Returns `Ok(false)` (and does nothing) if the cell is not changed. If
    /// `restore` fails, its error is returned and the edit stays recorded.
    pub fn undo_cell_change<F, E>(&mut self, row: &K, column: usize, restore: F) -> Result<bool, E>
    where
        F: FnOnce(&V) -> Result<(), E>,
    {
        let Some(original) = self.original_value(row, column) else {
            return Ok(false);
        };
        restore(original)?;
        self.forget(row, column);
        tracing::trace!(target: targets::JOURNAL, ?row, column, "undo edit");
        Ok(true)
    }

    /// Clears the delete mark of `row`.
    ///
    /// Edits made before the delete stay recorded. Returns `false` if `row`
    /// was not pending delete.
    pub fn undo_delete<C>(&mut self, row: &K, callbacks: &mut C) -> bool
    where
        C: JournalCallbacks<K, V>,
    {
        if !self.deletes.remove(row) {
            return false;
        }
        tracing::trace!(target: targets::JOURNAL, ?row, "undo delete");
        callbacks.item_updated(row);
        true
    }

    /// Rolls every pending change back.
    ///
    /// Pending adds are deleted, pending deletes become visible again and
    /// every edited cell gets its original value restored. A cell whose
    /// restore fails keeps its original recorded, so it is still reported as
    /// changed afterwards.
    pub fn revert<C>(&mut self, callbacks: &mut C)
    where
        C: JournalCallbacks<K, V>,
    {
        let _perf = PerfSpan::new("journal_revert");
        let (adds, deletes, originals) = self.drain();
        tracing::debug!(
            target: targets::JOURNAL,
            adds = adds.len(),
            deletes = deletes.len(),
            changed = originals.len(),
            "reverting"
        );

        for row in &adds {
            callbacks.item_deleted(row);
        }
        for row in &deletes {
            callbacks.item_updated(row);
        }
        for (row, columns) in originals {
            let mut columns: Vec<_> = columns.into_iter().collect();
            columns.sort_by_key(|(column, _)| *column);
            let kept: HashMap<usize, V> = columns
                .into_iter()
                .filter(|(column, value)| !callbacks.restore_value(&row, *column, value))
                .collect();
            callbacks.item_updated(&row);
            if !kept.is_empty() {
                tracing::warn!(target: targets::JOURNAL, ?row, kept = kept.len(), "edits kept after failed restore");
                self.originals.insert(row, kept);
            }
        }
    }

    /// Accepts every pending change and clears the journal.
    ///
    /// Pending adds become ordinary rows, pending deletes are deleted and
    /// original values are discarded.
    pub fn commit<C>(&mut self, callbacks: &mut C)
    where
        C: JournalCallbacks<K, V>,
    {
        let _perf = PerfSpan::new("journal_commit");
        let (adds, deletes, originals) = self.drain();
        tracing::debug!(
            target: targets::JOURNAL,
            adds = adds.len(),
            deletes = deletes.len(),
            changed = originals.len(),
            "committing"
        );

        for row in &adds {
            callbacks.item_updated(row);
        }
        for row in &deletes {
            callbacks.item_deleted(row);
        }
        for row in originals.keys().filter(|row| !deletes.contains(*row)) {
            callbacks.item_updated(row);
        }
    }

    /// Discards everything without callbacks.
    pub fn clear(&mut self) {
        self.drain();
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Returns `true` if `row` is a pending add.
    pub fn is_pending_add(&self, row: &K) -> bool {
        self.adds.contains(row)
    }

    /// Returns `true` if `row` is marked for deletion.
    pub fn is_pending_delete(&self, row: &K) -> bool {
        self.deletes.contains(row)
    }

    /// Returns `true` if `column` of `row` differs from its original.
    pub fn is_changed(&self, row: &K, column: usize) -> bool {
        self.originals
            .get(row)
            .is_some_and(|columns| columns.contains_key(&column))
    }

    /// Returns `true` if any cell of `row` is changed.
    pub fn is_row_changed(&self, row: &K) -> bool {
        self.originals.contains_key(row)
    }

    /// The value `column` of `row` held before its first edit.
    pub fn original_value(&self, row: &K, column: usize) -> Option<&V> {
        self.originals.get(row).and_then(|columns| columns.get(&column))
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.deletes.is_empty() && self.originals.is_empty()
    }

    /// Every row with a pending add, delete or edit.
    pub fn changed_row_identities(&self) -> Vec<K> {
        let mut rows: Vec<K> = self.adds.iter().chain(self.deletes.iter()).cloned().collect();
        rows.extend(
            self.originals
                .keys()
                .filter(|row| !self.deletes.contains(*row))
                .cloned(),
        );
        rows
    }

    /// The changed columns of `row`, ascending.
    pub fn changed_columns_for(&self, row: &K) -> Vec<usize> {
        let mut columns: Vec<usize> = self
            .originals
            .get(row)
            .map(|columns| columns.keys().copied().collect())
            .unwrap_or_default();
        columns.sort_unstable();
        columns
    }

    // -------------------------------------------------------------------------
    // Identity maintenance
    // -------------------------------------------------------------------------

    /// Moves every entry of `from` over to `to`.
    pub fn rekey(&mut self, from: &K, to: K) {
        if *from == to {
            return;
        }
        self.rekey_with(|row| Some(if row == *from { to.clone() } else { row }));
    }

    /// Rewrites every row identity through `map`; rows mapped to `None` are
    /// dropped.
    ///
    /// Used when rows move (sub-rows shifting after a removal) or vanish
    /// (a group shrinking) without going through a commit or revert.
    pub fn rekey_with<F>(&mut self, mut map: F)
    where
        F: FnMut(K) -> Option<K>,
    {
        let (adds, deletes, originals) = self.drain();
        let before = adds.len() + deletes.len() + originals.len();

        self.adds = adds.into_iter().filter_map(&mut map).collect();
        self.deletes = deletes.into_iter().filter_map(&mut map).collect();
        self.originals = originals
            .into_iter()
            .filter_map(|(row, columns)| map(row).map(|row| (row, columns)))
            .collect();

        let after = self.adds.len() + self.deletes.len() + self.originals.len();
        if after != before {
            tracing::trace!(target: targets::JOURNAL, dropped = before - after, "rekeyed journal");
        }
    }

    /// Removes the original of one cell, dropping the row entry when it was
    /// the last one.
    fn forget(&mut self, row: &K, column: usize) -> Option<V> {
        let columns = self.originals.get_mut(row)?;
        let original = columns.remove(&column);
        if columns.is_empty() {
            self.originals.remove(row);
        }
        original
    }

    fn drain(&mut self) -> (HashSet<K>, HashSet<K>, HashMap<K, HashMap<usize, V>>) {
        (
            std::mem::take(&mut self.adds),
            std::mem::take(&mut self.deletes),
            std::mem::take(&mut self.originals),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        deleted: Vec<u32>,
        updated: Vec<u32>,
        restored: Vec<(u32, usize, CellValue)>,
        refuse: Vec<(u32, usize)>,
    }

    impl JournalCallbacks<u32> for Recorder {
        fn item_deleted(&mut self, row: &u32) {
            self.deleted.push(*row);
        }

        fn item_updated(&mut self, row: &u32) {
            self.updated.push(*row);
        }

        fn restore_value(&mut self, row: &u32, column: usize, value: &CellValue) -> bool {
            if self.refuse.contains(&(*row, column)) {
                return false;
            }
            self.restored.push((*row, column, value.clone()));
            true
        }
    }

    fn s(value: &str) -> CellValue {
        CellValue::from(value)
    }

    #[test]
    fn test_only_first_original_is_kept() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_cell_change(&1, 0, s("a"), &s("b"));
        journal.record_cell_change(&1, 0, s("b"), &s("c"));

        assert_eq!(journal.original_value(&1, 0), Some(&s("a")));
        journal.record_cell_change(&1, 0, s("c"), &s("a"));
        assert!(!journal.is_changed(&1, 0));
        assert!(journal.is_empty());
    }

    #[test]
    fn test_no_op_edit_records_nothing() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_cell_change(&1, 2, s("same"), &s("same"));
        assert!(journal.is_empty());
    }

    #[test]
    fn test_pending_add_has_no_originals() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_add(5);
        journal.record_cell_change(&5, 0, s("a"), &s("b"));

        assert!(journal.is_pending_add(&5));
        assert!(!journal.is_row_changed(&5));
    }

    #[test]
    fn test_delete_of_pending_add_leaves_no_trace() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_add(5);

        assert!(!journal.record_delete(&5));
        assert!(journal.is_empty());
        assert!(journal.record_delete(&6));
        assert!(journal.is_pending_delete(&6));
    }

    #[test]
    fn test_undo_is_lenient() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        let mut recorder = Recorder::default();

        assert_eq!(
            journal.undo_cell_change(&1, 0, |_| -> Result<(), ()> { panic!("nothing to restore") }),
            Ok(false)
        );
        assert!(!journal.undo_delete(&1, &mut recorder));
        assert!(recorder.updated.is_empty());
    }

    #[test]
    fn test_undo_cell_change_hands_back_original() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_cell_change(&1, 3, s("orig"), &s("edit"));

        let mut restored = None;
        let undone = journal.undo_cell_change(&1, 3, |value| -> Result<(), ()> {
            restored = Some(value.clone());
            Ok(())
        });
        assert_eq!(undone, Ok(true));
        assert_eq!(restored, Some(s("orig")));
        assert!(journal.is_empty());
    }

    #[test]
    fn test_failed_undo_keeps_the_edit() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_cell_change(&1, 3, s("orig"), &s("edit"));

        let undone = journal.undo_cell_change(&1, 3, |_| Err("read-only"));
        assert_eq!(undone, Err("read-only"));
        assert_eq!(journal.original_value(&1, 3), Some(&s("orig")));
    }

    #[test]
    fn test_revert_keeps_cells_that_fail_to_restore() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_delete(&2);
        journal.record_cell_change(&3, 0, s("a"), &s("x"));
        journal.record_cell_change(&3, 1, s("b"), &s("y"));

        let mut recorder = Recorder {
            refuse: vec![(3, 1)],
            ..Recorder::default()
        };
        journal.revert(&mut recorder);

        assert_eq!(recorder.restored, vec![(3, 0, s("a"))]);
        assert_eq!(recorder.updated, vec![2, 3]);
        assert!(!journal.is_pending_delete(&2));
        assert!(!journal.is_changed(&3, 0));
        assert_eq!(journal.original_value(&3, 1), Some(&s("b")));
        assert_eq!(journal.changed_row_identities(), vec![3]);
    }

    #[test]
    fn test_undo_delete_keeps_edits() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        let mut recorder = Recorder::default();
        journal.record_cell_change(&1, 0, s("a"), &s("b"));
        journal.record_delete(&1);

        assert!(journal.undo_delete(&1, &mut recorder));
        assert_eq!(recorder.updated, vec![1]);
        assert!(journal.is_changed(&1, 0));
        assert!(!journal.is_pending_delete(&1));
    }

    #[test]
    fn test_revert() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_add(1);
        journal.record_delete(&2);
        journal.record_cell_change(&3, 1, s("b"), &s("x"));
        journal.record_cell_change(&3, 0, s("a"), &s("y"));

        let mut recorder = Recorder::default();
        journal.revert(&mut recorder);

        assert!(journal.is_empty());
        assert_eq!(recorder.deleted, vec![1]);
        assert_eq!(recorder.updated, vec![2, 3]);
        assert_eq!(recorder.restored, vec![(3, 0, s("a")), (3, 1, s("b"))]);
    }

    #[test]
    fn test_commit() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_add(1);
        journal.record_delete(&2);
        journal.record_cell_change(&3, 0, s("a"), &s("y"));

        let mut recorder = Recorder::default();
        journal.commit(&mut recorder);

        assert!(journal.is_empty());
        assert_eq!(recorder.deleted, vec![2]);
        assert_eq!(recorder.updated, vec![1, 3]);
        assert!(recorder.restored.is_empty());
    }

    #[test]
    fn test_changed_rows_and_columns() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_add(1);
        journal.record_delete(&2);
        journal.record_cell_change(&2, 0, s("a"), &s("b"));
        journal.record_cell_change(&3, 4, s("a"), &s("b"));
        journal.record_cell_change(&3, 1, s("a"), &s("b"));

        let mut rows = journal.changed_row_identities();
        rows.sort_unstable();
        assert_eq!(rows, vec![1, 2, 3]);
        assert_eq!(journal.changed_columns_for(&3), vec![1, 4]);
        assert!(journal.changed_columns_for(&9).is_empty());
    }

    #[test]
    fn test_rekey_with_moves_and_drops() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_cell_change(&1, 0, s("a"), &s("b"));
        journal.record_cell_change(&2, 0, s("a"), &s("b"));
        journal.record_delete(&3);

        journal.rekey_with(|row| match row {
            1 => None,
            other => Some(other * 10),
        });
        assert!(!journal.is_row_changed(&1));
        assert!(journal.is_changed(&20, 0));
        assert!(journal.is_pending_delete(&30));

        journal.rekey(&20, 7);
        assert_eq!(journal.original_value(&7, 0), Some(&s("a")));
    }

    #[test]
    fn test_unit_callbacks() {
        let mut journal: ChangeJournal<u32> = ChangeJournal::new();
        journal.record_delete(&1);
        journal.revert(&mut ());
        assert!(journal.is_empty());
    }
}
