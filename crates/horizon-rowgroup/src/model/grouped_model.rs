//! A flat table over a two-level hierarchy of groups and sub-rows.
//!
//! `GroupedRowModel` presents an ordered sequence of groups as one flat row
//! sequence:
//!
//! ```text
//! flat row   0        1          2          3        4
//!          [A lead, A detail0, A detail1, B lead, C lead, ...]
//! ```
//!
//! Groups are kept in an [`IdentityIndexedList`] (lookup by key or instance)
//! and their start rows in a [`GroupOffsetIndex`] (row ↔ group in O(log G)).
//! Every structural change rebuilds the offsets from the first affected group
//! and then notifies listeners with the affected flat range.

use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use horizon_rowgroup_core::logging::targets;
use horizon_rowgroup_core::{PerfSpan, Result, RowGroupError};

use super::column::{ColumnAdapter, ColumnSet, DetailAccessor};
use super::config::{ModelConfig, RowLayout};
use super::identity_list::{GroupId, IdentityIndexedList, KeyFn};
use super::offset_index::GroupOffsetIndex;
use super::traits::{FlatTableModel, RowPosition, RowSignals};
use super::value::CellValue;

/// A flat, randomly indexable table over groups with a variable number of
/// sub-rows.
///
/// `G` is the group bean, `R` the sub-row type and `K` the group key.
///
/// Build one with [`GroupedModelBuilder`](super::GroupedModelBuilder).
pub struct GroupedRowModel<G, R, K> {
    groups: IdentityIndexedList<G, K>,
    offsets: GroupOffsetIndex,
    details: Rc<dyn DetailAccessor<G, R>>,
    header_columns: ColumnSet<G>,
    detail_columns: Vec<ColumnSet<R>>,
    column_count: usize,
    layout: RowLayout,
    signals: RowSignals,
}

impl<G, R, K> GroupedRowModel<G, R, K>
where
    K: Eq + Hash + Clone + Debug,
{
    pub(crate) fn from_parts(
        key_fn: KeyFn<G, K>,
        details: Rc<dyn DetailAccessor<G, R>>,
        header_columns: ColumnSet<G>,
        detail_columns: Vec<ColumnSet<R>>,
        column_count: usize,
        config: ModelConfig,
    ) -> Self {
        Self {
            groups: IdentityIndexedList::with_key_fn(key_fn),
            offsets: GroupOffsetIndex::with_growth(config.offset_growth),
            details,
            header_columns,
            detail_columns,
            column_count,
            layout: config.layout,
            signals: RowSignals::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Group access
    // -------------------------------------------------------------------------

    /// The lead-row layout.
    pub fn layout(&self) -> RowLayout {
        self.layout
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if the model has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The group at `index`.
    pub fn group(&self, index: usize) -> Option<&G> {
        self.groups.get(index)
    }

    /// The group indexed under `key`.
    pub fn group_by_key(&self, key: &K) -> Option<&G> {
        self.groups.index_of_key(key).and_then(|index| self.groups.get(index))
    }

    /// Iterates over the groups in order.
    pub fn groups(&self) -> impl Iterator<Item = &G> + '_ {
        self.groups.iter()
    }

    /// Instance id of the group at `index`.
    pub fn group_id_at(&self, index: usize) -> Option<GroupId> {
        self.groups.id_at(index)
    }

    /// The key the group at `index` is indexed under.
    pub fn key_at(&self, index: usize) -> Option<&K> {
        self.groups.key_at(index)
    }

    /// Current position of the group with instance id `id`.
    pub fn index_of_group(&self, id: GroupId) -> Option<usize> {
        self.groups.index_of_id(id)
    }

    /// Current position of the group indexed under `key`.
    pub fn index_of_key(&self, key: &K) -> Option<usize> {
        self.groups.index_of_key(key)
    }

    /// Position of `group`, by key or, for unkeyed groups, by reference.
    ///
    /// The reference lookup scans the groups. Prefer
    /// [`index_of_group`](Self::index_of_group) for unkeyed groups.
    pub fn index_of(&self, group: &G) -> Option<usize> {
        self.groups.index_of(group)
    }

    /// Extracts the key of a group that is not (necessarily) in the model.
    pub fn key_of(&self, group: &G) -> Option<K> {
        self.groups.key_of(group)
    }

    /// Number of sub-rows of the group at `index`.
    pub fn detail_count(&self, index: usize) -> usize {
        self.groups
            .get(index)
            .map_or(0, |group| self.details.detail_count(group))
    }

    /// Number of sub-rows of a group that does not have to be in the model.
    pub fn detail_count_of(&self, group: &G) -> usize {
        self.details.detail_count(group)
    }

    /// The sub-row `detail` of the group at `index`.
    pub fn detail(&self, index: usize, detail: usize) -> Option<&R> {
        self.groups
            .get(index)
            .and_then(|group| self.details.detail(group, detail))
    }

    // -------------------------------------------------------------------------
    // Row resolution
    // -------------------------------------------------------------------------

    /// The group and sub-row `flat_row` refers to.
    ///
    /// Unlike [`group_number`](FlatTableModel::group_number) this is strict:
    /// rows past the end resolve to `None`.
    pub fn locate(&self, flat_row: usize) -> Option<RowPosition> {
        if flat_row >= self.offsets.row_count() {
            return None;
        }
        let group = self.offsets.group_number(flat_row)?;
        let lead = self.offsets.lead_row(group)?;
        Some(match flat_row - lead {
            0 => RowPosition::Lead { group },
            n => RowPosition::Detail { group, detail: n - 1 },
        })
    }

    /// The flat row of the lead row (`detail == None`) or of a sub-row of
    /// `group`.
    pub fn flat_row_of(&self, group: usize, detail: Option<usize>) -> Option<usize> {
        let lead = self.offsets.lead_row(group)?;
        match detail {
            None => Some(lead),
            Some(d) if d < self.detail_count(group) => Some(lead + 1 + d),
            Some(_) => None,
        }
    }

    /// The flat rows occupied by `group`, as an inclusive range.
    pub fn rows_of_group(&self, group: usize) -> Option<(usize, usize)> {
        let lead = self.offsets.lead_row(group)?;
        Some((lead, lead + self.detail_count(group)))
    }

    /// The offsets cache.
    pub fn offset_index(&self) -> &GroupOffsetIndex {
        &self.offsets
    }

    /// Recomputes the offsets from scratch and reports the first stale group.
    pub fn verify_offsets(&self) -> Option<usize> {
        self.offsets
            .verify(self.groups.len(), |g| 1 + self.detail_count(g))
    }

    // -------------------------------------------------------------------------
    // Structural mutation
    // -------------------------------------------------------------------------

    /// Appends a group.
    pub fn push_group(&mut self, group: G) -> Result<GroupId> {
        self.insert_group(self.groups.len(), group)
    }

    /// Inserts a group at `index`.
    ///
    /// Emits `rows_inserted` for the group's lead row and all its sub-rows.
    /// Fails with [`RowGroupError::DuplicateKey`] without changing anything if
    /// the key is already present.
    pub fn insert_group(&mut self, index: usize, group: G) -> Result<GroupId> {
        self.insert_group_with(index, group, |_, _| {})
    }

    /// Like [`insert_group`](Self::insert_group), running `before_notify`
    /// once the model is consistent but before listeners hear about it.
    pub(crate) fn insert_group_with<F>(&mut self, index: usize, group: G, before_notify: F) -> Result<GroupId>
    where
        F: FnOnce(&Self, GroupId),
    {
        let id = self.groups.insert(index, group)?;
        self.rebuild_offsets_from(index);

        let (lead, last) = self.group_range(index);
        tracing::trace!(target: targets::MODEL, %id, index, lead, last, "inserted group");
        before_notify(self, id);
        self.signals.rows_inserted.emit((lead, last));
        Ok(id)
    }

    /// Removes the group with instance id `id`.
    pub fn remove_group(&mut self, id: GroupId) -> Result<G> {
        let index = self.groups.index_of_id(id).ok_or(RowGroupError::GroupNotFound)?;
        self.remove_group_at(index)
    }

    /// Removes the group indexed under `key`.
    pub fn remove_group_by_key(&mut self, key: &K) -> Result<G> {
        let index = self.groups.index_of_key(key).ok_or(RowGroupError::GroupNotFound)?;
        self.remove_group_at(index)
    }

    /// Removes the group at `index`.
    ///
    /// Emits `rows_removed` for the rows the group occupied.
    pub fn remove_group_at(&mut self, index: usize) -> Result<G> {
        self.remove_group_at_with(index, |_| {})
    }

    pub(crate) fn remove_group_at_with<F>(&mut self, index: usize, before_notify: F) -> Result<G>
    where
        F: FnOnce(&Self),
    {
        let (lead, last) = self.rows_of_group(index).ok_or(RowGroupError::GroupOutOfBounds {
            group: index,
            group_count: self.groups.len(),
        })?;
        let group = self.groups.remove(index)?;
        self.rebuild_offsets_from(index);

        tracing::trace!(target: targets::MODEL, index, lead, last, "removed group");
        before_notify(self);
        self.signals.rows_removed.emit((lead, last));
        Ok(group)
    }

    /// Replaces the group at `index` with `group`.
    ///
    /// The replacement may have a different number of sub-rows: surplus rows
    /// are announced as removed, missing rows as inserted, and the rows both
    /// have in common as updated.
    ///
    /// Returns the new group's id and the replaced group.
    pub fn replace_group(&mut self, index: usize, group: G) -> Result<(GroupId, G)> {
        self.replace_group_with(index, group, |_, _, _| {})
    }

    /// Like [`replace_group`](Self::replace_group), running `before_notify`
    /// with the new id and the replaced group before listeners are notified.
    pub(crate) fn replace_group_with<F>(&mut self, index: usize, group: G, before_notify: F) -> Result<(GroupId, G)>
    where
        F: FnOnce(&Self, GroupId, &G),
    {
        let old_count = self.detail_count(index);
        let (id, old) = self.groups.set(index, group)?;
        let new_count = self.detail_count(index);
        if old_count != new_count {
            self.rebuild_offsets_from(index);
        }

        tracing::trace!(target: targets::MODEL, %id, index, old_count, new_count, "replaced group");
        before_notify(self, id, &old);
        self.emit_resized(index, old_count, new_count);
        Ok((id, old))
    }

    /// Mutates the group at `index` in place.
    ///
    /// Sub-rows added or removed by `f` are announced like a replacement.
    /// Afterwards the group's key is refreshed: an absent key that became
    /// present is indexed, a changed key is reported as
    /// [`RowGroupError::KeyChanged`] (the mutation itself stays applied).
    pub fn modify_group<F, T>(&mut self, index: usize, f: F) -> Result<T>
    where
        F: FnOnce(&mut G) -> T,
    {
        self.modify_group_with(index, f, |_, _, _| {})
    }

    /// Like [`modify_group`](Self::modify_group); `before_notify` receives
    /// the sub-row counts before and after the mutation.
    pub(crate) fn modify_group_with<F, T, H>(&mut self, index: usize, f: F, before_notify: H) -> Result<T>
    where
        F: FnOnce(&mut G) -> T,
        H: FnOnce(&Self, usize, usize),
    {
        let old_count = self.detail_count(index);
        let group_count = self.groups.len();
        let group = self
            .groups
            .get_mut_unchecked(index)
            .ok_or(RowGroupError::GroupOutOfBounds { group: index, group_count })?;
        let result = f(group);

        let new_count = self.detail_count(index);
        if old_count != new_count {
            self.rebuild_offsets_from(index);
        }
        let refreshed = self.groups.refresh_key(index);

        tracing::trace!(target: targets::MODEL, index, old_count, new_count, "modified group");
        before_notify(self, old_count, new_count);
        self.emit_resized(index, old_count, new_count);
        refreshed.map(|_| result)
    }

    /// Appends a sub-row to the group at `index`.
    ///
    /// The detail accessor creates the sub-row. Returns its flat row, which
    /// is announced with `rows_inserted`.
    pub fn append_sub_row(&mut self, index: usize) -> Result<usize> {
        let group_count = self.groups.len();
        let group = self
            .groups
            .get_mut_unchecked(index)
            .ok_or(RowGroupError::GroupOutOfBounds { group: index, group_count })?;
        self.details.append_detail(group)?;
        self.rebuild_offsets_from(index);

        let (_, row) = self.group_range(index);
        tracing::trace!(target: targets::MODEL, index, row, "appended sub-row");
        self.signals.rows_inserted.emit((row, row));
        Ok(row)
    }

    /// Removes sub-row `detail` of the group at `index`.
    pub fn remove_sub_row(&mut self, index: usize, detail: usize) -> Result<R> {
        self.remove_sub_row_with(index, detail, |_| {})
    }

    pub(crate) fn remove_sub_row_with<F>(&mut self, index: usize, detail: usize, before_notify: F) -> Result<R>
    where
        F: FnOnce(&Self),
    {
        let row = self
            .flat_row_of(index, Some(detail))
            .ok_or_else(|| RowGroupError::InvalidOperation(format!("group {index} has no sub-row {detail}")))?;
        let group = self.groups.get_mut_unchecked(index).ok_or(RowGroupError::GroupNotFound)?;
        let removed = self.details.remove_detail(group, detail).ok_or_else(|| {
            RowGroupError::InvalidOperation("this group type does not support removing sub-rows".into())
        })?;
        self.rebuild_offsets_from(index);

        tracing::trace!(target: targets::MODEL, index, detail, row, "removed sub-row");
        before_notify(self);
        self.signals.rows_removed.emit((row, row));
        Ok(removed)
    }

    /// Replaces every group and emits `model_reset`.
    ///
    /// On a duplicate key nothing changes and no signal is emitted.
    pub fn set_groups(&mut self, groups: Vec<G>) -> Result<()> {
        self.groups.replace_all(groups)?;
        self.offsets.clear();
        self.rebuild_offsets_from(0);
        tracing::trace!(target: targets::MODEL, groups = self.groups.len(), "reset groups");
        self.signals.model_reset.emit(());
        Ok(())
    }

    /// Removes every group and emits `model_reset`.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.offsets.clear();
        self.signals.model_reset.emit(());
    }

    /// Reorders the groups and emits `layout_changed`.
    pub fn sort_groups_by<F>(&mut self, compare: F)
    where
        F: FnMut(&G, &G) -> std::cmp::Ordering,
    {
        let _perf = PerfSpan::new("sort_groups");
        self.groups.sort_by(compare);
        self.rebuild_offsets_from(0);
        self.signals.layout_changed.emit(());
    }

    // -------------------------------------------------------------------------
    // Cell access
    // -------------------------------------------------------------------------

    /// The value at `row`, `column`, with adapter failures propagated.
    pub fn cell_value(&self, row: usize, column: usize) -> Result<CellValue> {
        let position = self.locate_checked(row, column)?;
        let group = self.groups.get(position.group()).ok_or(RowGroupError::GroupNotFound)?;
        self.cells().read(group, position.detail(), column)
    }

    /// Reads a cell of a group that does not have to be part of the model.
    pub(crate) fn read_cell(&self, group: &G, detail: Option<usize>, column: usize) -> Result<CellValue> {
        self.cells().read(group, detail, column)
    }

    /// Writes a cell of a group that does not have to be part of the model.
    pub(crate) fn write_cell(&self, group: &mut G, detail: Option<usize>, column: usize, value: CellValue) -> Result<()> {
        self.cells().write(group, detail, column, value)
    }

    /// Writes a cell of a group in the model and refreshes the group key.
    ///
    /// A lead-row write that the key index rejects is undone before the
    /// error is returned. No signal is emitted.
    pub(crate) fn write_cell_at(&mut self, position: RowPosition, column: usize, value: CellValue) -> Result<()> {
        let index = position.group();
        let cells = CellAccess {
            header_columns: &self.header_columns,
            detail_columns: &self.detail_columns,
            details: self.details.as_ref(),
            layout: self.layout,
            column_count: self.column_count,
        };
        let group = self.groups.get_mut_unchecked(index).ok_or(RowGroupError::GroupNotFound)?;
        if !position.is_lead() {
            return cells.write(group, position.detail(), column, value);
        }

        let prior = cells.read(group, None, column)?;
        cells.write(group, None, column, value)?;
        let Err(err) = self.groups.refresh_key(index) else {
            return Ok(());
        };
        if let Some(group) = self.groups.get_mut_unchecked(index) {
            if let Err(restore) = cells.write(group, None, column, prior) {
                tracing::error!(
                    target: targets::MODEL,
                    group = index,
                    column,
                    error = %restore,
                    "could not undo rejected key edit"
                );
            }
        }
        Err(err)
    }

    fn cells(&self) -> CellAccess<'_, G, R> {
        CellAccess {
            header_columns: &self.header_columns,
            detail_columns: &self.detail_columns,
            details: self.details.as_ref(),
            layout: self.layout,
            column_count: self.column_count,
        }
    }

    pub(crate) fn locate_checked(&self, row: usize, column: usize) -> Result<RowPosition> {
        if column >= self.column_count {
            return Err(RowGroupError::ColumnOutOfBounds {
                column,
                column_count: self.column_count,
            });
        }
        self.locate(row).ok_or(RowGroupError::RowOutOfBounds {
            row,
            row_count: self.offsets.row_count(),
        })
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn rebuild_offsets_from(&mut self, index: usize) {
        let groups = &self.groups;
        let details = &self.details;
        self.offsets.rebuild_from(index, groups.len(), |g| {
            1 + groups.get(g).map_or(0, |group| details.detail_count(group))
        });
    }

    /// Lead and last row of a group known to exist.
    fn group_range(&self, index: usize) -> (usize, usize) {
        self.rows_of_group(index)
            .unwrap_or((self.offsets.row_count(), self.offsets.row_count()))
    }

    /// Announces a group whose sub-row count went from `old` to `new`.
    fn emit_resized(&self, index: usize, old: usize, new: usize) {
        let (lead, _) = self.group_range(index);
        if old > new {
            self.signals.rows_removed.emit((lead + new + 1, lead + old));
        } else if new > old {
            self.signals.rows_inserted.emit((lead + old + 1, lead + new));
        }
        self.signals.rows_updated.emit((lead, lead + old.min(new)));
    }
}

/// Borrowed view of the column configuration, independent of group storage.
struct CellAccess<'m, G, R> {
    header_columns: &'m ColumnSet<G>,
    detail_columns: &'m [ColumnSet<R>],
    details: &'m dyn DetailAccessor<G, R>,
    layout: RowLayout,
    column_count: usize,
}

impl<G, R> CellAccess<'_, G, R> {
    fn read(&self, group: &G, detail: Option<usize>, column: usize) -> Result<CellValue> {
        match detail {
            None => match self.header_columns.get(column) {
                Some(adapter) => Ok(adapter.value(group)?),
                // Section labels may leave trailing columns empty.
                None if column < self.column_count => Ok(CellValue::None),
                None => Err(self.column_out_of_bounds(column)),
            },
            Some(d) => {
                let row = self.details.detail(group, d).ok_or_else(|| missing_sub_row(d))?;
                Ok(self.detail_adapter(row, column)?.value(row)?)
            }
        }
    }

    fn write(&self, group: &mut G, detail: Option<usize>, column: usize, value: CellValue) -> Result<()> {
        match detail {
            None => {
                if self.layout == RowLayout::Sections {
                    return Err(RowGroupError::InvalidOperation("section rows cannot be edited".into()));
                }
                let adapter = self
                    .header_columns
                    .get(column)
                    .ok_or_else(|| self.column_out_of_bounds(column))?;
                Ok(adapter.set_value(group, value)?)
            }
            Some(d) => {
                let row = self.details.detail_mut(group, d).ok_or_else(|| missing_sub_row(d))?;
                let adapter = self.detail_adapter(row, column)?;
                Ok(adapter.set_value(row, value)?)
            }
        }
    }

    fn is_editable(&self, group: &G, detail: Option<usize>, column: usize) -> bool {
        match detail {
            None => {
                self.layout == RowLayout::HeaderDetail
                    && self
                        .header_columns
                        .get(column)
                        .is_some_and(|adapter| adapter.is_editable(group))
            }
            Some(d) => self.details.detail(group, d).is_some_and(|row| {
                self.detail_adapter(row, column)
                    .is_ok_and(|adapter| adapter.is_editable(row))
            }),
        }
    }

    fn detail_adapter(&self, row: &R, column: usize) -> Result<&Rc<dyn ColumnAdapter<R>>> {
        let detail_type = self.details.detail_type(row);
        let set = self.detail_columns.get(detail_type).ok_or_else(|| {
            RowGroupError::InvalidOperation(format!("no column set for detail type {detail_type}"))
        })?;
        set.get(column).ok_or_else(|| self.column_out_of_bounds(column))
    }

    fn column_out_of_bounds(&self, column: usize) -> RowGroupError {
        RowGroupError::ColumnOutOfBounds {
            column,
            column_count: self.column_count,
        }
    }
}

fn missing_sub_row(detail: usize) -> RowGroupError {
    RowGroupError::InvalidOperation(format!("sub-row {detail} does not exist"))
}

impl<G, R, K> FlatTableModel for GroupedRowModel<G, R, K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn row_count(&self) -> usize {
        self.offsets.row_count()
    }

    fn column_count(&self) -> usize {
        self.column_count
    }

    fn value_at(&self, row: usize, column: usize) -> CellValue {
        match self.cell_value(row, column) {
            Ok(value) => value,
            Err(RowGroupError::Column(err)) => {
                tracing::warn!(target: targets::MODEL, row, column, error = %err, "column adapter failed");
                CellValue::None
            }
            Err(_) => CellValue::None,
        }
    }

    fn set_value_at(&mut self, row: usize, column: usize, value: CellValue) -> Result<()> {
        let position = self.locate_checked(row, column)?;
        self.write_cell_at(position, column, value)?;
        tracing::trace!(target: targets::MODEL, row, column, "cell written");
        self.signals.emit_row_updated(row);
        Ok(())
    }

    fn is_cell_editable(&self, row: usize, column: usize) -> bool {
        let Ok(position) = self.locate_checked(row, column) else {
            return false;
        };
        self.groups
            .get(position.group())
            .is_some_and(|group| self.cells().is_editable(group, position.detail(), column))
    }

    fn is_section_or_header_row(&self, row: usize) -> bool {
        self.locate(row).is_some_and(|position| position.is_lead())
    }

    fn group_number(&self, row: usize) -> Option<usize> {
        self.offsets.group_number(row)
    }

    fn lead_row_of_group(&self, group: usize) -> Option<usize> {
        self.offsets.lead_row(group)
    }

    fn signals(&self) -> &RowSignals {
        &self.signals
    }

    fn column_name(&self, column: usize) -> Option<String> {
        let detail = self.detail_columns.first().and_then(|set| set.get(column));
        let header = self.header_columns.get(column);
        detail
            .map(|adapter| adapter.name().to_string())
            .or_else(|| header.map(|adapter| adapter.name().to_string()))
    }
}

impl<G, R, K> std::fmt::Debug for GroupedRowModel<G, R, K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupedRowModel")
            .field("groups", &self.groups.len())
            .field("rows", &self.offsets.row_count())
            .field("columns", &self.column_count)
            .field("layout", &self.layout)
            .finish()
    }
}
