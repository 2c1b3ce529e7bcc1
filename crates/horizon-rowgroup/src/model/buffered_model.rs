//! A grouped model whose edits stay pending until committed.
//!
//! [`BufferedGroupedRowModel`] wraps a [`GroupedRowModel`] and records every
//! edit in a [`ChangeJournal`]:
//!
//! - `queue_add` inserts a group and marks it as a pending add;
//! - `queue_delete` marks a group for deletion but keeps it visible (an
//!   unsaved group is removed immediately instead);
//! - `set_value_at` remembers the first original value of every edited cell.
//!
//! `commit` accepts all pending changes, `revert` rolls them back. Structural
//! operations that bypass the journal (replacing, modifying or removing a
//! group, removing a sub-row) migrate or purge the journal entries they
//! affect in the same call.

use std::fmt::Debug;
use std::hash::Hash;

use horizon_rowgroup_core::logging::targets;
use horizon_rowgroup_core::{Result, RowGroupError};

use super::config::IdentityPolicy;
use super::grouped_model::GroupedRowModel;
use super::identity_list::GroupId;
use super::journal::{ChangeJournal, JournalCallbacks};
use super::traits::{FlatTableModel, RowPosition, RowSignals};
use super::value::CellValue;

/// How the journal recognises a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupIdentity<K> {
    /// By extracted key.
    Key(K),
    /// By instance.
    Instance(GroupId),
}

/// Journal identity of one row: a group and, for sub-rows, the sub-row index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey<K> {
    /// The owning group.
    pub group: GroupIdentity<K>,
    /// The sub-row index, `None` for the lead row.
    pub detail: Option<usize>,
}

impl<K> RowKey<K> {
    /// The lead row of `group`.
    pub fn lead(group: GroupIdentity<K>) -> Self {
        Self { group, detail: None }
    }
}

/// A [`GroupedRowModel`] with pending adds, deletes and cell edits.
///
/// # Example
///
/// ```
/// use horizon_rowgroup::model::{
///     CellValue, FlatTableModel, FnColumn, GroupedModelBuilder, VecDetails,
/// };
///
/// struct Customer {
///     id: u32,
///     name: String,
///     notes: Vec<String>,
/// }
///
/// let mut model = GroupedModelBuilder::new(
///     |c: &Customer| Some(c.id),
///     VecDetails::new(|c: &Customer| &c.notes, |c: &mut Customer| &mut c.notes),
/// )
/// .header_column(
///     FnColumn::new("Name", |c: &Customer| CellValue::from(&c.name)).with_setter(|c: &mut Customer, v| {
///         c.name = v.into_string().unwrap_or_default();
///         Ok(())
///     }),
/// )
/// .detail_columns(vec![FnColumn::new("Name", |n: &String| CellValue::from(n)).into_adapter()])
/// .build_buffered()
/// .unwrap();
///
/// model.queue_add(Customer { id: 1, name: "ACME".into(), notes: vec![] }).unwrap();
/// model.commit();
///
/// model.set_value_at(0, 0, CellValue::from("Initech")).unwrap();
/// assert!(model.is_changed_at(0, 0));
///
/// model.revert();
/// assert_eq!(model.value_at(0, 0), CellValue::from("ACME"));
/// ```
pub struct BufferedGroupedRowModel<G, R, K> {
    model: GroupedRowModel<G, R, K>,
    journal: ChangeJournal<RowKey<K>>,
    policy: IdentityPolicy,
}

impl<G, R, K> BufferedGroupedRowModel<G, R, K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Wraps `model`; groups already present are treated as committed.
    pub fn new(model: GroupedRowModel<G, R, K>, policy: IdentityPolicy) -> Self {
        Self {
            model,
            journal: ChangeJournal::new(),
            policy,
        }
    }

    /// The wrapped model.
    pub fn model(&self) -> &GroupedRowModel<G, R, K> {
        &self.model
    }

    /// Unwraps the model, dropping every pending change.
    pub fn into_inner(self) -> GroupedRowModel<G, R, K> {
        self.model
    }

    /// The journal.
    pub fn journal(&self) -> &ChangeJournal<RowKey<K>> {
        &self.journal
    }

    /// The journal identity policy.
    pub fn identity_policy(&self) -> IdentityPolicy {
        self.policy
    }

    /// Journal identity of the group at `index`.
    pub fn group_identity(&self, index: usize) -> Option<GroupIdentity<K>> {
        identity_at(&self.model, self.policy, index)
    }

    /// Journal identity of `flat_row`.
    pub fn row_key(&self, flat_row: usize) -> Option<RowKey<K>> {
        let position = self.model.locate(flat_row)?;
        Some(RowKey {
            group: self.group_identity(position.group())?,
            detail: position.detail(),
        })
    }

    // -------------------------------------------------------------------------
    // Pending structural changes
    // -------------------------------------------------------------------------

    /// Appends `group` as a pending add.
    pub fn queue_add(&mut self, group: G) -> Result<GroupId> {
        self.queue_add_at(self.model.group_count(), group)
    }

    /// Inserts `group` at `index` as a pending add.
    ///
    /// The group is already marked when `rows_inserted` is emitted.
    pub fn queue_add_at(&mut self, index: usize, group: G) -> Result<GroupId> {
        let policy = self.policy;
        let journal = &mut self.journal;
        self.model.insert_group_with(index, group, |model, id| {
            journal.record_add(RowKey::lead(identity_of(model, policy, id)));
        })
    }

    /// Marks the group with instance id `id` for deletion.
    ///
    /// See [`queue_delete_at`](Self::queue_delete_at).
    pub fn queue_delete(&mut self, id: GroupId) -> Result<bool> {
        let index = self.model.index_of_group(id).ok_or(RowGroupError::GroupNotFound)?;
        self.queue_delete_at(index)
    }

    /// Marks the group at `index` for deletion.
    ///
    /// A pending add is removed from the model right away and `false` is
    /// returned. Any other group stays visible, is announced with
    /// `rows_updated` so views can restyle it, and `true` is returned.
    pub fn queue_delete_at(&mut self, index: usize) -> Result<bool> {
        let identity = self.require_identity(index)?;
        let lead = RowKey::lead(identity.clone());

        if !self.journal.record_delete(&lead) {
            let journal = &mut self.journal;
            self.model.remove_group_at_with(index, |_| purge_group(journal, &identity))?;
            tracing::trace!(target: targets::JOURNAL, index, "unsaved group deleted");
            return Ok(false);
        }
        if let Some(range) = self.model.rows_of_group(index) {
            self.model.signals().rows_updated.emit(range);
        }
        Ok(true)
    }

    /// Clears the delete mark of the group with instance id `id`.
    ///
    /// Edits made before the delete remain pending. Returns `false` if the
    /// group was not marked.
    pub fn undo_delete(&mut self, id: GroupId) -> bool {
        let Some(identity) = self
            .model
            .index_of_group(id)
            .and_then(|index| self.group_identity(index))
        else {
            return false;
        };
        let mut sync = ModelSync { model: &mut self.model };
        self.journal.undo_delete(&RowKey::lead(identity), &mut sync)
    }

    // -------------------------------------------------------------------------
    // Cell edits
    // -------------------------------------------------------------------------

    /// Restores the original value of a changed cell.
    ///
    /// Returns `false` (and does nothing) if the cell is not changed. If the
    /// original cannot be written back, the cell and its journal entry are
    /// left as they were.
    pub fn undo_cell_change(&mut self, row: usize, column: usize) -> Result<bool> {
        let position = self.model.locate_checked(row, column)?;
        let key = self.key_at_position(position)?;

        let model = &mut self.model;
        let undone = self
            .journal
            .undo_cell_change(&key, column, |original| model.write_cell_at(position, column, original.clone()))?;
        if undone {
            self.model.signals().emit_row_updated(row);
        }
        Ok(undone)
    }

    /// The value a changed cell held before its first edit.
    pub fn original_value_at(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.journal.original_value(&self.row_key(row)?, column)
    }

    // -------------------------------------------------------------------------
    // Status queries
    // -------------------------------------------------------------------------

    /// Returns `true` if `row` belongs to a group marked for deletion.
    pub fn is_pending_delete(&self, row: usize) -> bool {
        self.lead_key_of_row(row)
            .is_some_and(|lead| self.journal.is_pending_delete(&lead))
    }

    /// Returns `true` if `row` belongs to a pending add.
    pub fn is_pending_add(&self, row: usize) -> bool {
        self.lead_key_of_row(row)
            .is_some_and(|lead| self.journal.is_pending_add(&lead))
    }

    /// Returns `true` if the cell differs from its original.
    ///
    /// Edits of a group marked for deletion are hidden until the delete is
    /// undone.
    pub fn is_changed_at(&self, row: usize, column: usize) -> bool {
        !self.is_pending_delete(row)
            && self
                .row_key(row)
                .is_some_and(|key| self.journal.is_changed(&key, column))
    }

    /// Returns `true` if any cell of `row` differs from its original.
    pub fn is_row_changed(&self, row: usize) -> bool {
        !self.is_pending_delete(row) && self.row_key(row).is_some_and(|key| self.journal.is_row_changed(&key))
    }

    /// The changed columns of `row`, ascending.
    pub fn changed_columns_at(&self, row: usize) -> Vec<usize> {
        self.row_key(row)
            .map(|key| self.journal.changed_columns_for(&key))
            .unwrap_or_default()
    }

    /// Returns `true` if anything is pending.
    pub fn is_changed(&self) -> bool {
        !self.journal.is_empty()
    }

    // -------------------------------------------------------------------------
    // Commit and revert
    // -------------------------------------------------------------------------

    /// Accepts every pending change.
    ///
    /// Groups marked for deletion are removed, pending adds become ordinary
    /// groups and original values are forgotten.
    pub fn commit(&mut self) {
        let mut sync = ModelSync { model: &mut self.model };
        self.journal.commit(&mut sync);
    }

    /// Rolls every pending change back.
    ///
    /// Pending adds are removed, groups marked for deletion become editable
    /// again and every changed cell gets its original value back. A cell whose
    /// original cannot be written back stays changed.
    pub fn revert(&mut self) {
        let mut sync = ModelSync { model: &mut self.model };
        self.journal.revert(&mut sync);
    }

    // -------------------------------------------------------------------------
    // Immediate structural changes
    // -------------------------------------------------------------------------

    /// Replaces the group at `index`, e.g. after reloading it from a data
    /// source.
    ///
    /// The replacement inherits the pending status of the group it replaces.
    /// Unless that group is a pending add, its changed cells are copied onto
    /// the replacement first, so in-flight edits survive the reload. Journal
    /// entries of sub-rows the replacement no longer has are dropped.
    pub fn replace_group(&mut self, index: usize, group: G) -> Result<(GroupId, G)> {
        let old_identity = self.require_identity(index)?;
        let mut group = group;
        if !self.journal.is_pending_add(&RowKey::lead(old_identity.clone())) {
            self.carry_edits(index, &old_identity, &mut group)?;
        }

        let policy = self.policy;
        let journal = &mut self.journal;
        self.model.replace_group_with(index, group, move |model, id, _| {
            let new_identity = identity_of(model, policy, id);
            migrate_group(journal, &old_identity, &new_identity, model.detail_count(index));
        })
    }

    /// Mutates the group at `index` in place.
    ///
    /// The mutation itself is not journaled. Journal entries follow the group
    /// if its key gets assigned, and entries of sub-rows removed from the end
    /// are dropped.
    pub fn modify_group<F, T>(&mut self, index: usize, f: F) -> Result<T>
    where
        F: FnOnce(&mut G) -> T,
    {
        let before = self.require_identity(index)?;
        let policy = self.policy;
        let journal = &mut self.journal;
        self.model.modify_group_with(index, f, move |model, _, new_count| {
            let after = identity_at(model, policy, index).unwrap_or_else(|| before.clone());
            migrate_group(journal, &before, &after, new_count);
        })
    }

    /// Removes the group at `index` right away, dropping its journal entries.
    pub fn remove_group_at(&mut self, index: usize) -> Result<G> {
        let identity = self.require_identity(index)?;
        let journal = &mut self.journal;
        self.model
            .remove_group_at_with(index, |_| purge_group(journal, &identity))
    }

    /// Removes the group with instance id `id` right away.
    pub fn remove_group(&mut self, id: GroupId) -> Result<G> {
        let index = self.model.index_of_group(id).ok_or(RowGroupError::GroupNotFound)?;
        self.remove_group_at(index)
    }

    /// Appends a sub-row to the group at `index` and returns its flat row.
    pub fn append_sub_row(&mut self, index: usize) -> Result<usize> {
        self.model.append_sub_row(index)
    }

    /// Removes sub-row `detail` of the group at `index` right away.
    ///
    /// Journal entries of later sub-rows move down with them.
    pub fn remove_sub_row(&mut self, index: usize, detail: usize) -> Result<R> {
        let identity = self.require_identity(index)?;
        let journal = &mut self.journal;
        self.model.remove_sub_row_with(index, detail, |_| {
            journal.rekey_with(|row| {
                if row.group != identity {
                    return Some(row);
                }
                match row.detail {
                    Some(d) if d == detail => None,
                    Some(d) if d > detail => Some(RowKey {
                        group: row.group,
                        detail: Some(d - 1),
                    }),
                    _ => Some(row),
                }
            });
        })
    }

    /// Replaces every group and forgets every pending change.
    pub fn set_groups(&mut self, groups: Vec<G>) -> Result<()> {
        let journal = std::mem::take(&mut self.journal);
        if let Err(err) = self.model.set_groups(groups) {
            self.journal = journal;
            return Err(err);
        }
        Ok(())
    }

    /// Removes every group and forgets every pending change.
    pub fn clear(&mut self) {
        self.journal.clear();
        self.model.clear();
    }

    /// Reorders the groups; pending changes travel with their groups.
    pub fn sort_groups_by<F>(&mut self, compare: F)
    where
        F: FnMut(&G, &G) -> std::cmp::Ordering,
    {
        self.model.sort_groups_by(compare);
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn require_identity(&self, index: usize) -> Result<GroupIdentity<K>> {
        self.group_identity(index).ok_or(RowGroupError::GroupOutOfBounds {
            group: index,
            group_count: self.model.group_count(),
        })
    }

    fn key_at_position(&self, position: RowPosition) -> Result<RowKey<K>> {
        Ok(RowKey {
            group: self.require_identity(position.group())?,
            detail: position.detail(),
        })
    }

    fn lead_key_of_row(&self, row: usize) -> Option<RowKey<K>> {
        let position = self.model.locate(row)?;
        self.group_identity(position.group()).map(RowKey::lead)
    }

    /// Copies every changed cell of the group at `index` onto `target`.
    fn carry_edits(&self, index: usize, identity: &GroupIdentity<K>, target: &mut G) -> Result<()> {
        let source = self.model.group(index).ok_or(RowGroupError::GroupNotFound)?;
        let target_details = self.model.detail_count_of(target);

        for key in self.journal.changed_row_identities() {
            if key.group != *identity || key.detail.is_some_and(|d| d >= target_details) {
                continue;
            }
            for column in self.journal.changed_columns_for(&key) {
                let carried = self
                    .model
                    .read_cell(source, key.detail, column)
                    .and_then(|value| self.model.write_cell(target, key.detail, column, value));
                if let Err(err) = carried {
                    tracing::warn!(
                        target: targets::JOURNAL,
                        index,
                        detail = ?key.detail,
                        column,
                        error = %err,
                        "could not carry edit over to the replacement group"
                    );
                }
            }
        }
        Ok(())
    }
}

/// Journal identity of the group at `index` under `policy`.
fn identity_at<G, R, K>(model: &GroupedRowModel<G, R, K>, policy: IdentityPolicy, index: usize) -> Option<GroupIdentity<K>>
where
    K: Eq + Hash + Clone + Debug,
{
    let id = model.group_id_at(index)?;
    Some(match (policy, model.key_at(index)) {
        (IdentityPolicy::Equality, Some(key)) => GroupIdentity::Key(key.clone()),
        _ => GroupIdentity::Instance(id),
    })
}

fn identity_of<G, R, K>(model: &GroupedRowModel<G, R, K>, policy: IdentityPolicy, id: GroupId) -> GroupIdentity<K>
where
    K: Eq + Hash + Clone + Debug,
{
    model
        .index_of_group(id)
        .and_then(|index| identity_at(model, policy, index))
        .unwrap_or(GroupIdentity::Instance(id))
}

/// Moves the entries of `from` over to `to`, dropping sub-rows at or past
/// `detail_count`.
fn migrate_group<K>(
    journal: &mut ChangeJournal<RowKey<K>>,
    from: &GroupIdentity<K>,
    to: &GroupIdentity<K>,
    detail_count: usize,
) where
    K: Eq + Hash + Clone + Debug,
{
    journal.rekey_with(|row| {
        if row.group != *from {
            return Some(row);
        }
        match row.detail {
            Some(d) if d >= detail_count => None,
            detail => Some(RowKey {
                group: to.clone(),
                detail,
            }),
        }
    });
}

fn purge_group<K>(journal: &mut ChangeJournal<RowKey<K>>, identity: &GroupIdentity<K>)
where
    K: Eq + Hash + Clone + Debug,
{
    journal.rekey_with(|row| (row.group != *identity).then_some(row));
}

/// Applies journal outcomes to the model.
struct ModelSync<'a, G, R, K> {
    model: &'a mut GroupedRowModel<G, R, K>,
}

impl<G, R, K> ModelSync<'_, G, R, K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn group_index(&self, identity: &GroupIdentity<K>) -> Option<usize> {
        match identity {
            GroupIdentity::Key(key) => self.model.index_of_key(key),
            GroupIdentity::Instance(id) => self.model.index_of_group(*id),
        }
    }
}

impl<G, R, K> JournalCallbacks<RowKey<K>> for ModelSync<'_, G, R, K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn item_deleted(&mut self, row: &RowKey<K>) {
        let Some(index) = self.group_index(&row.group) else {
            return;
        };
        if let Err(err) = self.model.remove_group_at(index) {
            tracing::warn!(target: targets::JOURNAL, index, error = %err, "could not remove group");
        }
    }

    fn item_updated(&mut self, row: &RowKey<K>) {
        let Some(index) = self.group_index(&row.group) else {
            return;
        };
        let range = match row.detail {
            None => self.model.rows_of_group(index),
            Some(d) => self.model.flat_row_of(index, Some(d)).map(|r| (r, r)),
        };
        if let Some(range) = range {
            self.model.signals().rows_updated.emit(range);
        }
    }

    fn restore_value(&mut self, row: &RowKey<K>, column: usize, value: &CellValue) -> bool {
        let Some(group) = self.group_index(&row.group) else {
            return true;
        };
        let position = match row.detail {
            None => RowPosition::Lead { group },
            Some(detail) => RowPosition::Detail { group, detail },
        };
        match self.model.write_cell_at(position, column, value.clone()) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target: targets::JOURNAL, ?position, column, error = %err, "could not restore original value");
                false
            }
        }
    }
}

impl<G, R, K> FlatTableModel for BufferedGroupedRowModel<G, R, K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn row_count(&self) -> usize {
        self.model.row_count()
    }

    fn column_count(&self) -> usize {
        self.model.column_count()
    }

    fn value_at(&self, row: usize, column: usize) -> CellValue {
        self.model.value_at(row, column)
    }

    /// Writes a cell and records the edit.
    ///
    /// Cells of a group marked for deletion are read-only.
    fn set_value_at(&mut self, row: usize, column: usize, value: CellValue) -> Result<()> {
        let position = self.model.locate_checked(row, column)?;
        let index = position.group();
        let before = self.require_identity(index)?;
        if self.journal.is_pending_delete(&RowKey::lead(before.clone())) {
            return Err(RowGroupError::InvalidOperation(format!(
                "row {row} belongs to a group marked for deletion"
            )));
        }

        // A pre-image that cannot be read could not be restored later.
        let old = self.model.cell_value(row, column)?;
        self.model.write_cell_at(position, column, value)?;
        let new = self.model.value_at(row, column);

        let after = self.require_identity(index)?;
        if after != before {
            // The group just got its key.
            migrate_group(&mut self.journal, &before, &after, usize::MAX);
        }
        if !self.journal.is_pending_add(&RowKey::lead(after.clone())) {
            let key = RowKey {
                group: after,
                detail: position.detail(),
            };
            self.journal.record_cell_change(&key, column, old, &new);
        }

        tracing::trace!(target: targets::MODEL, row, column, "buffered cell written");
        self.model.signals().emit_row_updated(row);
        Ok(())
    }

    fn is_cell_editable(&self, row: usize, column: usize) -> bool {
        !self.is_pending_delete(row) && self.model.is_cell_editable(row, column)
    }

    fn is_section_or_header_row(&self, row: usize) -> bool {
        self.model.is_section_or_header_row(row)
    }

    fn group_number(&self, row: usize) -> Option<usize> {
        self.model.group_number(row)
    }

    fn lead_row_of_group(&self, group: usize) -> Option<usize> {
        self.model.lead_row_of_group(group)
    }

    fn signals(&self) -> &RowSignals {
        self.model.signals()
    }

    fn column_name(&self, column: usize) -> Option<String> {
        self.model.column_name(column)
    }
}

impl<G, R, K> std::fmt::Debug for BufferedGroupedRowModel<G, R, K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedGroupedRowModel")
            .field("model", &self.model)
            .field("journal", &self.journal)
            .field("policy", &self.policy)
            .finish()
    }
}
