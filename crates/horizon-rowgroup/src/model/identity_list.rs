//! A list that also answers "where is this item?" in constant time.
//!
//! [`IdentityIndexedList`] stores items in order and keeps two maps in step
//! with that order:
//!
//! - extracted key → position, for items whose key is present;
//! - [`GroupId`] → position, for every item. A `GroupId` is handed out on
//!   insertion and stands for the item's instance identity, so several items
//!   whose key is still absent can coexist and be found again.
//!
//! The maps store positions, not deltas, so every insertion or removal
//! rewrites the entries at and after the mutation point.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use horizon_rowgroup_core::logging::targets;
use horizon_rowgroup_core::{Result, RowGroupError};

/// Instance identity of an item in an [`IdentityIndexedList`].
///
/// Assigned on insertion and never reused by the same list. Replacing an item
/// with [`set`](IdentityIndexedList::set) gives the new item a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl GroupId {
    /// The raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type alias for a key extraction function.
///
/// Returns `None` while the item has no key yet.
pub type KeyFn<T, K> = Rc<dyn Fn(&T) -> Option<K>>;

struct Entry<T, K> {
    id: GroupId,
    /// The key the item is indexed under; `None` while absent.
    key: Option<K>,
    value: T,
}

/// An ordered list with O(1) lookup by key and by instance identity.
///
/// # Example
///
/// ```
/// use horizon_rowgroup::model::IdentityIndexedList;
///
/// let mut list = IdentityIndexedList::new(|s: &(u32, &str)| Some(s.0));
/// list.push((7, "seven")).unwrap();
/// list.insert(0, (3, "three")).unwrap();
///
/// assert_eq!(list.index_of_key(&7), Some(1));
/// assert!(list.push((3, "again")).is_err());
/// ```
pub struct IdentityIndexedList<T, K> {
    entries: Vec<Entry<T, K>>,
    by_key: HashMap<K, usize>,
    by_identity: HashMap<GroupId, usize>,
    key_fn: KeyFn<T, K>,
    next_id: u64,
}

impl<T, K> IdentityIndexedList<T, K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Creates an empty list with the given key extractor.
    pub fn new<F>(key_fn: F) -> Self
    where
        F: Fn(&T) -> Option<K> + 'static,
    {
        Self::with_key_fn(Rc::new(key_fn))
    }

    /// Creates an empty list sharing an existing key extractor.
    pub fn with_key_fn(key_fn: KeyFn<T, K>) -> Self {
        Self {
            entries: Vec::new(),
            by_key: HashMap::new(),
            by_identity: HashMap::new(),
            key_fn,
            next_id: 0,
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the list holds no items.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The key extractor.
    pub fn key_fn(&self) -> &KeyFn<T, K> {
        &self.key_fn
    }

    /// Extracts the current key of `item` (not necessarily the indexed one).
    pub fn key_of(&self, item: &T) -> Option<K> {
        (self.key_fn)(item)
    }

    /// Appends an item.
    pub fn push(&mut self, item: T) -> Result<GroupId> {
        self.insert(self.entries.len(), item)
    }

    /// Inserts an item at `index`, shifting later items up.
    ///
    /// Fails with [`RowGroupError::DuplicateKey`] if another item is already
    /// indexed under the same key; nothing is changed in that case.
    pub fn insert(&mut self, index: usize, item: T) -> Result<GroupId> {
        if index > self.entries.len() {
            return Err(RowGroupError::GroupOutOfBounds {
                group: index,
                group_count: self.entries.len(),
            });
        }
        let key = (self.key_fn)(&item);
        if let Some(key) = &key {
            if self.by_key.contains_key(key) {
                return Err(RowGroupError::DuplicateKey(format!("{key:?}")));
            }
        }

        let id = self.allocate_id();
        self.entries.insert(index, Entry { id, key, value: item });
        self.reindex_from(index);
        tracing::trace!(target: targets::INDEX, %id, index, "inserted item");
        Ok(id)
    }

    /// Removes and returns the item at `index`, shifting later items down.
    pub fn remove(&mut self, index: usize) -> Result<T> {
        if index >= self.entries.len() {
            return Err(RowGroupError::GroupOutOfBounds {
                group: index,
                group_count: self.entries.len(),
            });
        }
        let entry = self.entries.remove(index);
        self.by_identity.remove(&entry.id);
        if let Some(key) = &entry.key {
            self.by_key.remove(key);
        }
        self.reindex_from(index);
        tracing::trace!(target: targets::INDEX, id = %entry.id, index, "removed item");
        Ok(entry.value)
    }

    /// Replaces the item at `index`.
    ///
    /// The new item gets a fresh [`GroupId`]. Its key may equal the key of the
    /// item it replaces but must not collide with any other item.
    ///
    /// Returns the new id and the replaced item.
    pub fn set(&mut self, index: usize, item: T) -> Result<(GroupId, T)> {
        let Some(old) = self.entries.get(index) else {
            return Err(RowGroupError::GroupOutOfBounds {
                group: index,
                group_count: self.entries.len(),
            });
        };
        let key = (self.key_fn)(&item);
        if let Some(key) = &key {
            if self.by_key.get(key).is_some_and(|&at| at != index) {
                return Err(RowGroupError::DuplicateKey(format!("{key:?}")));
            }
        }

        let old_id = old.id;
        if let Some(old_key) = &old.key {
            self.by_key.remove(old_key);
        }
        self.by_identity.remove(&old_id);

        let id = self.allocate_id();
        let old = std::mem::replace(&mut self.entries[index], Entry { id, key, value: item });
        self.reindex_from(index);
        tracing::trace!(target: targets::INDEX, %old_id, %id, index, "replaced item");
        Ok((id, old.value))
    }

    /// Replaces every item at once.
    ///
    /// All items get fresh ids. On a duplicate key the list is left untouched.
    pub fn replace_all(&mut self, items: Vec<T>) -> Result<()> {
        let mut by_key = HashMap::with_capacity(items.len());
        let mut keys = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let key = (self.key_fn)(item);
            if let Some(key) = &key {
                if by_key.insert(key.clone(), index).is_some() {
                    return Err(RowGroupError::DuplicateKey(format!("{key:?}")));
                }
            }
            keys.push(key);
        }

        self.entries.clear();
        self.by_identity.clear();
        self.by_key = by_key;
        for (value, key) in items.into_iter().zip(keys) {
            let id = self.allocate_id();
            self.by_identity.insert(id, self.entries.len());
            self.entries.push(Entry { id, key, value });
        }
        Ok(())
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_key.clear();
        self.by_identity.clear();
    }

    /// Reorders the items; ids and keys travel with their items.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.entries.sort_by(|a, b| compare(&a.value, &b.value));
        self.reindex_from(0);
    }

    /// The item at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index).map(|e| &e.value)
    }

    /// Mutates the item at `index`, then refreshes its key.
    ///
    /// If the refresh fails (the key changed, or a newly assigned key
    /// collides) the mutation stays applied but the item remains indexed under
    /// its previous key, and the error is returned.
    pub fn modify<F, R>(&mut self, index: usize, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let group_count = self.entries.len();
        let Some(entry) = self.entries.get_mut(index) else {
            return Err(RowGroupError::GroupOutOfBounds {
                group: index,
                group_count,
            });
        };
        let result = f(&mut entry.value);
        self.refresh_key(index)?;
        Ok(result)
    }

    /// Mutable access without key bookkeeping.
    ///
    /// Callers that may touch the key must follow up with
    /// [`refresh_key`](Self::refresh_key).
    pub(crate) fn get_mut_unchecked(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index).map(|e| &mut e.value)
    }

    /// Re-reads the key of the item at `index`.
    ///
    /// An absent key that has become present is indexed now. A present key
    /// that changed is rejected with [`RowGroupError::KeyChanged`].
    ///
    /// Returns `true` if the item became keyed by this call.
    pub fn refresh_key(&mut self, index: usize) -> Result<bool> {
        let Some(entry) = self.entries.get(index) else {
            return Err(RowGroupError::GroupOutOfBounds {
                group: index,
                group_count: self.entries.len(),
            });
        };
        let id = entry.id;
        let indexed = entry.key.clone();
        let current = (self.key_fn)(&entry.value);
        match (indexed, current) {
            (None, None) => Ok(false),
            (Some(old), Some(new)) if old == new => Ok(false),
            (None, Some(new)) => {
                if self.by_key.contains_key(&new) {
                    return Err(RowGroupError::DuplicateKey(format!("{new:?}")));
                }
                tracing::trace!(target: targets::INDEX, %id, key = ?new, "absent key assigned");
                self.by_key.insert(new.clone(), index);
                self.entries[index].key = Some(new);
                Ok(true)
            }
            (Some(old), new) => {
                tracing::warn!(target: targets::INDEX, %id, ?old, ?new, "rejected key change");
                Err(RowGroupError::KeyChanged {
                    old: format!("{old:?}"),
                    new: new.map_or_else(|| "none".to_owned(), |new| format!("{new:?}")),
                })
            }
        }
    }

    /// The instance id of the item at `index`.
    pub fn id_at(&self, index: usize) -> Option<GroupId> {
        self.entries.get(index).map(|e| e.id)
    }

    /// The key the item at `index` is indexed under.
    pub fn key_at(&self, index: usize) -> Option<&K> {
        self.entries.get(index).and_then(|e| e.key.as_ref())
    }

    /// Position of the item indexed under `key`.
    pub fn index_of_key(&self, key: &K) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    /// Position of the item with instance id `id`.
    pub fn index_of_id(&self, id: GroupId) -> Option<usize> {
        self.by_identity.get(&id).copied()
    }

    /// Position of `item`.
    ///
    /// Keyed items are found by key in constant time. Items whose key is
    /// absent can only be found by identity, so `item` must then be a
    /// reference into this list, and the lookup scans the list. Hold on to
    /// the [`GroupId`] and use [`index_of_id`](Self::index_of_id) for a
    /// constant-time lookup of unkeyed items.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        match (self.key_fn)(item) {
            Some(key) => self.index_of_key(&key),
            None => self
                .entries
                .iter()
                .position(|e| e.key.is_none() && std::ptr::eq(&e.value, item)),
        }
    }

    /// Returns `true` if an item is indexed under `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// Iterates over the items in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|e| &e.value)
    }

    /// Iterates over `(id, item)` pairs in order.
    pub fn iter_with_ids(&self) -> impl Iterator<Item = (GroupId, &T)> + '_ {
        self.entries.iter().map(|e| (e.id, &e.value))
    }

    fn allocate_id(&mut self) -> GroupId {
        let id = GroupId(self.next_id);
        self.next_id += 1;
        id
    }

    fn reindex_from(&mut self, index: usize) {
        for (position, entry) in self.entries.iter().enumerate().skip(index) {
            self.by_identity.insert(entry.id, position);
            if let Some(key) = &entry.key {
                self.by_key.insert(key.clone(), position);
            }
        }
    }
}

impl<T, K> std::fmt::Debug for IdentityIndexedList<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityIndexedList")
            .field("len", &self.entries.len())
            .field("keyed", &self.by_key.len())
            .finish()
    }
}
