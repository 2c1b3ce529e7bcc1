//! Signal/slot system for Horizon Rowgroup.
//!
//! This module provides a type-safe, Qt-inspired signal/slot mechanism used by
//! the table models to announce row-range changes to whatever presentation
//! layer is listening.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - a list of slots invoked on every emission
//! - [`ConnectionId`] - handle for disconnecting one slot
//! - [`ConnectionGuard`] - disconnects its slot on drop
//!
//! # Single-Actor Dispatch
//!
//! Models live on one logical actor (typically the UI thread). Every slot is
//! invoked synchronously, in connection order, before [`Signal::emit`]
//! returns. There is no queued delivery and no cross-thread marshalling; a
//! `Signal` is neither `Send` nor `Sync`.
//!
//! Slots may freely connect or disconnect other slots on the same signal while
//! being invoked. The set of slots for one emission is fixed when the emission
//! starts.
//!
//! # Example
//!
//! ```
//! use horizon_rowgroup_core::Signal;
//!
//! let rows_inserted = Signal::<(usize, usize)>::new();
//! let slot = rows_inserted.connect(|(first, last)| {
//!     println!("rows {first}..={last} inserted");
//! });
//!
//! rows_inserted.emit((4, 6));
//! assert!(rows_inserted.disconnect(slot));
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle of one connected slot, accepted by [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Rc<dyn Fn(&Args)>;
/// Slots tagged with their connection sequence number. Freed keys are reused,
/// so key order says nothing about connection order.
type Connections<Args> = RefCell<SlotMap<ConnectionId, (u64, Slot<Args>)>>;

/// A notification with any number of connected slots.
///
/// Slots receive a reference to the emitted `Args`. Row-range notifications
/// use `(first_row, last_row)`, whole-model notifications use `()`.
pub struct Signal<Args> {
    /// All active connections. Shared with [`ConnectionGuard`]s through a weak handle.
    connections: Rc<Connections<Args>>,
    /// Sequence number handed to the next connection.
    next_seq: Cell<u64>,
    /// Set while emissions are suppressed.
    blocked: Cell<bool>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// An unconnected signal.
    pub fn new() -> Self {
        Self {
            connections: Rc::new(RefCell::new(SlotMap::with_key())),
            next_seq: Cell::new(0),
            blocked: Cell::new(false),
        }
    }

    /// Adds `slot` after every slot connected so far.
    ///
    /// ```
    /// use horizon_rowgroup_core::Signal;
    ///
    /// let model_reset = Signal::<()>::new();
    /// model_reset.connect(|_| println!("reload everything"));
    /// model_reset.emit(());
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + 'static,
    {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.connections.borrow_mut().insert((seq, Rc::new(slot)))
    }

    /// Like [`connect`](Self::connect), but the slot lives only as long as the
    /// returned guard. The guard may outlive the signal.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            connections: Rc::downgrade(&self.connections),
            id,
        }
    }

    /// Removes one slot. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.borrow_mut().remove(id).is_some()
    }

    /// Removes every slot.
    pub fn disconnect_all(&self) {
        let mut connections = self.connections.borrow_mut();
        let dropped = connections.len();
        connections.clear();
        crate::rowgroup_trace!(dropped, "disconnected all slots");
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.borrow().len()
    }

    /// Suppresses (or resumes) emissions. Emissions while blocked are lost,
    /// not queued.
    pub fn set_blocked(&self, blocked: bool) {
        if self.blocked.replace(blocked) != blocked {
            crate::rowgroup_debug!(blocked, "signal blocking changed");
        }
    }

    /// Returns `true` while emissions are suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.get()
    }

    /// Invokes every slot, in connection order, unless the signal is blocked.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        // Snapshot so slots can reconnect without re-borrowing the table.
        let mut slots: Vec<(u64, Slot<Args>)> =
            self.connections.borrow().values().cloned().collect();
        slots.sort_unstable_by_key(|(seq, _)| *seq);
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        for (_, slot) in slots {
            slot(&args);
        }
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connections.borrow().len())
            .field("blocked", &self.blocked.get())
            .finish()
    }
}

static_assertions::assert_not_impl_any!(Signal<()>: Send, Sync);

/// Disconnects its slot when dropped. See [`Signal::connect_scoped`].
///
/// ```
/// use horizon_rowgroup_core::Signal;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let rows_updated = Signal::<(usize, usize)>::new();
/// let repaints = Rc::new(Cell::new(0));
/// {
///     let repaints = repaints.clone();
///     let _view = rows_updated.connect_scoped(move |&(first, last)| {
///         repaints.set(repaints.get() + last - first + 1);
///     });
///     rows_updated.emit((2, 4));
/// }
/// rows_updated.emit((0, 9));
/// assert_eq!(repaints.get(), 3);
/// ```
pub struct ConnectionGuard<Args> {
    connections: Weak<Connections<Args>>,
    id: ConnectionId,
}

impl<Args> ConnectionGuard<Args> {
    /// The ID of the guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(connections) = self.connections.upgrade() {
            connections.borrow_mut().remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = received.clone();
        signal.connect(move |&value| {
            sink.lock().push(value);
        });

        signal.emit(42);
        signal.emit(100);

        let values = received.lock();
        assert_eq!(*values, vec![42, 100]);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = received.clone();
        let conn_id = signal.connect(move |&value| {
            sink.lock().push(value);
        });

        signal.emit(1);
        assert!(signal.disconnect(conn_id));
        assert!(!signal.disconnect(conn_id));
        signal.emit(2);

        let values = received.lock();
        assert_eq!(*values, vec![1]);
    }

    #[test]
    fn test_signal_blocked() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = received.clone();
        signal.connect(move |&value| {
            sink.lock().push(value);
        });

        signal.emit(1);
        signal.set_blocked(true);
        signal.emit(2);
        signal.set_blocked(false);
        signal.emit(3);

        let values = received.lock();
        assert_eq!(*values, vec![1, 3]);
    }

    #[test]
    fn test_slots_run_in_connection_order() {
        let signal = Signal::<(usize, usize)>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let order = order.clone();
            signal.connect(move |&(first, last)| {
                order.lock().push((tag, first, last));
            });
        }

        signal.emit((3, 5));
        assert_eq!(*order.lock(), vec![("a", 3, 5), ("b", 3, 5), ("c", 3, 5)]);
    }

    #[test]
    fn test_reconnect_after_disconnect_runs_last() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut ids = Vec::new();
        for tag in ["a", "b", "c"] {
            let order = order.clone();
            ids.push(signal.connect(move |_| order.lock().push(tag)));
        }
        assert!(signal.disconnect(ids[0]));

        // "d" lands in the key freed by "a" but was connected last.
        let sink = order.clone();
        signal.connect(move |_| sink.lock().push("d"));

        signal.emit(());
        assert_eq!(*order.lock(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_disconnect_all() {
        let signal = Signal::<()>::new();

        signal.connect(|_| {});
        signal.connect(|_| {});
        assert_eq!(signal.connection_count(), 2);

        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_connection_guard() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        {
            let sink = received.clone();
            let _guard = signal.connect_scoped(move |&value| {
                sink.lock().push(value);
            });
            signal.emit(1);
            assert_eq!(signal.connection_count(), 1);
        }

        signal.emit(2);
        assert_eq!(signal.connection_count(), 0);
        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn test_guard_outlives_signal() {
        let signal = Signal::<i32>::new();
        let guard = signal.connect_scoped(|_| {});
        drop(signal);
        drop(guard);
    }

    #[test]
    fn test_slot_may_connect_during_emit() {
        let signal = Rc::new(Signal::<i32>::new());
        let received = Arc::new(Mutex::new(Vec::new()));

        let weak = Rc::downgrade(&signal);
        let sink = received.clone();
        signal.connect(move |&value| {
            sink.lock().push(value);
            if let Some(signal) = weak.upgrade() {
                let inner = sink.clone();
                signal.connect(move |&v| inner.lock().push(v * 10));
            }
        });

        signal.emit(1);
        // The slot added during the first emission only sees later emissions.
        assert_eq!(*received.lock(), vec![1]);

        signal.emit(2);
        assert_eq!(*received.lock(), vec![1, 2, 20]);
    }
}
