//! Per-object mutation history.
//!
//! # Overview
//!
//! A [`HistoryStore`] maps each tracked object to its [`HistoryLog`], an
//! ordered list of [`HistoryRecord`]s. The store never holds a strong
//! reference to a tracked object: logs are keyed by [`ObjectId`], and on the
//! first append the store leaves a drop hook on the object that removes the
//! log once the object is gone. The hook only holds a `Weak` to the store, so
//! neither side keeps the other alive.
//!
//! Every thread has one shared store ([`HistoryStore::shared`]); independent
//! stores can be created with [`HistoryStore::new`].

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::trace;

use crate::descriptor::PropertyDescriptor;
use crate::key::PropertyKey;
use crate::object::{ObjectId, ObjectRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Add,
    Remove,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Add => "add",
            RecordKind::Remove => "remove",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryRecord {
    /// A property went from absent to present. `value` is the value that was
    /// written; undo does not need it.
    Add { key: PropertyKey, value: Value },
    /// A property was deleted. `descriptor` is its state right before the
    /// deletion.
    Remove {
        key: PropertyKey,
        descriptor: PropertyDescriptor,
    },
}

impl HistoryRecord {
    pub fn key(&self) -> &PropertyKey {
        match self {
            HistoryRecord::Add { key, .. } | HistoryRecord::Remove { key, .. } => key,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            HistoryRecord::Add { .. } => RecordKind::Add,
            HistoryRecord::Remove { .. } => RecordKind::Remove,
        }
    }
}

/// Records of one object, oldest first.
pub type HistoryLog = Vec<HistoryRecord>;

pub struct HistoryStore {
    logs: RefCell<HashMap<ObjectId, HistoryLog>>,
    this: Weak<HistoryStore>,
}

thread_local! {
    static SHARED: Rc<HistoryStore> = HistoryStore::new();
}

impl HistoryStore {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|this| HistoryStore {
            logs: RefCell::new(HashMap::new()),
            this: this.clone(),
        })
    }

    /// The store used by [`create_history_object`](crate::create_history_object)
    /// on the current thread.
    pub fn shared() -> Rc<Self> {
        SHARED.with(Rc::clone)
    }

    /// Appends `record` to the log of `target`, creating the log on first use.
    pub fn append(&self, target: &ObjectRef, record: HistoryRecord) {
        trace!(
            object = target.id().as_u64(),
            key = %record.key(),
            kind = %record.kind(),
            "history record appended"
        );
        let created = match self.logs.borrow_mut().entry(target.id()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().push(record);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(vec![record]);
                true
            }
        };
        if created {
            let store = self.this.clone();
            target.on_drop(move |id| {
                if let Some(store) = store.upgrade() {
                    store.forget(id);
                }
            });
        }
    }

    /// Snapshot of the log of `target`; empty if nothing was recorded.
    pub fn log_of(&self, target: &ObjectRef) -> HistoryLog {
        self.logs
            .borrow()
            .get(&target.id())
            .cloned()
            .unwrap_or_default()
    }

    pub fn len_of(&self, target: &ObjectRef) -> usize {
        self.logs.borrow().get(&target.id()).map_or(0, Vec::len)
    }

    /// Whether a log exists for `target`. A log emptied by undo still exists
    /// until the object is dropped.
    pub fn is_tracking(&self, target: &ObjectRef) -> bool {
        self.logs.borrow().contains_key(&target.id())
    }

    /// Number of objects with a log.
    pub fn len(&self) -> usize {
        self.logs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.borrow().is_empty()
    }

    /// Removes the most recent record of `target`.
    pub(crate) fn pop(&self, target: &ObjectRef) -> Option<HistoryRecord> {
        self.logs.borrow_mut().get_mut(&target.id())?.pop()
    }

    fn forget(&self, id: ObjectId) {
        // Records may own the last handle to another tracked object, so they
        // are dropped after the borrow ends.
        let removed = self.logs.borrow_mut().remove(&id);
        if let Some(log) = removed {
            trace!(object = id.as_u64(), records = log.len(), "history log reclaimed");
        }
    }
}

impl fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("HistoryStore");
        if let Ok(logs) = self.logs.try_borrow() {
            out.field("logs", &logs.len());
        }
        out.finish()
    }
}
