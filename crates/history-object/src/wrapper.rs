//! The tracking wrapper.

use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::descriptor::PropertyDescriptor;
use crate::error::HistoryError;
use crate::key::PropertyKey;
use crate::object::ObjectRef;
use crate::store::{HistoryLog, HistoryRecord, HistoryStore};

/// How many records an undo call reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoCount {
    Steps(usize),
    All,
}

impl Default for UndoCount {
    fn default() -> Self {
        UndoCount::Steps(1)
    }
}

impl From<usize> for UndoCount {
    fn from(steps: usize) -> Self {
        UndoCount::Steps(steps)
    }
}

impl From<Option<usize>> for UndoCount {
    /// `None` means "everything".
    fn from(steps: Option<usize>) -> Self {
        steps.map_or(UndoCount::All, UndoCount::Steps)
    }
}

/// Values that can become the target of a [`HistoryObject`].
pub trait IntoTarget {
    fn into_target(self) -> Result<ObjectRef, HistoryError>;
}

impl IntoTarget for ObjectRef {
    fn into_target(self) -> Result<ObjectRef, HistoryError> {
        Ok(self)
    }
}

impl IntoTarget for &ObjectRef {
    fn into_target(self) -> Result<ObjectRef, HistoryError> {
        Ok(self.clone())
    }
}

impl IntoTarget for Value {
    fn into_target(self) -> Result<ObjectRef, HistoryError> {
        ObjectRef::from_json(self)
    }
}

/// Wraps `value` in a [`HistoryObject`] recording into the thread's shared
/// store.
///
/// # Errors
///
/// Returns [`HistoryError::NotAnObject`] when `value` is JSON that is not an
/// object or array.
///
/// # Example
///
/// ```
/// use history_object::create_history_object;
/// use serde_json::json;
///
/// let obj = create_history_object(json!({"a": 1})).unwrap();
/// obj.set("b", 2);
/// obj.delete("a");
/// assert_eq!(obj.to_json(), json!({"b": 2}));
///
/// obj.undo_all();
/// assert_eq!(obj.to_json(), json!({"a": 1}));
///
/// assert!(create_history_object(json!(null)).is_err());
/// ```
pub fn create_history_object(value: impl IntoTarget) -> Result<HistoryObject, HistoryError> {
    Ok(HistoryObject::new(value.into_target()?))
}

/// Tracks property additions and removals on an [`ObjectRef`].
///
/// Reads and introspection are forwarded to the target unchanged. Only
/// mutations made through [`set`](Self::set), [`try_set`](Self::try_set) and
/// [`delete`](Self::delete) are recorded; writes made on the target directly,
/// or through [`define_property`](Self::define_property), bypass the history.
///
/// The log belongs to the target, not to the wrapper: wrappers over the same
/// target in the same store share it.
#[derive(Debug, Clone)]
pub struct HistoryObject {
    target: ObjectRef,
    store: Rc<HistoryStore>,
}

impl HistoryObject {
    /// Wraps `target`, recording into [`HistoryStore::shared`].
    pub fn new(target: ObjectRef) -> Self {
        Self::with_store(target, HistoryStore::shared())
    }

    pub fn with_store(target: ObjectRef, store: Rc<HistoryStore>) -> Self {
        Self { target, store }
    }

    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    pub fn store(&self) -> &Rc<HistoryStore> {
        &self.store
    }

    // ──────────────────────────────────────────────────────────────────────
    // Forwarded reads
    // ──────────────────────────────────────────────────────────────────────

    pub fn get(&self, key: impl Into<PropertyKey>) -> Option<Value> {
        self.target.get(&key.into())
    }

    pub fn has(&self, key: impl Into<PropertyKey>) -> bool {
        self.target.has(&key.into())
    }

    pub fn has_own(&self, key: impl Into<PropertyKey>) -> bool {
        self.target.has_own(&key.into())
    }

    pub fn get_own_property(&self, key: impl Into<PropertyKey>) -> Option<PropertyDescriptor> {
        self.target.get_own_property(&key.into())
    }

    pub fn own_keys(&self) -> Vec<PropertyKey> {
        self.target.own_keys()
    }

    pub fn keys(&self) -> Vec<String> {
        self.target.keys()
    }

    pub fn prototype(&self) -> Option<ObjectRef> {
        self.target.prototype()
    }

    pub fn to_json(&self) -> Value {
        self.target.to_json()
    }

    // ──────────────────────────────────────────────────────────────────────
    // Tracked mutations
    // ──────────────────────────────────────────────────────────────────────

    /// Assigns `key`. If the key is absent from the target and its
    /// prototype chain, an add record is appended before the write, whether
    /// or not the write then succeeds.
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        if !self.target.has(&key) {
            self.store.append(
                &self.target,
                HistoryRecord::Add {
                    key: key.clone(),
                    value: value.clone(),
                },
            );
        }
        self.target.set(key, value)
    }

    /// Like [`set`](Self::set), but a refused write is an error.
    pub fn try_set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Result<(), HistoryError> {
        let key = key.into();
        if self.set(key.clone(), value) {
            Ok(())
        } else {
            Err(HistoryError::ReadOnly { key })
        }
    }

    /// Deletes `key`, returning whether it was removed.
    ///
    /// Absent keys return `false`. A successful deletion of an own property
    /// appends a remove record holding its descriptor. A key that is only
    /// inherited reports success but leaves nothing to restore, so nothing is
    /// recorded.
    pub fn delete(&self, key: impl Into<PropertyKey>) -> bool {
        let key = key.into();
        if !self.target.has(&key) {
            return false;
        }
        let descriptor = self.target.get_own_property(&key);
        let deleted = self.target.delete(&key);
        if deleted {
            if let Some(descriptor) = descriptor {
                self.store
                    .append(&self.target, HistoryRecord::Remove { key, descriptor });
            }
        }
        deleted
    }

    /// Forwarded to the target without recording anything.
    pub fn define_property(&self, key: impl Into<PropertyKey>, descriptor: PropertyDescriptor) -> bool {
        self.target.define_property(key.into(), descriptor)
    }

    // ──────────────────────────────────────────────────────────────────────
    // History
    // ──────────────────────────────────────────────────────────────────────

    /// Snapshot of the target's log, oldest first.
    pub fn history(&self) -> HistoryLog {
        self.store.log_of(&self.target)
    }

    /// Reverts the most recent record.
    pub fn undo(&self) {
        self.undo_by(UndoCount::default());
    }

    /// Reverts up to `steps` records.
    pub fn undo_n(&self, steps: usize) {
        self.undo_by(UndoCount::Steps(steps));
    }

    pub fn undo_all(&self) {
        self.undo_by(UndoCount::All);
    }

    /// Reverts up to `count` records, newest first. Asking for more records
    /// than the log holds reverts the whole log; `UndoCount::All` always
    /// does.
    ///
    /// An add is reverted by deleting the key, a remove by redefining the key
    /// from its saved descriptor. If the target was changed behind the
    /// wrapper's back and refuses a step, the step is dropped and undo moves
    /// on.
    pub fn undo_by(&self, count: UndoCount) {
        let len = self.store.len_of(&self.target);
        if len == 0 {
            return;
        }
        let steps = match count {
            UndoCount::All => len,
            UndoCount::Steps(n) => n.min(len),
        };
        for _ in 0..steps {
            let Some(record) = self.store.pop(&self.target) else {
                break;
            };
            debug!(
                object = self.target.id().as_u64(),
                key = %record.key(),
                kind = %record.kind(),
                "undo"
            );
            match record {
                HistoryRecord::Add { key, .. } => {
                    if !self.target.delete(&key) {
                        debug!(key = %key, "undo: added property is no longer deletable");
                    }
                }
                HistoryRecord::Remove { key, descriptor } => {
                    if !self.target.define_property(key.clone(), descriptor) {
                        debug!(key = %key, "undo: removed property could not be restored");
                    }
                }
            }
        }
    }
}
