//! Dynamic objects with ordinary property semantics.
//!
//! # Overview
//!
//! An [`ObjectRef`] is a shared handle to a mutable bag of properties with an
//! optional prototype. Reads consult the prototype chain, writes either update
//! an own property or create one, and every property carries a complete
//! [`PropertyDescriptor`].
//!
//! Handles are `Rc`-based: cloning an `ObjectRef` does not copy the object,
//! and two handles compare identical through [`ObjectRef::ptr_eq`] or
//! [`ObjectRef::id`]. Objects are single-threaded.
//!
//! No `RefCell` borrow is held while a getter, a setter or a drop hook runs,
//! so callbacks are free to access the object again.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::descriptor::{PropertyDescriptor, Slot};
use crate::error::{json_kind, HistoryError};
use crate::key::PropertyKey;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an object. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

type DropHook = Box<dyn FnOnce(ObjectId)>;

struct ObjectState {
    properties: IndexMap<PropertyKey, PropertyDescriptor>,
    prototype: Option<ObjectRef>,
    extensible: bool,
}

struct ObjectCell {
    id: ObjectId,
    state: RefCell<ObjectState>,
    drop_hooks: RefCell<Vec<DropHook>>,
}

impl Drop for ObjectCell {
    fn drop(&mut self) {
        for hook in std::mem::take(self.drop_hooks.get_mut()) {
            hook(self.id);
        }
    }
}

/// Shared handle to an object.
#[derive(Clone)]
pub struct ObjectRef(Rc<ObjectCell>);

/// Non-owning handle to an object.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<ObjectCell>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    /// `true` once every [`ObjectRef`] to the object is gone.
    pub fn is_dropped(&self) -> bool {
        self.0.strong_count() == 0
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRef {
    // ──────────────────────────────────────────────────────────────────────
    // Constructors
    // ──────────────────────────────────────────────────────────────────────

    /// Creates an empty, extensible object without a prototype.
    pub fn new() -> Self {
        Self::with_prototype(None)
    }

    pub fn with_prototype(prototype: Option<&ObjectRef>) -> Self {
        ObjectRef(Rc::new(ObjectCell {
            id: ObjectId::next(),
            state: RefCell::new(ObjectState {
                properties: IndexMap::new(),
                prototype: prototype.cloned(),
                extensible: true,
            }),
            drop_hooks: RefCell::new(Vec::new()),
        }))
    }

    /// Builds an object from a JSON object or array.
    ///
    /// Object members become writable, enumerable, configurable data
    /// properties in document order. Array elements become properties keyed by
    /// their index. Nested values are stored as plain JSON and are not objects
    /// in their own right.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NotAnObject`] for `null`, booleans, numbers and
    /// strings.
    ///
    /// # Example
    ///
    /// ```
    /// use history_object::{ObjectRef, PropertyKey};
    /// use serde_json::json;
    ///
    /// let obj = ObjectRef::from_json(json!({"a": 1, "b": [true]})).unwrap();
    /// assert_eq!(obj.get(&PropertyKey::from("a")), Some(json!(1)));
    /// assert!(ObjectRef::from_json(json!(null)).is_err());
    /// ```
    pub fn from_json(value: Value) -> Result<Self, HistoryError> {
        let properties: IndexMap<PropertyKey, PropertyDescriptor> = match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (PropertyKey::String(k), PropertyDescriptor::data(v)))
                .collect(),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (PropertyKey::from(i), PropertyDescriptor::data(v)))
                .collect(),
            other => {
                return Err(HistoryError::NotAnObject {
                    found: json_kind(&other),
                })
            }
        };
        let object = ObjectRef::new();
        object.0.state.borrow_mut().properties = properties;
        Ok(object)
    }

    // ──────────────────────────────────────────────────────────────────────
    // Identity
    // ──────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }

    /// Registers a hook that runs once when the last handle is dropped.
    pub(crate) fn on_drop(&self, hook: impl FnOnce(ObjectId) + 'static) {
        self.0.drop_hooks.borrow_mut().push(Box::new(hook));
    }

    // ──────────────────────────────────────────────────────────────────────
    // Prototype and extensibility
    // ──────────────────────────────────────────────────────────────────────

    pub fn prototype(&self) -> Option<ObjectRef> {
        self.0.state.borrow().prototype.clone()
    }

    /// Replaces the prototype. Fails on non-extensible objects (unless the
    /// prototype is unchanged) and when the new chain would contain `self`.
    pub fn set_prototype(&self, prototype: Option<&ObjectRef>) -> bool {
        let unchanged = match (self.prototype(), prototype) {
            (None, None) => true,
            (Some(current), Some(next)) => current.ptr_eq(next),
            _ => false,
        };
        if unchanged {
            return true;
        }
        if !self.is_extensible() {
            return false;
        }
        let mut cursor = prototype.cloned();
        while let Some(obj) = cursor {
            if obj.ptr_eq(self) {
                return false;
            }
            cursor = obj.prototype();
        }
        let previous = std::mem::replace(&mut self.0.state.borrow_mut().prototype, prototype.cloned());
        drop(previous);
        true
    }

    pub fn is_extensible(&self) -> bool {
        self.0.state.borrow().extensible
    }

    /// Forbids adding new own properties. Existing ones can still change.
    pub fn prevent_extensions(&self) {
        self.0.state.borrow_mut().extensible = false;
    }

    // ──────────────────────────────────────────────────────────────────────
    // Introspection
    // ──────────────────────────────────────────────────────────────────────

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.0.state.borrow().properties.get(key).cloned()
    }

    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.0.state.borrow().properties.contains_key(key)
    }

    /// Own-or-inherited presence check.
    pub fn has(&self, key: &PropertyKey) -> bool {
        self.lookup(key).is_some()
    }

    /// All own keys: array indices ascending, then remaining strings in
    /// insertion order, then symbols in insertion order.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let state = self.0.state.borrow();
        let mut indices = Vec::new();
        let mut strings = Vec::new();
        let mut symbols = Vec::new();
        for key in state.properties.keys() {
            match key {
                PropertyKey::Symbol(_) => symbols.push(key.clone()),
                PropertyKey::String(_) => match key.array_index() {
                    Some(idx) => indices.push((idx, key.clone())),
                    None => strings.push(key.clone()),
                },
            }
        }
        indices.sort_by_key(|(idx, _)| *idx);
        indices
            .into_iter()
            .map(|(_, key)| key)
            .chain(strings)
            .chain(symbols)
            .collect()
    }

    /// Enumerable own string keys, in [`own_keys`](Self::own_keys) order.
    pub fn keys(&self) -> Vec<String> {
        let enumerable: Vec<PropertyKey> = {
            let state = self.0.state.borrow();
            state
                .properties
                .iter()
                .filter(|(key, desc)| desc.enumerable && !key.is_symbol())
                .map(|(key, _)| key.clone())
                .collect()
        };
        self.own_keys()
            .into_iter()
            .filter(|key| enumerable.contains(key))
            .filter_map(|key| match key {
                PropertyKey::String(s) => Some(s),
                PropertyKey::Symbol(_) => None,
            })
            .collect()
    }

    /// Renders the enumerable own string-keyed properties as a JSON object.
    /// Getters are invoked; properties that read as undefined are skipped.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for key in self.keys() {
            if let Some(value) = self.get(&PropertyKey::String(key.clone())) {
                map.insert(key, value);
            }
        }
        Value::Object(map)
    }

    fn lookup(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let mut cursor = Some(self.clone());
        while let Some(obj) = cursor {
            if let Some(desc) = obj.get_own_property(key) {
                return Some(desc);
            }
            cursor = obj.prototype();
        }
        None
    }

    // ──────────────────────────────────────────────────────────────────────
    // Access
    // ──────────────────────────────────────────────────────────────────────

    /// Reads a property through the prototype chain. Accessors are invoked
    /// with `self` as the receiver. `None` means undefined.
    pub fn get(&self, key: &PropertyKey) -> Option<Value> {
        match self.lookup(key)?.slot {
            Slot::Data { value, .. } => Some(value),
            Slot::Accessor { get, .. } => get.and_then(|getter| getter(self)),
        }
    }

    /// Assigns a property, returning `false` when the assignment is refused.
    ///
    /// - own writable data property: value replaced, attributes kept;
    /// - inherited writable data property: shadowed by a new own property;
    /// - accessor: setter invoked with `self` as the receiver, refused
    ///   without a setter;
    /// - non-writable data property: refused;
    /// - absent: new own data property, refused on non-extensible objects.
    pub fn set(&self, key: PropertyKey, value: Value) -> bool {
        match self.lookup(&key).map(|desc| desc.slot) {
            Some(Slot::Accessor { set: Some(setter), .. }) => {
                setter(self, value);
                true
            }
            Some(Slot::Accessor { set: None, .. }) => false,
            Some(Slot::Data { writable: false, .. }) => false,
            Some(Slot::Data { writable: true, .. }) => {
                let mut state = self.0.state.borrow_mut();
                if let Some(own) = state.properties.get_mut(&key) {
                    if let Slot::Data { value: current, .. } = &mut own.slot {
                        *current = value;
                        return true;
                    }
                    return false;
                }
                drop(state);
                self.create_data_property(key, value)
            }
            None => self.create_data_property(key, value),
        }
    }

    fn create_data_property(&self, key: PropertyKey, value: Value) -> bool {
        let mut state = self.0.state.borrow_mut();
        if !state.extensible {
            return false;
        }
        state.properties.insert(key, PropertyDescriptor::data(value));
        true
    }

    /// Removes an own property. Deleting a key that is not an own property
    /// succeeds without effect; non-configurable properties are kept and the
    /// call returns `false`.
    pub fn delete(&self, key: &PropertyKey) -> bool {
        let removed = {
            let mut state = self.0.state.borrow_mut();
            match state.properties.get(key) {
                None => return true,
                Some(desc) if !desc.configurable => return false,
                Some(_) => state.properties.shift_remove(key),
            }
        };
        drop(removed);
        true
    }

    /// Creates or redefines an own property from a complete descriptor.
    ///
    /// A redefinition keeps the property's position in insertion order. A
    /// non-configurable property only accepts a compatible descriptor, and new
    /// properties require an extensible object.
    pub fn define_property(&self, key: PropertyKey, descriptor: PropertyDescriptor) -> bool {
        let mut state = self.0.state.borrow_mut();
        match state.properties.get_mut(&key) {
            Some(current) => {
                if !current.permits_redefinition(&descriptor) {
                    return false;
                }
                let previous = std::mem::replace(current, descriptor);
                drop(state);
                drop(previous);
                true
            }
            None => {
                if !state.extensible {
                    return false;
                }
                state.properties.insert(key, descriptor);
                true
            }
        }
    }
}

impl TryFrom<Value> for ObjectRef {
    type Error = HistoryError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        ObjectRef::from_json(value)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("ObjectRef");
        out.field("id", &self.id());
        if let Ok(state) = self.0.state.try_borrow() {
            out.field("properties", &state.properties);
            out.field("extensible", &state.extensible);
        }
        out.finish()
    }
}
