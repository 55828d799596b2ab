//! Property descriptors.
//!
//! A descriptor is always complete: every attribute has a concrete value.
//! Descriptors read from an object via
//! [`ObjectRef::get_own_property`](crate::ObjectRef::get_own_property) can be
//! handed back to [`ObjectRef::define_property`](crate::ObjectRef::define_property)
//! to recreate the property exactly.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::object::ObjectRef;

/// Accessor read hook. Receives the object the read started from and returns
/// `None` for "undefined".
pub type Getter = Rc<dyn Fn(&ObjectRef) -> Option<Value>>;

/// Accessor write hook. Receives the object the write started from.
pub type Setter = Rc<dyn Fn(&ObjectRef, Value)>;

#[derive(Clone)]
pub enum Slot {
    Data { value: Value, writable: bool },
    Accessor { get: Option<Getter>, set: Option<Setter> },
}

#[derive(Clone)]
pub struct PropertyDescriptor {
    pub slot: Slot,
    pub enumerable: bool,
    pub configurable: bool,
}

impl PropertyDescriptor {
    /// A writable, enumerable, configurable data property: the shape a plain
    /// assignment creates.
    pub fn data(value: impl Into<Value>) -> Self {
        Self {
            slot: Slot::Data {
                value: value.into(),
                writable: true,
            },
            enumerable: true,
            configurable: true,
        }
    }

    /// An enumerable, configurable accessor property.
    pub fn accessor(get: Option<Getter>, set: Option<Setter>) -> Self {
        Self {
            slot: Slot::Accessor { get, set },
            enumerable: true,
            configurable: true,
        }
    }

    /// Sets `writable`. Has no effect on accessor descriptors.
    pub fn with_writable(mut self, writable: bool) -> Self {
        if let Slot::Data { writable: w, .. } = &mut self.slot {
            *w = writable;
        }
        self
    }

    pub fn with_enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = enumerable;
        self
    }

    pub fn with_configurable(mut self, configurable: bool) -> Self {
        self.configurable = configurable;
        self
    }

    pub fn is_data(&self) -> bool {
        matches!(self.slot, Slot::Data { .. })
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self.slot, Slot::Accessor { .. })
    }

    /// The stored value of a data property.
    pub fn value(&self) -> Option<&Value> {
        match &self.slot {
            Slot::Data { value, .. } => Some(value),
            Slot::Accessor { .. } => None,
        }
    }

    /// Always `false` for accessors.
    pub fn is_writable(&self) -> bool {
        matches!(self.slot, Slot::Data { writable: true, .. })
    }

    pub fn getter(&self) -> Option<&Getter> {
        match &self.slot {
            Slot::Accessor { get, .. } => get.as_ref(),
            Slot::Data { .. } => None,
        }
    }

    pub fn setter(&self) -> Option<&Setter> {
        match &self.slot {
            Slot::Accessor { set, .. } => set.as_ref(),
            Slot::Data { .. } => None,
        }
    }

    /// Whether `next` may replace `self` on a non-configurable property.
    pub(crate) fn permits_redefinition(&self, next: &PropertyDescriptor) -> bool {
        if self.configurable {
            return true;
        }
        if next.configurable || next.enumerable != self.enumerable {
            return false;
        }
        match (&self.slot, &next.slot) {
            (Slot::Data { writable: true, .. }, Slot::Data { .. }) => true,
            (
                Slot::Data {
                    value,
                    writable: false,
                },
                Slot::Data {
                    value: next_value,
                    writable: next_writable,
                },
            ) => !next_writable && value == next_value,
            (Slot::Accessor { .. }, Slot::Accessor { .. }) => {
                same_hook(self.getter(), next.getter()) && same_hook(self.setter(), next.setter())
            }
            _ => false,
        }
    }
}

fn same_hook<F: ?Sized>(a: Option<&Rc<F>>, b: Option<&Rc<F>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
        _ => false,
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Slot::Data { value, writable },
                Slot::Data {
                    value: other_value,
                    writable: other_writable,
                },
            ) => value == other_value && writable == other_writable,
            (
                Slot::Accessor { get, set },
                Slot::Accessor {
                    get: other_get,
                    set: other_set,
                },
            ) => same_hook(get.as_ref(), other_get.as_ref()) && same_hook(set.as_ref(), other_set.as_ref()),
            _ => false,
        }
    }
}

impl PartialEq for PropertyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
            && self.enumerable == other.enumerable
            && self.configurable == other.configurable
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Data { value, writable } => f
                .debug_struct("Data")
                .field("value", value)
                .field("writable", writable)
                .finish(),
            Slot::Accessor { get, set } => f
                .debug_struct("Accessor")
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .finish(),
        }
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("slot", &self.slot)
            .field("enumerable", &self.enumerable)
            .field("configurable", &self.configurable)
            .finish()
    }
}
