//! history-object - Undoable property additions and removals
//!
//! [`create_history_object`] wraps an object in a [`HistoryObject`]. The
//! wrapper forwards every read to the object unchanged, records each property
//! it adds and each property it deletes, and can undo those mutations
//! newest-first.
//!
//! Only additions and removals are recorded. Overwriting a property that
//! already exists leaves no trace, and undone records are gone for good.
//! Changes made on the [`ObjectRef`] directly bypass the history.
//!
//! Histories live in a [`HistoryStore`] keyed by object identity. A store
//! never keeps an object alive; when the last handle to an object is dropped
//! its history goes with it.
//!
//! # Example
//!
//! ```
//! use history_object::create_history_object;
//! use serde_json::json;
//!
//! let obj = create_history_object(json!({"name": "ada"})).unwrap();
//! obj.set("age", 36);
//! obj.set("name", "grace");
//! obj.delete("name");
//! assert_eq!(obj.history().len(), 2);
//!
//! obj.undo();
//! assert_eq!(obj.get("name"), Some(json!("grace")));
//!
//! obj.undo();
//! assert_eq!(obj.to_json(), json!({"name": "grace"}));
//! ```

pub mod descriptor;
pub mod error;
pub mod key;
pub mod object;
pub mod store;
pub mod wrapper;

pub use descriptor::{Getter, PropertyDescriptor, Setter, Slot};
pub use error::HistoryError;
pub use key::{PropertyKey, Symbol};
pub use object::{ObjectId, ObjectRef, WeakObjectRef};
pub use store::{HistoryLog, HistoryRecord, HistoryStore, RecordKind};
pub use wrapper::{create_history_object, HistoryObject, IntoTarget, UndoCount};
