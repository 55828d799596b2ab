use std::cell::Cell;
use std::rc::Rc;

use history_object::{
    create_history_object, Getter, HistoryError, HistoryObject, HistoryRecord, HistoryStore,
    ObjectRef, PropertyDescriptor, PropertyKey, RecordKind, Setter, Symbol, UndoCount,
};
use serde_json::{json, Value};

fn tracked(value: Value) -> HistoryObject {
    HistoryObject::with_store(ObjectRef::from_json(value).unwrap(), HistoryStore::new())
}

#[test]
fn add_then_undo_restores_object() {
    let obj = tracked(json!({"a": 1, "b": {"nested": true}}));
    let before = obj.to_json();

    assert!(obj.set("fresh", json!([1, 2, 3])));
    assert_eq!(obj.get("fresh"), Some(json!([1, 2, 3])));

    obj.undo();
    assert!(!obj.has("fresh"));
    assert_eq!(obj.to_json(), before);
    assert_eq!(obj.own_keys(), vec![PropertyKey::from("a"), PropertyKey::from("b")]);
}

#[test]
fn remove_then_undo_restores_exact_descriptor() {
    let obj = tracked(json!({}));
    let desc = PropertyDescriptor::data("secret")
        .with_writable(false)
        .with_enumerable(false);
    obj.define_property("k", desc.clone());

    assert!(obj.delete("k"));
    assert!(!obj.has("k"));

    obj.undo();
    assert_eq!(obj.get_own_property("k"), Some(desc));
}

#[test]
fn remove_then_undo_restores_accessor() {
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    let get: Getter = Rc::new(move |_: &ObjectRef| {
        counter.set(counter.get() + 1);
        Some(json!("computed"))
    });
    let set: Setter = Rc::new(|this: &ObjectRef, value: Value| {
        this.set(PropertyKey::from("backing"), value);
    });
    let desc = PropertyDescriptor::accessor(Some(get), Some(set)).with_enumerable(false);

    let obj = tracked(json!({}));
    obj.define_property("computed", desc.clone());
    assert!(obj.delete("computed"));
    obj.undo();

    assert_eq!(obj.get_own_property("computed"), Some(desc));
    assert_eq!(obj.get("computed"), Some(json!("computed")));
    assert_eq!(hits.get(), 1);
    assert!(obj.set("computed", 5));
    assert_eq!(obj.get("backing"), Some(json!(5)));
}

#[test]
fn overwrite_is_not_recorded_and_not_reverted() {
    let obj = tracked(json!({"a": 1}));
    assert!(obj.set("a", 2));
    assert!(obj.history().is_empty());

    obj.undo();
    assert_eq!(obj.get("a"), Some(json!(2)));
}

#[test]
fn undo_beyond_log_length_clears_log() {
    let obj = tracked(json!({"keep": 0}));
    obj.set("a", 1);
    obj.set("b", 2);
    obj.delete("keep");

    obj.undo_n(100);
    assert!(obj.history().is_empty());
    assert_eq!(obj.to_json(), json!({"keep": 0}));

    obj.undo_n(100);
    assert_eq!(obj.to_json(), json!({"keep": 0}));
}

#[test]
fn undo_is_lifo() {
    let obj = tracked(json!({"c": "original"}));
    obj.set("a", 1);
    obj.set("b", 2);
    obj.delete("c");
    assert_eq!(
        obj.history().iter().map(HistoryRecord::kind).collect::<Vec<_>>(),
        vec![RecordKind::Add, RecordKind::Add, RecordKind::Remove]
    );

    obj.undo_n(2);
    assert!(obj.has("a"));
    assert!(!obj.has("b"));
    assert_eq!(obj.get("c"), Some(json!("original")));
    assert_eq!(obj.history().len(), 1);
}

#[test]
fn undo_all_reverts_everything() {
    let obj = tracked(json!({"x": 1, "y": 2}));
    obj.delete("x");
    obj.set("z", 3);
    obj.delete("y");
    obj.set("x", 10);

    obj.undo_by(UndoCount::All);
    assert_eq!(obj.to_json(), json!({"x": 1, "y": 2}));
}

#[test]
fn delete_and_re_add_is_two_records() {
    let obj = tracked(json!({"a": 1}));
    obj.delete("a");
    obj.set("a", 2);
    assert_eq!(obj.history().len(), 2);

    obj.undo();
    assert!(!obj.has("a"));
    obj.undo();
    assert_eq!(obj.get("a"), Some(json!(1)));
}

#[test]
fn undone_records_are_forgotten() {
    let obj = tracked(json!({}));
    obj.set("a", 1);
    obj.undo();
    obj.set("b", 2);
    assert_eq!(
        obj.history(),
        vec![HistoryRecord::Add {
            key: PropertyKey::from("b"),
            value: json!(2),
        }]
    );
}

#[test]
fn add_record_keeps_written_value() {
    let obj = tracked(json!({}));
    obj.set("a", "first");
    obj.target().set(PropertyKey::from("a"), json!("changed behind the wrapper"));
    match &obj.history()[0] {
        HistoryRecord::Add { value, .. } => assert_eq!(value, &json!("first")),
        other => panic!("unexpected record {other:?}"),
    }
    obj.undo();
    assert!(!obj.has("a"));
}

#[test]
fn construction_rejects_non_objects() {
    assert_eq!(
        create_history_object(json!(null)).unwrap_err(),
        HistoryError::NotAnObject { found: "null" }
    );
    assert_eq!(
        create_history_object(json!(42)).unwrap_err(),
        HistoryError::NotAnObject { found: "number" }
    );
    assert!(create_history_object(json!("text")).is_err());
    assert!(create_history_object(json!(true)).is_err());

    let obj = create_history_object(json!({})).unwrap();
    assert!(obj.own_keys().is_empty());
}

#[test]
fn wrapper_is_transparent() {
    let proto = ObjectRef::from_json(json!({"inherited": "yes"})).unwrap();
    let target = ObjectRef::with_prototype(Some(&proto));
    let sym = Symbol::new("meta");
    target.set(PropertyKey::from("b"), json!(1));
    target.set(PropertyKey::from("1"), json!("one"));
    target.set(PropertyKey::from(&sym), json!("symbol value"));
    target.define_property(
        PropertyKey::from("hidden"),
        PropertyDescriptor::data(0).with_enumerable(false),
    );

    let obj = create_history_object(&target).unwrap();
    assert_eq!(obj.own_keys(), target.own_keys());
    assert_eq!(obj.keys(), target.keys());
    assert_eq!(obj.keys(), vec!["1", "b"]);
    assert_eq!(obj.to_json(), target.to_json());
    assert_eq!(obj.get("inherited"), Some(json!("yes")));
    assert_eq!(obj.get(&sym), Some(json!("symbol value")));
    assert_eq!(
        obj.get_own_property("hidden"),
        target.get_own_property(&PropertyKey::from("hidden"))
    );
    assert!(obj.prototype().unwrap().ptr_eq(&proto));
}

#[test]
fn undo_key_is_an_ordinary_property() {
    let obj = tracked(json!({}));
    assert_eq!(obj.get("_undo"), None);
    obj.set("_undo", "plain data");
    assert_eq!(obj.get("_undo"), Some(json!("plain data")));
    assert_eq!(obj.history().len(), 1);
    assert!(obj.target().has_own(&PropertyKey::from("_undo")));
}

#[test]
fn wrapper_adds_no_properties_to_target() {
    let target = ObjectRef::new();
    let obj = create_history_object(&target).unwrap();
    obj.set("a", 1);
    obj.undo();
    assert!(target.own_keys().is_empty());
}

#[test]
fn symbol_keys_are_tracked() {
    let obj = tracked(json!({}));
    let sym = Symbol::new("id");
    obj.set(&sym, 7);
    assert_eq!(obj.history()[0].key(), &PropertyKey::from(&sym));
    obj.undo();
    assert!(!obj.has(&sym));
}

#[test]
fn untracked_channels_bypass_history() {
    let obj = tracked(json!({}));
    obj.target().set(PropertyKey::from("direct"), json!(1));
    obj.define_property("defined", PropertyDescriptor::data(2));
    assert!(obj.history().is_empty());
    assert_eq!(obj.to_json(), json!({"direct": 1, "defined": 2}));
}

#[test]
fn history_is_reclaimed_with_target() {
    let store = HistoryStore::new();
    let target = ObjectRef::from_json(json!({"a": 1})).unwrap();
    let weak = target.downgrade();
    let obj = HistoryObject::with_store(target, store.clone());
    obj.set("b", 2);
    obj.delete("a");
    assert_eq!(store.len(), 1);

    drop(obj);
    assert!(weak.is_dropped());
    assert!(store.is_empty());
}

#[test]
fn history_survives_while_any_handle_lives() {
    let store = HistoryStore::new();
    let target = ObjectRef::new();
    let obj = HistoryObject::with_store(target.clone(), store.clone());
    obj.set("a", 1);
    drop(obj);

    assert!(store.is_tracking(&target));
    let again = HistoryObject::with_store(target, store);
    again.undo();
    assert!(again.own_keys().is_empty());
}

#[test]
fn reclaiming_one_history_does_not_touch_others() {
    let store = HistoryStore::new();
    let kept = HistoryObject::with_store(ObjectRef::new(), store.clone());
    let dropped = HistoryObject::with_store(ObjectRef::new(), store.clone());
    kept.set("a", 1);
    dropped.set("b", 2);
    assert_eq!(store.len(), 2);

    drop(dropped);
    assert_eq!(store.len(), 1);
    assert_eq!(kept.history().len(), 1);
}

#[test]
fn array_targets_track_indices() {
    let obj = create_history_object(json!(["a", "b"])).unwrap();
    obj.set(2usize, "c");
    obj.delete(0usize);
    assert_eq!(obj.keys(), vec!["1", "2"]);

    obj.undo_all();
    assert_eq!(obj.keys(), vec!["0", "1"]);
    assert_eq!(obj.get(0usize), Some(json!("a")));
}
