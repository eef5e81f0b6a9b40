use pretty_assertions::assert_eq;
use quill_core::{is_draft, DraftError, Node, Outcome, PropKey, Producer, Prototype, Scope, Value};
use quill_test_utils::{child, node, nested_state, to_json, todo_list, unfrozen_producer};
use serde_json::json;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

#[test]
fn test_replace_after_mutation_conflicts() {
    let err = Producer::new()
        .produce(nested_state(), |draft| {
            draft.as_object_draft()?.get_object("meta")?.set("version", 2)?;
            Ok(Value::from(json!({"other": true})))
        })
        .unwrap_err();
    assert_eq!(err, DraftError::ConflictingCommit);
    assert!(err.is_usage_error());
}

#[test]
fn test_replace_without_mutation_is_allowed() {
    let result = Producer::new()
        .produce(nested_state(), |_| Ok(Value::from(json!({"other": true}))))
        .unwrap()
        .unwrap();
    assert_eq!(to_json(&result), json!({"other": true}));
    assert!(result.is_frozen());
}

#[test]
fn test_recipe_error_revokes_every_draft() {
    let mut leaked = Vec::new();
    let err = Producer::new()
        .produce(nested_state(), |draft| {
            let root = draft.as_object_draft()?;
            leaked.push(root.handle());
            leaked.push(root.get_object("user")?.handle());
            root.set("meta", 1)?;
            Err::<(), _>(DraftError::recipe("validation failed"))
        })
        .unwrap_err();

    assert_eq!(err, DraftError::Recipe("validation failed".into()));
    for handle in leaked {
        assert!(handle.is_revoked());
        assert_eq!(handle.get("anything"), Err(DraftError::Revoked));
        assert!(DraftError::Revoked.is_stale_access());
    }
    assert_eq!(Scope::current(), Err(DraftError::NoActiveSession));
}

#[test]
fn test_panicking_recipe_revokes_its_session() {
    let producer = Producer::new();
    let mut leaked = None;
    let caught = catch_unwind(AssertUnwindSafe(|| {
        producer.produce(nested_state(), |draft| -> Result<(), DraftError> {
            let root = draft.as_object_draft()?;
            root.set("meta", 1)?;
            leaked = Some(root.get_object("user")?.handle());
            panic!("recipe bug")
        })
    }));

    assert!(caught.is_err());
    assert!(leaked.unwrap().is_revoked());
    assert_eq!(Scope::current(), Err(DraftError::NoActiveSession));

    let result = producer
        .produce(Node::object(), |draft| {
            draft.as_object_draft()?.set("x", Node::object_from([("y", Node::object())]))
        })
        .unwrap()
        .unwrap();
    let x = child(&node(&result), "x");
    assert!(x.is_frozen());
    assert!(child(&x, "y").is_frozen());
}

#[test]
fn test_handles_do_not_resolve_on_other_threads() {
    let producer = Producer::new();
    let draft = producer.create_draft(Value::from(json!({"n": 1}))).unwrap();

    std::thread::spawn(move || {
        let producer = Producer::new();
        let local = producer.create_draft(Value::from(json!({"n": 2}))).unwrap();
        assert_eq!(draft.get("n"), Err(DraftError::Revoked));
        assert_eq!(draft.set("n", 3), Err(DraftError::Revoked));
        assert!(!is_draft(&Value::Draft(draft)));
        assert_eq!(producer.finish_draft(draft, None), Err(DraftError::AlreadyFinalized));
        assert_eq!(local.get("n"), Ok(Value::from(2)));
        producer.finish_draft(local, None).unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(draft.get("n"), Ok(Value::from(1)));
    let result = producer.finish_draft(draft, None).unwrap().unwrap();
    assert_eq!(to_json(&result), json!({"n": 1}));
}

#[test]
fn test_base_is_untouched_after_failed_recipe() {
    let base = nested_state();
    let before = to_json(&base);
    let _ = Producer::new().produce(base.clone(), |draft| {
        draft.as_object_draft()?.get_object("user")?.delete("profile")?;
        Err::<(), _>(DraftError::recipe("abort"))
    });
    assert_eq!(to_json(&base), before);
    assert!(!base.is_frozen());
}

#[test]
fn test_array_key_and_length_validation() {
    Producer::new()
        .produce(todo_list(), |draft| {
            let handle = draft.as_draft().ok_or(DraftError::EmptySession)?;
            assert_eq!(handle.set("first", 1), Err(DraftError::InvalidArrayKey("first".into())));
            assert_eq!(handle.delete("x"), Err(DraftError::InvalidArrayKey("x".into())));
            assert!(matches!(
                handle.set(PropKey::length(), -1),
                Err(DraftError::InvalidArrayLength(_))
            ));
            assert!(matches!(
                handle.set(PropKey::length(), 1.5),
                Err(DraftError::InvalidArrayLength(_))
            ));
            assert!(matches!(
                handle.delete(PropKey::length()),
                Err(DraftError::UnsupportedOperation(_))
            ));
            assert!(handle.get("1")?.is_draft());
            assert_eq!(handle.get(PropKey::length())?, Value::from(2));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_array_growth_is_bounded() {
    let base = todo_list();
    let result = Producer::new()
        .produce(base.clone(), |draft| {
            let handle = draft.as_draft().ok_or(DraftError::EmptySession)?;
            assert_eq!(
                handle.set(usize::MAX, 1),
                Err(DraftError::InvalidArrayKey(usize::MAX.to_string()))
            );
            assert!(matches!(
                handle.set("4294967295", 1),
                Err(DraftError::InvalidArrayKey(_))
            ));
            assert!(matches!(
                handle.set(PropKey::length(), 1e300),
                Err(DraftError::InvalidArrayLength(_))
            ));
            assert!(matches!(
                handle.set(PropKey::length(), 4_294_967_296.0),
                Err(DraftError::InvalidArrayLength(_))
            ));
            assert_eq!(handle.get(PropKey::length())?, Value::from(2));
            Ok(())
        })
        .unwrap()
        .unwrap();
    assert!(Node::ptr_eq(&node(&result), &node(&base)));
}

#[test]
fn test_array_length_truncates_and_extends() {
    let result = Producer::new()
        .produce(Value::from(json!([1, 2, 3])), |draft| {
            let items = draft.as_array_draft()?;
            items.set_len(1)?;
            items.set_len(3)?;
            items.delete(0)
        })
        .unwrap()
        .unwrap();
    assert_eq!(to_json(&result), json!([null, null, null]));
}

#[test]
fn test_unsupported_draft_operations() {
    Producer::new()
        .produce(Node::object(), |draft| {
            let handle = draft.as_draft().ok_or(DraftError::EmptySession)?;
            assert!(matches!(
                handle.define_property("x"),
                Err(DraftError::UnsupportedOperation(_))
            ));
            assert!(matches!(
                handle.set_prototype(Some(Arc::new(Prototype::new("Other")))),
                Err(DraftError::UnsupportedOperation(_))
            ));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_manual_draft_misuse() {
    let producer = Producer::new();
    assert!(matches!(producer.create_draft(3), Err(DraftError::KindMismatch { .. })));

    let opaque = Node::instance(Arc::new(Prototype::opaque("Clock")), [("tick", 1)]);
    assert!(matches!(producer.create_draft(opaque), Err(DraftError::KindMismatch { .. })));

    let draft = producer.create_draft(Node::object()).unwrap();
    assert!(is_draft(&Value::Draft(draft)));
    producer.finish_draft(draft, None).unwrap();
    assert_eq!(producer.finish_draft(draft, None), Err(DraftError::AlreadyFinalized));
    assert!(draft.is_revoked());
}

#[test]
fn test_frozen_results_reject_mutation_until_redrafted() {
    let result = Producer::new()
        .produce(Value::from(json!({"a": {"b": 1}})), |draft| {
            draft.as_object_draft()?.get_object("a")?.set("b", 2)
        })
        .unwrap()
        .unwrap();
    let a = node(&result).get("a").unwrap();
    assert_eq!(node(&a).insert("b", 3), Err(DraftError::FrozenValue));

    let again = Producer::new()
        .produce(result.clone(), |draft| draft.as_object_draft()?.get_object("a")?.set("b", 3))
        .unwrap()
        .unwrap();
    assert_eq!(to_json(&again), json!({"a": {"b": 3}}));
    assert_eq!(to_json(&result), json!({"a": {"b": 2}}));
}

#[test]
fn test_auto_freeze_disabled_results_stay_mutable() {
    let result = unfrozen_producer()
        .produce(Value::from(json!({"a": {"b": 1}})), |draft| {
            draft.as_object_draft()?.get_object("a")?.set("b", 2)
        })
        .unwrap()
        .unwrap();
    let a = node(&node(&result).get("a").unwrap());
    assert_eq!(a.insert("b", 9), Ok(Some(Value::from(2))));
}

#[test]
fn test_recipe_returning_nothing_then_value_kinds() {
    let producer = Producer::new();
    assert_eq!(producer.produce(nested_state(), |_| Ok(Outcome::Nothing)).unwrap(), None);
    assert_eq!(producer.produce(nested_state(), |_| Ok(Value::Null)).unwrap(), Some(Value::Null));
}

#[test]
fn test_facade_kind_mismatch() {
    let err = Producer::new()
        .produce(todo_list(), |draft| draft.as_object_draft().map(|_| ()))
        .unwrap_err();
    assert_eq!(err, DraftError::kind_mismatch("object", "array"));
}
