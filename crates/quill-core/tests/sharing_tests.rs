use pretty_assertions::assert_eq;
use quill_core::{is_draft, Assignment, DraftError, Node, Outcome, PatchPath, Producer, PropKey, Value};
use quill_test_utils::{
    child, init_tracing, nested_state, node, patch_producer, to_json, unfrozen_producer, RecordingPatches,
};
use serde_json::json;

#[test]
fn test_untouched_subtrees_keep_identity() {
    init_tracing();
    let base = nested_state();
    let result = Producer::new()
        .produce(base.clone(), |draft| {
            let profile = draft.as_object_draft()?.get_object("user")?.get_object("profile")?;
            profile.set("name", "bea")
        })
        .unwrap()
        .unwrap();

    let (base, result) = (node(&base), node(&result));
    assert!(!Node::ptr_eq(&base, &result));
    assert!(!Node::ptr_eq(&child(&base, "user"), &child(&result, "user")));
    assert!(Node::ptr_eq(&child(&base, "items"), &child(&result, "items")));
    assert!(Node::ptr_eq(&child(&base, "meta"), &child(&result, "meta")));
    assert!(Node::ptr_eq(
        &child(&child(&base, "user"), "settings"),
        &child(&child(&result, "user"), "settings")
    ));
    assert!(Node::ptr_eq(
        &child(&child(&child(&base, "user"), "profile"), "tags"),
        &child(&child(&child(&result, "user"), "profile"), "tags")
    ));
    assert_eq!(to_json(&child(&child(&result, "user"), "profile").get("name").unwrap()), json!("bea"));
    assert_eq!(to_json(&child(&child(&base, "user"), "profile").get("name").unwrap()), json!("ann"));
}

#[test]
fn test_read_only_session_returns_base() {
    let base = nested_state();
    let result = Producer::new()
        .produce(base.clone(), |draft| {
            let root = draft.as_object_draft()?;
            let profile = root.get_object("user")?.get_object("profile")?;
            profile.get("name")?;
            profile.get_array("tags")?.items()?;
            root.get_array("items")?.get_object(2)?.get("id")?;
            Ok(())
        })
        .unwrap()
        .unwrap();
    assert!(Node::ptr_eq(&node(&result), &node(&base)));
}

#[test]
fn test_same_value_writes_return_base() {
    let base = nested_state();
    let result = Producer::new()
        .produce(base.clone(), |draft| {
            let root = draft.as_object_draft()?;
            let profile = root.get_object("user")?.get_object("profile")?;
            profile.set("name", "ann")?;
            root.get_object("meta")?.set("version", 1)?;
            Ok(())
        })
        .unwrap()
        .unwrap();
    assert!(Node::ptr_eq(&node(&result), &node(&base)));
}

#[test]
fn test_deep_write_marks_every_ancestor() {
    Producer::new()
        .produce(nested_state(), |draft| {
            let root = draft.as_object_draft()?;
            let user = root.get_object("user")?;
            let profile = user.get_object("profile")?;
            let settings = user.get_object("settings")?;
            assert!(!root.handle().info()?.modified);

            profile.get_array("tags")?.push("c")?;
            assert!(profile.handle().info()?.modified);
            assert!(user.handle().info()?.modified);
            assert!(root.handle().info()?.modified);
            assert!(!settings.handle().info()?.modified);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_child_draft_under_two_keys_finalizes_once() {
    let generator = RecordingPatches::new();
    let base = Value::from(json!({"child": {"x": 1}}));
    let produced = patch_producer(generator.clone())
        .produce_with_patches(base, |draft| {
            let root = draft.as_object_draft()?;
            let shared = root.get("child")?;
            shared.as_object_draft()?.set("x", 2)?;
            root.set("twin", shared)
        })
        .unwrap();

    let result = node(&produced.value.unwrap());
    assert!(Node::ptr_eq(&child(&result, "child"), &child(&result, "twin")));
    assert_eq!(child(&result, "twin").get("x"), Some(Value::from(2)));

    let child_path: PatchPath = "/child".parse().unwrap();
    let visited = generator.visited();
    assert_eq!(visited.iter().filter(|path| **path == child_path).count(), 1);
    assert!(visited.iter().all(|path| path.to_string() != "/twin"));
}

#[test]
fn test_foreign_manual_draft_is_left_live() {
    init_tracing();
    let producer = Producer::new();
    let mut manual = None;
    let result = producer
        .produce(Node::object(), |draft| {
            let handle = producer.create_draft(Node::object_from([("n", 1)]))?;
            manual = Some(handle);
            draft.as_object_draft()?.set("manual", handle)
        })
        .unwrap()
        .unwrap();

    let handle = manual.unwrap();
    let root = node(&result);
    assert!(!root.is_frozen());
    let held = root.get("manual").unwrap();
    assert!(is_draft(&held));
    assert_eq!(held.as_draft(), Some(handle));

    handle.set("n", 2).unwrap();
    let finished = producer.finish_draft(handle, None).unwrap().unwrap();
    assert_eq!(to_json(&finished), json!({"n": 2}));
    assert!(finished.is_frozen());
    assert!(!is_draft(&held));
}

#[test]
fn test_nested_produce_inside_recipe() {
    let producer = Producer::new();
    let base = Value::from(json!({"inner": {"n": 1}, "outer": 0}));
    let result = producer
        .produce(base, |draft| {
            let root = draft.as_object_draft()?;
            let plain = Value::from(json!({"n": 10}));
            let inner = producer
                .produce(plain, |inner| inner.as_object_draft()?.set("n", 11))?
                .ok_or(DraftError::EmptySession)?;
            root.set("outer", 1)?;
            root.set("inner", inner)?;
            Ok(Outcome::Commit)
        })
        .unwrap()
        .unwrap();

    assert_eq!(to_json(&result), json!({"inner": {"n": 11}, "outer": 1}));
    assert!(result.is_frozen());
}

#[test]
fn test_values_read_after_revocation_fail() {
    let mut leaked = None;
    Producer::new()
        .produce(nested_state(), |draft| {
            leaked = Some(draft.as_object_draft()?.get_object("user")?);
            Ok(())
        })
        .unwrap();
    let leaked = leaked.unwrap();
    assert_eq!(leaked.get("profile"), Err(DraftError::Revoked));
    assert_eq!(leaked.set("profile", 1), Err(DraftError::Revoked));
}

#[test]
fn test_negative_zero_over_zero_modifies() {
    let base = Node::object_from([("z", 0.0)]);
    let result = Producer::new()
        .produce(base.clone(), |draft| {
            let root = draft.as_object_draft()?;
            root.set("z", -0.0)?;
            assert!(root.handle().info()?.modified);
            Ok(())
        })
        .unwrap()
        .unwrap();

    let result = node(&result);
    assert!(!Node::ptr_eq(&result, &base));
    assert!(matches!(result.get("z"), Some(Value::Number(z)) if z == 0.0 && z.is_sign_negative()));
}

#[test]
fn test_nan_over_nan_is_a_no_op() {
    let base = Node::object_from([("n", f64::NAN)]);
    let result = Producer::new()
        .produce(base.clone(), |draft| {
            let root = draft.as_object_draft()?;
            root.set("n", f64::NAN)?;
            assert!(!root.handle().info()?.modified);
            Ok(())
        })
        .unwrap()
        .unwrap();
    assert!(Node::ptr_eq(&node(&result), &base));
}

#[test]
fn test_numeric_writes_after_copy_are_always_recorded() {
    let base = Node::object_from([("n", Value::from(1)), ("s", Value::from("a"))]);
    Producer::new()
        .produce(base, |draft| {
            let root = draft.as_object_draft()?;
            root.set("flag", true)?;
            root.set("n", 1)?;
            root.set("s", "a")?;

            let assigned = root.handle().info()?.assigned;
            assert_eq!(assigned.get(&PropKey::from("n")), Some(&Assignment::Added));
            assert!(!assigned.contains_key(&PropKey::from("s")));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_plain_subtree_holding_a_draft_is_resolved_without_auto_freeze() {
    let base = Value::from(json!({"child": {"n": 1}}));
    let result = unfrozen_producer()
        .produce(base, |draft| {
            let root = draft.as_object_draft()?;
            let moved = root.get("child")?;
            moved.as_object_draft()?.set("n", 2)?;
            root.set("wrapper", Node::object_from([("moved", moved)]))?;
            root.delete("child")
        })
        .unwrap()
        .unwrap();

    let moved = node(&result).get("wrapper").and_then(|w| node(&w).get("moved")).unwrap();
    assert!(!moved.is_draft());
    assert_eq!(to_json(&moved), json!({"n": 2}));
    assert!(!moved.is_frozen());
}

#[test]
fn test_plain_subtree_is_not_walked_once_every_draft_is_finalized() {
    let fresh = Node::object();
    fresh.insert("me", fresh.clone()).unwrap();

    let result = unfrozen_producer()
        .produce(Value::from(json!({"a": 1})), |draft| draft.as_object_draft()?.set("fresh", fresh.clone()))
        .unwrap()
        .unwrap();
    let held = child(&node(&result), "fresh");
    assert!(Node::ptr_eq(&held, &fresh));
    assert!(!held.is_frozen());

    let err = Producer::new()
        .produce(Value::from(json!({"a": 1})), |draft| draft.as_object_draft()?.set("fresh", fresh.clone()))
        .unwrap_err();
    assert_eq!(err, DraftError::CircularReference);

    fresh.remove("me").unwrap();
}

#[test]
fn test_inner_session_returning_outer_draft() {
    let producer = Producer::new();
    let base = Node::object_from([("child", Node::object_from([("n", 1)]))]);
    let result = producer
        .produce(base.clone(), |draft| {
            let root = draft.as_object_draft()?;
            let outer_child = root.get("child")?;

            let inner = producer
                .produce(Node::object(), |inner| inner.as_object_draft()?.set("outer", outer_child.clone()))?
                .ok_or(DraftError::EmptySession)?;
            assert!(!inner.is_frozen());
            let held = node(&inner).get("outer").ok_or(DraftError::EmptySession)?;
            assert!(is_draft(&held));
            assert_eq!(held.as_draft(), outer_child.as_draft());

            let control = producer
                .produce(Node::object(), |inner| inner.as_object_draft()?.set("plain", 1))?
                .ok_or(DraftError::EmptySession)?;
            assert!(control.is_frozen());

            root.set("wrapped", inner)
        })
        .unwrap()
        .unwrap();

    let result = node(&result);
    assert!(result.is_frozen());
    let wrapped = child(&result, "wrapped");
    assert!(wrapped.is_frozen());
    assert!(Node::ptr_eq(&child(&wrapped, "outer"), &child(&base, "child")));
}
