use testgen_ir::{Expr, StateRef};
use testgen_model::object::{CloneSpec, MeterValue};
use testgen_model::{ExecutionState, StateError, TestObjectCategory, TraceEvent, UninterpretedObject};

fn load_fixture() -> ExecutionState {
    let json = include_str!("fixtures/ipv4_state.json");
    serde_json::from_str(json).unwrap()
}

fn clone_session(port: u64) -> UninterpretedObject {
    UninterpretedObject::CloneSpec(CloneSpec {
        session_id: Expr::constant(32, 1),
        clone_port: Expr::constant(9, port),
        is_clone: true,
    })
}

#[test]
fn test_fixture_files_objects_by_variant() {
    let state = load_fixture();
    assert_eq!(state.test_object_count(), 5);
    for category in TestObjectCategory::ALL {
        let objects = state.test_object_category(category);
        assert_eq!(objects.len(), 1, "category {category}");
        for object in objects.values() {
            assert_eq!(object.category(), category);
        }
    }
    assert!(state
        .test_object_category(TestObjectCategory::TableConfigs)
        .contains_key("ipv4_lpm"));
    assert!(state
        .test_object_category(TestObjectCategory::CloneSpecs)
        .contains_key("5"));
}

#[test]
fn test_absent_category_is_empty() {
    let state = ExecutionState::new();
    assert!(state
        .test_object_category(TestObjectCategory::MeterValues)
        .is_empty());
}

#[test]
fn test_flat_fields_lists_scalar_leaves_in_order() {
    let state = load_fixture();
    let fields: Vec<String> = state
        .flat_fields(&StateRef::new("meta"))
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(fields, vec!["meta.egress_spec", "meta.inner.flag", "meta.x"]);
}

#[test]
fn test_flat_fields_skips_composites_and_other_roots() {
    let mut state = ExecutionState::new();
    let meta = StateRef::new("meta");
    state.set(meta.member("inner"), Expr::symbol("whole_inner", 8));
    state.set(meta.member("inner").member("a"), Expr::symbol("a", 4));
    state.set(StateRef::new("metadata").member("z"), Expr::symbol("z", 4));
    state.set(meta.clone(), Expr::symbol("whole_meta", 12));

    let fields = state.flat_fields(&meta);
    assert_eq!(fields, vec![meta.member("inner").member("a")]);
}

#[test]
fn test_flat_fields_of_unknown_root_is_empty() {
    let state = load_fixture();
    assert!(state.flat_fields(&StateRef::new("nothing")).is_empty());
}

#[test]
fn test_get_unknown_reference_is_an_error() {
    let state = load_fixture();
    let err = state.get(&StateRef::new("meta").member("missing")).unwrap_err();
    assert_eq!(err, StateError::UnknownReference("meta.missing".to_string()));
}

#[test]
fn test_add_test_object_replaces_same_name() {
    let mut state = ExecutionState::new();
    assert!(state.add_test_object("1", clone_session(3)).is_none());
    let previous = state.add_test_object("1", clone_session(4));
    assert_eq!(previous, Some(clone_session(3)));
    assert_eq!(state.test_object_count(), 1);
}

#[test]
fn test_same_name_in_different_categories_is_kept_apart() {
    let mut state = ExecutionState::new();
    state.add_test_object("shared", clone_session(3));
    state.add_test_object(
        "shared",
        UninterpretedObject::Meter(MeterValue {
            meter_name: "shared".to_string(),
            is_direct: true,
            entries: vec![],
        }),
    );
    assert_eq!(state.test_object_count(), 2);
    assert_eq!(state.test_object_category(TestObjectCategory::CloneSpecs).len(), 1);
    assert_eq!(state.test_object_category(TestObjectCategory::MeterValues).len(), 1);
}

#[test]
fn test_drop_property_defaults_to_false() {
    let mut state = ExecutionState::new();
    assert!(!state.is_dropped());
    state.set_property("drop", true);
    assert!(state.is_dropped());
}

#[test]
fn test_trace_events_keep_their_order() {
    let state = load_fixture();
    let events = state.trace_events();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        TraceEvent::ParserState {
            state: "start".to_string()
        }
    );
    assert!(matches!(events[2], TraceEvent::Expression { .. }));
}

#[test]
fn test_state_round_trips_through_json() {
    let state = load_fixture();
    let json = serde_json::to_string(&state).unwrap();
    let back: ExecutionState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state);
}
