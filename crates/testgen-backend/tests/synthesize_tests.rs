use std::collections::BTreeMap;

use testgen_backend::{
    create_test_spec, metadata_display_name, produce_base_test_info, BackendError, BackendKind, Bmv2ProgramInfo,
    Bmv2TestBackend, PathBundle, SynthesisError, TestBackend, TestgenConfig,
};
use testgen_ir::{Constant, Expr, StateRef};
use testgen_model::object::METADATA_COLLECTION;
use testgen_model::{ExecutionState, Model, ModelEvalError, TestObject, Value};

fn load_bundle() -> PathBundle {
    PathBundle::from_json(include_str!("fixtures/ipv4_bundle.json")).unwrap()
}

fn backend(id: &str, bundle: &PathBundle) -> Bmv2TestBackend {
    Bmv2TestBackend::new(bundle.program.clone(), &TestgenConfig::with_backend(id)).unwrap()
}

fn bits(width: u32, value: u64) -> Value {
    Value::Bits(Constant::from_u64(width, value))
}

fn parser_program() -> Bmv2ProgramInfo {
    let params = ["packet", "hdr", "meta", "standard_metadata"]
        .iter()
        .map(|p| StateRef::new(p))
        .collect();
    Bmv2ProgramInfo {
        block_params: BTreeMap::from([("Parser".to_string(), params)]),
        ..Bmv2ProgramInfo::default()
    }
}

/// `meta.x` is reported as `x`: the display name drops everything up to the
/// first separator, see `test_display_name_drops_first_segment_only`.
#[test]
fn test_metadata_mode_strips_up_to_first_separator() {
    let mut state = ExecutionState::new();
    state.set(StateRef::parse("meta.x").unwrap(), Expr::symbol("meta_x", 8));
    state.set(StateRef::parse("hdr.eth.dst").unwrap(), Expr::symbol("eth_dst", 48));
    let model = Model::new().with("meta_x", Constant::from_u64(8, 5));
    let info = produce_base_test_info(&state, &model, &Expr::constant(8, 0), &Expr::constant(9, 1), &[]).unwrap();

    let spec = create_test_spec(&state, &model, &info, BackendKind::Metadata, &parser_program()).unwrap();

    assert_eq!(spec.categories().collect::<Vec<_>>(), vec![METADATA_COLLECTION]);
    let collection = spec
        .test_object(METADATA_COLLECTION, METADATA_COLLECTION)
        .and_then(TestObject::as_metadata_collection)
        .unwrap();
    assert_eq!(collection.len(), 1);
    assert_eq!(collection.get("x"), Some(&bits(8, 5)));
}

#[test]
fn test_metadata_mode_never_evaluates_categories() {
    let bundle = load_bundle();
    let spec = backend("METADATA", &bundle).run_path(&bundle.paths[0]).unwrap();

    assert_eq!(spec.categories().collect::<Vec<_>>(), vec![METADATA_COLLECTION]);
    let collection = spec
        .test_object(METADATA_COLLECTION, METADATA_COLLECTION)
        .and_then(TestObject::as_metadata_collection)
        .unwrap();
    let names: Vec<&str> = collection.fields().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["inner.flag", "x"]);
    assert_eq!(collection.get("inner.flag"), Some(&bits(1, 0)));
}

#[test]
fn test_categorized_mode_never_collects_metadata() {
    let bundle = load_bundle();
    for id in ["PTF", "STF", "PROTOBUF", "PROTOBUF_IR"] {
        let spec = backend(id, &bundle).run_path(&bundle.paths[0]).unwrap();
        assert!(spec.test_object_category(METADATA_COLLECTION).is_none(), "{id}");
        assert_eq!(spec.categories().collect::<Vec<_>>(), vec!["clone_specs", "tables"], "{id}");
    }
}

#[test]
fn test_table_entry_is_concrete() {
    let bundle = load_bundle();
    let spec = backend("STF", &bundle).run_path(&bundle.paths[0]).unwrap();

    let tables = spec.test_object_category("tables").unwrap();
    assert_eq!(tables.len(), 1);
    let table = tables["ipv4_lpm"].as_table().unwrap();
    let rule = &table.rules[0];
    assert_eq!(
        serde_json::to_value(&rule.matches["hdr.ipv4.dst"]).unwrap(),
        serde_json::json!({
            "type": "lpm",
            "key": { "width": 32, "value": "0x0a000001" },
            "prefix_len": { "width": 32, "value": "0x00000018" }
        })
    );
    assert_eq!(rule.action.action_name, "forward");
    assert_eq!(rule.action.args[0].name, "port");
    assert_eq!(rule.action.args[0].value, bits(9, 2));
}

#[test]
fn test_forwarded_packet_has_masked_egress() {
    let bundle = load_bundle();
    let spec = backend("STF", &bundle).run_path(&bundle.paths[0]).unwrap();

    let ingress = spec.ingress_packet();
    assert_eq!(ingress.port(), &Constant::from_u64(9, 0));
    assert_eq!(ingress.payload(), &Constant::from_u64(48, 0x0a00_0001_abcd));
    assert_eq!(ingress.mask(), &Constant::from_u64(1, 1));

    let egress = spec.egress_packet().unwrap();
    assert_eq!(egress.port(), &Constant::from_u64(9, 2));
    assert_eq!(egress.payload(), &Constant::from_u64(48, 0x0a00_0001_00cd));
    assert_eq!(egress.mask(), &Constant::from_u64(48, 0xffff_ffff_00ff));
}

#[test]
fn test_dropped_packet_has_no_egress() {
    let bundle = load_bundle();
    let spec = backend("PTF", &bundle).run_path(&bundle.paths[1]).unwrap();

    assert!(spec.egress_packet().is_none());
    assert_eq!(spec.ingress_packet().port(), &Constant::from_u64(9, 3));
    assert_eq!(spec.ingress_packet().payload(), &Constant::from_u64(16, 0xbeef));
    assert_eq!(spec.categories().count(), 0);
}

#[test]
fn test_egress_presence_follows_drop_flag() {
    let bundle = load_bundle();
    let backend = backend("STF", &bundle);
    for path in &bundle.paths {
        let spec = backend.run_path(path).unwrap();
        assert_eq!(spec.egress_packet().is_some(), !path.state.is_dropped());
    }
}

#[test]
fn test_traces_are_evaluated() {
    let bundle = load_bundle();
    let spec = backend("STF", &bundle).run_path(&bundle.paths[0]).unwrap();
    assert_eq!(spec.traces().len(), 3);
    assert!(spec.traces().iter().all(|t| t.is_concrete()));
    assert_eq!(spec.traces()[2].to_string(), r#"egress port: ["const",9,"0x002"]"#);
}

#[test]
fn test_synthesis_is_deterministic() {
    let bundle = load_bundle();
    let backend = backend("PROTOBUF", &bundle);
    let first = backend.run_path(&bundle.paths[0]).unwrap().to_json().unwrap();
    let second = backend.run_path(&bundle.paths[0]).unwrap().to_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_adapter_returns_base_info_unchanged() {
    let bundle = load_bundle();
    let backend = backend("STF", &bundle);
    let path = &bundle.paths[0];
    let traces = path.state.trace_events();
    let adapted = backend
        .produce_test_info(&path.state, &path.model, &path.output_packet, &path.output_port, traces)
        .unwrap();
    let base =
        produce_base_test_info(&path.state, &path.model, &path.output_packet, &path.output_port, traces).unwrap();
    assert_eq!(adapted, base);
    assert_eq!(base.packet_taint_mask, Constant::from_u64(48, 0xffff_ffff_00ff));
    assert!(!base.packet_is_dropped);
}

#[test]
fn test_adapter_propagates_evaluation_errors() {
    let bundle = load_bundle();
    let mut path = bundle.paths[0].clone();
    path.model.assign("pkt_dst", Constant::from_u64(16, 1));
    let err = backend("STF", &bundle).run_path(&path).unwrap_err();
    assert!(matches!(
        err,
        BackendError::TestInfo(ModelEvalError::WidthMismatch { .. })
    ));
}

#[test]
fn test_failed_object_evaluation_aborts_the_spec() {
    let bundle = load_bundle();
    let mut path = bundle.paths[0].clone();
    path.model.assign("dst", Constant::from_u64(16, 1));
    let err = backend("STF", &bundle).run_path(&path).unwrap_err();
    assert!(matches!(
        err,
        BackendError::Synthesis(SynthesisError::Eval(ModelEvalError::WidthMismatch { .. }))
    ));
}

#[test]
fn test_missing_parser_parameter_is_an_error() {
    let bundle = load_bundle();
    let backend = Bmv2TestBackend::new(Bmv2ProgramInfo::default(), &TestgenConfig::with_backend("METADATA")).unwrap();
    let err = backend.run_path(&bundle.paths[0]).unwrap_err();
    assert_eq!(
        err,
        BackendError::Synthesis(SynthesisError::MissingBlockParam {
            block: "Parser".to_string(),
            index: 2,
        })
    );
}

#[test]
fn test_display_name_drops_first_segment_only() {
    assert_eq!(metadata_display_name("meta.x"), "x");
    assert_eq!(metadata_display_name("hdr.meta.x"), "meta.x");
    assert_eq!(metadata_display_name("x"), "x");
    assert_eq!(metadata_display_name(""), "");
}

#[test]
fn test_parallel_synthesis_keeps_path_order() {
    let bundle = load_bundle();
    let results = backend("STF", &bundle).synthesize_paths(&bundle.paths);
    assert_eq!(results.len(), 2);
    assert!(results[0].as_ref().unwrap().egress_packet().is_some());
    assert!(results[1].as_ref().unwrap().egress_packet().is_none());
}

#[test]
fn test_test_budget_skips_extra_paths() {
    let bundle = load_bundle();
    let mut config = TestgenConfig::with_backend("STF");
    config.backend.max_tests = 1;
    let backend = Bmv2TestBackend::new(bundle.program.clone(), &config).unwrap();
    let results = backend.synthesize_paths(&bundle.paths);
    assert_eq!(results.len(), 1);
    assert!(results[0].is_ok());
}

#[test]
fn test_failed_paths_do_not_use_up_the_test_budget() {
    let bundle = load_bundle();
    let mut paths = bundle.paths.clone();
    paths[0].model.assign("dst", Constant::from_u64(16, 1));
    let mut config = TestgenConfig::with_backend("STF");
    config.backend.max_tests = 1;
    let backend = Bmv2TestBackend::new(bundle.program.clone(), &config).unwrap();

    let results = backend.synthesize_paths(&paths);
    assert_eq!(results.len(), 2);
    assert!(results[0].is_err());
    let spec = results[1].as_ref().unwrap();
    assert!(spec.egress_packet().is_none());
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
}

#[test]
fn test_every_category_is_filed_under_its_spec_key() {
    let state: ExecutionState = serde_json::from_str(include_str!("fixtures/all_objects_state.json")).unwrap();
    let model = Model::new()
        .with("dst", Constant::from_u64(32, 0x0a00_0001))
        .with("fwd_port", Constant::from_u64(9, 2))
        .with("nhop", Constant::from_u64(32, 0xc0a8_0001))
        .with("clone_port", Constant::from_u64(9, 7))
        .with("color", Constant::from_u64(2, 1));
    let info = produce_base_test_info(
        &state,
        &model,
        &Expr::constant(8, 0),
        &Expr::constant(9, 1),
        state.trace_events(),
    )
    .unwrap();

    let spec = create_test_spec(&state, &model, &info, BackendKind::Protobuf, &parser_program()).unwrap();

    assert_eq!(
        spec.categories().collect::<Vec<_>>(),
        vec!["action_profiles", "action_selectors", "clone_specs", "meter_values", "tables"]
    );
    let names = |category: &str| -> Vec<String> {
        spec.test_object_category(category)
            .unwrap()
            .keys()
            .cloned()
            .collect()
    };
    assert_eq!(names("tables"), vec!["ipv4_lpm"]);
    assert_eq!(names("action_profiles"), vec!["ecmp_profile"]);
    assert_eq!(names("action_selectors"), vec!["ecmp_selector"]);
    assert_eq!(names("clone_specs"), vec!["5"]);
    assert_eq!(names("meter_values"), vec!["port_meter"]);

    let table = spec.test_object("tables", "ipv4_lpm").and_then(TestObject::as_table).unwrap();
    assert_eq!(table.rules[0].action.args[0].value, bits(9, 2));
    let profile = spec
        .test_object("action_profiles", "ecmp_profile")
        .and_then(TestObject::as_action_profile)
        .unwrap();
    assert_eq!(profile.actions[0].args[0].value, bits(32, 0xc0a8_0001));
    let selector = spec
        .test_object("action_selectors", "ecmp_selector")
        .and_then(TestObject::as_action_selector)
        .unwrap();
    assert_eq!(selector.action_profile.actions[0].args[0].value, bits(32, 0xc0a8_0001));
    let clone = spec.test_object("clone_specs", "5").and_then(TestObject::as_clone_spec).unwrap();
    assert_eq!(clone.clone_port, bits(9, 7));
    let meter = spec
        .test_object("meter_values", "port_meter")
        .and_then(TestObject::as_meter)
        .unwrap();
    assert_eq!(meter.entries[0].color, bits(2, 1));
    assert!(spec.test_object_category(METADATA_COLLECTION).is_none());
}

#[test]
fn test_program_info_lookups() {
    let program = load_bundle().program;
    assert_eq!(program.local_metadata(), Some(&StateRef::new("meta")));
    assert_eq!(program.block_param("Ingress", 0), Some(&StateRef::new("hdr")));
    assert!(program.block_param("Ingress", 3).is_none());
    assert!(program.block_param("Egress", 0).is_none());
    let table = program.runtime_api().table("ipv4_lpm").unwrap();
    assert_eq!(table.member_id("hdr.ipv4.dst"), Some(1));
    assert!(program.runtime_api().action("drop").is_none());
}
