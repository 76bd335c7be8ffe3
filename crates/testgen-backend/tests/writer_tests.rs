use testgen_backend::{Bmv2TestBackend, PathBundle, TestSpec, TestgenConfig, WriteTest, WriterError};

fn load_bundle() -> PathBundle {
    PathBundle::from_json(include_str!("fixtures/ipv4_bundle.json")).unwrap()
}

fn render(id: &str, path: usize) -> Result<String, WriterError> {
    let bundle = load_bundle();
    let backend = Bmv2TestBackend::new(bundle.program.clone(), &TestgenConfig::with_backend(id)).unwrap();
    let spec: TestSpec = backend.run_path(&bundle.paths[path]).unwrap();
    backend.writer().render(&spec, 1)
}

#[test]
fn test_stf_forwarded_packet() {
    let stf = render("STF", 0).unwrap();
    let lines: Vec<&str> = stf.lines().collect();
    assert_eq!(lines[0], "# test_1");
    assert!(lines.contains(&"mirroring_add 5 7"));
    assert!(lines.contains(&"add ipv4_lpm 1 hdr.ipv4.dst:0x0a000001/24 forward(port:0x002)"));
    assert!(lines.contains(&"packet 0 0a000001abcd"));
    assert!(lines.contains(&"expect 2 0a000001**cd$"));
}

#[test]
fn test_stf_dropped_packet_has_no_expectation() {
    let stf = render("STF", 1).unwrap();
    assert!(stf.contains("packet 3 beef\n"));
    assert!(stf.contains("# packet dropped\n"));
    assert!(!stf.contains("expect"));
}

#[test]
fn test_ptf_marks_dont_care_bits() {
    let ptf = render("PTF", 0).unwrap();
    assert!(ptf.contains("class Test1(AbstractTest):"));
    assert!(ptf.contains(
        r#"self.table_add(("ipv4_lpm", [self.Lpm("hdr.ipv4.dst", 0x0a000001, 24)]), ("forward", [("port", 0x002)]), 1)"#
    ));
    assert!(ptf.contains(r#"testutils.send_packet(self, 0, bytes.fromhex("0a000001abcd"))"#));
    assert!(ptf.contains("exp_pkt.set_do_not_care(32, 8)"));
    assert!(ptf.contains("testutils.verify_packet(self, exp_pkt, 2)"));
}

#[test]
fn test_ptf_dropped_packet_verifies_silence() {
    let ptf = render("PTF", 1).unwrap();
    assert!(ptf.contains("testutils.verify_no_other_packets(self)"));
    assert!(ptf.contains("        pass\n"));
}

#[test]
fn test_protobuf_uses_runtime_ids() {
    let proto = render("PROTOBUF", 0).unwrap();
    assert!(proto.starts_with("# proto-file: p4testgen.proto\n"));
    assert!(proto.contains("table_id: 33554433"));
    assert!(proto.contains("field_id: 1"));
    assert!(proto.contains(r#"value: "\x0a\x00\x00\x01""#));
    assert!(proto.contains("prefix_len: 24"));
    assert!(proto.contains("action_id: 16777217"));
    assert!(proto.contains(r#"packet_mask: "\xff\xff\xff\xff\x00\xff""#));
    assert!(proto.contains("session_id: 5"));
    assert!(proto.contains("egress_port: 7"));
    assert!(proto.contains(r#"traces: "parser state start""#));
}

#[test]
fn test_protobuf_rejects_entities_missing_from_runtime_api() {
    let mut bundle = load_bundle();
    bundle.program.runtime_api.tables.clear();
    let backend = Bmv2TestBackend::new(bundle.program.clone(), &TestgenConfig::with_backend("PROTOBUF")).unwrap();
    let spec = backend.run_path(&bundle.paths[0]).unwrap();
    let err = backend.writer().render(&spec, 1).unwrap_err();
    assert!(matches!(
        err,
        WriterError::UnknownEntity { entity: "table", ref name, .. } if name == "ipv4_lpm"
    ));
}

#[test]
fn test_protobuf_ir_uses_names_and_hex() {
    let proto = render("PROTOBUF_IR", 0).unwrap();
    assert!(proto.contains(r#"table_name: "ipv4_lpm""#));
    assert!(proto.contains(r#"name: "hdr.ipv4.dst""#));
    assert!(proto.contains(r#"value: "0x0a000001""#));
    assert!(proto.contains("prefix_length: 24"));
    assert!(proto.contains(r#"packet_mask: "0xffffffff00ff""#));
    assert!(!proto.contains("table_id"));
}

#[test]
fn test_metadata_document() {
    let doc: serde_json::Value = serde_json::from_str(&render("METADATA", 0).unwrap()).unwrap();
    assert_eq!(doc["test_name"], "test_1");
    assert_eq!(doc["input_port"], 0);
    assert_eq!(doc["input_packet"], "0a000001abcd");
    assert_eq!(doc["dropped"], false);
    assert_eq!(
        doc["metadata"],
        serde_json::json!({ "inner.flag": "0x0", "x": "0x05" })
    );
    assert!(doc.get("seed").is_none());
}

#[test]
fn test_rendering_is_deterministic() {
    for id in ["PTF", "STF", "PROTOBUF", "PROTOBUF_IR", "METADATA"] {
        assert_eq!(render(id, 0).unwrap(), render(id, 0).unwrap(), "{id}");
    }
}
