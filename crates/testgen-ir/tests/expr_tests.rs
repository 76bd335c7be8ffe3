use testgen_ir::parse::{parse_expr_json, parse_state_ref};
use testgen_ir::{Constant, Expr, OpKind, StateRef};

#[test]
fn test_parse_symbol() {
    let expr = parse_expr_json(r#"["sym", "hdr.ipv4.dst", 32]"#).unwrap();
    assert_eq!(expr, Expr::symbol("hdr.ipv4.dst", 32));
    assert_eq!(expr.width(), 32);
    assert!(!expr.is_concrete());
}

#[test]
fn test_parse_constant_hex_and_decimal() {
    let hex = parse_expr_json(r#"["const", 8, "0x2a"]"#).unwrap();
    let dec = parse_expr_json(r#"["const", 8, 42]"#).unwrap();
    assert_eq!(hex, dec);
    assert_eq!(hex, Expr::constant(8, 42));
    assert!(hex.is_concrete());
}

#[test]
fn test_parse_nested_operators() {
    let expr = parse_expr_json(
        r#"["mux", ["eq", ["sym", "port", 9], ["const", 9, 1]], ["const", 16, 7], ["sym", "x", 16]]"#,
    )
    .unwrap();
    match &expr {
        Expr::Op { op, args } => {
            assert_eq!(*op, OpKind::Mux);
            assert_eq!(args.len(), 3);
        }
        other => panic!("expected mux, got {other:?}"),
    }
    assert_eq!(expr.width(), 16);
    let symbols: Vec<String> = expr.symbols().into_iter().collect();
    assert_eq!(symbols, vec!["port".to_string(), "x".to_string()]);
}

#[test]
fn test_concat_width_is_sum_of_parts() {
    let expr = parse_expr_json(r#"["concat", ["sym", "a", 8], ["taint", 4], ["const", 4, 1]]"#).unwrap();
    assert_eq!(expr.width(), 16);
}

#[test]
fn test_predicates_are_one_bit() {
    let expr = parse_expr_json(r#"["neq", ["sym", "a", 32], ["const", 32, 0]]"#).unwrap();
    assert_eq!(expr.width(), 1);
}

#[test]
fn test_slice_rejects_reversed_bounds() {
    assert!(parse_expr_json(r#"["slice", ["sym", "a", 8], 1, 5]"#).is_err());
}

#[test]
fn test_unknown_operator_is_rejected() {
    let err = parse_expr_json(r#"["frobnicate", 1]"#).unwrap_err();
    assert!(err.to_string().contains("frobnicate"));
}

#[test]
fn test_invalid_json_is_rejected() {
    assert!(parse_expr_json("not json").is_err());
}

#[test]
fn test_expr_serializes_back_to_array_form() {
    let src = r#"["concat",["sym","a",8],["const",8,"0x01"]]"#;
    let expr = parse_expr_json(src).unwrap();
    assert_eq!(serde_json::to_string(&expr).unwrap(), src);
}

#[test]
fn test_state_ref_display_and_rooting() {
    let meta = StateRef::new("meta");
    let x = meta.member("x");
    assert_eq!(x.to_string(), "meta.x");
    assert!(x.is_rooted_at(&meta));
    assert!(!meta.is_rooted_at(&meta));
    assert!(!StateRef::new("metadata").member("x").is_rooted_at(&meta));
}

#[test]
fn test_state_ref_parse() {
    let r = parse_state_ref("hdr.ipv4.ttl").unwrap();
    assert_eq!(r.root(), "hdr");
    assert_eq!(r.segments().len(), 3);
    assert!(parse_state_ref("hdr..ttl").is_err());
    assert!(parse_state_ref("").is_err());
}

#[test]
fn test_constant_reduces_modulo_width() {
    let c = Constant::from_u64(4, 0x1f);
    assert_eq!(c.as_u64(), Some(0xf));
    assert_eq!(c, Constant::ones(4));
}

#[test]
fn test_constant_hex_is_padded_to_width() {
    assert_eq!(Constant::from_u64(32, 0x0a00_0001).to_hex(), "0a000001");
    assert_eq!(Constant::from_u64(9, 2).to_hex(), "002");
    assert_eq!(Constant::zero(1).to_hex(), "0");
}

#[test]
fn test_constant_arithmetic_wraps() {
    let a = Constant::from_u64(8, 250);
    let b = Constant::from_u64(8, 10);
    assert_eq!(a.wrapping_add(&b).as_u64(), Some(4));
    assert_eq!(b.wrapping_sub(&a).as_u64(), Some(16));
    assert_eq!(b.bitnot().as_u64(), Some(0xf5));
}

#[test]
fn test_constant_concat_and_slice() {
    let hi = Constant::from_u64(8, 0xab);
    let lo = Constant::from_u64(8, 0xcd);
    let joined = hi.concat(&lo);
    assert_eq!(joined.width(), 16);
    assert_eq!(joined.as_u64(), Some(0xabcd));
    assert_eq!(joined.slice(11, 4).as_u64(), Some(0xbc));
}

#[test]
fn test_wide_constant_round_trips_through_json() {
    let wide = Constant::parse(128, "0x20010db8000000000000000000000001").unwrap();
    assert_eq!(wide.as_u64(), None);
    let json = serde_json::to_string(&wide).unwrap();
    assert_eq!(json, r#"{"width":128,"value":"0x20010db8000000000000000000000001"}"#);
    let back: Constant = serde_json::from_str(&json).unwrap();
    assert_eq!(back, wide);
}
