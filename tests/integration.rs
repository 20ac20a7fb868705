//! Integration tests: compile scripts, then decode bytes with the `main` transform.

use bitscript::{
    compile_str, BinaryOp, DecodeError, Expression, NamedTransform, Primitive, Registry, Scope,
    Transform, Value,
};

const PASCAL_STRING: &str = r#"
transform pascal_string = struct {
    .len <- uint8;
    .data <- known_length(.len);
};

transform main = struct {
    .kind <- uint8;
    switch (.kind) {
        1: { .name <- pascal_string; };
        else: { .raw <- uint32le; };
    }
};
"#;

fn compile(src: &str) -> Transform {
    let mut diags = Vec::new();
    let main = compile_str(src, &Registry::builtin(), &mut diags).expect("compile");
    assert!(diags.is_empty(), "{:?}", diags);
    main
}

fn decode(main: &Transform, bytes: &[u8]) -> Result<Value, DecodeError> {
    main.apply(&Scope::default(), &Value::Bytes(bytes.to_vec()))
}

fn field<'a>(v: &'a Value, name: &str) -> &'a Value {
    v.member(name)
        .unwrap_or_else(|| panic!("missing field {} in {:?}", name, v))
}

fn names(v: &Value) -> Vec<&str> {
    v.as_struct()
        .expect("struct")
        .iter()
        .map(|(k, _)| k.as_str())
        .collect()
}

#[test]
fn test_decode_pascal_string_case() {
    let main = compile(PASCAL_STRING);
    let v = decode(&main, &[1, 3, b'a', b'b', b'c']).expect("decode");
    assert_eq!(names(&v), vec!["kind", "name"]);
    let name = field(&v, "name");
    assert_eq!(field(name, "len"), &Value::Integer(3));
    assert_eq!(field(name, "data").as_bytes(), Some(&b"abc"[..]));
}

#[test]
fn test_decode_else_case() {
    let main = compile(PASCAL_STRING);
    let v = decode(&main, &[9, 0x78, 0x56, 0x34, 0x12]).expect("decode");
    assert_eq!(names(&v), vec!["kind", "raw"]);
    assert_eq!(field(&v, "raw").as_i64(), Some(0x1234_5678));
}

#[test]
fn test_decode_rejects_trailing_bytes() {
    let main = compile(PASCAL_STRING);
    assert_eq!(
        decode(&main, &[1, 0, 0xff]),
        Err(DecodeError::TrailingBytes {
            consumed: 2,
            total: 3
        })
    );
}

#[test]
fn test_decode_short_input() {
    let main = compile(PASCAL_STRING);
    assert!(matches!(
        decode(&main, &[1, 5, b'a']),
        Err(DecodeError::ShortInput { .. })
    ));
}

#[test]
fn test_switch_matches_if_chain() {
    let switch_form = compile(
        r#"
transform main = struct {
    .tag <- uint8;
    switch (.tag) {
        1: { .a <- uint8; };
        else: { .b <- uint16be; };
    }
};
"#,
    );

    // struct { .tag <- uint8; if (.tag == 1) { .a <- uint8; } else { .b <- uint16be; } }
    let member = |name: &str, p: Primitive| NamedTransform {
        name: Some(name.to_string()),
        transform: Transform::primitive(p),
    };
    let condition = Expression::binary(
        BinaryOp::Equals,
        Expression::member(Expression::current_node(), "tag".to_string()),
        Expression::constant(Value::Integer(1)),
    );
    let if_form = Transform::new_struct(vec![
        member("tag", Primitive::Uint8),
        NamedTransform {
            name: None,
            transform: Transform::if_else(
                condition,
                Transform::new_struct(vec![member("a", Primitive::Uint8)]),
                Transform::new_struct(vec![member("b", Primitive::Uint16Be)]),
            ),
        },
    ]);

    for input in [&[1u8, 7][..], &[2, 0, 7][..]] {
        let expected = decode(&if_form, input).expect("decode");
        assert_eq!(decode(&switch_form, input), Ok(expected));
    }
}

#[test]
fn test_switch_without_match_fails_at_decode() {
    let main = compile(
        r#"
transform main = struct {
    .tag <- uint8;
    switch (.tag) { 1: { .a <- uint8; }; 2: { .b <- uint8; }; }
};
"#,
    );
    assert!(decode(&main, &[2, 5]).is_ok());
    assert_eq!(decode(&main, &[3, 5]), Err(DecodeError::NoMatch));
}

#[test]
fn test_if_inside_struct_without_else() {
    let main = compile(
        r#"
transform main = struct {
    .flag <- uint8 <- nonzero_boolean;
    if (.flag) { .extra <- uint8; }
    .tail <- uint8;
};
"#,
    );
    let with = decode(&main, &[1, 0xaa, 0xbb]).expect("decode");
    assert_eq!(names(&with), vec!["flag", "extra", "tail"]);
    let without = decode(&main, &[0, 0xbb]).expect("decode");
    assert_eq!(names(&without), vec!["flag", "tail"]);
    assert_eq!(field(&without, "flag"), &Value::Boolean(false));
}

#[test]
fn test_composition_runs_left_to_right() {
    let main = compile("transform main = known_length(2) <- uint16be;");
    assert_eq!(decode(&main, &[1, 2]), Ok(Value::Integer(0x0102)));

    let reversed = compile("transform main = uint16be <- known_length(2);");
    assert!(matches!(
        decode(&reversed, &[1, 2]),
        Err(DecodeError::TypeMismatch { .. })
    ));
}

#[test]
fn test_composed_member_consumes_first_stage_prefix() {
    let main = compile(
        r#"
transform main = struct {
    .name <- zero_terminated <- ascii;
    .value <- known_length(2) <- uint16le;
    .rest <- uint8;
};
"#,
    );
    let v = decode(&main, b"hi\0\x01\x02\x03").expect("decode");
    assert_eq!(field(&v, "name").as_str(), Some("hi"));
    assert_eq!(field(&v, "value").as_i64(), Some(0x0201));
    assert_eq!(field(&v, "rest").as_i64(), Some(3));
}

#[test]
fn test_arguments_bind_by_position() {
    let main = compile(
        r#"
transform pick(first, second) = struct {
    .a <- known_length(first);
    .b <- known_length(second);
};
transform main = struct {
    .x <- pick(1, 3);
};
"#,
    );
    let v = decode(&main, &[1, 2, 3, 4]).expect("decode");
    let x = field(&v, "x");
    assert_eq!(field(x, "a").as_bytes(), Some(&[1u8][..]));
    assert_eq!(field(x, "b").as_bytes(), Some(&[2u8, 3, 4][..]));
}

#[test]
fn test_anonymous_struct_member_merges_fields() {
    let main = compile(
        r#"
transform header = struct { .version <- uint8; .flags <- uint8; };
transform main = struct {
    <- header;
    .body <- uint8;
};
"#,
    );
    let v = decode(&main, &[2, 0, 9]).expect("decode");
    assert_eq!(names(&v), vec!["version", "flags", "body"]);
}

#[test]
fn test_anonymous_member_must_be_struct() {
    let main = compile("transform main = struct { <- uint8; };");
    assert!(matches!(
        decode(&main, &[1]),
        Err(DecodeError::TypeMismatch { .. })
    ));
}

#[test]
fn test_nested_struct_sees_enclosing_fields() {
    let main = compile(
        r#"
transform body = struct { .data <- known_length(.len); };
transform main = struct {
    .len <- uint8;
    .body <- body;
};
"#,
    );
    let v = decode(&main, &[2, 7, 8]).expect("decode");
    let body = field(&v, "body");
    assert_eq!(names(body), vec!["data"]);
    assert_eq!(field(body, "data").as_bytes(), Some(&[7u8, 8][..]));
}

#[test]
fn test_lexical_noise_does_not_change_decoding() {
    let plain = compile(PASCAL_STRING);
    let noisy = compile(&PASCAL_STRING.replace(";\n", "; # done\n\n").replace("    ", "\t\t  "));
    for input in [&[1u8, 2, b'h', b'i'][..], &[0, 1, 2, 3, 4][..]] {
        assert_eq!(decode(&plain, input), decode(&noisy, input));
    }
}

#[test]
fn test_invalid_primitive_fails() {
    let main = compile("transform main = struct { .a <- uint8; <- invalid; };");
    assert_eq!(decode(&main, &[1]), Err(DecodeError::NoMatch));
}
