//! Format decoded values for display.

use crate::value::Value;

/// Scalar string for leaf values.
pub fn format_scalar(v: &Value) -> String {
    match v {
        Value::Boolean(x) => format!("{}", x),
        Value::Integer(x) => format!("{}", x),
        Value::String(s) => format!("{:?}", s),
        Value::Bytes(b) => format!("hex({})", hex_string(b)),
        Value::Struct(_) => "struct".to_string(),
    }
}

fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// Multi-line rendering; struct fields keep their decoded order.
pub fn value_to_dump(v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match v {
        Value::Struct(fields) if fields.is_empty() => format!("{}struct {{}}", pad),
        Value::Struct(fields) => {
            let mut lines: Vec<String> = vec![format!("{}struct {{", pad)];
            for (k, val) in fields {
                let sub = value_to_dump(val, indent + 1);
                lines.push(format!("{}  {}: {}", pad, k, sub.trim_start()));
            }
            lines.push(format!("{}}}", pad));
            lines.join("\n")
        }
        leaf => format!("{}{}", pad, format_scalar(leaf)),
    }
}

/// First line of [`value_to_dump`].
pub fn value_summary_line(v: &Value) -> String {
    let full = value_to_dump(v, 0);
    full.lines().next().map(|s| s.trim().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_struct_dump() {
        let v = Value::Struct(vec![
            ("b".to_string(), Value::Integer(2)),
            (
                "a".to_string(),
                Value::Struct(vec![("x".to_string(), Value::Bytes(vec![0xab, 1]))]),
            ),
        ]);
        assert_eq!(
            value_to_dump(&v, 0),
            "struct {\n  b: 2\n  a: struct {\n    x: hex(ab 01)\n  }\n}"
        );
        assert_eq!(value_summary_line(&v), "struct {");
    }

    #[test]
    fn leaves() {
        assert_eq!(format_scalar(&Value::String("hi".into())), "\"hi\"");
        assert_eq!(value_to_dump(&Value::empty_struct(), 1), "  struct {}");
    }
}
