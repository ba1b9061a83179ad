//! Object model to YAML renderer
//!
//! Emits block-style YAML: mappings as `key: value` lines, nested
//! mappings indented two spaces, sequences as `- ` items (mapping items
//! begin on the dash line). Strings are quoted only when a bare scalar
//! would be ambiguous. Output is a pure function of the input value, so
//! rendering is deterministic and idempotent.

use serde_json::Value;

/// Render an object model as block-style YAML text.
pub fn render(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) if !map.is_empty() => write_mapping(&mut out, map, 0, false),
        Value::Array(items) if !items.is_empty() => write_sequence(&mut out, items, 0),
        other => {
            out.push_str(&scalar_text(other));
            out.push('\n');
        }
    }
    out
}

fn write_mapping(
    out: &mut String,
    map: &serde_json::Map<String, Value>,
    level: usize,
    inline_first: bool,
) {
    for (i, (key, value)) in map.iter().enumerate() {
        if !(inline_first && i == 0) {
            indent(out, level);
        }
        out.push_str(&quote_if_needed(key));
        out.push(':');
        match value {
            Value::Object(child) if !child.is_empty() => {
                out.push('\n');
                write_mapping(out, child, level + 1, false);
            }
            Value::Array(items) if !items.is_empty() => {
                out.push('\n');
                write_sequence(out, items, level + 1);
            }
            other => {
                out.push(' ');
                out.push_str(&scalar_text(other));
                out.push('\n');
            }
        }
    }
}

fn write_sequence(out: &mut String, items: &[Value], level: usize) {
    for item in items {
        indent(out, level);
        out.push('-');
        match item {
            Value::Object(map) if !map.is_empty() => {
                out.push(' ');
                // Continuation keys align under the first one
                write_mapping(out, map, level + 1, true);
            }
            Value::Array(nested) if !nested.is_empty() => {
                out.push('\n');
                write_sequence(out, nested, level + 1);
            }
            other => {
                out.push(' ');
                out.push_str(&scalar_text(other));
                out.push('\n');
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_if_needed(s),
        Value::Object(_) => "{}".to_string(),
        Value::Array(_) => "[]".to_string(),
    }
}

/// Quote a string scalar when a bare rendering would be ambiguous.
fn quote_if_needed(s: &str) -> String {
    if !needs_quoting(s) {
        return s.to_string();
    }
    if s.chars().any(|c| c.is_control()) {
        // Double-quoted style for strings with control characters
        let mut quoted = String::with_capacity(s.len() + 2);
        quoted.push('"');
        for c in s.chars() {
            match c {
                '"' => quoted.push_str("\\\""),
                '\\' => quoted.push_str("\\\\"),
                '\n' => quoted.push_str("\\n"),
                '\t' => quoted.push_str("\\t"),
                '\r' => quoted.push_str("\\r"),
                c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
                c => quoted.push(c),
            }
        }
        quoted.push('"');
        quoted
    } else {
        // Single-quoted style; embedded quotes double
        let mut quoted = String::with_capacity(s.len() + 2);
        quoted.push('\'');
        for c in s.chars() {
            if c == '\'' {
                quoted.push('\'');
            }
            quoted.push(c);
        }
        quoted.push('\'');
        quoted
    }
}

fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    let first = s.chars().next().expect("non-empty");
    if first.is_whitespace() || s.ends_with(char::is_whitespace) {
        return true;
    }
    // Leading YAML indicator characters
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return true;
    }
    if s.contains(": ") || s.ends_with(':') || s.contains(" #") {
        return true;
    }
    if s.chars().any(|c| c.is_control()) {
        return true;
    }
    // Strings a YAML parser would read as a different scalar type
    matches!(s, "true" | "false" | "null" | "~" | "yes" | "no" | "on" | "off")
        || s.parse::<f64>().is_ok()
}

#[inline]
fn indent(out: &mut String, level: usize) {
    for _ in 0..level * 2 {
        out.push(' ');
    }
}
