//! Object model to markup renderer
//!
//! Walks an object model and re-emits indented markup, inverting the
//! builder's key conventions: prefixed keys become attributes on the
//! enclosing open tag (insertion order preserved), the reserved value
//! key becomes element text, arrays expand to repeated sibling
//! elements, and everything else becomes a child element.

use crate::builder::VALUE_KEY;
use crate::core::entities::encode_text;
use serde_json::Value;

/// Render an object model as markup text.
///
/// When `root_name` is empty and the value is a single-key object (the
/// shape the builder produces), that key names the root element.
/// Indentation is `indent_width` spaces per nesting depth.
pub fn render(value: &Value, attribute_prefix: &str, root_name: &str, indent_width: usize) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) if root_name.is_empty() && map.len() == 1 => {
            let (name, child) = map.iter().next().expect("len checked");
            write_element(&mut out, name, child, attribute_prefix, indent_width, 0);
        }
        _ => {
            let name = if root_name.is_empty() { "root" } else { root_name };
            write_element(&mut out, name, value, attribute_prefix, indent_width, 0);
        }
    }
    out
}

fn write_element(
    out: &mut String,
    name: &str,
    value: &Value,
    prefix: &str,
    indent_width: usize,
    depth: usize,
) {
    match value {
        // A sequence expands into repeated sibling elements
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                write_element(out, name, item, prefix, indent_width, depth);
            }
        }
        Value::Object(map) => {
            indent(out, indent_width, depth);
            out.push('<');
            out.push_str(name);

            let mut text: Option<&Value> = None;
            let mut children: Vec<(&String, &Value)> = Vec::new();
            for (key, member) in map {
                if key == VALUE_KEY {
                    text = Some(member);
                } else if !prefix.is_empty() && key.starts_with(prefix) {
                    out.push(' ');
                    out.push_str(&key[prefix.len()..]);
                    out.push_str("=\"");
                    out.push_str(&encode_text(&scalar_text(member)));
                    out.push('"');
                } else {
                    children.push((key, member));
                }
            }

            if text.is_none() && children.is_empty() {
                out.push_str("/>");
                return;
            }

            out.push('>');
            if let Some(text) = text {
                out.push_str(&encode_text(&scalar_text(text)));
            }
            if children.is_empty() {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
                return;
            }
            for (key, child) in children {
                out.push('\n');
                write_element(out, key, child, prefix, indent_width, depth + 1);
            }
            out.push('\n');
            indent(out, indent_width, depth);
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        // Scalar leaf; empty values render as self-closing tags
        _ => {
            indent(out, indent_width, depth);
            let text = scalar_text(value);
            if text.is_empty() {
                out.push('<');
                out.push_str(name);
                out.push_str("/>");
            } else {
                out.push('<');
                out.push_str(name);
                out.push('>');
                out.push_str(&encode_text(&text));
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Nested containers in scalar position (attribute values) fall
        // back to their JSON form
        other => other.to_string(),
    }
}

#[inline]
fn indent(out: &mut String, indent_width: usize, depth: usize) {
    for _ in 0..indent_width * depth {
        out.push(' ');
    }
}
