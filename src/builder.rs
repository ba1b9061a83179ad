//! Object Builder - token stream to object model
//!
//! Consumes the tokenizer's output and assembles a nested, key-ordered
//! object model (`serde_json::Value` with insertion-ordered maps):
//! - attribute keys get the configured prefix
//! - repeated sibling element names collapse into one ordered array
//! - element text lands bare or under the reserved `#text` key,
//!   depending on options and element shape
//! - comments, processing instructions and declarations do not appear
//!
//! The builder maintains a stack of in-progress nodes mirroring element
//! nesting; the tokenizer already guarantees balance for streams it
//! produced, so stack underflow only arises for caller-built streams.

use crate::core::entities::{decode_entity, decode_text};
use crate::core::tokenizer::{tokenize, Token, TokenKind};
use crate::error::{Error, Result};
use serde_json::{Map, Number, Value};

/// Reserved key holding an element's text content when it cannot be
/// merged bare (attributes/children present, or `value_property` set).
pub const VALUE_KEY: &str = "#text";

/// Options controlling object assembly. All independent, all off by
/// default.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Prefix prepended to attribute keys ("" leaves attributes
    /// indistinguishable from child elements by key alone).
    pub attribute_prefix: String,
    /// When set, element text is always stored under [`VALUE_KEY`]
    /// instead of collapsing text-only elements to a bare scalar.
    pub value_property: bool,
    /// When set, text values that lexically match a number or boolean
    /// literal become typed scalars.
    pub coerce_types: bool,
}

impl BuildOptions {
    /// Options with the given attribute prefix and everything else
    /// default.
    pub fn with_prefix(prefix: &str) -> Self {
        BuildOptions {
            attribute_prefix: prefix.to_string(),
            ..Default::default()
        }
    }
}

/// An element being assembled: its accumulated members and pending text.
struct Frame {
    name: String,
    map: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: &str) -> Self {
        Frame {
            name: name.to_string(),
            map: Map::new(),
            text: String::new(),
        }
    }
}

/// Convert markup text to the object model.
///
/// The result is an object with one key per top-level element (a
/// well-formed document has exactly one). Malformed input is reported
/// as [`Error::Malformed`]; no partial object model is returned.
pub fn xml_to_json(xml: &str, options: &BuildOptions) -> Result<Value> {
    let tokens = tokenize(xml)?;
    build(tokens, options)
}

/// Assemble an object model from a token stream.
pub fn build<'a, I>(tokens: I, options: &BuildOptions) -> Result<Value>
where
    I: IntoIterator<Item = Token<'a>>,
{
    // Bottom frame receives top-level elements; document-level text
    // (usually inter-markup whitespace) is discarded with it.
    let mut stack: Vec<Frame> = vec![Frame::new("")];
    let mut pending_attr: Option<&'a str> = None;

    for token in tokens {
        match token.kind {
            TokenKind::ElementOpenStart => stack.push(Frame::new(token.lexeme)),
            TokenKind::ElementOpenEnd => {}
            TokenKind::AttributeName => pending_attr = Some(token.lexeme),
            TokenKind::AttributeValue => {
                let name = pending_attr.take().ok_or_else(|| {
                    Error::UnbalancedTokens("attribute value without attribute name".into())
                })?;
                let top = stack.last_mut().expect("stack is never empty");
                let key = format!("{}{}", options.attribute_prefix, name);
                let value = scalar(&decode_text(token.lexeme), options);
                top.map.insert(key, value);
            }
            TokenKind::Text => {
                stack
                    .last_mut()
                    .expect("stack is never empty")
                    .text
                    .push_str(token.lexeme);
            }
            TokenKind::CData => {
                // CDATA content is literal; no entity decoding
                stack
                    .last_mut()
                    .expect("stack is never empty")
                    .text
                    .push_str(token.lexeme);
            }
            TokenKind::EntityReference => {
                let top = stack.last_mut().expect("stack is never empty");
                match decode_entity(token.lexeme) {
                    Some(decoded) => top.text.push_str(&decoded),
                    // Unknown reference stays as written
                    None => {
                        top.text.push('&');
                        top.text.push_str(token.lexeme);
                        top.text.push(';');
                    }
                }
            }
            TokenKind::ElementClose | TokenKind::ElementSelfClose => {
                if stack.len() < 2 {
                    return Err(Error::UnbalancedTokens(format!(
                        "close of <{}> without matching open",
                        token.lexeme
                    )));
                }
                let frame = stack.pop().expect("checked above");
                let name = frame.name.clone();
                let value = finalize(frame, options);
                let parent = stack.last_mut().expect("checked above");
                insert_child(&mut parent.map, name, value);
            }
            TokenKind::Comment | TokenKind::ProcessingInstruction | TokenKind::Declaration => {}
        }
    }

    if stack.len() != 1 {
        let open: Vec<&str> = stack[1..].iter().map(|f| f.name.as_str()).collect();
        return Err(Error::UnbalancedTokens(format!(
            "unclosed elements: {}",
            open.join(", ")
        )));
    }

    let root = stack.pop().expect("checked above");
    tracing::debug!(members = root.map.len(), "built object model");
    Ok(Value::Object(root.map))
}

/// Apply the text/value-key policy and close out a frame.
fn finalize(frame: Frame, options: &BuildOptions) -> Value {
    // Inter-element indentation is not content
    let text = frame.text.trim();

    if frame.map.is_empty() && !options.value_property {
        // Text-only (or empty) element collapses to its scalar
        return scalar(text, options);
    }

    let mut map = frame.map;
    if !text.is_empty() {
        map.insert(VALUE_KEY.to_string(), scalar(text, options));
    }
    if map.is_empty() {
        // Empty element under value_property: same shape as without
        return Value::String(String::new());
    }
    Value::Object(map)
}

/// Insert a finalized child, collapsing repeated sibling names into an
/// ordered sequence (order of first appearance is preserved).
fn insert_child(parent: &mut Map<String, Value>, name: String, value: Value) {
    match parent.get_mut(&name) {
        None => {
            parent.insert(name, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(slot) => {
            let first = slot.take();
            *slot = Value::Array(vec![first, value]);
        }
    }
}

/// Make a leaf value from text, applying coercion when enabled.
fn scalar(text: &str, options: &BuildOptions) -> Value {
    if options.coerce_types {
        match text {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        if is_number_literal(text) {
            if !text.contains('.') {
                if let Ok(n) = text.parse::<i64>() {
                    return Value::Number(Number::from(n));
                }
            }
            if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
                return Value::Number(n);
            }
        }
    }
    Value::String(text.to_string())
}

/// Match `-?[0-9]+(\.[0-9]+)?` exactly.
fn is_number_literal(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = usize::from(bytes.first() == Some(&b'-'));
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == int_start {
        return false;
    }
    if i == bytes.len() {
        return true;
    }
    if bytes[i] != b'.' {
        return false;
    }
    i += 1;
    let frac_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i > frac_start && i == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_document() {
        let obj = xml_to_json("<root><name>widget</name></root>", &BuildOptions::default()).unwrap();
        assert_eq!(obj, json!({"root": {"name": "widget"}}));
    }

    #[test]
    fn test_sibling_collapse() {
        let obj = xml_to_json(
            "<root><item>1</item><item>2</item></root>",
            &BuildOptions::default(),
        )
        .unwrap();
        assert_eq!(obj, json!({"root": {"item": ["1", "2"]}}));
    }

    #[test]
    fn test_sibling_collapse_coerced() {
        let options = BuildOptions {
            coerce_types: true,
            ..Default::default()
        };
        let obj = xml_to_json("<root><item>1</item><item>2</item></root>", &options).unwrap();
        assert_eq!(obj, json!({"root": {"item": [1, 2]}}));
    }

    #[test]
    fn test_three_siblings_stay_ordered() {
        let obj = xml_to_json(
            "<r><x>a</x><x>b</x><x>c</x></r>",
            &BuildOptions::default(),
        )
        .unwrap();
        assert_eq!(obj, json!({"r": {"x": ["a", "b", "c"]}}));
    }

    #[test]
    fn test_attribute_prefix_and_value_property() {
        let options = BuildOptions {
            attribute_prefix: "@".to_string(),
            value_property: true,
            ..Default::default()
        };
        let obj = xml_to_json(r#"<a x="1">text</a>"#, &options).unwrap();
        assert_eq!(obj, json!({"a": {"@x": "1", "#text": "text"}}));
    }

    #[test]
    fn test_text_with_attributes_without_value_property() {
        // Text cannot merge bare into a map, so the reserved key is used
        let options = BuildOptions::with_prefix("@");
        let obj = xml_to_json(r#"<a x="1">text</a>"#, &options).unwrap();
        assert_eq!(obj, json!({"a": {"@x": "1", "#text": "text"}}));
    }

    #[test]
    fn test_text_only_element_collapses() {
        let obj = xml_to_json("<a>text</a>", &BuildOptions::default()).unwrap();
        assert_eq!(obj, json!({"a": "text"}));
    }

    #[test]
    fn test_value_property_wraps_text_only_element() {
        let options = BuildOptions {
            value_property: true,
            ..Default::default()
        };
        let obj = xml_to_json("<a>text</a>", &options).unwrap();
        assert_eq!(obj, json!({"a": {"#text": "text"}}));
    }

    #[test]
    fn test_empty_element_forms_are_equivalent() {
        let options = BuildOptions::default();
        let self_closed = xml_to_json("<a/>", &options).unwrap();
        let explicit = xml_to_json("<a></a>", &options).unwrap();
        assert_eq!(self_closed, explicit);
        assert_eq!(self_closed, json!({"a": ""}));
    }

    #[test]
    fn test_coercion_disabled_keeps_text() {
        let obj = xml_to_json("<a><n>42</n><b>true</b></a>", &BuildOptions::default()).unwrap();
        assert_eq!(obj, json!({"a": {"n": "42", "b": "true"}}));
    }

    #[test]
    fn test_coercion_enabled() {
        let options = BuildOptions {
            coerce_types: true,
            ..Default::default()
        };
        let obj = xml_to_json(
            "<a><n>42</n><f>-2.5</f><b>true</b><s>4x</s><v>1.2.3</v></a>",
            &options,
        )
        .unwrap();
        assert_eq!(
            obj,
            json!({"a": {"n": 42, "f": -2.5, "b": true, "s": "4x", "v": "1.2.3"}})
        );
    }

    #[test]
    fn test_coercion_applies_to_attributes() {
        let options = BuildOptions {
            attribute_prefix: "@".to_string(),
            coerce_types: true,
            ..Default::default()
        };
        let obj = xml_to_json(r#"<a count="3"/>"#, &options).unwrap();
        assert_eq!(obj, json!({"a": {"@count": 3}}));
    }

    #[test]
    fn test_whitespace_between_elements_is_not_content() {
        let obj = xml_to_json(
            "<root>\n  <item>1</item>\n  <item>2</item>\n</root>",
            &BuildOptions::default(),
        )
        .unwrap();
        assert_eq!(obj, json!({"root": {"item": ["1", "2"]}}));
    }

    #[test]
    fn test_comments_and_pis_ignored() {
        let obj = xml_to_json(
            "<?xml version=\"1.0\"?><root><!-- note --><a>1</a></root>",
            &BuildOptions::default(),
        )
        .unwrap();
        assert_eq!(obj, json!({"root": {"a": "1"}}));
    }

    #[test]
    fn test_entities_decoded_in_text_and_attributes() {
        let options = BuildOptions::with_prefix("@");
        let obj = xml_to_json(r#"<a note="x &lt; y">1 &amp; 2</a>"#, &options).unwrap();
        assert_eq!(obj, json!({"a": {"@note": "x < y", "#text": "1 & 2"}}));
    }

    #[test]
    fn test_cdata_is_literal() {
        let obj = xml_to_json("<a><![CDATA[1 < 2 & 3]]></a>", &BuildOptions::default()).unwrap();
        assert_eq!(obj, json!({"a": "1 < 2 & 3"}));
    }

    #[test]
    fn test_nested_structure() {
        let obj = xml_to_json(
            "<shop><item><name>pen</name><price>2</price></item></shop>",
            &BuildOptions::default(),
        )
        .unwrap();
        assert_eq!(
            obj,
            json!({"shop": {"item": {"name": "pen", "price": "2"}}})
        );
    }

    #[test]
    fn test_malformed_input_propagates() {
        assert!(matches!(
            xml_to_json("<a><b></a>", &BuildOptions::default()),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_unbalanced_caller_stream() {
        let tokens = vec![Token {
            kind: TokenKind::ElementClose,
            lexeme: "a",
        }];
        assert!(matches!(
            build(tokens, &BuildOptions::default()),
            Err(Error::UnbalancedTokens(_))
        ));
    }

    #[test]
    fn test_unclosed_caller_stream() {
        let tokens = vec![
            Token {
                kind: TokenKind::ElementOpenStart,
                lexeme: "a",
            },
            Token {
                kind: TokenKind::ElementOpenEnd,
                lexeme: "a",
            },
        ];
        assert!(matches!(
            build(tokens, &BuildOptions::default()),
            Err(Error::UnbalancedTokens(_))
        ));
    }

    #[test]
    fn test_number_literal() {
        assert!(is_number_literal("0"));
        assert!(is_number_literal("-17"));
        assert!(is_number_literal("3.14"));
        assert!(!is_number_literal(""));
        assert!(!is_number_literal("-"));
        assert!(!is_number_literal("1."));
        assert!(!is_number_literal(".5"));
        assert!(!is_number_literal("1.2.3"));
        assert!(!is_number_literal("1e5"));
    }
}
