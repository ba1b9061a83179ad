//! xmlconv - markup/data conversion built on a streaming tokenizer
//!
//! Converts documents between markup (XML/XHTML/SVG/WSDL-style, XSD)
//! and data-interchange representations (JSON object model, YAML text).
//!
//! Pipeline: raw text -> Tokenizer -> token stream -> Object Builder ->
//! object model -> renderers / schema inference. The tokenizer is the
//! only component that reasons about character-level grammar; everything
//! downstream works on the key-ordered object model
//! (`serde_json::Value`).
//!
//! ```
//! use xmlconv::{xml_to_json, json_to_yaml, BuildOptions};
//!
//! let obj = xml_to_json("<shop><item>pen</item><item>ink</item></shop>",
//!                       &BuildOptions::default()).unwrap();
//! assert_eq!(json_to_yaml(&obj), "shop:\n  item:\n    - pen\n    - ink\n");
//! ```
//!
//! All conversions are synchronous, single-threaded and pure; the
//! `batch` module fans independent conversions out over Rayon.

pub mod batch;
pub mod builder;
pub mod core;
pub mod error;
pub mod render;
pub mod schema;

pub use crate::builder::{build, xml_to_json, BuildOptions, VALUE_KEY};
pub use crate::core::tokenizer::{
    tokenize, tokenize_with_observer, State, Token, TokenKind, Tokenizer,
};
pub use crate::error::{Error, Result};

use serde_json::Value;

/// Render an object model as indented markup text.
///
/// Inverse of [`xml_to_json`] under a matching attribute prefix: keys
/// carrying the prefix become attributes, the reserved `#text` key
/// becomes element text, arrays expand to repeated sibling elements.
/// An empty `root_name` takes the root element name from the value's
/// single top-level key.
pub fn json_to_xml(
    value: &Value,
    attribute_prefix: &str,
    root_name: &str,
    indent_width: usize,
) -> String {
    render::xml::render(value, attribute_prefix, root_name, indent_width)
}

/// Render an object model as block-style YAML text.
pub fn json_to_yaml(value: &Value) -> String {
    render::yaml::render(value)
}

/// Infer a JSON-Schema-shaped object model from the object model of an
/// XSD document (built with attribute prefix `@`). `source_path` is
/// used in diagnostics only.
pub fn xsd_to_json_schema(xsd: &Value, source_path: &str) -> Value {
    schema::infer(xsd, source_path)
}
