//! Object model renderers
//!
//! - xml: object model back to indented markup (inverse of the builder)
//! - yaml: object model to block-style YAML text

pub mod xml;
pub mod yaml;
