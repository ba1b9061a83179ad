//! XSD to JSON Schema inference
//!
//! Walks the object model of an XSD document (built with attribute
//! prefix `@`) and emits a draft-04-shaped schema object: named
//! elements become `properties` entries, `minOccurs`/`maxOccurs` drive
//! `required` and array-vs-scalar shape, restrictions map to `type`
//! plus constraint keywords, and named top-level types land in
//! `definitions`.
//!
//! This is best-effort mapping, not XSD validation semantics:
//! unrecognized or unsupported constructs are skipped (with a debug
//! trace naming the source document), never escalated.

use serde_json::{json, Map, Number, Value};

const DRAFT_04: &str = "http://json-schema.org/draft-04/schema#";

/// Infer a JSON-Schema-shaped object model from an XSD object model.
///
/// `source_path` identifies the document in diagnostics only; it never
/// appears in the output.
pub fn infer(xsd: &Value, source_path: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("$schema".to_string(), json!(DRAFT_04));
    schema.insert("type".to_string(), json!("object"));

    let root = match find_schema_root(xsd) {
        Some(root) => root,
        None => {
            tracing::debug!(source = source_path, "no schema element found");
            return Value::Object(schema);
        }
    };

    let mut properties = Map::new();
    for element in members(root, "element") {
        if let Some((name, element_schema)) = map_element(element, source_path) {
            properties.insert(name, element_schema);
        }
    }

    let mut definitions = Map::new();
    for complex_type in members(root, "complexType") {
        if let Some(name) = attr(complex_type, "name") {
            definitions.insert(
                name.to_string(),
                complex_type_schema(complex_type, source_path),
            );
        }
    }
    for simple_type in members(root, "simpleType") {
        if let Some(name) = attr(simple_type, "name") {
            definitions.insert(
                name.to_string(),
                simple_type_schema(simple_type, source_path),
            );
        }
    }

    if !properties.is_empty() {
        schema.insert("properties".to_string(), Value::Object(properties));
    }
    if !definitions.is_empty() {
        schema.insert("definitions".to_string(), Value::Object(definitions));
    }
    Value::Object(schema)
}

/// Map one element declaration to a (name, schema) pair.
fn map_element(element: &Value, source_path: &str) -> Option<(String, Value)> {
    let name = match attr(element, "name") {
        Some(name) => name.to_string(),
        None => {
            // ref= and anonymous declarations are not mapped
            tracing::debug!(source = source_path, "skipping element without name");
            return None;
        }
    };

    let body = if let Some(type_name) = attr(element, "type") {
        named_type_schema(type_name)
    } else if let Some(complex_type) = members(element, "complexType").into_iter().next() {
        complex_type_schema(complex_type, source_path)
    } else if let Some(simple_type) = members(element, "simpleType").into_iter().next() {
        simple_type_schema(simple_type, source_path)
    } else {
        tracing::debug!(source = source_path, element = %name, "element has no mapped type");
        json!({})
    };

    // maxOccurs > 1 (or unbounded) turns the particle into an array
    let schema = match attr(element, "maxOccurs") {
        Some(max) if max == "unbounded" || max.parse::<u64>().map_or(false, |n| n > 1) => {
            let mut array = Map::new();
            array.insert("type".to_string(), json!("array"));
            array.insert("items".to_string(), body);
            if let Some(min) = attr(element, "minOccurs").and_then(|m| m.parse::<u64>().ok()) {
                if min > 0 {
                    array.insert("minItems".to_string(), json!(min));
                }
            }
            Value::Object(array)
        }
        _ => body,
    };

    Some((name, schema))
}

/// Schema for a complexType: child element particles become properties,
/// attribute declarations join them, minOccurs drives required.
fn complex_type_schema(complex_type: &Value, source_path: &str) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<Value> = Vec::new();

    for element in particle_elements(complex_type) {
        if let Some((name, schema)) = map_element(element, source_path) {
            // minOccurs defaults to 1; only an explicit 0 makes a
            // particle optional
            if attr(element, "minOccurs") != Some("0") {
                required.push(json!(name));
            }
            properties.insert(name, schema);
        }
    }

    for attribute in members(complex_type, "attribute") {
        if let Some(name) = attr(attribute, "name") {
            let schema = match attr(attribute, "type") {
                Some(type_name) => named_type_schema(type_name),
                None => json!({}),
            };
            if attr(attribute, "use") == Some("required") {
                required.push(json!(name));
            }
            properties.insert(name.to_string(), schema);
        }
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    if !properties.is_empty() {
        schema.insert("properties".to_string(), Value::Object(properties));
    }
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    Value::Object(schema)
}

/// Collect element particles from a complexType's model groups
/// (sequence/all/choice, including one level of nesting).
fn particle_elements(complex_type: &Value) -> Vec<&Value> {
    let mut elements = Vec::new();
    for group_name in ["sequence", "all", "choice"] {
        for group in members(complex_type, group_name) {
            elements.extend(members(group, "element"));
            for inner_name in ["sequence", "all", "choice"] {
                for inner in members(group, inner_name) {
                    elements.extend(members(inner, "element"));
                }
            }
        }
    }
    elements
}

/// Schema for a simpleType restriction: base type plus constraint
/// keywords.
fn simple_type_schema(simple_type: &Value, source_path: &str) -> Value {
    let restriction = match members(simple_type, "restriction").into_iter().next() {
        Some(restriction) => restriction,
        None => {
            // list/union and friends are not mapped
            tracing::debug!(source = source_path, "skipping simpleType without restriction");
            return json!({});
        }
    };

    let mut schema = match attr(restriction, "base") {
        Some(base) => match named_type_schema(base) {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        None => Map::new(),
    };
    let numeric = matches!(
        schema.get("type").and_then(Value::as_str),
        Some("integer") | Some("number")
    );

    let values: Vec<Value> = members(restriction, "enumeration")
        .into_iter()
        .filter_map(|facet| attr(facet, "value"))
        .map(|v| facet_value(v, numeric))
        .collect();
    if !values.is_empty() {
        schema.insert("enum".to_string(), Value::Array(values));
    }

    if let Some(pattern) = facet(restriction, "pattern") {
        schema.insert("pattern".to_string(), json!(pattern));
    }
    if let Some(min) = facet(restriction, "minInclusive") {
        schema.insert("minimum".to_string(), facet_value(min, numeric));
    }
    if let Some(max) = facet(restriction, "maxInclusive") {
        schema.insert("maximum".to_string(), facet_value(max, numeric));
    }
    if let Some(len) = facet(restriction, "length").and_then(|v| v.parse::<u64>().ok()) {
        schema.insert("minLength".to_string(), json!(len));
        schema.insert("maxLength".to_string(), json!(len));
    }
    if let Some(min) = facet(restriction, "minLength").and_then(|v| v.parse::<u64>().ok()) {
        schema.insert("minLength".to_string(), json!(min));
    }
    if let Some(max) = facet(restriction, "maxLength").and_then(|v| v.parse::<u64>().ok()) {
        schema.insert("maxLength".to_string(), json!(max));
    }

    Value::Object(schema)
}

/// Schema for a type reference: an XSD built-in maps to a JSON type,
/// anything else becomes a definitions reference.
fn named_type_schema(type_name: &str) -> Value {
    match local_name(type_name) {
        "string" | "normalizedString" | "token" | "anyURI" | "QName" | "NOTATION"
        | "base64Binary" | "hexBinary" | "duration" => json!({"type": "string"}),
        "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
        | "positiveInteger" | "negativeInteger" | "nonPositiveInteger" | "unsignedLong"
        | "unsignedInt" | "unsignedShort" | "unsignedByte" => json!({"type": "integer"}),
        "boolean" => json!({"type": "boolean"}),
        "decimal" | "float" | "double" => json!({"type": "number"}),
        "date" => json!({"type": "string", "format": "date"}),
        "dateTime" => json!({"type": "string", "format": "date-time"}),
        "time" => json!({"type": "string", "format": "time"}),
        other => json!({"$ref": format!("#/definitions/{other}")}),
    }
}

/// The value of a single-occurrence facet child, e.g. pattern.
fn facet<'v>(restriction: &'v Value, name: &str) -> Option<&'v str> {
    members(restriction, name)
        .into_iter()
        .next()
        .and_then(|f| attr(f, "value"))
}

/// Render a facet value in the base type's lexical space.
fn facet_value(text: &str, numeric: bool) -> Value {
    if numeric {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Number(Number::from(n));
        }
        if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    json!(text)
}

/// Find the schema element inside the document object model.
fn find_schema_root(xsd: &Value) -> Option<&Value> {
    let map = xsd.as_object()?;
    for (key, value) in map {
        if !key.starts_with('@') && local_name(key) == "schema" {
            return Some(value);
        }
    }
    // The caller may already hold the schema element's own content
    if !members(xsd, "element").is_empty() || !members(xsd, "complexType").is_empty() {
        return Some(xsd);
    }
    None
}

/// Child members matching an XSD local name, regardless of namespace
/// prefix; a collapsed sibling sequence is flattened.
fn members<'v>(node: &'v Value, local: &str) -> Vec<&'v Value> {
    let mut found = Vec::new();
    if let Some(map) = node.as_object() {
        for (key, value) in map {
            if key.starts_with('@') || local_name(key) != local {
                continue;
            }
            match value {
                Value::Array(items) => found.extend(items.iter()),
                single => found.push(single),
            }
        }
    }
    found
}

/// Attribute lookup under the `@` prefix convention.
fn attr<'v>(node: &'v Value, name: &str) -> Option<&'v str> {
    node.as_object()?.get(&format!("@{name}"))?.as_str()
}

/// Local part of a possibly prefixed name.
fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{xml_to_json, BuildOptions};
    use serde_json::json;

    fn xsd_object(xsd: &str) -> Value {
        xml_to_json(xsd, &BuildOptions::with_prefix("@")).unwrap()
    }

    #[test]
    fn test_minimal_element() {
        let xsd = xsd_object(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="age" type="xs:integer"/>
</xs:schema>"#,
        );
        let schema = infer(&xsd, "age.xsd");
        assert_eq!(schema["properties"]["age"], json!({"type": "integer"}));
        assert_eq!(schema["$schema"], json!(DRAFT_04));
    }

    #[test]
    fn test_complex_type_with_sequence() {
        let xsd = xsd_object(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="person">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="name" type="xs:string"/>
        <xs:element name="nick" type="xs:string" minOccurs="0"/>
        <xs:element name="email" type="xs:string" maxOccurs="unbounded"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
        );
        let schema = infer(&xsd, "person.xsd");
        let person = &schema["properties"]["person"];
        assert_eq!(person["type"], json!("object"));
        assert_eq!(person["properties"]["name"], json!({"type": "string"}));
        assert_eq!(
            person["properties"]["email"],
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert_eq!(person["required"], json!(["name", "email"]));
    }

    #[test]
    fn test_required_attribute() {
        let xsd = xsd_object(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="tag">
    <xs:complexType>
      <xs:attribute name="id" type="xs:integer" use="required"/>
      <xs:attribute name="note" type="xs:string"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
        );
        let schema = infer(&xsd, "tag.xsd");
        let tag = &schema["properties"]["tag"];
        assert_eq!(tag["properties"]["id"], json!({"type": "integer"}));
        assert_eq!(tag["required"], json!(["id"]));
    }

    #[test]
    fn test_simple_type_restriction() {
        let xsd = xsd_object(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="Color">
    <xs:restriction base="xs:string">
      <xs:enumeration value="red"/>
      <xs:enumeration value="green"/>
      <xs:enumeration value="blue"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#,
        );
        let schema = infer(&xsd, "color.xsd");
        assert_eq!(
            schema["definitions"]["Color"],
            json!({"type": "string", "enum": ["red", "green", "blue"]})
        );
    }

    #[test]
    fn test_numeric_bounds_and_pattern() {
        let xsd = xsd_object(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="Percent">
    <xs:restriction base="xs:integer">
      <xs:minInclusive value="0"/>
      <xs:maxInclusive value="100"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="Code">
    <xs:restriction base="xs:string">
      <xs:pattern value="[A-Z]{3}"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#,
        );
        let schema = infer(&xsd, "facets.xsd");
        assert_eq!(
            schema["definitions"]["Percent"],
            json!({"type": "integer", "minimum": 0, "maximum": 100})
        );
        assert_eq!(schema["definitions"]["Code"]["pattern"], json!("[A-Z]{3}"));
    }

    #[test]
    fn test_named_type_reference() {
        let xsd = xsd_object(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="status" type="Color"/>
  <xs:simpleType name="Color">
    <xs:restriction base="xs:string">
      <xs:enumeration value="red"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#,
        );
        let schema = infer(&xsd, "ref.xsd");
        assert_eq!(
            schema["properties"]["status"],
            json!({"$ref": "#/definitions/Color"})
        );
        assert!(schema["definitions"]["Color"].is_object());
    }

    #[test]
    fn test_unsupported_constructs_are_skipped() {
        let xsd = xsd_object(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:import namespace="urn:other"/>
  <xs:element name="kept" type="xs:string"/>
</xs:schema>"#,
        );
        let schema = infer(&xsd, "import.xsd");
        assert_eq!(schema["properties"]["kept"], json!({"type": "string"}));
    }

    #[test]
    fn test_date_formats() {
        let xsd = xsd_object(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="born" type="xs:date"/>
  <xs:element name="seen" type="xs:dateTime"/>
</xs:schema>"#,
        );
        let schema = infer(&xsd, "dates.xsd");
        assert_eq!(
            schema["properties"]["born"],
            json!({"type": "string", "format": "date"})
        );
        assert_eq!(
            schema["properties"]["seen"],
            json!({"type": "string", "format": "date-time"})
        );
    }

    #[test]
    fn test_not_an_xsd() {
        let obj = xsd_object("<data><a>1</a></data>");
        let schema = infer(&obj, "data.xml");
        assert_eq!(schema["type"], json!("object"));
        assert!(schema.get("properties").is_none());
    }
}
