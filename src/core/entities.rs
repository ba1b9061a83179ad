//! XML entity decoding and encoding
//!
//! Handles decoding of XML entity references:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - Common XHTML named entities (&nbsp; &copy; ...)
//!
//! Uses Cow for zero-copy when no entities are present.

use memchr::memchr;
use std::borrow::Cow;

/// Decode entity references in text content.
///
/// Returns Borrowed if no entities are present (zero-copy),
/// Owned if entities were decoded. Unknown references are kept as-is.
#[inline]
pub fn decode_text(input: &str) -> Cow<'_, str> {
    // Fast path: check for any ampersand using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

/// Decode all entity references in the input
fn decode_entities(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        rest = &rest[amp..];

        // &name; - the semicolon must arrive before the next ampersand
        let body_end = rest[1..].find(';').map(|i| i + 1);
        let next_amp = rest[1..].find('&').map(|i| i + 1);
        match body_end {
            Some(semi) if next_amp.map_or(true, |a| semi < a) => {
                match decode_entity(&rest[1..semi]) {
                    Some(decoded) => result.push_str(&decoded),
                    // Unknown entity, keep as-is
                    None => result.push_str(&rest[..semi + 1]),
                }
                rest = &rest[semi + 1..];
            }
            _ => {
                // No terminator: the ampersand is ordinary text
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Decode a single entity body (without & and ;)
pub fn decode_entity(entity: &str) -> Option<String> {
    if entity.is_empty() {
        return None;
    }

    // Numeric character reference
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric_entity(numeric);
    }

    // Named entity
    match entity {
        "lt" => Some("<".to_string()),
        "gt" => Some(">".to_string()),
        "amp" => Some("&".to_string()),
        "quot" => Some("\"".to_string()),
        "apos" => Some("'".to_string()),
        // XHTML named entities (common ones)
        "nbsp" => Some("\u{00A0}".to_string()),
        "copy" => Some("\u{00A9}".to_string()),
        "reg" => Some("\u{00AE}".to_string()),
        "trade" => Some("\u{2122}".to_string()),
        "mdash" => Some("\u{2014}".to_string()),
        "ndash" => Some("\u{2013}".to_string()),
        "lsquo" => Some("\u{2018}".to_string()),
        "rsquo" => Some("\u{2019}".to_string()),
        "ldquo" => Some("\u{201C}".to_string()),
        "rdquo" => Some("\u{201D}".to_string()),
        "hellip" => Some("\u{2026}".to_string()),
        _ => None,
    }
}

/// Decode a numeric character reference body (after '#')
fn decode_numeric_entity(entity: &str) -> Option<String> {
    if entity.is_empty() {
        return None;
    }

    let codepoint = if let Some(hex) = entity.strip_prefix('x').or_else(|| entity.strip_prefix('X')) {
        // Hexadecimal: &#xHHHH;
        u32::from_str_radix(hex, 16).ok()?
    } else {
        // Decimal: &#DDDD;
        entity.parse::<u32>().ok()?
    };

    char::from_u32(codepoint).map(|c| c.to_string())
}

/// Encode text for XML output (escape special characters)
pub fn encode_text(input: &str) -> Cow<'_, str> {
    // Fast path: check if any escaping needed
    if !input
        .bytes()
        .any(|b| matches!(b, b'<' | b'>' | b'&' | b'"' | b'\''))
    {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities() {
        let result = decode_text("Hello, World!");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "Hello, World!");
    }

    #[test]
    fn test_basic_entities() {
        let result = decode_text("&lt;hello&gt; &amp; &quot;world&quot;");
        assert_eq!(result, "<hello> & \"world\"");
    }

    #[test]
    fn test_numeric_decimal() {
        assert_eq!(decode_text("&#65;&#66;&#67;"), "ABC");
    }

    #[test]
    fn test_numeric_hex() {
        assert_eq!(decode_text("&#x41;&#x42;&#x43;"), "ABC");
    }

    #[test]
    fn test_unicode_entity() {
        assert_eq!(decode_text("&#x1F600;"), "\u{1F600}");
    }

    #[test]
    fn test_unknown_entity() {
        assert_eq!(decode_text("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_bare_ampersand() {
        assert_eq!(decode_text("fish & chips"), "fish & chips");
    }

    #[test]
    fn test_encode_text() {
        let result = encode_text("<hello> & \"world\"");
        assert_eq!(result, "&lt;hello&gt; &amp; &quot;world&quot;");
    }

    #[test]
    fn test_encode_no_escapes() {
        let result = encode_text("plain text");
        assert!(matches!(result, Cow::Borrowed(_)));
    }
}
