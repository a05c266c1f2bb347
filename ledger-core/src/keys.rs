//! Composite key construction
//!
//! A composite key is `\0 tag \0 part_1 \0 ... part_n \0`. The separator may
//! not appear inside any component, so the encoding is injective: two
//! different `(tag, parts)` pairs never produce the same key, and no
//! composite key collides with a plain key (plain keys never start with `\0`).

use crate::{Error, Result};

/// Namespace prefix and component separator
const COMPOSITE_KEY_NAMESPACE: char = '\u{0}';

/// Highest code point; reserved for range-scan upper bounds
const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

/// Build a composite key from an object type and its attributes
pub fn composite_key(object_type: &str, attributes: &[&str]) -> Result<String> {
    validate_component("object type", object_type)?;

    let mut key = String::with_capacity(
        2 + object_type.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>(),
    );
    key.push(COMPOSITE_KEY_NAMESPACE);
    key.push_str(object_type);
    key.push(COMPOSITE_KEY_NAMESPACE);

    for attribute in attributes {
        validate_component("attribute", attribute)?;
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_NAMESPACE);
    }

    Ok(key)
}

fn validate_component(what: &str, component: &str) -> Result<()> {
    if component.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "Composite key {} must not be empty",
            what
        )));
    }

    if component.contains(COMPOSITE_KEY_NAMESPACE) || component.contains(MAX_UNICODE_RUNE) {
        return Err(Error::InvalidArgument(format!(
            "Composite key {} {:?} contains a reserved character",
            what, component
        )));
    }

    Ok(())
}

/// Render a key for logs (separators shown as `|`)
pub fn printable(key: &str) -> String {
    key.replace(COMPOSITE_KEY_NAMESPACE, "|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key_layout() {
        let key = composite_key("Shipment", &["Location", "trade-1"]).unwrap();
        assert_eq!(key, "\u{0}Shipment\u{0}Location\u{0}trade-1\u{0}");
        assert_eq!(printable(&key), "|Shipment|Location|trade-1|");
    }

    #[test]
    fn test_composite_key_deterministic() {
        let a = composite_key("Trade", &["t1"]).unwrap();
        let b = composite_key("Trade", &["t1"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tag_and_parts_do_not_bleed() {
        // "ab" + ["c"] must not equal "a" + ["bc"]
        let a = composite_key("ab", &["c"]).unwrap();
        let b = composite_key("a", &["bc"]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_attribute_rejected() {
        let err = composite_key("Trade", &[""]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_reserved_characters_rejected() {
        assert!(composite_key("Trade", &["a\u{0}b"]).is_err());
        assert!(composite_key("Trade", &["a\u{10FFFF}"]).is_err());
        assert!(composite_key("", &["x"]).is_err());
    }
}
