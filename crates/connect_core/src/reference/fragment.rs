//! Synthetic identity keys for inline configuration fragments.
//!
//! Fragments arrive as owned JSON values, so two inline copies of the same
//! fragment (for example a YAML anchor expanded twice) are structurally equal
//! but never the same object. The key is the fragment's canonical rendering:
//! object keys sorted, no insignificant whitespace. Equal content means equal
//! identity.

use serde_json::Value;
use std::fmt::{Display, Formatter, Write};

/// Canonical identity of one inline fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentKey(String);

impl FragmentKey {
    pub fn of(fragment: &Value) -> Self {
        let mut out = String::new();
        write_canonical(fragment, &mut out);
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FragmentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        const MAX_CHARS: usize = 48;
        if self.0.chars().count() <= MAX_CHARS {
            return write!(f, "{}", self.0);
        }
        let head = self.0.chars().take(MAX_CHARS).collect::<String>();
        write!(f, "{head}...")
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(entries) => {
            let mut keys = entries.keys().collect::<Vec<_>>();
            keys.sort();
            out.push('{');
            for (index, key) in keys.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}:", Value::String(key.clone()));
                write_canonical(&entries[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FragmentKey;
    use serde_json::json;

    #[test]
    fn equal_content_yields_equal_keys() {
        let a = json!({ "id": "x", "name": "Box", "dims": [1, 2] });
        let b = json!({ "dims": [1, 2], "name": "Box", "id": "x" });
        assert_eq!(FragmentKey::of(&a), FragmentKey::of(&b));
    }

    #[test]
    fn different_content_yields_different_keys() {
        let a = json!({ "id": "x", "name": "Box" });
        let b = json!({ "id": "x", "name": "Envelope" });
        assert_ne!(FragmentKey::of(&a), FragmentKey::of(&b));
    }

    #[test]
    fn display_is_truncated() {
        let key = FragmentKey::of(&json!({ "description": "a".repeat(100) }));
        assert!(key.to_string().ends_with("..."));
        assert!(key.as_str().len() > 100);
    }
}
