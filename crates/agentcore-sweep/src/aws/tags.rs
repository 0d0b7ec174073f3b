//! Small helpers for reading SDK output shapes
//!
//! Tag collections come in several shapes across the service crates (lists of
//! key/value structs, plain maps) and identifier getters differ in whether
//! they return `&str` or `Option<&str>`. These helpers flatten both.

use std::collections::HashMap;

/// Collect tag structs into a map, skipping entries without key or value
pub fn extract_tags<T>(
    tags: &[T],
    key: impl Fn(&T) -> Option<&str>,
    value: impl Fn(&T) -> Option<&str>,
) -> HashMap<String, String> {
    tags.iter()
        .filter_map(|t| match (key(t), value(t)) {
            (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
            _ => None,
        })
        .collect()
}

pub fn extract_iam_tags(tags: &[aws_sdk_iam::types::Tag]) -> HashMap<String, String> {
    extract_tags(tags, |t| Some(t.key()), |t| Some(t.value()))
}

pub fn extract_secret_tags(tags: &[aws_sdk_secretsmanager::types::Tag]) -> HashMap<String, String> {
    extract_tags(tags, |t| t.key(), |t| t.value())
}

/// Clone an optional tag map as returned by Lambda and Cognito
pub fn map_tags(tags: Option<&HashMap<String, String>>) -> HashMap<String, String> {
    tags.cloned().unwrap_or_default()
}

/// Owned text from a required (`&str`) or optional (`Option<&str>`) getter
pub trait FieldText {
    fn text(self) -> String;
}

impl FieldText for &str {
    fn text(self) -> String {
        self.to_string()
    }
}

impl FieldText for Option<&str> {
    fn text(self) -> String {
        self.unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tags_skips_partial_entries() {
        let tags = vec![
            (Some("project"), Some("demo")),
            (Some("orphan"), None),
            (None, Some("value")),
        ];
        let map = extract_tags(&tags, |t| t.0, |t| t.1);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("project").map(String::as_str), Some("demo"));
    }

    #[test]
    fn test_field_text() {
        assert_eq!("gw-1".text(), "gw-1");
        assert_eq!(Some("gw-1").text(), "gw-1");
        assert_eq!(None::<&str>.text(), "");
    }

    #[test]
    fn test_map_tags_none_is_empty() {
        assert!(map_tags(None).is_empty());
    }
}
