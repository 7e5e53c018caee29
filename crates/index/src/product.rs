//! Product record snapshot held by the index.

use serde::{Deserialize, Serialize};

/// Read-only snapshot of a product row, captured at index-build or add time.
///
/// The product table remains the owner of this data; the index never writes
/// it back and accepts that a snapshot can go stale until the product is
/// re-added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Stable unique product id
    pub id: u64,

    /// Display name
    pub name: String,

    /// Free-text description (empty when the source column is NULL)
    #[serde(default)]
    pub description: String,

    /// Image URLs, in source order
    #[serde(default)]
    pub image_urls: Vec<String>,

    /// Deletion flag as of snapshot time
    #[serde(default)]
    pub is_deleted: bool,
}

impl ProductRecord {
    /// Text used for embedding when no image is available or the policy
    /// forbids fetching one: name and description joined by a space.
    pub fn embedding_text(&self) -> String {
        let text = format!("{} {}", self.name, self.description);
        text.trim().to_string()
    }
}

/// Parse the `image_urls` column value: a JSON-encoded array of strings.
///
/// The column is free-form in practice; anything that is not a JSON array
/// of strings (NULL, malformed JSON, a scalar) yields no URLs rather than
/// an error. Non-string array elements are dropped.
pub fn parse_image_urls(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(url) => Some(url),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_joins_name_and_description() {
        let record = ProductRecord {
            id: 1,
            name: "Red Handbag".to_string(),
            description: "Leather tote".to_string(),
            image_urls: vec![],
            is_deleted: false,
        };
        assert_eq!(record.embedding_text(), "Red Handbag Leather tote");
    }

    #[test]
    fn test_embedding_text_empty_description() {
        let record = ProductRecord {
            id: 1,
            name: "Red Handbag".to_string(),
            description: String::new(),
            image_urls: vec![],
            is_deleted: false,
        };
        assert_eq!(record.embedding_text(), "Red Handbag");
    }

    #[test]
    fn test_parse_image_urls_valid() {
        let urls = parse_image_urls(r#"["http://a/1.jpg", "http://a/2.jpg"]"#);
        assert_eq!(urls, vec!["http://a/1.jpg", "http://a/2.jpg"]);
    }

    #[test]
    fn test_parse_image_urls_drops_non_strings() {
        let urls = parse_image_urls(r#"["http://a/1.jpg", 42, null]"#);
        assert_eq!(urls, vec!["http://a/1.jpg"]);
    }

    #[test]
    fn test_parse_image_urls_tolerates_garbage() {
        assert!(parse_image_urls("").is_empty());
        assert!(parse_image_urls("not json").is_empty());
        assert!(parse_image_urls(r#""just a string""#).is_empty());
        assert!(parse_image_urls("{}").is_empty());
    }
}
