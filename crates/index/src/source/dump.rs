//! Fallback product source: a static SQL dump of the products table.
//!
//! Parses single-row `INSERT INTO \`products\` (...) VALUES (...);`
//! statements. The tokenizer respects quoted strings and backslash escapes,
//! so names and descriptions may contain commas and quotes.

use std::path::PathBuf;

use async_trait::async_trait;
use lookalike_core::{AppError, AppResult};
use tracing::debug;

use crate::product::{parse_image_urls, ProductRecord};
use crate::source::ProductSource;

const INSERT_PREFIX: &str = "INSERT INTO `products` (";
const VALUES_SEPARATOR: &str = ") VALUES (";

/// A parsed SQL literal.
#[derive(Debug, Clone, PartialEq)]
enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

impl SqlValue {
    fn as_string(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(x) => x.to_string(),
            SqlValue::Str(s) => s.clone(),
        }
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            SqlValue::Int(n) if *n >= 0 => Some(*n as u64),
            SqlValue::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn as_bool(&self) -> bool {
        match self {
            SqlValue::Int(n) => *n != 0,
            SqlValue::Str(s) => s == "1" || s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// Fallback source reading a flat dump file.
#[derive(Debug, Clone)]
pub struct DumpSource {
    path: PathBuf,
}

impl DumpSource {
    /// Create a source for a dump file path. The file is re-read on every
    /// fetch; the dump is small and treated as an immutable snapshot.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn parse_file(&self) -> AppResult<Vec<ProductRecord>> {
        if !self.path.exists() {
            return Err(AppError::Source(format!(
                "Product dump not found at {:?}",
                self.path
            )));
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| AppError::Source(format!("Failed to read dump {:?}: {}", self.path, e)))?;

        let mut records = Vec::new();
        for line in contents.lines() {
            if let Some(record) = parse_insert_line(line.trim()) {
                records.push(record);
            }
        }

        debug!("Parsed {} product rows from {:?}", records.len(), self.path);
        Ok(records)
    }
}

#[async_trait]
impl ProductSource for DumpSource {
    fn label(&self) -> &'static str {
        "dump"
    }

    async fn fetch_one(&self, product_id: u64) -> AppResult<Option<ProductRecord>> {
        let records = self.parse_file()?;
        Ok(records.into_iter().find(|r| r.id == product_id))
    }

    async fn fetch_all(&self) -> AppResult<Vec<ProductRecord>> {
        self.parse_file()
    }
}

/// Parse one `INSERT INTO \`products\`` statement into a record. Lines that
/// are not product inserts, or whose column and value counts disagree, are
/// skipped.
fn parse_insert_line(line: &str) -> Option<ProductRecord> {
    let rest = line.strip_prefix(INSERT_PREFIX)?;
    let (columns_str, rest) = rest.split_once(VALUES_SEPARATOR)?;
    let values_str = rest.strip_suffix(");")?;

    let columns: Vec<String> = columns_str
        .split(',')
        .map(|c| c.trim().trim_matches('`').to_string())
        .collect();

    let tokens = split_sql_values(values_str);
    if columns.len() != tokens.len() {
        return None;
    }

    let values: Vec<SqlValue> = tokens.iter().map(|t| parse_sql_literal(t)).collect();

    let mut id = None;
    let mut name = String::new();
    let mut description = String::new();
    let mut image_urls = Vec::new();
    let mut is_deleted = false;

    for (column, value) in columns.iter().zip(&values) {
        match column.as_str() {
            "id" => id = value.as_u64(),
            "name" => name = value.as_string(),
            "description" => description = value.as_string(),
            "image_urls" => {
                if let SqlValue::Str(raw) = value {
                    image_urls = parse_image_urls(raw);
                }
            }
            "is_deleted" => is_deleted = value.as_bool(),
            _ => {}
        }
    }

    Some(ProductRecord {
        id: id?,
        name,
        description,
        image_urls,
        is_deleted,
    })
}

/// Split a `VALUES (...)` list into individual SQL literals, respecting
/// quotes and backslash escapes.
fn split_sql_values(values_str: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in values_str.chars() {
        if escaped {
            buf.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                buf.push(ch);
                escaped = true;
            }
            '\'' => {
                in_string = !in_string;
                buf.push(ch);
            }
            ',' if !in_string => {
                tokens.push(buf.trim().to_string());
                buf.clear();
            }
            _ => buf.push(ch),
        }
    }
    if !buf.trim().is_empty() {
        tokens.push(buf.trim().to_string());
    }

    tokens
}

/// Convert a SQL literal token into a value.
fn parse_sql_literal(token: &str) -> SqlValue {
    if token.eq_ignore_ascii_case("NULL") {
        return SqlValue::Null;
    }

    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        let inner = &token[1..token.len() - 1];
        let unescaped = inner.replace("\\'", "'").replace("\\\\", "\\");
        return SqlValue::Str(unescaped);
    }

    if let Ok(n) = token.parse::<i64>() {
        return SqlValue::Int(n);
    }
    if let Ok(x) = token.parse::<f64>() {
        return SqlValue::Float(x);
    }

    SqlValue::Str(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "INSERT INTO `products` (`id`, `name`, `description`, `image_urls`, `is_deleted`) VALUES (7, 'Red Handbag', 'Leather tote, hand-stitched', '[\"http://img/7.jpg\"]', 0);";

    #[test]
    fn test_parse_insert_line() {
        let record = parse_insert_line(LINE).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.name, "Red Handbag");
        assert_eq!(record.description, "Leather tote, hand-stitched");
        assert_eq!(record.image_urls, vec!["http://img/7.jpg"]);
        assert!(!record.is_deleted);
    }

    #[test]
    fn test_parse_null_and_deleted() {
        let line = "INSERT INTO `products` (`id`, `name`, `description`, `image_urls`, `is_deleted`) VALUES (8, 'Old Boots', NULL, NULL, 1);";
        let record = parse_insert_line(line).unwrap();
        assert_eq!(record.id, 8);
        assert_eq!(record.description, "");
        assert!(record.image_urls.is_empty());
        assert!(record.is_deleted);
    }

    #[test]
    fn test_parse_escaped_quote() {
        let line = r"INSERT INTO `products` (`id`, `name`, `description`, `image_urls`, `is_deleted`) VALUES (9, 'Kids\' Scarf', 'Wool', NULL, 0);";
        let record = parse_insert_line(line).unwrap();
        assert_eq!(record.name, "Kids' Scarf");
    }

    #[test]
    fn test_ignores_unrelated_lines() {
        assert!(parse_insert_line("-- comment").is_none());
        assert!(parse_insert_line("INSERT INTO `orders` (`id`) VALUES (1);").is_none());
        assert!(parse_insert_line("").is_none());
    }

    #[test]
    fn test_skips_column_value_count_mismatch() {
        let line = "INSERT INTO `products` (`id`, `name`) VALUES (1);";
        assert!(parse_insert_line(line).is_none());
    }

    #[test]
    fn test_split_sql_values_respects_strings() {
        let tokens = split_sql_values("1, 'a, b', NULL, 2.5");
        assert_eq!(tokens, vec!["1", "'a, b'", "NULL", "2.5"]);
    }

    #[test]
    fn test_parse_sql_literal_variants() {
        assert_eq!(parse_sql_literal("NULL"), SqlValue::Null);
        assert_eq!(parse_sql_literal("42"), SqlValue::Int(42));
        assert_eq!(parse_sql_literal("2.5"), SqlValue::Float(2.5));
        assert_eq!(
            parse_sql_literal("'hello'"),
            SqlValue::Str("hello".to_string())
        );
        assert_eq!(
            parse_sql_literal(r"'it\'s'"),
            SqlValue::Str("it's".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_all_and_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.sql");
        std::fs::write(
            &path,
            format!(
                "{}\nINSERT INTO `products` (`id`, `name`, `description`, `image_urls`, `is_deleted`) VALUES (8, 'Boots', NULL, NULL, 0);\n",
                LINE
            ),
        )
        .unwrap();

        let source = DumpSource::new(path);
        let all = source.fetch_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, 7);
        assert_eq!(all[1].id, 8);

        let one = source.fetch_one(8).await.unwrap().unwrap();
        assert_eq!(one.name, "Boots");
        assert!(source.fetch_one(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_source_error() {
        let source = DumpSource::new(PathBuf::from("/nonexistent/products.sql"));
        assert!(matches!(
            source.fetch_all().await,
            Err(AppError::Source(_))
        ));
    }
}
