//! String key/value configuration handed to deserializer builders.

use std::collections::BTreeMap;
use std::path::Path;

use crate::{Error, Result};

/// Flat configuration map with typed getters.
///
/// Keys are plain strings; nested TOML tables are flattened with `.`
/// separators, so `[deserializer] fileSuffix = "x"` becomes
/// `deserializer.fileSuffix`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    parameters: BTreeMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document into a context.
    ///
    /// Strings, integers, floats and booleans are accepted as values.
    /// Arrays and datetimes are rejected.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let table: toml::Table = s
            .parse()
            .map_err(|e| Error::Config(format!("Invalid TOML: {e}")))?;

        let mut context = Self::new();
        flatten_into(&mut context, "", &table)?;
        Ok(context)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or(default).to_string()
    }

    pub fn get_integer(&self, key: &str) -> Result<Option<i64>> {
        self.get_string(key)
            .map(|value| {
                value.trim().parse::<i64>().map_err(|_| {
                    Error::Config(format!("Expected an integer for '{key}', got '{value}'"))
                })
            })
            .transpose()
    }

    pub fn get_integer_or(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self.get_integer(key)?.unwrap_or(default))
    }

    pub fn get_boolean(&self, key: &str) -> Result<Option<bool>> {
        self.get_string(key)
            .map(|value| match value.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::Config(format!(
                    "Expected a boolean for '{key}', got '{value}'"
                ))),
            })
            .transpose()
    }

    /// All entries whose key starts with `prefix`, with the prefix removed.
    pub fn sub_properties(&self, prefix: &str) -> Context {
        let parameters = self
            .parameters
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_string(), value.clone()))
            })
            .collect();
        Context { parameters }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Context::new();
        for (key, value) in iter {
            context.put(key, value);
        }
        context
    }
}

fn flatten_into(context: &mut Context, prefix: &str, table: &toml::Table) -> Result<()> {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            toml::Value::String(s) => context.put(full_key, s.clone()),
            toml::Value::Integer(i) => context.put(full_key, i.to_string()),
            toml::Value::Float(f) => context.put(full_key, f.to_string()),
            toml::Value::Boolean(b) => context.put(full_key, b.to_string()),
            toml::Value::Table(nested) => flatten_into(context, &full_key, nested)?,
            toml::Value::Array(_) | toml::Value::Datetime(_) => {
                return Err(Error::Config(format!(
                    "Unsupported value type for '{full_key}'"
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let context: Context = [
            ("name", "file"),
            ("size", " 42 "),
            ("enabled", "TRUE"),
            ("broken", "forty"),
        ]
        .into_iter()
        .collect();

        assert_eq!(context.get_string("name"), Some("file"));
        assert_eq!(context.get_string("missing"), None);
        assert_eq!(context.get_string_or("missing", "dflt"), "dflt");
        assert_eq!(context.get_integer("size").unwrap(), Some(42));
        assert_eq!(context.get_integer_or("missing", 7).unwrap(), 7);
        assert_eq!(context.get_boolean("enabled").unwrap(), Some(true));
        assert!(matches!(context.get_integer("broken"), Err(Error::Config(_))));
        assert!(matches!(context.get_boolean("name"), Err(Error::Config(_))));
    }

    #[test]
    fn test_sub_properties() {
        let context: Context = [
            ("deserializer.fileSuffix", "<X>"),
            ("deserializer.maxLineLength", "10"),
            ("deserializer.", "ignored"),
            ("other", "value"),
        ]
        .into_iter()
        .collect();

        let sub = context.sub_properties("deserializer.");
        assert_eq!(sub.parameters().len(), 2);
        assert_eq!(sub.get_string("fileSuffix"), Some("<X>"));
        assert_eq!(sub.get_string("maxLineLength"), Some("10"));
        assert!(!sub.contains_key("other"));
    }

    #[test]
    fn test_from_toml_str_flattens_tables() {
        let context = Context::from_toml_str(
            r#"
            batch = 5
            [deserializer]
            outputCharset = "UTF-8"
            maxLineLength = 4096
            fileSuffix = "\r\nEOF"
            strict = false
            "#,
        )
        .unwrap();

        assert_eq!(context.get_integer("batch").unwrap(), Some(5));
        assert_eq!(context.get_string("deserializer.outputCharset"), Some("UTF-8"));
        assert_eq!(context.get_integer("deserializer.maxLineLength").unwrap(), Some(4096));
        assert_eq!(context.get_string("deserializer.fileSuffix"), Some("\r\nEOF"));
        assert_eq!(context.get_boolean("deserializer.strict").unwrap(), Some(false));
    }

    #[test]
    fn test_from_toml_str_rejects_arrays() {
        let result = Context::from_toml_str("suffixes = [\"a\", \"b\"]");
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("suffixes")));
    }

    #[test]
    fn test_from_toml_str_invalid() {
        assert!(matches!(Context::from_toml_str("= nope"), Err(Error::Config(_))));
    }
}
