//! Bridge configuration model.
//!
//! - [`ConnectorConfig`]: Key-value configuration with typed accessors
//! - [`ConfigKeySpec`]: Specification for a configuration key
//!
//! Typed configs ([`MySqlSourceConfig`](crate::source_config::MySqlSourceConfig),
//! [`MySqlSinkConfig`](crate::sink_config::MySqlSinkConfig)) are parsed from a
//! [`ConnectorConfig`] and publish their accepted keys as [`ConfigKeySpec`]s.

use std::collections::HashMap;
use std::fmt;

use crate::error::ConnectorError;

/// Configuration for a bridge instance.
///
/// Bridges receive their configuration as a string key-value map,
/// typically taken from table-engine arguments or programmatic config.
#[derive(Debug, Clone, Default)]
pub struct ConnectorConfig {
    /// The bridge type identifier (e.g., "mysql-source", "mysql-sink").
    connector_type: String,

    /// Configuration properties.
    properties: HashMap<String, String>,
}

impl ConnectorConfig {
    /// Creates a new config with the given type.
    #[must_use]
    pub fn new(connector_type: impl Into<String>) -> Self {
        Self {
            connector_type: connector_type.into(),
            properties: HashMap::new(),
        }
    }

    /// Creates a config from existing properties.
    #[must_use]
    pub fn with_properties(
        connector_type: impl Into<String>,
        properties: HashMap<String, String>,
    ) -> Self {
        Self {
            connector_type: connector_type.into(),
            properties,
        }
    }

    /// Returns the bridge type identifier.
    #[must_use]
    pub fn connector_type(&self) -> &str {
        &self.connector_type
    }

    /// Sets a configuration property.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Gets a configuration property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Gets a required configuration property, returning an error if missing.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MissingConfig` if the key is not set.
    pub fn require(&self, key: &str) -> Result<&str, ConnectorError> {
        self.get(key)
            .ok_or_else(|| ConnectorError::MissingConfig(key.to_string()))
    }

    /// Gets a property parsed as the given type.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationError` if the value cannot be parsed.
    pub fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ConnectorError>
    where
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(v) => v.trim().parse::<T>().map(Some).map_err(|e| {
                ConnectorError::ConfigurationError(format!("invalid value for '{key}': {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Gets a boolean property.
    ///
    /// Accepts `true`/`false` (any case) and `1`/`0`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationError` for any other value.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConnectorError> {
        match self.get(key).map(str::trim) {
            None => Ok(None),
            Some("1") => Ok(Some(true)),
            Some("0") => Ok(Some(false)),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(v) => Err(ConnectorError::ConfigurationError(format!(
                "invalid value for '{key}': '{v}' (expected true/false or 1/0)"
            ))),
        }
    }

    /// Returns all properties as a reference.
    #[must_use]
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Validates the configuration against a set of key specifications.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MissingConfig` for missing required keys.
    pub fn validate(&self, specs: &[ConfigKeySpec]) -> Result<(), ConnectorError> {
        for spec in specs {
            if spec.required && spec.default.is_none() && self.get(&spec.key).is_none() {
                return Err(ConnectorError::MissingConfig(spec.key.clone()));
            }
        }
        Ok(())
    }
}

/// Specification for a configuration key.
#[derive(Debug, Clone)]
pub struct ConfigKeySpec {
    /// The configuration key name.
    pub key: String,

    /// Human-readable description.
    pub description: String,

    /// Whether this key is required.
    pub required: bool,

    /// Default value if not provided.
    pub default: Option<String>,
}

impl ConfigKeySpec {
    /// Creates a required configuration key spec.
    #[must_use]
    pub fn required(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// Creates an optional configuration key spec with a default value.
    #[must_use]
    pub fn optional(
        key: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            required: false,
            default: Some(default.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_basic_operations() {
        let mut config = ConnectorConfig::new("mysql-sink");
        config.set("remote.database", "shop");
        config.set("remote.table", "orders");

        assert_eq!(config.connector_type(), "mysql-sink");
        assert_eq!(config.get("remote.database"), Some("shop"));
        assert_eq!(config.get("remote.table"), Some("orders"));
        assert_eq!(config.get("missing"), None);
        assert_eq!(config.properties().len(), 2);
    }

    #[test]
    fn test_config_require() {
        let mut config = ConnectorConfig::new("mysql-sink");
        config.set("remote.table", "orders");

        assert!(config.require("remote.table").is_ok());
        assert!(matches!(
            config.require("remote.database"),
            Err(ConnectorError::MissingConfig(_))
        ));
    }

    #[test]
    fn test_config_parsed() {
        let mut config = ConnectorConfig::new("mysql-source");
        config.set("max.block.size", "1000");
        config.set("bad_number", "not_a_number");

        let size: Option<usize> = config.get_parsed("max.block.size").unwrap();
        assert_eq!(size, Some(1000));

        let missing: Option<usize> = config.get_parsed("missing").unwrap();
        assert_eq!(missing, None);

        let bad: Result<Option<usize>, _> = config.get_parsed("bad_number");
        assert!(bad.is_err());
    }

    #[test]
    fn test_config_bool() {
        let mut config = ConnectorConfig::new("mysql-sink");
        config.set("a", "1");
        config.set("b", "FALSE");
        config.set("c", "yes");

        assert_eq!(config.get_bool("a").unwrap(), Some(true));
        assert_eq!(config.get_bool("b").unwrap(), Some(false));
        assert_eq!(config.get_bool("missing").unwrap(), None);
        assert!(matches!(
            config.get_bool("c"),
            Err(ConnectorError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_config_validate() {
        let specs = vec![
            ConfigKeySpec::required("remote.table", "Target table"),
            ConfigKeySpec::optional("max.rows.to.insert", "Chunk size", "65536"),
        ];

        let mut config = ConnectorConfig::new("mysql-sink");
        config.set("remote.table", "orders");
        assert!(config.validate(&specs).is_ok());

        let empty_config = ConnectorConfig::new("mysql-sink");
        assert!(empty_config.validate(&specs).is_err());
    }

    #[test]
    fn test_config_with_properties() {
        let mut props = HashMap::new();
        props.insert("key1".to_string(), "val1".to_string());
        props.insert("key2".to_string(), "val2".to_string());

        let config = ConnectorConfig::with_properties("test", props);
        assert_eq!(config.get("key1"), Some("val1"));
        assert_eq!(config.get("key2"), Some("val2"));
    }
}
