//! MySQL read bridge configuration.

use std::num::NonZeroUsize;

use crate::config::{ConfigKeySpec, ConnectorConfig};
use crate::error::ConnectorError;

/// Default maximum number of rows per emitted batch.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 65_536;

/// Configuration for [`MySqlSource`](crate::source::MySqlSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlSourceConfig {
    /// Maximum rows per emitted batch (default: 65536).
    pub max_block_size: NonZeroUsize,

    /// Disconnect the connection once the cursor is exhausted (default: false).
    pub auto_close: bool,
}

impl Default for MySqlSourceConfig {
    fn default() -> Self {
        Self {
            max_block_size: NonZeroUsize::MIN.saturating_add(DEFAULT_MAX_BLOCK_SIZE - 1),
            auto_close: false,
        }
    }
}

impl MySqlSourceConfig {
    /// Parses a source config from a [`ConnectorConfig`].
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationError` on invalid values.
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ConnectorError> {
        let mut cfg = Self::default();

        if let Some(size) = config.get_parsed::<usize>("max.block.size")? {
            cfg.max_block_size = NonZeroUsize::new(size).ok_or_else(|| {
                ConnectorError::ConfigurationError("max.block.size must be > 0".into())
            })?;
        }
        if let Some(auto_close) = config.get_bool("auto.close")? {
            cfg.auto_close = auto_close;
        }
        Ok(cfg)
    }
}

/// Keys accepted by [`MySqlSourceConfig::from_config`].
#[must_use]
pub fn source_config_keys() -> Vec<ConfigKeySpec> {
    vec![
        ConfigKeySpec::optional(
            "max.block.size",
            "Maximum rows per emitted batch",
            DEFAULT_MAX_BLOCK_SIZE.to_string(),
        ),
        ConfigKeySpec::optional(
            "auto.close",
            "Disconnect once the result set is exhausted",
            "false",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(pairs: &[(&str, &str)]) -> ConnectorConfig {
        let mut config = ConnectorConfig::new("mysql-source");
        for (k, v) in pairs {
            config.set(*k, *v);
        }
        config
    }

    #[test]
    fn test_defaults() {
        let cfg = MySqlSourceConfig::from_config(&make_config(&[])).unwrap();
        assert_eq!(cfg.max_block_size.get(), 65_536);
        assert!(!cfg.auto_close);
        assert_eq!(cfg, MySqlSourceConfig::default());
    }

    #[test]
    fn test_parse_all_fields() {
        let cfg = MySqlSourceConfig::from_config(&make_config(&[
            ("max.block.size", "1024"),
            ("auto.close", "true"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_block_size.get(), 1024);
        assert!(cfg.auto_close);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let err = MySqlSourceConfig::from_config(&make_config(&[("max.block.size", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigurationError(_)));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(
            MySqlSourceConfig::from_config(&make_config(&[("max.block.size", "lots")])).is_err()
        );
        assert!(MySqlSourceConfig::from_config(&make_config(&[("auto.close", "maybe")])).is_err());
    }

    #[test]
    fn test_config_keys() {
        let keys = source_config_keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| !k.required));
        assert!(make_config(&[]).validate(&keys).is_ok());
    }
}
