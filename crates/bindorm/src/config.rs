//! Builder and compiler configuration.

use crate::error::{OrmError, OrmResult};
use crate::ident::Grammar;
use crate::model::resolver::{ModelResolver, default_resolver};
use serde::Deserialize;
use std::sync::Arc;

/// Configuration shared by statements, relations and resolvers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    /// Identifier quote character.
    pub quote_char: char,
    /// Column used for soft deletes.
    pub soft_delete_column: String,
    /// Page size used when callers don't pass one.
    pub default_per_page: u64,
    /// Truncate SQL in debug logs (in bytes). `None` means no truncation.
    pub max_sql_log_length: Option<usize>,
    /// Namespace prefix used by the convention resolver.
    pub model_namespace: String,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            quote_char: '`',
            soft_delete_column: "deleted_at".to_string(),
            default_per_page: 15,
            max_sql_log_length: Some(200),
            model_namespace: "app::models".to_string(),
        }
    }
}

impl OrmConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML. Missing keys keep their defaults.
    ///
    /// ```toml
    /// quote_char = '"'
    /// soft_delete_column = "removed_at"
    /// default_per_page = 25
    /// ```
    pub fn from_toml_str(s: &str) -> OrmResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the identifier quote character.
    pub fn quote_char(mut self, quote: char) -> Self {
        self.quote_char = quote;
        self
    }

    /// Set the soft delete column.
    pub fn soft_delete_column(mut self, column: impl Into<String>) -> Self {
        self.soft_delete_column = column.into();
        self
    }

    /// Set the default page size.
    pub fn default_per_page(mut self, per_page: u64) -> Self {
        self.default_per_page = per_page;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_log_length(mut self, len: usize) -> Self {
        self.max_sql_log_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_sql_truncate(mut self) -> Self {
        self.max_sql_log_length = None;
        self
    }

    /// Set the convention resolver's namespace prefix.
    pub fn model_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.model_namespace = namespace.into();
        self
    }

    /// Identifier grammar derived from this configuration.
    pub fn grammar(&self) -> Grammar {
        Grammar::new(self.quote_char)
    }

    pub fn validate(&self) -> OrmResult<()> {
        if self.soft_delete_column.trim().is_empty() {
            return Err(OrmError::Config("soft_delete_column cannot be empty".into()));
        }
        if self.default_per_page == 0 {
            return Err(OrmError::Config("default_per_page must be >= 1".into()));
        }
        if self.quote_char.is_alphanumeric() || self.quote_char == '?' {
            return Err(OrmError::Config(format!(
                "quote_char '{}' cannot be used to quote identifiers",
                self.quote_char
            )));
        }
        Ok(())
    }
}

/// Explicit context handed to statements and relations: configuration plus the
/// model resolver to use.
#[derive(Clone)]
pub struct OrmContext {
    config: Arc<OrmConfig>,
    resolver: Arc<dyn ModelResolver>,
}

impl OrmContext {
    pub fn new(config: OrmConfig, resolver: Arc<dyn ModelResolver>) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
        }
    }

    /// Context using default configuration and the process-wide default resolver.
    pub fn global() -> Self {
        Self::new(OrmConfig::default(), default_resolver())
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<dyn ModelResolver> {
        &self.resolver
    }

    pub fn with_config(mut self, config: OrmConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ModelResolver>) -> Self {
        self.resolver = resolver;
        self
    }
}

impl std::fmt::Debug for OrmContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrmContext")
            .field("config", &self.config)
            .field("resolver", &"<dyn ModelResolver>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OrmConfig::default();
        assert_eq!(config.quote_char, '`');
        assert_eq!(config.soft_delete_column, "deleted_at");
        assert_eq!(config.default_per_page, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_toml_keeps_missing_defaults() {
        let config = OrmConfig::from_toml_str(
            r#"
            quote_char = '"'
            default_per_page = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.quote_char, '"');
        assert_eq!(config.default_per_page, 25);
        assert_eq!(config.soft_delete_column, "deleted_at");
    }

    #[test]
    fn from_toml_rejects_zero_page_size() {
        let err = OrmConfig::from_toml_str("default_per_page = 0").unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
    }

    #[test]
    fn from_toml_rejects_bad_syntax() {
        assert!(OrmConfig::from_toml_str("quote_char = ").is_err());
    }

    #[test]
    fn builder_methods() {
        let config = OrmConfig::new()
            .quote_char('"')
            .soft_delete_column("removed_at")
            .no_sql_truncate();
        assert_eq!(config.grammar().wrap_column("id"), r#""id""#);
        assert_eq!(config.soft_delete_column, "removed_at");
        assert_eq!(config.max_sql_log_length, None);
    }
}
