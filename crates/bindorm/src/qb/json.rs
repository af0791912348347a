//! JSON column helpers and dialect detection.

use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};
use crate::ident::Grammar;
use crate::qb::Operator;
use crate::value::Value;

/// SQL dialect used for JSON functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `JSON_EXTRACT` / `JSON_CONTAINS`.
    #[default]
    MySql,
    /// `json_extract` / `json_each`.
    Sqlite,
}

impl Dialect {
    /// Map a driver name to a dialect. Unknown drivers use [`Dialect::MySql`].
    pub fn from_driver_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("sqlite") {
            Dialect::Sqlite
        } else {
            Dialect::MySql
        }
    }

    /// Detect the dialect of a connection. Detection failures fall back to MySQL.
    pub fn detect(conn: &impl Connection) -> Self {
        match conn.driver_name() {
            Ok(name) => Self::from_driver_name(&name),
            Err(err) => {
                tracing::debug!(
                    target: "bindorm.dialect",
                    error = %err,
                    "driver detection failed, using mysql JSON functions"
                );
                Dialect::MySql
            }
        }
    }

    fn extract_fn(self) -> &'static str {
        match self {
            Dialect::MySql => "JSON_EXTRACT",
            Dialect::Sqlite => "json_extract",
        }
    }

    /// `JSON_EXTRACT(col, ?)`, binding the path.
    pub(crate) fn extract(self, column: &str, grammar: &Grammar) -> String {
        format!("{}({}, ?)", self.extract_fn(), grammar.wrap_column(column))
    }

    /// Containment predicate and its binding for `value`.
    pub(crate) fn contains(
        self,
        column: &str,
        value: &serde_json::Value,
        grammar: &Grammar,
    ) -> (String, Value) {
        let col = grammar.wrap_column(column);
        match self {
            Dialect::MySql => (
                format!("JSON_CONTAINS({col}, ?)"),
                Value::Text(value.to_string()),
            ),
            Dialect::Sqlite => (
                format!("EXISTS (SELECT 1 FROM json_each({col}) WHERE json_each.value = ?)"),
                scalar_binding(value),
            ),
        }
    }

    /// `JSON_EXTRACT(col, ?) op ?` with the path and value bindings.
    pub(crate) fn path_predicate(
        self,
        column: &str,
        path: &str,
        operator: &str,
        value: Value,
        grammar: &Grammar,
    ) -> OrmResult<(String, Vec<Value>)> {
        let op = Operator::parse(operator)?;
        let extract = self.extract(column, grammar);
        let path = Value::Text(normalize_path(path));
        match op {
            Operator::Is | Operator::IsNot => Ok((format!("{extract} {op} NULL"), vec![path])),
            Operator::In | Operator::NotIn | Operator::Between => Err(OrmError::argument(
                format!("Operator '{op}' is not supported on JSON paths"),
            )),
            _ => Ok((format!("{extract} {op} ?"), vec![path, value])),
        }
    }
}

/// Prefix bare paths with `$.`.
pub(crate) fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('$') {
        path.to_string()
    } else {
        format!("$.{path}")
    }
}

fn scalar_binding(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or_else(|| Value::Text(n.to_string())),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn driver_names() {
        assert_eq!(Dialect::from_driver_name("sqlite"), Dialect::Sqlite);
        assert_eq!(Dialect::from_driver_name("SQLite"), Dialect::Sqlite);
        assert_eq!(Dialect::from_driver_name("mysql"), Dialect::MySql);
        assert_eq!(Dialect::from_driver_name("pgsql"), Dialect::MySql);
    }

    #[test]
    fn path_is_normalized() {
        assert_eq!(normalize_path("meta.tags"), "$.meta.tags");
        assert_eq!(normalize_path("$.a"), "$.a");
    }

    #[test]
    fn contains_per_dialect() {
        let g = Grammar::default();
        let (sql, v) = Dialect::MySql.contains("tags", &json!("rust"), &g);
        assert_eq!(sql, "JSON_CONTAINS(`tags`, ?)");
        assert_eq!(v, Value::Text("\"rust\"".into()));

        let (sql, v) = Dialect::Sqlite.contains("tags", &json!("rust"), &g);
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM json_each(`tags`) WHERE json_each.value = ?)"
        );
        assert_eq!(v, Value::Text("rust".into()));
    }

    #[test]
    fn path_predicate_binds_path_then_value() {
        let (sql, binds) = Dialect::Sqlite
            .path_predicate("meta", "score", ">", Value::Int(3), &Grammar::default())
            .unwrap();
        assert_eq!(sql, "json_extract(`meta`, ?) > ?");
        assert_eq!(binds, vec![Value::Text("$.score".into()), Value::Int(3)]);
    }

    #[test]
    fn path_predicate_rejects_list_operators() {
        let err = Dialect::MySql
            .path_predicate("meta", "a", "in", Value::Int(1), &Grammar::default())
            .unwrap_err();
        assert!(err.is_argument());
    }
}
