//! Connection trait consumed by statement execution.
//!
//! bindorm never opens, pools or closes connections. Anything that can run SQL
//! with positional `?` placeholders implements [`Connection`]; statements and
//! relations accept `&impl Connection`.

use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;

/// A database connection able to run compiled statements.
pub trait Connection: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        bindings: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Execute a query and return the first row, if any.
    ///
    /// Semantics:
    /// - 0 rows: returns `Ok(None)`
    /// - 1 or more rows: returns `Ok(Some(first_row))` (does **not** error)
    fn fetch_one(
        &self,
        sql: &str,
        bindings: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Option<Row>>> + Send;

    /// Execute a query and return all rows.
    fn fetch_all(
        &self,
        sql: &str,
        bindings: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Name of the driver behind this connection (`mysql`, `sqlite`, `pgsql`, ...).
    ///
    /// Used to pick dialect-specific SQL such as JSON functions.
    fn driver_name(&self) -> OrmResult<String>;

    /// Execute a query and require that it returns at least one row.
    fn fetch_one_required(
        &self,
        sql: &str,
        bindings: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Row>> + Send {
        async move {
            self.fetch_one(sql, bindings)
                .await?
                .ok_or_else(|| OrmError::not_found("Expected 1 row, got 0"))
        }
    }
}

impl<C: Connection> Connection for &C {
    fn execute(
        &self,
        sql: &str,
        bindings: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, bindings)
    }

    fn fetch_one(
        &self,
        sql: &str,
        bindings: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Option<Row>>> + Send {
        (**self).fetch_one(sql, bindings)
    }

    fn fetch_all(
        &self,
        sql: &str,
        bindings: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send {
        (**self).fetch_all(sql, bindings)
    }

    fn driver_name(&self) -> OrmResult<String> {
        (**self).driver_name()
    }
}
