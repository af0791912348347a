//! [`Connection`] implementation for `tokio-postgres`.
//!
//! Statements compile with `?` placeholders; they are renumbered to `$1, $2, ...`
//! before being sent. Configure `quote_char = '"'` for PostgreSQL identifiers.
//!
//! ```ignore
//! let (client, connection) = tokio_postgres::connect(&url, tokio_postgres::NoTls).await?;
//! tokio::spawn(connection);
//! let conn = bindorm::pg::PgConnection::new(client);
//! let users = qb::table("users").fetch_rows(&conn).await?;
//! ```

use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type};

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql_checked(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            #[allow(clippy::cast_possible_truncation)]
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Text(v) => v.to_sql_checked(ty, out),
            Value::Bytes(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Json(v) => v.to_sql_checked(ty, out),
            Value::Array(_) => Err("list values must be expanded into placeholders before binding".into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// Rewrite `?` placeholders to `$n`, skipping quoted literals and identifiers.
pub fn to_numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut in_quote: Option<char> = None;
    let mut n = 0;
    for ch in sql.chars() {
        match in_quote {
            Some(q) if ch == q => in_quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => in_quote = Some(ch),
            None if ch == '?' => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
                continue;
            }
            None => {}
        }
        out.push(ch);
    }
    out
}

fn decode_column(row: &tokio_postgres::Row, idx: usize) -> OrmResult<Value> {
    let column = &row.columns()[idx];
    let decode_err = |e: tokio_postgres::Error| OrmError::decode(column.name(), e.to_string());
    let value = match *column.type_() {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(decode_err)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).map_err(decode_err)?.into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(decode_err)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(decode_err)?.into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map_err(decode_err)?.into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(decode_err)?.into(),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .map_err(decode_err)?
            .map_or(Value::Null, Value::Bytes),
        Type::UUID => row.try_get::<_, Option<uuid::Uuid>>(idx).map_err(decode_err)?.into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(decode_err)?
            .into(),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(decode_err)?
            .map(|ts| ts.and_utc())
            .into(),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(decode_err)?
            .into(),
        _ => row.try_get::<_, Option<String>>(idx).map_err(decode_err)?.into(),
    };
    Ok(value)
}

fn convert_row(row: &tokio_postgres::Row) -> OrmResult<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        out.set(column.name(), decode_column(row, idx)?);
    }
    Ok(out)
}

fn params(bindings: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    bindings.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

/// A `tokio_postgres::Client` usable as a [`Connection`].
pub struct PgConnection {
    client: tokio_postgres::Client,
}

impl std::fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnection").finish_non_exhaustive()
    }
}

impl PgConnection {
    pub fn new(client: tokio_postgres::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }

    pub fn into_inner(self) -> tokio_postgres::Client {
        self.client
    }
}

impl Connection for PgConnection {
    async fn execute(&self, sql: &str, bindings: &[Value]) -> OrmResult<u64> {
        let sql = to_numbered_placeholders(sql);
        Ok(self.client.execute(sql.as_str(), &params(bindings)).await?)
    }

    async fn fetch_one(&self, sql: &str, bindings: &[Value]) -> OrmResult<Option<Row>> {
        let sql = to_numbered_placeholders(sql);
        let rows = self.client.query(sql.as_str(), &params(bindings)).await?;
        rows.first().map(convert_row).transpose()
    }

    async fn fetch_all(&self, sql: &str, bindings: &[Value]) -> OrmResult<Vec<Row>> {
        let sql = to_numbered_placeholders(sql);
        let rows = self.client.query(sql.as_str(), &params(bindings)).await?;
        rows.iter().map(convert_row).collect()
    }

    fn driver_name(&self) -> OrmResult<String> {
        Ok("pgsql".to_string())
    }
}
