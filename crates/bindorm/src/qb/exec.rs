//! Statement execution through a [`Connection`].

use crate::connection::Connection;
use crate::eager;
use crate::error::{OrmError, OrmResult};
use crate::model::{Entity, ModelClass};
use crate::pagination::{PageMeta, Paginated, SearchResults};
use crate::qb::compile::CompiledQuery;
use crate::qb::statement::Statement;
use crate::row::{FromRow, Row};
use crate::value::Value;
use std::sync::Arc;

/// Cut `sql` to at most `max_bytes`, on a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

impl Statement {
    fn log_query(&self, query: &CompiledQuery) {
        let sql = match self.ctx.config().max_sql_log_length {
            Some(max) if query.sql.len() > max => {
                format!("{}...", truncate_sql_bytes(&query.sql, max))
            }
            _ => query.sql.clone(),
        };
        tracing::debug!(
            target: "bindorm.sql",
            kind = ?self.kind,
            table = %self.table,
            param_count = query.bindings.len(),
            sql = %sql,
        );
    }

    fn require_model(&self) -> OrmResult<Arc<ModelClass>> {
        self.model.clone().ok_or_else(|| {
            OrmError::argument(format!(
                "Statement on '{}' has no model class; use fetch_rows() or model()",
                self.table
            ))
        })
    }

    /// Execute and return the number of affected rows.
    pub async fn execute(&self, conn: &impl Connection) -> OrmResult<u64> {
        let query = self.compile()?;
        self.log_query(&query);
        conn.execute(&query.sql, &query.bindings).await
    }

    /// Fetch all rows.
    pub async fn fetch_rows(&self, conn: &impl Connection) -> OrmResult<Vec<Row>> {
        let query = self.compile()?;
        self.log_query(&query);
        conn.fetch_all(&query.sql, &query.bindings).await
    }

    /// Fetch the first row (`LIMIT 1` is applied).
    pub async fn fetch_first_row(&self, conn: &impl Connection) -> OrmResult<Option<Row>> {
        let query = self.clone().limit(1).compile()?;
        self.log_query(&query);
        conn.fetch_one(&query.sql, &query.bindings).await
    }

    /// Fetch all rows mapped with [`FromRow`].
    pub async fn fetch_all_as<T: FromRow>(&self, conn: &impl Connection) -> OrmResult<Vec<T>> {
        self.fetch_rows(conn)
            .await?
            .iter()
            .map(T::from_row)
            .collect()
    }

    /// Fetch the first row mapped with [`FromRow`].
    pub async fn fetch_one_as<T: FromRow>(&self, conn: &impl Connection) -> OrmResult<Option<T>> {
        self.fetch_first_row(conn)
            .await?
            .as_ref()
            .map(T::from_row)
            .transpose()
    }

    /// Fetch entities of the model class, with the relations requested by `with()`.
    pub async fn get(&self, conn: &impl Connection) -> OrmResult<Vec<Entity>> {
        let class = self.require_model()?;
        let mut entities: Vec<Entity> = self
            .fetch_rows(conn)
            .await?
            .into_iter()
            .map(|row| Entity::new(Arc::clone(&class), row))
            .collect();
        eager::load_requested(conn, self, &mut entities).await?;
        Ok(entities)
    }

    /// Fetch the first entity.
    pub async fn first(&self, conn: &impl Connection) -> OrmResult<Option<Entity>> {
        Ok(self.clone().limit(1).get(conn).await?.into_iter().next())
    }

    /// Fetch the first entity or fail with a not-found error.
    pub async fn first_or_fail(&self, conn: &impl Connection) -> OrmResult<Entity> {
        self.first(conn)
            .await?
            .ok_or_else(|| OrmError::not_found(format!("No rows in '{}'", self.table)))
    }

    /// Count the rows this SELECT matches.
    pub async fn count(&self, conn: &impl Connection) -> OrmResult<u64> {
        let query = self.count_sql()?;
        self.log_query(&query);
        let Some(row) = conn.fetch_one(&query.sql, &query.bindings).await? else {
            return Ok(0);
        };
        let value = row.get("aggregate").or_else(|| row.iter().next().map(|(_, v)| v));
        match value {
            None | Some(Value::Null) => Ok(0),
            Some(v) => v
                .as_i64()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| OrmError::decode("aggregate", format!("expected a count, got {}", v.type_name()))),
        }
    }

    pub async fn exists(&self, conn: &impl Connection) -> OrmResult<bool> {
        Ok(self.count(conn).await? > 0)
    }

    fn page_meta(&self, total: u64, page: u64, per_page: Option<u64>) -> PageMeta {
        let per_page = per_page.unwrap_or(self.ctx.config().default_per_page);
        PageMeta::new(total, per_page, page)
    }

    /// Fetch one page of rows mapped with [`FromRow`].
    ///
    /// `per_page` defaults to the configured page size.
    pub async fn paginate<T: FromRow>(
        &self,
        conn: &impl Connection,
        page: u64,
        per_page: Option<u64>,
    ) -> OrmResult<Paginated<T>> {
        let total = self.count(conn).await?;
        let meta = self.page_meta(total, page, per_page);
        let data = self
            .clone()
            .limit(meta.per_page)
            .offset(meta.offset())
            .fetch_all_as(conn)
            .await?;
        Ok(Paginated {
            data,
            pagination: meta,
        })
    }

    /// Fetch one page of entities, with eager loads.
    pub async fn paginate_entities(
        &self,
        conn: &impl Connection,
        page: u64,
        per_page: Option<u64>,
    ) -> OrmResult<Paginated<Entity>> {
        let total = self.count(conn).await?;
        let meta = self.page_meta(total, page, per_page);
        let data = self
            .clone()
            .limit(meta.per_page)
            .offset(meta.offset())
            .get(conn)
            .await?;
        Ok(Paginated {
            data,
            pagination: meta,
        })
    }

    /// Add `(col1 LIKE ? OR col2 LIKE ? ...)` for `%term%` and paginate.
    pub async fn search<T: FromRow>(
        &self,
        conn: &impl Connection,
        columns: &[&str],
        term: &str,
        page: u64,
        per_page: Option<u64>,
    ) -> OrmResult<SearchResults<T>> {
        let page = self
            .clone()
            .search_filter(columns, term)?
            .paginate(conn, page, per_page)
            .await?;
        Ok(SearchResults {
            data: page.data,
            search: page.pagination,
        })
    }

    /// The statement with a nested OR LIKE filter over `columns`.
    pub fn search_filter(self, columns: &[&str], term: &str) -> OrmResult<Self> {
        if columns.is_empty() {
            return Err(OrmError::argument("search requires at least one column"));
        }
        let pattern = format!("%{}%", term.trim());
        Ok(self.where_nested(|q| {
            columns
                .iter()
                .fold(q, |q, col| q.or_where(col, "LIKE", pattern.as_str()))
        }))
    }
}
