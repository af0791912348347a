//! SQL rendering for every statement kind.

use crate::error::{OrmError, OrmResult};
use crate::ident::Grammar;
use crate::qb::bindings::{Bucket, count_placeholders};
use crate::qb::statement::{Statement, soft_delete_filter};
use crate::qb::where_clause::{Connector, WhereCondition, placeholders, render_conditions};
use crate::qb::StatementKind;
use crate::value::Value;
use std::borrow::Cow;

/// SQL text and its bindings in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl Statement {
    /// Render the SQL text.
    pub fn to_sql(&self) -> OrmResult<String> {
        Ok(self.compile()?.sql)
    }

    /// Render the SQL text together with its bindings.
    ///
    /// Fails with the first error recorded while building, and with a state
    /// error if the number of `?` placeholders differs from the number of
    /// bindings.
    pub fn compile(&self) -> OrmResult<CompiledQuery> {
        self.validate()?;
        if self.table.is_empty() {
            return Err(OrmError::argument("Statement has no table; call from() first"));
        }
        let g = self.grammar();
        let sql = match self.kind {
            StatementKind::Select => self.compile_select(&g),
            StatementKind::Insert | StatementKind::InsertIgnore => self.compile_insert(&g)?,
            StatementKind::Update => self.compile_update(&g)?,
            StatementKind::Delete => self.compile_delete(&g)?,
            StatementKind::Upsert => self.compile_upsert(&g)?,
        };
        let bindings = self.bindings.merge_in_render_order(self.kind);
        let expected = count_placeholders(&sql, g.quote_char());
        if expected != bindings.len() {
            return Err(OrmError::state(format!(
                "Placeholder count ({expected}) does not match binding count ({}) for: {sql}",
                bindings.len()
            )));
        }
        Ok(CompiledQuery { sql, bindings })
    }

    /// Compile `SELECT COUNT(*) AS aggregate ...` for this SELECT.
    ///
    /// ORDER BY, LIMIT and OFFSET are dropped. Grouped, distinct and unioned
    /// queries are counted through a derived table.
    pub fn count_sql(&self) -> OrmResult<CompiledQuery> {
        if self.kind != StatementKind::Select {
            return Err(OrmError::state(format!(
                "Cannot count a {:?} statement",
                self.kind
            )));
        }
        let mut base = self.clone();
        base.orders.clear();
        base.bindings.clear(Bucket::Order);
        base.limit = None;
        base.offset = None;

        let wrap = base.distinct
            || !base.group_by.is_empty()
            || base.having.is_some()
            || !base.unions.is_empty();
        if wrap {
            let inner = base.compile()?;
            return Ok(CompiledQuery {
                sql: format!(
                    "SELECT COUNT(*) AS aggregate FROM ({}) AS aggregate_table",
                    inner.sql
                ),
                bindings: inner.bindings,
            });
        }

        base.columns = vec!["COUNT(*) AS aggregate".to_string()];
        base.expressions.clear();
        base.bindings.clear(Bucket::Select);
        base.compile()
    }

    fn compile_select(&self, g: &Grammar) -> String {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        for expr in &self.expressions {
            sql.push_str(", ");
            sql.push_str(expr);
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        let wheres = self.select_wheres(g);
        if let Some(where_sql) = self.render_where(&wheres, g) {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(having);
        }
        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.orders.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        for union in &self.unions {
            sql.push(' ');
            sql.push_str(union);
        }
        sql
    }

    /// WHERE conditions of a SELECT, with the soft-delete filter added when the
    /// model requires it.
    fn select_wheres(&self, g: &Grammar) -> Cow<'_, [WhereCondition]> {
        if !self.auto_filters_soft_deletes() {
            return Cow::Borrowed(&self.wheres);
        }
        let column = self.soft_delete_column();
        if self
            .wheres
            .iter()
            .any(|c| c.is_null_check(column, false, Connector::And, g))
        {
            return Cow::Borrowed(&self.wheres);
        }
        let mut wheres = if has_top_level_or(&self.wheres) {
            vec![WhereCondition::Nested {
                conditions: self.wheres.clone(),
                connector: Connector::And,
            }]
        } else {
            self.wheres.clone()
        };
        wheres.push(soft_delete_filter(column));
        Cow::Owned(wheres)
    }

    /// Structured conditions followed by the JSON predicates, joined with AND.
    fn render_where(&self, wheres: &[WhereCondition], g: &Grammar) -> Option<String> {
        let mut parts = Vec::new();
        if !wheres.is_empty() {
            let structured = render_conditions(wheres, g);
            if !self.json_wheres.is_empty() && has_top_level_or(wheres) {
                parts.push(format!("({structured})"));
            } else {
                parts.push(structured);
            }
        }
        parts.extend(self.json_wheres.iter().cloned());
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" AND "))
        }
    }

    fn mutation_column_list(&self, g: &Grammar) -> OrmResult<Vec<String>> {
        if self.mutation_columns.is_empty() {
            return Err(OrmError::argument(format!(
                "{:?} requires at least one column",
                self.kind
            )));
        }
        Ok(self
            .mutation_columns
            .iter()
            .map(|c| g.wrap_column(c))
            .collect())
    }

    fn compile_insert(&self, g: &Grammar) -> OrmResult<String> {
        let columns = self.mutation_column_list(g)?;
        let verb = if self.kind == StatementKind::InsertIgnore {
            "INSERT OR IGNORE INTO"
        } else {
            "INSERT INTO"
        };
        Ok(format!(
            "{verb} {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders(columns.len())
        ))
    }

    fn compile_update(&self, g: &Grammar) -> OrmResult<String> {
        let sets: Vec<String> = self
            .mutation_column_list(g)?
            .into_iter()
            .map(|c| format!("{c} = ?"))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, sets.join(", "));
        if let Some(where_sql) = self.render_where(&self.wheres, g) {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        Ok(sql)
    }

    fn compile_delete(&self, g: &Grammar) -> OrmResult<String> {
        let Some(where_sql) = self.render_where(&self.wheres, g) else {
            return Err(OrmError::state(format!(
                "DELETE FROM {} without a WHERE clause is not allowed",
                self.table
            )));
        };
        Ok(format!("DELETE FROM {} WHERE {where_sql}", self.table))
    }

    fn compile_upsert(&self, g: &Grammar) -> OrmResult<String> {
        if self.upsert_unique.is_empty() {
            return Err(OrmError::argument("UPSERT requires at least one unique column"));
        }
        let columns = self.mutation_column_list(g)?;
        let unique: Vec<String> = self.upsert_unique.iter().map(|c| g.wrap_column(c)).collect();
        let update: Vec<String> = match &self.upsert_update {
            Some(cols) if !cols.is_empty() => cols.iter().map(|c| g.wrap_column(c)).collect(),
            _ => columns.clone(),
        };
        let sets: Vec<String> = update
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
            self.table,
            columns.join(", "),
            placeholders(columns.len()),
            unique.join(", "),
            sets.join(", ")
        ))
    }
}

fn has_top_level_or(conditions: &[WhereCondition]) -> bool {
    conditions
        .iter()
        .skip(1)
        .any(|c| c.connector() == Connector::Or)
}
