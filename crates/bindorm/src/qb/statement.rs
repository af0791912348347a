//! The statement builder.

use crate::config::OrmContext;
use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};
use crate::ident::Grammar;
use crate::model::ModelClass;
use crate::qb::bindings::{Bindings, Bucket};
use crate::qb::json::Dialect;
use crate::qb::where_clause::{Column, Connector, Operand, Operator, WhereCondition};
use crate::qb::window::{Window, render_window_column};
use crate::qb::{Direction, StatementKind};
use crate::value::Value;
use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// How a SELECT treats soft-deleted rows of a soft-deleting model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoftDeleteMode {
    /// Exclude soft-deleted rows (`deleted_at IS NULL` is added at compile time).
    #[default]
    Default,
    /// Include soft-deleted rows.
    WithTrashed,
    /// Only soft-deleted rows.
    OnlyTrashed,
}

/// Callback applied to the query of an eagerly loaded relation.
#[derive(Clone)]
pub struct EagerConstraint(Arc<dyn Fn(Statement) -> Statement + Send + Sync>);

impl EagerConstraint {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Statement) -> Statement + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn apply(&self, query: Statement) -> Statement {
        (self.0)(query)
    }
}

impl fmt::Debug for EagerConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EagerConstraint(..)")
    }
}

/// A SQL statement under construction.
///
/// Clause methods consume and return the statement. Misuse (an unknown operator,
/// an empty `where_in` list, ...) is recorded and reported by
/// [`compile`](Statement::compile) or any execution method.
#[derive(Debug, Clone)]
pub struct Statement {
    pub(crate) ctx: OrmContext,
    pub(crate) kind: StatementKind,
    kind_locked: bool,
    pub(crate) table: String,
    /// Rendered SELECT list entries; empty means `*`.
    pub(crate) columns: Vec<String>,
    /// Window and JSON expressions, rendered after `columns`.
    pub(crate) expressions: Vec<String>,
    /// INSERT/UPDATE column names; values live in the mutation bucket.
    pub(crate) mutation_columns: Vec<String>,
    pub(crate) wheres: Vec<WhereCondition>,
    /// Raw JSON predicates, joined to the structured WHERE with AND.
    pub(crate) json_wheres: Vec<String>,
    pub(crate) joins: Vec<String>,
    pub(crate) group_by: Vec<String>,
    pub(crate) having: Option<String>,
    pub(crate) orders: Vec<String>,
    pub(crate) unions: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) distinct: bool,
    pub(crate) soft_delete_mode: SoftDeleteMode,
    pub(crate) model: Option<Arc<ModelClass>>,
    pub(crate) eager: Vec<String>,
    pub(crate) eager_constraints: HashMap<String, EagerConstraint>,
    pub(crate) upsert_unique: Vec<String>,
    pub(crate) upsert_update: Option<Vec<String>>,
    pub(crate) dialect: Dialect,
    pub(crate) bindings: Bindings,
    build_error: Option<OrmError>,
}

impl Default for Statement {
    fn default() -> Self {
        Self::new()
    }
}

impl Statement {
    /// Create an empty SELECT statement using the global context.
    pub fn new() -> Self {
        Self::with_context(OrmContext::global())
    }

    /// Create an empty SELECT statement using `ctx` for configuration and model resolution.
    pub fn with_context(ctx: OrmContext) -> Self {
        Self {
            ctx,
            kind: StatementKind::Select,
            kind_locked: false,
            table: String::new(),
            columns: Vec::new(),
            expressions: Vec::new(),
            mutation_columns: Vec::new(),
            wheres: Vec::new(),
            json_wheres: Vec::new(),
            joins: Vec::new(),
            group_by: Vec::new(),
            having: None,
            orders: Vec::new(),
            unions: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
            soft_delete_mode: SoftDeleteMode::Default,
            model: None,
            eager: Vec::new(),
            eager_constraints: HashMap::new(),
            upsert_unique: Vec::new(),
            upsert_update: None,
            dialect: Dialect::default(),
            bindings: Bindings::new(),
            build_error: None,
        }
    }

    /// SELECT statement for `table`.
    pub fn table(table: &str) -> Self {
        Self::new().from(table)
    }

    /// SELECT statement for a model class.
    pub fn for_model(class: Arc<ModelClass>, ctx: &OrmContext) -> Self {
        Self::with_context(ctx.clone()).model(class)
    }

    /// Statement sharing this one's context, table and dialect but no clauses.
    pub(crate) fn scope(&self) -> Self {
        let mut scope = Self::with_context(self.ctx.clone());
        scope.table = self.table.clone();
        scope.dialect = self.dialect;
        scope
    }

    fn fail(&mut self, err: OrmError) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    pub(crate) fn grammar(&self) -> Grammar {
        self.ctx.config().grammar()
    }

    pub(crate) fn soft_delete_column(&self) -> &str {
        &self.ctx.config().soft_delete_column
    }

    /// True if compiling this SELECT adds the soft-delete filter.
    pub(crate) fn auto_filters_soft_deletes(&self) -> bool {
        self.soft_delete_mode == SoftDeleteMode::Default
            && self.model.as_ref().is_some_and(|m| m.has_soft_deletes())
    }

    fn set_kind(&mut self, kind: StatementKind) {
        if self.kind_locked && self.kind != kind {
            self.fail(OrmError::state(format!(
                "Statement already defined as {:?}, cannot redefine it as {:?}",
                self.kind, kind
            )));
            return;
        }
        self.kind = kind;
        self.kind_locked = true;
    }

    // ==================== Accessors ====================

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn context(&self) -> &OrmContext {
        &self.ctx
    }

    pub fn model_class(&self) -> Option<&Arc<ModelClass>> {
        self.model.as_ref()
    }

    pub fn soft_delete_mode(&self) -> SoftDeleteMode {
        self.soft_delete_mode
    }

    /// Relations requested with [`with`](Statement::with), in request order.
    pub fn eager_relations(&self) -> &[String] {
        &self.eager
    }

    pub fn eager_constraint(&self, relation: &str) -> Option<&EagerConstraint> {
        self.eager_constraints.get(relation)
    }

    pub fn dialect_in_use(&self) -> Dialect {
        self.dialect
    }

    /// The first error recorded while building, if any.
    pub fn build_error(&self) -> Option<&OrmError> {
        self.build_error.as_ref()
    }

    /// Bound values in placeholder order.
    pub fn bindings(&self) -> Vec<Value> {
        self.bindings.merge_in_render_order(self.kind)
    }

    pub(crate) fn validate(&self) -> OrmResult<()> {
        match &self.build_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    // ==================== Source ====================

    /// Set the table.
    pub fn from(mut self, table: &str) -> Self {
        self.table = table.trim().to_string();
        self
    }

    /// Associate a model class. Sets the table if none is set yet.
    pub fn model(mut self, class: Arc<ModelClass>) -> Self {
        if self.table.is_empty() {
            self.table = class.table().to_string();
        }
        self.model = Some(class);
        self
    }

    /// Use the JSON dialect of `conn`.
    ///
    /// JSON expressions are rendered when added, so call this before them.
    pub fn on_connection(mut self, conn: &impl Connection) -> Self {
        self.dialect = Dialect::detect(conn);
        self
    }

    /// Use `dialect` for JSON expressions added after this call.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    // ==================== SELECT list ====================

    /// Replace the SELECT list.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let g = self.grammar();
        self.columns = columns
            .into_iter()
            .map(|c| g.wrap_select_column(c.as_ref()))
            .collect();
        self
    }

    /// Append to the SELECT list.
    pub fn add_select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let g = self.grammar();
        self.columns
            .extend(columns.into_iter().map(|c| g.wrap_select_column(c.as_ref())));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ==================== WHERE ====================

    /// Add an `AND column operator value` condition.
    ///
    /// `IS`/`IS NOT` ignore `value` and compare with `NULL`. `IN`/`NOT IN` take a
    /// list (or a scalar, rendered as `(?)`). `BETWEEN` takes a two-element list.
    pub fn where_(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.push_where(column, operator, value.into(), Connector::And)
    }

    /// Add an `OR column operator value` condition.
    pub fn or_where(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.push_where(column, operator, value.into(), Connector::Or)
    }

    fn push_where(mut self, column: &str, operator: &str, value: Value, connector: Connector) -> Self {
        match where_condition(column, operator, value, connector) {
            Ok((cond, values)) => {
                self.wheres.push(cond);
                self.bindings.extend(Bucket::Where, values);
            }
            Err(err) => self.fail(err),
        }
        self
    }

    /// Add a parenthesized group built by `f`, joined with AND.
    ///
    /// # Example
    /// ```ignore
    /// let q = qb::table("users")
    ///     .where_("status", "=", "active")
    ///     .where_nested(|q| q.where_("role", "=", "admin").or_where("role", "=", "editor"));
    /// // ... WHERE `status` = ? AND (`role` = ? OR `role` = ?)
    /// ```
    pub fn where_nested<F>(self, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        self.push_nested(f, Connector::And)
    }

    /// Add a parenthesized group built by `f`, joined with OR.
    pub fn or_where_nested<F>(self, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        self.push_nested(f, Connector::Or)
    }

    fn push_nested<F>(mut self, f: F, connector: Connector) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        let scope = f(self.scope());
        if let Some(err) = scope.build_error {
            self.fail(err);
            return self;
        }
        if !scope.json_wheres.is_empty() {
            self.fail(OrmError::argument(
                "JSON predicates cannot be used inside a nested WHERE group",
            ));
            return self;
        }
        if scope.wheres.is_empty() {
            return self;
        }
        self.wheres.push(WhereCondition::Nested {
            conditions: scope.wheres,
            connector,
        });
        self.bindings
            .extend(Bucket::Where, scope.bindings.bucket(Bucket::Where).to_vec());
        self
    }

    /// Add `AND column operator (SELECT ...)`.
    pub fn where_sub(self, column: &str, operator: &str, sub: Statement) -> Self {
        self.push_sub(column, operator, sub, Connector::And)
    }

    /// Add `OR column operator (SELECT ...)`.
    pub fn or_where_sub(self, column: &str, operator: &str, sub: Statement) -> Self {
        self.push_sub(column, operator, sub, Connector::Or)
    }

    fn push_sub(mut self, column: &str, operator: &str, sub: Statement, connector: Connector) -> Self {
        match subquery_condition(column, operator, &sub, connector) {
            Ok((cond, values)) => {
                self.wheres.push(cond);
                self.bindings.extend(Bucket::Where, values);
            }
            Err(err) => self.fail(err),
        }
        self
    }

    /// Add `AND column IN (?, ...)`. The list must not be empty.
    pub fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, collect_values(values), false, Connector::And)
    }

    /// Add `AND column NOT IN (?, ...)`.
    pub fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, collect_values(values), true, Connector::And)
    }

    /// Add `OR column IN (?, ...)`.
    pub fn or_where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, collect_values(values), false, Connector::Or)
    }

    /// Add `OR column NOT IN (?, ...)`.
    pub fn or_where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, collect_values(values), true, Connector::Or)
    }

    fn push_in(mut self, column: &str, values: Vec<Value>, negated: bool, connector: Connector) -> Self {
        let column = column.trim();
        if column.is_empty() {
            self.fail(OrmError::argument("WHERE IN column cannot be empty"));
            return self;
        }
        if values.is_empty() {
            self.fail(OrmError::argument(format!(
                "WHERE IN on '{column}' requires at least one value"
            )));
            return self;
        }
        self.wheres.push(WhereCondition::List {
            column: Column::new(column),
            negated,
            count: values.len(),
            connector,
        });
        self.bindings.extend(Bucket::Where, values);
        self
    }

    /// Add `AND column IS NULL`, replacing an `AND column IS NOT NULL`.
    pub fn where_null(self, column: &str) -> Self {
        self.push_null(column, false, Connector::And)
    }

    /// Add `AND column IS NOT NULL`, replacing an `AND column IS NULL`.
    pub fn where_not_null(self, column: &str) -> Self {
        self.push_null(column, true, Connector::And)
    }

    pub fn or_where_null(self, column: &str) -> Self {
        self.push_null(column, false, Connector::Or)
    }

    pub fn or_where_not_null(self, column: &str) -> Self {
        self.push_null(column, true, Connector::Or)
    }

    fn push_null(mut self, column: &str, not_null: bool, connector: Connector) -> Self {
        let column = column.trim();
        if column.is_empty() {
            self.fail(OrmError::argument("WHERE column cannot be empty"));
            return self;
        }
        let g = self.grammar();
        let soft_column = g.unwrap(column) == g.unwrap(self.soft_delete_column());
        if !not_null && soft_column && self.auto_filters_soft_deletes() {
            return self;
        }
        self.wheres
            .retain(|c| !c.is_null_check(column, !not_null, connector, &g));
        if self
            .wheres
            .iter()
            .any(|c| c.is_null_check(column, not_null, connector, &g))
        {
            return self;
        }
        let column = if soft_column {
            Column::raw(column)
        } else {
            Column::new(column)
        };
        self.wheres.push(WhereCondition::Raw {
            column,
            operator: if not_null { Operator::IsNot } else { Operator::Is },
            operand: Operand::Null,
            connector,
        });
        self
    }

    // ==================== Soft deletes ====================

    /// Include soft-deleted rows.
    pub fn with_soft_deletes(mut self) -> Self {
        self.strip_soft_delete_checks(false);
        self.soft_delete_mode = SoftDeleteMode::WithTrashed;
        self
    }

    /// Alias for [`with_soft_deletes`](Statement::with_soft_deletes).
    pub fn with_trashed(self) -> Self {
        self.with_soft_deletes()
    }

    /// Only soft-deleted rows.
    pub fn only_trashed(mut self) -> Self {
        self.strip_soft_delete_checks(false);
        self.soft_delete_mode = SoftDeleteMode::OnlyTrashed;
        let column = self.soft_delete_column().to_string();
        self.push_null(&column, true, Connector::And)
    }

    /// Alias for [`only_trashed`](Statement::only_trashed).
    pub fn only_soft_deleted(self) -> Self {
        self.only_trashed()
    }

    /// Exclude soft-deleted rows again.
    pub fn without_trashed(mut self) -> Self {
        self.strip_soft_delete_checks(true);
        self.soft_delete_mode = SoftDeleteMode::Default;
        let column = self.soft_delete_column().to_string();
        self.push_soft_delete_filter(&column);
        self
    }

    fn push_soft_delete_filter(&mut self, column: &str) {
        let g = self.grammar();
        if self
            .wheres
            .iter()
            .any(|c| c.is_null_check(column, false, Connector::And, &g))
        {
            return;
        }
        self.wheres.push(soft_delete_filter(column));
    }

    fn strip_soft_delete_checks(&mut self, not_null: bool) {
        let g = self.grammar();
        let column = self.soft_delete_column().to_string();
        self.wheres.retain(|c| {
            !c.is_null_check(&column, not_null, Connector::And, &g)
                && !c.is_null_check(&column, not_null, Connector::Or, &g)
        });
    }

    /// Turn this statement into an UPDATE that marks the matched rows deleted.
    pub fn soft_delete(self) -> Self {
        let column = self.soft_delete_column().to_string();
        self.update([(column, Value::Timestamp(Utc::now()))])
    }

    /// Turn this statement into an UPDATE that clears the soft-delete column.
    pub fn restore(self) -> Self {
        let column = self.soft_delete_column().to_string();
        self.with_soft_deletes().update([(column, Value::Null)])
    }

    // ==================== JOIN ====================

    /// `INNER JOIN table ON left op right`. The operator is emitted as given.
    pub fn join(self, table: &str, left: &str, operator: &str, right: &str) -> Self {
        self.push_join("INNER JOIN", table, left, operator, right)
    }

    pub fn left_join(self, table: &str, left: &str, operator: &str, right: &str) -> Self {
        self.push_join("LEFT JOIN", table, left, operator, right)
    }

    pub fn right_join(self, table: &str, left: &str, operator: &str, right: &str) -> Self {
        self.push_join("RIGHT JOIN", table, left, operator, right)
    }

    pub fn full_join(self, table: &str, left: &str, operator: &str, right: &str) -> Self {
        self.push_join("FULL OUTER JOIN", table, left, operator, right)
    }

    fn push_join(mut self, join: &str, table: &str, left: &str, operator: &str, right: &str) -> Self {
        let g = self.grammar();
        self.joins.push(format!(
            "{join} {} ON {} {} {}",
            table.trim(),
            g.wrap_column(left.trim()),
            operator.trim(),
            g.wrap_column(right.trim())
        ));
        self
    }

    /// `INNER JOIN (SELECT ...) AS alias ON left op right`.
    pub fn join_sub(self, sub: Statement, alias: &str, left: &str, operator: &str, right: &str) -> Self {
        self.push_join_sub("INNER JOIN", sub, alias, left, operator, right)
    }

    pub fn left_join_sub(
        self,
        sub: Statement,
        alias: &str,
        left: &str,
        operator: &str,
        right: &str,
    ) -> Self {
        self.push_join_sub("LEFT JOIN", sub, alias, left, operator, right)
    }

    fn push_join_sub(
        mut self,
        join: &str,
        sub: Statement,
        alias: &str,
        left: &str,
        operator: &str,
        right: &str,
    ) -> Self {
        let compiled = match sub.compile() {
            Ok(compiled) => compiled,
            Err(err) => {
                self.fail(err);
                return self;
            }
        };
        let g = self.grammar();
        self.joins.push(format!(
            "{join} ({}) AS {} ON {} {} {}",
            compiled.sql,
            g.wrap_alias(alias.trim()),
            g.wrap_column(left.trim()),
            operator.trim(),
            g.wrap_column(right.trim())
        ));
        self.bindings.extend(Bucket::Join, compiled.bindings);
        self
    }

    /// Append a raw JOIN fragment and its bindings verbatim.
    pub fn join_raw<I, V>(mut self, sql: &str, bindings: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.joins.push(sql.trim().to_string());
        self.bindings.extend(Bucket::Join, collect_values(bindings));
        self
    }

    // ==================== GROUP BY / HAVING ====================

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let g = self.grammar();
        self.group_by
            .extend(columns.into_iter().map(|c| g.wrap_column(c.as_ref().trim())));
        self
    }

    /// Set the HAVING predicate, replacing any previous one.
    ///
    /// `column` is quoted as an alias so SELECT aliases can be referenced.
    pub fn having(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        let op = match Operator::parse(operator) {
            Ok(op) => op,
            Err(err) => {
                self.fail(err);
                return self;
            }
        };
        if matches!(
            op,
            Operator::In | Operator::NotIn | Operator::Between | Operator::Is | Operator::IsNot
        ) {
            self.fail(OrmError::argument(format!(
                "Operator '{op}' is not supported in HAVING"
            )));
            return self;
        }
        let g = self.grammar();
        self.having = Some(format!("{} {op} ?", g.wrap_alias(column.trim())));
        self.bindings.replace(Bucket::Having, vec![value.into()]);
        self
    }

    // ==================== ORDER BY ====================

    /// `ORDER BY column direction`; direction is `ASC` or `DESC`.
    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        match Direction::parse(direction) {
            Ok(dir) => {
                let col = self.grammar().wrap_column(column.trim());
                self.orders.push(format!("{col} {}", dir.as_sql()));
            }
            Err(err) => self.fail(err),
        }
        self
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, "DESC")
    }

    /// Append a raw ORDER BY fragment.
    pub fn order_by_raw(mut self, sql: &str) -> Self {
        self.orders.push(sql.trim().to_string());
        self
    }

    /// `ORDER BY CASE column WHEN ? THEN rank ... ELSE 'literal' END direction`.
    ///
    /// Keys are bound. The ELSE value is inlined as a string literal.
    pub fn order_by_case<I, K>(mut self, column: &str, ranks: I, else_literal: &str, direction: &str) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<Value>,
    {
        let dir = match Direction::parse(direction) {
            Ok(dir) => dir,
            Err(err) => {
                self.fail(err);
                return self;
            }
        };
        let mut sql = format!("CASE {}", self.grammar().wrap_column(column.trim()));
        let mut keys = Vec::new();
        for (key, rank) in ranks {
            sql.push_str(&format!(" WHEN ? THEN {rank}"));
            keys.push(key.into());
        }
        if keys.is_empty() {
            self.fail(OrmError::argument("ORDER BY CASE requires at least one WHEN"));
            return self;
        }
        sql.push_str(&format!(
            " ELSE '{}' END {}",
            else_literal.replace('\'', "''"),
            dir.as_sql()
        ));
        self.orders.push(sql);
        self.bindings.extend(Bucket::Order, keys);
        self
    }

    // ==================== UNION ====================

    /// Append `UNION [ALL] (sub statement)`.
    pub fn union(mut self, sub: Statement, all: bool) -> Self {
        match sub.compile() {
            Ok(compiled) => {
                self.unions.push(format!("{} {}", union_keyword(all), compiled.sql));
                self.bindings.extend(Bucket::Union, compiled.bindings);
            }
            Err(err) => self.fail(err),
        }
        self
    }

    /// Append `UNION [ALL] sql`.
    pub fn union_raw(mut self, sql: &str, all: bool) -> Self {
        self.unions
            .push(format!("{} {}", union_keyword(all), sql.trim()));
        self
    }

    // ==================== LIMIT / OFFSET ====================

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Set LIMIT/OFFSET for a 1-based page.
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        let page = page.max(1);
        self.limit(per_page).offset((page - 1) * per_page)
    }

    // ==================== WINDOW ====================

    /// `ROW_NUMBER() OVER (...) AS alias`
    pub fn row_number(self, window: Window, alias: &str) -> Self {
        self.push_window("ROW_NUMBER()".to_string(), window, alias)
    }

    /// `RANK() OVER (...) AS alias`
    pub fn rank(self, window: Window, alias: &str) -> Self {
        self.push_window("RANK()".to_string(), window, alias)
    }

    /// `DENSE_RANK() OVER (...) AS alias`
    pub fn dense_rank(self, window: Window, alias: &str) -> Self {
        self.push_window("DENSE_RANK()".to_string(), window, alias)
    }

    pub fn sum_over(self, column: &str, window: Window, alias: &str) -> Self {
        self.push_aggregate_window("SUM", column, window, alias)
    }

    pub fn avg_over(self, column: &str, window: Window, alias: &str) -> Self {
        self.push_aggregate_window("AVG", column, window, alias)
    }

    pub fn min_over(self, column: &str, window: Window, alias: &str) -> Self {
        self.push_aggregate_window("MIN", column, window, alias)
    }

    pub fn max_over(self, column: &str, window: Window, alias: &str) -> Self {
        self.push_aggregate_window("MAX", column, window, alias)
    }

    /// `expression OVER (...) AS alias`, with `expression` emitted as given.
    pub fn window_raw(self, expression: &str, window: Window, alias: &str) -> Self {
        self.push_window(expression.trim().to_string(), window, alias)
    }

    fn push_aggregate_window(self, function: &str, column: &str, window: Window, alias: &str) -> Self {
        let expr = format!("{function}({})", self.grammar().wrap_column(column.trim()));
        self.push_window(expr, window, alias)
    }

    fn push_window(mut self, function: String, window: Window, alias: &str) -> Self {
        match render_window_column(&function, &window, alias.trim(), &self.grammar()) {
            Ok(expr) => self.expressions.push(expr),
            Err(err) => self.fail(err),
        }
        self
    }

    // ==================== JSON ====================

    /// Select `JSON_EXTRACT(column, ?) AS alias`, binding `path`.
    pub fn json_extract(mut self, column: &str, path: &str, alias: &str) -> Self {
        let g = self.grammar();
        let expr = format!(
            "{} AS {}",
            self.dialect.extract(column.trim(), &g),
            g.wrap_alias(alias.trim())
        );
        self.expressions.push(expr);
        self.bindings
            .add(Bucket::Select, Value::Text(super::json::normalize_path(path)));
        self
    }

    /// Require the JSON array in `column` to contain `value`.
    pub fn where_json_contains(mut self, column: &str, value: serde_json::Value) -> Self {
        let (sql, binding) = self.dialect.contains(column.trim(), &value, &self.grammar());
        self.json_wheres.push(sql);
        self.bindings.add(Bucket::JsonWhere, binding);
        self
    }

    /// Compare the JSON value at `path` inside `column`.
    pub fn where_json_path(mut self, column: &str, path: &str, operator: &str, value: impl Into<Value>) -> Self {
        let g = self.grammar();
        match self
            .dialect
            .path_predicate(column.trim(), path, operator, value.into(), &g)
        {
            Ok((sql, values)) => {
                self.json_wheres.push(sql);
                self.bindings.extend(Bucket::JsonWhere, values);
            }
            Err(err) => self.fail(err),
        }
        self
    }

    // ==================== Mutations ====================

    /// `INSERT INTO table (...) VALUES (...)`.
    ///
    /// # Example
    /// ```ignore
    /// let q = qb::table("users").insert(bindorm::record! { "name" => "A", "email" => "a@x.com" });
    /// assert_eq!(q.to_sql()?, "INSERT INTO users (`name`, `email`) VALUES (?, ?)");
    /// ```
    pub fn insert<I, K, V>(self, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.set_mutation(StatementKind::Insert, data)
    }

    /// `INSERT OR IGNORE INTO table (...) VALUES (...)`.
    pub fn insert_or_ignore<I, K, V>(self, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.set_mutation(StatementKind::InsertIgnore, data)
    }

    /// `UPDATE table SET ... [WHERE ...]`.
    pub fn update<I, K, V>(self, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.set_mutation(StatementKind::Update, data)
    }

    /// `DELETE FROM table WHERE ...`. Compiling without a WHERE clause fails.
    pub fn delete(mut self) -> Self {
        self.set_kind(StatementKind::Delete);
        self
    }

    /// `INSERT ... ON CONFLICT (unique) DO UPDATE SET col = EXCLUDED.col, ...`.
    ///
    /// Every inserted column is updated unless
    /// [`upsert_update_columns`](Statement::upsert_update_columns) narrows the set.
    pub fn upsert<I, K, V, U, S>(self, data: I, unique: U) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
        U: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut this = self.set_mutation(StatementKind::Upsert, data);
        this.upsert_unique = unique
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if this.upsert_unique.is_empty() {
            this.fail(OrmError::argument("UPSERT requires at least one unique column"));
        }
        this
    }

    /// Columns updated on conflict by an UPSERT.
    pub fn upsert_update_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.upsert_update = Some(
            columns
                .into_iter()
                .map(|c| c.as_ref().trim().to_string())
                .collect(),
        );
        self
    }

    fn set_mutation<I, K, V>(mut self, kind: StatementKind, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.set_kind(kind);
        let (columns, values): (Vec<String>, Vec<Value>) = data
            .into_iter()
            .map(|(k, v)| (k.into().trim().to_string(), v.into()))
            .unzip();
        if columns.is_empty() {
            self.fail(OrmError::argument(format!("{kind:?} requires at least one column")));
            return self;
        }
        if columns.iter().any(String::is_empty) {
            self.fail(OrmError::argument(format!("{kind:?} column name cannot be empty")));
            return self;
        }
        self.mutation_columns = columns;
        self.bindings.replace(Bucket::Mutation, values);
        self
    }

    // ==================== Eager loading ====================

    /// Eager load the named relations of the model class.
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.model.is_none() {
            self.fail(OrmError::argument(
                "with() requires a model class; call model() first",
            ));
            return self;
        }
        for name in relations {
            let name = name.as_ref().trim();
            if !name.is_empty() && !self.eager.iter().any(|r| r == name) {
                self.eager.push(name.to_string());
            }
        }
        self
    }

    /// Eager load `relation`, applying `constraint` to its query.
    pub fn with_constraint<F>(mut self, relation: &str, constraint: F) -> Self
    where
        F: Fn(Statement) -> Statement + Send + Sync + 'static,
    {
        self = self.with([relation]);
        if self.build_error.is_none() {
            self.eager_constraints
                .insert(relation.trim().to_string(), EagerConstraint::new(constraint));
        }
        self
    }
}

fn union_keyword(all: bool) -> &'static str {
    if all { "UNION ALL" } else { "UNION" }
}

fn collect_values<I, V>(values: I) -> Vec<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    values.into_iter().map(Into::into).collect()
}

/// `deleted_at IS NULL`, unquoted.
pub(crate) fn soft_delete_filter(column: &str) -> WhereCondition {
    WhereCondition::Raw {
        column: Column::raw(column),
        operator: Operator::Is,
        operand: Operand::Null,
        connector: Connector::And,
    }
}

fn where_condition(
    column: &str,
    operator: &str,
    value: Value,
    connector: Connector,
) -> OrmResult<(WhereCondition, Vec<Value>)> {
    let column = column.trim();
    if column.is_empty() {
        return Err(OrmError::argument("WHERE column cannot be empty"));
    }
    let op = Operator::parse(operator)?;
    let (operand, values) = match op {
        Operator::Is | Operator::IsNot => (Operand::Null, Vec::new()),
        Operator::In | Operator::NotIn => {
            let items = value.into_list();
            if items.is_empty() {
                return Err(OrmError::argument(format!(
                    "{op} on '{column}' requires at least one value"
                )));
            }
            (Operand::Group(items.len()), items)
        }
        Operator::Between => match value {
            Value::Array(items) if items.len() == 2 => (Operand::Range, items),
            _ => {
                return Err(OrmError::argument(format!(
                    "BETWEEN on '{column}' requires exactly two values"
                )));
            }
        },
        _ => {
            if matches!(value, Value::Array(_)) {
                return Err(OrmError::argument(format!(
                    "Operator '{op}' on '{column}' cannot take a list value"
                )));
            }
            (Operand::Placeholder, vec![value])
        }
    };
    Ok((
        WhereCondition::Raw {
            column: Column::new(column),
            operator: op,
            operand,
            connector,
        },
        values,
    ))
}

fn subquery_condition(
    column: &str,
    operator: &str,
    sub: &Statement,
    connector: Connector,
) -> OrmResult<(WhereCondition, Vec<Value>)> {
    let column = column.trim();
    if column.is_empty() {
        return Err(OrmError::argument("WHERE column cannot be empty"));
    }
    let op = Operator::parse(operator)?;
    if matches!(op, Operator::Between | Operator::Is | Operator::IsNot) {
        return Err(OrmError::argument(format!(
            "Operator '{op}' cannot compare against a sub-query"
        )));
    }
    if sub.kind != StatementKind::Select {
        return Err(OrmError::argument("WHERE sub-query must be a SELECT"));
    }
    let compiled = sub.compile()?;
    Ok((
        WhereCondition::Subquery {
            column: Column::new(column),
            operator: op,
            sql: compiled.sql,
            connector,
        },
        compiled.bindings,
    ))
}
