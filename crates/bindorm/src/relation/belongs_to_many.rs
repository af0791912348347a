use crate::config::OrmContext;
use crate::error::OrmResult;
use crate::model::{Entity, ModelClass};
use crate::qb::Statement;
use crate::value::Value;
use std::sync::Arc;

/// Column carrying the parent key of each related row in batched loads.
pub(crate) const PIVOT_KEY_ALIAS: &str = "__bindorm_pivot_key";

/// `SELECT related.* FROM related INNER JOIN pivot ON pivot.related_pivot_key = related.related_key`
pub(crate) fn pivot_query(
    ctx: &OrmContext,
    related: &Arc<ModelClass>,
    pivot_table: &str,
    related_pivot_key: &str,
    related_key: &str,
) -> Statement {
    let table = related.table();
    Statement::for_model(Arc::clone(related), ctx)
        .select([format!("{table}.*")])
        .join(
            pivot_table,
            &format!("{pivot_table}.{related_pivot_key}"),
            "=",
            &format!("{table}.{related_key}"),
        )
}

/// Many-to-many through a pivot table.
#[derive(Debug, Clone)]
pub struct BelongsToMany {
    ctx: OrmContext,
    related: Arc<ModelClass>,
    pivot_table: String,
    foreign_pivot_key: String,
    related_pivot_key: String,
    parent_key: String,
    related_key: String,
    parent_value: Value,
}

impl BelongsToMany {
    /// Keys default to `id` on both sides; see [`keys`](BelongsToMany::keys).
    pub fn new(
        ctx: &OrmContext,
        parent: &Entity,
        related: &str,
        pivot_table: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
    ) -> OrmResult<Self> {
        let related = ctx.resolver().resolve(related)?;
        Ok(Self {
            ctx: ctx.clone(),
            related,
            pivot_table: pivot_table.to_string(),
            foreign_pivot_key: foreign_pivot_key.to_string(),
            related_pivot_key: related_pivot_key.to_string(),
            parent_key: "id".to_string(),
            related_key: "id".to_string(),
            parent_value: parent.get("id").cloned().unwrap_or(Value::Null),
        })
    }

    /// Use `parent_key` on the parent and `related_key` on the related class.
    pub fn keys(mut self, parent: &Entity, parent_key: &str, related_key: &str) -> Self {
        self.parent_value = parent.get(parent_key).cloned().unwrap_or(Value::Null);
        self.parent_key = parent_key.to_string();
        self.related_key = related_key.to_string();
        self
    }

    pub fn query(&self) -> Statement {
        pivot_query(
            &self.ctx,
            &self.related,
            &self.pivot_table,
            &self.related_pivot_key,
            &self.related_key,
        )
        .where_(
            &format!("{}.{}", self.pivot_table, self.foreign_pivot_key),
            "=",
            self.parent_value.clone(),
        )
    }

    pub fn related_class(&self) -> &Arc<ModelClass> {
        &self.related
    }

    pub fn pivot_table(&self) -> &str {
        &self.pivot_table
    }

    pub fn parent_key(&self) -> &str {
        &self.parent_key
    }
}
