use crate::config::OrmContext;
use crate::error::OrmResult;
use crate::model::{Entity, ModelClass};
use crate::qb::Statement;
use crate::value::Value;
use std::sync::Arc;

/// Column carrying the parent key of each related row in batched loads.
pub(crate) const THROUGH_KEY_ALIAS: &str = "__bindorm_through_key";

/// `SELECT related.* FROM related INNER JOIN through ON through.second_local_key = related.second_key`
pub(crate) fn through_query(
    ctx: &OrmContext,
    related: &Arc<ModelClass>,
    through: &ModelClass,
    second_key: &str,
    second_local_key: &str,
) -> Statement {
    let table = related.table();
    let through_table = through.table();
    Statement::for_model(Arc::clone(related), ctx)
        .select([format!("{table}.*")])
        .join(
            through_table,
            &format!("{through_table}.{second_local_key}"),
            "=",
            &format!("{table}.{second_key}"),
        )
}

/// One related row reached through an intermediate class.
///
/// For mechanic → car → owner: `through` is the car class, `first_key` is
/// `cars.mechanic_id` and `second_key` is `owners.car_id`.
#[derive(Debug, Clone)]
pub struct HasOneThrough {
    ctx: OrmContext,
    related: Arc<ModelClass>,
    through: Arc<ModelClass>,
    first_key: String,
    second_key: String,
    local_key: String,
    second_local_key: String,
    parent_value: Value,
}

impl HasOneThrough {
    /// Both classes are resolved and validated independently. Local keys default to `id`.
    pub fn new(
        ctx: &OrmContext,
        parent: &Entity,
        related: &str,
        through: &str,
        first_key: &str,
        second_key: &str,
    ) -> OrmResult<Self> {
        let related = ctx.resolver().resolve(related)?;
        let through = ctx.resolver().resolve(through)?;
        Ok(Self {
            ctx: ctx.clone(),
            related,
            through,
            first_key: first_key.to_string(),
            second_key: second_key.to_string(),
            local_key: "id".to_string(),
            second_local_key: "id".to_string(),
            parent_value: parent.get("id").cloned().unwrap_or(Value::Null),
        })
    }

    /// Use `local_key` on the parent and `second_local_key` on the through class.
    pub fn keys(mut self, parent: &Entity, local_key: &str, second_local_key: &str) -> Self {
        self.parent_value = parent.get(local_key).cloned().unwrap_or(Value::Null);
        self.local_key = local_key.to_string();
        self.second_local_key = second_local_key.to_string();
        self
    }

    pub fn query(&self) -> Statement {
        through_query(
            &self.ctx,
            &self.related,
            &self.through,
            &self.second_key,
            &self.second_local_key,
        )
        .where_(
            &format!("{}.{}", self.through.table(), self.first_key),
            "=",
            self.parent_value.clone(),
        )
    }

    pub fn related_class(&self) -> &Arc<ModelClass> {
        &self.related
    }

    pub fn through_class(&self) -> &Arc<ModelClass> {
        &self.through
    }
}
