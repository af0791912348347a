use crate::config::OrmContext;
use crate::error::OrmResult;
use crate::model::{Entity, ModelClass};
use crate::qb::Statement;
use crate::value::Value;
use std::sync::Arc;

/// Shared state of has-one and has-many.
#[derive(Debug, Clone)]
struct HasOneOrMany {
    ctx: OrmContext,
    related: Arc<ModelClass>,
    foreign_key: String,
    local_key: String,
    parent_key: Value,
}

impl HasOneOrMany {
    fn new(
        ctx: &OrmContext,
        parent: &Entity,
        related: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> OrmResult<Self> {
        let related = ctx.resolver().resolve(related)?;
        Ok(Self {
            ctx: ctx.clone(),
            related,
            foreign_key: foreign_key.to_string(),
            local_key: local_key.to_string(),
            parent_key: parent.get(local_key).cloned().unwrap_or(Value::Null),
        })
    }

    fn query(&self) -> Statement {
        Statement::for_model(Arc::clone(&self.related), &self.ctx).where_(
            &self.foreign_key,
            "=",
            self.parent_key.clone(),
        )
    }
}

/// `related.foreign_key = parent.local_key`, at most one row.
#[derive(Debug, Clone)]
pub struct HasOne(HasOneOrMany);

impl HasOne {
    pub fn new(
        ctx: &OrmContext,
        parent: &Entity,
        related: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> OrmResult<Self> {
        HasOneOrMany::new(ctx, parent, related, foreign_key, local_key).map(Self)
    }

    pub fn query(&self) -> Statement {
        self.0.query()
    }

    pub fn related_class(&self) -> &Arc<ModelClass> {
        &self.0.related
    }

    pub fn foreign_key(&self) -> &str {
        &self.0.foreign_key
    }

    pub fn local_key(&self) -> &str {
        &self.0.local_key
    }
}

/// `related.foreign_key = parent.local_key`, any number of rows.
#[derive(Debug, Clone)]
pub struct HasMany(HasOneOrMany);

impl HasMany {
    pub fn new(
        ctx: &OrmContext,
        parent: &Entity,
        related: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> OrmResult<Self> {
        HasOneOrMany::new(ctx, parent, related, foreign_key, local_key).map(Self)
    }

    pub fn query(&self) -> Statement {
        self.0.query()
    }

    pub fn related_class(&self) -> &Arc<ModelClass> {
        &self.0.related
    }

    pub fn foreign_key(&self) -> &str {
        &self.0.foreign_key
    }

    pub fn local_key(&self) -> &str {
        &self.0.local_key
    }
}
