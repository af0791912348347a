//! Relationship query generators.
//!
//! A [`RelationDef`] is the static description registered on a [`ModelClass`].
//! Calling [`Entity::relation`] turns it into a [`Relation`] bound to one parent
//! entity: the related classes are resolved on construction, and
//! [`Relation::query`] returns the constrained [`Statement`].
//!
//! # Example
//! ```ignore
//! let posts = user.relation("posts", &ctx)?.get(&conn).await?;
//! ```

mod belongs_to;
mod belongs_to_many;
mod has_one;
mod has_one_through;

pub use belongs_to::BelongsTo;
pub use belongs_to_many::BelongsToMany;
pub use has_one::{HasMany, HasOne};
pub use has_one_through::HasOneThrough;

pub(crate) use belongs_to::related_class_name;
pub(crate) use belongs_to_many::{PIVOT_KEY_ALIAS, pivot_query};
pub(crate) use has_one_through::{THROUGH_KEY_ALIAS, through_query};

use crate::config::OrmContext;
use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};
use crate::model::{Entity, ModelClass, Related};
use crate::qb::Statement;
use std::sync::Arc;

/// Static relation description, registered on a model class by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationDef {
    /// `related.foreign_key = parent.local_key`, one row.
    HasOne {
        related: String,
        foreign_key: String,
        local_key: String,
    },
    /// `related.foreign_key = parent.local_key`, many rows.
    HasMany {
        related: String,
        foreign_key: String,
        local_key: String,
    },
    /// `related.owner_key = parent.foreign_key`. Without `related` the class
    /// is derived from the relation name.
    BelongsTo {
        related: Option<String>,
        foreign_key: String,
        owner_key: String,
    },
    /// Through a pivot table:
    /// `pivot.related_pivot_key = related.related_key`,
    /// `pivot.foreign_pivot_key = parent.parent_key`.
    BelongsToMany {
        related: String,
        pivot_table: String,
        foreign_pivot_key: String,
        related_pivot_key: String,
        parent_key: String,
        related_key: String,
    },
    /// Through an intermediate class:
    /// `through.second_local_key = related.second_key`,
    /// `through.first_key = parent.local_key`.
    HasOneThrough {
        related: String,
        through: String,
        first_key: String,
        second_key: String,
        local_key: String,
        second_local_key: String,
    },
}

impl RelationDef {
    pub fn has_one(related: &str, foreign_key: &str, local_key: &str) -> Self {
        RelationDef::HasOne {
            related: related.to_string(),
            foreign_key: foreign_key.to_string(),
            local_key: local_key.to_string(),
        }
    }

    pub fn has_many(related: &str, foreign_key: &str, local_key: &str) -> Self {
        RelationDef::HasMany {
            related: related.to_string(),
            foreign_key: foreign_key.to_string(),
            local_key: local_key.to_string(),
        }
    }

    pub fn belongs_to(related: Option<&str>, foreign_key: &str, owner_key: &str) -> Self {
        RelationDef::BelongsTo {
            related: related.map(str::to_string),
            foreign_key: foreign_key.to_string(),
            owner_key: owner_key.to_string(),
        }
    }

    /// Pivot relation keyed on `id` on both sides.
    pub fn belongs_to_many(
        related: &str,
        pivot_table: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
    ) -> Self {
        RelationDef::BelongsToMany {
            related: related.to_string(),
            pivot_table: pivot_table.to_string(),
            foreign_pivot_key: foreign_pivot_key.to_string(),
            related_pivot_key: related_pivot_key.to_string(),
            parent_key: "id".to_string(),
            related_key: "id".to_string(),
        }
    }

    /// Through relation keyed on `id` for the parent and the through class.
    pub fn has_one_through(related: &str, through: &str, first_key: &str, second_key: &str) -> Self {
        RelationDef::HasOneThrough {
            related: related.to_string(),
            through: through.to_string(),
            first_key: first_key.to_string(),
            second_key: second_key.to_string(),
            local_key: "id".to_string(),
            second_local_key: "id".to_string(),
        }
    }

    /// Override the parent-side and related-side keys (pivot and through relations)
    /// or the local key (has-one/has-many) or the owner key (belongs-to).
    pub fn keys(mut self, parent: &str, related_side: &str) -> Self {
        match &mut self {
            RelationDef::HasOne { local_key, .. } | RelationDef::HasMany { local_key, .. } => {
                *local_key = parent.to_string();
            }
            RelationDef::BelongsTo { owner_key, .. } => {
                *owner_key = related_side.to_string();
            }
            RelationDef::BelongsToMany {
                parent_key,
                related_key,
                ..
            } => {
                *parent_key = parent.to_string();
                *related_key = related_side.to_string();
            }
            RelationDef::HasOneThrough {
                local_key,
                second_local_key,
                ..
            } => {
                *local_key = parent.to_string();
                *second_local_key = related_side.to_string();
            }
        }
        self
    }

    /// The related class as registered, if explicit.
    pub fn related(&self) -> Option<&str> {
        match self {
            RelationDef::HasOne { related, .. }
            | RelationDef::HasMany { related, .. }
            | RelationDef::BelongsToMany { related, .. }
            | RelationDef::HasOneThrough { related, .. } => Some(related),
            RelationDef::BelongsTo { related, .. } => related.as_deref(),
        }
    }

    /// True if the relation yields at most one entity.
    pub fn is_single(&self) -> bool {
        matches!(
            self,
            RelationDef::HasOne { .. } | RelationDef::BelongsTo { .. } | RelationDef::HasOneThrough { .. }
        )
    }
}

/// A relation bound to one parent entity.
#[derive(Debug, Clone)]
pub enum Relation {
    HasOne(HasOne),
    HasMany(HasMany),
    BelongsTo(BelongsTo),
    BelongsToMany(BelongsToMany),
    HasOneThrough(HasOneThrough),
}

impl Relation {
    /// Build relation `name` of `parent` from its class's registry.
    pub fn for_entity(parent: &Entity, name: &str, ctx: &OrmContext) -> OrmResult<Self> {
        let def = lookup_def(parent.class(), name)?;
        Ok(match def {
            RelationDef::HasOne {
                related,
                foreign_key,
                local_key,
            } => Relation::HasOne(HasOne::new(ctx, parent, related, foreign_key, local_key)?),
            RelationDef::HasMany {
                related,
                foreign_key,
                local_key,
            } => Relation::HasMany(HasMany::new(ctx, parent, related, foreign_key, local_key)?),
            RelationDef::BelongsTo {
                related,
                foreign_key,
                owner_key,
            } => {
                let related = related_class_name(name, related.as_deref());
                Relation::BelongsTo(BelongsTo::new(ctx, parent, &related, foreign_key, owner_key)?)
            }
            RelationDef::BelongsToMany {
                related,
                pivot_table,
                foreign_pivot_key,
                related_pivot_key,
                parent_key,
                related_key,
            } => Relation::BelongsToMany(
                BelongsToMany::new(ctx, parent, related, pivot_table, foreign_pivot_key, related_pivot_key)?
                    .keys(parent, parent_key, related_key),
            ),
            RelationDef::HasOneThrough {
                related,
                through,
                first_key,
                second_key,
                local_key,
                second_local_key,
            } => Relation::HasOneThrough(
                HasOneThrough::new(ctx, parent, related, through, first_key, second_key)?
                    .keys(parent, local_key, second_local_key),
            ),
        })
    }

    /// The constrained query for the related rows.
    pub fn query(&self) -> Statement {
        match self {
            Relation::HasOne(r) => r.query(),
            Relation::HasMany(r) => r.query(),
            Relation::BelongsTo(r) => r.query(),
            Relation::BelongsToMany(r) => r.query(),
            Relation::HasOneThrough(r) => r.query(),
        }
    }

    pub fn related_class(&self) -> &Arc<ModelClass> {
        match self {
            Relation::HasOne(r) => r.related_class(),
            Relation::HasMany(r) => r.related_class(),
            Relation::BelongsTo(r) => r.related_class(),
            Relation::BelongsToMany(r) => r.related_class(),
            Relation::HasOneThrough(r) => r.related_class(),
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(
            self,
            Relation::HasOne(_) | Relation::BelongsTo(_) | Relation::HasOneThrough(_)
        )
    }

    pub async fn get(&self, conn: &impl Connection) -> OrmResult<Vec<Entity>> {
        self.query().get(conn).await
    }

    pub async fn first(&self, conn: &impl Connection) -> OrmResult<Option<Entity>> {
        self.query().first(conn).await
    }

    /// Fetch the relation in the shape it is stored on an entity.
    pub async fn fetch(&self, conn: &impl Connection) -> OrmResult<Related> {
        if self.is_single() {
            Ok(Related::One(self.first(conn).await?.map(Box::new)))
        } else {
            Ok(Related::Many(self.get(conn).await?))
        }
    }
}

pub(crate) fn lookup_def<'a>(class: &'a ModelClass, name: &str) -> OrmResult<&'a RelationDef> {
    class.relation_def(name).ok_or_else(|| {
        OrmError::argument(format!(
            "Relation '{name}' is not defined on {}",
            class.name()
        ))
    })
}
