//! Eager loading (batch preloading for relations).
//!
//! Each relation requested with [`Statement::with`] costs exactly one extra
//! query for the whole parent set: parent keys are collected, the related
//! rows are fetched with `WHERE key IN (...)`, and the results are matched
//! back onto the parents by key.

use crate::config::OrmContext;
use crate::connection::Connection;
use crate::error::OrmResult;
use crate::model::{Entity, Related};
use crate::qb::{EagerConstraint, Statement};
use crate::relation::{
    PIVOT_KEY_ALIAS, RelationDef, THROUGH_KEY_ALIAS, lookup_def, pivot_query, related_class_name,
    through_query,
};
use crate::value::Value;
use std::collections::{HashMap, HashSet};

/// Related entities grouped by the parent key they belong to.
pub type KeyedEntities = HashMap<String, Vec<Entity>>;

/// Load every relation requested on `statement` onto `parents`.
pub(crate) async fn load_requested<C: Connection>(
    conn: &C,
    statement: &Statement,
    parents: &mut [Entity],
) -> OrmResult<()> {
    for name in statement.eager_relations() {
        load_relation(
            conn,
            statement.context(),
            parents,
            name,
            statement.eager_constraint(name),
        )
        .await?;
    }
    Ok(())
}

/// Load relation `name` for all `parents` with a single query.
///
/// All parents must share a class. Parents whose key is NULL get an empty relation.
pub async fn load_relation<C: Connection>(
    conn: &C,
    ctx: &OrmContext,
    parents: &mut [Entity],
    name: &str,
    constraint: Option<&EagerConstraint>,
) -> OrmResult<()> {
    let Some(first) = parents.first() else {
        return Ok(());
    };
    let class = first.class().clone();
    let def = lookup_def(&class, name)?.clone();

    let (parent_key, query, match_column) = match &def {
        RelationDef::HasOne {
            related,
            foreign_key,
            local_key,
        }
        | RelationDef::HasMany {
            related,
            foreign_key,
            local_key,
        } => {
            let related = ctx.resolver().resolve(related)?;
            let query = Statement::for_model(related, ctx);
            (local_key.clone(), query, foreign_key.clone())
        }
        RelationDef::BelongsTo {
            related,
            foreign_key,
            owner_key,
        } => {
            let related = ctx
                .resolver()
                .resolve(&related_class_name(name, related.as_deref()))?;
            let query = Statement::for_model(related, ctx);
            (foreign_key.clone(), query, owner_key.clone())
        }
        RelationDef::BelongsToMany {
            related,
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
            parent_key,
            related_key,
        } => {
            let related = ctx.resolver().resolve(related)?;
            let pivot_column = format!("{pivot_table}.{foreign_pivot_key}");
            let query = pivot_query(ctx, &related, pivot_table, related_pivot_key, related_key)
                .add_select([format!("{pivot_column} as {PIVOT_KEY_ALIAS}")]);
            (parent_key.clone(), query, pivot_column)
        }
        RelationDef::HasOneThrough {
            related,
            through,
            first_key,
            second_key,
            local_key,
            second_local_key,
        } => {
            let related = ctx.resolver().resolve(related)?;
            let through = ctx.resolver().resolve(through)?;
            let through_column = format!("{}.{first_key}", through.table());
            let query = through_query(ctx, &related, &through, second_key, second_local_key)
                .add_select([format!("{through_column} as {THROUGH_KEY_ALIAS}")]);
            (local_key.clone(), query, through_column)
        }
    };

    let keys = distinct_keys(parents, &parent_key);
    let children = if keys.is_empty() {
        KeyedEntities::new()
    } else {
        let mut query = query.where_in(&match_column, keys);
        if let Some(constraint) = constraint {
            query = constraint.apply(query);
        }
        let rows = Box::pin(query.get(conn)).await?;
        group_by_key(rows, &def)
    };

    attach(parents, name, &parent_key, &children, def.is_single());
    Ok(())
}

/// Non-NULL values of `column` across `parents`, deduplicated, in first-seen order.
fn distinct_keys(parents: &[Entity], column: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for parent in parents {
        let Some(value) = parent.get(column) else { continue };
        let Some(key) = value.key() else { continue };
        if seen.insert(key) {
            keys.push(value.clone());
        }
    }
    keys
}

/// The column on a fetched related row that holds its parent's key.
fn match_attribute(def: &RelationDef) -> &str {
    match def {
        RelationDef::HasOne { foreign_key, .. } | RelationDef::HasMany { foreign_key, .. } => {
            foreign_key
        }
        RelationDef::BelongsTo { owner_key, .. } => owner_key,
        RelationDef::BelongsToMany { .. } => PIVOT_KEY_ALIAS,
        RelationDef::HasOneThrough { .. } => THROUGH_KEY_ALIAS,
    }
}

fn group_by_key(rows: Vec<Entity>, def: &RelationDef) -> KeyedEntities {
    let column = match_attribute(def);
    // Synthetic key columns are removed from the related entities.
    let synthetic = matches!(
        def,
        RelationDef::BelongsToMany { .. } | RelationDef::HasOneThrough { .. }
    );
    let mut out = KeyedEntities::new();
    for mut child in rows {
        let value = if synthetic {
            child.attributes_mut().remove(column)
        } else {
            child.get(column).cloned()
        };
        let Some(key) = value.as_ref().and_then(Value::key) else {
            continue;
        };
        out.entry(key).or_default().push(child);
    }
    out
}

fn attach(parents: &mut [Entity], name: &str, parent_key: &str, children: &KeyedEntities, single: bool) {
    for parent in parents {
        let matched = parent
            .get(parent_key)
            .and_then(Value::key)
            .and_then(|key| children.get(&key));
        let related = if single {
            Related::One(
                matched
                    .and_then(|c| c.first())
                    .cloned()
                    .map(Box::new),
            )
        } else {
            Related::Many(matched.cloned().unwrap_or_default())
        };
        parent.set_related(name, related);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassRegistry, ConventionResolver, ModelClass};
    use crate::row::Row;
    use crate::{OrmConfig, OrmError};
    use std::sync::Arc;

    struct PanicConnection;

    impl Connection for PanicConnection {
        async fn execute(&self, _sql: &str, _bindings: &[Value]) -> OrmResult<u64> {
            panic!("unexpected execute() call")
        }

        async fn fetch_one(&self, _sql: &str, _bindings: &[Value]) -> OrmResult<Option<Row>> {
            panic!("unexpected fetch_one() call")
        }

        async fn fetch_all(&self, _sql: &str, _bindings: &[Value]) -> OrmResult<Vec<Row>> {
            panic!("unexpected fetch_all() call")
        }

        fn driver_name(&self) -> OrmResult<String> {
            Ok("mysql".into())
        }
    }

    fn ctx() -> OrmContext {
        let registry = ClassRegistry::new();
        registry.define_model(
            ModelClass::new("app::models::User", "users")
                .relation("posts", RelationDef::has_many("Post", "user_id", "id")),
        );
        registry.define_model(ModelClass::new("app::models::Post", "posts"));
        OrmContext::new(
            OrmConfig::default(),
            Arc::new(ConventionResolver::new("app::models", Arc::new(registry))),
        )
    }

    fn user(ctx: &OrmContext, id: Value) -> Entity {
        let class = ctx.resolver().resolve("users").unwrap();
        Entity::new(class, Row::from_pairs([("id", id)]))
    }

    #[tokio::test]
    async fn empty_parents_fast_path() {
        let ctx = ctx();
        load_relation(&PanicConnection, &ctx, &mut [], "posts", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn null_keys_skip_the_query() {
        let ctx = ctx();
        let mut parents = vec![user(&ctx, Value::Null)];
        load_relation(&PanicConnection, &ctx, &mut parents, "posts", None)
            .await
            .unwrap();
        assert!(parents[0].is_loaded("posts"));
        assert!(parents[0].related_many("posts").is_empty());
    }

    #[tokio::test]
    async fn unknown_relation_is_an_argument_error() {
        let ctx = ctx();
        let mut parents = vec![user(&ctx, Value::Int(1))];
        let err = load_relation(&PanicConnection, &ctx, &mut parents, "comments", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrmError::Argument(_)));
    }

    #[test]
    fn keys_are_deduplicated() {
        let ctx = ctx();
        let parents = vec![
            user(&ctx, Value::Int(1)),
            user(&ctx, Value::Int(2)),
            user(&ctx, Value::Int(1)),
            user(&ctx, Value::Null),
        ];
        assert_eq!(
            distinct_keys(&parents, "id"),
            vec![Value::Int(1), Value::Int(2)]
        );
    }
}
