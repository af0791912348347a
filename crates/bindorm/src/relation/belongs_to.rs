use crate::config::OrmContext;
use crate::error::OrmResult;
use crate::model::resolver::class_name_for;
use crate::model::{Entity, ModelClass};
use crate::qb::Statement;
use crate::value::Value;
use std::sync::Arc;

/// The related class for a belongs-to relation: the explicit one, or the
/// relation name singularized and camel-cased (`author` → `Author`).
pub(crate) fn related_class_name(relation: &str, related: Option<&str>) -> String {
    match related {
        Some(related) if !related.trim().is_empty() => related.to_string(),
        _ => class_name_for(relation),
    }
}

/// `related.owner_key = parent.foreign_key`.
#[derive(Debug, Clone)]
pub struct BelongsTo {
    ctx: OrmContext,
    related: Arc<ModelClass>,
    foreign_key: String,
    owner_key: String,
    foreign_value: Value,
}

impl BelongsTo {
    pub fn new(
        ctx: &OrmContext,
        child: &Entity,
        related: &str,
        foreign_key: &str,
        owner_key: &str,
    ) -> OrmResult<Self> {
        let related = ctx.resolver().resolve(related)?;
        Ok(Self {
            ctx: ctx.clone(),
            related,
            foreign_key: foreign_key.to_string(),
            owner_key: owner_key.to_string(),
            foreign_value: child.get(foreign_key).cloned().unwrap_or(Value::Null),
        })
    }

    pub fn query(&self) -> Statement {
        Statement::for_model(Arc::clone(&self.related), &self.ctx).where_(
            &self.owner_key,
            "=",
            self.foreign_value.clone(),
        )
    }

    pub fn related_class(&self) -> &Arc<ModelClass> {
        &self.related
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_class_name() {
        assert_eq!(related_class_name("author", None), "Author");
        assert_eq!(related_class_name("blog_posts", None), "BlogPost");
        assert_eq!(related_class_name("author", Some("User")), "User");
        assert_eq!(related_class_name("author", Some(" ")), "Author");
    }
}
