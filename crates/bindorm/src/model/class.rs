//! Runtime model class descriptors.

use crate::relation::RelationDef;

/// Describes an entity class: its table, key, soft-delete behavior and relations.
///
/// # Example
/// ```ignore
/// use bindorm::model::ModelClass;
/// use bindorm::relation::RelationDef;
///
/// let user = ModelClass::new("app::models::User", "users")
///     .with_soft_deletes()
///     .relation("posts", RelationDef::has_many("Post", "user_id", "id"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModelClass {
    name: String,
    table: String,
    primary_key: String,
    soft_deletes: bool,
    relations: Vec<(String, RelationDef)>,
}

impl ModelClass {
    /// Create a class with primary key `id` and no soft deletes.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            soft_deletes: false,
            relations: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    /// Mark the class as soft-deleting.
    pub fn with_soft_deletes(mut self) -> Self {
        self.soft_deletes = true;
        self
    }

    /// Register a named relation. A later registration with the same name replaces it.
    pub fn relation(mut self, name: impl Into<String>, def: RelationDef) -> Self {
        let name = name.into();
        match self.relations.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = def,
            None => self.relations.push((name, def)),
        }
        self
    }

    /// Fully qualified class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class name without its namespace.
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn has_soft_deletes(&self) -> bool {
        self.soft_deletes
    }

    pub fn relation_def(&self, name: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, def)| def)
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.iter().map(|(n, _)| n.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_names() {
        let class = ModelClass::new("app::models::User", "users");
        assert_eq!(class.primary_key(), "id");
        assert_eq!(class.short_name(), "User");
        assert!(!class.has_soft_deletes());
    }

    #[test]
    fn relation_registration_replaces_by_name() {
        let class = ModelClass::new("Post", "posts")
            .relation("author", RelationDef::belongs_to(Some("User"), "user_id", "id"))
            .relation("author", RelationDef::belongs_to(Some("Admin"), "admin_id", "id"));
        assert_eq!(class.relation_names().count(), 1);
        assert_eq!(class.relation_def("author").unwrap().related(), Some("Admin"));
        assert!(class.relation_def("comments").is_none());
    }
}
