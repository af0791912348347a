#![allow(dead_code)]

use bindorm::model::{ClassRegistry, ConventionResolver, ModelClass};
use bindorm::{Connection, OrmConfig, OrmContext, OrmError, OrmResult, RelationDef, Row, Value};
use std::sync::{Arc, Mutex};

/// Connection that records every statement and answers from canned rows.
///
/// A statement gets the rows of the first fixture whose needle it contains.
pub struct MockConnection {
    driver: Option<&'static str>,
    fixtures: Vec<(String, Vec<Row>)>,
    affected: u64,
    log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            driver: Some("mysql"),
            fixtures: Vec::new(),
            affected: 0,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn driver(mut self, name: &'static str) -> Self {
        self.driver = Some(name);
        self
    }

    /// Make `driver_name()` fail.
    pub fn without_driver(mut self) -> Self {
        self.driver = None;
        self
    }

    pub fn rows(mut self, needle: &str, rows: Vec<Row>) -> Self {
        self.fixtures.push((needle.to_string(), rows));
        self
    }

    pub fn affected(mut self, n: u64) -> Self {
        self.affected = n;
        self
    }

    /// Statements run so far, in order.
    pub fn queries(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }

    pub fn sql(&self, idx: usize) -> String {
        self.queries()[idx].0.clone()
    }

    fn record(&self, sql: &str, bindings: &[Value]) -> Vec<Row> {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), bindings.to_vec()));
        self.fixtures
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }
}

impl Connection for MockConnection {
    async fn execute(&self, sql: &str, bindings: &[Value]) -> OrmResult<u64> {
        self.record(sql, bindings);
        Ok(self.affected)
    }

    async fn fetch_one(&self, sql: &str, bindings: &[Value]) -> OrmResult<Option<Row>> {
        Ok(self.record(sql, bindings).into_iter().next())
    }

    async fn fetch_all(&self, sql: &str, bindings: &[Value]) -> OrmResult<Vec<Row>> {
        Ok(self.record(sql, bindings))
    }

    fn driver_name(&self) -> OrmResult<String> {
        self.driver
            .map(str::to_string)
            .ok_or_else(|| OrmError::Connection("driver name unavailable".to_string()))
    }
}

pub fn row<const N: usize>(pairs: [(&str, Value); N]) -> Row {
    Row::from_pairs(pairs)
}

/// Users (soft deleting) with posts, a profile and roles; posts with an
/// author and comments; mechanics reaching a car owner through cars.
pub fn context() -> OrmContext {
    let registry = ClassRegistry::new();
    registry.define_model(
        ModelClass::new("app::models::User", "users")
            .with_soft_deletes()
            .relation("posts", RelationDef::has_many("Post", "user_id", "id"))
            .relation("profile", RelationDef::has_one("Profile", "user_id", "id"))
            .relation(
                "roles",
                RelationDef::belongs_to_many("Role", "role_user", "user_id", "role_id"),
            ),
    );
    registry.define_model(
        ModelClass::new("app::models::Post", "posts")
            .relation("author", RelationDef::belongs_to(Some("User"), "user_id", "id"))
            .relation("comments", RelationDef::has_many("Comment", "post_id", "id")),
    );
    registry.define_model(ModelClass::new("app::models::Comment", "comments"));
    registry.define_model(ModelClass::new("app::models::Profile", "profiles"));
    registry.define_model(ModelClass::new("app::models::Role", "roles"));
    registry.define_model(
        ModelClass::new("app::models::Mechanic", "mechanics").relation(
            "car_owner",
            RelationDef::has_one_through("Owner", "Car", "mechanic_id", "car_id"),
        ),
    );
    registry.define_model(ModelClass::new("app::models::Car", "cars"));
    registry.define_model(ModelClass::new("app::models::Owner", "owners"));
    OrmContext::new(
        OrmConfig::default(),
        Arc::new(ConventionResolver::new("app::models", Arc::new(registry))),
    )
}
