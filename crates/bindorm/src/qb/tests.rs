//! Integration tests for the qb module.

use crate::model::{ClassRegistry, ConventionResolver, Entity, ModelClass};
use crate::qb::{self, Dialect, Statement, StatementKind, Window};
use crate::relation::RelationDef;
use crate::row::Row;
use crate::value::Value;
use crate::{OrmConfig, OrmContext, OrmError, record};
use serde_json::json;
use std::sync::Arc;

fn ctx() -> OrmContext {
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
            .relation("user", RelationDef::belongs_to(None, "user_id", "id")),
    );
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

fn users(ctx: &OrmContext) -> Statement {
    Statement::for_model(ctx.resolver().resolve("users").unwrap(), ctx)
}

fn entity(ctx: &OrmContext, class: &str, pairs: Vec<(&str, Value)>) -> Entity {
    Entity::new(ctx.resolver().resolve(class).unwrap(), Row::from_pairs(pairs))
}

// ==================== SELECT ====================

#[test]
fn test_select_basic() {
    let q = qb::table("users");
    assert_eq!(q.kind(), StatementKind::Select);
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM users");
}

#[test]
fn test_select_end_to_end() {
    let q = qb::select(["id"])
        .from("users")
        .where_("status", "=", "active")
        .order_by("id", "DESC")
        .limit(10);

    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT `id` FROM users WHERE `status` = ? ORDER BY `id` DESC LIMIT 10"
    );
    assert_eq!(compiled.bindings, vec![Value::from("active")]);
}

#[test]
fn test_select_function_columns_are_not_wrapped() {
    let q = qb::table("users").select(["COUNT(*) as total", "name as n", "users.email"]);
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT COUNT(*) as total, `name` AS `n`, `users`.`email` FROM users"
    );
}

#[test]
fn test_select_distinct_group_having() {
    let q = qb::table("orders")
        .select(["user_id", "SUM(total) as spent"])
        .distinct()
        .group_by(["user_id"])
        .having("spent", ">", 100)
        .having("spent", ">=", 500);

    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT DISTINCT `user_id`, SUM(total) as spent FROM orders GROUP BY `user_id` HAVING `spent` >= ?"
    );
    // HAVING is a single predicate; the last call wins.
    assert_eq!(compiled.bindings, vec![Value::Int(500)]);
}

#[test]
fn test_having_rejects_list_operators() {
    let err = qb::table("orders")
        .having("total", "IN", vec![1, 2])
        .compile()
        .unwrap_err();
    assert!(err.is_argument());
}

#[test]
fn test_limit_offset_and_for_page() {
    let q = qb::table("users").limit(10).offset(20);
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM users LIMIT 10 OFFSET 20");

    let q = qb::table("users").for_page(3, 10);
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM users LIMIT 10 OFFSET 20");

    let q = qb::table("users").for_page(0, 10);
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM users LIMIT 10 OFFSET 0");
}

#[test]
fn test_missing_table_is_an_error() {
    let err = Statement::new().compile().unwrap_err();
    assert!(err.is_argument());
}

#[test]
fn test_invalid_direction() {
    let err = qb::table("users").order_by("id", "sideways").compile().unwrap_err();
    assert!(err.is_argument());
}

// ==================== WHERE ====================

#[test]
fn test_where_operators() {
    let q = qb::table("users")
        .where_("age", "BETWEEN", [18, 30])
        .where_in("id", [1, 2, 3])
        .where_("nickname", "is not", Value::Null)
        .or_where("name", "like", "A%");

    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users WHERE `age` BETWEEN ? AND ? AND `id` IN (?, ?, ?) AND `nickname` IS NOT NULL OR `name` LIKE ?"
    );
    assert_eq!(compiled.bindings.len(), 6);
    assert_eq!(compiled.bindings[0], Value::Int(18));
    assert_eq!(compiled.bindings[5], Value::from("A%"));
}

#[test]
fn test_where_in_via_operator() {
    let q = qb::table("users")
        .where_("id", "IN", vec![4, 5])
        .where_("role", "NOT IN", "guest");
    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users WHERE `id` IN (?, ?) AND `role` NOT IN (?)"
    );
    assert_eq!(compiled.bindings.len(), 3);
}

#[test]
fn test_where_not_in_and_or_in() {
    let q = qb::table("users")
        .where_not_in("status", ["banned"])
        .or_where_in("id", [1, 2])
        .or_where_not_in("role", ["guest"]);
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM users WHERE `status` NOT IN (?) OR `id` IN (?, ?) OR `role` NOT IN (?)"
    );
}

#[test]
fn test_where_argument_errors() {
    let cases = [
        qb::table("users").where_("", "=", 1),
        qb::table("users").where_("id", "<>", 1),
        qb::table("users").where_in("id", Vec::<i64>::new()),
        qb::table("users").where_("id", "IN", Vec::<i64>::new()),
        qb::table("users").where_("age", "BETWEEN", 18),
        qb::table("users").where_("age", "BETWEEN", [1, 2, 3]),
        qb::table("users").where_("id", "=", vec![1, 2]),
    ];
    for q in cases {
        let err = q.compile().unwrap_err();
        assert!(err.is_argument(), "expected argument error, got {err:?}");
    }
}

#[test]
fn test_first_error_is_kept() {
    let q = qb::table("users")
        .where_("id", "<>", 1)
        .where_in("id", Vec::<i64>::new());
    assert!(q.build_error().unwrap().to_string().contains("<>"));
}

#[test]
fn test_where_nested() {
    let q = qb::table("t").where_nested(|q| q.where_("col1", "=", 1).or_where("col2", "=", 2));
    let compiled = q.compile().unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM t WHERE (`col1` = ? OR `col2` = ?)");
    assert_eq!(compiled.bindings, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_or_where_nested_after_condition() {
    let q = qb::table("users")
        .where_("status", "=", "active")
        .or_where_nested(|q| q.where_("role", "=", "admin").where_("verified", "=", true));
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM users WHERE `status` = ? OR (`role` = ? AND `verified` = ?)"
    );
}

#[test]
fn test_empty_nested_group_is_dropped() {
    let q = qb::table("users").where_nested(|q| q);
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM users");
}

#[test]
fn test_nested_error_propagates() {
    let err = qb::table("users")
        .where_nested(|q| q.where_("id", "~", 1))
        .compile()
        .unwrap_err();
    assert!(err.is_argument());
}

#[test]
fn test_where_sub() {
    let sub = qb::table("orders").select(["user_id"]).where_("total", ">", 100);
    let q = qb::table("users")
        .where_("active", "=", true)
        .where_sub("id", "IN", sub);

    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users WHERE `active` = ? AND `id` IN (SELECT `user_id` FROM orders WHERE `total` > ?)"
    );
    assert_eq!(compiled.bindings, vec![Value::Bool(true), Value::Int(100)]);
}

#[test]
fn test_where_sub_requires_select() {
    let sub = qb::table("orders").delete().where_("id", "=", 1);
    let err = qb::table("users").where_sub("id", "IN", sub).compile().unwrap_err();
    assert!(err.is_argument());
}

#[test]
fn test_where_null_replaces_opposite_check() {
    let q = qb::table("users").where_null("email").where_not_null("email");
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM users WHERE `email` IS NOT NULL");

    let q = qb::table("users").where_null("email").where_null("email");
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM users WHERE `email` IS NULL");

    let q = qb::table("users").where_null("a").or_where_null("b");
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM users WHERE `a` IS NULL OR `b` IS NULL");
}

// ==================== Soft deletes ====================

#[test]
fn test_soft_delete_filter_is_injected() {
    let ctx = ctx();
    assert_eq!(
        users(&ctx).to_sql().unwrap(),
        "SELECT * FROM users WHERE deleted_at IS NULL"
    );
    assert_eq!(
        users(&ctx).where_("status", "=", "active").to_sql().unwrap(),
        "SELECT * FROM users WHERE `status` = ? AND deleted_at IS NULL"
    );
}

#[test]
fn test_soft_delete_filter_wraps_top_level_or() {
    let ctx = ctx();
    let q = users(&ctx).where_("a", "=", 1).or_where("b", "=", 2);
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM users WHERE (`a` = ? OR `b` = ?) AND deleted_at IS NULL"
    );
}

#[test]
fn test_with_soft_deletes_suppresses_filter() {
    let ctx = ctx();
    let sql = users(&ctx).with_soft_deletes().to_sql().unwrap();
    assert_eq!(sql, "SELECT * FROM users");
    assert!(!users(&ctx).with_trashed().to_sql().unwrap().contains("deleted_at"));
}

#[test]
fn test_only_trashed() {
    let ctx = ctx();
    assert_eq!(
        users(&ctx).only_trashed().to_sql().unwrap(),
        "SELECT * FROM users WHERE deleted_at IS NOT NULL"
    );
    assert_eq!(
        users(&ctx).only_soft_deleted().to_sql().unwrap(),
        "SELECT * FROM users WHERE deleted_at IS NOT NULL"
    );
}

#[test]
fn test_without_trashed_restores_filter_once() {
    let ctx = ctx();
    let q = users(&ctx).only_trashed().without_trashed();
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM users WHERE deleted_at IS NULL");

    let q = users(&ctx).where_null("deleted_at");
    assert_eq!(q.to_sql().unwrap().matches("deleted_at").count(), 1);
}

#[test]
fn test_soft_delete_and_restore_updates() {
    let ctx = ctx();
    let compiled = users(&ctx).where_("id", "=", 1).soft_delete().compile().unwrap();
    assert_eq!(compiled.sql, "UPDATE users SET `deleted_at` = ? WHERE `id` = ?");
    assert!(matches!(compiled.bindings[0], Value::Timestamp(_)));
    assert_eq!(compiled.bindings[1], Value::Int(1));

    let compiled = users(&ctx).where_("id", "=", 1).restore().compile().unwrap();
    assert_eq!(compiled.sql, "UPDATE users SET `deleted_at` = ? WHERE `id` = ?");
    assert_eq!(compiled.bindings, vec![Value::Null, Value::Int(1)]);
}

#[test]
fn test_plain_tables_are_not_filtered() {
    assert_eq!(qb::table("users").to_sql().unwrap(), "SELECT * FROM users");
}

// ==================== JOIN / ORDER / UNION ====================

#[test]
fn test_joins() {
    let q = qb::table("users")
        .join("posts", "posts.user_id", "=", "users.id")
        .left_join("profiles", "profiles.user_id", "=", "users.id");
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM users INNER JOIN posts ON `posts`.`user_id` = `users`.`id` \
         LEFT JOIN profiles ON `profiles`.`user_id` = `users`.`id`"
    );

    let q = qb::table("a")
        .right_join("b", "b.a_id", "=", "a.id")
        .full_join("c", "c.a_id", "=", "a.id");
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM a RIGHT JOIN b ON `b`.`a_id` = `a`.`id` FULL OUTER JOIN c ON `c`.`a_id` = `a`.`id`"
    );
}

#[test]
fn test_join_raw_bindings() {
    let q = qb::table("users")
        .join_raw("INNER JOIN teams ON teams.id = users.team_id AND teams.kind = ?", ["pro"])
        .where_("users.active", "=", true);
    assert_eq!(
        q.compile().unwrap().bindings,
        vec![Value::from("pro"), Value::Bool(true)]
    );
}

#[test]
fn test_placeholder_mismatch_is_a_state_error() {
    let err = qb::table("users")
        .join_raw("INNER JOIN teams ON teams.id = ?", Vec::<Value>::new())
        .compile()
        .unwrap_err();
    assert!(err.is_state());
}

#[test]
fn test_order_by_case() {
    let q = qb::table("tickets").order_by_case(
        "status",
        [("open", 1), ("pending", 2)],
        "it's last",
        "asc",
    );
    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM tickets ORDER BY CASE `status` WHEN ? THEN 1 WHEN ? THEN 2 ELSE 'it''s last' END ASC"
    );
    assert_eq!(compiled.bindings, vec![Value::from("open"), Value::from("pending")]);
}

#[test]
fn test_order_by_raw_and_desc() {
    let q = qb::table("users").order_by_desc("created_at").order_by_raw("RAND()");
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM users ORDER BY `created_at` DESC, RAND()"
    );
}

#[test]
fn test_union_after_limit() {
    let q = qb::table("users")
        .select(["id"])
        .where_("role", "=", "admin")
        .limit(5)
        .union(qb::table("guests").select(["id"]).where_("active", "=", true), true)
        .union_raw("SELECT id FROM bots", false);
    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT `id` FROM users WHERE `role` = ? LIMIT 5 UNION ALL SELECT `id` FROM guests WHERE `active` = ? UNION SELECT id FROM bots"
    );
    assert_eq!(compiled.bindings, vec![Value::from("admin"), Value::Bool(true)]);
}

#[test]
fn test_binding_order_follows_sql_order() {
    let sub = qb::table("orders").select(["user_id"]).where_("total", ">", 100);
    let q = qb::table("users")
        .select(["users.id"])
        .json_extract("meta", "theme", "theme")
        .join_sub(sub, "big", "big.user_id", "=", "users.id")
        .where_("users.status", "=", "active")
        .where_json_path("meta", "plan", "=", "pro")
        .group_by(["users.id"])
        .having("theme", "!=", "dark")
        .order_by_case("users.role", [("admin", 1)], "z", "asc")
        .union(qb::table("admins").select(["id"]).where_("level", ">", 3), false);

    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT `users`.`id`, JSON_EXTRACT(`meta`, ?) AS `theme` FROM users \
         INNER JOIN (SELECT `user_id` FROM orders WHERE `total` > ?) AS `big` ON `big`.`user_id` = `users`.`id` \
         WHERE `users`.`status` = ? AND JSON_EXTRACT(`meta`, ?) = ? \
         GROUP BY `users`.`id` HAVING `theme` != ? \
         ORDER BY CASE `users`.`role` WHEN ? THEN 1 ELSE 'z' END ASC \
         UNION SELECT `id` FROM admins WHERE `level` > ?"
    );
    assert_eq!(
        compiled.bindings,
        vec![
            Value::from("$.theme"),
            Value::Int(100),
            Value::from("active"),
            Value::from("$.plan"),
            Value::from("pro"),
            Value::from("dark"),
            Value::from("admin"),
            Value::Int(3),
        ]
    );
    assert_eq!(q.bindings(), compiled.bindings);
}

// ==================== Windows / JSON ====================

#[test]
fn test_window_functions() {
    let q = qb::table("employees")
        .select(["name"])
        .row_number(
            Window::new().partition_by(["department"]).order_by(("salary", "desc")),
            "rn",
        )
        .sum_over("salary", Window::new().partition_by(["department"]), "dept_total");
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT `name`, ROW_NUMBER() OVER (PARTITION BY `department` ORDER BY `salary` DESC) AS `rn`, \
         SUM(`salary`) OVER (PARTITION BY `department`) AS `dept_total` FROM employees"
    );
}

#[test]
fn test_window_invalid_direction() {
    let err = qb::table("employees")
        .rank(Window::new().order_by(("salary", "up")), "r")
        .compile()
        .unwrap_err();
    assert!(err.is_argument());
}

#[test]
fn test_json_contains_per_dialect() {
    let q = qb::table("posts").where_json_contains("tags", json!("rust"));
    let compiled = q.compile().unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM posts WHERE JSON_CONTAINS(`tags`, ?)");
    assert_eq!(compiled.bindings, vec![Value::from("\"rust\"")]);

    let q = qb::table("posts")
        .dialect(Dialect::Sqlite)
        .where_json_contains("tags", json!("rust"));
    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM posts WHERE EXISTS (SELECT 1 FROM json_each(`tags`) WHERE json_each.value = ?)"
    );
    assert_eq!(compiled.bindings, vec![Value::from("rust")]);
}

#[test]
fn test_json_predicates_wrap_top_level_or() {
    let q = qb::table("posts")
        .where_("a", "=", 1)
        .or_where("b", "=", 2)
        .where_json_contains("tags", json!(7));
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM posts WHERE (`a` = ? OR `b` = ?) AND JSON_CONTAINS(`tags`, ?)"
    );
}

#[test]
fn test_json_in_nested_group_is_rejected() {
    let err = qb::table("posts")
        .where_nested(|q| q.where_json_contains("tags", json!(1)))
        .compile()
        .unwrap_err();
    assert!(err.is_argument());
}

#[test]
fn test_json_path_null_check() {
    let q = qb::table("users")
        .dialect(Dialect::Sqlite)
        .where_json_path("settings", "$.theme", "IS", Value::Null);
    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users WHERE json_extract(`settings`, ?) IS NULL"
    );
    assert_eq!(compiled.bindings, vec![Value::from("$.theme")]);
}

// ==================== Mutations ====================

#[test]
fn test_insert_basic() {
    let q = qb::table("users").insert(record! { "name" => "A", "email" => "a@x.com" });
    let compiled = q.compile().unwrap();
    assert_eq!(compiled.sql, "INSERT INTO users (`name`, `email`) VALUES (?, ?)");
    assert_eq!(compiled.bindings, vec![Value::from("A"), Value::from("a@x.com")]);
}

#[test]
fn test_insert_ignores_where_bindings() {
    let q = qb::table("users")
        .where_("id", "=", 1)
        .insert(record! { "name" => "A" });
    let compiled = q.compile().unwrap();
    assert_eq!(compiled.sql, "INSERT INTO users (`name`) VALUES (?)");
    assert_eq!(compiled.bindings, vec![Value::from("A")]);
}

#[test]
fn test_insert_or_ignore() {
    let q = qb::table("users").insert_or_ignore(record! { "email" => "a@x.com" });
    assert_eq!(q.kind(), StatementKind::InsertIgnore);
    assert_eq!(q.to_sql().unwrap(), "INSERT OR IGNORE INTO users (`email`) VALUES (?)");
}

#[test]
fn test_insert_requires_data() {
    let err = qb::table("users")
        .insert(Vec::<(String, Value)>::new())
        .compile()
        .unwrap_err();
    assert!(err.is_argument());
}

#[test]
fn test_update_basic() {
    let q = qb::table("users")
        .update(record! { "status" => "inactive", "score" => 0 })
        .where_("id", "=", 1);
    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "UPDATE users SET `status` = ?, `score` = ? WHERE `id` = ?"
    );
    assert_eq!(
        compiled.bindings,
        vec![Value::from("inactive"), Value::Int(0), Value::Int(1)]
    );
}

#[test]
fn test_update_with_json_predicate() {
    let q = qb::table("users")
        .update(record! { "plan" => "pro" })
        .where_json_path("meta", "tier", ">=", 2);
    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "UPDATE users SET `plan` = ? WHERE JSON_EXTRACT(`meta`, ?) >= ?"
    );
    assert_eq!(
        compiled.bindings,
        vec![Value::from("pro"), Value::from("$.tier"), Value::Int(2)]
    );
}

#[test]
fn test_delete_basic() {
    let q = qb::table("users").delete().where_("id", "=", 1);
    assert_eq!(q.kind(), StatementKind::Delete);
    assert_eq!(q.to_sql().unwrap(), "DELETE FROM users WHERE `id` = ?");
}

#[test]
fn test_delete_without_where_fails() {
    let err = qb::table("users").delete().compile().unwrap_err();
    assert!(err.is_state());
    assert!(matches!(err, OrmError::State(_)));
}

#[test]
fn test_upsert_defaults_to_all_columns() {
    let q = qb::table("users").upsert(record! { "email" => "a@x.com", "name" => "A" }, ["email"]);
    let compiled = q.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "INSERT INTO users (`email`, `name`) VALUES (?, ?) ON CONFLICT (`email`) \
         DO UPDATE SET `email` = EXCLUDED.`email`, `name` = EXCLUDED.`name`"
    );
    assert_eq!(compiled.bindings.len(), 2);
}

#[test]
fn test_upsert_update_columns() {
    let q = qb::table("users")
        .upsert(record! { "email" => "a@x.com", "name" => "A" }, ["email"])
        .upsert_update_columns(["name"]);
    assert_eq!(
        q.to_sql().unwrap(),
        "INSERT INTO users (`email`, `name`) VALUES (?, ?) ON CONFLICT (`email`) DO UPDATE SET `name` = EXCLUDED.`name`"
    );
}

#[test]
fn test_upsert_requires_unique_columns() {
    let err = qb::table("users")
        .upsert(record! { "email" => "a@x.com" }, Vec::<&str>::new())
        .compile()
        .unwrap_err();
    assert!(err.is_argument());
}

#[test]
fn test_kind_cannot_be_redefined() {
    let err = qb::table("users")
        .insert(record! { "a" => 1 })
        .update(record! { "a" => 2 })
        .compile()
        .unwrap_err();
    assert!(err.is_state());

    // Repeating the same kind is fine.
    let q = qb::table("users")
        .update(record! { "a" => 1 })
        .update(record! { "b" => 2 })
        .where_("id", "=", 1);
    assert_eq!(q.to_sql().unwrap(), "UPDATE users SET `b` = ? WHERE `id` = ?");
}

// ==================== Counting ====================

#[test]
fn test_count_sql_replaces_columns() {
    let q = qb::table("users")
        .select(["id", "name"])
        .json_extract("meta", "x", "x")
        .where_("a", "=", 1)
        .order_by_case("role", [("admin", 1)], "z", "asc")
        .limit(5)
        .offset(10);
    let compiled = q.count_sql().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT COUNT(*) AS aggregate FROM users WHERE `a` = ?"
    );
    assert_eq!(compiled.bindings, vec![Value::Int(1)]);
}

#[test]
fn test_count_sql_wraps_grouped_queries() {
    let q = qb::table("users").group_by(["role"]);
    assert_eq!(
        q.count_sql().unwrap().sql,
        "SELECT COUNT(*) AS aggregate FROM (SELECT * FROM users GROUP BY `role`) AS aggregate_table"
    );
}

#[test]
fn test_count_sql_keeps_soft_delete_filter() {
    let ctx = ctx();
    assert_eq!(
        users(&ctx).count_sql().unwrap().sql,
        "SELECT COUNT(*) AS aggregate FROM users WHERE deleted_at IS NULL"
    );
}

#[test]
fn test_count_sql_rejects_mutations() {
    let err = qb::table("users").delete().count_sql().unwrap_err();
    assert!(err.is_state());
}

// ==================== Eager loading / relations ====================

#[test]
fn test_with_requires_model() {
    let err = qb::table("users").with(["posts"]).compile().unwrap_err();
    assert!(err.is_argument());
}

#[test]
fn test_with_deduplicates() {
    let ctx = ctx();
    let q = users(&ctx)
        .with(["posts", "roles"])
        .with(["posts"])
        .with_constraint("profile", |q| q.where_("public", "=", true));
    assert_eq!(q.eager_relations(), ["posts", "roles", "profile"]);
    assert!(q.eager_constraint("profile").is_some());
    assert!(q.eager_constraint("posts").is_none());
}

#[test]
fn test_has_many_query() {
    let ctx = ctx();
    let user = entity(&ctx, "User", vec![("id", Value::Int(7))]);
    let compiled = user.relation("posts", &ctx).unwrap().query().compile().unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM posts WHERE `user_id` = ?");
    assert_eq!(compiled.bindings, vec![Value::Int(7)]);
}

#[test]
fn test_has_one_query() {
    let ctx = ctx();
    let user = entity(&ctx, "User", vec![("id", Value::Int(7))]);
    let relation = user.relation("profile", &ctx).unwrap();
    assert!(relation.is_single());
    assert_eq!(
        relation.query().to_sql().unwrap(),
        "SELECT * FROM profiles WHERE `user_id` = ?"
    );
}

#[test]
fn test_belongs_to_query() {
    let ctx = ctx();
    let post = entity(&ctx, "Post", vec![("id", Value::Int(1)), ("user_id", Value::Int(7))]);
    let compiled = post.relation("author", &ctx).unwrap().query().compile().unwrap();
    // The owner class soft deletes.
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users WHERE `id` = ? AND deleted_at IS NULL"
    );
    assert_eq!(compiled.bindings, vec![Value::Int(7)]);

    let relation = post.relation("user", &ctx).unwrap();
    assert_eq!(relation.related_class().name(), "app::models::User");
}

#[test]
fn test_belongs_to_many_query() {
    let ctx = ctx();
    let user = entity(&ctx, "User", vec![("id", Value::Int(3))]);
    let relation = user.relation("roles", &ctx).unwrap();
    assert!(!relation.is_single());
    assert_eq!(
        relation.query().to_sql().unwrap(),
        "SELECT roles.* FROM roles INNER JOIN role_user ON `role_user`.`role_id` = `roles`.`id` \
         WHERE `role_user`.`user_id` = ?"
    );
}

#[test]
fn test_has_one_through_query() {
    let ctx = ctx();
    let mechanic = entity(&ctx, "Mechanic", vec![("id", Value::Int(9))]);
    let compiled = mechanic
        .relation("car_owner", &ctx)
        .unwrap()
        .query()
        .compile()
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT owners.* FROM owners INNER JOIN cars ON `cars`.`id` = `owners`.`car_id` \
         WHERE `cars`.`mechanic_id` = ?"
    );
    assert_eq!(compiled.bindings, vec![Value::Int(9)]);
}

#[test]
fn test_unknown_relation() {
    let ctx = ctx();
    let user = entity(&ctx, "User", vec![("id", Value::Int(3))]);
    assert!(user.relation("comments", &ctx).unwrap_err().is_argument());
}

// ==================== Configuration ====================

#[test]
fn test_custom_quote_and_soft_delete_column() {
    let registry = ClassRegistry::new();
    registry.define_model(ModelClass::new("Doc", "docs").with_soft_deletes());
    let ctx = OrmContext::new(
        OrmConfig::default().quote_char('"').soft_delete_column("removed_at"),
        Arc::new(ConventionResolver::new("", Arc::new(registry))),
    );
    let q = Statement::for_model(ctx.resolver().resolve("docs").unwrap(), &ctx)
        .where_("title", "LIKE", "a%");
    assert_eq!(
        q.to_sql().unwrap(),
        r#"SELECT * FROM docs WHERE "title" LIKE ? AND removed_at IS NULL"#
    );
}
