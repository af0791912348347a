//! # bindorm
//!
//! A fluent SQL statement builder with positional bindings and
//! relationship-aware entity mapping.
//!
//! ## Features
//!
//! - **Positional bindings**: values never touch the SQL text; they are
//!   collected per clause and merged in SQL-text order
//! - **One builder for every statement**: SELECT, INSERT, INSERT IGNORE,
//!   UPDATE, DELETE and UPSERT
//! - **Soft deletes**: model classes with a `deleted_at` column are filtered
//!   automatically
//! - **Relations**: `has_one`, `has_many`, `belongs_to`, `belongs_to_many` and
//!   `has_one_through`, with batched eager loading
//! - **Model class resolution**: short names are resolved by convention and
//!   loaded once through a registry
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use bindorm::qb;
//!
//! // SELECT
//! let rows = qb::table("users")
//!     .select(["id", "name"])
//!     .where_("status", "=", "active")
//!     .order_by("created_at", "desc")
//!     .limit(10)
//!     .fetch_rows(&conn)
//!     .await?;
//!
//! // INSERT
//! qb::table("users")
//!     .insert(bindorm::record! { "name" => "alice", "email" => "alice@example.com" })
//!     .execute(&conn)
//!     .await?;
//!
//! // Entities with eager loading
//! let users = Statement::for_model(ctx.resolver().resolve("User")?, &ctx)
//!     .with(["posts"])
//!     .get(&conn)
//!     .await?;
//! ```

pub mod config;
pub mod connection;
pub mod eager;
pub mod error;
pub mod ident;
pub mod model;
pub mod pagination;
pub mod qb;
pub mod relation;
pub mod row;
pub mod value;

#[cfg(feature = "postgres")]
pub mod pg;

pub use config::{OrmConfig, OrmContext};
pub use connection::Connection;
pub use error::{Diagnostic, OrmError, OrmResult, ResolutionError, ResolutionPhase};
pub use ident::Grammar;
pub use model::{ClassRegistration, ClassRegistry, Entity, ModelClass, ModelResolver, Related};
pub use pagination::{PageMeta, Paginated, SearchResults};
pub use relation::{Relation, RelationDef};
pub use row::{FromRow, FromValue, Row};
pub use value::Value;

// Re-export qb entry points for easy access
pub use qb::{CompiledQuery, Dialect, Statement, StatementKind, Window, select, table};

#[doc(hidden)]
pub use inventory;
