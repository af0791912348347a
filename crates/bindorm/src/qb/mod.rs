//! Statement builder and SQL compiler.
//!
//! A [`Statement`] accumulates clause state through a fluent API and compiles
//! to SQL with positional `?` placeholders. Bound values are kept in one bucket
//! per clause category and merged in placeholder order at compile time.
//!
//! # Usage
//!
//! ```ignore
//! use bindorm::qb;
//!
//! // SELECT
//! let q = qb::select(["id"])
//!     .from("users")
//!     .where_("status", "=", "active")
//!     .order_by("id", "DESC")
//!     .limit(10);
//! assert_eq!(q.to_sql()?, "SELECT `id` FROM users WHERE `status` = ? ORDER BY `id` DESC LIMIT 10");
//!
//! // INSERT
//! qb::table("users")
//!     .insert(bindorm::record! { "name" => "A", "email" => "a@x.com" })
//!     .execute(&conn)
//!     .await?;
//!
//! // UPSERT
//! qb::table("users")
//!     .upsert(bindorm::record! { "email" => "a@x.com", "name" => "A" }, ["email"])
//!     .execute(&conn)
//!     .await?;
//! ```

mod bindings;
mod compile;
mod exec;
mod json;
mod statement;
mod where_clause;
mod window;

pub use bindings::{Bindings, Bucket};
pub use compile::CompiledQuery;
pub use json::Dialect;
pub use statement::{EagerConstraint, SoftDeleteMode, Statement};
pub use where_clause::{Column, Connector, Operand, Operator, WhereCondition, render_conditions};
pub use window::{Window, WindowOrder};

use crate::error::{OrmError, OrmResult};

/// The operation a statement compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementKind {
    #[default]
    Select,
    Insert,
    InsertIgnore,
    Update,
    Delete,
    Upsert,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parse `ASC`/`DESC`, case-insensitively.
    pub fn parse(dir: &str) -> OrmResult<Self> {
        match dir.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            _ => Err(OrmError::argument(format!(
                "Invalid sort direction '{dir}', expected ASC or DESC"
            ))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Create a SELECT statement for the given table.
///
/// # Example
/// ```ignore
/// let q = bindorm::qb::table("users").where_("id", "=", 1);
/// ```
pub fn table(table: &str) -> Statement {
    Statement::table(table)
}

/// Create a SELECT statement with the given columns; set the table with
/// [`Statement::from`].
pub fn select<I, S>(columns: I) -> Statement
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Statement::new().select(columns)
}

#[cfg(test)]
mod tests;
