//! Window function expressions (`ROW_NUMBER() OVER (...)` and friends).

use crate::error::OrmResult;
use crate::ident::Grammar;
use crate::qb::Direction;

/// One `ORDER BY` item inside an `OVER (...)` clause.
///
/// Built from a bare column (`"salary"`, ascending) or a `(column, direction)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOrder {
    pub column: String,
    pub direction: String,
}

impl From<&str> for WindowOrder {
    fn from(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: "ASC".to_string(),
        }
    }
}

impl From<String> for WindowOrder {
    fn from(column: String) -> Self {
        Self {
            column,
            direction: "ASC".to_string(),
        }
    }
}

impl From<(&str, &str)> for WindowOrder {
    fn from((column, direction): (&str, &str)) -> Self {
        Self {
            column: column.to_string(),
            direction: direction.to_string(),
        }
    }
}

/// Window specification: `PARTITION BY ... ORDER BY ...`.
///
/// # Example
/// ```ignore
/// use bindorm::qb::{self, Window};
///
/// let q = qb::table("employees").row_number(
///     Window::new().partition_by(["department"]).order_by(("salary", "desc")),
///     "rank_in_dept",
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Window {
    partition_by: Vec<String>,
    order_by: Vec<WindowOrder>,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add partition columns.
    pub fn partition_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.partition_by
            .extend(columns.into_iter().map(|c| c.as_ref().to_string()));
        self
    }

    /// Add one ordering item.
    pub fn order_by(mut self, item: impl Into<WindowOrder>) -> Self {
        self.order_by.push(item.into());
        self
    }

    /// Render the `OVER (...)` clause.
    pub(crate) fn render(&self, grammar: &Grammar) -> OrmResult<String> {
        let mut parts = Vec::new();
        if !self.partition_by.is_empty() {
            let cols: Vec<String> = self
                .partition_by
                .iter()
                .map(|c| grammar.wrap_column(c))
                .collect();
            parts.push(format!("PARTITION BY {}", cols.join(", ")));
        }
        if !self.order_by.is_empty() {
            let mut items = Vec::with_capacity(self.order_by.len());
            for item in &self.order_by {
                let dir = Direction::parse(&item.direction)?;
                items.push(format!("{} {}", grammar.wrap_column(&item.column), dir.as_sql()));
            }
            parts.push(format!("ORDER BY {}", items.join(", ")));
        }
        Ok(format!("OVER ({})", parts.join(" ")))
    }
}

/// `function OVER (...) AS alias`
pub(crate) fn render_window_column(
    function: &str,
    window: &Window,
    alias: &str,
    grammar: &Grammar,
) -> OrmResult<String> {
    Ok(format!(
        "{function} {} AS {}",
        window.render(grammar)?,
        grammar.wrap_alias(alias)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_and_order() {
        let w = Window::new()
            .partition_by(["department"])
            .order_by(("salary", "desc"))
            .order_by("id");
        assert_eq!(
            w.render(&Grammar::default()).unwrap(),
            "OVER (PARTITION BY `department` ORDER BY `salary` DESC, `id` ASC)"
        );
    }

    #[test]
    fn empty_window() {
        assert_eq!(Window::new().render(&Grammar::default()).unwrap(), "OVER ()");
    }

    #[test]
    fn bad_direction_is_rejected() {
        let w = Window::new().order_by(("salary", "sideways"));
        assert!(w.render(&Grammar::default()).unwrap_err().is_argument());
    }

    #[test]
    fn column_with_alias() {
        let sql = render_window_column(
            "SUM(`amount`)",
            &Window::new().partition_by(["user_id"]),
            "running_total",
            &Grammar::default(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "SUM(`amount`) OVER (PARTITION BY `user_id`) AS `running_total`"
        );
    }
}
