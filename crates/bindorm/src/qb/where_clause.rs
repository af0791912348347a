//! WHERE condition tree.
//!
//! Conditions are stored as a closed sum type and rendered in one place. Bound
//! values live in the statement's binding buckets; a condition only records how
//! many placeholders it renders.

use crate::error::{OrmError, OrmResult};
use crate::ident::Grammar;
use std::fmt;

/// Boolean connector placed before a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn as_sql(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Comparison operators accepted by `where_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    Is,
    IsNot,
}

impl Operator {
    /// Parse an operator, case-insensitively. Unknown operators are argument errors.
    pub fn parse(op: &str) -> OrmResult<Self> {
        let normalized = op.split_whitespace().collect::<Vec<_>>().join(" ");
        let parsed = match normalized.to_ascii_uppercase().as_str() {
            "=" => Operator::Eq,
            "!=" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "BETWEEN" => Operator::Between,
            "IS" => Operator::Is,
            "IS NOT" => Operator::IsNot,
            _ => return Err(OrmError::argument(format!("Unsupported operator '{op}'"))),
        };
        Ok(parsed)
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Column reference in a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Emit the name as-is instead of quoting it.
    pub raw: bool,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: false,
        }
    }

    pub fn raw(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: true,
        }
    }

    fn render(&self, grammar: &Grammar) -> String {
        if self.raw {
            self.name.clone()
        } else {
            grammar.wrap_column(&self.name)
        }
    }

    /// Whether this refers to `name`, ignoring quoting.
    pub fn is(&self, name: &str, grammar: &Grammar) -> bool {
        grammar.unwrap(&self.name) == grammar.unwrap(name)
    }
}

/// Right-hand side of a [`WhereCondition::Raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// A single `?`.
    Placeholder,
    /// A parenthesized group of `n` placeholders (`IN`/`NOT IN`).
    Group(usize),
    /// `? AND ?` (`BETWEEN`).
    Range,
    /// The `NULL` literal (`IS`/`IS NOT`), binds nothing.
    Null,
}

/// One node of the WHERE tree.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereCondition {
    /// `column operator operand`
    Raw {
        column: Column,
        operator: Operator,
        operand: Operand,
        connector: Connector,
    },
    /// `column [NOT] IN (?, ?, ...)`
    List {
        column: Column,
        negated: bool,
        count: usize,
        connector: Connector,
    },
    /// `column operator (SELECT ...)`
    Subquery {
        column: Column,
        operator: Operator,
        sql: String,
        connector: Connector,
    },
    /// A parenthesized group of conditions.
    Nested {
        conditions: Vec<WhereCondition>,
        connector: Connector,
    },
}

impl WhereCondition {
    pub fn connector(&self) -> Connector {
        match self {
            WhereCondition::Raw { connector, .. }
            | WhereCondition::List { connector, .. }
            | WhereCondition::Subquery { connector, .. }
            | WhereCondition::Nested { connector, .. } => *connector,
        }
    }

    /// True if this is `column IS NULL` (or `IS NOT NULL` when `not_null`) with `connector`.
    pub fn is_null_check(
        &self,
        name: &str,
        not_null: bool,
        connector: Connector,
        grammar: &Grammar,
    ) -> bool {
        let want = if not_null { Operator::IsNot } else { Operator::Is };
        matches!(
            self,
            WhereCondition::Raw { column, operator, operand: Operand::Null, connector: c }
                if *operator == want && *c == connector && column.is(name, grammar)
        )
    }

    fn render(&self, grammar: &Grammar) -> String {
        match self {
            WhereCondition::Raw {
                column,
                operator,
                operand,
                ..
            } => {
                let col = column.render(grammar);
                match operand {
                    Operand::Placeholder => format!("{col} {operator} ?"),
                    Operand::Group(n) => format!("{col} {operator} ({})", placeholders(*n)),
                    Operand::Range => format!("{col} {operator} ? AND ?"),
                    Operand::Null => format!("{col} {operator} NULL"),
                }
            }
            WhereCondition::List {
                column,
                negated,
                count,
                ..
            } => {
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {op} ({})", column.render(grammar), placeholders(*count))
            }
            WhereCondition::Subquery {
                column,
                operator,
                sql,
                ..
            } => format!("{} {operator} ({sql})", column.render(grammar)),
            WhereCondition::Nested { conditions, .. } => {
                format!("({})", render_conditions(conditions, grammar))
            }
        }
    }
}

/// `?, ?, ?`
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Render a condition list joined by connectors, without the leading connector
/// and without the `WHERE` keyword.
pub fn render_conditions(conditions: &[WhereCondition], grammar: &Grammar) -> String {
    let mut out = String::new();
    for cond in conditions {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(cond.connector().as_sql());
        out.push(' ');
        out.push_str(&cond.render(grammar));
    }
    strip_leading_connector(&out).to_string()
}

fn strip_leading_connector(sql: &str) -> &str {
    sql.strip_prefix("AND ")
        .or_else(|| sql.strip_prefix("OR "))
        .unwrap_or(sql)
}
