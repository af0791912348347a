//! SQL identifier quoting.
//!
//! Only plain identifiers are quoted: tokens matching `[A-Za-z_][A-Za-z0-9_.]*`.
//! Everything else (`*`, function calls, expressions, names that are already
//! quoted) is emitted unchanged. This keeps expressions usable in column lists;
//! it is not an injection guard.
//!
//! # Example
//! ```ignore
//! use bindorm::Grammar;
//!
//! let g = Grammar::default();
//! assert_eq!(g.wrap_column("users.id"), "`users`.`id`");
//! assert_eq!(g.wrap_column("COUNT(*)"), "COUNT(*)");
//! ```

use regex::Regex;
use std::sync::LazyLock;

static PLAIN_IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("identifier pattern is valid")
});

static AS_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\S+)\s+as\s+(\S+)\s*$").expect("alias pattern is valid")
});

/// Returns true if `name` is a plain identifier that gets quoted.
pub fn is_plain_ident(name: &str) -> bool {
    PLAIN_IDENT.is_match(name)
}

/// Identifier quoting rules for one SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar {
    quote: char,
}

impl Default for Grammar {
    fn default() -> Self {
        Self { quote: '`' }
    }
}

impl Grammar {
    /// Create a grammar quoting identifiers with `quote`.
    pub fn new(quote: char) -> Self {
        Self { quote }
    }

    /// The quote character.
    pub fn quote_char(&self) -> char {
        self.quote
    }

    /// Quote a column reference, segment by segment for dotted names.
    pub fn wrap_column(&self, name: &str) -> String {
        if !is_plain_ident(name) {
            return name.to_string();
        }
        let mut out = String::with_capacity(name.len() + 4);
        for (i, segment) in name.split('.').enumerate() {
            if i > 0 {
                out.push('.');
            }
            // `users.` or `a..b` keep their empty segments unquoted.
            if segment.is_empty() {
                continue;
            }
            self.push_quoted(&mut out, segment);
        }
        out
    }

    /// Quote an alias. Already-quoted aliases are returned untouched.
    pub fn wrap_alias(&self, name: &str) -> String {
        if self.is_quoted(name) {
            return name.to_string();
        }
        if !is_plain_ident(name) || name.contains('.') {
            return name.to_string();
        }
        let mut out = String::with_capacity(name.len() + 2);
        self.push_quoted(&mut out, name);
        out
    }

    /// Quote a SELECT list entry, handling `column AS alias`.
    pub fn wrap_select_column(&self, expr: &str) -> String {
        if is_function_like(expr) {
            return expr.to_string();
        }
        if let Some(caps) = AS_ALIAS.captures(expr) {
            return format!(
                "{} AS {}",
                self.wrap_column(&caps[1]),
                self.wrap_alias(&caps[2])
            );
        }
        self.wrap_column(expr.trim())
    }

    /// Strip this grammar's quotes from an identifier.
    pub fn unwrap(&self, name: &str) -> String {
        name.chars().filter(|&c| c != self.quote).collect()
    }

    fn is_quoted(&self, name: &str) -> bool {
        name.len() >= 2 && name.starts_with(self.quote) && name.ends_with(self.quote)
    }

    fn push_quoted(&self, out: &mut String, segment: &str) {
        out.push(self.quote);
        out.push_str(segment);
        out.push(self.quote);
    }
}

/// Expressions that are already SQL (calls, `COUNT ...`, `NOW ...`) and must not be quoted.
pub(crate) fn is_function_like(expr: &str) -> bool {
    let upper = expr.trim_start().to_ascii_uppercase();
    expr.contains('(') || upper.starts_with("COUNT") || upper.starts_with("NOW")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_simple() {
        assert_eq!(Grammar::default().wrap_column("id"), "`id`");
    }

    #[test]
    fn wrap_dotted() {
        assert_eq!(Grammar::default().wrap_column("users.id"), "`users`.`id`");
    }

    #[test]
    fn wrap_three_parts() {
        assert_eq!(
            Grammar::default().wrap_column("schema.table.column"),
            "`schema`.`table`.`column`"
        );
    }

    #[test]
    fn wrap_passes_star_through() {
        assert_eq!(Grammar::default().wrap_column("*"), "*");
    }

    #[test]
    fn wrap_passes_expressions_through() {
        let g = Grammar::default();
        assert_eq!(g.wrap_column("COUNT(*)"), "COUNT(*)");
        assert_eq!(g.wrap_column("`already`"), "`already`");
        assert_eq!(g.wrap_column("a + b"), "a + b");
        assert_eq!(g.wrap_column("1table"), "1table");
    }

    #[test]
    fn wrap_with_double_quotes() {
        assert_eq!(Grammar::new('"').wrap_column("users.id"), r#""users"."id""#);
    }

    #[test]
    fn alias_is_idempotent() {
        let g = Grammar::default();
        let once = g.wrap_alias("total");
        assert_eq!(once, "`total`");
        assert_eq!(g.wrap_alias(&once), "`total`");
    }

    #[test]
    fn select_column_with_alias() {
        let g = Grammar::default();
        assert_eq!(g.wrap_select_column("name as n"), "`name` AS `n`");
        assert_eq!(g.wrap_select_column("u.name AS user_name"), "`u`.`name` AS `user_name`");
    }

    #[test]
    fn select_column_function_like() {
        let g = Grammar::default();
        assert_eq!(g.wrap_select_column("COUNT(*) as total"), "COUNT(*) as total");
        assert_eq!(g.wrap_select_column("NOW() AS ts"), "NOW() AS ts");
        assert_eq!(g.wrap_select_column("count_all"), "count_all");
    }

    #[test]
    fn unwrap_strips_quotes() {
        assert_eq!(Grammar::default().unwrap("`users`.`deleted_at`"), "users.deleted_at");
    }
}
