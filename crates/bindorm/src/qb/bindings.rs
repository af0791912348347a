//! Per-clause binding buckets.
//!
//! Every clause writes its bound values into its own bucket at call time. At
//! compile time the buckets are concatenated in the order in which their
//! placeholders appear in the rendered SQL, which is fixed per statement kind.

use crate::qb::StatementKind;
use crate::value::Value;

/// Clause category a bound value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Expressions in the SELECT list (JSON paths, ...).
    Select,
    /// Join sub-queries and raw joins.
    Join,
    /// Structured WHERE tree.
    Where,
    /// Raw JSON WHERE predicates, rendered after the structured WHERE.
    JsonWhere,
    Having,
    /// `ORDER BY CASE` rank keys.
    Order,
    /// Statements appended with UNION.
    Union,
    /// INSERT/UPDATE/UPSERT column values.
    Mutation,
}

const SELECT_ORDER: &[Bucket] = &[
    Bucket::Select,
    Bucket::Join,
    Bucket::Where,
    Bucket::JsonWhere,
    Bucket::Having,
    Bucket::Order,
    Bucket::Union,
];
const INSERT_ORDER: &[Bucket] = &[Bucket::Mutation];
const UPDATE_ORDER: &[Bucket] = &[Bucket::Mutation, Bucket::Where, Bucket::JsonWhere];
const DELETE_ORDER: &[Bucket] = &[Bucket::Where, Bucket::JsonWhere];

impl Bucket {
    /// Buckets that contribute placeholders for `kind`, in render order.
    pub fn render_order(kind: StatementKind) -> &'static [Bucket] {
        match kind {
            StatementKind::Select => SELECT_ORDER,
            StatementKind::Insert | StatementKind::InsertIgnore | StatementKind::Upsert => {
                INSERT_ORDER
            }
            StatementKind::Update => UPDATE_ORDER,
            StatementKind::Delete => DELETE_ORDER,
        }
    }
}

/// Ordered, named buckets of bound values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    select: Vec<Value>,
    join: Vec<Value>,
    where_: Vec<Value>,
    json_where: Vec<Value>,
    having: Vec<Value>,
    order: Vec<Value>,
    union: Vec<Value>,
    mutation: Vec<Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<Value> {
        match bucket {
            Bucket::Select => &mut self.select,
            Bucket::Join => &mut self.join,
            Bucket::Where => &mut self.where_,
            Bucket::JsonWhere => &mut self.json_where,
            Bucket::Having => &mut self.having,
            Bucket::Order => &mut self.order,
            Bucket::Union => &mut self.union,
            Bucket::Mutation => &mut self.mutation,
        }
    }

    /// Values currently held by `bucket`.
    pub fn bucket(&self, bucket: Bucket) -> &[Value] {
        match bucket {
            Bucket::Select => &self.select,
            Bucket::Join => &self.join,
            Bucket::Where => &self.where_,
            Bucket::JsonWhere => &self.json_where,
            Bucket::Having => &self.having,
            Bucket::Order => &self.order,
            Bucket::Union => &self.union,
            Bucket::Mutation => &self.mutation,
        }
    }

    /// Append one value to a bucket.
    pub fn add(&mut self, bucket: Bucket, value: Value) {
        self.bucket_mut(bucket).push(value);
    }

    /// Append several values to a bucket, preserving their order.
    pub fn extend(&mut self, bucket: Bucket, values: impl IntoIterator<Item = Value>) {
        self.bucket_mut(bucket).extend(values);
    }

    /// Replace a bucket's contents.
    pub fn replace(&mut self, bucket: Bucket, values: Vec<Value>) {
        *self.bucket_mut(bucket) = values;
    }

    /// Empty a bucket.
    pub fn clear(&mut self, bucket: Bucket) {
        self.bucket_mut(bucket).clear();
    }

    /// Concatenate the buckets that `kind` renders, in placeholder order.
    pub fn merge_in_render_order(&self, kind: StatementKind) -> Vec<Value> {
        let order = Bucket::render_order(kind);
        let len = order.iter().map(|b| self.bucket(*b).len()).sum();
        let mut out = Vec::with_capacity(len);
        for bucket in order {
            out.extend(self.bucket(*bucket).iter().cloned());
        }
        out
    }
}

/// Count `?` placeholders, skipping quoted literals and quoted identifiers.
pub(crate) fn count_placeholders(sql: &str, ident_quote: char) -> usize {
    let mut count = 0;
    let mut in_quote: Option<char> = None;
    for ch in sql.chars() {
        match in_quote {
            // A doubled quote closes and immediately reopens, which nets out.
            Some(q) if ch == q => in_quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == ident_quote => in_quote = Some(ch),
            None if ch == '?' => count += 1,
            None => {}
        }
    }
    count
}
