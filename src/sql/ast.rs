//! # Statement AST
//!
//! The shapes the parser produces. The surface is three statements over
//! two-column `(key, value)` tables; predicates are simple comparisons on
//! either column, combined with `AND`.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    Select(SelectStatement<'a>),
    Load(LoadStatement<'a>),
    CreateIndex { table: &'a str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement<'a> {
    pub projection: Projection,
    pub table: &'a str,
    pub predicates: Vec<Predicate<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStatement<'a> {
    pub table: &'a str,
    pub file: &'a str,
    pub with_index: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Key,
    Value,
    All,
    Count,
}

impl Projection {
    /// Whether producing this projection requires the heap value.
    pub fn needs_value(self) -> bool {
        matches!(self, Projection::Value | Projection::All)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn matches(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }
}

/// One conjunct of a WHERE clause. Key comparisons carry integer
/// literals, value comparisons carry byte strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate<'a> {
    Key(CompareOp, i32),
    Value(CompareOp, &'a str),
}

impl Predicate<'_> {
    pub fn matches(&self, key: i32, value: &str) -> bool {
        match self {
            Predicate::Key(op, k) => op.matches(key.cmp(k)),
            Predicate::Value(op, v) => op.matches(value.cmp(*v)),
        }
    }
}
