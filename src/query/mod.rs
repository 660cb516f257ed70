//! Store-neutral query description: filters, ordering and paging over one model.

mod compose;

pub use compose::{compose, LoadOptions, QueryHook, WhereClause, WhereFn};

use crate::config::ModelSchema;
use crate::error::AppError;
use regex::RegexBuilder;
use serde_json::Value;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

/// Filter operator. Parsed from the usual SQL spellings and passed to the store as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Like,
    ILike,
    IsNull,
    IsNotNull,
}

impl FromStr for Operator {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        Ok(match normalized.as_str() {
            "=" | "==" | "eq" => Operator::Eq,
            "!=" | "<>" | "ne" => Operator::Ne,
            "<" | "lt" => Operator::Lt,
            "<=" | "lte" => Operator::Lte,
            ">" | "gt" => Operator::Gt,
            ">=" | "gte" => Operator::Gte,
            "in" => Operator::In,
            "not in" => Operator::NotIn,
            "like" => Operator::Like,
            "ilike" => Operator::ILike,
            "is null" | "is" => Operator::IsNull,
            "is not null" | "is not" => Operator::IsNotNull,
            _ => return Err(AppError::BadRequest(format!("unsupported operator: {}", s))),
        })
    }
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Evaluate against a stored value with SQL semantics: comparisons involving NULL are false.
    pub fn matches(&self, left: Option<&Value>, right: &Value) -> bool {
        let left = left.unwrap_or(&Value::Null);
        match self {
            Operator::IsNull => left.is_null(),
            Operator::IsNotNull => !left.is_null(),
            _ if left.is_null() => false,
            Operator::In | Operator::NotIn => {
                let Some(items) = right.as_array() else { return false };
                let found = items.iter().any(|r| compare(left, r) == Some(Ordering::Equal));
                (*self == Operator::In) == found
            }
            Operator::Like | Operator::ILike => match (left.as_str(), right.as_str()) {
                (Some(l), Some(pattern)) => like(l, pattern, *self == Operator::ILike),
                _ => false,
            },
            _ => {
                let Some(ord) = compare(left, right) else { return false };
                match self {
                    Operator::Eq => ord == Ordering::Equal,
                    Operator::Ne => ord != Ordering::Equal,
                    Operator::Lt => ord == Ordering::Less,
                    Operator::Lte => ord != Ordering::Greater,
                    Operator::Gt => ord == Ordering::Greater,
                    Operator::Gte => ord != Ordering::Less,
                    _ => false,
                }
            }
        }
    }
}

/// Order two JSON scalars of the same kind; mismatched kinds and NULLs are incomparable.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, _) | (_, Value::Null) => None,
        _ if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

fn like(value: &str, pattern: &str, case_insensitive: bool) -> bool {
    let mut re = String::from("^");
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                re.push_str(&regex::escape(&literal));
                literal.clear();
                re.push_str(if c == '%' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    re.push_str(&regex::escape(&literal));
    re.push('$');
    RegexBuilder::new(&re)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(true)
        .build()
        .map(|r| r.is_match(value))
        .unwrap_or(false)
}

/// One `(field, operator, value)` filter.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Predicate {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    /// Build from a textual operator, e.g. `Predicate::parse("age", ">=", 18)`.
    pub fn parse(field: impl Into<String>, op: &str, value: impl Into<Value>) -> Result<Self, AppError> {
        Ok(Self::new(field, op.parse()?, value))
    }

    pub fn matches(&self, row: &serde_json::Map<String, Value>) -> bool {
        self.op.matches(row.get(&self.field), &self.value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A select over one model. Filters are ANDed in order.
#[derive(Clone, Debug)]
pub struct Query {
    pub model: Arc<ModelSchema>,
    pub filters: Vec<Predicate>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Query {
    /// Base "select all" query for a model.
    pub fn select_all(model: Arc<ModelSchema>) -> Self {
        Query {
            model,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::eq(field, value))
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u32) -> Self {
        self.offset = Some(n);
        self
    }

    /// Fields referenced by filters or ordering that the model does not declare.
    pub fn unknown_fields(&self) -> Vec<&str> {
        self.filters
            .iter()
            .map(|p| p.field.as_str())
            .chain(self.order_by.iter().map(|o| o.field.as_str()))
            .filter(|f| !self.model.has_field(f))
            .collect()
    }

    /// Reject queries that reference undeclared fields; identifiers only ever come from the schema.
    pub fn ensure_known_fields(&self) -> Result<(), AppError> {
        match self.unknown_fields().first() {
            Some(f) => Err(AppError::BadRequest(format!("unknown field '{}' on {}", f, self.model.name))),
            None => Ok(()),
        }
    }
}
