//! Query predicate model
//!
//! Every filterable metadata field is expressed as a [`Predicate`]: a value
//! plus a comparison operator, equality by default. Predicates are built
//! once at the query-construction boundary and never mutate caller data.
//! Backends receive them either as the wire form
//! (`{"value": .., "op": ".."}`) or evaluate them directly in process.

use crate::error::{Result, StoreError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Default page size when a caller supplies no (or a nonsensical) limit
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Comparison operator applied to a metadata value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// Exact equality (the default)
    Eq,
    /// Inequality
    Ne,
    /// Greater than (numeric)
    Gt,
    /// Greater than or equal (numeric)
    Gte,
    /// Less than (numeric)
    Lt,
    /// Less than or equal (numeric)
    Lte,
    /// Regular-expression match against the string form of the value
    Regexp,
}

/// A single metadata filter: a value and how to compare it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// The comparand
    pub value: Value,
    /// The comparison operator
    pub op: Op,
}

impl Predicate {
    /// Equality predicate
    pub fn eq(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            op: Op::Eq,
        }
    }

    /// Predicate with an explicit operator
    pub fn with_op(value: impl Into<Value>, op: Op) -> Self {
        Self {
            value: value.into(),
            op,
        }
    }

    /// Regular-expression predicate from a raw pattern
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            value: Value::String(pattern.into()),
            op: Op::Regexp,
        }
    }

    /// Anchored prefix match, used for item-type lookups against the
    /// composite `itemId` field
    pub fn starts_with(prefix: &str) -> Self {
        Self::pattern(format!("^{}", regex::escape(prefix)))
    }

    /// Evaluate this predicate against a metadata value
    ///
    /// `None` (the key is absent from the record) never matches. Numeric
    /// operators compare via `f64`; `Regexp` matches the string form of
    /// the value.
    pub fn matches(&self, actual: Option<&Value>) -> Result<bool> {
        let actual = match actual {
            Some(v) => v,
            None => return Ok(false),
        };

        match self.op {
            Op::Eq => Ok(loose_eq(actual, &self.value)),
            Op::Ne => Ok(!loose_eq(actual, &self.value)),
            Op::Gt | Op::Gte | Op::Lt | Op::Lte => {
                let (a, b) = match (as_number(actual), as_number(&self.value)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Ok(false),
                };
                Ok(match self.op {
                    Op::Gt => a > b,
                    Op::Gte => a >= b,
                    Op::Lt => a < b,
                    Op::Lte => a <= b,
                    _ => unreachable!(),
                })
            }
            Op::Regexp => {
                let pattern = self.value.as_str().ok_or_else(|| {
                    StoreError::Validation("regexp predicate requires a string pattern".to_string())
                })?;
                let re = Regex::new(pattern)?;
                Ok(re.is_match(&string_form(actual)))
            }
        }
    }
}

impl From<&str> for Predicate {
    fn from(value: &str) -> Self {
        Self::eq(value)
    }
}

impl From<String> for Predicate {
    fn from(value: String) -> Self {
        Self::eq(value)
    }
}

impl From<i64> for Predicate {
    fn from(value: i64) -> Self {
        Self::eq(value)
    }
}

impl From<Value> for Predicate {
    fn from(value: Value) -> Self {
        Self::eq(value)
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    // 1 and 1.0 are the same metadata value
    match (as_number(a), as_number(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string_form(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Backend-level pin listing query: content-hash filter, keyvalue
/// predicates, offset/limit pagination
#[derive(Clone, Debug, Default)]
pub struct PinQuery {
    /// Restrict to a single content hash
    pub content_hash: Option<String>,
    /// Metadata predicates, all of which must match
    pub keyvalues: HashMap<String, Predicate>,
    /// Number of records to skip
    pub offset: u64,
    /// Maximum number of records to return
    pub limit: u64,
}

impl PinQuery {
    /// New query with the default page size
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT as u64,
            ..Default::default()
        }
    }

    /// Restrict to a single content hash
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    /// Add a metadata predicate
    pub fn with_keyvalue(mut self, key: impl Into<String>, predicate: impl Into<Predicate>) -> Self {
        self.keyvalues.insert(key.into(), predicate.into());
        self
    }

    /// Set offset and limit
    pub fn with_page(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// Caller-facing item listing query
///
/// `page` and `limit` are deliberately signed: values below 1 are clamped
/// (page to 1, limit to [`DEFAULT_PAGE_LIMIT`]), never rejected.
#[derive(Clone, Debug)]
pub struct ItemQuery {
    /// Item type to list (matched as an `itemId` prefix)
    pub item_type: String,
    /// 1-based page number
    pub page: i64,
    /// Page size
    pub limit: i64,
    /// Extra metadata predicates
    pub keyvalues: HashMap<String, Predicate>,
    /// Restrict to a single owner
    pub owner: Option<String>,
}

impl ItemQuery {
    /// New query for the given item type, first page, default limit
    pub fn new(item_type: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            keyvalues: HashMap::new(),
            owner: None,
        }
    }

    /// Set the 1-based page number
    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    /// Set the page size
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Add a metadata predicate
    pub fn keyvalue(mut self, key: impl Into<String>, predicate: impl Into<Predicate>) -> Self {
        self.keyvalues.insert(key.into(), predicate.into());
        self
    }

    /// Restrict to a single owner
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Page number with the below-1 clamp applied
    pub fn normalized_page(&self) -> u64 {
        self.page.max(1) as u64
    }

    /// Page size with the below-1 clamp applied
    pub fn normalized_limit(&self) -> u64 {
        if self.limit < 1 {
            DEFAULT_PAGE_LIMIT as u64
        } else {
            self.limit as u64
        }
    }
}
