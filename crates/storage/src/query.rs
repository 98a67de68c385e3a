//! Rich query documents and a selector evaluator.
//!
//! A rich query is a single JSON object in the CouchDB Mango dialect:
//!
//! ```json
//! {"selector": {"assetType": "electronicDevice"}, "sort": [{"deviceId": "desc"}]}
//! ```
//!
//! [`RichQuery`] is the typed form of that document. Building a query through
//! it guarantees that `selector`, `sort` and `limit` all live inside one
//! object; parsing a string through [`RichQuery::parse`] rejects anything
//! else, including a sort clause appended after the closing brace.
//!
//! Selectors are conjunctions of field equalities. Field names may be dotted
//! paths (`a.b`) into nested objects. Mango operators (`$gt`, `$or`, ...) are
//! rejected as [`StorageError::InvalidQuery`].
//!
//! # Example
//!
//! ```
//! use electronics_ledger_storage::query::{RichQuery, SortField};
//! use serde_json::json;
//!
//! let query = RichQuery::builder()
//!     .selector(json!({"assetType": "electronicDevice"}).as_object().cloned().unwrap())
//!     .sort(vec![SortField::desc("deviceId")])
//!     .build();
//!
//! let text = query.to_query_string().unwrap();
//! assert_eq!(RichQuery::parse(&text).unwrap(), query);
//! ```

use std::{cmp::Ordering, collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StorageError, StorageResult};

/// Direction of a sort clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// One entry of a query's `sort` array.
///
/// Serialized as `{"field": "asc"|"desc"}`; a bare `"field"` string is also
/// accepted when parsing and means ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSortField", into = "RawSortField")]
pub struct SortField {
    /// Dotted path of the field to sort on.
    pub field: String,
    /// Sort direction.
    pub order: SortOrder,
}

impl SortField {
    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: SortOrder::Asc }
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: SortOrder::Desc }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSortField {
    Bare(String),
    Directed(BTreeMap<String, SortOrder>),
}

impl TryFrom<RawSortField> for SortField {
    type Error = String;

    fn try_from(raw: RawSortField) -> Result<Self, Self::Error> {
        match raw {
            RawSortField::Bare(field) => Ok(Self::asc(field)),
            RawSortField::Directed(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((field, order)), None) => Ok(Self { field, order }),
                    _ => Err("sort entries must name exactly one field".to_owned()),
                }
            },
        }
    }
}

impl From<SortField> for RawSortField {
    fn from(sort: SortField) -> Self {
        RawSortField::Directed(BTreeMap::from([(sort.field, sort.order)]))
    }
}

/// A complete rich query document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct RichQuery {
    /// Field values the documents must equal.
    pub selector: Map<String, Value>,

    /// Sort clauses, applied in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub sort: Vec<SortField>,

    /// Maximum number of documents to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl RichQuery {
    /// Parses and validates a query string.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidQuery`] if the string is not exactly one
    /// JSON object of the expected shape, or the selector uses an operator.
    pub fn parse(query: &str) -> StorageResult<Self> {
        let parsed: Self = serde_json::from_str(query).map_err(|e| {
            StorageError::invalid_query_with_source(format!("malformed query document: {e}"), e)
        })?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Serializes the query into the single-object wire form.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidQuery`] if the selector is invalid and
    /// [`StorageError::Serialization`] if encoding fails.
    pub fn to_query_string(&self) -> StorageResult<String> {
        self.validate()?;
        serde_json::to_string(self)
            .map_err(|e| StorageError::serialization_with_source("failed to encode rich query", e))
    }

    /// Checks that the selector holds only field equalities.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidQuery`] naming the first operator found.
    pub fn validate(&self) -> StorageResult<()> {
        validate_selector(&self.selector)
    }

    /// Returns `true` if `doc` satisfies the selector.
    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        selector_matches(&self.selector, doc)
    }

    /// Orders two documents according to the sort clauses.
    ///
    /// Missing fields collate as `null`, before every other value.
    #[must_use]
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for sort in &self.sort {
            let left = lookup(a, &sort.field).unwrap_or(&Value::Null);
            let right = lookup(b, &sort.field).unwrap_or(&Value::Null);
            let ordering = match sort.order {
                SortOrder::Asc => collate(left, right),
                SortOrder::Desc => collate(right, left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Applies `limit` to an already sorted result list.
    pub fn apply_limit<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if let Some(limit) = self.limit {
            items.truncate(limit);
        }
        items
    }
}

impl fmt::Display for RichQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

fn validate_selector(selector: &Map<String, Value>) -> StorageResult<()> {
    for (key, condition) in selector {
        if key.starts_with('$') {
            return Err(StorageError::invalid_query(format!("unsupported operator {key}")));
        }
        if let Some(nested) = condition.as_object() {
            validate_selector(nested).map_err(|_| {
                StorageError::invalid_query(format!("field {key} may only be matched by value"))
            })?;
        }
    }
    Ok(())
}

fn selector_matches(selector: &Map<String, Value>, doc: &Value) -> bool {
    selector.iter().all(|(field, expected)| lookup(doc, field) == Some(expected))
}

/// Resolves a dotted field path inside a JSON document.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| current.as_object()?.get(segment))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: null < booleans < numbers < strings <
/// arrays < objects.
fn collate(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y) {
                let ordering = collate(left, right);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        },
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
