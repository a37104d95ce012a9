//! Metadata filters for retrieval.
//!
//! Filters use the JSON dialect of hosted vector indexes:
//!
//! ```json
//! {"campus": {"$eq": "St. George"}, "division": {"$in": ["A", "B"]}}
//! {"$or": [{"department": "Computer Science"}, {"department": "Statistics"}]}
//! ```
//!
//! A bare value means `$eq`, and several fields in one object must all match.

use advisor_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Comparison applied to a single metadata field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String),
    Ne(String),
    In(Vec<String>),
    Nin(Vec<String>),
}

/// A parsed metadata filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum MetadataFilter {
    And(Vec<MetadataFilter>),
    Or(Vec<MetadataFilter>),
    Field { field: String, condition: Condition },
}

impl MetadataFilter {
    /// Parse a filter from its JSON text.
    pub fn from_json_str(text: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AppError::Catalog(format!("Invalid filter JSON: {}", e)))?;
        Self::parse(&value)
    }

    /// Parse a filter from a JSON value.
    pub fn parse(value: &Value) -> AppResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            AppError::Catalog(format!("Filter must be a JSON object, got: {}", value))
        })?;

        let mut clauses = Vec::with_capacity(object.len());
        for (key, inner) in object {
            let clause = match key.as_str() {
                "$and" => MetadataFilter::And(parse_list(key, inner)?),
                "$or" => MetadataFilter::Or(parse_list(key, inner)?),
                op if op.starts_with('$') => {
                    return Err(AppError::Catalog(format!(
                        "Unsupported filter operator at top level: {}",
                        op
                    )))
                }
                field => parse_field(field, inner)?,
            };
            clauses.push(clause);
        }

        match clauses.len() {
            0 => Ok(MetadataFilter::And(Vec::new())),
            1 => Ok(clauses.remove(0)),
            _ => Ok(MetadataFilter::And(clauses)),
        }
    }

    /// Check the filter against a course's metadata.
    ///
    /// A missing field never equals anything, so `$ne` and `$nin` match it.
    pub fn matches(&self, metadata: &BTreeMap<String, String>) -> bool {
        match self {
            MetadataFilter::And(clauses) => clauses.iter().all(|c| c.matches(metadata)),
            MetadataFilter::Or(clauses) => clauses.iter().any(|c| c.matches(metadata)),
            MetadataFilter::Field { field, condition } => {
                let actual = metadata.get(field);
                match condition {
                    Condition::Eq(expected) => actual == Some(expected),
                    Condition::Ne(expected) => actual != Some(expected),
                    Condition::In(options) => actual.is_some_and(|a| options.contains(a)),
                    Condition::Nin(options) => !actual.is_some_and(|a| options.contains(a)),
                }
            }
        }
    }

    /// JSON form of the filter.
    pub fn to_value(&self) -> Value {
        match self {
            MetadataFilter::And(clauses) => {
                serde_json::json!({ "$and": clauses.iter().map(|c| c.to_value()).collect::<Vec<_>>() })
            }
            MetadataFilter::Or(clauses) => {
                serde_json::json!({ "$or": clauses.iter().map(|c| c.to_value()).collect::<Vec<_>>() })
            }
            MetadataFilter::Field { field, condition } => {
                let (op, operand) = match condition {
                    Condition::Eq(v) => ("$eq", Value::from(v.clone())),
                    Condition::Ne(v) => ("$ne", Value::from(v.clone())),
                    Condition::In(vs) => ("$in", Value::from(vs.clone())),
                    Condition::Nin(vs) => ("$nin", Value::from(vs.clone())),
                };
                let mut inner = serde_json::Map::new();
                inner.insert(op.to_string(), operand);
                let mut outer = serde_json::Map::new();
                outer.insert(field.clone(), Value::Object(inner));
                Value::Object(outer)
            }
        }
    }
}

impl TryFrom<Value> for MetadataFilter {
    type Error = AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        MetadataFilter::parse(&value)
    }
}

impl From<MetadataFilter> for Value {
    fn from(filter: MetadataFilter) -> Self {
        filter.to_value()
    }
}

fn parse_list(op: &str, value: &Value) -> AppResult<Vec<MetadataFilter>> {
    let items = value
        .as_array()
        .ok_or_else(|| AppError::Catalog(format!("{} expects an array of filters", op)))?;
    items.iter().map(MetadataFilter::parse).collect()
}

fn parse_field(field: &str, value: &Value) -> AppResult<MetadataFilter> {
    let condition = match value {
        Value::Object(ops) => {
            if ops.len() != 1 {
                return Err(AppError::Catalog(format!(
                    "Filter on '{}' must have exactly one operator",
                    field
                )));
            }
            let (op, operand) = ops
                .iter()
                .next()
                .ok_or_else(|| AppError::Catalog(format!("Empty condition on '{}'", field)))?;
            match op.as_str() {
                "$eq" => Condition::Eq(scalar(field, operand)?),
                "$ne" => Condition::Ne(scalar(field, operand)?),
                "$in" => Condition::In(scalar_list(field, operand)?),
                "$nin" => Condition::Nin(scalar_list(field, operand)?),
                other => {
                    return Err(AppError::Catalog(format!(
                        "Unsupported filter operator '{}' on '{}'",
                        other, field
                    )))
                }
            }
        }
        other => Condition::Eq(scalar(field, other)?),
    };

    Ok(MetadataFilter::Field {
        field: field.to_string(),
        condition,
    })
}

fn scalar(field: &str, value: &Value) -> AppResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(AppError::Catalog(format!(
            "Filter value for '{}' must be a string, number or boolean, got: {}",
            field, other
        ))),
    }
}

fn scalar_list(field: &str, value: &Value) -> AppResult<Vec<String>> {
    value
        .as_array()
        .ok_or_else(|| AppError::Catalog(format!("$in/$nin on '{}' expects an array", field)))?
        .iter()
        .map(|v| scalar(field, v))
        .collect()
}
