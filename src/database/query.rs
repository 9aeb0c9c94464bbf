//! Query descriptions
//!
//! Filters, ordering and result sets for table scans. Literals in a filter
//! are converted to the column type once, before the scan starts.

use std::cmp::Ordering;

use crate::error::{CairnError, Result};
use crate::model::{Entity, Row};
use crate::value::Value;

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Comparison {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::NotEq => ordering != Ordering::Equal,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::LtEq => ordering != Ordering::Greater,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::GtEq => ordering != Ordering::Less,
        }
    }
}

/// Row predicate
///
/// A comparison involving Null never matches; use `IsNull`/`IsNotNull`.
#[derive(Debug, Clone)]
pub enum Filter {
    Compare {
        field: String,
        op: Comparison,
        value: Value,
    },
    IsNull(String),
    IsNotNull(String),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn compare(field: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        Filter::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, Comparison::Eq, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, Comparison::Lt, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, Comparison::Gt, value)
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Filter::IsNull(field.into())
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Filter::IsNotNull(field.into())
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Check field names against the Entity and convert every literal to
    /// its column type
    pub(crate) fn resolve(&self, entity: &Entity) -> Result<Filter> {
        Ok(match self {
            Filter::Compare { field, op, value } => {
                let attribute = entity.require_attribute(field)?;
                if value.is_null() {
                    return Err(CairnError::InvalidArguments(format!(
                        "cannot compare '{}' with NULL; use IS NULL",
                        field
                    )));
                }
                let value =
                    value
                        .convert(attribute.data_type())
                        .map_err(|_| CairnError::TypeMismatch {
                            attribute: field.clone(),
                            expected: attribute.data_type(),
                            value: value.to_string(),
                        })?;
                Filter::Compare {
                    field: field.clone(),
                    op: *op,
                    value,
                }
            }
            Filter::IsNull(field) => {
                entity.require_attribute(field)?;
                Filter::IsNull(field.clone())
            }
            Filter::IsNotNull(field) => {
                entity.require_attribute(field)?;
                Filter::IsNotNull(field.clone())
            }
            Filter::And(a, b) => Filter::And(Box::new(a.resolve(entity)?), Box::new(b.resolve(entity)?)),
            Filter::Or(a, b) => Filter::Or(Box::new(a.resolve(entity)?), Box::new(b.resolve(entity)?)),
            Filter::Not(inner) => Filter::Not(Box::new(inner.resolve(entity)?)),
        })
    }

    /// Evaluate against a row
    pub fn matches(&self, row: &Row) -> Result<bool> {
        match self {
            Filter::Compare { field, op, value } => {
                let stored = row.get(field).unwrap_or(&Value::Null);
                Ok(stored.compare(value)?.is_some_and(|ordering| op.holds(ordering)))
            }
            Filter::IsNull(field) => Ok(row.get(field).map_or(true, Value::is_null)),
            Filter::IsNotNull(field) => Ok(row.get(field).is_some_and(|v| !v.is_null())),
            Filter::And(a, b) => Ok(a.matches(row)? && b.matches(row)?),
            Filter::Or(a, b) => Ok(a.matches(row)? || b.matches(row)?),
            Filter::Not(inner) => Ok(!inner.matches(row)?),
        }
    }
}

/// One ordering key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Compare two rows by a list of ordering keys; Null sorts first
pub(crate) fn compare_rows(a: &Row, b: &Row, order_by: &[OrderBy]) -> Ordering {
    for key in order_by {
        let left = a.get(&key.field).unwrap_or(&Value::Null);
        let right = b.get(&key.field).unwrap_or(&Value::Null);

        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => left.compare(right).ok().flatten().unwrap_or(Ordering::Equal),
        };
        let ordering = if key.descending { ordering.reverse() } else { ordering };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// A table scan request
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    /// `None` selects every attribute in declaration order
    pub fields: Option<Vec<String>>,
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    /// Every field of every row
    pub fn all() -> Self {
        Self::default()
    }

    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, key: OrderBy) -> Self {
        self.order_by.push(key);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Rows produced by a table scan, plus the resolved field list
#[derive(Debug, Clone, Default)]
pub struct RowCollection {
    pub fields: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowCollection {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows restricted to `fields`, in field order
    pub fn projected(&self) -> Vec<Vec<Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.fields
                    .iter()
                    .map(|field| row.get(field).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }

    /// Values of one field across all rows
    pub fn column(&self, field: &str) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(field).cloned().unwrap_or(Value::Null))
            .collect()
    }
}
