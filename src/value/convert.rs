//! Value conversion
//!
//! Explicit cross-type conversion rules:
//!
//! | from \ to | Int        | Float   | Bool      | Varchar |
//! |-----------|------------|---------|-----------|---------|
//! | Null      | 0          | 0.0     | false     | ""      |
//! | Int       | -          | widen   | != 0      | decimal |
//! | Float     | truncate   | -       | != 0.0    | decimal |
//! | Bool      | 0 / 1      | 0.0/1.0 | -         | text    |
//! | Varchar   | parse      | parse   | parse     | -       |
//!
//! Nothing converts *to* Null except Null itself.

use crate::error::{CairnError, Result};

use super::{DataType, Value};

impl Value {
    /// Produce a copy of this value converted to `target`.
    pub fn convert(&self, target: DataType) -> Result<Value> {
        if self.data_type() == target {
            return Ok(self.clone());
        }

        let converted = match (self, target) {
            (Value::Null, _) => Some(target.zero_value()),
            (_, DataType::Null) => None,

            (Value::Int(v), DataType::Float) => Some(Value::Float(*v as f32)),
            (Value::Int(v), DataType::Bool) => Some(Value::Bool(*v != 0)),
            (Value::Int(v), DataType::Varchar) => Some(Value::Varchar(v.to_string())),

            (Value::Float(v), DataType::Int) => float_to_int(*v).map(Value::Int),
            (Value::Float(v), DataType::Bool) => Some(Value::Bool(*v != 0.0)),
            (Value::Float(v), DataType::Varchar) => Some(Value::Varchar(v.to_string())),

            (Value::Bool(v), DataType::Int) => Some(Value::Int(i32::from(*v))),
            (Value::Bool(v), DataType::Float) => Some(Value::Float(if *v { 1.0 } else { 0.0 })),
            (Value::Bool(v), DataType::Varchar) => Some(Value::Varchar(v.to_string())),

            (Value::Varchar(s), DataType::Int) => s.trim().parse::<i32>().ok().map(Value::Int),
            (Value::Varchar(s), DataType::Float) => s.trim().parse::<f32>().ok().map(Value::Float),
            (Value::Varchar(s), DataType::Bool) => parse_bool(s).map(Value::Bool),

            // Same-type pairs returned early above
            _ => None,
        };

        converted.ok_or_else(|| CairnError::ConversionFailed {
            from: self.data_type(),
            to: target,
            value: self.to_string(),
        })
    }

    /// Convert this value in place.
    ///
    /// On failure the value is left exactly as it was.
    pub fn become_type(&mut self, target: DataType) -> Result<()> {
        *self = self.convert(target)?;
        Ok(())
    }

    /// Interpret user-typed text as a value of `target`.
    ///
    /// The literal `NULL` (any case) yields `Value::Null`.
    pub fn parse_literal(text: &str, target: DataType) -> Result<Value> {
        if text.trim().eq_ignore_ascii_case("null") {
            return Ok(Value::Null);
        }
        Value::Varchar(text.to_string()).convert(target)
    }
}

fn float_to_int(v: f32) -> Option<i32> {
    if !v.is_finite() {
        return None;
    }
    let truncated = v.trunc() as f64;
    if truncated < i32::MIN as f64 || truncated > i32::MAX as f64 {
        return None;
    }
    Some(truncated as i32)
}

/// "true"/"false" in any case, or any number (non-zero is true)
fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(n != 0);
    }
    s.parse::<f64>().ok().filter(|n| !n.is_nan()).map(|n| n != 0.0)
}
