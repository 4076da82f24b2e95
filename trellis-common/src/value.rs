use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, TimeZone, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::key::InternalKey;

/// A single cell value.
///
/// `RawValue` is used both for input data and for the output of resolving a channel
/// against a record. Values are totally ordered so that ordinal domains can be sorted
/// deterministically: booleans sort before numbers, numbers before dates, dates before
/// strings, strings before symbols, and `Null` sorts last.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Date(DateTime<Utc>),
    String(String),
    #[serde(skip)]
    Symbol(InternalKey),
}

impl RawValue {
    /// Build a date value from epoch milliseconds
    pub fn date_from_millis(millis: i64) -> Self {
        match Utc.timestamp_millis_opt(millis).single() {
            Some(date) => RawValue::Date(date),
            None => RawValue::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, RawValue::Number(_))
    }

    pub fn is_date(&self) -> bool {
        matches!(self, RawValue::Date(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, RawValue::String(_))
    }

    /// Numeric view of the value. Dates coerce to epoch milliseconds.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(v) => Some(*v),
            RawValue::Date(d) => Some(d.timestamp_millis() as f64),
            _ => None,
        }
    }

    /// Like [`RawValue::as_number`], but rejects NaN and infinities
    pub fn as_finite(&self) -> Option<f64> {
        self.as_number().filter(|v| v.is_finite())
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            RawValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Truthiness used by the filter channel
    pub fn is_truthy(&self) -> bool {
        match self {
            RawValue::Null => false,
            RawValue::Bool(b) => *b,
            RawValue::Number(v) => *v != 0.0 && !v.is_nan(),
            RawValue::String(s) => !s.is_empty(),
            RawValue::Date(_) | RawValue::Symbol(_) => true,
        }
    }

    /// Rebuild a value of the same kind as `self` from a number. Used when numeric
    /// arithmetic (interval flooring, bin edges) must preserve temporal-ness.
    pub fn with_number(&self, value: f64) -> RawValue {
        match self {
            RawValue::Date(_) => RawValue::date_from_millis(value.round() as i64),
            _ => RawValue::Number(value),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            RawValue::Bool(_) => 0,
            RawValue::Number(_) => 1,
            RawValue::Date(_) => 2,
            RawValue::String(_) => 3,
            RawValue::Symbol(_) => 4,
            RawValue::Null => 5,
        }
    }
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RawValue {}

impl PartialOrd for RawValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RawValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RawValue::Bool(a), RawValue::Bool(b)) => a.cmp(b),
            (RawValue::Number(a), RawValue::Number(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            (RawValue::Date(a), RawValue::Date(b)) => a.cmp(b),
            (RawValue::String(a), RawValue::String(b)) => a.cmp(b),
            (RawValue::Symbol(a), RawValue::Symbol(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl Hash for RawValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_rank().hash(state);
        match self {
            RawValue::Null => {}
            RawValue::Bool(b) => b.hash(state),
            RawValue::Number(v) => OrderedFloat(*v).hash(state),
            RawValue::Date(d) => d.hash(state),
            RawValue::String(s) => s.hash(state),
            RawValue::Symbol(k) => k.hash(state),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "null"),
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Number(v) => write!(f, "{v}"),
            RawValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
            RawValue::String(s) => write!(f, "{s}"),
            RawValue::Symbol(k) => write!(f, "{k}"),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<f32> for RawValue {
    fn from(value: f32) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<usize> for RawValue {
    fn from(value: usize) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::String(value)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(value: DateTime<Utc>) -> Self {
        RawValue::Date(value)
    }
}

impl From<InternalKey> for RawValue {
    fn from(value: InternalKey) -> Self {
        RawValue::Symbol(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mixed_ordering() {
        let mut values = vec![
            RawValue::Null,
            RawValue::from("b"),
            RawValue::from(2.0),
            RawValue::from("a"),
            RawValue::from(true),
            RawValue::from(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                RawValue::from(true),
                RawValue::from(-1.0),
                RawValue::from(2.0),
                RawValue::from("a"),
                RawValue::from("b"),
                RawValue::Null,
            ]
        );
    }

    #[test]
    fn test_nan_is_hashable() {
        let mut set = HashSet::new();
        set.insert(RawValue::from(f64::NAN));
        set.insert(RawValue::from(f64::NAN));
        set.insert(RawValue::from(0.0));
        set.insert(RawValue::from(-0.0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_date_coerces_to_millis() {
        let date = RawValue::date_from_millis(86_400_000);
        assert_eq!(date.as_number(), Some(86_400_000.0));
        assert_eq!(date.with_number(0.0), RawValue::date_from_millis(0));
        assert_eq!(RawValue::from("1").as_number(), None);
    }

    #[test]
    fn test_deserialize_untagged() {
        let values: Vec<RawValue> =
            serde_json::from_str(r#"[null, true, 1.5, "2020-01-01T00:00:00Z", "abc"]"#).unwrap();
        assert!(values[0].is_null());
        assert_eq!(values[1], RawValue::Bool(true));
        assert_eq!(values[2], RawValue::Number(1.5));
        assert!(values[3].is_date());
        assert_eq!(values[4], RawValue::from("abc"));
    }
}
