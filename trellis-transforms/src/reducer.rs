//! Reducers collapse the values of a group of records into one derived value.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexSet;
use strum::{Display, EnumString};
use trellis_common::RawValue;
use trellis_scales::array;

use crate::error::TrellisTransformError;

pub type ReduceFn = Arc<dyn Fn(&[RawValue]) -> RawValue + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReducerName {
    Count,
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Mode,
    First,
    Last,
    Extent,
    Deviation,
    Variance,
    Distinct,
    Identity,
}

#[derive(Clone)]
pub enum Reducer {
    Named(ReducerName),
    /// Percentile in [0, 1], parsed from names like `p25`
    Percentile(f64),
    Custom(ReduceFn),
}

impl Reducer {
    pub fn count() -> Self {
        Reducer::Named(ReducerName::Count)
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[RawValue]) -> RawValue + Send + Sync + 'static,
    {
        Reducer::Custom(Arc::new(f))
    }

    /// Whether the reducer ignores the values it is handed
    pub fn is_count(&self) -> bool {
        matches!(self, Reducer::Named(ReducerName::Count))
    }

    pub fn reduce(&self, values: &[RawValue]) -> RawValue {
        match self {
            Reducer::Named(name) => reduce_named(*name, values),
            Reducer::Percentile(p) => {
                let numbers = finite(values);
                match array::quantile(&numbers, *p) {
                    Some(q) => like_first(values, q),
                    None => RawValue::Null,
                }
            }
            Reducer::Custom(f) => f(values),
        }
    }
}

fn finite(values: &[RawValue]) -> Vec<f64> {
    values.iter().filter_map(|v| v.as_finite()).collect()
}

/// Wrap `value` as a date when the inputs were dates
fn like_first(values: &[RawValue], value: f64) -> RawValue {
    match values.iter().find(|v| v.as_finite().is_some()) {
        Some(sample) => sample.with_number(value),
        None => RawValue::Number(value),
    }
}

fn number(value: Option<f64>) -> RawValue {
    value.map(RawValue::Number).unwrap_or_default()
}

fn reduce_named(name: ReducerName, values: &[RawValue]) -> RawValue {
    match name {
        ReducerName::Count => RawValue::Number(values.len() as f64),
        ReducerName::Sum => RawValue::Number(array::sum(&finite(values))),
        ReducerName::Mean => match array::mean(&finite(values)) {
            Some(mean) => like_first(values, mean),
            None => RawValue::Null,
        },
        ReducerName::Median => Reducer::Percentile(0.5).reduce(values),
        ReducerName::Min => values
            .iter()
            .filter(|v| v.as_finite().is_some())
            .min()
            .cloned()
            .unwrap_or_default(),
        ReducerName::Max => values
            .iter()
            .filter(|v| v.as_finite().is_some())
            .max()
            .cloned()
            .unwrap_or_default(),
        ReducerName::Mode => {
            let mut counts: indexmap::IndexMap<&RawValue, usize> = indexmap::IndexMap::new();
            for value in values.iter().filter(|v| !v.is_null()) {
                *counts.entry(value).or_default() += 1;
            }
            let mut best: Option<(&RawValue, usize)> = None;
            for (value, count) in counts {
                if best.map(|(_, c)| count > c).unwrap_or(true) {
                    best = Some((value, count));
                }
            }
            best.map(|(v, _)| v.clone()).unwrap_or_default()
        }
        ReducerName::First | ReducerName::Identity => values.first().cloned().unwrap_or_default(),
        ReducerName::Last => values.last().cloned().unwrap_or_default(),
        ReducerName::Extent => number(array::extent(finite(values)).map(|(lo, hi)| hi - lo)),
        ReducerName::Deviation => number(array::deviation(&finite(values))),
        ReducerName::Variance => number(array::variance(&finite(values))),
        ReducerName::Distinct => {
            let distinct: IndexSet<&RawValue> = values.iter().filter(|v| !v.is_null()).collect();
            RawValue::Number(distinct.len() as f64)
        }
    }
}

impl FromStr for Reducer {
    type Err = TrellisTransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Ok(name) = ReducerName::from_str(&lower) {
            return Ok(Reducer::Named(name));
        }
        if let Some(digits) = lower.strip_prefix('p') {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(p) = digits.parse::<u32>() {
                    if p <= 100 {
                        return Ok(Reducer::Percentile(p as f64 / 100.0));
                    }
                }
            }
        }
        Err(TrellisTransformError::UnknownReducer(s.to_string()))
    }
}

impl From<ReducerName> for Reducer {
    fn from(name: ReducerName) -> Self {
        Reducer::Named(name)
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Named(name) => write!(f, "Reducer({name})"),
            Reducer::Percentile(p) => write!(f, "Reducer(p{})", (p * 100.0).round()),
            Reducer::Custom(_) => write!(f, "Reducer(custom)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn values() -> Vec<RawValue> {
        vec![4.0.into(), 1.0.into(), RawValue::Null, 3.0.into(), 1.0.into()]
    }

    #[rstest]
    #[case("count", 5.0)]
    #[case("sum", 9.0)]
    #[case("mean", 2.25)]
    #[case("median", 2.0)]
    #[case("min", 1.0)]
    #[case("max", 4.0)]
    #[case("mode", 1.0)]
    #[case("first", 4.0)]
    #[case("extent", 3.0)]
    #[case("distinct", 3.0)]
    #[case("p0", 1.0)]
    #[case("p100", 4.0)]
    #[case("P50", 2.0)]
    fn test_named_reducers(#[case] name: &str, #[case] expected: f64) {
        let reducer: Reducer = name.parse().unwrap();
        let result = reducer.reduce(&values()).as_number().unwrap();
        assert_approx_eq!(f64, result, expected);
    }

    #[test]
    fn test_percentile_interpolates() {
        let reducer: Reducer = "p25".parse().unwrap();
        let values: Vec<RawValue> = (1..=5).map(|v| RawValue::from(v as f64)).collect();
        assert_approx_eq!(f64, reducer.reduce(&values).as_number().unwrap(), 2.0);
    }

    #[test]
    fn test_variance_and_deviation() {
        let values: Vec<RawValue> = vec![2.0.into(), 4.0.into(), 6.0.into()];
        let variance = Reducer::Named(ReducerName::Variance).reduce(&values);
        assert_approx_eq!(f64, variance.as_number().unwrap(), 4.0);
        let deviation = Reducer::Named(ReducerName::Deviation).reduce(&values);
        assert_approx_eq!(f64, deviation.as_number().unwrap(), 2.0);
        assert_eq!(
            Reducer::Named(ReducerName::Variance).reduce(&values[..1]),
            RawValue::Null
        );
    }

    #[test]
    fn test_mean_of_dates_is_a_date() {
        let values = vec![
            RawValue::date_from_millis(0),
            RawValue::date_from_millis(1000),
        ];
        let mean = Reducer::Named(ReducerName::Mean).reduce(&values);
        assert_eq!(mean, RawValue::date_from_millis(500));
    }

    #[test]
    fn test_unknown_reducers() {
        for name in ["average", "p101", "p", "p-5"] {
            assert!(matches!(
                name.parse::<Reducer>(),
                Err(TrellisTransformError::UnknownReducer(_))
            ));
        }
    }

    #[test]
    fn test_custom_reducer() {
        let reducer = Reducer::custom(|values| RawValue::from(values.len() as f64 * 10.0));
        assert_eq!(reducer.reduce(&values()), RawValue::from(50.0));
    }
}
