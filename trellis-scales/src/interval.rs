//! Intervals snap values to regular steps. Temporal values are handled as epoch
//! milliseconds and stepped with UTC calendar arithmetic.

use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use strum::{Display, EnumString};
use trellis_common::RawValue;

use crate::array;
use crate::error::TrellisScaleError;

const MS_SECOND: f64 = 1000.0;
const MS_MINUTE: f64 = 60.0 * MS_SECOND;
const MS_HOUR: f64 = 60.0 * MS_MINUTE;
const MS_DAY: f64 = 24.0 * MS_HOUR;
const MS_WEEK: f64 = 7.0 * MS_DAY;
const MS_MONTH: f64 = 30.0 * MS_DAY;
const MS_YEAR: f64 = 365.0 * MS_DAY;

/// User-defined interval
pub trait IntervalImpl: Debug + Send + Sync + 'static {
    /// Largest interval boundary less than or equal to `value`
    fn floor(&self, value: f64) -> f64;

    /// `value` moved by `steps` intervals
    fn offset(&self, value: f64, steps: i64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeUnit {
    /// Nominal duration in milliseconds
    pub fn duration(&self) -> f64 {
        match self {
            TimeUnit::Millisecond => 1.0,
            TimeUnit::Second => MS_SECOND,
            TimeUnit::Minute => MS_MINUTE,
            TimeUnit::Hour => MS_HOUR,
            TimeUnit::Day => MS_DAY,
            TimeUnit::Week => MS_WEEK,
            TimeUnit::Month => MS_MONTH,
            TimeUnit::Quarter => 3.0 * MS_MONTH,
            TimeUnit::Year => MS_YEAR,
        }
    }

    fn months(&self) -> Option<u32> {
        match self {
            TimeUnit::Month => Some(1),
            TimeUnit::Quarter => Some(3),
            TimeUnit::Year => Some(12),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "IntervalSpec")]
pub enum Interval {
    /// Numeric step
    Step(f64),
    /// Calendar step in UTC
    Time { unit: TimeUnit, step: u32 },
    Custom(Arc<dyn IntervalImpl>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntervalSpec {
    Number(f64),
    String(String),
}

impl TryFrom<IntervalSpec> for Interval {
    type Error = TrellisScaleError;

    fn try_from(value: IntervalSpec) -> Result<Self, Self::Error> {
        match value {
            IntervalSpec::Number(step) => Interval::step(step),
            IntervalSpec::String(s) => Interval::parse(&s),
        }
    }
}

impl FromStr for Interval {
    type Err = TrellisScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::parse(s)
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Interval::Step(a), Interval::Step(b)) => a == b,
            (
                Interval::Time { unit: u1, step: s1 },
                Interval::Time { unit: u2, step: s2 },
            ) => u1 == u2 && s1 == s2,
            (Interval::Custom(a), Interval::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Interval {
    pub fn step(step: f64) -> Result<Self, TrellisScaleError> {
        if step > 0.0 && step.is_finite() {
            Ok(Interval::Step(step))
        } else {
            Err(TrellisScaleError::InvalidInterval(format!(
                "step must be a positive number, got {step}"
            )))
        }
    }

    pub fn time(unit: TimeUnit, step: u32) -> Self {
        Interval::Time {
            unit,
            step: step.max(1),
        }
    }

    pub fn custom(interval: impl IntervalImpl) -> Self {
        Interval::Custom(Arc::new(interval))
    }

    /// Parse a numeric step (`"5"`), a calendar unit (`"day"`, `"weeks"`), or a
    /// multiple of one (`"3 months"`).
    pub fn parse(spec: &str) -> Result<Self, TrellisScaleError> {
        let spec = spec.trim();
        if let Ok(step) = spec.parse::<f64>() {
            return Interval::step(step);
        }

        let invalid = || TrellisScaleError::InvalidInterval(spec.to_string());
        let mut parts = spec.split_whitespace();
        let (count, unit) = match (parts.next(), parts.next(), parts.next()) {
            (Some(unit), None, None) => (1, unit),
            (Some(count), Some(unit), None) => {
                (count.parse::<u32>().map_err(|_| invalid())?, unit)
            }
            _ => return Err(invalid()),
        };
        if count == 0 {
            return Err(invalid());
        }

        let unit = TimeUnit::from_str(unit)
            .or_else(|_| TimeUnit::from_str(unit.strip_suffix('s').unwrap_or(unit)))
            .map_err(|_| invalid())?;
        Ok(Interval::time(unit, count))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Interval::Time { .. })
    }

    pub fn floor(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        match self {
            Interval::Step(step) => match inverse_step(*step) {
                Some(inv) => (value * inv).floor() / inv,
                None => (value / step).floor() * step,
            },
            Interval::Time { unit, step } => floor_time(value, *unit, *step).unwrap_or(f64::NAN),
            Interval::Custom(interval) => interval.floor(value),
        }
    }

    pub fn offset(&self, value: f64, steps: i64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        match self {
            Interval::Step(step) => match inverse_step(*step) {
                Some(inv) => (value * inv + steps as f64) / inv,
                None => value + steps as f64 * step,
            },
            Interval::Time { unit, step } => {
                offset_time(value, *unit, *step, steps).unwrap_or(f64::NAN)
            }
            Interval::Custom(interval) => interval.offset(value, steps),
        }
    }

    /// Smallest interval boundary greater than or equal to `value`
    pub fn ceil(&self, value: f64) -> f64 {
        let floored = self.floor(value);
        if floored < value {
            self.offset(floored, 1)
        } else {
            floored
        }
    }

    /// Every interval boundary in `[ceil(lo), hi)`
    pub fn range(&self, lo: f64, hi: f64) -> Vec<f64> {
        let mut values = Vec::new();
        if !(lo.is_finite() && hi.is_finite()) {
            return values;
        }
        let mut v = self.ceil(lo);
        while v < hi {
            values.push(v);
            let next = self.offset(v, 1);
            if !(next > v) {
                break;
            }
            v = next;
        }
        values
    }

    /// Floor a value, keeping dates as dates
    pub fn floor_value(&self, value: &RawValue) -> RawValue {
        match value.as_number() {
            Some(v) => value.with_number(self.floor(v)),
            None => value.clone(),
        }
    }
}

/// Reciprocal of a fractional step, when it is a whole number. Working with the
/// reciprocal keeps steps like 0.1 exact.
fn inverse_step(step: f64) -> Option<f64> {
    if step < 1.0 {
        let inv = 1.0 / step;
        if (inv - inv.round()).abs() < 1e-9 {
            return Some(inv.round());
        }
    }
    None
}

fn to_datetime(ms: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms.round() as i64).single()
}

fn date_millis(date: NaiveDate) -> Option<f64> {
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis() as f64)
}

fn floor_time(ms: f64, unit: TimeUnit, step: u32) -> Option<f64> {
    let step_i = step as i64;
    match unit {
        TimeUnit::Millisecond
        | TimeUnit::Second
        | TimeUnit::Minute
        | TimeUnit::Hour
        | TimeUnit::Day => {
            let size = unit.duration() * step as f64;
            Some((ms / size).floor() * size)
        }
        TimeUnit::Week => {
            // 1970-01-01 was a Thursday; weeks start on Sunday
            let day = (ms / MS_DAY).floor() as i64;
            let sunday = day - (day + 4).rem_euclid(7);
            let week = (sunday + 4).div_euclid(7);
            let week = week.div_euclid(step_i) * step_i;
            Some((week * 7 - 4) as f64 * MS_DAY)
        }
        TimeUnit::Month | TimeUnit::Quarter | TimeUnit::Year => {
            let date = to_datetime(ms)?;
            let months = unit.months()? as i64 * step_i;
            let total = date.year() as i64 * 12 + date.month0() as i64;
            let total = total.div_euclid(months) * months;
            let year = total.div_euclid(12) as i32;
            let month = total.rem_euclid(12) as u32 + 1;
            date_millis(NaiveDate::from_ymd_opt(year, month, 1)?)
        }
    }
}

fn offset_time(ms: f64, unit: TimeUnit, step: u32, steps: i64) -> Option<f64> {
    match unit.months() {
        None => Some(ms + unit.duration() * step as f64 * steps as f64),
        Some(months) => {
            let date = to_datetime(ms)?;
            let delta = months as i64 * step as i64 * steps;
            let shifted = if delta >= 0 {
                date.checked_add_months(Months::new(u32::try_from(delta).ok()?))?
            } else {
                date.checked_sub_months(Months::new(u32::try_from(-delta).ok()?))?
            };
            Some(shifted.timestamp_millis() as f64)
        }
    }
}

lazy_static::lazy_static! {
    static ref TICK_INTERVALS: Vec<(TimeUnit, u32, f64)> = [
        (TimeUnit::Second, 1),
        (TimeUnit::Second, 5),
        (TimeUnit::Second, 15),
        (TimeUnit::Second, 30),
        (TimeUnit::Minute, 1),
        (TimeUnit::Minute, 5),
        (TimeUnit::Minute, 15),
        (TimeUnit::Minute, 30),
        (TimeUnit::Hour, 1),
        (TimeUnit::Hour, 3),
        (TimeUnit::Hour, 6),
        (TimeUnit::Hour, 12),
        (TimeUnit::Day, 1),
        (TimeUnit::Day, 2),
        (TimeUnit::Week, 1),
        (TimeUnit::Month, 1),
        (TimeUnit::Month, 3),
        (TimeUnit::Year, 1),
    ]
    .into_iter()
    .map(|(unit, step)| (unit, step, unit.duration() * step as f64))
    .collect();
}

/// The calendar interval whose duration best matches `count` ticks over
/// `[start, stop]` (epoch milliseconds). `None` means sub-second ticks, which are
/// plain numeric ticks.
pub fn tick_interval(start: f64, stop: f64, count: f64) -> Option<Interval> {
    let target = (stop - start).abs() / count;
    let i = TICK_INTERVALS.partition_point(|(_, _, duration)| *duration < target);
    if i == TICK_INTERVALS.len() {
        let step = array::tick_step(start / MS_YEAR, stop / MS_YEAR, count)
            .abs()
            .max(1.0);
        return Some(Interval::time(TimeUnit::Year, step as u32));
    }
    if i == 0 {
        return None;
    }
    let (lo_unit, lo_step, lo_duration) = TICK_INTERVALS[i - 1];
    let (hi_unit, hi_step, hi_duration) = TICK_INTERVALS[i];
    if target / lo_duration < hi_duration / target {
        Some(Interval::time(lo_unit, lo_step))
    } else {
        Some(Interval::time(hi_unit, hi_step))
    }
}

/// Calendar-aligned ticks over `[start, stop]` in epoch milliseconds
pub fn time_ticks(start: f64, stop: f64, count: f64) -> Vec<f64> {
    let (lo, hi) = if start <= stop {
        (start, stop)
    } else {
        (stop, start)
    };
    let ticks = match tick_interval(lo, hi, count) {
        Some(interval) => interval.range(lo, hi + 1.0),
        None => array::ticks(lo, hi, count),
    };
    if start <= stop {
        ticks
    } else {
        ticks.into_iter().rev().collect()
    }
}

/// Extend `[start, stop]` outward to calendar boundaries
pub fn time_nice(start: f64, stop: f64, count: f64) -> (f64, f64) {
    let (lo, hi) = if start <= stop {
        (start, stop)
    } else {
        (stop, start)
    };
    let (lo, hi) = match tick_interval(lo, hi, count) {
        Some(interval) => (interval.floor(lo), interval.ceil(hi)),
        None => array::nice(lo, hi, count),
    };
    if start <= stop {
        (lo, hi)
    } else {
        (hi, lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn ms(y: i32, m: u32, d: u32) -> f64 {
        date_millis(NaiveDate::from_ymd_opt(y, m, d).unwrap()).unwrap()
    }

    #[rstest]
    #[case("day", Interval::time(TimeUnit::Day, 1))]
    #[case("3 months", Interval::time(TimeUnit::Month, 3))]
    #[case("weeks", Interval::time(TimeUnit::Week, 1))]
    #[case("2 Hours", Interval::time(TimeUnit::Hour, 2))]
    #[case("0.5", Interval::Step(0.5))]
    fn test_parse(#[case] spec: &str, #[case] expected: Interval) {
        assert_eq!(Interval::parse(spec).unwrap(), expected);
    }

    #[rstest]
    #[case("fortnight")]
    #[case("-2")]
    #[case("0 days")]
    #[case("1 2 days")]
    fn test_parse_invalid(#[case] spec: &str) {
        assert!(matches!(
            Interval::parse(spec),
            Err(TrellisScaleError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_numeric_floor_and_range() {
        let interval = Interval::Step(0.1);
        assert_approx_eq!(f64, interval.floor(0.37), 0.3);
        assert_eq!(Interval::Step(5.0).floor(-3.0), -5.0);
        assert_eq!(Interval::Step(5.0).ceil(3.0), 5.0);
        assert_eq!(Interval::Step(5.0).range(1.0, 16.0), vec![5.0, 10.0, 15.0]);
    }

    #[test]
    fn test_calendar_floor() {
        let t = ms(2021, 5, 19) + 5.0 * MS_HOUR;
        assert_eq!(Interval::time(TimeUnit::Day, 1).floor(t), ms(2021, 5, 19));
        assert_eq!(Interval::time(TimeUnit::Month, 1).floor(t), ms(2021, 5, 1));
        assert_eq!(Interval::time(TimeUnit::Quarter, 1).floor(t), ms(2021, 4, 1));
        assert_eq!(Interval::time(TimeUnit::Year, 1).floor(t), ms(2021, 1, 1));
        // 2021-05-19 is a Wednesday
        assert_eq!(Interval::time(TimeUnit::Week, 1).floor(t), ms(2021, 5, 16));
    }

    #[test]
    fn test_calendar_range() {
        let months = Interval::time(TimeUnit::Month, 1).range(ms(2020, 1, 15), ms(2020, 4, 1));
        assert_eq!(months, vec![ms(2020, 2, 1), ms(2020, 3, 1)]);
        let quarters = Interval::parse("3 months")
            .unwrap()
            .range(ms(2020, 1, 1), ms(2021, 1, 1));
        assert_eq!(quarters.len(), 4);
    }

    #[test]
    fn test_floor_value_keeps_dates() {
        let date = RawValue::date_from_millis(ms(2020, 6, 10) as i64 + 1234);
        let floored = Interval::time(TimeUnit::Month, 1).floor_value(&date);
        assert_eq!(floored, RawValue::date_from_millis(ms(2020, 6, 1) as i64));
    }

    #[test]
    fn test_time_ticks() {
        let ticks = time_ticks(ms(2020, 1, 1), ms(2020, 12, 31), 4.0);
        assert_eq!(
            ticks,
            vec![ms(2020, 1, 1), ms(2020, 4, 1), ms(2020, 7, 1), ms(2020, 10, 1)]
        );
        assert_eq!(
            time_nice(ms(2020, 1, 3), ms(2020, 12, 15), 4.0),
            (ms(2020, 1, 1), ms(2021, 1, 1))
        );
    }

    #[test]
    fn test_deserialize() {
        let interval: Interval = serde_json::from_str(r#""month""#).unwrap();
        assert_eq!(interval, Interval::time(TimeUnit::Month, 1));
        let interval: Interval = serde_json::from_str("10").unwrap();
        assert_eq!(interval, Interval::Step(10.0));
        assert!(serde_json::from_str::<Interval>(r#""eon""#).is_err());
    }
}
