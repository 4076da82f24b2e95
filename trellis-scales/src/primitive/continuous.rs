use trellis_common::RawValue;

use super::{piecewise, ScalePrimitive};
use crate::array;
use crate::error::TrellisScaleError;
use crate::interval::time_ticks;
use crate::options::{ScaleOptions, ScaleType};

/// Transform applied to domain values before linear interpolation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContinuousTransform {
    Identity,
    Pow(f64),
    /// Logarithm; `negative` domains are mirrored so that they map monotonically
    Log { base: f64, negative: bool },
    Symlog(f64),
}

impl ContinuousTransform {
    /// The transform behind a continuous scale type. `negative` says the domain
    /// lies below zero, which matters for log scales.
    pub fn for_scale(scale_type: ScaleType, options: &ScaleOptions, negative: bool) -> Self {
        match scale_type {
            ScaleType::Pow | ScaleType::DivergingPow => {
                ContinuousTransform::Pow(options.exponent.unwrap_or(1.0))
            }
            ScaleType::Sqrt | ScaleType::DivergingSqrt => ContinuousTransform::Pow(0.5),
            ScaleType::Log | ScaleType::DivergingLog => ContinuousTransform::Log {
                base: options.base.unwrap_or(10.0),
                negative,
            },
            ScaleType::Symlog | ScaleType::DivergingSymlog => {
                ContinuousTransform::Symlog(options.constant.unwrap_or(1.0))
            }
            _ => ContinuousTransform::Identity,
        }
    }

    pub fn forward(&self, x: f64) -> f64 {
        match *self {
            ContinuousTransform::Identity => x,
            ContinuousTransform::Pow(exponent) => x.signum() * x.abs().powf(exponent),
            ContinuousTransform::Log { base, negative } => {
                if negative {
                    -(-x).ln() / base.ln()
                } else {
                    x.ln() / base.ln()
                }
            }
            ContinuousTransform::Symlog(constant) => x.signum() * (x.abs() / constant).ln_1p(),
        }
    }

    pub fn inverse(&self, y: f64) -> f64 {
        match *self {
            ContinuousTransform::Identity => y,
            ContinuousTransform::Pow(exponent) => y.signum() * y.abs().powf(1.0 / exponent),
            ContinuousTransform::Log { base, negative } => {
                if negative {
                    -base.powf(-y)
                } else {
                    base.powf(y)
                }
            }
            ContinuousTransform::Symlog(constant) => y.signum() * y.abs().exp_m1() * constant,
        }
    }
}

/// Linear, power, log, symlog and time scales over a (possibly piecewise) domain
#[derive(Debug, Clone)]
pub struct ContinuousScale {
    scale_type: ScaleType,
    transform: ContinuousTransform,
    domain: Vec<f64>,
    transformed: Vec<f64>,
    range: Vec<f64>,
    clamp: bool,
    temporal: bool,
}

impl ContinuousScale {
    pub fn try_new(
        scale_type: ScaleType,
        transform: ContinuousTransform,
        domain: Vec<f64>,
        range: Vec<f64>,
    ) -> Result<Self, TrellisScaleError> {
        if domain.is_empty() {
            return Err(TrellisScaleError::EmptyDomain);
        }
        if domain.len() != range.len() {
            return Err(TrellisScaleError::DomainRangeMismatch {
                domain_len: domain.len(),
                range_len: range.len(),
            });
        }
        let transformed = domain.iter().map(|d| transform.forward(*d)).collect();
        Ok(Self {
            scale_type,
            transform,
            domain,
            transformed,
            range,
            clamp: false,
            temporal: scale_type == ScaleType::Time,
        })
    }

    pub fn linear(domain: (f64, f64), range: (f64, f64)) -> Self {
        let transformed = vec![domain.0, domain.1];
        Self {
            scale_type: ScaleType::Linear,
            transform: ContinuousTransform::Identity,
            domain: transformed.clone(),
            transformed,
            range: vec![range.0, range.1],
            clamp: false,
            temporal: false,
        }
    }

    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }

    /// Domain values are epoch milliseconds and invert to dates
    pub fn with_temporal(mut self, temporal: bool) -> Self {
        self.temporal = temporal;
        self
    }

    pub fn transform(&self) -> ContinuousTransform {
        self.transform
    }

    /// Map a number through the scale
    pub fn scale_number(&self, x: f64) -> f64 {
        let mut t = self.transform.forward(x);
        if !t.is_finite() {
            return f64::NAN;
        }
        if self.clamp {
            let (lo, hi) = bounds(&self.transformed);
            t = t.clamp(lo, hi);
        }
        piecewise(&self.transformed, &self.range, t)
    }

    pub fn invert_number(&self, y: f64) -> f64 {
        let y = if self.clamp {
            let (lo, hi) = bounds(&self.range);
            y.clamp(lo, hi)
        } else {
            y
        };
        self.transform
            .inverse(piecewise(&self.range, &self.transformed, y))
    }

    fn wrap(&self, value: f64) -> RawValue {
        if self.temporal {
            RawValue::date_from_millis(value.round() as i64)
        } else {
            RawValue::Number(value)
        }
    }

    fn extent(&self) -> (f64, f64) {
        let first = self.domain[0];
        let last = self.domain[self.domain.len() - 1];
        (first, last)
    }

    fn log_ticks(&self, base: f64, count: f64) -> Vec<f64> {
        let (start, stop) = self.extent();
        let reverse = stop < start;
        let (u, v) = if reverse { (stop, start) } else { (start, stop) };
        let negative = u < 0.0;
        let (lo, hi) = if negative { (-v, -u) } else { (u, v) };
        if !(lo > 0.0) {
            return array::ticks(start, stop, count);
        }

        let i = (lo.ln() / base.ln()).floor();
        let j = (hi.ln() / base.ln()).ceil();
        let mut ticks = Vec::new();
        if base.fract() == 0.0 && j - i < count {
            let mut k = i;
            while k <= j {
                for m in 1..(base as i64) {
                    let t = base.powf(k) * m as f64;
                    if t >= lo && t <= hi {
                        ticks.push(t);
                    }
                }
                k += 1.0;
            }
            if ticks.len() as f64 * 2.0 < count {
                ticks = array::ticks(lo, hi, count);
            }
        } else {
            ticks = array::ticks(i, j, (j - i).min(count))
                .into_iter()
                .map(|k| base.powf(k))
                .collect();
        }

        if negative {
            ticks = ticks.into_iter().rev().map(|t| -t).collect();
        }
        if reverse {
            ticks.reverse();
        }
        ticks
    }
}

fn bounds(values: &[f64]) -> (f64, f64) {
    let first = values[0];
    let last = values[values.len() - 1];
    if first <= last {
        (first, last)
    } else {
        (last, first)
    }
}

impl ScalePrimitive for ContinuousScale {
    fn scale_type(&self) -> ScaleType {
        self.scale_type
    }

    fn apply(&self, value: &RawValue) -> RawValue {
        match value.as_finite() {
            Some(x) => {
                let y = self.scale_number(x);
                if y.is_nan() {
                    RawValue::Null
                } else {
                    RawValue::Number(y)
                }
            }
            None => RawValue::Null,
        }
    }

    fn domain(&self) -> Vec<RawValue> {
        self.domain.iter().map(|d| self.wrap(*d)).collect()
    }

    fn range(&self) -> Vec<RawValue> {
        self.range.iter().map(|r| RawValue::Number(*r)).collect()
    }

    fn ticks(&self, count: f64) -> Vec<RawValue> {
        let (start, stop) = self.extent();
        let ticks = match self.transform {
            _ if self.temporal => time_ticks(start, stop, count),
            ContinuousTransform::Log { base, .. } => self.log_ticks(base, count),
            _ => array::ticks(start, stop, count),
        };
        ticks.into_iter().map(|t| self.wrap(t)).collect()
    }

    fn invert(&self, value: f64) -> Option<RawValue> {
        let x = self.invert_number(value);
        x.is_finite().then(|| self.wrap(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_linear() {
        let scale = ContinuousScale::linear((0.0, 10.0), (0.0, 100.0));
        assert_eq!(scale.apply(&5.0.into()), RawValue::from(50.0));
        assert_eq!(scale.apply(&RawValue::from("a")), RawValue::Null);
        assert_eq!(scale.invert(25.0), Some(RawValue::from(2.5)));
        assert_eq!(scale.apply(&20.0.into()), RawValue::from(200.0));
        let clamped = scale.with_clamp(true);
        assert_eq!(clamped.apply(&20.0.into()), RawValue::from(100.0));
    }

    #[test]
    fn test_sqrt_and_log() -> Result<(), TrellisScaleError> {
        let sqrt = ContinuousScale::try_new(
            ScaleType::Sqrt,
            ContinuousTransform::Pow(0.5),
            vec![0.0, 100.0],
            vec![0.0, 10.0],
        )?;
        assert_approx_eq!(f64, sqrt.scale_number(25.0), 5.0);
        assert_approx_eq!(f64, sqrt.invert_number(5.0), 25.0);

        let log = ContinuousScale::try_new(
            ScaleType::Log,
            ContinuousTransform::Log {
                base: 10.0,
                negative: false,
            },
            vec![1.0, 1000.0],
            vec![0.0, 3.0],
        )?;
        assert_approx_eq!(f64, log.scale_number(100.0), 2.0, epsilon = 1e-12);
        assert_eq!(log.apply(&0.0.into()), RawValue::Null);
        let ticks: Vec<f64> = log
            .ticks(10.0)
            .iter()
            .filter_map(|t| t.as_number())
            .collect();
        // 1..9 for each of three decades, plus 1000
        assert_eq!(ticks.len(), 28);
        assert_eq!(ticks[0], 1.0);
        assert_eq!(ticks[9], 10.0);
        assert_eq!(ticks[27], 1000.0);
        Ok(())
    }

    #[test]
    fn test_symlog_is_symmetric() {
        let t = ContinuousTransform::Symlog(1.0);
        assert_approx_eq!(f64, t.forward(-5.0), -t.forward(5.0));
        assert_approx_eq!(f64, t.inverse(t.forward(3.0)), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_piecewise_domain() -> Result<(), TrellisScaleError> {
        let scale = ContinuousScale::try_new(
            ScaleType::Diverging,
            ContinuousTransform::Identity,
            vec![-10.0, 0.0, 30.0],
            vec![0.0, 0.5, 1.0],
        )?;
        assert_approx_eq!(f64, scale.scale_number(-5.0), 0.25);
        assert_approx_eq!(f64, scale.scale_number(15.0), 0.75);
        assert!(matches!(
            ContinuousScale::try_new(
                ScaleType::Linear,
                ContinuousTransform::Identity,
                vec![0.0, 1.0],
                vec![0.0],
            ),
            Err(TrellisScaleError::DomainRangeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_time_inverts_to_dates() -> Result<(), TrellisScaleError> {
        let scale = ContinuousScale::try_new(
            ScaleType::Time,
            ContinuousTransform::Identity,
            vec![0.0, 86_400_000.0],
            vec![0.0, 100.0],
        )?;
        assert_eq!(
            scale.apply(&RawValue::date_from_millis(43_200_000)),
            RawValue::from(50.0)
        );
        assert_eq!(
            scale.invert(50.0),
            Some(RawValue::date_from_millis(43_200_000))
        );
        assert!(scale.domain().iter().all(|d| d.is_date()));
        Ok(())
    }
}
