use std::collections::HashMap;

use trellis_common::RawValue;

use super::ScalePrimitive;
use crate::error::TrellisScaleError;
use crate::options::ScaleType;

/// Band scale that maps discrete domain values to evenly spaced bands.
///
/// A point scale is a band scale with `padding_inner` fixed at 1, so every band
/// collapses to a point and the bandwidth is zero.
///
/// # Options
///
/// - **align** (default 0.5): how leftover space is distributed; 0 aligns bands to
///   the start of the range, 1 to the end.
/// - **padding_inner**: space between bands as a fraction of the step.
/// - **padding_outer**: space before the first and after the last band, in steps.
#[derive(Debug, Clone)]
pub struct BandScale {
    point: bool,
    domain: Vec<RawValue>,
    index: HashMap<RawValue, usize>,
    range: (f64, f64),
    positions: Vec<f64>,
    step: f64,
    bandwidth: f64,
}

impl BandScale {
    pub fn band(
        domain: Vec<RawValue>,
        range: (f64, f64),
        padding_inner: f64,
        padding_outer: f64,
        align: f64,
    ) -> Result<Self, TrellisScaleError> {
        Self::build(false, domain, range, padding_inner, padding_outer, align)
    }

    pub fn point(
        domain: Vec<RawValue>,
        range: (f64, f64),
        padding: f64,
        align: f64,
    ) -> Result<Self, TrellisScaleError> {
        Self::build(true, domain, range, 1.0, padding, align)
    }

    fn build(
        point: bool,
        domain: Vec<RawValue>,
        range: (f64, f64),
        padding_inner: f64,
        padding_outer: f64,
        align: f64,
    ) -> Result<Self, TrellisScaleError> {
        if !(0.0..=1.0).contains(&align) {
            return Err(TrellisScaleError::InvalidScalePropertyValue(format!(
                "align is {align} but must be between 0 and 1"
            )));
        }
        if !(0.0..=1.0).contains(&padding_inner) {
            return Err(TrellisScaleError::InvalidScalePropertyValue(format!(
                "padding_inner is {padding_inner} but must be between 0 and 1"
            )));
        }
        if !(padding_outer >= 0.0) || !padding_outer.is_finite() {
            return Err(TrellisScaleError::InvalidScalePropertyValue(format!(
                "padding_outer is {padding_outer} but must be non-negative"
            )));
        }
        if !range.0.is_finite() || !range.1.is_finite() {
            return Err(TrellisScaleError::InvalidScalePropertyValue(format!(
                "range is ({}, {}) but both ends must be finite",
                range.0, range.1
            )));
        }

        let n = domain.len();
        let reverse = range.1 < range.0;
        let (start, stop) = if reverse {
            (range.1, range.0)
        } else {
            (range.0, range.1)
        };

        let space = n as f64 - padding_inner + padding_outer * 2.0;
        let step = (stop - start) / space.max(1.0);
        let start = start + (stop - start - step * (n as f64 - padding_inner)) * align;
        let bandwidth = step * (1.0 - padding_inner);

        let mut positions: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
        if reverse {
            positions.reverse();
        }

        let mut index = HashMap::with_capacity(n);
        for (i, value) in domain.iter().enumerate() {
            index.entry(value.clone()).or_insert(i);
        }

        Ok(Self {
            point,
            domain,
            index,
            range,
            positions,
            step,
            bandwidth,
        })
    }

    pub fn position(&self, value: &RawValue) -> Option<f64> {
        self.index.get(value).map(|i| self.positions[*i])
    }
}

impl ScalePrimitive for BandScale {
    fn scale_type(&self) -> ScaleType {
        if self.point {
            ScaleType::Point
        } else {
            ScaleType::Band
        }
    }

    fn apply(&self, value: &RawValue) -> RawValue {
        self.position(value)
            .map(RawValue::Number)
            .unwrap_or(RawValue::Null)
    }

    fn domain(&self) -> Vec<RawValue> {
        self.domain.clone()
    }

    fn range(&self) -> Vec<RawValue> {
        vec![RawValue::Number(self.range.0), RawValue::Number(self.range.1)]
    }

    fn ticks(&self, _count: f64) -> Vec<RawValue> {
        self.domain.clone()
    }

    /// The domain value whose band (or nearest point) contains `value`
    fn invert(&self, value: f64) -> Option<RawValue> {
        if !value.is_finite() || self.positions.is_empty() {
            return None;
        }
        let center = self.bandwidth / 2.0;
        self.positions
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (*a + center - value).abs();
                let db = (*b + center - value).abs();
                da.total_cmp(&db)
            })
            .map(|(i, _)| self.domain[i].clone())
    }

    fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    fn step(&self) -> f64 {
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn abc() -> Vec<RawValue> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn test_band_no_padding() -> Result<(), TrellisScaleError> {
        let scale = BandScale::band(abc(), (0.0, 120.0), 0.0, 0.0, 0.5)?;
        assert_eq!(scale.apply(&"a".into()), RawValue::from(0.0));
        assert_eq!(scale.apply(&"c".into()), RawValue::from(80.0));
        assert_eq!(scale.bandwidth(), 40.0);
        assert_eq!(scale.apply(&"z".into()), RawValue::Null);
        Ok(())
    }

    #[test]
    fn test_band_padding() -> Result<(), TrellisScaleError> {
        let scale = BandScale::band(abc(), (0.0, 100.0), 0.1, 0.1, 0.5)?;
        // step = 100 / (3 - 0.1 + 0.2)
        let step = 100.0 / 3.1;
        assert_approx_eq!(f64, scale.step(), step, epsilon = 1e-9);
        assert_approx_eq!(f64, scale.bandwidth(), step * 0.9, epsilon = 1e-9);
        assert_approx_eq!(
            f64,
            scale.position(&"a".into()).unwrap(),
            step * 0.1,
            epsilon = 1e-9
        );
        Ok(())
    }

    #[test]
    fn test_reversed_range() -> Result<(), TrellisScaleError> {
        let scale = BandScale::band(abc(), (120.0, 0.0), 0.0, 0.0, 0.5)?;
        assert_eq!(scale.apply(&"a".into()), RawValue::from(80.0));
        assert_eq!(scale.apply(&"c".into()), RawValue::from(0.0));
        assert_eq!(scale.invert(10.0), Some(RawValue::from("c")));
        Ok(())
    }

    #[test]
    fn test_point() -> Result<(), TrellisScaleError> {
        let scale = BandScale::point(abc(), (0.0, 100.0), 0.5, 0.5)?;
        assert_eq!(scale.bandwidth(), 0.0);
        assert_approx_eq!(f64, scale.step(), 100.0 / 3.0, epsilon = 1e-9);
        let a = scale.position(&"a".into()).unwrap();
        let c = scale.position(&"c".into()).unwrap();
        assert_approx_eq!(f64, a, 100.0 / 6.0, epsilon = 1e-9);
        assert_approx_eq!(f64, c, 500.0 / 6.0, epsilon = 1e-9);

        let single = BandScale::point(vec!["only".into()], (0.0, 100.0), 0.5, 0.5)?;
        assert_eq!(single.apply(&"only".into()), RawValue::from(50.0));
        Ok(())
    }

    #[test]
    fn test_invalid_options() {
        assert!(BandScale::band(abc(), (0.0, 1.0), 1.5, 0.0, 0.5).is_err());
        assert!(BandScale::band(abc(), (0.0, 1.0), 0.0, -1.0, 0.5).is_err());
        assert!(BandScale::band(abc(), (0.0, 1.0), 0.0, 0.0, 2.0).is_err());
    }
}
