use trellis_common::RawValue;

use super::ScalePrimitive;
use crate::array;
use crate::error::TrellisScaleError;
use crate::options::ScaleType;

/// Maps numbers to discrete outputs by comparing against sorted thresholds.
///
/// Shared by threshold, quantile and quantize scales, which differ only in how
/// the thresholds are derived. A value equal to a threshold falls in the upper
/// class.
#[derive(Debug, Clone)]
pub struct ThresholdScale {
    scale_type: ScaleType,
    domain: Vec<RawValue>,
    thresholds: Vec<f64>,
    range: Vec<RawValue>,
    unknown: RawValue,
}

impl ThresholdScale {
    /// `range` must have one more entry than `thresholds`
    pub fn threshold(thresholds: Vec<f64>, range: Vec<RawValue>) -> Result<Self, TrellisScaleError> {
        if range.len() != thresholds.len() + 1 {
            return Err(TrellisScaleError::DomainRangeMismatch {
                domain_len: thresholds.len(),
                range_len: range.len(),
            });
        }
        Ok(Self {
            scale_type: ScaleType::Threshold,
            domain: thresholds.iter().map(|t| RawValue::Number(*t)).collect(),
            thresholds,
            range,
            unknown: RawValue::Null,
        })
    }

    /// Quantile classes of `values`, one per range entry
    pub fn quantile(values: &[f64], range: Vec<RawValue>) -> Result<Self, TrellisScaleError> {
        let sorted = array::sorted_finite(values);
        if sorted.is_empty() {
            return Err(TrellisScaleError::EmptyDomain);
        }
        let n = range.len();
        let thresholds = (1..n)
            .filter_map(|i| array::quantile_sorted(&sorted, i as f64 / n as f64))
            .collect();
        Ok(Self {
            scale_type: ScaleType::Quantile,
            domain: sorted.into_iter().map(RawValue::Number).collect(),
            thresholds,
            range,
            unknown: RawValue::Null,
        })
    }

    /// Equal-width classes over `[lo, hi]`, one per range entry
    pub fn quantize(lo: f64, hi: f64, range: Vec<RawValue>) -> Result<Self, TrellisScaleError> {
        if range.is_empty() {
            return Err(TrellisScaleError::InvalidScalePropertyValue(
                "quantize scale needs a non-empty range".to_string(),
            ));
        }
        let n = range.len();
        let thresholds = (1..n)
            .map(|i| lo + (hi - lo) * i as f64 / n as f64)
            .collect();
        Ok(Self {
            scale_type: ScaleType::Quantize,
            domain: vec![RawValue::Number(lo), RawValue::Number(hi)],
            thresholds,
            range,
            unknown: RawValue::Null,
        })
    }

    pub fn with_unknown(mut self, unknown: RawValue) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }
}

impl ScalePrimitive for ThresholdScale {
    fn scale_type(&self) -> ScaleType {
        self.scale_type
    }

    fn apply(&self, value: &RawValue) -> RawValue {
        match value.as_finite() {
            Some(x) if !self.range.is_empty() => {
                let i = array::bisect_right(&self.thresholds, x).min(self.range.len() - 1);
                self.range[i].clone()
            }
            _ => self.unknown.clone(),
        }
    }

    fn domain(&self) -> Vec<RawValue> {
        self.domain.clone()
    }

    fn range(&self) -> Vec<RawValue> {
        self.range.clone()
    }

    fn ticks(&self, _count: f64) -> Vec<RawValue> {
        self.thresholds.iter().map(|t| RawValue::Number(*t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<RawValue> {
        (0..n).map(|i| RawValue::from(format!("c{i}"))).collect()
    }

    #[test]
    fn test_threshold_boundaries() -> Result<(), TrellisScaleError> {
        let scale = ThresholdScale::threshold(vec![0.0, 10.0], labels(3))?;
        assert_eq!(scale.apply(&(-1.0).into()), RawValue::from("c0"));
        assert_eq!(scale.apply(&0.0.into()), RawValue::from("c1"));
        assert_eq!(scale.apply(&10.0.into()), RawValue::from("c2"));
        assert_eq!(scale.apply(&RawValue::Null), RawValue::Null);
        assert!(ThresholdScale::threshold(vec![0.0], labels(3)).is_err());
        Ok(())
    }

    #[test]
    fn test_quantile() -> Result<(), TrellisScaleError> {
        let values: Vec<f64> = (1..=8).map(|v| v as f64).collect();
        let scale = ThresholdScale::quantile(&values, labels(4))?;
        assert_eq!(scale.thresholds(), &[2.75, 4.5, 6.25]);
        assert_eq!(scale.apply(&1.0.into()), RawValue::from("c0"));
        assert_eq!(scale.apply(&8.0.into()), RawValue::from("c3"));
        Ok(())
    }

    #[test]
    fn test_quantize() -> Result<(), TrellisScaleError> {
        let scale = ThresholdScale::quantize(0.0, 100.0, labels(4))?;
        assert_eq!(scale.thresholds(), &[25.0, 50.0, 75.0]);
        assert_eq!(scale.apply(&60.0.into()), RawValue::from("c2"));
        Ok(())
    }
}
