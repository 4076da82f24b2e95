use std::sync::Arc;

use trellis_common::RawValue;

use super::{ContinuousScale, ScalePrimitive};
use crate::array;
use crate::color_interpolator::ColorInterpolator;
use crate::options::ScaleType;
use crate::scheme::Scheme;

/// Maps a domain value to a position in [0, 1] along the color ramp
#[derive(Debug, Clone)]
pub enum ColorNormalizer {
    /// A clamped continuous scale with range [0, 1] (or [0, 0.5, 1] when diverging)
    Continuous(ContinuousScale),
    /// Rank among the sorted sample values
    QuantileRank(Vec<f64>),
}

impl ColorNormalizer {
    pub fn normalize(&self, value: &RawValue) -> Option<f64> {
        let x = value.as_finite()?;
        let t = match self {
            ColorNormalizer::Continuous(scale) => scale.scale_number(x),
            ColorNormalizer::QuantileRank(sorted) => match sorted.len() {
                0 => return None,
                1 => 0.5,
                n => {
                    let i = array::bisect_right(sorted, x).max(1);
                    ((i - 1) as f64 / (n - 1) as f64).clamp(0.0, 1.0)
                }
            },
        };
        t.is_finite().then_some(t)
    }
}

/// Continuous, diverging and quantile-continuous color scales
#[derive(Debug, Clone)]
pub struct ColorRampScale {
    scale_type: ScaleType,
    normalizer: ColorNormalizer,
    scheme: Scheme,
    interpolator: Arc<dyn ColorInterpolator>,
    unknown: RawValue,
}

impl ColorRampScale {
    pub fn new(
        scale_type: ScaleType,
        normalizer: ColorNormalizer,
        scheme: Scheme,
        interpolator: Arc<dyn ColorInterpolator>,
    ) -> Self {
        Self {
            scale_type,
            normalizer,
            scheme,
            interpolator,
            unknown: RawValue::Null,
        }
    }

    pub fn with_unknown(mut self, unknown: RawValue) -> Self {
        self.unknown = unknown;
        self
    }
}

impl ScalePrimitive for ColorRampScale {
    fn scale_type(&self) -> ScaleType {
        self.scale_type
    }

    fn apply(&self, value: &RawValue) -> RawValue {
        match self.normalizer.normalize(value) {
            Some(t) => RawValue::String(self.scheme.interpolate(t, self.interpolator.as_ref())),
            None => self.unknown.clone(),
        }
    }

    fn domain(&self) -> Vec<RawValue> {
        match &self.normalizer {
            ColorNormalizer::Continuous(scale) => scale.domain(),
            ColorNormalizer::QuantileRank(sorted) => {
                sorted.iter().map(|v| RawValue::Number(*v)).collect()
            }
        }
    }

    fn range(&self) -> Vec<RawValue> {
        self.scheme
            .sample(self.scheme.colors().len().max(2))
            .into_iter()
            .map(RawValue::String)
            .collect()
    }

    fn ticks(&self, count: f64) -> Vec<RawValue> {
        match &self.normalizer {
            ColorNormalizer::Continuous(scale) => scale.ticks(count),
            ColorNormalizer::QuantileRank(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_interpolator::SrgbaColorInterpolator;
    use crate::error::TrellisScaleError;
    use crate::scheme::SchemeKind;

    #[test]
    fn test_linear_ramp() -> Result<(), TrellisScaleError> {
        let scheme = Scheme::from_colors(
            &["#000000".to_string(), "#ffffff".to_string()],
            SchemeKind::Sequential,
        )?;
        let normalizer = ColorNormalizer::Continuous(
            ContinuousScale::linear((0.0, 10.0), (0.0, 1.0)).with_clamp(true),
        );
        let scale = ColorRampScale::new(
            ScaleType::Linear,
            normalizer,
            scheme,
            Arc::new(SrgbaColorInterpolator),
        )
        .with_unknown("#888888".into());
        assert_eq!(scale.apply(&0.0.into()), RawValue::from("#000000"));
        assert_eq!(scale.apply(&5.0.into()), RawValue::from("#808080"));
        assert_eq!(scale.apply(&50.0.into()), RawValue::from("#ffffff"));
        assert_eq!(scale.apply(&RawValue::Null), RawValue::from("#888888"));
        Ok(())
    }

    #[test]
    fn test_quantile_rank() {
        let normalizer = ColorNormalizer::QuantileRank(vec![1.0, 2.0, 3.0]);
        assert_eq!(normalizer.normalize(&1.0.into()), Some(0.0));
        assert_eq!(normalizer.normalize(&2.5.into()), Some(0.5));
        assert_eq!(normalizer.normalize(&3.0.into()), Some(1.0));
        assert_eq!(normalizer.normalize(&0.0.into()), Some(0.0));
    }
}
