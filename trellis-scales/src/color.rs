//! Color scale construction.
//!
//! Color scales are built separately from other scales because schemes may be
//! value-to-color maps, and continuous color types interpolate swatches from a
//! named scheme or a user color list.

use std::sync::Arc;

use trellis_common::RawValue;

use crate::array;
use crate::color_interpolator::interpolator_for;
use crate::error::TrellisScaleError;
use crate::options::{ScaleOptions, ScaleType, SchemeSpec};
use crate::primitive::{
    ColorNormalizer, ColorRampScale, ContinuousScale, ContinuousTransform, OrdinalScale,
    ScalePrimitive, ThresholdScale,
};
use crate::scheme::{NamedScheme, Scheme, SchemeKind};

/// Fallback color for values a mapped scheme does not cover
pub const UNKNOWN_COLOR: &str = "#888888";

const DEFAULT_CLASSES: usize = 5;

#[derive(Debug, Clone)]
pub struct ColorScale {
    pub domain: Vec<RawValue>,
    pub range: Vec<RawValue>,
    pub func: Arc<dyn ScalePrimitive>,
}

/// Build a color scale of `scale_type`.
///
/// `domain` holds the ordinal values for discrete types, the extent (or explicit
/// piecewise domain) for continuous types, and every observed value for quantile
/// types.
pub fn auto_scale_color(
    scale_type: ScaleType,
    domain: Vec<RawValue>,
    options: &ScaleOptions,
) -> Result<ColorScale, TrellisScaleError> {
    if let Some(SchemeSpec::Mapped(mapping)) = &options.scheme {
        return mapped_scale(domain, mapping, options);
    }

    match scale_type {
        ScaleType::Ordinal | ScaleType::Categorical => {
            let range = match explicit_range(options) {
                Some(range) => range,
                None => {
                    let default = if scale_type == ScaleType::Categorical {
                        NamedScheme::Observable10
                    } else {
                        NamedScheme::Turbo
                    };
                    let scheme = resolve_scheme(options, default, SchemeKind::Categorical)?;
                    if scale_type == ScaleType::Categorical
                        && scheme.kind() != SchemeKind::Categorical
                    {
                        log::warn!("continuous color scheme used for a categorical color scale");
                    }
                    colors(scheme.sample(domain.len()))
                }
            };
            let func = OrdinalScale::new(scale_type, domain.clone(), range.clone())
                .with_unknown(options.unknown.clone().unwrap_or_default());
            Ok(ColorScale {
                domain,
                range,
                func: Arc::new(func),
            })
        }
        ScaleType::Threshold => {
            let domain = if domain.is_empty() {
                vec![RawValue::Number(0.0)]
            } else {
                domain
            };
            let thresholds: Vec<f64> = domain.iter().filter_map(|d| d.as_finite()).collect();
            let range = match explicit_range(options) {
                Some(range) => range,
                None => colors(
                    resolve_scheme(options, NamedScheme::Rdylbu, SchemeKind::Sequential)?
                        .sample(thresholds.len() + 1),
                ),
            };
            let func = ThresholdScale::threshold(thresholds, range.clone())?
                .with_unknown(options.unknown.clone().unwrap_or_default());
            Ok(ColorScale {
                domain,
                range,
                func: Arc::new(func),
            })
        }
        ScaleType::Quantile | ScaleType::Quantize => {
            let values: Vec<f64> = domain.iter().filter_map(|d| d.as_finite()).collect();
            let range = match explicit_range(options) {
                Some(range) => range,
                None => colors(
                    resolve_scheme(options, NamedScheme::Rdylbu, SchemeKind::Sequential)?
                        .sample(options.n.unwrap_or(DEFAULT_CLASSES).max(1)),
                ),
            };
            let func = if scale_type == ScaleType::Quantile {
                ThresholdScale::quantile(&values, range.clone())?
            } else {
                let (lo, hi) = array::extent(values).ok_or(TrellisScaleError::EmptyDomain)?;
                ThresholdScale::quantize(lo, hi, range.clone())?
            };
            let func = func.with_unknown(options.unknown.clone().unwrap_or_default());
            Ok(ColorScale {
                domain: func.domain(),
                range,
                func: Arc::new(func),
            })
        }
        ScaleType::QuantileCont => {
            let sorted = array::sorted_finite(
                &domain.iter().filter_map(|d| d.as_finite()).collect::<Vec<_>>(),
            );
            let scheme = resolve_scheme(options, NamedScheme::Turbo, SchemeKind::Sequential)?;
            ramp(scale_type, ColorNormalizer::QuantileRank(sorted), scheme, options)
        }
        _ if scale_type.is_diverging() => {
            let scheme = resolve_scheme(options, NamedScheme::Rdbu, SchemeKind::Diverging)?;
            let default_pivot = if scale_type == ScaleType::DivergingLog {
                1.0
            } else {
                0.0
            };
            let pivot = options.pivot.unwrap_or(default_pivot);
            let temporal = domain.iter().any(|d| d.is_date());
            let numbers: Vec<f64> = domain.iter().filter_map(|d| d.as_finite()).collect();
            let (lo, hi) = array::extent(numbers).ok_or(TrellisScaleError::EmptyDomain)?;

            let two_sided = options
                .domain
                .as_ref()
                .is_some_and(|d| d.len() >= 2 && lo < pivot && pivot < hi);
            let (lo, hi) = if two_sided {
                (lo, hi)
            } else {
                let extent = (pivot - lo).abs().max((hi - pivot).abs());
                (pivot - extent, pivot + extent)
            };

            let transform = ContinuousTransform::for_scale(scale_type, options, pivot < 0.0);
            let normalizer = ContinuousScale::try_new(
                scale_type,
                transform,
                vec![lo, pivot, hi],
                vec![0.0, 0.5, 1.0],
            )?
            .with_clamp(true)
            .with_temporal(temporal);
            ramp(scale_type, ColorNormalizer::Continuous(normalizer), scheme, options)
        }
        _ => {
            let scheme = resolve_scheme(options, NamedScheme::Turbo, SchemeKind::Sequential)?;
            let temporal = domain.iter().any(|d| d.is_date());
            let numbers: Vec<f64> = domain.iter().filter_map(|d| d.as_finite()).collect();
            let (lo, hi) = match numbers.as_slice() {
                [] => return Err(TrellisScaleError::EmptyDomain),
                [only] => (*only, *only),
                [first, .., last] => (*first, *last),
            };
            let transform =
                ContinuousTransform::for_scale(scale_type, options, lo.max(hi) < 0.0);
            let normalizer = ContinuousScale::try_new(
                scale_type,
                transform,
                vec![lo, hi],
                vec![0.0, 1.0],
            )?
            .with_clamp(true)
            .with_temporal(temporal);
            ramp(scale_type, ColorNormalizer::Continuous(normalizer), scheme, options)
        }
    }
}

fn ramp(
    scale_type: ScaleType,
    normalizer: ColorNormalizer,
    scheme: Scheme,
    options: &ScaleOptions,
) -> Result<ColorScale, TrellisScaleError> {
    let interpolator = interpolator_for(options.interpolate.unwrap_or_default());
    let func = ColorRampScale::new(scale_type, normalizer, scheme, interpolator)
        .with_unknown(options.unknown.clone().unwrap_or_default());
    Ok(ColorScale {
        domain: func.domain(),
        range: func.range(),
        func: Arc::new(func),
    })
}

/// Observed values keep their order; mapped keys that were never observed are
/// appended. Values missing from the map get the unknown color.
fn mapped_scale(
    domain: Vec<RawValue>,
    mapping: &indexmap::IndexMap<String, String>,
    options: &ScaleOptions,
) -> Result<ColorScale, TrellisScaleError> {
    let unknown = options
        .unknown
        .clone()
        .unwrap_or_else(|| RawValue::from(UNKNOWN_COLOR));

    let mut full_domain = domain;
    for key in mapping.keys() {
        if !full_domain.iter().any(|d| d.to_string() == *key) {
            full_domain.push(RawValue::from(key.as_str()));
        }
    }
    let range: Vec<RawValue> = full_domain
        .iter()
        .map(|d| {
            mapping
                .get(&d.to_string())
                .map(|c| RawValue::from(c.as_str()))
                .unwrap_or_else(|| unknown.clone())
        })
        .collect();

    let func = OrdinalScale::new(ScaleType::Categorical, full_domain.clone(), range.clone())
        .with_unknown(unknown);
    Ok(ColorScale {
        domain: full_domain,
        range,
        func: Arc::new(func),
    })
}

fn explicit_range(options: &ScaleOptions) -> Option<Vec<RawValue>> {
    options.range.clone().filter(|r| !r.is_empty())
}

fn resolve_scheme(
    options: &ScaleOptions,
    default: NamedScheme,
    kind: SchemeKind,
) -> Result<Scheme, TrellisScaleError> {
    match &options.scheme {
        Some(SchemeSpec::Named(name)) => Scheme::named(name),
        Some(SchemeSpec::Colors(colors)) => Scheme::from_colors(colors, kind),
        // A range of colors on a continuous scale acts as a scheme
        _ => match options.range.as_ref() {
            Some(range) if range.len() >= 2 && range.iter().all(|r| r.is_string()) => {
                let colors: Vec<String> = range.iter().map(|r| r.to_string()).collect();
                Scheme::from_colors(&colors, kind)
            }
            _ => Ok(Scheme::from(default)),
        },
    }
}

fn colors(swatches: Vec<String>) -> Vec<RawValue> {
    swatches.into_iter().map(RawValue::String).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn strs(values: &[&str]) -> Vec<RawValue> {
        values.iter().map(|v| RawValue::from(*v)).collect()
    }

    #[test]
    fn test_categorical_default_scheme() -> Result<(), TrellisScaleError> {
        let scale = auto_scale_color(
            ScaleType::Categorical,
            strs(&["a", "b"]),
            &ScaleOptions::default(),
        )?;
        assert_eq!(scale.func.apply(&"a".into()), RawValue::from("#4269d0"));
        assert_eq!(scale.func.apply(&"b".into()), RawValue::from("#efb118"));
        assert_eq!(scale.range.len(), 2);
        Ok(())
    }

    #[test]
    fn test_mapped_scheme_augments_domain() -> Result<(), TrellisScaleError> {
        let mapping: IndexMap<String, String> = [
            ("a".to_string(), "red".to_string()),
            ("z".to_string(), "blue".to_string()),
        ]
        .into_iter()
        .collect();
        let options = ScaleOptions::default().scheme(SchemeSpec::Mapped(mapping));
        let scale = auto_scale_color(ScaleType::Categorical, strs(&["a", "b"]), &options)?;
        assert_eq!(scale.domain, strs(&["a", "b", "z"]));
        assert_eq!(scale.range, strs(&["red", UNKNOWN_COLOR, "blue"]));
        assert_eq!(scale.func.apply(&"b".into()), RawValue::from(UNKNOWN_COLOR));
        assert_eq!(scale.func.apply(&"q".into()), RawValue::from(UNKNOWN_COLOR));
        Ok(())
    }

    #[test]
    fn test_linear_ramp_from_range() -> Result<(), TrellisScaleError> {
        let options = ScaleOptions::default().range(["#000000", "#ffffff"]);
        let scale = auto_scale_color(
            ScaleType::Linear,
            vec![0.0.into(), 10.0.into()],
            &options,
        )?;
        assert_eq!(scale.func.apply(&5.0.into()), RawValue::from("#808080"));
        assert_eq!(scale.func.apply(&20.0.into()), RawValue::from("#ffffff"));
        Ok(())
    }

    #[test]
    fn test_diverging_is_symmetric_around_pivot() -> Result<(), TrellisScaleError> {
        let scale = auto_scale_color(
            ScaleType::Diverging,
            vec![(-2.0).into(), 10.0.into()],
            &ScaleOptions::default(),
        )?;
        assert_eq!(
            scale.domain,
            vec![RawValue::from(-10.0), RawValue::from(0.0), RawValue::from(10.0)]
        );
        // pivot maps to the scheme midpoint
        assert_eq!(scale.func.apply(&0.0.into()), RawValue::from("#f7f7f7"));

        let two_sided = ScaleOptions::default().domain([-2.0, 10.0]);
        let scale = auto_scale_color(
            ScaleType::Diverging,
            vec![(-2.0).into(), 10.0.into()],
            &two_sided,
        )?;
        assert_eq!(
            scale.domain,
            vec![RawValue::from(-2.0), RawValue::from(0.0), RawValue::from(10.0)]
        );
        Ok(())
    }

    #[test]
    fn test_threshold_and_quantize() -> Result<(), TrellisScaleError> {
        let scale = auto_scale_color(ScaleType::Threshold, vec![], &ScaleOptions::default())?;
        assert_eq!(scale.domain, vec![RawValue::from(0.0)]);
        assert_eq!(scale.range.len(), 2);
        assert_ne!(scale.func.apply(&(-1.0).into()), scale.func.apply(&1.0.into()));

        let options = ScaleOptions::default().n(4);
        let scale = auto_scale_color(
            ScaleType::Quantize,
            vec![0.0.into(), 100.0.into()],
            &options,
        )?;
        assert_eq!(scale.range.len(), 4);
        assert_eq!(scale.func.ticks(10.0).len(), 3);
        Ok(())
    }

    #[test]
    fn test_unknown_scheme_is_an_error() {
        let options = ScaleOptions::default().scheme(SchemeSpec::Named("nope".to_string()));
        assert!(matches!(
            auto_scale_color(ScaleType::Linear, vec![0.0.into(), 1.0.into()], &options),
            Err(TrellisScaleError::UnknownScheme(_))
        ));
    }
}
