//! Scale type inference and validation.

use trellis_common::{Mark, RawValue, ScaleName};

use crate::error::TrellisScaleError;
use crate::options::{ScaleOptions, ScaleType};

/// Pick a scale type from the values a scale will see and the marks that use it.
///
/// `values` are the unique non-null values observed across marks, or the explicit
/// domain when one was given.
pub fn infer_scale_type(
    name: ScaleName,
    values: &[RawValue],
    marks: &[&Mark],
    options: Option<&ScaleOptions>,
) -> ScaleType {
    let values: Vec<&RawValue> = values.iter().filter(|v| !v.is_null()).collect();
    let all_numbers = !values.is_empty() && values.iter().all(|v| v.is_number());
    let all_dates = !values.is_empty() && values.iter().all(|v| v.is_date());
    let all_strings = !values.is_empty() && values.iter().all(|v| v.is_string());

    match name {
        ScaleName::Color => {
            if values.is_empty() {
                ScaleType::Ordinal
            } else if all_numbers || all_dates {
                ScaleType::Linear
            } else {
                ScaleType::Categorical
            }
        }
        ScaleName::Symbol => ScaleType::Ordinal,
        ScaleName::Fx | ScaleName::Fy => ScaleType::Band,
        ScaleName::R => ScaleType::Sqrt,
        ScaleName::Opacity | ScaleName::Length => ScaleType::Linear,
        ScaleName::X | ScaleName::Y => {
            if let Some(domain) = options.and_then(|o| o.domain.as_ref()) {
                if domain.len() == 2 {
                    if domain.iter().all(|d| d.is_number()) {
                        return ScaleType::Linear;
                    }
                    if domain.iter().all(|d| d.is_date()) {
                        return ScaleType::Time;
                    }
                }
            }
            if options.and_then(|o| o.zero) == Some(true) {
                return ScaleType::Linear;
            }
            if options
                .and_then(|o| o.nice.as_ref())
                .and_then(|nice| nice.count())
                .is_some()
            {
                return if all_dates {
                    ScaleType::Time
                } else {
                    ScaleType::Linear
                };
            }

            let needs_band = marks.iter().any(|mark| match name {
                ScaleName::X => mark.mark_type.requires_band_x(),
                _ => mark.mark_type.requires_band_y(),
            });
            if needs_band {
                ScaleType::Band
            } else if values.is_empty() {
                ScaleType::Linear
            } else if values.len() == 1 {
                ScaleType::Point
            } else if all_numbers {
                ScaleType::Linear
            } else if all_dates {
                ScaleType::Time
            } else if all_strings {
                ScaleType::Point
            } else {
                ScaleType::Linear
            }
        }
    }
}

/// Reject scale types that make no sense for the named scale
pub fn validate_scale_type(name: ScaleName, scale_type: ScaleType) -> Result<(), TrellisScaleError> {
    use ScaleType::*;
    let valid = match name {
        ScaleName::X | ScaleName::Y => matches!(
            scale_type,
            Linear | Pow | Sqrt | Log | Symlog | Time | Band | Point
        ),
        ScaleName::Fx | ScaleName::Fy => matches!(scale_type, Band),
        ScaleName::R => matches!(scale_type, Sqrt | Linear | Pow | Log | Symlog),
        ScaleName::Opacity => matches!(scale_type, Linear | Pow | Sqrt | Log | Symlog),
        ScaleName::Length => matches!(scale_type, Linear | Sqrt | Pow | Log),
        ScaleName::Symbol => matches!(scale_type, Ordinal | Categorical),
        ScaleName::Color => !matches!(scale_type, Band | Point | Time),
    };
    if valid {
        Ok(())
    } else {
        Err(TrellisScaleError::InvalidScaleType {
            scale: name,
            scale_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use trellis_common::MarkType;

    fn nums() -> Vec<RawValue> {
        vec![1.0.into(), 2.0.into(), 3.0.into()]
    }

    fn strs() -> Vec<RawValue> {
        vec!["a".into(), "b".into()]
    }

    fn dates() -> Vec<RawValue> {
        vec![RawValue::date_from_millis(0), RawValue::date_from_millis(1000)]
    }

    #[rstest]
    #[case(ScaleName::Color, vec![], ScaleType::Ordinal)]
    #[case(ScaleName::Color, nums(), ScaleType::Linear)]
    #[case(ScaleName::Color, dates(), ScaleType::Linear)]
    #[case(ScaleName::Color, strs(), ScaleType::Categorical)]
    #[case(ScaleName::Color, vec![1.0.into(), RawValue::Null], ScaleType::Linear)]
    #[case(ScaleName::Symbol, nums(), ScaleType::Ordinal)]
    #[case(ScaleName::X, vec![], ScaleType::Linear)]
    #[case(ScaleName::X, vec!["only".into()], ScaleType::Point)]
    #[case(ScaleName::X, nums(), ScaleType::Linear)]
    #[case(ScaleName::Y, dates(), ScaleType::Time)]
    #[case(ScaleName::Y, strs(), ScaleType::Point)]
    #[case(ScaleName::Y, vec![1.0.into(), "a".into()], ScaleType::Linear)]
    #[case(ScaleName::R, nums(), ScaleType::Sqrt)]
    #[case(ScaleName::Fx, strs(), ScaleType::Band)]
    fn test_infer_from_values(
        #[case] name: ScaleName,
        #[case] values: Vec<RawValue>,
        #[case] expected: ScaleType,
    ) {
        assert_eq!(infer_scale_type(name, &values, &[], None), expected);
    }

    #[test]
    fn test_band_requiring_marks() {
        let bar = Mark::new(MarkType::BarY, vec![]);
        assert_eq!(
            infer_scale_type(ScaleName::X, &nums(), &[&bar], None),
            ScaleType::Band
        );
        assert_eq!(
            infer_scale_type(ScaleName::Y, &nums(), &[&bar], None),
            ScaleType::Linear
        );
    }

    #[test]
    fn test_options_drive_inference() {
        let domain = ScaleOptions::default().domain([0.0, 10.0]);
        assert_eq!(
            infer_scale_type(ScaleName::X, &strs(), &[], Some(&domain)),
            ScaleType::Linear
        );
        let nice = ScaleOptions::default().nice(true);
        assert_eq!(
            infer_scale_type(ScaleName::X, &dates(), &[], Some(&nice)),
            ScaleType::Time
        );
        let zero = ScaleOptions::default().zero(true);
        let bar = Mark::new(MarkType::BarX, vec![]);
        assert_eq!(
            infer_scale_type(ScaleName::Y, &strs(), &[&bar], Some(&zero)),
            ScaleType::Linear
        );
    }

    #[rstest]
    #[case(ScaleOptions::default().zero(false))]
    #[case(ScaleOptions::default().nice(false))]
    #[case(ScaleOptions::default().zero(false).nice(false))]
    fn test_disabled_options_keep_band(#[case] options: ScaleOptions) {
        let bar = Mark::new(MarkType::BarX, vec![]);
        assert_eq!(
            infer_scale_type(ScaleName::Y, &strs(), &[&bar], Some(&options)),
            ScaleType::Band
        );
    }

    #[rstest]
    #[case(ScaleName::X, ScaleType::Band, true)]
    #[case(ScaleName::X, ScaleType::Ordinal, false)]
    #[case(ScaleName::Fx, ScaleType::Linear, false)]
    #[case(ScaleName::R, ScaleType::Sqrt, true)]
    #[case(ScaleName::Color, ScaleType::Band, false)]
    #[case(ScaleName::Color, ScaleType::DivergingLog, true)]
    #[case(ScaleName::Symbol, ScaleType::Linear, false)]
    fn test_validate(#[case] name: ScaleName, #[case] scale_type: ScaleType, #[case] ok: bool) {
        assert_eq!(validate_scale_type(name, scale_type).is_ok(), ok);
    }
}
