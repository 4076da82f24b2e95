//! Builds plot scales from the marks that use them.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use strum::IntoEnumIterator;
use trellis_common::{
    resolve_channel, to_channel_option, Channel, ChannelAccessor, FieldKey, Mark, MarkId,
    MarkType, RawValue, ScaleBinding, ScaleName,
};

use crate::array;
use crate::color::auto_scale_color;
use crate::error::TrellisScaleError;
use crate::infer::{infer_scale_type, validate_scale_type};
use crate::interval::time_nice;
use crate::options::{PlotOptions, ScaleOptions, ScaleType};
use crate::predicates::all_look_like_output;
use crate::primitive::{
    BandScale, ConstantScale, ContinuousScale, ContinuousTransform, OrdinalScale, ScalePrimitive,
};

pub const SYMBOLS_FILL: &[&str] = &[
    "circle", "cross", "diamond", "square", "star", "triangle", "wye",
];
pub const SYMBOLS_STROKE: &[&str] = &[
    "circle", "plus", "times", "triangle2", "asterisk", "square2", "diamond2",
];

const DEFAULT_TICK_COUNT: f64 = 10.0;
const BAND_PADDING: f64 = 0.1;
const POINT_PADDING: f64 = 0.5;

/// A scale ready for the rendering layer
#[derive(Debug, Clone)]
pub struct PlotScale {
    pub name: ScaleName,
    pub scale_type: ScaleType,
    pub domain: Vec<RawValue>,
    pub range: Vec<RawValue>,
    pub func: Arc<dyn ScalePrimitive>,
    /// Channels of marks whose values are already output values and bypass the scale
    pub skip: IndexMap<Channel, BTreeSet<MarkId>>,
    /// Marks that use the scale without binding a channel to it
    pub manual_active_marks: usize,
    /// Field accessors that fed the scale
    pub unique_scale_props: IndexSet<FieldKey>,
    /// Set when a contributing accessor was a constant or a function
    pub has_computed_props: bool,
    /// No mark uses the scale; consumers render unscaled
    pub is_dummy: bool,
}

impl PlotScale {
    pub fn apply(&self, value: &RawValue) -> RawValue {
        self.func.apply(value)
    }

    /// Ticks with consecutive duplicates removed
    pub fn ticks(&self, count: Option<f64>) -> Vec<RawValue> {
        let mut ticks = self.func.ticks(count.unwrap_or(DEFAULT_TICK_COUNT));
        ticks.dedup();
        ticks
    }

    pub fn invert(&self, value: f64) -> Option<RawValue> {
        self.func.invert(value)
    }

    pub fn bandwidth(&self) -> f64 {
        self.func.bandwidth()
    }

    pub fn step(&self) -> f64 {
        self.func.step()
    }

    /// Whether `channel` of `mark` bypasses this scale
    pub fn skips(&self, channel: &Channel, mark: MarkId) -> bool {
        self.skip
            .get(channel)
            .map(|marks| marks.contains(&mark))
            .unwrap_or(false)
    }

    /// The field name to use as an axis or legend label, when exactly one field
    /// fed the scale
    pub fn label(&self) -> Option<String> {
        if self.has_computed_props || self.unique_scale_props.len() != 1 {
            return None;
        }
        self.unique_scale_props
            .first()
            .and_then(|key| key.name())
            .map(str::to_string)
    }
}

/// Everything gathered from the marks for one scale
#[derive(Default)]
struct ScaleInputs<'a> {
    active_marks: Vec<&'a Mark>,
    unique_values: IndexSet<RawValue>,
    all_values: Vec<RawValue>,
    skip: IndexMap<Channel, BTreeSet<MarkId>>,
    manual_active_marks: usize,
    unique_scale_props: IndexSet<FieldKey>,
    has_computed_props: bool,
    sort_disabled: bool,
}

fn collect_inputs<'a>(
    name: ScaleName,
    marks: &'a [Mark],
) -> Result<ScaleInputs<'a>, TrellisScaleError> {
    let mut inputs = ScaleInputs::default();

    for mark in marks {
        let mut active = false;
        for (channel, accessor) in &mark.channels {
            let option = to_channel_option(channel, Some(accessor));
            if option.scale != Some(name) {
                continue;
            }
            let explicit = matches!(
                accessor,
                ChannelAccessor::Options {
                    scale: ScaleBinding::Named(_),
                    ..
                }
            );

            let values = mark
                .data
                .iter()
                .enumerate()
                .map(|(i, record)| resolve_channel(channel, record, i, &mark.channels))
                .collect::<Result<Vec<_>, _>>()?;

            if !explicit && all_look_like_output(name, &values) {
                log::debug!(
                    "{name} scale: skipping channel `{}` of mark {:?}, values are already output values",
                    channel.as_str(),
                    mark.id
                );
                inputs
                    .skip
                    .entry(channel.clone())
                    .or_default()
                    .insert(mark.id);
                continue;
            }

            active = true;
            match accessor.field() {
                Some(key) => {
                    inputs.unique_scale_props.insert(key.clone());
                }
                None => inputs.has_computed_props = true,
            }
            for value in values {
                if value.is_null() {
                    continue;
                }
                inputs.unique_values.insert(value.clone());
                inputs.all_values.push(value);
            }
        }

        if active {
            inputs.active_marks.push(mark);
            if mark.options.sorted {
                inputs.sort_disabled = true;
            }
        } else if mark.options.scales.contains(&name) {
            inputs.manual_active_marks += 1;
        }
    }

    Ok(inputs)
}

/// Build the scale `name` from every mark that feeds it
pub fn create_scale(
    name: ScaleName,
    marks: &[Mark],
    plot: &PlotOptions,
) -> Result<PlotScale, TrellisScaleError> {
    let options = plot.scale_options(name).cloned().unwrap_or_default();
    let inputs = collect_inputs(name, marks)?;

    if inputs.active_marks.is_empty() && inputs.manual_active_marks == 0 && !options.is_explicit()
    {
        log::debug!("{name} scale: no contributing marks, using a dummy scale");
        return Ok(dummy_scale(name, inputs));
    }

    let scale_type = match options.scale_type {
        Some(scale_type) => scale_type,
        None => {
            let values: Vec<RawValue> = match &options.domain {
                Some(domain) => domain.clone(),
                None => inputs.unique_values.iter().cloned().collect(),
            };
            let inferred = infer_scale_type(name, &values, &inputs.active_marks, Some(&options));
            log::debug!("{name} scale: inferred type {inferred}");
            inferred
        }
    };
    validate_scale_type(name, scale_type)?;

    let domain = build_domain(name, scale_type, &inputs, &options);

    let (domain, range, func) = if name == ScaleName::Color {
        let color = auto_scale_color(scale_type, domain, &options)?;
        (color.domain, color.range, color.func)
    } else {
        let range = build_range(name, scale_type, &domain, marks, plot, &options);
        let func = build_primitive(name, scale_type, &domain, &range, &options)?;
        (func.domain(), range, func)
    };

    Ok(PlotScale {
        name,
        scale_type,
        domain,
        range,
        func,
        skip: inputs.skip,
        manual_active_marks: inputs.manual_active_marks,
        unique_scale_props: inputs.unique_scale_props,
        has_computed_props: inputs.has_computed_props,
        is_dummy: false,
    })
}

/// Build every scale
pub fn compute_scales(
    marks: &[Mark],
    plot: &PlotOptions,
) -> Result<IndexMap<ScaleName, PlotScale>, TrellisScaleError> {
    ScaleName::iter()
        .map(|name| Ok((name, create_scale(name, marks, plot)?)))
        .collect()
}

fn dummy_scale(name: ScaleName, inputs: ScaleInputs<'_>) -> PlotScale {
    let (scale_type, value) = match name {
        ScaleName::Color => (ScaleType::Ordinal, RawValue::from("currentColor")),
        _ => (ScaleType::Linear, RawValue::Number(0.0)),
    };
    PlotScale {
        name,
        scale_type,
        domain: vec![],
        range: vec![],
        func: Arc::new(ConstantScale::new(scale_type, value)),
        skip: inputs.skip,
        manual_active_marks: 0,
        unique_scale_props: inputs.unique_scale_props,
        has_computed_props: inputs.has_computed_props,
        is_dummy: true,
    }
}

fn build_domain(
    name: ScaleName,
    scale_type: ScaleType,
    inputs: &ScaleInputs<'_>,
    options: &ScaleOptions,
) -> Vec<RawValue> {
    if options.interval.is_some() && !scale_type.is_ordinal() {
        log::warn!("{name} scale: the interval option only applies to ordinal scales, ignoring it");
    }

    if let Some(domain) = &options.domain {
        if scale_type.is_continuous() && options.zero == Some(true) {
            return include_zero(domain);
        }
        return domain.clone();
    }

    if scale_type.is_ordinal() {
        if let Some(interval) = &options.interval {
            let numbers = inputs.unique_values.iter().filter_map(|v| v.as_finite());
            if let (Some((lo, hi)), Some(sample)) = (
                array::extent(numbers),
                inputs.unique_values.iter().find(|v| v.as_finite().is_some()),
            ) {
                let lo = interval.floor(lo);
                let hi = interval.offset(interval.floor(hi), 1);
                return interval
                    .range(lo, hi)
                    .into_iter()
                    .map(|v| sample.with_number(v))
                    .collect();
            }
        }

        let mut domain: Vec<RawValue> = inputs.unique_values.iter().cloned().collect();
        if !inputs.sort_disabled && options.sort != Some(false) {
            domain.sort();
        }
        return domain;
    }

    if scale_type.needs_all_values() || scale_type == ScaleType::Threshold {
        let mut values: Vec<RawValue> = match scale_type {
            ScaleType::Threshold => vec![],
            _ => inputs.all_values.clone(),
        };
        values.sort();
        return values;
    }

    let temporal = inputs.unique_values.iter().any(|v| v.is_date());
    let numbers = inputs.unique_values.iter().filter_map(|v| v.as_finite());
    let (mut lo, mut hi) = array::extent(numbers).unwrap_or((0.0, 1.0));
    if name == ScaleName::R {
        lo = 0.0;
    }
    if options.zero == Some(true) {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if let Some(count) = options.nice.and_then(|n| n.count()) {
        (lo, hi) = match scale_type {
            ScaleType::Time => time_nice(lo, hi, count),
            ScaleType::Log => nice_log(lo, hi, options.base.unwrap_or(10.0)),
            _ => array::nice(lo, hi, count),
        };
    }

    let wrap = |v: f64| {
        if temporal {
            RawValue::date_from_millis(v.round() as i64)
        } else {
            RawValue::Number(v)
        }
    };
    vec![wrap(lo), wrap(hi)]
}

fn include_zero(domain: &[RawValue]) -> Vec<RawValue> {
    let numbers = domain.iter().filter_map(|v| v.as_finite());
    match array::extent(numbers) {
        Some((lo, hi)) => vec![RawValue::Number(lo.min(0.0)), RawValue::Number(hi.max(0.0))],
        None => domain.to_vec(),
    }
}

fn nice_log(lo: f64, hi: f64, base: f64) -> (f64, f64) {
    if !(lo > 0.0 && hi > 0.0) {
        return (lo, hi);
    }
    let log = |v: f64| v.ln() / base.ln();
    (base.powf(log(lo).floor()), base.powf(log(hi).ceil()))
}

fn build_range(
    name: ScaleName,
    scale_type: ScaleType,
    domain: &[RawValue],
    marks: &[Mark],
    plot: &PlotOptions,
    options: &ScaleOptions,
) -> Vec<RawValue> {
    let numbers = |(a, b): (f64, f64)| vec![RawValue::Number(a), RawValue::Number(b)];

    let mut range = match &options.range {
        Some(range) => range.clone(),
        None => match name {
            ScaleName::X | ScaleName::Fx => numbers(plot.x_range()),
            ScaleName::Y | ScaleName::Fy => {
                let (bottom, top) = plot.y_range();
                if scale_type.is_ordinal() {
                    // first category at the top
                    numbers((top, bottom))
                } else {
                    numbers((bottom, top))
                }
            }
            ScaleName::Opacity => numbers((0.0, 1.0)),
            ScaleName::R => numbers((0.0, 10.0)),
            ScaleName::Length => numbers((0.0, 20.0)),
            ScaleName::Symbol => {
                let filled = marks.iter().any(|mark| {
                    mark.mark_type == MarkType::Dot
                        && mark.channels.contains_key(&Channel::Fill)
                        && !mark.channels.contains_key(&Channel::Stroke)
                });
                let palette = if filled { SYMBOLS_FILL } else { SYMBOLS_STROKE };
                palette.iter().map(|s| RawValue::from(*s)).collect()
            }
            ScaleName::Color => vec![],
        },
    };

    if options.reverse == Some(true) {
        range.reverse();
    }

    if matches!(scale_type, ScaleType::Ordinal | ScaleType::Categorical) && !range.is_empty() {
        range = (0..domain.len())
            .map(|i| range[i % range.len()].clone())
            .collect();
    }
    range
}

fn build_primitive(
    name: ScaleName,
    scale_type: ScaleType,
    domain: &[RawValue],
    range: &[RawValue],
    options: &ScaleOptions,
) -> Result<Arc<dyn ScalePrimitive>, TrellisScaleError> {
    match scale_type {
        ScaleType::Ordinal | ScaleType::Categorical => Ok(Arc::new(
            OrdinalScale::new(scale_type, domain.to_vec(), range.to_vec())
                .with_unknown(options.unknown.clone().unwrap_or_default()),
        )),
        ScaleType::Band => {
            let (r0, r1) = numeric_extent(name, range)?;
            let padding = options.padding.unwrap_or(BAND_PADDING);
            Ok(Arc::new(BandScale::band(
                domain.to_vec(),
                (r0, r1),
                options.padding_inner.unwrap_or(padding),
                options.padding_outer.unwrap_or(padding),
                options.align.unwrap_or(0.5),
            )?))
        }
        ScaleType::Point => {
            let (r0, r1) = numeric_extent(name, range)?;
            Ok(Arc::new(BandScale::point(
                domain.to_vec(),
                (r0, r1),
                options.padding.unwrap_or(POINT_PADDING),
                options.align.unwrap_or(0.5),
            )?))
        }
        _ if scale_type.is_continuous() => {
            let temporal = scale_type == ScaleType::Time || domain.iter().any(|d| d.is_date());
            let numbers: Vec<f64> = domain.iter().filter_map(|d| d.as_finite()).collect();
            if numbers.is_empty() {
                return Err(TrellisScaleError::EmptyDomain);
            }
            let mut output: Vec<f64> = range.iter().filter_map(|r| r.as_finite()).collect();
            if output.len() < 2 {
                return Err(TrellisScaleError::EmptyRange(name));
            }
            // spread a two-element range over a piecewise domain
            if output.len() == 2 && numbers.len() > 2 {
                let (r0, r1) = (output[0], output[1]);
                let n = numbers.len() - 1;
                output = (0..=n)
                    .map(|i| r0 + (r1 - r0) * i as f64 / n as f64)
                    .collect();
            }
            let negative = numbers.iter().all(|v| *v < 0.0);
            let transform = ContinuousTransform::for_scale(scale_type, options, negative);
            Ok(Arc::new(
                ContinuousScale::try_new(scale_type, transform, numbers, output)?
                    .with_clamp(options.clamp.unwrap_or(false))
                    .with_temporal(temporal),
            ))
        }
        _ => Err(TrellisScaleError::InvalidScaleType { scale: name, scale_type }),
    }
}

fn numeric_extent(name: ScaleName, range: &[RawValue]) -> Result<(f64, f64), TrellisScaleError> {
    match (range.first().and_then(|r| r.as_finite()), range.last().and_then(|r| r.as_finite())) {
        (Some(r0), Some(r1)) if range.len() >= 2 => Ok((r0, r1)),
        _ => Err(TrellisScaleError::EmptyRange(name)),
    }
}
