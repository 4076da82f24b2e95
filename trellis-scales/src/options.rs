use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use trellis_common::{RawValue, ScaleName};

use crate::interval::Interval;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ScaleType {
    Linear,
    Pow,
    Sqrt,
    Log,
    Symlog,
    Time,
    Band,
    Point,
    Ordinal,
    Categorical,
    Threshold,
    Quantile,
    QuantileCont,
    Quantize,
    Diverging,
    DivergingLog,
    DivergingPow,
    DivergingSqrt,
    DivergingSymlog,
}

impl ScaleType {
    /// Types whose domain is a set of discrete values
    pub fn is_ordinal(&self) -> bool {
        matches!(
            self,
            ScaleType::Band | ScaleType::Point | ScaleType::Ordinal | ScaleType::Categorical
        )
    }

    /// Types whose domain is a numeric extent
    pub fn is_continuous(&self) -> bool {
        matches!(
            self,
            ScaleType::Linear
                | ScaleType::Pow
                | ScaleType::Sqrt
                | ScaleType::Log
                | ScaleType::Symlog
                | ScaleType::Time
                | ScaleType::QuantileCont
        ) || self.is_diverging()
    }

    pub fn is_diverging(&self) -> bool {
        matches!(
            self,
            ScaleType::Diverging
                | ScaleType::DivergingLog
                | ScaleType::DivergingPow
                | ScaleType::DivergingSqrt
                | ScaleType::DivergingSymlog
        )
    }

    /// Types that need every raw value, not only the unique ones
    pub fn needs_all_values(&self) -> bool {
        matches!(self, ScaleType::Quantile | ScaleType::QuantileCont)
    }
}

/// `nice: true` or a target tick count
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nice {
    Bool(bool),
    Count(f64),
}

impl Nice {
    pub fn count(&self) -> Option<f64> {
        match self {
            Nice::Bool(true) => Some(10.0),
            Nice::Bool(false) => None,
            Nice::Count(n) => Some(*n),
        }
    }
}

/// A color scheme: a named scheme, an explicit list of colors, or a value-to-color map
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SchemeSpec {
    Named(String),
    Colors(Vec<String>),
    Mapped(IndexMap<String, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InterpolateSpace {
    #[default]
    Rgb,
    Lab,
    Hsl,
}

/// Per-scale overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleOptions {
    #[serde(rename = "type")]
    pub scale_type: Option<ScaleType>,
    pub domain: Option<Vec<RawValue>>,
    pub range: Option<Vec<RawValue>>,
    pub nice: Option<Nice>,
    pub zero: Option<bool>,
    pub padding: Option<f64>,
    pub padding_inner: Option<f64>,
    pub padding_outer: Option<f64>,
    pub align: Option<f64>,
    pub clamp: Option<bool>,
    pub reverse: Option<bool>,
    /// `false` keeps ordinal domains in first-seen order
    pub sort: Option<bool>,
    pub interval: Option<Interval>,
    pub scheme: Option<SchemeSpec>,
    pub pivot: Option<f64>,
    /// Number of classes for quantile and quantize scales
    pub n: Option<usize>,
    pub unknown: Option<RawValue>,
    pub interpolate: Option<InterpolateSpace>,
    pub exponent: Option<f64>,
    pub base: Option<f64>,
    pub constant: Option<f64>,
}

impl ScaleOptions {
    pub fn scale_type(mut self, scale_type: ScaleType) -> Self {
        self.scale_type = Some(scale_type);
        self
    }

    pub fn domain(mut self, domain: impl IntoIterator<Item = impl Into<RawValue>>) -> Self {
        self.domain = Some(domain.into_iter().map(Into::into).collect());
        self
    }

    pub fn range(mut self, range: impl IntoIterator<Item = impl Into<RawValue>>) -> Self {
        self.range = Some(range.into_iter().map(Into::into).collect());
        self
    }

    pub fn nice(mut self, nice: bool) -> Self {
        self.nice = Some(Nice::Bool(nice));
        self
    }

    pub fn zero(mut self, zero: bool) -> Self {
        self.zero = Some(zero);
        self
    }

    pub fn padding(mut self, padding: f64) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn clamp(mut self, clamp: bool) -> Self {
        self.clamp = Some(clamp);
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = Some(reverse);
        self
    }

    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn scheme(mut self, scheme: SchemeSpec) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn pivot(mut self, pivot: f64) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn n(mut self, n: usize) -> Self {
        self.n = Some(n);
        self
    }

    pub fn unknown(mut self, unknown: impl Into<RawValue>) -> Self {
        self.unknown = Some(unknown.into());
        self
    }

    /// True when the user configured anything that should keep the scale alive
    /// without contributing marks
    pub fn is_explicit(&self) -> bool {
        self.scale_type.is_some() || self.domain.is_some()
    }
}

/// Plot-level layout and scale configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlotOptions {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub inset_top: f64,
    pub inset_right: f64,
    pub inset_bottom: f64,
    pub inset_left: f64,
    pub scales: IndexMap<ScaleName, ScaleOptions>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 400.0,
            margin_top: 30.0,
            margin_right: 20.0,
            margin_bottom: 30.0,
            margin_left: 40.0,
            inset_top: 0.0,
            inset_right: 0.0,
            inset_bottom: 0.0,
            inset_left: 0.0,
            scales: IndexMap::new(),
        }
    }
}

impl PlotOptions {
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn margins(mut self, top: f64, right: f64, bottom: f64, left: f64) -> Self {
        self.margin_top = top;
        self.margin_right = right;
        self.margin_bottom = bottom;
        self.margin_left = left;
        self
    }

    pub fn insets(mut self, top: f64, right: f64, bottom: f64, left: f64) -> Self {
        self.inset_top = top;
        self.inset_right = right;
        self.inset_bottom = bottom;
        self.inset_left = left;
        self
    }

    pub fn scale(mut self, name: ScaleName, options: ScaleOptions) -> Self {
        self.scales.insert(name, options);
        self
    }

    pub fn scale_options(&self, name: ScaleName) -> Option<&ScaleOptions> {
        self.scales.get(&name)
    }

    /// Horizontal pixel extent available to marks
    pub fn x_range(&self) -> (f64, f64) {
        (
            self.margin_left + self.inset_left,
            self.width - self.margin_right - self.inset_right,
        )
    }

    /// Vertical pixel extent, bottom to top
    pub fn y_range(&self) -> (f64, f64) {
        (
            self.height - self.margin_bottom - self.inset_bottom,
            self.margin_top + self.inset_top,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_plot_defaults() {
        let plot = PlotOptions::default();
        assert_eq!(plot.x_range(), (40.0, 620.0));
        assert_eq!(plot.y_range(), (370.0, 30.0));
    }

    #[test]
    fn test_deserialize_plot_options() {
        let plot: PlotOptions = serde_json::from_str(
            r#"{
                "width": 500,
                "marginLeft": 10,
                "scales": {
                    "x": {"type": "band", "padding": 0.2},
                    "color": {"scheme": "blues", "interval": "month"},
                    "y": {"nice": 5, "domain": [0, 100]}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(plot.width, 500.0);
        assert_eq!(plot.height, 400.0);
        assert_eq!(plot.x_range(), (10.0, 480.0));

        let x = plot.scale_options(ScaleName::X).unwrap();
        assert_eq!(x.scale_type, Some(ScaleType::Band));
        assert_eq!(x.padding, Some(0.2));

        let color = plot.scale_options(ScaleName::Color).unwrap();
        assert_eq!(color.scheme, Some(SchemeSpec::Named("blues".to_string())));
        assert!(color.interval.is_some());

        let y = plot.scale_options(ScaleName::Y).unwrap();
        assert_eq!(y.nice.and_then(|n| n.count()), Some(5.0));
        assert_eq!(
            y.domain,
            Some(vec![RawValue::from(0.0), RawValue::from(100.0)])
        );
    }

    #[test]
    fn test_scale_type_names() {
        assert_eq!(ScaleType::from_str("quantile-cont"), Ok(ScaleType::QuantileCont));
        assert_eq!(ScaleType::DivergingLog.to_string(), "diverging-log");
        assert!(ScaleType::from_str("radial").is_err());
        assert!(ScaleType::Band.is_ordinal());
        assert!(ScaleType::DivergingSqrt.is_continuous());
    }
}
