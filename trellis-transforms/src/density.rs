//! One-dimensional kernel density estimation.

use std::f64::consts::PI;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use trellis_common::{Channel, InternalKey};
use trellis_scales::array;

use crate::core::{ChannelUpdate, Transform, TransformArgs};
use crate::error::TrellisTransformError;
use crate::facet::facet_series_groups;

/// Densities at or below this are treated as zero when trimming
const TRIM_EPSILON: f64 = 1e-9;
const PADDING: f64 = 0.2;
const DEFAULT_STEPS: f64 = 100.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    Uniform,
    Triangular,
    #[default]
    Epanechnikov,
    Quartic,
    Triweight,
    Gaussian,
    Cosine,
}

impl Kernel {
    pub fn eval(&self, u: f64) -> f64 {
        if *self != Kernel::Gaussian && u.abs() > 1.0 {
            return 0.0;
        }
        match self {
            Kernel::Uniform => 0.5,
            Kernel::Triangular => 1.0 - u.abs(),
            Kernel::Epanechnikov => 0.75 * (1.0 - u * u),
            Kernel::Quartic => 15.0 / 16.0 * (1.0 - u * u).powi(2),
            Kernel::Triweight => 35.0 / 32.0 * (1.0 - u * u).powi(3),
            Kernel::Gaussian => (-0.5 * u * u).exp() / (2.0 * PI).sqrt(),
            Kernel::Cosine => PI / 4.0 * (PI / 2.0 * u).cos(),
        }
    }

    /// Ratio of this kernel's canonical bandwidth to the gaussian's, used to
    /// carry Silverman's rule over to other kernels
    fn silverman_factor(&self) -> f64 {
        match self {
            Kernel::Uniform => 1.3510,
            Kernel::Triangular => 1.8882,
            Kernel::Epanechnikov => 1.7188,
            Kernel::Quartic => 2.0362,
            Kernel::Triweight => 2.3122,
            Kernel::Gaussian => 1.0,
            Kernel::Cosine => 1.7663,
        }
    }
}

pub type BandwidthFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

#[derive(Clone, Default)]
pub enum Bandwidth {
    #[default]
    Silverman,
    Fixed(f64),
    /// Computed from each group's sample values
    Custom(BandwidthFn),
}

impl Debug for Bandwidth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Bandwidth::Silverman => write!(f, "Silverman"),
            Bandwidth::Fixed(bw) => write!(f, "Fixed({bw})"),
            Bandwidth::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Bandwidth {
    pub fn custom(f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
        Bandwidth::Custom(Arc::new(f))
    }

    fn compute(&self, values: &[f64], kernel: Kernel) -> Result<f64, TrellisTransformError> {
        let bw = match self {
            Bandwidth::Silverman => silverman(values) * kernel.silverman_factor(),
            Bandwidth::Fixed(bw) => *bw,
            Bandwidth::Custom(f) => f(values),
        };
        if bw.is_finite() && bw > 0.0 {
            Ok(bw)
        } else {
            Err(TrellisTransformError::InvalidOption(format!(
                "density bandwidth must be positive, got {bw}"
            )))
        }
    }
}

/// Silverman's rule of thumb for a gaussian kernel
pub fn silverman(values: &[f64]) -> f64 {
    let sorted = array::sorted_finite(values);
    let n = sorted.len() as f64;
    let sd = array::deviation(&sorted).unwrap_or(0.0);
    let iqr = match (
        array::quantile_sorted(&sorted, 0.75),
        array::quantile_sorted(&sorted, 0.25),
    ) {
        (Some(q3), Some(q1)) => q3 - q1,
        _ => 0.0,
    };
    let spread = [sd.min(iqr / 1.34), sd, sorted.first().map_or(0.0, |v| v.abs())]
        .into_iter()
        .find(|s| *s > 0.0)
        .unwrap_or(1.0);
    0.9 * spread * n.max(1.0).powf(-0.2)
}

#[derive(Debug, Clone)]
pub struct Density {
    /// Channel holding the samples
    channel: Channel,
    /// Channel receiving the estimated density
    output: Channel,
    kernel: Kernel,
    bandwidth: Bandwidth,
    interval: Option<f64>,
    trim: bool,
    cumulative: i8,
}

impl Density {
    /// Estimate the distribution of `x`; densities go to `y`
    pub fn x() -> Self {
        Self::new(Channel::X, Channel::Y)
    }

    /// Estimate the distribution of `y`; densities go to `x`
    pub fn y() -> Self {
        Self::new(Channel::Y, Channel::X)
    }

    fn new(channel: Channel, output: Channel) -> Self {
        Self {
            channel,
            output,
            kernel: Kernel::default(),
            bandwidth: Bandwidth::default(),
            interval: None,
            trim: false,
            cumulative: 0,
        }
    }

    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn bandwidth(mut self, bandwidth: Bandwidth) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Spacing between evaluation points
    pub fn interval(mut self, interval: f64) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Evaluate only over the data extent and drop zero runs at both ends
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// 1 for an ascending cumulative distribution, -1 for descending
    pub fn cumulative(mut self, cumulative: i8) -> Self {
        self.cumulative = cumulative.signum();
        self
    }

    fn evaluation_points(&self, lo: f64, hi: f64, bw: f64) -> Result<Vec<f64>, TrellisTransformError> {
        let pad = match (self.trim, hi > lo) {
            (true, _) => 0.0,
            (false, true) => (hi - lo) * PADDING,
            (false, false) => 3.0 * bw,
        };
        let (lo, hi) = (lo - pad, hi + pad);
        if hi <= lo {
            return Ok(vec![lo]);
        }
        let step = self.interval.unwrap_or((hi - lo) / DEFAULT_STEPS);
        if !(step.is_finite() && step > 0.0) {
            return Err(TrellisTransformError::InvalidOption(format!(
                "density interval must be positive, got {step}"
            )));
        }
        let count = ((hi - lo) / step + 1e-9).floor() as usize + 1;
        Ok((0..count).map(|k| lo + k as f64 * step).collect())
    }
}

/// Weighted kernel sum at each of `xs`
fn estimate(samples: &[(f64, f64)], xs: &[f64], bw: f64, kernel: Kernel) -> Vec<f64> {
    let total: f64 = samples.iter().map(|(_, w)| w).sum();
    xs.iter()
        .map(|&x| {
            samples
                .iter()
                .map(|&(v, w)| w * kernel.eval((x - v) / bw))
                .sum::<f64>()
                / (total * bw)
        })
        .collect()
}

/// Indices to keep once leading and trailing zeros are cut down to one each
fn trimmed_range(densities: &[f64]) -> std::ops::Range<usize> {
    let first = densities.iter().position(|d| *d > TRIM_EPSILON);
    let last = densities.iter().rposition(|d| *d > TRIM_EPSILON);
    match (first, last) {
        (Some(first), Some(last)) => first.saturating_sub(1)..(last + 2).min(densities.len()),
        _ => 0..densities.len(),
    }
}

/// Running trapezoid integral, normalized to end at 1
fn accumulate(xs: &[f64], densities: &[f64], descending: bool) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(densities.len());
    let mut acc = 0.0;
    for k in 0..densities.len() {
        if k > 0 {
            acc += (densities[k - 1] + densities[k]) / 2.0 * (xs[k] - xs[k - 1]);
        }
        cumulative.push(acc);
    }
    if acc > 0.0 {
        cumulative.iter_mut().for_each(|c| *c /= acc);
    }
    if descending {
        cumulative.iter_mut().for_each(|c| *c = 1.0 - *c);
    }
    cumulative
}

impl Transform for Density {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError> {
        let values = args.require("density", self.channel.clone())?;
        let values: Vec<f64> = values
            .iter()
            .map(|v| v.as_finite().unwrap_or(f64::NAN))
            .collect();
        let weights = if args.has_channel(&Channel::Weight) {
            Some(args.resolve_numbers(&Channel::Weight)?)
        } else {
            None
        };

        let sample_key = InternalKey::new("density_sample");
        let density_key = InternalKey::new("density");
        let mut data = Vec::new();

        for series in facet_series_groups(&args, &[self.output.clone()])? {
            let samples: Vec<(f64, f64)> = series
                .iter()
                .map(|&i| (values[i], weights.as_ref().map_or(1.0, |w| w[i])))
                .filter(|(v, w)| v.is_finite() && w.is_finite() && *w > 0.0)
                .collect();
            let Some((lo, hi)) = array::extent(samples.iter().map(|(v, _)| *v)) else {
                continue;
            };
            let sample_values: Vec<f64> = samples.iter().map(|(v, _)| *v).collect();
            let bw = self.bandwidth.compute(&sample_values, self.kernel)?;

            let mut xs = self.evaluation_points(lo, hi, bw)?;
            let mut densities = estimate(&samples, &xs, bw, self.kernel);
            if self.trim {
                let keep = trimmed_range(&densities);
                xs = xs[keep.clone()].to_vec();
                densities = densities[keep].to_vec();
            }
            if self.cumulative != 0 {
                densities = accumulate(&xs, &densities, self.cumulative < 0);
            }

            let first = series[0];
            data.extend(xs.into_iter().zip(densities).map(|(x, d)| {
                args.data[first]
                    .derive(first)
                    .with_field(sample_key, x)
                    .with_field(density_key, d)
            }));
        }

        Ok(TransformArgs {
            data,
            channels: ChannelUpdate::from_channels(&args.channels)
                .remove(&Channel::Weight)
                .column(self.channel.clone(), sample_key)
                .column(self.output.clone(), density_key)
                .finish(),
            sorted: args.sorted,
        })
    }
}
