//! Bin transform: buckets quantitative or temporal values on x, y, or both, and
//! reduces each occupied bin.

use std::collections::BTreeMap;
use std::str::FromStr;

use indexmap::IndexMap;
use trellis_common::{Channel, DataRecord, InternalKey, RawValue};
use trellis_scales::array::{self, bisect_right, nice, tick_increment, ticks};
use trellis_scales::interval::{tick_interval, Interval};

use crate::core::{ChannelUpdate, Transform, TransformArgs};
use crate::error::TrellisTransformError;
use crate::facet::facet_series_groups;
use crate::reducer::Reducer;

const MAX_AUTO_BINS: usize = 200;

/// How bin edges are chosen
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Thresholds {
    /// Scott's rule, capped at 200 bins
    #[default]
    Auto,
    Scott,
    Sturges,
    FreedmanDiaconis,
    /// An approximate bin count, niced into round edges
    Count(usize),
    /// Explicit inner edges; the data extent provides the outer edges
    Values(Vec<f64>),
    /// Fixed-width (or calendar) boundaries; the data extent provides the outer edges
    Interval(Interval),
}

impl FromStr for Thresholds {
    type Err = TrellisTransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Thresholds::Auto),
            "scott" => Ok(Thresholds::Scott),
            "sturges" => Ok(Thresholds::Sturges),
            "freedman-diaconis" | "freedmandiaconis" => Ok(Thresholds::FreedmanDiaconis),
            other => other
                .parse::<usize>()
                .map(Thresholds::Count)
                .map_err(|_| TrellisTransformError::InvalidOption(format!("thresholds: {s}"))),
        }
    }
}

fn scott(values: &[f64], lo: f64, hi: f64) -> usize {
    let n = values.len() as f64;
    match array::deviation(values) {
        Some(d) if d > 0.0 => ((hi - lo) * n.cbrt() / (3.49 * d)).ceil().max(1.0) as usize,
        _ => 1,
    }
}

fn sturges(values: &[f64]) -> usize {
    let n = values.len() as f64;
    ((n.log2().ceil() + 1.0).max(1.0)) as usize
}

fn freedman_diaconis(values: &[f64], lo: f64, hi: f64) -> usize {
    let sorted = array::sorted_finite(values);
    let iqr = match (
        array::quantile_sorted(&sorted, 0.75),
        array::quantile_sorted(&sorted, 0.25),
    ) {
        (Some(q3), Some(q1)) => q3 - q1,
        _ => 0.0,
    };
    let n = sorted.len() as f64;
    if iqr > 0.0 && n > 0.0 {
        ((hi - lo) / (2.0 * iqr * n.powf(-1.0 / 3.0))).ceil().max(1.0) as usize
    } else {
        1
    }
}

/// Interval boundaries strictly inside the data, with the data extent as the
/// outer edges
fn interval_edges(interval: &Interval, lo: f64, hi: f64) -> Vec<f64> {
    let mut edges = vec![lo];
    edges.extend(interval.range(lo, hi).into_iter().filter(|t| *t > lo));
    edges.push(hi);
    edges
}

impl Thresholds {
    /// Bin edges for `values`, outer edges included. `temporal` values are epoch
    /// milliseconds and get calendar-aligned edges when binned by count. `None`
    /// when there is no finite value.
    pub fn edges(&self, values: &[f64], temporal: bool) -> Option<Vec<f64>> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (lo, hi) = array::extent(finite.iter().copied())?;

        let count = match self {
            Thresholds::Interval(interval) => return Some(interval_edges(interval, lo, hi)),
            Thresholds::Values(thresholds) => {
                let mut inner = array::sorted_finite(thresholds);
                inner.retain(|t| *t > lo && *t <= hi);
                let mut edges = Vec::with_capacity(inner.len() + 2);
                edges.push(lo);
                edges.extend(inner);
                edges.push(hi);
                return Some(edges);
            }
            Thresholds::Auto => scott(&finite, lo, hi).min(MAX_AUTO_BINS),
            Thresholds::Scott => scott(&finite, lo, hi),
            Thresholds::Sturges => sturges(&finite),
            Thresholds::FreedmanDiaconis => freedman_diaconis(&finite, lo, hi),
            Thresholds::Count(n) => (*n).max(1),
        };

        if lo == hi {
            return Some(vec![lo, hi]);
        }
        if temporal {
            if let Some(interval) = tick_interval(lo, hi, count as f64) {
                return Some(interval_edges(&interval, lo, hi));
            }
        }
        Some(count_edges(lo, hi, count as f64))
    }
}

/// Niced edges for an approximate bin count. When the last tick lands on the
/// maximum the upper edge is pushed one step further so the maximum gets a bin of
/// its own width.
fn count_edges(lo: f64, hi: f64, count: f64) -> Vec<f64> {
    let (x0, mut x1) = nice(lo, hi, count);
    let mut inner = ticks(x0, x1, count);
    if inner.last().map(|t| *t >= x1).unwrap_or(false) {
        if hi >= x1 {
            let step = tick_increment(x0, x1, count);
            if step.is_finite() {
                if step > 0.0 {
                    x1 = ((x1 / step).floor() + 1.0) * step;
                } else if step < 0.0 {
                    x1 = ((x1 * -step).ceil() + 1.0) / -step;
                }
            }
        } else {
            inner.pop();
        }
    }
    inner.retain(|t| *t > x0 && *t <= x1);

    let mut edges = Vec::with_capacity(inner.len() + 2);
    edges.push(x0);
    edges.extend(inner);
    edges.push(x1);
    edges
}

/// Index of the bin holding `x`, if it falls within the edges
fn bin_index(edges: &[f64], x: f64) -> Option<usize> {
    let (first, last) = (*edges.first()?, *edges.last()?);
    if !x.is_finite() || x < first || x > last {
        return None;
    }
    Some(bisect_right(&edges[1..edges.len() - 1], x))
}

#[derive(Debug, Clone, Default)]
pub struct BinOptions {
    pub thresholds: Thresholds,
    /// 1 accumulates ascending, -1 descending, 0 not at all
    pub cumulative: i8,
}

/// The swept dimension of a bin: its input channel and output channels
#[derive(Debug, Clone)]
struct BinDim {
    channel: Channel,
    lo: Channel,
    hi: Channel,
}

const X_DIM: BinDim = BinDim {
    channel: Channel::X,
    lo: Channel::X1,
    hi: Channel::X2,
};

const Y_DIM: BinDim = BinDim {
    channel: Channel::Y,
    lo: Channel::Y1,
    hi: Channel::Y2,
};

/// Edges computed once over all data for one dimension
struct DimEdges {
    dim: BinDim,
    edges: Vec<f64>,
    /// A sample input value, used to rebuild dates from numeric edges
    sample: RawValue,
    values: Vec<f64>,
    keys: (InternalKey, InternalKey, InternalKey),
}

impl DimEdges {
    fn edge(&self, i: usize) -> RawValue {
        self.sample.with_number(self.edges[i])
    }

    fn mid(&self, i: usize) -> RawValue {
        self.sample
            .with_number((self.edges[i] + self.edges[i + 1]) / 2.0)
    }

    fn write(&self, record: &mut DataRecord, i: usize) {
        let (lo, hi, mid) = self.keys;
        record.insert(lo, self.edge(i));
        record.insert(hi, self.edge(i + 1));
        record.insert(mid, self.mid(i));
    }

    fn bin_count(&self) -> usize {
        self.edges.len() - 1
    }
}

/// Bins on x (`bin_x`), y (`bin_y`) or both, reducing each occupied bin
#[derive(Debug, Clone)]
pub struct Bin {
    x: Option<BinOptions>,
    y: Option<BinOptions>,
    outputs: IndexMap<Channel, Reducer>,
}

impl Bin {
    fn new(
        x: Option<BinOptions>,
        y: Option<BinOptions>,
        outputs: impl IntoIterator<Item = (Channel, Reducer)>,
        default_output: Channel,
    ) -> Self {
        let mut outputs: IndexMap<Channel, Reducer> = outputs.into_iter().collect();
        if outputs.is_empty() {
            outputs.insert(default_output, Reducer::count());
        }
        Self { x, y, outputs }
    }

    /// Bin on x; outputs default to a count on y
    pub fn x(outputs: impl IntoIterator<Item = (Channel, Reducer)>) -> Self {
        Self::new(Some(BinOptions::default()), None, outputs, Channel::Y)
    }

    /// Bin on y; outputs default to a count on x
    pub fn y(outputs: impl IntoIterator<Item = (Channel, Reducer)>) -> Self {
        Self::new(None, Some(BinOptions::default()), outputs, Channel::X)
    }

    /// Bin on both x and y; outputs default to a count on fill
    pub fn xy(outputs: impl IntoIterator<Item = (Channel, Reducer)>) -> Self {
        Self::new(
            Some(BinOptions::default()),
            Some(BinOptions::default()),
            outputs,
            Channel::Fill,
        )
    }

    /// Use `thresholds` for every binned dimension
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        for options in [&mut self.x, &mut self.y].into_iter().flatten() {
            options.thresholds = thresholds.clone();
        }
        self
    }

    pub fn thresholds_x(mut self, thresholds: Thresholds) -> Self {
        if let Some(options) = &mut self.x {
            options.thresholds = thresholds;
        }
        self
    }

    pub fn thresholds_y(mut self, thresholds: Thresholds) -> Self {
        if let Some(options) = &mut self.y {
            options.thresholds = thresholds;
        }
        self
    }

    pub fn cumulative(mut self, cumulative: i8) -> Self {
        for options in [&mut self.x, &mut self.y].into_iter().flatten() {
            options.cumulative = cumulative.signum();
        }
        self
    }

    fn dim_edges(
        &self,
        args: &TransformArgs,
        dim: BinDim,
        options: &BinOptions,
    ) -> Result<Option<DimEdges>, TrellisTransformError> {
        let raw = args.require("bin", dim.channel.clone())?;
        let temporal = raw.iter().any(|v| v.is_date());
        let values: Vec<f64> = raw.iter().map(|v| v.as_finite().unwrap_or(f64::NAN)).collect();
        let sample = raw
            .iter()
            .find(|v| v.as_finite().is_some())
            .cloned()
            .unwrap_or_default();
        Ok(options
            .thresholds
            .edges(&values, temporal)
            .map(|edges| DimEdges {
                dim,
                edges,
                sample,
                values,
                keys: (
                    InternalKey::new("bin_lo"),
                    InternalKey::new("bin_hi"),
                    InternalKey::new("bin_mid"),
                ),
            }))
    }
}

impl Transform for Bin {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError> {
        let mut dims = Vec::new();
        let mut cumulative = 0;
        for (dim, options) in [(X_DIM, &self.x), (Y_DIM, &self.y)] {
            if let Some(options) = options {
                cumulative = options.cumulative;
                dims.push(self.dim_edges(&args, dim, options)?);
            }
        }
        if dims.len() > 1 && cumulative != 0 {
            return Err(TrellisTransformError::InvalidOption(
                "cumulative binning is only supported in one dimension".to_string(),
            ));
        }

        let mut outputs = Vec::with_capacity(self.outputs.len());
        for (channel, reducer) in &self.outputs {
            let values = if reducer.is_count() {
                None
            } else {
                Some(args.require("bin", channel.clone())?)
            };
            outputs.push((channel.clone(), reducer, values, InternalKey::new("bin_output")));
        }

        let mut update = ChannelUpdate::from_channels(&args.channels);
        for dim in dims.iter().flatten() {
            let (lo, hi, mid) = dim.keys;
            update = update
                .remove(&dim.dim.channel)
                .column(dim.dim.lo.clone(), lo)
                .column(dim.dim.hi.clone(), hi)
                .column(dim.dim.channel.clone(), mid);
        }
        for (channel, _, _, key) in &outputs {
            update = update.column(channel.clone(), *key);
        }
        let channels = update.finish();

        // a dimension without any finite value leaves nothing to bin
        let Some(dims) = dims.into_iter().collect::<Option<Vec<DimEdges>>>() else {
            return Ok(TransformArgs {
                data: vec![],
                channels,
                sorted: args.sorted,
            });
        };

        let exclude: Vec<Channel> = self.outputs.keys().cloned().collect();
        let mut data = Vec::new();
        for group in facet_series_groups(&args, &exclude)? {
            let mut bins: BTreeMap<Vec<usize>, Vec<usize>> = BTreeMap::new();
            'records: for &i in &group {
                let mut key = Vec::with_capacity(dims.len());
                for dim in &dims {
                    match bin_index(&dim.edges, dim.values[i]) {
                        Some(b) => key.push(b),
                        None => continue 'records,
                    }
                }
                bins.entry(key).or_default().push(i);
            }

            let bins = if cumulative != 0 {
                accumulate(&bins, dims[0].bin_count(), cumulative)
            } else {
                bins
            };

            for (key, members) in bins {
                let first = members[0];
                let mut record = args.data[first].derive(first);
                for (dim, &b) in dims.iter().zip(&key) {
                    dim.write(&mut record, b);
                }
                for (_, reducer, values, out_key) in &outputs {
                    let value = match values {
                        Some(values) => {
                            let group: Vec<RawValue> =
                                members.iter().map(|&m| values[m].clone()).collect();
                            reducer.reduce(&group)
                        }
                        None => RawValue::Number(members.len() as f64),
                    };
                    record.insert(*out_key, value);
                }
                data.push(record);
            }
        }

        Ok(TransformArgs {
            data,
            channels,
            sorted: args.sorted,
        })
    }
}

/// Cumulative bins: every bin holds the members of all bins before it (ascending)
/// or after it (descending), itself included
fn accumulate(
    bins: &BTreeMap<Vec<usize>, Vec<usize>>,
    bin_count: usize,
    direction: i8,
) -> BTreeMap<Vec<usize>, Vec<usize>> {
    let mut result = BTreeMap::new();
    let mut running: Vec<usize> = Vec::new();
    let order: Vec<usize> = if direction > 0 {
        (0..bin_count).collect()
    } else {
        (0..bin_count).rev().collect()
    };
    for b in order {
        if let Some(members) = bins.get(&vec![b]) {
            running.extend(members);
        }
        if !running.is_empty() {
            let mut members = running.clone();
            members.sort_unstable();
            result.insert(vec![b], members);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use trellis_scales::TimeUnit;

    #[test]
    fn test_auto_edges() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(
            Thresholds::Auto.edges(&values, false),
            Some(vec![0.0, 2.0, 4.0, 6.0])
        );
    }

    #[test]
    fn test_max_on_edge_gets_extra_bin() {
        let values = [0.0, 10.0];
        let edges = Thresholds::Count(2).edges(&values, false).unwrap();
        assert_eq!(edges, vec![0.0, 5.0, 10.0, 15.0]);
        assert_eq!(bin_index(&edges, 10.0), Some(2));
    }

    #[test]
    fn test_explicit_thresholds_keep_extent() {
        let values = [0.5, 3.0, 9.5];
        let edges = Thresholds::Values(vec![-1.0, 5.0, 2.0, 20.0])
            .edges(&values, false)
            .unwrap();
        assert_eq!(edges, vec![0.5, 2.0, 5.0, 9.5]);
    }

    #[test]
    fn test_interval_edges() -> Result<(), TrellisTransformError> {
        let values = [0.3, 2.5, 4.1];
        let edges = Thresholds::Interval(Interval::step(2.0)?)
            .edges(&values, false)
            .unwrap();
        assert_eq!(edges, vec![0.3, 2.0, 4.0, 4.1]);

        let day = 86_400_000.0;
        let values = [day * 0.5, day * 2.5];
        let edges = Thresholds::Interval(Interval::time(TimeUnit::Day, 1))
            .edges(&values, true)
            .unwrap();
        assert_eq!(edges, vec![day * 0.5, day, day * 2.0, day * 2.5]);

        // a maximum on a boundary stays in the last bin
        let edges = Thresholds::Interval(Interval::step(2.0)?)
            .edges(&[1.0, 4.0], false)
            .unwrap();
        assert_eq!(edges, vec![1.0, 2.0, 4.0]);
        assert_eq!(bin_index(&edges, 4.0), Some(1));
        Ok(())
    }

    #[rstest]
    #[case("auto", Thresholds::Auto)]
    #[case("Sturges", Thresholds::Sturges)]
    #[case("freedman-diaconis", Thresholds::FreedmanDiaconis)]
    #[case("12", Thresholds::Count(12))]
    fn test_parse_thresholds(#[case] s: &str, #[case] expected: Thresholds) {
        assert_eq!(s.parse::<Thresholds>().unwrap(), expected);
    }

    #[test]
    fn test_generators() {
        let values: Vec<f64> = (0..100).map(|v| v as f64).collect();
        assert_eq!(sturges(&values), 8);
        assert!(scott(&values, 0.0, 99.0) > 1);
        assert!(freedman_diaconis(&values, 0.0, 99.0) > 1);
        assert_eq!(scott(&[3.0, 3.0], 3.0, 3.0), 1);
    }

    #[test]
    fn test_accumulate() {
        let mut bins = BTreeMap::new();
        bins.insert(vec![0], vec![0]);
        bins.insert(vec![2], vec![1, 2]);
        let up = accumulate(&bins, 3, 1);
        assert_eq!(up[&vec![1]], vec![0]);
        assert_eq!(up[&vec![2]], vec![0, 1, 2]);
        let down = accumulate(&bins, 3, -1);
        assert_eq!(down[&vec![0]], vec![0, 1, 2]);
        assert_eq!(down[&vec![1]], vec![1, 2]);
    }
}
