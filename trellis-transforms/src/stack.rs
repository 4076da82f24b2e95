//! Stack transform for creating stacked visualizations

use std::str::FromStr;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use trellis_common::{Channel, InternalKey, RawValue};

use crate::core::{ChannelUpdate, Transform, TransformArgs};
use crate::error::TrellisTransformError;
use crate::facet::{facet_groups, group_indices, series_values};

/// Ordering of series within each stack
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StackOrder {
    /// Input order
    #[default]
    None,
    /// Ascending series total, smallest at the baseline
    Sum,
    /// Order of first occurrence in the data
    Appearance,
    /// Series peaking earliest innermost, balancing totals on either side
    InsideOut,
    /// Explicit series order; unlisted series follow in order of appearance
    Domain(Vec<RawValue>),
}

impl FromStr for StackOrder {
    type Err = TrellisTransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "null" => Ok(StackOrder::None),
            "sum" | "ascending" => Ok(StackOrder::Sum),
            "appearance" => Ok(StackOrder::Appearance),
            "inside-out" | "insideout" => Ok(StackOrder::InsideOut),
            _ => Err(TrellisTransformError::InvalidOption(format!(
                "stack order: {s}"
            ))),
        }
    }
}

/// Baseline policy applied to each stack
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum StackOffset {
    /// Running sum from zero
    #[default]
    Zero,
    /// Streamgraph baseline minimizing the weighted change in slope
    Wiggle,
    #[strum(serialize = "center", serialize = "silhouette")]
    #[serde(alias = "silhouette")]
    Center,
    /// Each stack spans [0, 1]
    Normalize,
    /// Positive values stack up from zero, negative values down
    Diverging,
}

/// Stacking axis: the channel being stacked and the channel defining buckets
#[derive(Debug, Clone)]
struct StackDim {
    value: Channel,
    bucket: Channel,
    lo: Channel,
    hi: Channel,
}

#[derive(Debug, Clone)]
pub struct Stack {
    dim: StackDim,
    order: StackOrder,
    offset: StackOffset,
    reverse: bool,
}

impl Stack {
    fn new(dim: StackDim) -> Self {
        Self {
            dim,
            order: StackOrder::None,
            offset: StackOffset::Zero,
            reverse: false,
        }
    }

    /// Stack y values within x buckets
    pub fn y() -> Self {
        Self::new(StackDim {
            value: Channel::Y,
            bucket: Channel::X,
            lo: Channel::Y1,
            hi: Channel::Y2,
        })
    }

    /// Stack x values within y buckets
    pub fn x() -> Self {
        Self::new(StackDim {
            value: Channel::X,
            bucket: Channel::Y,
            lo: Channel::X1,
            hi: Channel::X2,
        })
    }

    pub fn order(mut self, order: StackOrder) -> Self {
        self.order = order;
        self
    }

    pub fn offset(mut self, offset: StackOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Reverse the computed order
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

/// Series ranks for grouped stacking, from the configured order policy
fn series_order(
    order: &StackOrder,
    indices: &[usize],
    series: &[RawValue],
    buckets: &IndexMap<RawValue, Vec<usize>>,
    values: &[f64],
) -> Vec<RawValue> {
    let mut keys: IndexMap<RawValue, f64> = IndexMap::new();
    for &i in indices {
        let sum = keys.entry(series[i].clone()).or_insert(0.0);
        if values[i].is_finite() {
            *sum += values[i];
        }
    }

    match order {
        StackOrder::None | StackOrder::Appearance => keys.into_keys().collect(),
        StackOrder::Sum => {
            let mut keys: Vec<(RawValue, f64)> = keys.into_iter().collect();
            keys.sort_by_key(|(_, sum)| OrderedFloat(*sum));
            keys.into_iter().map(|(k, _)| k).collect()
        }
        StackOrder::InsideOut => {
            // bucket position of each series' peak
            let mut peaks: IndexMap<RawValue, (usize, f64)> = IndexMap::new();
            for (j, members) in buckets.values().enumerate() {
                for &i in members {
                    let v = values[i];
                    let peak = peaks
                        .entry(series[i].clone())
                        .or_insert((j, f64::NEG_INFINITY));
                    if v.is_finite() && v > peak.1 {
                        *peak = (j, v);
                    }
                }
            }
            let mut by_peak: Vec<(RawValue, usize)> =
                peaks.into_iter().map(|(k, (j, _))| (k, j)).collect();
            by_peak.sort_by_key(|(_, j)| *j);

            let (mut top, mut bottom) = (0.0, 0.0);
            let (mut tops, mut bottoms) = (Vec::new(), Vec::new());
            for (key, _) in by_peak {
                let sum = keys.get(&key).copied().unwrap_or(0.0);
                if top < bottom {
                    top += sum;
                    tops.push(key);
                } else {
                    bottom += sum;
                    bottoms.push(key);
                }
            }
            bottoms.reverse();
            bottoms.extend(tops);
            bottoms
        }
        StackOrder::Domain(domain) => {
            let mut ordered: Vec<RawValue> = domain
                .iter()
                .filter(|k| keys.contains_key(*k))
                .cloned()
                .collect();
            ordered.extend(keys.into_keys().filter(|k| !domain.contains(k)));
            ordered
        }
    }
}

/// Baseline of every bucket for the wiggle offset. `matrix[i][j]` is the value
/// of the i-th ordered series in bucket j.
fn wiggle_baselines(matrix: &[Vec<f64>], bucket_count: usize) -> Vec<f64> {
    let mut baselines = vec![0.0; bucket_count];
    if bucket_count == 0 {
        return baselines;
    }
    let mut y = 0.0;
    for j in 1..bucket_count {
        let (mut s1, mut s2) = (0.0, 0.0);
        for (i, row) in matrix.iter().enumerate() {
            let (sij0, sij1) = (row[j], row[j - 1]);
            let mut s3 = (sij0 - sij1) / 2.0;
            for prev in &matrix[..i] {
                s3 += prev[j] - prev[j - 1];
            }
            s1 += sij0;
            s2 += s3 * sij0;
        }
        baselines[j - 1] = y;
        if s1 != 0.0 {
            y -= s2 / s1;
        }
    }
    baselines[bucket_count - 1] = y;
    baselines
}

impl Transform for Stack {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError> {
        let n = args.data.len();
        let values = if args.has_channel(&self.dim.value) {
            args.resolve_numbers(&self.dim.value)?
        } else {
            vec![1.0; n]
        };
        let buckets = args.resolve(&self.dim.bucket)?;
        let series = series_values(&args, &[])?;

        let mut lows = vec![f64::NAN; n];
        let mut highs = vec![f64::NAN; n];

        for indices in facet_groups(&args)?.into_values() {
            let bucket_groups = group_indices(&indices, &buckets);

            let grouped = series.as_ref().filter(|series| {
                bucket_groups.values().all(|members| {
                    let mut seen = indexmap::IndexSet::new();
                    members.iter().all(|&i| seen.insert(&series[i]))
                })
            });
            log::debug!(
                "stack: {} stacking over {} buckets",
                if grouped.is_some() { "grouped" } else { "unit" },
                bucket_groups.len()
            );

            let mut offset = self.offset;
            if offset == StackOffset::Wiggle && grouped.is_none() {
                log::warn!("stack: wiggle offset needs consistent series, using center instead");
                offset = StackOffset::Center;
            }

            let order = grouped
                .map(|series| series_order(&self.order, &indices, series, &bucket_groups, &values));

            // per-bucket stacking order
            let mut stacks: Vec<Vec<usize>> = match (grouped, &order) {
                (Some(series), Some(order)) if self.order != StackOrder::None => {
                    let rank: IndexMap<&RawValue, usize> =
                        order.iter().enumerate().map(|(r, k)| (k, r)).collect();
                    bucket_groups
                        .values()
                        .map(|members| {
                            let mut members = members.clone();
                            members.sort_by_key(|&i| rank.get(&series[i]).copied());
                            members
                        })
                        .collect()
                }
                _ => bucket_groups
                    .values()
                    .map(|members| {
                        let mut members = members.clone();
                        match (&self.order, &series) {
                            (StackOrder::Sum, _) => {
                                members.sort_by_key(|&i| OrderedFloat(values[i]));
                            }
                            (StackOrder::Domain(domain), Some(series)) => {
                                members.sort_by_key(|&i| {
                                    domain
                                        .iter()
                                        .position(|d| *d == series[i])
                                        .unwrap_or(domain.len())
                                });
                            }
                            _ => {}
                        }
                        members
                    })
                    .collect(),
            };
            if self.reverse {
                for stack in &mut stacks {
                    stack.reverse();
                }
            }

            for stack in &stacks {
                let (mut positive, mut negative) = (0.0, 0.0);
                for &i in stack {
                    let v = values[i];
                    if !v.is_finite() {
                        continue;
                    }
                    let acc = if offset == StackOffset::Diverging && v < 0.0 {
                        &mut negative
                    } else {
                        &mut positive
                    };
                    lows[i] = *acc;
                    *acc += v;
                    highs[i] = *acc;
                }
            }

            match offset {
                StackOffset::Normalize | StackOffset::Center => {
                    for stack in &stacks {
                        let finite = stack.iter().filter(|&&i| lows[i].is_finite());
                        let Some((lo, hi)) = trellis_scales::array::extent(
                            finite.flat_map(|&i| [lows[i], highs[i]]),
                        ) else {
                            continue;
                        };
                        for &i in stack {
                            if offset == StackOffset::Normalize {
                                if hi > lo {
                                    lows[i] = (lows[i] - lo) / (hi - lo);
                                    highs[i] = (highs[i] - lo) / (hi - lo);
                                }
                            } else {
                                let shift = (lo + hi) / 2.0;
                                lows[i] -= shift;
                                highs[i] -= shift;
                            }
                        }
                    }
                }
                StackOffset::Wiggle => {
                    if let (Some(series), Some(order)) = (grouped, &order) {
                        let mut matrix: Vec<Vec<f64>> = order
                            .iter()
                            .map(|key| {
                                bucket_groups
                                    .values()
                                    .map(|members| {
                                        members
                                            .iter()
                                            .find(|&&i| series[i] == *key)
                                            .map(|&i| values[i])
                                            .filter(|v| v.is_finite())
                                            .unwrap_or(0.0)
                                    })
                                    .collect()
                            })
                            .collect();
                        if self.reverse {
                            matrix.reverse();
                        }
                        let baselines = wiggle_baselines(&matrix, stacks.len());
                        for (stack, baseline) in stacks.iter().zip(baselines) {
                            for &i in stack {
                                lows[i] += baseline;
                                highs[i] += baseline;
                            }
                        }
                    }
                }
                StackOffset::Zero | StackOffset::Diverging => {}
            }
        }

        let (lo_key, hi_key, mid_key) = (
            InternalKey::new("stack_lo"),
            InternalKey::new("stack_hi"),
            InternalKey::new("stack_mid"),
        );
        let data = args
            .data
            .iter()
            .enumerate()
            .map(|(i, record)| {
                record
                    .derive(i)
                    .with_field(lo_key, lows[i])
                    .with_field(hi_key, highs[i])
                    .with_field(mid_key, (lows[i] + highs[i]) / 2.0)
            })
            .collect();
        let channels = ChannelUpdate::from_channels(&args.channels)
            .column(self.dim.lo.clone(), lo_key)
            .column(self.dim.hi.clone(), hi_key)
            .column(self.dim.value.clone(), mid_key)
            .finish();

        Ok(TransformArgs {
            data,
            channels,
            sorted: args.sorted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case("sum", StackOrder::Sum)]
    #[case("Inside-Out", StackOrder::InsideOut)]
    #[case("appearance", StackOrder::Appearance)]
    fn test_parse_order(#[case] s: &str, #[case] expected: StackOrder) {
        assert_eq!(s.parse::<StackOrder>().unwrap(), expected);
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!("silhouette".parse::<StackOffset>().unwrap(), StackOffset::Center);
        assert_eq!("wiggle".parse::<StackOffset>().unwrap(), StackOffset::Wiggle);
        assert!("sideways".parse::<StackOffset>().is_err());
    }

    #[test]
    fn test_wiggle_baselines_flat_series() {
        // constant series do not move the baseline
        let matrix = vec![vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0]];
        assert_eq!(wiggle_baselines(&matrix, 3), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_wiggle_baselines_growing_series() {
        let matrix = vec![vec![1.0, 3.0]];
        let baselines = wiggle_baselines(&matrix, 2);
        assert_approx_eq!(f64, baselines[0], 0.0);
        assert_approx_eq!(f64, baselines[1], -1.0);
    }
}
