//! Normalize transform: rescales positional channels relative to a per-group basis.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use trellis_common::{Channel, InternalKey};
use trellis_scales::array;

use crate::core::{ChannelUpdate, Transform, TransformArgs};
use crate::error::TrellisTransformError;
use crate::facet::{facet_series_groups, group_indices};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeBasis {
    #[default]
    First,
    Last,
    Min,
    Max,
    Mean,
    Median,
    Sum,
    /// Map the group's extent onto [0, 1]
    Extent,
    /// Standard score: subtract the mean, divide by the standard deviation
    Deviation,
}

impl NormalizeBasis {
    /// Rescale the finite values of one group, NaN elsewhere
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let divide = |basis: Option<f64>| -> Vec<f64> {
            values
                .iter()
                .map(|v| match basis {
                    Some(b) if b.is_finite() && b != 0.0 => v / b,
                    _ => f64::NAN,
                })
                .collect()
        };
        match self {
            NormalizeBasis::First => divide(finite.first().copied()),
            NormalizeBasis::Last => divide(finite.last().copied()),
            NormalizeBasis::Min => divide(array::extent(finite).map(|(lo, _)| lo)),
            NormalizeBasis::Max => divide(array::extent(finite).map(|(_, hi)| hi)),
            NormalizeBasis::Mean => divide(array::mean(&finite)),
            NormalizeBasis::Median => divide(array::quantile(&finite, 0.5)),
            NormalizeBasis::Sum => divide(Some(array::sum(&finite))),
            NormalizeBasis::Extent => match array::extent(finite) {
                Some((lo, hi)) if hi > lo => values.iter().map(|v| (v - lo) / (hi - lo)).collect(),
                _ => vec![f64::NAN; values.len()],
            },
            NormalizeBasis::Deviation => {
                match (array::mean(&finite), array::deviation(&finite)) {
                    (Some(mean), Some(sd)) if sd > 0.0 => {
                        values.iter().map(|v| (v - mean) / sd).collect()
                    }
                    _ => vec![f64::NAN; values.len()],
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalize {
    channels: [Channel; 3],
    basis: NormalizeBasis,
    by: Option<Channel>,
}

impl Normalize {
    /// Normalize x, x1 and x2 within each facet and series
    pub fn x(basis: NormalizeBasis) -> Self {
        Self {
            channels: [Channel::X, Channel::X1, Channel::X2],
            basis,
            by: None,
        }
    }

    /// Normalize y, y1 and y2 within each facet and series
    pub fn y(basis: NormalizeBasis) -> Self {
        Self {
            channels: [Channel::Y, Channel::Y1, Channel::Y2],
            basis,
            by: None,
        }
    }

    /// Additionally split groups by the values of `channel`, normalizing each
    /// category independently (parallel coordinates)
    pub fn by(mut self, channel: Channel) -> Self {
        self.by = Some(channel);
        self
    }
}

impl Transform for Normalize {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError> {
        let present: Vec<&Channel> = self
            .channels
            .iter()
            .filter(|c| args.has_channel(c))
            .collect();
        if present.is_empty() {
            return Err(TrellisTransformError::MissingChannel {
                transform: "normalize",
                channel: self.channels[0].clone(),
            });
        }

        let mut groups = facet_series_groups(&args, &[])?;
        if let Some(by) = &self.by {
            let keys = args.require("normalize", by.clone())?;
            groups = groups
                .iter()
                .flat_map(|group| group_indices(group, &keys).into_values())
                .collect();
        }

        let mut columns = Vec::with_capacity(present.len());
        for channel in present {
            let values = args.resolve_numbers(channel)?;
            let mut normalized = vec![f64::NAN; values.len()];
            for group in &groups {
                let group_values: Vec<f64> = group.iter().map(|&i| values[i]).collect();
                for (&i, v) in group.iter().zip(self.basis.apply(&group_values)) {
                    normalized[i] = v;
                }
            }
            columns.push((channel.clone(), InternalKey::new("normalize"), normalized));
        }

        let data = args
            .data
            .iter()
            .enumerate()
            .map(|(i, record)| {
                columns
                    .iter()
                    .fold(record.derive(i), |r, (_, key, values)| r.with_field(*key, values[i]))
            })
            .collect();
        let channels = columns
            .iter()
            .fold(
                ChannelUpdate::from_channels(&args.channels),
                |update, (channel, key, _)| update.column(channel.clone(), *key),
            )
            .finish();

        Ok(TransformArgs {
            data,
            channels,
            sorted: args.sorted,
        })
    }
}
