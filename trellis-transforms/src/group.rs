//! Group transform: groups records by discrete x and/or y values (or only by
//! series) and reduces each group.

use indexmap::IndexMap;
use trellis_common::{Channel, InternalKey, RawValue};
use trellis_scales::Interval;

use crate::core::{ChannelUpdate, Transform, TransformArgs};
use crate::error::TrellisTransformError;
use crate::facet::facet_series_groups;
use crate::reducer::Reducer;

#[derive(Debug, Clone)]
pub struct Group {
    dims: Vec<Channel>,
    interval: Option<Interval>,
    outputs: IndexMap<Channel, Reducer>,
}

impl Group {
    fn new(
        dims: Vec<Channel>,
        outputs: impl IntoIterator<Item = (Channel, Reducer)>,
        default_output: Option<Channel>,
    ) -> Self {
        let mut outputs: IndexMap<Channel, Reducer> = outputs.into_iter().collect();
        if let (true, Some(channel)) = (outputs.is_empty(), default_output) {
            outputs.insert(channel, Reducer::count());
        }
        Self {
            dims,
            interval: None,
            outputs,
        }
    }

    /// Group on x; outputs default to a count on y
    pub fn x(outputs: impl IntoIterator<Item = (Channel, Reducer)>) -> Self {
        Self::new(vec![Channel::X], outputs, Some(Channel::Y))
    }

    /// Group on y; outputs default to a count on x
    pub fn y(outputs: impl IntoIterator<Item = (Channel, Reducer)>) -> Self {
        Self::new(vec![Channel::Y], outputs, Some(Channel::X))
    }

    /// Group on both x and y; outputs default to a count on fill
    pub fn xy(outputs: impl IntoIterator<Item = (Channel, Reducer)>) -> Self {
        Self::new(vec![Channel::X, Channel::Y], outputs, Some(Channel::Fill))
    }

    /// Collapse each series into one record
    pub fn z(outputs: impl IntoIterator<Item = (Channel, Reducer)>) -> Self {
        Self::new(vec![], outputs, None)
    }

    /// Snap grouped values to `interval` before grouping
    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl Transform for Group {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError> {
        let mut dims = Vec::with_capacity(self.dims.len());
        for channel in &self.dims {
            let mut values = args.require("group", channel.clone())?;
            if let Some(interval) = &self.interval {
                values = values.iter().map(|v| interval.floor_value(v)).collect();
            }
            dims.push((channel.clone(), values, InternalKey::new("group_key")));
        }

        let mut outputs = Vec::with_capacity(self.outputs.len());
        for (channel, reducer) in &self.outputs {
            let values = if reducer.is_count() {
                None
            } else {
                Some(args.require("group", channel.clone())?)
            };
            outputs.push((channel.clone(), reducer, values, InternalKey::new("group_output")));
        }

        let mut update = ChannelUpdate::from_channels(&args.channels);
        for (channel, _, key) in &dims {
            update = update.column(channel.clone(), *key);
        }
        for (channel, _, _, key) in &outputs {
            update = update.column(channel.clone(), *key);
        }

        let exclude: Vec<Channel> = self.outputs.keys().cloned().collect();
        let mut data = Vec::new();
        for series in facet_series_groups(&args, &exclude)? {
            let mut groups: IndexMap<Vec<RawValue>, Vec<usize>> = IndexMap::new();
            for i in series {
                let key: Vec<RawValue> = dims.iter().map(|(_, values, _)| values[i].clone()).collect();
                if key.iter().any(|v| v.is_null()) {
                    continue;
                }
                groups.entry(key).or_default().push(i);
            }

            for (key, members) in groups {
                let first = members[0];
                let mut record = args.data[first].derive(first);
                for ((_, _, out_key), value) in dims.iter().zip(key) {
                    record.insert(*out_key, value);
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
            channels: update.finish(),
            sorted: args.sorted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::{resolve_channel, DataRecord, Mark, MarkType};

    fn args() -> TransformArgs {
        let data = vec![
            DataRecord::new().with_field("k", "a").with_field("v", 1.0),
            DataRecord::new().with_field("k", "b").with_field("v", 2.0),
            DataRecord::new().with_field("k", "a").with_field("v", 3.0),
        ];
        TransformArgs::from_mark(
            &Mark::new(MarkType::BarY, data)
                .channel(Channel::X, "k")
                .channel(Channel::Y, "v"),
        )
    }

    fn column(out: &TransformArgs, channel: Channel) -> Vec<RawValue> {
        out.data
            .iter()
            .enumerate()
            .map(|(i, r)| resolve_channel(&channel, r, i, &out.channels).unwrap())
            .collect()
    }

    #[test]
    fn test_group_x_sum() -> Result<(), TrellisTransformError> {
        let out = Group::x([(Channel::Y, "sum".parse::<Reducer>()?)]).transform(args())?;
        assert_eq!(column(&out, Channel::X), vec!["a".into(), "b".into()]);
        assert_eq!(column(&out, Channel::Y), vec![4.0.into(), 2.0.into()]);
        assert_eq!(out.data[1].source_index(), Some(1));
        Ok(())
    }

    #[test]
    fn test_group_x_default_count() -> Result<(), TrellisTransformError> {
        let out = Group::x([]).transform(args())?;
        assert_eq!(column(&out, Channel::Y), vec![2.0.into(), 1.0.into()]);
        Ok(())
    }

    #[test]
    fn test_group_xy_requires_both_channels() {
        let mut input = args();
        input.channels.shift_remove(&Channel::Y);
        assert_eq!(
            Group::xy([]).transform(input).err(),
            Some(TrellisTransformError::MissingChannel {
                transform: "group",
                channel: Channel::Y
            })
        );
    }

    #[test]
    fn test_group_with_interval() -> Result<(), TrellisTransformError> {
        let data = vec![
            DataRecord::new().with_field("t", 1.2),
            DataRecord::new().with_field("t", 1.7),
            DataRecord::new().with_field("t", 2.1),
        ];
        let input = TransformArgs::from_mark(
            &Mark::new(MarkType::BarY, data).channel(Channel::X, "t"),
        );
        let out = Group::x([]).interval(Interval::step(1.0)?).transform(input)?;
        assert_eq!(column(&out, Channel::X), vec![1.0.into(), 2.0.into()]);
        assert_eq!(column(&out, Channel::Y), vec![2.0.into(), 1.0.into()]);
        Ok(())
    }

    #[test]
    fn test_group_z() -> Result<(), TrellisTransformError> {
        let mut input = args();
        input.channels.insert(Channel::Z, "k".into());
        let out = Group::z([(Channel::Y, "max".parse::<Reducer>()?)]).transform(input)?;
        assert_eq!(column(&out, Channel::Y), vec![3.0.into(), 2.0.into()]);
        Ok(())
    }
}
