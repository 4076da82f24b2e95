use std::cmp::Ordering;

use trellis_common::Channel;

use crate::core::{Transform, TransformArgs};
use crate::error::TrellisTransformError;

/// Reorders records by a channel's values. The output is flagged as sorted so
/// that ordinal scales keep the order in which values now appear.
#[derive(Debug, Clone)]
pub struct Sort {
    channel: Channel,
    reverse: bool,
}

impl Sort {
    pub fn by(channel: Channel) -> Self {
        Self {
            channel,
            reverse: false,
        }
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::by(Channel::Sort)
    }
}

impl Transform for Sort {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError> {
        let keys = args.require("sort", self.channel.clone())?;
        let mut order: Vec<usize> = (0..args.data.len()).collect();
        // stable, with nulls last in either direction
        order.sort_by(|&a, &b| match (keys[a].is_null(), keys[b].is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if self.reverse => keys[b].cmp(&keys[a]),
            (false, false) => keys[a].cmp(&keys[b]),
        });

        Ok(TransformArgs {
            data: order.into_iter().map(|i| args.data[i].derive(i)).collect(),
            channels: args.channels,
            sorted: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::{DataRecord, RawValue};

    fn args() -> TransformArgs {
        let data = vec![
            DataRecord::new().with_field("v", 2.0),
            DataRecord::new().with_field("v", RawValue::Null),
            DataRecord::new().with_field("v", 1.0),
            DataRecord::new().with_field("v", 3.0),
        ];
        TransformArgs::new(data, [(Channel::Sort, "v".into())].into_iter().collect())
    }

    fn source_order(out: &TransformArgs) -> Vec<Option<usize>> {
        out.data.iter().map(|r| r.source_index()).collect()
    }

    #[test]
    fn test_sort_ascending() -> Result<(), TrellisTransformError> {
        let out = Sort::default().transform(args())?;
        assert_eq!(source_order(&out), vec![Some(2), Some(0), Some(3), Some(1)]);
        assert!(out.sorted);
        Ok(())
    }

    #[test]
    fn test_sort_descending_keeps_nulls_last() -> Result<(), TrellisTransformError> {
        let out = Sort::default().reverse(true).transform(args())?;
        assert_eq!(source_order(&out), vec![Some(3), Some(0), Some(2), Some(1)]);
        Ok(())
    }
}
