use trellis_common::Channel;

use crate::core::{ChannelUpdate, Transform, TransformArgs};
use crate::error::TrellisTransformError;

/// Keeps the records whose channel value is truthy
#[derive(Debug, Clone)]
pub struct Filter {
    channel: Channel,
}

impl Filter {
    pub fn by(channel: Channel) -> Self {
        Self { channel }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::by(Channel::Filter)
    }
}

impl Transform for Filter {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError> {
        let keep = args.require("filter", self.channel.clone())?;
        let data = args
            .data
            .iter()
            .enumerate()
            .filter(|(i, _)| keep[*i].is_truthy())
            .map(|(i, record)| record.derive(i))
            .collect();
        // applied once; later stages must not filter again
        let channels = if self.channel == Channel::Filter {
            ChannelUpdate::from_channels(&args.channels)
                .remove(&Channel::Filter)
                .finish()
        } else {
            args.channels
        };

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
    use trellis_common::DataRecord;

    #[test]
    fn test_filter_truthy() -> Result<(), TrellisTransformError> {
        let data = vec![
            DataRecord::new().with_field("keep", true),
            DataRecord::new().with_field("keep", 0.0),
            DataRecord::new().with_field("keep", "yes"),
            DataRecord::new().with_field("keep", ""),
        ];
        let input = TransformArgs::new(
            data,
            [(Channel::Filter, "keep".into())].into_iter().collect(),
        );
        let out = Filter::default().transform(input)?;
        let kept: Vec<Option<usize>> = out.data.iter().map(|r| r.source_index()).collect();
        assert_eq!(kept, vec![Some(0), Some(2)]);
        assert!(!out.channels.contains_key(&Channel::Filter));
        Ok(())
    }
}
