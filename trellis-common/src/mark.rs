use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::channel::{Channel, ChannelAccessor, Channels, ScaleName};
use crate::record::DataRecord;

static NEXT_MARK_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a mark instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(u64);

impl MarkId {
    pub fn next() -> Self {
        Self(NEXT_MARK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum MarkType {
    Area,
    AreaX,
    AreaY,
    Arrow,
    AxisX,
    AxisY,
    BarX,
    BarY,
    Cell,
    Dot,
    Frame,
    GridX,
    GridY,
    Line,
    LineX,
    LineY,
    Link,
    Rect,
    RectX,
    RectY,
    RuleX,
    RuleY,
    Text,
    TickX,
    TickY,
    Vector,
    WaffleX,
    WaffleY,
    Custom,
}

impl MarkType {
    /// Marks that need a band scale on x
    pub fn requires_band_x(&self) -> bool {
        matches!(
            self,
            MarkType::BarY | MarkType::Cell | MarkType::TickY | MarkType::WaffleY
        )
    }

    /// Marks that need a band scale on y
    pub fn requires_band_y(&self) -> bool {
        matches!(
            self,
            MarkType::BarX | MarkType::Cell | MarkType::TickX | MarkType::WaffleX
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkOptions {
    /// Set when the mark's data went through an explicit sort transform, which
    /// disables automatic ordinal domain sorting.
    pub sorted: bool,
    /// Scales the mark uses without binding a channel to them (axes, grids)
    pub scales: BTreeSet<ScaleName>,
}

#[derive(Debug, Clone)]
pub struct Mark {
    pub id: MarkId,
    pub mark_type: MarkType,
    pub channels: Channels,
    pub data: Vec<DataRecord>,
    pub options: MarkOptions,
}

impl Mark {
    pub fn new(mark_type: MarkType, data: Vec<DataRecord>) -> Self {
        Self {
            id: MarkId::next(),
            mark_type,
            channels: Channels::new(),
            data,
            options: MarkOptions::default(),
        }
    }

    pub fn channel(mut self, channel: Channel, accessor: impl Into<ChannelAccessor>) -> Self {
        self.channels.insert(channel, accessor.into());
        self
    }

    pub fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    pub fn sorted(mut self, sorted: bool) -> Self {
        self.options.sorted = sorted;
        self
    }

    pub fn uses_scale(mut self, scale: ScaleName) -> Self {
        self.options.scales.insert(scale);
        self
    }

    /// Names of the channels in use
    pub fn channel_names(&self) -> BTreeSet<Channel> {
        self.channels.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_mark_ids_are_unique() {
        let a = Mark::new(MarkType::Dot, vec![]);
        let b = Mark::new(MarkType::Dot, vec![]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_band_requirements() {
        assert!(MarkType::BarY.requires_band_x());
        assert!(!MarkType::BarY.requires_band_y());
        assert!(MarkType::Cell.requires_band_x() && MarkType::Cell.requires_band_y());
        assert_eq!(MarkType::from_str("waffleX"), Ok(MarkType::WaffleX));
    }
}
