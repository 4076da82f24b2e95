//! Core types and traits for the transform system

use trellis_common::{
    resolve_channel, Channel, ChannelAccessor, Channels, DataRecord, InternalKey, Mark, RawValue,
};

use crate::error::TrellisTransformError;

/// The data and channels flowing through a transform pipeline
#[derive(Debug, Clone, Default)]
pub struct TransformArgs {
    pub data: Vec<DataRecord>,
    pub channels: Channels,
    /// Set once an explicit sort has ordered the data
    pub sorted: bool,
}

impl TransformArgs {
    pub fn new(data: Vec<DataRecord>, channels: Channels) -> Self {
        Self {
            data,
            channels,
            sorted: false,
        }
    }

    pub fn from_mark(mark: &Mark) -> Self {
        Self {
            data: mark.data.clone(),
            channels: mark.channels.clone(),
            sorted: mark.options.sorted,
        }
    }

    /// Replace a mark's data and channels with the pipeline output
    pub fn into_mark(self, mut mark: Mark) -> Mark {
        mark.data = self.data;
        mark.channels = self.channels;
        mark.options.sorted = self.sorted;
        mark
    }

    pub fn has_channel(&self, channel: &Channel) -> bool {
        self.channels.contains_key(channel)
    }

    /// Resolve `channel` for every record
    pub fn resolve(&self, channel: &Channel) -> Result<Vec<RawValue>, TrellisTransformError> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, record)| Ok(resolve_channel(channel, record, i, &self.channels)?))
            .collect()
    }

    /// Resolve `channel` as numbers; missing or non-numeric values are NaN
    pub fn resolve_numbers(&self, channel: &Channel) -> Result<Vec<f64>, TrellisTransformError> {
        Ok(self
            .resolve(channel)?
            .iter()
            .map(|v| v.as_finite().unwrap_or(f64::NAN))
            .collect())
    }

    /// Resolve `channel`, failing when the mark does not define it
    pub fn require(
        &self,
        transform: &'static str,
        channel: Channel,
    ) -> Result<Vec<RawValue>, TrellisTransformError> {
        if !self.has_channel(&channel) {
            return Err(TrellisTransformError::MissingChannel { transform, channel });
        }
        self.resolve(&channel)
    }
}

/// Base trait for all transforms
pub trait Transform: Send + Sync {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError>;
}

/// Run `transforms` in order
pub fn apply_transforms(
    args: TransformArgs,
    transforms: &[Box<dyn Transform>],
) -> Result<TransformArgs, TrellisTransformError> {
    transforms
        .iter()
        .try_fold(args, |args, transform| transform.transform(args))
}

/// Explicit record of how a transform rewrites the channel map: which channels it
/// drops, and which it points at freshly minted columns. Everything else passes
/// through untouched.
#[derive(Debug, Clone)]
pub struct ChannelUpdate {
    channels: Channels,
}

impl ChannelUpdate {
    pub fn from_channels(channels: &Channels) -> Self {
        Self {
            channels: channels.clone(),
        }
    }

    pub fn remove(mut self, channel: &Channel) -> Self {
        self.channels.shift_remove(channel);
        self
    }

    /// Bind `channel` to a synthesized column
    pub fn column(mut self, channel: Channel, key: InternalKey) -> Self {
        self.channels.insert(channel, ChannelAccessor::Field(key.into()));
        self
    }

    /// Bind `channel` to a synthesized column that is already in output units
    pub fn unscaled_column(mut self, channel: Channel, key: InternalKey) -> Self {
        self.channels.insert(
            channel,
            ChannelAccessor::unscaled(ChannelAccessor::Field(key.into())),
        );
        self
    }

    pub fn finish(self) -> Channels {
        self.channels
    }
}
