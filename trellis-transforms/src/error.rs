use thiserror::Error;
use trellis_common::{Channel, ChannelError};
use trellis_scales::TrellisScaleError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrellisTransformError {
    #[error("Unknown reducer: `{0}`")]
    UnknownReducer(String),

    #[error("The {transform} transform requires the `{channel}` channel")]
    MissingChannel {
        transform: &'static str,
        channel: Channel,
    },

    #[error("Mosaic stacking requires non-negative values, channel `{channel}` has {value}")]
    NegativeMosaicValue { channel: Channel, value: f64 },

    #[error("Invalid transform option: {0}")]
    InvalidOption(String),

    #[error("Channel error: `{0}`")]
    ChannelError(#[from] ChannelError),

    #[error("Scale error: `{0}`")]
    ScaleError(#[from] TrellisScaleError),
}
