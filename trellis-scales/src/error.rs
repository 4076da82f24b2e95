use trellis_common::{ChannelError, ScaleName};

use crate::options::ScaleType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrellisScaleError {
    #[error("Scale type `{scale_type}` is not valid for the `{scale}` scale")]
    InvalidScaleType {
        scale: ScaleName,
        scale_type: ScaleType,
    },

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Unknown color scheme: `{0}`")]
    UnknownScheme(String),

    #[error("Invalid color: `{0}`")]
    InvalidColor(String),

    #[error("Empty domain")]
    EmptyDomain,

    #[error("Empty range for the `{0}` scale")]
    EmptyRange(ScaleName),

    #[error("Domain length ({domain_len}) does not match range length ({range_len})")]
    DomainRangeMismatch { domain_len: usize, range_len: usize },

    #[error("Invalid scale property value: {0}")]
    InvalidScalePropertyValue(String),

    #[error("Channel error: {0}")]
    ChannelError(#[from] ChannelError),
}
