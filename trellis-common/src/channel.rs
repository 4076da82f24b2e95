//! Channels bind visual attributes to data.
//!
//! A channel accessor is either a constant, a field reference, a per-datum function,
//! an options wrapper that controls scaling, or an alias to another channel. The
//! functions in this module resolve accessors against records.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::ChannelError;
use crate::key::FieldKey;
use crate::record::{DataRecord, Datum};
use crate::value::RawValue;

/// Name of a visual channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum Channel {
    X,
    Y,
    X1,
    X2,
    Y1,
    Y2,
    Fill,
    Stroke,
    Opacity,
    FillOpacity,
    StrokeOpacity,
    R,
    Symbol,
    Length,
    Fx,
    Fy,
    Z,
    Sort,
    Filter,
    Weight,
    #[strum(default)]
    Other(String),
}

impl Channel {
    pub fn as_str(&self) -> &str {
        match self {
            Channel::Other(name) => name.as_str(),
            other => other.as_ref(),
        }
    }

    /// The scale this channel is bound to unless its accessor says otherwise
    pub fn scale(&self) -> Option<ScaleName> {
        match self {
            Channel::X | Channel::X1 | Channel::X2 => Some(ScaleName::X),
            Channel::Y | Channel::Y1 | Channel::Y2 => Some(ScaleName::Y),
            Channel::Fx => Some(ScaleName::Fx),
            Channel::Fy => Some(ScaleName::Fy),
            Channel::Fill | Channel::Stroke => Some(ScaleName::Color),
            Channel::Opacity | Channel::FillOpacity | Channel::StrokeOpacity => {
                Some(ScaleName::Opacity)
            }
            Channel::R => Some(ScaleName::R),
            Channel::Symbol => Some(ScaleName::Symbol),
            Channel::Length => Some(ScaleName::Length),
            _ => None,
        }
    }

    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            Channel::X
                | Channel::X1
                | Channel::X2
                | Channel::Y
                | Channel::Y1
                | Channel::Y2
                | Channel::Fx
                | Channel::Fy
        )
    }

    pub fn is_opacity(&self) -> bool {
        matches!(
            self,
            Channel::Opacity | Channel::FillOpacity | Channel::StrokeOpacity
        )
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name of a plot scale
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ScaleName {
    X,
    Y,
    Fx,
    Fy,
    R,
    Color,
    Opacity,
    Symbol,
    Length,
}

impl ScaleName {
    pub fn parse(name: &str) -> Result<Self, ChannelError> {
        ScaleName::from_str(name).map_err(|_| ChannelError::UnknownScale(name.to_string()))
    }
}

/// Per-datum accessor function
pub type AccessorFn = Arc<dyn Fn(Datum<'_>, usize) -> RawValue + Send + Sync>;

/// How an accessor-options object binds to a scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleBinding {
    /// The channel's default scale
    #[default]
    Auto,
    /// Values are already in output units
    Unscaled,
    Named(ScaleName),
}

#[derive(Clone)]
pub enum ChannelAccessor {
    Constant(RawValue),
    /// A field reference. A name that is absent from the datum resolves to the name
    /// itself, so `"steelblue"` works as both a column name and a literal.
    Field(FieldKey),
    Function(AccessorFn),
    Options {
        value: Box<ChannelAccessor>,
        scale: ScaleBinding,
    },
    /// Redirects resolution to another channel of the same mark
    Alias(Channel),
}

impl ChannelAccessor {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(Datum<'_>, usize) -> RawValue + Send + Sync + 'static,
    {
        ChannelAccessor::Function(Arc::new(f))
    }

    pub fn unscaled(value: impl Into<ChannelAccessor>) -> Self {
        ChannelAccessor::Options {
            value: Box::new(value.into()),
            scale: ScaleBinding::Unscaled,
        }
    }

    pub fn with_scale(value: impl Into<ChannelAccessor>, scale: ScaleName) -> Self {
        ChannelAccessor::Options {
            value: Box::new(value.into()),
            scale: ScaleBinding::Named(scale),
        }
    }

    /// The accessor with any options wrapper removed
    pub fn inner(&self) -> &ChannelAccessor {
        match self {
            ChannelAccessor::Options { value, .. } => value.inner(),
            other => other,
        }
    }

    /// Field reference behind this accessor, if it is one
    pub fn field(&self) -> Option<&FieldKey> {
        match self.inner() {
            ChannelAccessor::Field(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Debug for ChannelAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelAccessor::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            ChannelAccessor::Field(k) => f.debug_tuple("Field").field(k).finish(),
            ChannelAccessor::Function(_) => write!(f, "Function(..)"),
            ChannelAccessor::Options { value, scale } => f
                .debug_struct("Options")
                .field("value", value)
                .field("scale", scale)
                .finish(),
            ChannelAccessor::Alias(c) => f.debug_tuple("Alias").field(c).finish(),
        }
    }
}

impl From<&str> for ChannelAccessor {
    fn from(value: &str) -> Self {
        ChannelAccessor::Field(value.into())
    }
}

impl From<String> for ChannelAccessor {
    fn from(value: String) -> Self {
        ChannelAccessor::Field(value.into())
    }
}

impl From<FieldKey> for ChannelAccessor {
    fn from(value: FieldKey) -> Self {
        ChannelAccessor::Field(value)
    }
}

impl From<crate::key::InternalKey> for ChannelAccessor {
    fn from(value: crate::key::InternalKey) -> Self {
        ChannelAccessor::Field(value.into())
    }
}

impl From<RawValue> for ChannelAccessor {
    fn from(value: RawValue) -> Self {
        ChannelAccessor::Constant(value)
    }
}

impl From<f64> for ChannelAccessor {
    fn from(value: f64) -> Self {
        ChannelAccessor::Constant(value.into())
    }
}

impl From<Channel> for ChannelAccessor {
    fn from(value: Channel) -> Self {
        ChannelAccessor::Alias(value)
    }
}

pub type Channels = IndexMap<Channel, ChannelAccessor>;

/// Resolve an accessor against one record.
///
/// Functions receive the unwrapped datum; field names resolve to the field's value
/// when present and to themselves otherwise; constants are returned as is. Anything
/// else (including aliases, which need the surrounding channel map) yields `default`.
pub fn resolve_prop(
    accessor: Option<&ChannelAccessor>,
    record: &DataRecord,
    index: usize,
    default: RawValue,
) -> RawValue {
    let Some(accessor) = accessor else {
        return default;
    };
    match accessor {
        ChannelAccessor::Function(f) => f(record.as_datum(), index),
        ChannelAccessor::Field(key) => match record.get(key) {
            Some(value) => value.clone(),
            None => match key {
                FieldKey::Name(name) => RawValue::String(name.clone()),
                FieldKey::Internal(_) => default,
            },
        },
        ChannelAccessor::Constant(RawValue::Null) => default,
        ChannelAccessor::Constant(value) => value.clone(),
        ChannelAccessor::Options { value, .. } => resolve_prop(Some(value), record, index, default),
        ChannelAccessor::Alias(_) => default,
    }
}

/// Look up the accessor for `channel`, falling back from `z` to `fill` then `stroke`
/// and following a single alias hop.
pub fn channel_accessor<'a>(
    channel: &Channel,
    channels: &'a Channels,
) -> Result<Option<&'a ChannelAccessor>, ChannelError> {
    let accessor = match channels.get(channel) {
        Some(accessor) => accessor,
        None if *channel == Channel::Z => {
            match channels
                .get(&Channel::Fill)
                .or_else(|| channels.get(&Channel::Stroke))
            {
                Some(accessor) => accessor,
                None => return Ok(None),
            }
        }
        None => return Ok(None),
    };

    match accessor.inner() {
        ChannelAccessor::Alias(target) => {
            let resolved = channels
                .get(target)
                .ok_or_else(|| ChannelError::AliasTargetMissing {
                    channel: channel.clone(),
                    target: target.clone(),
                })?;
            if let ChannelAccessor::Alias(next) = resolved.inner() {
                return Err(ChannelError::AliasCycle {
                    channel: target.clone(),
                    target: next.clone(),
                });
            }
            Ok(Some(resolved))
        }
        _ => Ok(Some(accessor)),
    }
}

/// Resolve `channel` for one record of a mark
pub fn resolve_channel(
    channel: &Channel,
    record: &DataRecord,
    index: usize,
    channels: &Channels,
) -> Result<RawValue, ChannelError> {
    let accessor = channel_accessor(channel, channels)?;
    Ok(resolve_prop(accessor, record, index, RawValue::Null))
}

/// A normalized accessor: the value to resolve and the scale it feeds, if any
#[derive(Debug, Clone)]
pub struct ChannelOption {
    pub channel: Channel,
    pub value: Option<ChannelAccessor>,
    pub scale: Option<ScaleName>,
}

/// Normalize any accessor into `{value, scale, channel}`.
///
/// The scale defaults to the channel's scale, except that literal numbers on
/// non-positional, non-opacity channels are taken to be in output units already.
pub fn to_channel_option(channel: &Channel, accessor: Option<&ChannelAccessor>) -> ChannelOption {
    let Some(accessor) = accessor else {
        return ChannelOption {
            channel: channel.clone(),
            value: None,
            scale: None,
        };
    };

    let scale = match accessor {
        ChannelAccessor::Options { scale, .. } => match scale {
            ScaleBinding::Auto => channel.scale(),
            ScaleBinding::Unscaled => None,
            ScaleBinding::Named(name) => Some(*name),
        },
        ChannelAccessor::Constant(RawValue::Number(_))
            if !channel.is_positional() && !channel.is_opacity() =>
        {
            None
        }
        _ => channel.scale(),
    };

    ChannelOption {
        channel: channel.clone(),
        value: Some(accessor.inner().clone()),
        scale,
    }
}
