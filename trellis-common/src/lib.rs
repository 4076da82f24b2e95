pub mod channel;
pub mod error;
pub mod key;
pub mod mark;
pub mod record;
pub mod value;

pub use channel::{
    resolve_channel, resolve_prop, to_channel_option, Channel, ChannelAccessor, ChannelOption,
    Channels, ScaleBinding, ScaleName,
};
pub use error::ChannelError;
pub use key::{FieldKey, InternalKey};
pub use mark::{Mark, MarkId, MarkOptions, MarkType};
pub use record::{recordize, DataRecord, Datum};
pub use value::RawValue;
