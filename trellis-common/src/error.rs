use crate::channel::Channel;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel `{channel}` is an alias of `{target}`, which is itself an alias")]
    AliasCycle { channel: Channel, target: Channel },

    #[error("Channel `{channel}` is an alias of unset channel `{target}`")]
    AliasTargetMissing { channel: Channel, target: Channel },

    #[error("Unknown scale name: `{0}`")]
    UnknownScale(String),
}
