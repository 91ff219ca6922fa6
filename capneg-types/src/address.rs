//! Three-level addressing: block, group, channel.

use serde::{Deserialize, Serialize};

use crate::CHANNELS_PER_GROUP;

/// Selects a single channel, a whole group, or the whole block.
///
/// Variant order matters: channel destinations sort before the group
/// destination, which sorts before the block destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelInGroup {
    Channel(u8),
    WholeGroup,
    WholeBlock,
}

impl ChannelInGroup {
    pub const WHOLE_GROUP_BYTE: u8 = 0x7e;
    pub const WHOLE_BLOCK_BYTE: u8 = 0x7f;

    /// Decode the device-id byte carried in a message header.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b if b < CHANNELS_PER_GROUP => Some(Self::Channel(b)),
            Self::WHOLE_GROUP_BYTE => Some(Self::WholeGroup),
            Self::WHOLE_BLOCK_BYTE => Some(Self::WholeBlock),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Channel(c) => c,
            Self::WholeGroup => Self::WHOLE_GROUP_BYTE,
            Self::WholeBlock => Self::WHOLE_BLOCK_BYTE,
        }
    }

    pub fn is_channel(self) -> bool {
        matches!(self, Self::Channel(_))
    }
}

impl std::fmt::Display for ChannelInGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(c) => write!(f, "channel {}", c),
            Self::WholeGroup => f.write_str("whole group"),
            Self::WholeBlock => f.write_str("whole block"),
        }
    }
}

/// A group plus a channel selector within it.
///
/// For `WholeBlock` addresses the group is carried along but does not take
/// part in selecting a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelAddress {
    pub group: u8,
    pub channel: ChannelInGroup,
}

impl ChannelAddress {
    pub fn new(group: u8, channel: ChannelInGroup) -> Self {
        Self { group, channel }
    }

    pub fn channel(group: u8, channel: u8) -> Self {
        Self::new(group, ChannelInGroup::Channel(channel))
    }

    pub fn whole_group(group: u8) -> Self {
        Self::new(group, ChannelInGroup::WholeGroup)
    }

    pub fn whole_block() -> Self {
        Self::new(0, ChannelInGroup::WholeBlock)
    }

    pub fn with_group(self, group: u8) -> Self {
        Self { group, ..self }
    }

    pub fn with_channel(self, channel: ChannelInGroup) -> Self {
        Self { channel, ..self }
    }

    pub fn is_block(&self) -> bool {
        self.channel == ChannelInGroup::WholeBlock
    }

    pub fn is_group(&self) -> bool {
        self.channel == ChannelInGroup::WholeGroup
    }

    /// Canonical form used as a storage key: every block address collapses
    /// onto a single key regardless of group.
    pub fn normalized(self) -> Self {
        if self.is_block() {
            Self::whole_block()
        } else {
            self
        }
    }
}

impl std::fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_block() {
            f.write_str("block")
        } else {
            write!(f, "group {} {}", self.group, self.channel)
        }
    }
}
