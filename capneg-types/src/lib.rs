//! # capneg-types
//!
//! Shared value types for the capability negotiation workspace.
//! Addresses, profile identifiers, per-destination records and the wire
//! message model live here so that capneg-core and capneg-net agree on them.

pub mod address;
pub mod error;
pub mod marshalling;
pub mod message;
pub mod profile;

pub use address::{ChannelAddress, ChannelInGroup};
pub use error::ProfileError;
pub use message::{Header, Message, MessageKind, NakStatus, IMPLEMENTATION_VERSION};
pub use profile::{ProfileAtAddress, ProfileId, SupportedAndActive};

/// There are only 256 channels on an endpoint (16 groups of 16 channels).
pub const MAX_CHANNELS: u16 = 256;

/// Number of groups addressable by a single endpoint.
pub const NUM_GROUPS: u8 = 16;

/// Number of channels in a single group.
pub const CHANNELS_PER_GROUP: u8 = 16;

/// 28-bit identifier of a negotiation endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Muid(u32);

impl Muid {
    /// Destination used for notifications addressed to every peer.
    pub const BROADCAST: Muid = Muid(0x0fff_ffff);

    /// Create a Muid, masking the value to 28 bits.
    pub fn new(id: u32) -> Self {
        Self(id & 0x0fff_ffff)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }
}

impl std::fmt::Display for Muid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:07x}", self.0)
    }
}
