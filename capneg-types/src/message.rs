//! Wire message model.
//!
//! Every message carries a [`Header`] and a [`Message`] body. The body is a
//! sum type over the profile negotiation messages; anything else travels as
//! [`Message::Other`] and is left for other handlers.

use serde::{Deserialize, Serialize};

use crate::address::ChannelInGroup;
use crate::profile::ProfileId;
use crate::Muid;

/// Message format version written by this implementation.
pub const IMPLEMENTATION_VERSION: u8 = 0x02;

/// Message kind, carried in the header as the sub-id byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    ProfileInquiry,
    ProfileInquiryResponse,
    ProfileOn,
    ProfileOff,
    ProfileEnabledReport,
    ProfileDisabledReport,
    ProfileAdded,
    ProfileRemoved,
    ProfileDetails,
    ProfileDetailsResponse,
    Nak,
    Other(u8),
}

impl MessageKind {
    pub fn sub_id(self) -> u8 {
        match self {
            Self::ProfileInquiry => 0x20,
            Self::ProfileInquiryResponse => 0x21,
            Self::ProfileOn => 0x22,
            Self::ProfileOff => 0x23,
            Self::ProfileEnabledReport => 0x24,
            Self::ProfileDisabledReport => 0x25,
            Self::ProfileAdded => 0x26,
            Self::ProfileRemoved => 0x27,
            Self::ProfileDetails => 0x28,
            Self::ProfileDetailsResponse => 0x29,
            Self::Nak => 0x7f,
            Self::Other(id) => id,
        }
    }

    pub fn from_sub_id(id: u8) -> Self {
        match id {
            0x20 => Self::ProfileInquiry,
            0x21 => Self::ProfileInquiryResponse,
            0x22 => Self::ProfileOn,
            0x23 => Self::ProfileOff,
            0x24 => Self::ProfileEnabledReport,
            0x25 => Self::ProfileDisabledReport,
            0x26 => Self::ProfileAdded,
            0x27 => Self::ProfileRemoved,
            0x28 => Self::ProfileDetails,
            0x29 => Self::ProfileDetailsResponse,
            0x7f => Self::Nak,
            other => Self::Other(other),
        }
    }
}

/// Addressing metadata that accompanies every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub channel: ChannelInGroup,
    pub kind: MessageKind,
    pub version: u8,
    pub source: Muid,
    pub destination: Muid,
}

/// NAK status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NakStatus(pub u8);

impl NakStatus {
    /// Generic rejection, e.g. a profile that is not supported.
    pub const NAK: NakStatus = NakStatus(0x00);
    /// The request named a target this responder does not handle.
    pub const UNSUPPORTED_TARGET: NakStatus = NakStatus(0x04);
}

/// Message bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Ask which profiles exist at the header's channel selector.
    ProfileInquiry,
    ProfileInquiryResponse {
        active: Vec<ProfileId>,
        inactive: Vec<ProfileId>,
    },
    /// Request to enable a profile on `num_channels` channels
    /// (only honoured from version 2 onwards).
    ProfileOn { profile: ProfileId, num_channels: u16 },
    ProfileOff { profile: ProfileId },
    ProfileEnabledReport { profile: ProfileId, num_channels: u16 },
    ProfileDisabledReport { profile: ProfileId, num_channels: u16 },
    ProfileAdded { profile: ProfileId },
    ProfileRemoved { profile: ProfileId },
    ProfileDetails { profile: ProfileId, target: u8 },
    ProfileDetailsResponse {
        profile: ProfileId,
        target: u8,
        data: Vec<u8>,
    },
    Nak {
        /// Sub-id of the message being rejected.
        original_kind: u8,
        status: NakStatus,
    },
    /// Any message outside profile negotiation. `sub_id` never names one of
    /// the profile kinds above; build it with [`Message::other`].
    Other { sub_id: u8, data: Vec<u8> },
}

impl Message {
    /// Wrap a message outside profile negotiation, or `None` if `sub_id`
    /// belongs to a profile message kind.
    pub fn other(sub_id: u8, data: Vec<u8>) -> Option<Self> {
        match MessageKind::from_sub_id(sub_id) {
            MessageKind::Other(_) => Some(Self::Other { sub_id, data }),
            _ => None,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::ProfileInquiry => MessageKind::ProfileInquiry,
            Self::ProfileInquiryResponse { .. } => MessageKind::ProfileInquiryResponse,
            Self::ProfileOn { .. } => MessageKind::ProfileOn,
            Self::ProfileOff { .. } => MessageKind::ProfileOff,
            Self::ProfileEnabledReport { .. } => MessageKind::ProfileEnabledReport,
            Self::ProfileDisabledReport { .. } => MessageKind::ProfileDisabledReport,
            Self::ProfileAdded { .. } => MessageKind::ProfileAdded,
            Self::ProfileRemoved { .. } => MessageKind::ProfileRemoved,
            Self::ProfileDetails { .. } => MessageKind::ProfileDetails,
            Self::ProfileDetailsResponse { .. } => MessageKind::ProfileDetailsResponse,
            Self::Nak { .. } => MessageKind::Nak,
            Self::Other { sub_id, .. } => MessageKind::Other(*sub_id),
        }
    }
}
