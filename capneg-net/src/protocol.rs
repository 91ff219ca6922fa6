//! Wire envelope for negotiation messages.

use serde::{Deserialize, Serialize};

use capneg_types::{Header, Message};

/// Local handle for a connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl PeerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// One message as it travels between peers: the group it is sent on, its
/// header and its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub group: u8,
    pub header: Header,
    pub message: Message,
}

impl Packet {
    pub fn new(group: u8, header: Header, message: Message) -> Self {
        Self {
            group,
            header,
            message,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.header.destination.is_broadcast()
    }
}
