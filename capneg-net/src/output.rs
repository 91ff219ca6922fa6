//! Transport adapters handed to the profile host.

use std::sync::mpsc::Sender;

use log::warn;

use capneg_core::{BufferOutput, ResponderOutput};
use capneg_types::{Header, Message, Muid};

use crate::protocol::Packet;

/// Queues unsolicited notifications for the server to deliver.
pub struct ChannelOutput {
    muid: Muid,
    tx: Sender<Packet>,
}

impl ChannelOutput {
    pub fn new(muid: Muid, tx: Sender<Packet>) -> Self {
        Self { muid, tx }
    }
}

impl BufferOutput for ChannelOutput {
    fn muid(&self) -> Muid {
        self.muid
    }

    fn send(&mut self, group: u8, header: Header, message: Message) {
        if self.tx.send(Packet::new(group, header, message)).is_err() {
            warn!("Dropping notification, server outbox is closed");
        }
    }
}

/// Collects the replies to one inbound packet.
pub struct PacketResponder {
    muid: Muid,
    incoming_header: Header,
    incoming_group: u8,
    replies: Vec<Packet>,
}

impl PacketResponder {
    pub fn new(muid: Muid, incoming: &Packet) -> Self {
        Self {
            muid,
            incoming_header: incoming.header,
            incoming_group: incoming.group,
            replies: Vec::new(),
        }
    }

    pub fn into_replies(self) -> Vec<Packet> {
        self.replies
    }
}

impl BufferOutput for PacketResponder {
    fn muid(&self) -> Muid {
        self.muid
    }

    fn send(&mut self, group: u8, header: Header, message: Message) {
        self.replies.push(Packet::new(group, header, message));
    }
}

impl ResponderOutput for PacketResponder {
    fn incoming_header(&self) -> Header {
        self.incoming_header
    }

    fn incoming_group(&self) -> u8 {
        self.incoming_group
    }
}
