//! Transport seams consumed by the profile host.

use capneg_types::{Header, Message, MessageKind, Muid, NakStatus, IMPLEMENTATION_VERSION};

/// Somewhere to put outgoing messages.
pub trait BufferOutput {
    /// Identifier of the local endpoint.
    fn muid(&self) -> Muid;

    /// Send `message` on `group` with an explicit header.
    fn send(&mut self, group: u8, header: Header, message: Message);
}

/// Output bound to one inbound message, so replies can be addressed back to
/// whoever sent it.
pub trait ResponderOutput: BufferOutput {
    /// Header of the message being answered.
    fn incoming_header(&self) -> Header;

    /// Group the message being answered arrived on.
    fn incoming_group(&self) -> u8;

    /// Header for a reply of `kind`, addressed to the requester on the same
    /// channel selector.
    fn reply_header(&self, kind: MessageKind) -> Header {
        let incoming = self.incoming_header();
        Header {
            channel: incoming.channel,
            kind,
            version: IMPLEMENTATION_VERSION,
            source: self.muid(),
            destination: incoming.source,
        }
    }

    /// Reply to the requester on the incoming group.
    fn reply(&mut self, message: Message) {
        let header = self.reply_header(message.kind());
        let group = self.incoming_group();
        self.send(group, header, message);
    }

    /// Reject the incoming message.
    fn send_nak(&mut self, status: NakStatus) {
        let original_kind = self.incoming_header().kind.sub_id();
        self.reply(Message::Nak {
            original_kind,
            status,
        });
    }
}

/// Collects messages in memory. Handy for embedding and tests.
#[derive(Debug)]
pub struct QueuedOutput {
    muid: Muid,
    pub sent: Vec<(u8, Header, Message)>,
}

impl QueuedOutput {
    pub fn new(muid: Muid) -> Self {
        Self {
            muid,
            sent: Vec::new(),
        }
    }

    pub fn take(&mut self) -> Vec<(u8, Header, Message)> {
        std::mem::take(&mut self.sent)
    }
}

impl BufferOutput for QueuedOutput {
    fn muid(&self) -> Muid {
        self.muid
    }

    fn send(&mut self, group: u8, header: Header, message: Message) {
        self.sent.push((group, header, message));
    }
}

impl<T: BufferOutput + ?Sized> BufferOutput for Box<T> {
    fn muid(&self) -> Muid {
        (**self).muid()
    }

    fn send(&mut self, group: u8, header: Header, message: Message) {
        (**self).send(group, header, message)
    }
}
