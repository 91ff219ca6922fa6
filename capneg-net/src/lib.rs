//! Network transport for capability negotiation.
//!
//! Carries framed [`Packet`]s between peers over TCP and drives a
//! [`capneg_core::ProfileHost`] with whatever arrives.

pub mod framing;
pub mod output;
pub mod protocol;
pub mod server;

pub use output::{ChannelOutput, PacketResponder};
pub use protocol::{Packet, PeerId};
pub use server::ProfileServer;
