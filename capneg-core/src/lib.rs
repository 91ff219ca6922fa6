//! Responder-side profile negotiation.
//!
//! [`ProfileHost`] owns the per-destination profile table of one endpoint,
//! answers inquiries, detail queries and enable/disable requests, and
//! broadcasts changes made through the local API.

pub mod block;
pub mod config;
pub mod delegate;
pub mod host;
pub mod output;
pub mod state;

pub use block::FunctionBlock;
pub use config::{ConfigError, HostConfig};
pub use delegate::{AcceptAll, ProfileDelegate};
pub use host::{ProfileHost, Profiles};
pub use output::{BufferOutput, QueuedOutput, ResponderOutput};
pub use state::{AggregateEntry, AggregateScope, AggregateState, DestinationState, ProfileStates};
