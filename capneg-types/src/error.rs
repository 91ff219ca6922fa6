//! Error taxonomy for profile negotiation.

use thiserror::Error;

/// Errors raised by the capability state store and the local profile API.
///
/// Protocol-level problems (unsupported profile, malformed target, oversized
/// channel counts) reach the peer as NAK messages or are refused locally;
/// their variants name the problem in logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("active channel count {active} exceeds supported count {supported}")]
    InvalidArgument { supported: u16, active: u16 },

    #[error("profile is not supported at this destination")]
    UnsupportedProfile,

    #[error("details target {0:#04x} is not supported")]
    MalformedTarget(u8),

    #[error("destination is outside this endpoint's function block")]
    UnknownDestination,

    #[error("{0} channels requested, an endpoint has at most 256")]
    TooManyChannels(u16),
}
