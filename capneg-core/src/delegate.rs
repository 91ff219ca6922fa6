//! Application hook for inbound enable/disable requests.

use capneg_types::{Muid, ProfileAtAddress};

use crate::host::Profiles;
use crate::output::BufferOutput;

/// Decides what to do when a peer asks to switch a profile on or off.
///
/// The host calls this before it reports anything. Whatever state the
/// delegate leaves behind (through `profiles`) is what gets reported back.
/// Changes the delegate makes to `target` itself are not broadcast a second
/// time.
pub trait ProfileDelegate {
    fn profile_enablement_requested<O: BufferOutput>(
        &mut self,
        profiles: &mut Profiles<O>,
        source: Muid,
        target: ProfileAtAddress,
        num_channels: u16,
        enable: bool,
    );
}

/// Ignores requests; the requester is told the current state.
impl ProfileDelegate for () {
    fn profile_enablement_requested<O: BufferOutput>(
        &mut self,
        _profiles: &mut Profiles<O>,
        _source: Muid,
        _target: ProfileAtAddress,
        _num_channels: u16,
        _enable: bool,
    ) {
    }
}

/// Grants every request as asked.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ProfileDelegate for AcceptAll {
    fn profile_enablement_requested<O: BufferOutput>(
        &mut self,
        profiles: &mut Profiles<O>,
        source: Muid,
        target: ProfileAtAddress,
        num_channels: u16,
        enable: bool,
    ) {
        log::debug!(
            target: "profiles",
            "{} requested {} on {} channels for {}",
            source,
            if enable { "enable" } else { "disable" },
            num_channels,
            target
        );
        if enable {
            profiles.enable_profile(target, num_channels);
        } else {
            profiles.disable_profile(target);
        }
    }
}
