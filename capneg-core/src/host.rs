//! The responder state machine.
//!
//! [`Profiles`] is the local API: add, remove, enable and disable profiles,
//! broadcasting each change once the endpoint has started acting as a
//! responder. [`ProfileHost`] wraps it with the inbound message handling and
//! the application's [`ProfileDelegate`].

use std::ops::{Deref, DerefMut};

use log::{debug, error, info, warn};

use capneg_types::{
    marshalling, ChannelAddress, ChannelInGroup, Header, Message, MessageKind, Muid, NakStatus,
    ProfileAtAddress, ProfileError, ProfileId, SupportedAndActive, IMPLEMENTATION_VERSION,
    MAX_CHANNELS,
};

use crate::block::FunctionBlock;
use crate::config::HostConfig;
use crate::delegate::ProfileDelegate;
use crate::output::{BufferOutput, ResponderOutput};
use crate::state::{AggregateScope, AggregateState, DestinationState, ProfileStates};

/// Profile table plus the output used for unsolicited notifications.
pub struct Profiles<O> {
    states: ProfileStates,
    output: O,
    /// Set once this endpoint has answered an inquiry or an enable/disable
    /// request. Local changes are only broadcast after that.
    is_responder: bool,
    /// The pair whose enable/disable request is being handed to the delegate.
    current_enablement: Option<ProfileAtAddress>,
}

impl<O: BufferOutput> Profiles<O> {
    fn new(block: FunctionBlock, output: O) -> Self {
        Self {
            states: ProfileStates::new(block),
            output,
            is_responder: false,
            current_enablement: None,
        }
    }

    /// Register `profile` at an address with room for `max_channels` channels.
    ///
    /// Does nothing if the profile is already supported there, if the address
    /// is outside the function block, or if more than 256 channels are asked
    /// for.
    pub fn add_profile(&mut self, pair: ProfileAtAddress, max_channels: u16) {
        if max_channels > MAX_CHANNELS {
            let err = ProfileError::TooManyChannels(max_channels);
            warn!(target: "profiles", "refusing to add {}: {}", pair, err);
            return;
        }
        if max_channels == 0 {
            debug!(target: "profiles", "ignoring add of {} with no channels", pair);
            return;
        }

        let Some(state) = self.states.state_for_destination_mut(pair.address) else {
            debug!(target: "profiles", "ignoring add of {}: unknown destination", pair);
            return;
        };
        if state.get(&pair.profile).is_supported() {
            return;
        }
        if !self.commit(pair, SupportedAndActive::inactive(max_channels)) {
            return;
        }

        info!(target: "profiles", "added {} ({} channels)", pair, max_channels);
        self.notify(pair, Message::ProfileAdded { profile: pair.profile });
    }

    /// Disable and then drop `profile` at an address.
    pub fn remove_profile(&mut self, pair: ProfileAtAddress) {
        if self.states.state_for_destination(pair.address).is_none() {
            return;
        }

        self.disable_profile(pair);

        if !self.get_state(pair).is_supported() {
            return;
        }
        self.states.erase(pair.address, &pair.profile);

        info!(target: "profiles", "removed {}", pair);
        self.notify(pair, Message::ProfileRemoved { profile: pair.profile });
    }

    /// Activate a supported profile on up to `num_channels` channels.
    /// The count is clamped to what the profile supports.
    pub fn enable_profile(&mut self, pair: ProfileAtAddress, num_channels: u16) {
        let old = self.get_state(pair);
        if !old.is_supported() {
            return;
        }
        if num_channels > MAX_CHANNELS {
            warn!(target: "profiles", "{} channels requested for {}, clamping", num_channels, pair);
        }

        let new = old.with_active_clamped(num_channels);
        if !self.commit(pair, new) {
            return;
        }

        debug!(target: "profiles", "enabled {} on {} channels", pair, new.active);
        self.notify(
            pair,
            Message::ProfileEnabledReport {
                profile: pair.profile,
                num_channels: new.active,
            },
        );
    }

    /// Deactivate a profile. Does nothing unless it is currently active.
    pub fn disable_profile(&mut self, pair: ProfileAtAddress) {
        let old = self.get_state(pair);
        if !old.is_active() {
            return;
        }
        if !self.commit(pair, SupportedAndActive::inactive(old.supported)) {
            return;
        }

        debug!(target: "profiles", "disabled {}", pair);
        self.notify(
            pair,
            Message::ProfileDisabledReport {
                profile: pair.profile,
                num_channels: 0,
            },
        );
    }

    pub fn get_state(&self, pair: ProfileAtAddress) -> SupportedAndActive {
        self.states.get(pair.address, &pair.profile)
    }

    pub fn states(&self) -> &ProfileStates {
        &self.states
    }

    pub fn aggregate(&self, scope: AggregateScope) -> AggregateState {
        self.states.aggregate(scope)
    }

    pub fn function_block(&self) -> &FunctionBlock {
        self.states.function_block()
    }

    pub fn is_responder(&self) -> bool {
        self.is_responder
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    fn commit(&mut self, pair: ProfileAtAddress, record: SupportedAndActive) -> bool {
        match self.states.set(pair.address, pair.profile, record) {
            Ok(()) => true,
            Err(e) => {
                error!(target: "profiles", "failed to update {}: {}", pair, e);
                false
            }
        }
    }

    fn is_current_enablement(&self, pair: ProfileAtAddress) -> bool {
        self.current_enablement.is_some_and(|current| {
            current.profile == pair.profile
                && current.address.normalized() == pair.address.normalized()
        })
    }

    fn notify(&mut self, pair: ProfileAtAddress, message: Message) {
        if !self.is_responder || self.is_current_enablement(pair) {
            return;
        }
        let header = broadcast_header(pair.address.channel, message.kind(), self.output.muid());
        self.output.send(pair.address.group, header, message);
    }
}

/// Marks a pair as mid-request for as long as it lives, restoring the
/// previous marker on drop (including while unwinding out of a delegate).
struct ScopedEnablement<'a, O> {
    profiles: &'a mut Profiles<O>,
    previous: Option<ProfileAtAddress>,
}

impl<'a, O> ScopedEnablement<'a, O> {
    fn new(profiles: &'a mut Profiles<O>, pair: ProfileAtAddress) -> Self {
        let previous = profiles.current_enablement.replace(pair);
        Self { profiles, previous }
    }
}

impl<O> Deref for ScopedEnablement<'_, O> {
    type Target = Profiles<O>;

    fn deref(&self) -> &Profiles<O> {
        &*self.profiles
    }
}

impl<O> DerefMut for ScopedEnablement<'_, O> {
    fn deref_mut(&mut self) -> &mut Profiles<O> {
        &mut *self.profiles
    }
}

impl<O> Drop for ScopedEnablement<'_, O> {
    fn drop(&mut self) {
        self.profiles.current_enablement = self.previous.take();
    }
}

fn broadcast_header(channel: ChannelInGroup, kind: MessageKind, source: Muid) -> Header {
    Header {
        channel,
        kind,
        version: IMPLEMENTATION_VERSION,
        source,
        destination: Muid::BROADCAST,
    }
}

fn inquiry_response(state: &DestinationState) -> Message {
    Message::ProfileInquiryResponse {
        active: state.active(),
        inactive: state.inactive(),
    }
}

/// Responder for profile negotiation messages.
pub struct ProfileHost<O, D> {
    profiles: Profiles<O>,
    delegate: D,
}

impl<O: BufferOutput, D: ProfileDelegate> ProfileHost<O, D> {
    pub fn new(block: FunctionBlock, output: O, delegate: D) -> Self {
        Self {
            profiles: Profiles::new(block, output),
            delegate,
        }
    }

    /// Build a host for the configured block and register the configured
    /// profiles. Nothing is broadcast, as the host is not a responder yet.
    pub fn from_config(config: &HostConfig, output: O, delegate: D) -> Self {
        let mut host = Self::new(config.function_block(), output, delegate);
        for (pair, max_channels) in config.initial_profiles() {
            host.add_profile(*pair, *max_channels);
        }
        host
    }

    pub fn add_profile(&mut self, pair: ProfileAtAddress, max_channels: u16) {
        self.profiles.add_profile(pair, max_channels);
    }

    pub fn remove_profile(&mut self, pair: ProfileAtAddress) {
        self.profiles.remove_profile(pair);
    }

    pub fn enable_profile(&mut self, pair: ProfileAtAddress, num_channels: u16) {
        self.profiles.enable_profile(pair, num_channels);
    }

    pub fn disable_profile(&mut self, pair: ProfileAtAddress) {
        self.profiles.disable_profile(pair);
    }

    pub fn get_state(&self, pair: ProfileAtAddress) -> SupportedAndActive {
        self.profiles.get_state(pair)
    }

    pub fn is_responder(&self) -> bool {
        self.profiles.is_responder()
    }

    pub fn profiles(&self) -> &Profiles<O> {
        &self.profiles
    }

    pub fn profiles_mut(&mut self) -> &mut Profiles<O> {
        &mut self.profiles
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Handle `message` if it belongs to profile negotiation.
    ///
    /// `output` describes where the message came from and carries the
    /// replies. Returns whether the message was handled.
    pub fn try_respond(&mut self, output: &mut dyn ResponderOutput, message: &Message) -> bool {
        match message {
            Message::ProfileInquiry => {
                self.inquiry_received(output);
                true
            }
            Message::ProfileDetails { profile, target } => {
                self.details_received(output, *profile, *target);
                true
            }
            Message::ProfileOn {
                profile,
                num_channels,
            } => {
                // Version 1 requests carry no channel count.
                let requested = if output.incoming_header().version >= 2 {
                    *num_channels
                } else {
                    1
                };
                self.enablement_received(output, *profile, requested, true);
                true
            }
            Message::ProfileOff { profile } => {
                self.enablement_received(output, *profile, 0, false);
                true
            }
            Message::ProfileInquiryResponse { .. }
            | Message::ProfileEnabledReport { .. }
            | Message::ProfileDisabledReport { .. }
            | Message::ProfileAdded { .. }
            | Message::ProfileRemoved { .. }
            | Message::ProfileDetailsResponse { .. }
            | Message::Nak { .. }
            | Message::Other { .. } => false,
        }
    }

    fn incoming_address(output: &dyn ResponderOutput) -> ChannelAddress {
        ChannelAddress::new(output.incoming_group(), output.incoming_header().channel)
    }

    fn inquiry_received(&mut self, output: &mut dyn ResponderOutput) {
        self.profiles.is_responder = true;

        let address = Self::incoming_address(output);
        if address.is_block() {
            self.block_inquiry_received(output);
            return;
        }

        match self.profiles.states.state_for_destination(address) {
            Some(state) => output.reply(inquiry_response(state)),
            None => debug!(target: "profiles", "inquiry for unknown destination {}", address),
        }
    }

    /// Channel states first, then group states, then one block reply that
    /// is always sent so the requester knows nothing else follows.
    fn block_inquiry_received(&mut self, output: &mut dyn ResponderOutput) {
        let states = &self.profiles.states;
        let block = *states.function_block();
        let mut header = output.reply_header(MessageKind::ProfileInquiryResponse);

        for group in block.groups() {
            for (channel, state) in states.channel_states(group) {
                if !state.is_empty() {
                    header.channel = channel;
                    output.send(group, header, inquiry_response(state));
                }
            }
        }

        header.channel = ChannelInGroup::WholeGroup;
        for group in block.groups() {
            if let Some(state) = states.state_for_destination(ChannelAddress::whole_group(group)) {
                if !state.is_empty() {
                    output.send(group, header, inquiry_response(state));
                }
            }
        }

        header.channel = ChannelInGroup::WholeBlock;
        let block_response = states
            .state_for_destination(ChannelAddress::whole_block())
            .map(inquiry_response)
            .unwrap_or(Message::ProfileInquiryResponse {
                active: Vec::new(),
                inactive: Vec::new(),
            });
        let group = output.incoming_group();
        output.send(group, header, block_response);
    }

    fn details_received(&mut self, output: &mut dyn ResponderOutput, profile: ProfileId, target: u8) {
        if target != 0 {
            debug!(target: "profiles", "{}", ProfileError::MalformedTarget(target));
            output.send_nak(NakStatus::UNSUPPORTED_TARGET);
            return;
        }

        let address = Self::incoming_address(output);
        let state = self.profiles.states.get(address, &profile);
        output.reply(Message::ProfileDetailsResponse {
            profile,
            target,
            data: marshalling::write_details(state.active, state.supported),
        });
    }

    fn enablement_received(
        &mut self,
        output: &mut dyn ResponderOutput,
        profile: ProfileId,
        num_channels: u16,
        enable: bool,
    ) {
        let pair = ProfileAtAddress::new(profile, Self::incoming_address(output));

        if !self.profiles.get_state(pair).is_supported() {
            let err = ProfileError::UnsupportedProfile;
            warn!(target: "profiles", "rejecting request for {}: {}", pair, err);
            output.send_nak(NakStatus::NAK);
            return;
        }

        let source = output.incoming_header().source;
        {
            let mut scope = ScopedEnablement::new(&mut self.profiles, pair);
            self.delegate
                .profile_enablement_requested(&mut *scope, source, pair, num_channels, enable);
        }

        let current = self.profiles.get_state(pair);
        let message = if current.is_active() {
            Message::ProfileEnabledReport {
                profile,
                num_channels: current.active,
            }
        } else {
            Message::ProfileDisabledReport {
                profile,
                num_channels: 0,
            }
        };
        let header = broadcast_header(pair.address.channel, message.kind(), output.muid());
        output.send(pair.address.group, header, message);

        self.profiles.is_responder = true;
    }
}
