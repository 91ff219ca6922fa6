//! Per-destination profile table.
//!
//! A destination is one channel, one whole group, or the whole block. Each
//! destination maps profile ids to their supported/active channel counts.
//! Destinations are created on first mutable access and live as long as the
//! table does.

use std::collections::BTreeMap;

use capneg_types::{
    ChannelAddress, ChannelInGroup, ProfileError, ProfileId, SupportedAndActive,
};

use crate::block::FunctionBlock;

static EMPTY: DestinationState = DestinationState {
    profiles: BTreeMap::new(),
};

/// Profiles registered at a single destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationState {
    profiles: BTreeMap<ProfileId, SupportedAndActive>,
}

impl DestinationState {
    pub fn get(&self, profile: &ProfileId) -> SupportedAndActive {
        self.profiles.get(profile).copied().unwrap_or_default()
    }

    /// Overwrite the record for `profile`. A record with nothing supported
    /// removes the profile.
    pub fn set(&mut self, profile: ProfileId, record: SupportedAndActive) -> Result<(), ProfileError> {
        let record = SupportedAndActive::new(record.supported, record.active)?;
        if record.is_supported() {
            self.profiles.insert(profile, record);
        } else {
            self.profiles.remove(&profile);
        }
        Ok(())
    }

    pub fn erase(&mut self, profile: &ProfileId) {
        self.profiles.remove(profile);
    }

    pub fn active(&self) -> Vec<ProfileId> {
        self.profiles
            .iter()
            .filter(|(_, r)| r.is_active())
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn inactive(&self) -> Vec<ProfileId> {
        self.profiles
            .iter()
            .filter(|(_, r)| !r.is_active())
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProfileId, &SupportedAndActive)> {
        self.profiles.iter()
    }
}

/// Which part of the block an aggregate rolls up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateScope {
    Group(u8),
    Block,
}

impl AggregateScope {
    fn address(self) -> ChannelAddress {
        match self {
            Self::Group(group) => ChannelAddress::whole_group(group),
            Self::Block => ChannelAddress::whole_block(),
        }
    }
}

/// One profile's roll-up across the channels of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateEntry {
    /// Smallest supported count among the channels that carry the profile.
    pub supported: u16,
    /// How many channels currently have the profile active.
    pub active_channels: u16,
}

impl AggregateEntry {
    pub fn is_active(&self) -> bool {
        self.active_channels != 0
    }
}

/// Channel-level records rolled up into a group or block view.
///
/// Derived on every query and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateState {
    entries: BTreeMap<ProfileId, AggregateEntry>,
}

impl AggregateState {
    pub fn get(&self, profile: &ProfileId) -> Option<&AggregateEntry> {
        self.entries.get(profile)
    }

    pub fn active(&self) -> Vec<ProfileId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_active())
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn inactive(&self) -> Vec<ProfileId> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_active())
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Every destination's profiles for one function block.
#[derive(Debug, Clone)]
pub struct ProfileStates {
    block: FunctionBlock,
    destinations: BTreeMap<ChannelAddress, DestinationState>,
}

impl ProfileStates {
    pub fn new(block: FunctionBlock) -> Self {
        Self {
            block,
            destinations: BTreeMap::new(),
        }
    }

    pub fn function_block(&self) -> &FunctionBlock {
        &self.block
    }

    /// State at `address`, or `None` if the address is outside the block.
    /// Destinations that were never written read as empty.
    pub fn state_for_destination(&self, address: ChannelAddress) -> Option<&DestinationState> {
        if !self.block.contains(address) {
            return None;
        }
        Some(
            self.destinations
                .get(&address.normalized())
                .unwrap_or(&EMPTY),
        )
    }

    /// Mutable state at `address`, creating it on first use.
    pub fn state_for_destination_mut(
        &mut self,
        address: ChannelAddress,
    ) -> Option<&mut DestinationState> {
        if !self.block.contains(address) {
            return None;
        }
        Some(self.destinations.entry(address.normalized()).or_default())
    }

    pub fn get(&self, address: ChannelAddress, profile: &ProfileId) -> SupportedAndActive {
        self.state_for_destination(address)
            .map(|state| state.get(profile))
            .unwrap_or_default()
    }

    pub fn set(
        &mut self,
        address: ChannelAddress,
        profile: ProfileId,
        record: SupportedAndActive,
    ) -> Result<(), ProfileError> {
        // Validate before touching the map so a rejected write creates nothing.
        SupportedAndActive::new(record.supported, record.active)?;
        self.state_for_destination_mut(address)
            .ok_or(ProfileError::UnknownDestination)?
            .set(profile, record)
    }

    pub fn erase(&mut self, address: ChannelAddress, profile: &ProfileId) {
        if let Some(state) = self.destinations.get_mut(&address.normalized()) {
            state.erase(profile);
        }
    }

    /// Roll the channel-level records of `scope` up into one view.
    pub fn aggregate(&self, scope: AggregateScope) -> AggregateState {
        let mut entries: BTreeMap<ProfileId, AggregateEntry> = BTreeMap::new();

        for target in self.block.resolve_targets(scope.address()) {
            let Some(state) = self.destinations.get(&target) else {
                continue;
            };
            for (profile, record) in state.iter() {
                let active = u16::from(record.is_active());
                entries
                    .entry(*profile)
                    .and_modify(|e| {
                        e.supported = e.supported.min(record.supported);
                        e.active_channels += active;
                    })
                    .or_insert(AggregateEntry {
                        supported: record.supported,
                        active_channels: active,
                    });
            }
        }

        AggregateState { entries }
    }

    /// Number of destinations holding at least one profile.
    pub fn populated_destinations(&self) -> usize {
        self.destinations.values().filter(|s| !s.is_empty()).count()
    }

    /// Channel destinations of `group` in channel order.
    pub(crate) fn channel_states(
        &self,
        group: u8,
    ) -> impl Iterator<Item = (ChannelInGroup, &DestinationState)> {
        (0..self.block.channels_per_group()).map(move |c| {
            let address = ChannelAddress::channel(group, c);
            (
                address.channel,
                self.destinations.get(&address).unwrap_or(&EMPTY),
            )
        })
    }
}
