//! The range of groups and channels owned by an endpoint.

use capneg_types::{ChannelAddress, ChannelInGroup, CHANNELS_PER_GROUP, NUM_GROUPS};

/// A contiguous run of groups, each with the same number of channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionBlock {
    first_group: u8,
    num_groups: u8,
    channels_per_group: u8,
}

impl Default for FunctionBlock {
    fn default() -> Self {
        Self {
            first_group: 0,
            num_groups: 1,
            channels_per_group: CHANNELS_PER_GROUP,
        }
    }
}

impl FunctionBlock {
    /// Build a block, clamping the range to what an endpoint can address.
    pub fn new(first_group: u8, num_groups: u8, channels_per_group: u8) -> Self {
        let first_group = first_group.min(NUM_GROUPS - 1);
        Self {
            first_group,
            num_groups: num_groups.clamp(1, NUM_GROUPS - first_group),
            channels_per_group: channels_per_group.clamp(1, CHANNELS_PER_GROUP),
        }
    }

    pub fn first_group(&self) -> u8 {
        self.first_group
    }

    pub fn num_groups(&self) -> u8 {
        self.num_groups
    }

    pub fn channels_per_group(&self) -> u8 {
        self.channels_per_group
    }

    /// One past the last group, computed wide so it cannot wrap.
    fn end_group(&self) -> u16 {
        u16::from(self.first_group) + u16::from(self.num_groups)
    }

    pub fn groups(&self) -> impl Iterator<Item = u8> {
        let end = self.end_group();
        (self.first_group..=u8::MAX).take_while(move |g| u16::from(*g) < end)
    }

    pub fn contains_group(&self, group: u8) -> bool {
        group >= self.first_group && u16::from(group) < self.end_group()
    }

    /// Whether `address` names a destination inside this block.
    pub fn contains(&self, address: ChannelAddress) -> bool {
        match address.channel {
            ChannelInGroup::WholeBlock => true,
            ChannelInGroup::WholeGroup => self.contains_group(address.group),
            ChannelInGroup::Channel(c) => {
                self.contains_group(address.group) && c < self.channels_per_group
            }
        }
    }

    /// Expand an address into the concrete channel destinations it covers.
    pub fn resolve_targets(&self, address: ChannelAddress) -> Vec<ChannelAddress> {
        match address.channel {
            ChannelInGroup::Channel(_) if self.contains(address) => vec![address],
            ChannelInGroup::Channel(_) => Vec::new(),
            ChannelInGroup::WholeGroup if self.contains_group(address.group) => {
                self.channels_of(address.group).collect()
            }
            ChannelInGroup::WholeGroup => Vec::new(),
            ChannelInGroup::WholeBlock => self
                .groups()
                .flat_map(|group| self.channels_of(group))
                .collect(),
        }
    }

    fn channels_of(&self, group: u8) -> impl Iterator<Item = ChannelAddress> {
        (0..self.channels_per_group).map(move |c| ChannelAddress::channel(group, c))
    }
}
