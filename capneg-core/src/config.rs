use serde::Deserialize;
use thiserror::Error;

use capneg_types::{
    ChannelAddress, ChannelInGroup, Muid, ProfileAtAddress, ProfileId, CHANNELS_PER_GROUP,
    MAX_CHANNELS,
};

use crate::block::FunctionBlock;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid channel '{0}', expected 0-15, \"group\" or \"block\"")]
    InvalidChannel(String),

    #[error("profile {profile}: {reason}")]
    InvalidProfile { profile: ProfileId, reason: String },
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    endpoint: EndpointConfig,
    #[serde(default)]
    block: BlockConfig,
    profiles: Option<Vec<ProfileEntry>>,
}

#[derive(Deserialize, Default)]
struct EndpointConfig {
    muid: Option<u32>,
}

#[derive(Deserialize, Default)]
struct BlockConfig {
    first_group: Option<u8>,
    num_groups: Option<u8>,
    channels_per_group: Option<u8>,
}

#[derive(Deserialize)]
struct ProfileEntry {
    id: [u8; 5],
    #[serde(default)]
    group: u8,
    channel: ChannelSpec,
    #[serde(default = "default_max_channels")]
    max_channels: u16,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChannelSpec {
    Index(u8),
    Named(String),
}

fn default_max_channels() -> u16 {
    1
}

/// Endpoint identity, function block, and profiles to register at startup.
#[derive(Debug, Clone)]
pub struct HostConfig {
    muid: Muid,
    block: FunctionBlock,
    profiles: Vec<(ProfileAtAddress, u16)>,
}

impl HostConfig {
    /// The embedded defaults.
    pub fn load() -> Self {
        let base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        Self::build(base).expect("Embedded config.toml is invalid")
    }

    /// The embedded defaults overlaid with `text`.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        let user: ConfigFile = toml::from_str(text)?;

        merge_endpoint(&mut base.endpoint, user.endpoint);
        merge_block(&mut base.block, user.block);
        if user.profiles.is_some() {
            base.profiles = user.profiles;
        }

        Self::build(base)
    }

    pub fn muid(&self) -> Muid {
        self.muid
    }

    pub fn function_block(&self) -> FunctionBlock {
        self.block
    }

    pub fn initial_profiles(&self) -> &[(ProfileAtAddress, u16)] {
        &self.profiles
    }

    fn build(file: ConfigFile) -> Result<Self, ConfigError> {
        let fallback = FunctionBlock::default();
        let block = FunctionBlock::new(
            file.block.first_group.unwrap_or(fallback.first_group()),
            file.block.num_groups.unwrap_or(fallback.num_groups()),
            file.block
                .channels_per_group
                .unwrap_or(fallback.channels_per_group()),
        );

        let profiles = file
            .profiles
            .unwrap_or_default()
            .into_iter()
            .map(parse_profile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            muid: Muid::new(file.endpoint.muid.unwrap_or(0)),
            block,
            profiles,
        })
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::load()
    }
}

fn merge_endpoint(base: &mut EndpointConfig, user: EndpointConfig) {
    if user.muid.is_some() {
        base.muid = user.muid;
    }
}

fn merge_block(base: &mut BlockConfig, user: BlockConfig) {
    if user.first_group.is_some() {
        base.first_group = user.first_group;
    }
    if user.num_groups.is_some() {
        base.num_groups = user.num_groups;
    }
    if user.channels_per_group.is_some() {
        base.channels_per_group = user.channels_per_group;
    }
}

fn parse_channel(spec: &ChannelSpec) -> Option<ChannelInGroup> {
    match spec {
        ChannelSpec::Index(c) if *c < CHANNELS_PER_GROUP => Some(ChannelInGroup::Channel(*c)),
        ChannelSpec::Index(_) => None,
        ChannelSpec::Named(name) => match name.to_lowercase().as_str() {
            "group" | "whole_group" => Some(ChannelInGroup::WholeGroup),
            "block" | "whole_block" => Some(ChannelInGroup::WholeBlock),
            _ => None,
        },
    }
}

fn parse_profile(entry: ProfileEntry) -> Result<(ProfileAtAddress, u16), ConfigError> {
    let profile = ProfileId::new(entry.id);
    let channel = parse_channel(&entry.channel).ok_or_else(|| {
        ConfigError::InvalidChannel(match &entry.channel {
            ChannelSpec::Index(c) => c.to_string(),
            ChannelSpec::Named(name) => name.clone(),
        })
    })?;
    if entry.max_channels == 0 || entry.max_channels > MAX_CHANNELS {
        return Err(ConfigError::InvalidProfile {
            profile,
            reason: format!("max_channels must be 1-256, got {}", entry.max_channels),
        });
    }
    Ok((
        ProfileAtAddress::new(profile, ChannelAddress::new(entry.group, channel)),
        entry.max_channels,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_embedded_config() {
        let config = HostConfig::load();
        assert_eq!(config.muid(), Muid::new(0x0123456));
        assert_eq!(config.function_block(), FunctionBlock::default());
        assert!(config.initial_profiles().is_empty());
    }

    #[test]
    fn test_user_overrides_single_fields() {
        let config = HostConfig::from_toml_str("[block]\nnum_groups = 4\n").unwrap();
        let block = config.function_block();
        assert_eq!(block.first_group(), 0);
        assert_eq!(block.num_groups(), 4);
        assert_eq!(block.channels_per_group(), 16);
        assert_eq!(config.muid(), Muid::new(0x0123456));
    }

    #[test]
    fn test_profiles_parse() {
        let text = r#"
            [endpoint]
            muid = 0x42

            [[profiles]]
            id = [0x7e, 0x40, 0x01, 0x01, 0x01]
            channel = 3
            max_channels = 4

            [[profiles]]
            id = [0x7e, 0x40, 0x02, 0x01, 0x01]
            group = 0
            channel = "group"
        "#;
        let config = HostConfig::from_toml_str(text).unwrap();
        assert_eq!(config.muid(), Muid::new(0x42));

        let profiles = config.initial_profiles();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].0.address, ChannelAddress::channel(0, 3));
        assert_eq!(profiles[0].1, 4);
        assert_eq!(profiles[1].0.address, ChannelAddress::whole_group(0));
        assert_eq!(profiles[1].1, 1);
    }

    #[test]
    fn test_invalid_entries_are_reported() {
        let bad_channel = r#"
            [[profiles]]
            id = [1, 2, 3, 4, 5]
            channel = "everywhere"
        "#;
        assert!(matches!(
            HostConfig::from_toml_str(bad_channel),
            Err(ConfigError::InvalidChannel(_))
        ));

        let too_many = r#"
            [[profiles]]
            id = [1, 2, 3, 4, 5]
            channel = 0
            max_channels = 300
        "#;
        assert!(matches!(
            HostConfig::from_toml_str(too_many),
            Err(ConfigError::InvalidProfile { .. })
        ));

        assert!(matches!(
            HostConfig::from_toml_str("block = ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
