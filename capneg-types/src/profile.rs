//! Profile identifiers and per-destination records.

use serde::{Deserialize, Serialize};

use crate::address::ChannelAddress;
use crate::error::ProfileError;

/// Opaque 5-byte tag naming a negotiable feature.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProfileId(pub [u8; 5]);

impl ProfileId {
    pub fn new(bytes: [u8; 5]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8; 5] {
        &self.0
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// A profile at a specific destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProfileAtAddress {
    pub profile: ProfileId,
    pub address: ChannelAddress,
}

impl ProfileAtAddress {
    pub fn new(profile: ProfileId, address: ChannelAddress) -> Self {
        Self { profile, address }
    }
}

impl std::fmt::Display for ProfileAtAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.profile, self.address)
    }
}

/// Channel counts for one profile at one destination.
///
/// `supported == 0` means the profile is absent. `active` never exceeds
/// `supported`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupportedAndActive {
    pub supported: u16,
    pub active: u16,
}

impl SupportedAndActive {
    /// Build a record, rejecting `active > supported`.
    pub fn new(supported: u16, active: u16) -> Result<Self, ProfileError> {
        if active > supported {
            return Err(ProfileError::InvalidArgument { supported, active });
        }
        Ok(Self { supported, active })
    }

    /// A supported but inactive record.
    pub fn inactive(supported: u16) -> Self {
        Self {
            supported,
            active: 0,
        }
    }

    /// Keep `supported`, clamping the requested active count to it.
    pub fn with_active_clamped(self, requested: u16) -> Self {
        Self {
            supported: self.supported,
            active: requested.min(self.supported),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported != 0
    }

    pub fn is_active(&self) -> bool {
        self.active != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_rejects_active_above_supported() {
        let err = SupportedAndActive::new(2, 3).unwrap_err();
        assert_eq!(
            err,
            ProfileError::InvalidArgument {
                supported: 2,
                active: 3
            }
        );
        assert!(SupportedAndActive::new(2, 2).is_ok());
    }

    #[test]
    fn clamped_active_never_exceeds_supported() {
        let rec = SupportedAndActive::inactive(4).with_active_clamped(6);
        assert_eq!(rec, SupportedAndActive { supported: 4, active: 4 });
        assert!(rec.is_active());

        let none = SupportedAndActive::default().with_active_clamped(6);
        assert!(!none.is_supported());
        assert!(!none.is_active());
    }

    #[test]
    fn profile_id_display() {
        let id = ProfileId::new([0x7e, 0x31, 0x00, 0x01, 0x02]);
        assert_eq!(id.to_string(), "7e:31:00:01:02");
    }
}
