//! Platform profiles for the BoosterGen kit.
//!
//! The kit exposes the same 16-bit service/characteristic values everywhere,
//! but host Bluetooth stacks differ in which representation they expect:
//! string-hex on Primary platforms, numeric on Secondary ones. The profile is
//! selected once at startup and passed explicitly from then on.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

/// Advertised name prefix of the kit.
pub const DEVICE_NAME_PREFIX: &str = "BeyoungBGen";

/// Bluetooth Base UUID with the 16-bit slot zeroed.
const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("invalid GATT identifier {0:?}")]
    InvalidIdentifier(String),
    #[error("unknown platform {0:?}, expected \"primary\" or \"secondary\"")]
    UnknownPlatform(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Primary,
    Secondary,
}

impl Platform {
    /// Maps the compile-time target to a profile variant. A settings
    /// override wins over detection.
    pub fn detect() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            Platform::Primary
        } else {
            Platform::Secondary
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Primary => write!(f, "primary"),
            Platform::Secondary => write!(f, "secondary"),
        }
    }
}

impl FromStr for Platform {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Platform::Primary),
            "secondary" => Ok(Platform::Secondary),
            other => Err(ProfileError::UnknownPlatform(other.to_string())),
        }
    }
}

/// A GATT identifier in whichever representation the platform stack expects.
/// Both forms of the same 16-bit value resolve to the same UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattId {
    /// String form, either a 16-bit hex value ("FFE0") or a full 128-bit UUID.
    Hex(String),
    /// Numeric form of a 16-bit assigned value.
    Short(u16),
}

impl GattId {
    /// Expands the identifier through the Bluetooth Base UUID.
    pub fn resolve(&self) -> Result<Uuid, ProfileError> {
        match self {
            GattId::Short(value) => Ok(short_uuid(*value)),
            GattId::Hex(text) => {
                if text.len() <= 4 {
                    u16::from_str_radix(text, 16)
                        .map(short_uuid)
                        .map_err(|_| ProfileError::InvalidIdentifier(text.clone()))
                } else {
                    Uuid::parse_str(text)
                        .map_err(|_| ProfileError::InvalidIdentifier(text.clone()))
                }
            }
        }
    }
}

impl fmt::Display for GattId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GattId::Hex(text) => write!(f, "{text}"),
            GattId::Short(value) => write!(f, "{value:#06X}"),
        }
    }
}

fn short_uuid(value: u16) -> Uuid {
    Uuid::from_u128(((value as u128) << 96) | BLUETOOTH_BASE_UUID)
}

/// Immutable connection parameters for the active platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub name_prefix: String,
    pub service: GattId,
    pub characteristic: GattId,
}

impl PlatformProfile {
    /// Pure selection function; the only externally varying parameter
    /// between the variants is the identifier representation.
    pub fn select(platform: Platform) -> Self {
        match platform {
            Platform::Primary => Self {
                platform,
                name_prefix: DEVICE_NAME_PREFIX.to_string(),
                service: GattId::Hex("FFE0".to_string()),
                characteristic: GattId::Hex("FFE1".to_string()),
            },
            Platform::Secondary => Self {
                platform,
                name_prefix: DEVICE_NAME_PREFIX.to_string(),
                service: GattId::Short(0xFFE0),
                characteristic: GattId::Short(0xFFE1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_representations_resolve_to_the_same_uuid() {
        let primary = PlatformProfile::select(Platform::Primary);
        let secondary = PlatformProfile::select(Platform::Secondary);

        assert_eq!(
            primary.service.resolve().unwrap(),
            secondary.service.resolve().unwrap()
        );
        assert_eq!(
            primary.characteristic.resolve().unwrap(),
            secondary.characteristic.resolve().unwrap()
        );
    }

    #[test]
    fn short_values_expand_through_the_base_uuid() {
        let uuid = GattId::Short(0xFFE0).resolve().unwrap();
        assert_eq!(
            uuid,
            Uuid::parse_str("0000ffe0-0000-1000-8000-00805f9b34fb").unwrap()
        );
    }

    #[test]
    fn full_uuid_strings_pass_through() {
        let id = GattId::Hex("0000ffe1-0000-1000-8000-00805f9b34fb".to_string());
        assert_eq!(id.resolve().unwrap(), GattId::Short(0xFFE1).resolve().unwrap());
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        assert!(GattId::Hex("GGGG".to_string()).resolve().is_err());
        assert!(GattId::Hex("not-a-uuid".to_string()).resolve().is_err());
    }

    #[test]
    fn platform_parsing() {
        assert_eq!("primary".parse::<Platform>().unwrap(), Platform::Primary);
        assert!("desktop".parse::<Platform>().is_err());
    }
}
