//! Core types: derivation paths, security levels, app config and firmware
//! generations.

use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

pub const HARDENED: u32 = 0x8000_0000;

/// BIP32 derivation path of the IOTA seed, 2 to 5 components.
///
/// Unlike the Ed25519 apps, the trinary app accepts non-hardened
/// components, so nothing is forced here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub const MIN_LEN: usize = 2;
    pub const MAX_LEN: usize = 5;

    pub fn new(components: Vec<u32>) -> Result<Self, LedgerError> {
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&components.len()) {
            return Err(LedgerError::InvalidArgument(format!(
                "invalid BIP32 path length: {} (expected {} to {})",
                components.len(),
                Self::MIN_LEN,
                Self::MAX_LEN
            )));
        }
        Ok(Self(components))
    }

    /// `44'/4218'/account'/change'`, the default IOTA wallet layout.
    #[must_use]
    pub fn iota(account: u32, change: u32) -> Self {
        Self(vec![
            44 | HARDENED,
            4218 | HARDENED,
            account | HARDENED,
            change | HARDENED,
        ])
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for DerivationPath {
    type Err = LedgerError;

    /// Accepts `44'/4218'/0'/0'`, with or without a leading `m/`; `'` or
    /// `h` marks a hardened component.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix("m/").unwrap_or(s);
        let components = body
            .split('/')
            .map(|part| {
                let (digits, hardened) = match part.strip_suffix(['\'', 'h']) {
                    Some(d) => (d, true),
                    None => (part, false),
                };
                let value: u32 = digits.parse().map_err(|_| {
                    LedgerError::InvalidArgument(format!("invalid BIP32 path string: {s}"))
                })?;
                if value & HARDENED != 0 {
                    return Err(LedgerError::InvalidArgument(format!(
                        "BIP32 path component {value} out of range"
                    )));
                }
                Ok(if hardened { value | HARDENED } else { value })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(components)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for &c in &self.0 {
            let val = c & !HARDENED;
            let h = if c & HARDENED != 0 { "'" } else { "" };
            write!(f, "/{val}{h}")?;
        }
        Ok(())
    }
}

/// Number of 2187-tryte signature fragments per input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SecurityLevel {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl SecurityLevel {
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = LedgerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            _ => Err(LedgerError::InvalidArgument(format!(
                "invalid security level provided: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AppVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl AppVersion {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// App flag bits as reported by GET_APP_CONFIG.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppFlags(pub u8);

impl AppFlags {
    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, mask: u8) -> bool {
        self.0 & mask == mask
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub version: AppVersion,
    pub flags: AppFlags,
    /// Only reported by trinary firmware 0.5 and newer.
    pub max_bundle_size: Option<u8>,
}

/// Command set spoken by the app on the device, resolved once per
/// activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareGeneration {
    /// Trinary app before 0.5.0: seed installed once via SET_SEED.
    Legacy,
    /// Trinary app 0.5.0 and newer: every PUBKEY and first TX carry the
    /// seed header.
    Current,
    /// Ed25519 Stardust app: addresses are streamed through the data buffer.
    Stardust,
}

impl FirmwareGeneration {
    pub const CURRENT_SINCE: AppVersion = AppVersion::new(0, 5, 0);

    /// Generation of the trinary app for a reported version.
    pub fn for_trinary(version: AppVersion) -> Self {
        if version < Self::CURRENT_SINCE {
            Self::Legacy
        } else {
            Self::Current
        }
    }
}

/// Network selector of the Stardust app, sent as P1 of SET_ACCOUNT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AppMode {
    IotaStardust = 0x01,
    IotaStardustTestnet = 0x81,
    Shimmer = 0x03,
    ShimmerTestnet = 0x83,
}

impl AppMode {
    /// Bech32 human readable part of addresses on this network.
    pub fn hrp(self) -> &'static str {
        match self {
            Self::IotaStardust => "iota",
            Self::IotaStardustTestnet => "atoi",
            Self::Shimmer => "smr",
            Self::ShimmerTestnet => "rms",
        }
    }

    /// BIP44 coin type the app expects in the second path component.
    pub fn coin_type(self) -> u32 {
        match self {
            Self::IotaStardust => 4218,
            Self::Shimmer => 4219,
            Self::IotaStardustTestnet | Self::ShimmerTestnet => 1,
        }
    }
}
