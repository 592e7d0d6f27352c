use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::foundation::error::{GpuPortError, GpuPortResult};

/// Number of bit-planes (output wires) in one frame-buffer word.
pub const MAX_CHANNELS: usize = 24;

const PROTOCOL_MASK: u8 = 0x0F;

/// Serial protocol driven on one output channel.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Channel is unused; its bit-plane stays low.
    #[default]
    None,
    /// WS281X addressable LED string (self-clocked NRZ, 24 bits per node).
    Ws281x,
    /// Plain (non-multiplexed) SSR bank. No live waveform is defined for it.
    PlainSsr,
    /// Charlieplexed / chipiplexed SSR bank driven by a dimming display list.
    CharlieplexSsr,
}

impl Protocol {
    /// Wire code stored in the low nibble of the channel type byte.
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Ws281x => 1,
            Self::PlainSsr => 2,
            Self::CharlieplexSsr => 3,
        }
    }

    /// Inverse of [`Protocol::code`].
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Ws281x),
            2 => Some(Self::PlainSsr),
            3 => Some(Self::CharlieplexSsr),
            _ => None,
        }
    }

    /// Short lowercase name, as accepted by [`ChannelType::from_str`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ws281x => "ws281x",
            Self::PlainSsr => "ssr",
            Self::CharlieplexSsr => "chplex",
        }
    }
}

bitflags! {
    /// Set of per-channel modifier flags.
    ///
    /// The bit values double as the high bits of the channel type byte.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    #[serde(transparent)]
    pub struct ChannelFlags: u8 {
        /// Swap red and green bytes before encoding (GRB strings).
        const RG_SWAP = 0x20;
        /// Downstream controller verifies the display-list checksum.
        const CHECKSUM = 0x40;
        /// Downstream SSR outputs are active-high.
        const ACTIVE_HIGH = 0x80;
    }
}

impl Default for ChannelFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Per-channel descriptor: protocol plus modifier flags.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ChannelType {
    /// Serial protocol for the channel.
    pub protocol: Protocol,
    /// Modifier flags.
    pub flags: ChannelFlags,
}

impl ChannelType {
    /// Unused channel.
    pub const NONE: Self = Self::new(Protocol::None, ChannelFlags::empty());

    /// Build a descriptor.
    pub const fn new(protocol: Protocol, flags: ChannelFlags) -> Self {
        Self { protocol, flags }
    }

    /// WS281X channel without modifiers.
    pub const fn ws281x() -> Self {
        Self::new(Protocol::Ws281x, ChannelFlags::empty())
    }

    /// Charlieplex SSR channel without modifiers.
    pub const fn charlieplex() -> Self {
        Self::new(Protocol::CharlieplexSsr, ChannelFlags::empty())
    }

    /// Same protocol with `flags` added.
    pub const fn with(self, flags: ChannelFlags) -> Self {
        Self::new(self.protocol, self.flags.union(flags))
    }

    /// One-byte wire form: protocol code in the low nibble, flags in the high bits.
    pub const fn to_byte(self) -> u8 {
        self.protocol.code() | self.flags.bits()
    }

    /// Parse the one-byte wire form.
    pub fn from_byte(byte: u8) -> GpuPortResult<Self> {
        let protocol = Protocol::from_code(byte & PROTOCOL_MASK).ok_or_else(|| {
            GpuPortError::config(format!("unknown protocol code in channel type 0x{byte:02x}"))
        })?;
        let flags = ChannelFlags::from_bits(byte & !PROTOCOL_MASK).ok_or_else(|| {
            GpuPortError::config(format!("unknown flag bits in channel type 0x{byte:02x}"))
        })?;
        Ok(Self::new(protocol, flags))
    }

    /// Flags the protocol understands, or `None` when it has no live waveform.
    pub const fn supported_flags(self) -> Option<ChannelFlags> {
        match self.protocol {
            Protocol::Ws281x => Some(ChannelFlags::RG_SWAP),
            Protocol::CharlieplexSsr => Some(ChannelFlags::CHECKSUM.union(ChannelFlags::ACTIVE_HIGH)),
            Protocol::None | Protocol::PlainSsr => None,
        }
    }

    /// Whether [`check_encodable`](Self::check_encodable) would pass.
    pub const fn is_encodable(self) -> bool {
        match self.supported_flags() {
            Some(allowed) => self.flags.difference(allowed).is_empty(),
            None => false,
        }
    }

    /// Check that the protocol has a live waveform and understands every flag set.
    ///
    /// Failures are encoding errors: the channel is skipped, other channels still encode.
    pub fn check_encodable(self) -> GpuPortResult<()> {
        let Some(allowed) = self.supported_flags() else {
            return Err(GpuPortError::encode(format!(
                "no waveform for protocol '{}'",
                self.protocol.name()
            )));
        };
        let extra = self.flags.difference(allowed);
        if !extra.is_empty() {
            return Err(GpuPortError::encode(format!(
                "protocol '{}' does not support flag bits 0x{:02x}",
                self.protocol.name(),
                extra.bits()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.protocol.name())?;
        for (name, _) in self.flags.iter_names() {
            write!(f, "+{}", name.to_ascii_lowercase())?;
        }
        Ok(())
    }
}

/// Parses `protocol[+flag...]`, e.g. `ws281x+rg_swap` or `chplex+checksum+active_high`.
impl FromStr for ChannelType {
    type Err = GpuPortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('+').map(str::trim);
        let protocol = match parts.next().unwrap_or_default().to_ascii_lowercase().as_str() {
            "none" => Protocol::None,
            "ws281x" | "ws2811" | "ws2812" => Protocol::Ws281x,
            "ssr" | "plain_ssr" => Protocol::PlainSsr,
            "chplex" | "charlieplex" | "chipiplex" => Protocol::CharlieplexSsr,
            other => {
                return Err(GpuPortError::config(format!("unknown protocol '{other}'")));
            }
        };
        let mut flags = ChannelFlags::empty();
        for part in parts {
            let name = match part.to_ascii_uppercase().as_str() {
                "RGSWAP" => "RG_SWAP".to_string(),
                "POLARITY" => "ACTIVE_HIGH".to_string(),
                other => other.to_string(),
            };
            flags |= ChannelFlags::from_name(&name)
                .ok_or_else(|| GpuPortError::config(format!("unknown flag '{part}'")))?;
        }
        Ok(Self::new(protocol, flags))
    }
}

/// Channel descriptors of one canvas, indexed `0..num_channels`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelTable {
    types: Vec<ChannelType>,
}

impl ChannelTable {
    /// Table of `num_channels` unused channels.
    pub fn new(num_channels: usize) -> GpuPortResult<Self> {
        if num_channels == 0 || num_channels > MAX_CHANNELS {
            return Err(GpuPortError::config(format!(
                "num_channels must be in 1..={MAX_CHANNELS}, got {num_channels}"
            )));
        }
        Ok(Self {
            types: vec![ChannelType::NONE; num_channels],
        })
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always false; a table has at least one channel.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Descriptor of channel `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<ChannelType> {
        self.types.get(index).copied()
    }

    /// Replace the descriptor of channel `index` and return the previous one.
    ///
    /// Out-of-range indices return `None` and leave the table untouched.
    pub fn set(&mut self, index: usize, new_type: ChannelType) -> Option<ChannelType> {
        let slot = self.types.get_mut(index)?;
        Some(std::mem::replace(slot, new_type))
    }

    /// Iterate descriptors in channel order.
    pub fn iter(&self) -> impl Iterator<Item = ChannelType> + '_ {
        self.types.iter().copied()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/channel/table.rs"]
mod tests;
