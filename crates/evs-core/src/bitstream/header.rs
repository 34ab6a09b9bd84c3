//! Header-full payload bytes: CMR, ToC and the mode byte they share
//!
//! ```text
//!   ToC:  [H:1][F:1][legacy:1][Q:1][rate index:4]
//!   CMR:  [H:1][mode byte:7]            H = 1
//! ```

use crate::types::{Bandwidth, CodecFamily};

const HEADER_TYPE_BIT: u8 = 0x80;
const FOLLOWS_BIT: u8 = 0x40;
const LEGACY_BIT: u8 = 0x20;
const QUALITY_BIT: u8 = 0x10;
const RATE_INDEX_MASK: u8 = 0x0f;

/// Mode byte value meaning "no change requested"
pub const NO_REQUEST: u8 = 0x7f;

/// Table of contents byte in front of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TocByte {
    /// H bit; set means this byte is really a CMR
    pub header_type: bool,
    /// F bit; another ToC follows
    pub follows: bool,
    /// Family from the legacy bit
    pub family: CodecFamily,
    /// Q bit; clear marks a damaged AMR-WB IO frame
    pub quality: bool,
    /// 4-bit rate index
    pub rate_index: u8,
}

impl TocByte {
    /// ToC for a single outgoing frame
    ///
    /// The Q bit mirrors the legacy bit, so AMR-WB IO frames are sent as
    /// good frames and primary frames leave Q clear.
    pub fn for_frame(family: CodecFamily, rate_index: u8) -> Self {
        Self {
            header_type: false,
            follows: false,
            family,
            quality: family.is_legacy(),
            rate_index: rate_index & RATE_INDEX_MASK,
        }
    }

    /// Split a received byte into its fields
    pub fn from_byte(byte: u8) -> Self {
        Self {
            header_type: byte & HEADER_TYPE_BIT != 0,
            follows: byte & FOLLOWS_BIT != 0,
            family: CodecFamily::from_legacy_bit(byte & LEGACY_BIT != 0),
            quality: byte & QUALITY_BIT != 0,
            rate_index: byte & RATE_INDEX_MASK,
        }
    }

    /// Pack back into one byte
    pub fn to_byte(self) -> u8 {
        let mut byte = self.rate_index & RATE_INDEX_MASK;
        if self.header_type {
            byte |= HEADER_TYPE_BIT;
        }
        if self.follows {
            byte |= FOLLOWS_BIT;
        }
        if self.family.is_legacy() {
            byte |= LEGACY_BIT;
        }
        if self.quality {
            byte |= QUALITY_BIT;
        }
        byte
    }

    /// AMR-WB IO frame the sender flagged as damaged
    pub fn is_bad_frame(self) -> bool {
        self.family.is_legacy() && !self.quality
    }
}

/// Whether a payload byte has the H bit set
pub fn is_header_type(byte: u8) -> bool {
    byte & HEADER_TYPE_BIT != 0
}

/// CMR byte carrying `request`, or "no request" when `None`
pub fn cmr_byte(request: Option<u8>) -> u8 {
    HEADER_TYPE_BIT | request.map_or(NO_REQUEST, |mode| mode & NO_REQUEST)
}

/// Mode request carried by a CMR byte, `None` for "no request"
pub fn parse_cmr(byte: u8) -> Option<u8> {
    let mode = byte & NO_REQUEST;
    (mode != NO_REQUEST).then_some(mode)
}

/// High nibble of a mode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandwidthClass {
    /// 0x0_, primary narrowband
    Narrowband,
    /// 0x1_, AMR-WB IO
    LegacyIo,
    /// 0x2_, primary wideband
    Wideband,
    /// 0x3_, primary super-wideband
    SuperWideband,
    /// 0x4_, primary fullband
    Fullband,
    /// 0x5_, wideband channel-aware at 13.2 kbit/s
    WidebandChannelAware,
    /// 0x6_, super-wideband channel-aware at 13.2 kbit/s
    SuperWidebandChannelAware,
    /// 0x7_, reserved
    Reserved,
}

impl BandwidthClass {
    /// Class of the high nibble of `mode` (bit 7 ignored)
    pub fn from_mode(mode: u8) -> Self {
        match mode & 0x70 {
            0x00 => Self::Narrowband,
            0x10 => Self::LegacyIo,
            0x20 => Self::Wideband,
            0x30 => Self::SuperWideband,
            0x40 => Self::Fullband,
            0x50 => Self::WidebandChannelAware,
            0x60 => Self::SuperWidebandChannelAware,
            _ => Self::Reserved,
        }
    }

    /// High nibble value
    pub fn nibble(self) -> u8 {
        match self {
            Self::Narrowband => 0x00,
            Self::LegacyIo => 0x10,
            Self::Wideband => 0x20,
            Self::SuperWideband => 0x30,
            Self::Fullband => 0x40,
            Self::WidebandChannelAware => 0x50,
            Self::SuperWidebandChannelAware => 0x60,
            Self::Reserved => 0x70,
        }
    }

    /// Class naming a primary bandwidth without channel-aware mode
    pub fn for_bandwidth(bandwidth: Bandwidth) -> Self {
        match bandwidth {
            Bandwidth::Narrowband => Self::Narrowband,
            Bandwidth::Wideband => Self::Wideband,
            Bandwidth::SuperWideband => Self::SuperWideband,
            Bandwidth::Fullband => Self::Fullband,
        }
    }
}

/// Build a mode byte
pub fn mode_byte(class: BandwidthClass, rate_index: u8) -> u8 {
    class.nibble() | (rate_index & RATE_INDEX_MASK)
}
