//! EVS rate ladders
//!
//! Bidirectional mapping between the number of bits carried in one 20 ms
//! frame, the bit rate, and the 4-bit rate index that travels in the low
//! nibble of the ToC and mode bytes. Two independent ladders exist: the EVS
//! primary modes and the AMR-WB interoperable (IO) modes.

use crate::types::CodecFamily;
use std::fmt;

/// Frames per second; every EVS frame covers 20 ms
pub const FRAMES_PER_SECOND: u32 = 50;

/// Largest frame the protocol can carry (128 kbit/s for 20 ms)
pub const MAX_BITS_PER_FRAME: usize = 2560;

/// Bit rate per primary rate index (3GPP TS 26.445 Table A.4)
///
/// Indices 13 and 14 are future use / speech lost and carry no rate.
static PRIMARY_INDEX_TO_RATE: [u32; 16] = [
    2800, 7200, 8000, 9600, 13200, 16400, 24400, 32000, 48000, 64000, 96000, 128000, 2400, 0, 0, 0,
];

/// Bit rate per AMR-WB IO rate index (3GPP TS 26.445 Table A.5)
static LEGACY_INDEX_TO_RATE: [u32; 10] = [
    6600, 8850, 12650, 14250, 15850, 18250, 19850, 23050, 23850, 1750,
];

/// EVS primary rate buckets
///
/// The discriminant is the rate index carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PrimaryMode {
    /// 2.8 kbit/s PPP/NELP frames of source-controlled VBR
    Rate2800 = 0,
    /// 7.2 kbit/s
    Rate7200 = 1,
    /// 8.0 kbit/s
    Rate8000 = 2,
    /// 9.6 kbit/s
    Rate9600 = 3,
    /// 13.2 kbit/s
    Rate13200 = 4,
    /// 16.4 kbit/s
    Rate16400 = 5,
    /// 24.4 kbit/s
    Rate24400 = 6,
    /// 32 kbit/s
    Rate32000 = 7,
    /// 48 kbit/s
    Rate48000 = 8,
    /// 64 kbit/s
    Rate64000 = 9,
    /// 96 kbit/s
    Rate96000 = 10,
    /// 128 kbit/s
    Rate128000 = 11,
    /// 2.4 kbit/s silence descriptor
    Sid = 12,
    /// No data (DTX)
    NoData = 15,
}

impl PrimaryMode {
    /// All fourteen buckets, ascending by bit rate
    pub const ALL: [Self; 14] = [
        Self::NoData,
        Self::Sid,
        Self::Rate2800,
        Self::Rate7200,
        Self::Rate8000,
        Self::Rate9600,
        Self::Rate13200,
        Self::Rate16400,
        Self::Rate24400,
        Self::Rate32000,
        Self::Rate48000,
        Self::Rate64000,
        Self::Rate96000,
        Self::Rate128000,
    ];

    /// Speech buckets addressable through a mode byte (indices 0..=11)
    pub const SPEECH: [Self; 12] = [
        Self::Rate2800,
        Self::Rate7200,
        Self::Rate8000,
        Self::Rate9600,
        Self::Rate13200,
        Self::Rate16400,
        Self::Rate24400,
        Self::Rate32000,
        Self::Rate48000,
        Self::Rate64000,
        Self::Rate96000,
        Self::Rate128000,
    ];

    /// Rate index carried on the wire
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Resolve a wire rate index
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0..=11 => Some(Self::SPEECH[index as usize]),
            12 => Some(Self::Sid),
            15 => Some(Self::NoData),
            _ => None,
        }
    }

    /// Bit rate in bits per second
    pub fn bit_rate(self) -> u32 {
        PRIMARY_INDEX_TO_RATE[self.index() as usize]
    }

    /// Bits in one 20 ms frame
    pub fn bits_per_frame(self) -> usize {
        (self.bit_rate() / FRAMES_PER_SECOND) as usize
    }

    /// Exact lookup by bits per frame
    pub fn from_bit_count(bit_count: usize) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.bits_per_frame() == bit_count)
    }

    /// Exact lookup by bit rate
    pub fn from_bit_rate(bit_rate: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|mode| mode.bit_rate() == bit_rate)
    }

    /// Whether this bucket carries speech
    pub fn is_speech(self) -> bool {
        !matches!(self, Self::Sid | Self::NoData)
    }
}

impl fmt::Display for PrimaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sid => write!(f, "EVS SID"),
            Self::NoData => write!(f, "EVS NO_DATA"),
            mode => write!(f, "EVS {}bps", mode.bit_rate()),
        }
    }
}

/// AMR-WB IO rate buckets
///
/// The discriminant is the rate index carried on the wire and the bit
/// position in the `mode-set` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum LegacyIoMode {
    /// 6.60 kbit/s
    Rate6600 = 0,
    /// 8.85 kbit/s
    Rate8850 = 1,
    /// 12.65 kbit/s
    Rate12650 = 2,
    /// 14.25 kbit/s
    Rate14250 = 3,
    /// 15.85 kbit/s
    Rate15850 = 4,
    /// 18.25 kbit/s
    Rate18250 = 5,
    /// 19.85 kbit/s
    Rate19850 = 6,
    /// 23.05 kbit/s
    Rate23050 = 7,
    /// 23.85 kbit/s
    Rate23850 = 8,
    /// 1.75 kbit/s silence descriptor
    Sid = 9,
}

impl LegacyIoMode {
    /// Number of buckets
    pub const COUNT: usize = 10;

    /// All buckets in wire index order
    pub const BY_INDEX: [Self; 10] = [
        Self::Rate6600,
        Self::Rate8850,
        Self::Rate12650,
        Self::Rate14250,
        Self::Rate15850,
        Self::Rate18250,
        Self::Rate19850,
        Self::Rate23050,
        Self::Rate23850,
        Self::Sid,
    ];

    /// All buckets, ascending by bit rate
    pub const ALL: [Self; 10] = [
        Self::Sid,
        Self::Rate6600,
        Self::Rate8850,
        Self::Rate12650,
        Self::Rate14250,
        Self::Rate15850,
        Self::Rate18250,
        Self::Rate19850,
        Self::Rate23050,
        Self::Rate23850,
    ];

    /// Rate index carried on the wire
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Resolve a wire rate index
    pub fn from_index(index: u8) -> Option<Self> {
        Self::BY_INDEX.get(index as usize).copied()
    }

    /// Bit rate in bits per second
    pub fn bit_rate(self) -> u32 {
        LEGACY_INDEX_TO_RATE[self.index() as usize]
    }

    /// Bits in one 20 ms frame
    pub fn bits_per_frame(self) -> usize {
        (self.bit_rate() / FRAMES_PER_SECOND) as usize
    }

    /// Exact lookup by bits per frame
    pub fn from_bit_count(bit_count: usize) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.bits_per_frame() == bit_count)
    }

    /// Exact lookup by bit rate
    pub fn from_bit_rate(bit_rate: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|mode| mode.bit_rate() == bit_rate)
    }
}

impl fmt::Display for LegacyIoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sid => write!(f, "AMR-WB IO SID"),
            mode => write!(f, "AMR-WB IO {}bps", mode.bit_rate()),
        }
    }
}

/// Result of a rate ladder lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateBucket {
    /// EVS primary bucket
    Primary(PrimaryMode),
    /// AMR-WB IO bucket
    LegacyIo(LegacyIoMode),
    /// Not on either ladder; treat the frame as corrupted
    Unknown,
}

impl RateBucket {
    /// Family of the bucket, `None` for `Unknown`
    pub fn family(self) -> Option<CodecFamily> {
        match self {
            Self::Primary(_) => Some(CodecFamily::Primary),
            Self::LegacyIo(_) => Some(CodecFamily::LegacyIo),
            Self::Unknown => None,
        }
    }

    /// Wire rate index, `None` for `Unknown`
    pub fn index(self) -> Option<u8> {
        match self {
            Self::Primary(mode) => Some(mode.index()),
            Self::LegacyIo(mode) => Some(mode.index()),
            Self::Unknown => None,
        }
    }

    /// Bit rate in bits per second, `None` for `Unknown`
    pub fn bit_rate(self) -> Option<u32> {
        match self {
            Self::Primary(mode) => Some(mode.bit_rate()),
            Self::LegacyIo(mode) => Some(mode.bit_rate()),
            Self::Unknown => None,
        }
    }

    /// DTX produced no frame for this window
    pub fn is_no_data(self) -> bool {
        matches!(self, Self::Primary(PrimaryMode::NoData))
    }
}

/// Map the bits produced for one frame to a rate bucket
///
/// The ladder of `family` is searched first, then the other one. Any count
/// on neither ladder yields [`RateBucket::Unknown`].
pub fn rate_to_mode(family: CodecFamily, bit_count: usize) -> RateBucket {
    let primary = || PrimaryMode::from_bit_count(bit_count).map(RateBucket::Primary);
    let legacy = || LegacyIoMode::from_bit_count(bit_count).map(RateBucket::LegacyIo);

    let found = match family {
        CodecFamily::Primary => primary().or_else(legacy),
        CodecFamily::LegacyIo => legacy().or_else(primary),
    };

    found.unwrap_or(RateBucket::Unknown)
}

/// Map a wire rate index back to its bucket
pub fn index_to_mode(family: CodecFamily, index: u8) -> RateBucket {
    let found = match family {
        CodecFamily::Primary => PrimaryMode::from_index(index).map(RateBucket::Primary),
        CodecFamily::LegacyIo => LegacyIoMode::from_index(index).map(RateBucket::LegacyIo),
    };

    found.unwrap_or(RateBucket::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_bits_per_frame() {
        assert_eq!(PrimaryMode::NoData.bits_per_frame(), 0);
        assert_eq!(PrimaryMode::Sid.bits_per_frame(), 48);
        assert_eq!(PrimaryMode::Rate2800.bits_per_frame(), 56);
        assert_eq!(PrimaryMode::Rate13200.bits_per_frame(), 264);
        assert_eq!(PrimaryMode::Rate128000.bits_per_frame(), MAX_BITS_PER_FRAME);
    }

    #[test]
    fn test_legacy_bits_per_frame() {
        assert_eq!(LegacyIoMode::Sid.bits_per_frame(), 35);
        assert_eq!(LegacyIoMode::Rate6600.bits_per_frame(), 132);
        assert_eq!(LegacyIoMode::Rate8850.bits_per_frame(), 177);
        assert_eq!(LegacyIoMode::Rate23850.bits_per_frame(), 477);
    }

    #[test]
    fn test_ladders_are_ascending() {
        for pair in PrimaryMode::ALL.windows(2) {
            assert!(pair[0].bit_rate() < pair[1].bit_rate());
        }
        for pair in LegacyIoMode::ALL.windows(2) {
            assert!(pair[0].bit_rate() < pair[1].bit_rate());
        }
    }

    #[test]
    fn test_index_round_trip() {
        for mode in PrimaryMode::ALL {
            assert_eq!(PrimaryMode::from_index(mode.index()), Some(mode));
        }
        for mode in LegacyIoMode::ALL {
            assert_eq!(LegacyIoMode::from_index(mode.index()), Some(mode));
        }
        assert_eq!(PrimaryMode::from_index(13), None);
        assert_eq!(PrimaryMode::from_index(14), None);
        assert_eq!(LegacyIoMode::from_index(10), None);
    }

    #[test]
    fn test_rate_to_mode() {
        assert_eq!(
            rate_to_mode(CodecFamily::Primary, 264),
            RateBucket::Primary(PrimaryMode::Rate13200)
        );
        assert_eq!(
            rate_to_mode(CodecFamily::LegacyIo, 253),
            RateBucket::LegacyIo(LegacyIoMode::Rate12650)
        );
        assert!(rate_to_mode(CodecFamily::LegacyIo, 0).is_no_data());
        // falls through to the other ladder
        assert_eq!(
            rate_to_mode(CodecFamily::Primary, 35),
            RateBucket::LegacyIo(LegacyIoMode::Sid)
        );
        assert_eq!(rate_to_mode(CodecFamily::Primary, 263), RateBucket::Unknown);
        assert_eq!(rate_to_mode(CodecFamily::LegacyIo, usize::MAX), RateBucket::Unknown);
    }

    #[test]
    fn test_index_to_mode() {
        assert_eq!(
            index_to_mode(CodecFamily::LegacyIo, 6),
            RateBucket::LegacyIo(LegacyIoMode::Rate19850)
        );
        assert_eq!(
            index_to_mode(CodecFamily::Primary, 6),
            RateBucket::Primary(PrimaryMode::Rate24400)
        );
        assert_eq!(index_to_mode(CodecFamily::LegacyIo, 12), RateBucket::Unknown);
        assert_eq!(index_to_mode(CodecFamily::Primary, 14), RateBucket::Unknown);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn rate_to_mode_is_total(bits in any::<usize>(), legacy in any::<bool>()) {
                let family = if legacy { CodecFamily::LegacyIo } else { CodecFamily::Primary };
                match rate_to_mode(family, bits) {
                    RateBucket::Primary(mode) => prop_assert_eq!(mode.bits_per_frame(), bits),
                    RateBucket::LegacyIo(mode) => prop_assert_eq!(mode.bits_per_frame(), bits),
                    RateBucket::Unknown => {
                        prop_assert!(PrimaryMode::from_bit_count(bits).is_none());
                        prop_assert!(LegacyIoMode::from_bit_count(bits).is_none());
                    }
                }
            }
        }
    }
}
