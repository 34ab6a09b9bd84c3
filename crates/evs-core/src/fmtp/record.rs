//! Negotiable EVS capabilities
//!
//! A [`CapabilityRecord`] is the bit-packed form of one side's `a=fmtp`
//! line. Send and receive directions are kept apart; whose send direction
//! a field describes depends on how the record was parsed (see
//! [`Perspective`](crate::fmtp::Perspective)).

use crate::types::Bandwidth;
use std::fmt;

/// Bit-rate buckets, one bit per bucket
///
/// Bit 0 records that the direction was stated explicitly (`br-send`,
/// `br-recv`); bits 1 to 12 stand for 5.9, 7.2, 8, 9.6, 13.2, 16.4, 24.4,
/// 32, 48, 64, 96 and 128 kbit/s.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRateMask(u16);

impl BitRateMask {
    /// Every bucket, not explicitly stated
    pub const ALL: Self = Self(0x1ffe);
    /// Metadata bit
    pub const EXPLICIT_BIT: u16 = 0x0001;
    /// Bucket bits
    pub const SELECTABLE_BITS: u16 = 0x1ffe;
    /// Lowest bucket number
    pub const MIN_BUCKET: u8 = 1;
    /// Highest bucket number
    pub const MAX_BUCKET: u8 = 12;

    /// Wrap raw bits; anything above bit 12 is dropped
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & (Self::SELECTABLE_BITS | Self::EXPLICIT_BIT))
    }

    /// Every bucket from `start` to `end` inclusive
    pub fn from_range(start: u8, end: u8) -> Self {
        let start = start.max(Self::MIN_BUCKET);
        let end = end.min(Self::MAX_BUCKET);
        let bits = (start..=end).fold(0u16, |acc, bucket| acc | (1 << bucket));
        Self(bits)
    }

    /// Raw bits including the metadata bit
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Bucket bits only
    pub const fn selectable(self) -> u16 {
        self.0 & Self::SELECTABLE_BITS
    }

    /// Direction was stated explicitly
    pub const fn is_explicit(self) -> bool {
        self.0 & Self::EXPLICIT_BIT != 0
    }

    /// Same buckets, marked as explicitly stated
    pub const fn explicit(self) -> Self {
        Self(self.0 | Self::EXPLICIT_BIT)
    }

    /// Whether `bucket` is selectable
    pub fn contains(self, bucket: u8) -> bool {
        (Self::MIN_BUCKET..=Self::MAX_BUCKET).contains(&bucket) && self.0 & (1 << bucket) != 0
    }

    /// Lowest selectable bucket
    pub fn lowest(self) -> Option<u8> {
        (Self::MIN_BUCKET..=Self::MAX_BUCKET).find(|&bucket| self.contains(bucket))
    }

    /// Highest selectable bucket
    pub fn highest(self) -> Option<u8> {
        (Self::MIN_BUCKET..=Self::MAX_BUCKET)
            .rev()
            .find(|&bucket| self.contains(bucket))
    }

    /// Buckets both sides accept; stays explicit if either side was
    pub const fn intersect(self, other: Self) -> Self {
        Self((self.0 & other.0) | (self.0 & Self::EXPLICIT_BIT) | (other.0 & Self::EXPLICIT_BIT))
    }

    /// Selectable buckets are a single run without holes
    pub fn is_contiguous(self) -> bool {
        match (self.lowest(), self.highest()) {
            (Some(low), Some(high)) => Self::from_range(low, high).0 == self.selectable(),
            _ => true,
        }
    }
}

impl Default for BitRateMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Debug for BitRateMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitRateMask({:#06x})", self.0)
    }
}

/// Audio bandwidths, one bit per class
///
/// Bit 0 records an explicit `bw-send`/`bw-recv`; bits 1 to 4 stand for
/// nb, wb, swb and fb.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BandwidthMask(u8);

impl BandwidthMask {
    /// Every class, not explicitly stated
    pub const ALL: Self = Self(0x1e);
    /// Metadata bit
    pub const EXPLICIT_BIT: u8 = 0x01;
    /// Class bits
    pub const SELECTABLE_BITS: u8 = 0x1e;

    /// Wrap raw bits; anything above bit 4 is dropped
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::SELECTABLE_BITS | Self::EXPLICIT_BIT))
    }

    /// Raw bits including the metadata bit
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Class bits only
    pub const fn selectable(self) -> u8 {
        self.0 & Self::SELECTABLE_BITS
    }

    /// Direction was stated explicitly
    pub const fn is_explicit(self) -> bool {
        self.0 & Self::EXPLICIT_BIT != 0
    }

    /// Same classes, marked as explicitly stated
    pub const fn explicit(self) -> Self {
        Self(self.0 | Self::EXPLICIT_BIT)
    }

    /// Whether `bandwidth` is selectable
    pub fn contains(self, bandwidth: Bandwidth) -> bool {
        self.0 & (1 << (bandwidth.index() + 1)) != 0
    }

    /// Widest selectable class
    pub fn highest(self) -> Option<Bandwidth> {
        Bandwidth::ALL
            .iter()
            .rev()
            .copied()
            .find(|&bandwidth| self.contains(bandwidth))
    }

    /// Classes both sides accept; stays explicit if either side was
    pub const fn intersect(self, other: Self) -> Self {
        Self((self.0 & other.0) | (self.0 & Self::EXPLICIT_BIT) | (other.0 & Self::EXPLICIT_BIT))
    }
}

impl Default for BandwidthMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Debug for BandwidthMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BandwidthMask({:#04x})", self.0)
    }
}

/// Permitted AMR-WB IO modes, bit `n` for mode `n`
///
/// The empty set means every mode is permitted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModeSet(u16);

impl ModeSet {
    /// No restriction
    pub const ALL: Self = Self(0);
    /// Number of AMR-WB IO speech modes
    pub const MODES: u8 = 9;

    const MASK: u16 = 0x01ff;

    /// Wrap raw bits; anything above bit 8 is dropped
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::MASK)
    }

    /// Raw bits
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// No mode listed, so all are allowed
    pub const fn is_unrestricted(self) -> bool {
        self.0 == 0
    }

    /// Add a mode; values of 9 and above are ignored
    pub fn insert(&mut self, mode: u8) {
        if mode < Self::MODES {
            self.0 |= 1 << mode;
        }
    }

    /// Whether `mode` is explicitly listed
    pub fn contains(self, mode: u8) -> bool {
        mode < Self::MODES && self.0 & (1 << mode) != 0
    }

    /// Listed modes, ascending
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..Self::MODES).filter(move |&mode| self.contains(mode))
    }

    /// Lowest listed mode
    pub fn lowest(self) -> Option<u8> {
        self.iter().next()
    }

    /// Highest listed mode
    pub fn highest(self) -> Option<u8> {
        self.iter().last()
    }

    /// Modes both sides permit, `None` if two restrictions are disjoint
    pub fn intersect(self, other: Self) -> Option<Self> {
        match (self.is_unrestricted(), other.is_unrestricted()) {
            (true, _) => Some(other),
            (false, true) => Some(self),
            (false, false) => {
                let joint = Self(self.0 & other.0);
                (!joint.is_unrestricted()).then_some(joint)
            }
        }
    }
}

impl fmt::Debug for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<u8> for ModeSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::ALL;
        for mode in iter {
            set.insert(mode);
        }
        set
    }
}

/// `evs-mode-switch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ModeSwitch {
    /// Primary mode, parameter omitted
    #[default]
    Default,
    /// `evs-mode-switch=0`
    Primary,
    /// `evs-mode-switch=1`, AMR-WB IO only
    LegacyIo,
}

impl ModeSwitch {
    /// Value written to the fmtp line, `None` when omitted
    pub fn value(self) -> Option<u32> {
        match self {
            Self::Default => None,
            Self::Primary => Some(0),
            Self::LegacyIo => Some(1),
        }
    }

    /// Parse an fmtp value
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Primary),
            1 => Some(Self::LegacyIo),
            _ => None,
        }
    }
}

/// `hf-only`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum HeaderFormat {
    /// Header-full and compact, parameter omitted
    #[default]
    Default,
    /// `hf-only=0`
    FullAndCompact,
    /// `hf-only=1`
    FullOnly,
}

impl HeaderFormat {
    /// Value written to the fmtp line, `None` when omitted
    pub fn value(self) -> Option<u32> {
        match self {
            Self::Default => None,
            Self::FullAndCompact => Some(0),
            Self::FullOnly => Some(1),
        }
    }

    /// Parse an fmtp value
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::FullAndCompact),
            1 => Some(Self::FullOnly),
            _ => None,
        }
    }
}

/// `dtx`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Dtx {
    /// `dtx=0`
    Disabled,
    /// `dtx=1`
    Enabled,
    /// Enabled, parameter omitted
    #[default]
    EnabledDefault,
}

impl Dtx {
    /// Numeric value as used in comparisons with `dtx-recv`
    pub fn value(self) -> u32 {
        match self {
            Self::Disabled => 0,
            Self::Enabled => 1,
            Self::EnabledDefault => 2,
        }
    }

    /// Parse an fmtp value; anything above 1 is the default
    pub fn from_value(value: u32) -> Self {
        match value {
            0 => Self::Disabled,
            1 => Self::Enabled,
            _ => Self::EnabledDefault,
        }
    }
}

/// `cmr`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CmrMode {
    /// `cmr=-1`, requests limited to AMR-WB IO modes
    LimitedToLegacy,
    /// `cmr=0`, CMR byte may be present
    #[default]
    Optional,
    /// `cmr=1`, CMR byte always present
    Always,
}

impl CmrMode {
    /// Value written to the fmtp line
    pub fn value(self) -> i32 {
        match self {
            Self::LimitedToLegacy => -1,
            Self::Optional => 0,
            Self::Always => 1,
        }
    }

    /// Parse an fmtp value
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Self::LimitedToLegacy),
            0 => Some(Self::Optional),
            1 => Some(Self::Always),
            _ => None,
        }
    }
}

/// One side's EVS capabilities
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityRecord {
    /// Primary / AMR-WB IO mandate
    pub evs_mode_switch: ModeSwitch,
    /// Payload header style
    pub hf_only: HeaderFormat,
    /// Discontinuous transmission
    pub dtx: Dtx,
    /// Whether the peer lets us send DTX (0 = no)
    pub dtx_send: u32,
    /// Whether we accept DTX (0 = no, 2 = default)
    pub dtx_recv: u32,
    /// Redundancy cap in milliseconds
    pub max_red: Option<u32>,
    /// Change mode request usage
    pub cmr: CmrMode,
    /// `cmr` appeared in the fmtp line
    pub cmr_included: bool,
    /// Plain `br=` appeared in the fmtp line
    pub br_included: bool,
    /// Bit rates for sending
    pub br_send: BitRateMask,
    /// Bit rates for receiving
    pub br_recv: BitRateMask,
    /// Plain `bw=` appeared in the fmtp line
    pub bw_included: bool,
    /// Bandwidths for sending
    pub bw_send: BandwidthMask,
    /// Bandwidths for receiving
    pub bw_recv: BandwidthMask,
    /// Send channels, 0 = mono default
    pub ch_send: u32,
    /// Receive channels, 0 = mono default
    pub ch_recv: u32,
    /// Channel-aware offset for sending; negative values are sentinels
    pub ch_aw_send: i32,
    /// Channel-aware offset for receiving; -2 = not stated
    pub ch_aw_recv: i32,
    /// Permitted AMR-WB IO modes
    pub mode_set: ModeSet,
    /// Frames between mode changes, 0 = unconstrained
    pub mode_change_period: u32,
    /// Only change to neighbouring modes when non-zero
    pub mode_change_neighbor: u32,
    /// Session-local mode byte
    pub current_mode: u8,
}

impl CapabilityRecord {
    /// Highest usable channel-aware FEC offset
    pub const MAX_RF_FEC_OFFSET: i32 = 7;

    /// The canonical "accept anything" record
    pub const ANY: Self = Self {
        evs_mode_switch: ModeSwitch::Default,
        hf_only: HeaderFormat::Default,
        dtx: Dtx::EnabledDefault,
        dtx_send: 1,
        dtx_recv: 2,
        max_red: None,
        cmr: CmrMode::Optional,
        cmr_included: false,
        br_included: false,
        br_send: BitRateMask::ALL,
        br_recv: BitRateMask::ALL,
        bw_included: false,
        bw_send: BandwidthMask::ALL,
        bw_recv: BandwidthMask::ALL,
        ch_send: 0,
        ch_recv: 0,
        ch_aw_send: Self::MAX_RF_FEC_OFFSET,
        ch_aw_recv: 0,
        mode_set: ModeSet::ALL,
        mode_change_period: 0,
        mode_change_neighbor: 0,
        current_mode: 0,
    };

    /// The canonical "accept anything" record
    pub fn any() -> Self {
        Self::ANY
    }

    /// Whether this record equals the canonical one
    pub fn is_any(&self) -> bool {
        *self == Self::ANY
    }

    /// Store a received change mode request
    ///
    /// `None` (no request) leaves the current mode untouched.
    pub fn apply_mode_request(&mut self, request: Option<u8>) {
        if let Some(mode) = request {
            self.current_mode = mode;
        }
    }
}

impl Default for CapabilityRecord {
    fn default() -> Self {
        Self::ANY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_rate_mask_range() {
        let mask = BitRateMask::from_range(5, 7);
        assert_eq!(mask.bits(), 0b1110_0000);
        assert_eq!(mask.lowest(), Some(5));
        assert_eq!(mask.highest(), Some(7));
        assert!(!mask.is_explicit());
        assert!(mask.explicit().is_explicit());
        assert_eq!(mask.explicit().selectable(), mask.bits());

        assert_eq!(BitRateMask::from_range(1, 12), BitRateMask::ALL);
        assert_eq!(BitRateMask::from_range(0, 20), BitRateMask::ALL);
    }

    #[test]
    fn test_bit_rate_mask_intersect() {
        let a = BitRateMask::from_range(5, 7).explicit();
        let b = BitRateMask::from_range(2, 6);
        let joint = a.intersect(b);
        assert_eq!(joint.selectable(), BitRateMask::from_range(5, 6).bits());
        assert!(joint.is_explicit());

        let disjoint = BitRateMask::from_range(1, 2).intersect(BitRateMask::from_range(3, 4));
        assert_eq!(disjoint.selectable(), 0);
        assert_eq!(disjoint.lowest(), None);
    }

    #[test]
    fn test_bit_rate_mask_contiguous() {
        assert!(BitRateMask::from_range(3, 9).is_contiguous());
        assert!(!BitRateMask::from_bits(0b1010).is_contiguous());
        assert!(BitRateMask::from_bits(0x0001).is_contiguous());
    }

    #[test]
    fn test_bandwidth_mask() {
        assert_eq!(BandwidthMask::ALL.highest(), Some(Bandwidth::Fullband));
        let mask = BandwidthMask::from_bits(0x06);
        assert!(mask.contains(Bandwidth::Narrowband));
        assert!(mask.contains(Bandwidth::Wideband));
        assert!(!mask.contains(Bandwidth::SuperWideband));
        assert_eq!(mask.highest(), Some(Bandwidth::Wideband));
        assert_eq!(BandwidthMask::from_bits(0x01).highest(), None);
    }

    #[test]
    fn test_mode_set() {
        let a: ModeSet = [0, 1, 2].into_iter().collect();
        let b: ModeSet = [1, 2, 3].into_iter().collect();
        let joint = a.intersect(b).unwrap();
        assert_eq!(joint.iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(joint.lowest(), Some(1));
        assert_eq!(joint.highest(), Some(2));

        let c: ModeSet = [5, 6].into_iter().collect();
        assert_eq!(ModeSet::from_bits(0b11).intersect(c), None);
        assert_eq!(ModeSet::ALL.intersect(c), Some(c));
        assert_eq!(c.intersect(ModeSet::ALL), Some(c));

        let mut set = ModeSet::ALL;
        set.insert(9);
        assert!(set.is_unrestricted());
    }

    #[test]
    fn test_any_record() {
        let any = CapabilityRecord::any();
        assert!(any.is_any());
        assert_eq!(any, CapabilityRecord::default());
        assert_eq!(any.ch_aw_send, 7);
        assert_eq!(any.br_send.bits(), 0x1ffe);
        assert_eq!(any.bw_recv.bits(), 0x1e);
    }

    #[test]
    fn test_apply_mode_request() {
        let mut record = CapabilityRecord::any();
        record.apply_mode_request(Some(0x25));
        assert_eq!(record.current_mode, 0x25);
        record.apply_mode_request(None);
        assert_eq!(record.current_mode, 0x25);
    }
}
