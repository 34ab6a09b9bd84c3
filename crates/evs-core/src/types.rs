//! Core types and traits shared by the framing and negotiation layers
//!
//! The compression mathematics of EVS and AMR-WB live outside this crate.
//! [`EvsEncoder`] and [`EvsDecoder`] are the seams through which a session
//! hands PCM windows and payload bits to whatever implementation the host
//! links in.

use crate::error::{EvsError, Result};
use crate::mode::EncoderModeState;
use crate::rate::{RateBucket, FRAMES_PER_SECOND};
use std::fmt;

/// External EVS encoder
///
/// One instance belongs to one encoder session and is fed exactly one
/// 20 ms window per call.
pub trait EvsEncoder: Send {
    /// Encode one window of PCM
    ///
    /// # Arguments
    ///
    /// * `state` - Operating mode resolved for this frame
    /// * `samples` - Exactly `sample_rate / 50` samples
    ///
    /// # Errors
    ///
    /// Any error only costs this window; the session logs and skips it.
    fn encode(&mut self, state: &EncoderModeState, samples: &[i16]) -> Result<EncodedFrame>;
}

/// External EVS decoder
pub trait EvsDecoder: Send {
    /// Decode one frame of native-order payload bits
    ///
    /// # Arguments
    ///
    /// * `info` - What the frame header said about the frame
    /// * `bits` - Payload bits, MSB first, in the codec's native order
    /// * `bit_count` - Number of meaningful bits in `bits`
    /// * `bad_frame` - The sender flagged the frame as damaged
    ///
    /// # Returns
    ///
    /// PCM for one 20 ms frame. The session pads or truncates to the frame
    /// size, so a short or empty result is tolerated.
    fn decode(
        &mut self,
        info: &FrameInfo,
        bits: &[u8],
        bit_count: usize,
        bad_frame: bool,
    ) -> Result<Vec<i16>>;
}

/// Output of the external encoder for one window
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedFrame {
    /// Payload bits packed MSB first
    pub bits: Vec<u8>,
    /// Number of meaningful bits; zero means DTX produced nothing
    pub bit_count: usize,
    /// Silence descriptor type, set for AMR-WB IO SID frames
    pub sid: Option<SidKind>,
}

impl EncodedFrame {
    /// Create a frame from packed bits
    pub fn new(bits: Vec<u8>, bit_count: usize) -> Self {
        Self {
            bits,
            bit_count,
            sid: None,
        }
    }

    /// Mark the frame as an AMR-WB IO silence descriptor
    pub fn with_sid(mut self, sid: SidKind) -> Self {
        self.sid = Some(sid);
        self
    }

    /// Frame for a window that DTX suppressed
    pub fn no_data() -> Self {
        Self::default()
    }
}

/// Everything the frame header and SID trailer told the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Codec family from the ToC legacy bit
    pub family: CodecFamily,
    /// Rate bucket from the ToC rate index
    pub bucket: RateBucket,
    /// Bit rate the decoder should assume, zero for a first SID frame
    pub bit_rate: u32,
    /// Q bit of the ToC byte
    pub quality: bool,
    /// Silence descriptor type of an AMR-WB IO SID frame
    pub sid: Option<SidKind>,
    /// Codec mode indication carried after the SID bits
    pub cmi: Option<u8>,
}

/// EVS codec family, selected by the legacy bit of the ToC byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecFamily {
    /// EVS primary modes
    Primary,
    /// AMR-WB interoperable modes
    LegacyIo,
}

impl CodecFamily {
    /// Family for the ToC legacy bit
    pub fn from_legacy_bit(legacy: bool) -> Self {
        if legacy {
            Self::LegacyIo
        } else {
            Self::Primary
        }
    }

    /// Whether this is the AMR-WB IO family
    pub fn is_legacy(self) -> bool {
        matches!(self, Self::LegacyIo)
    }
}

impl fmt::Display for CodecFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "EVS primary"),
            Self::LegacyIo => write!(f, "AMR-WB IO"),
        }
    }
}

/// Audio bandwidth class
///
/// Ordered, so `min`/`max` pick the narrower or wider class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Bandwidth {
    /// Narrowband, 4 kHz audio
    Narrowband = 0,
    /// Wideband, 8 kHz audio
    Wideband = 1,
    /// Super-wideband, 16 kHz audio
    SuperWideband = 2,
    /// Fullband, 20 kHz audio
    Fullband = 3,
}

impl Bandwidth {
    /// All classes, narrowest first
    pub const ALL: [Self; 4] = [
        Self::Narrowband,
        Self::Wideband,
        Self::SuperWideband,
        Self::Fullband,
    ];

    /// Class for an index, `None` above fullband
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Numeric index, 0 for narrowband
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Widest class a sample rate can carry
    pub fn for_sample_rate(hz: u32) -> Self {
        let index = ((hz / 8000) >> 1).min(Self::Fullband.index() as u32);
        Self::ALL[index as usize]
    }

    /// fmtp token for this class
    pub fn name(self) -> &'static str {
        match self {
            Self::Narrowband => "nb",
            Self::Wideband => "wb",
            Self::SuperWideband => "swb",
            Self::Fullband => "fb",
        }
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Internal EVS core coder selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecMode {
    /// ACELP/MDCT core used at the low and very high rates
    Mode1,
    /// TCX/HQ core, also the only channel-aware core
    Mode2,
}

/// Sample rates an EVS session can run at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SampleRate {
    /// 8 kHz (narrowband)
    Rate8000,
    /// 16 kHz (wideband)
    Rate16000,
    /// 32 kHz (super-wideband)
    Rate32000,
    /// 48 kHz (fullband)
    Rate48000,
}

impl SampleRate {
    /// Supported rates in Hz
    pub const SUPPORTED: [u32; 4] = [8000, 16000, 32000, 48000];

    /// Get the sample rate value in Hz
    pub fn hz(self) -> u32 {
        match self {
            Self::Rate8000 => 8000,
            Self::Rate16000 => 16000,
            Self::Rate32000 => 32000,
            Self::Rate48000 => 48000,
        }
    }

    /// Create from Hz value
    pub fn from_hz(hz: u32) -> Result<Self> {
        match hz {
            8000 => Ok(Self::Rate8000),
            16000 => Ok(Self::Rate16000),
            32000 => Ok(Self::Rate32000),
            48000 => Ok(Self::Rate48000),
            rate => Err(EvsError::InvalidSampleRate {
                rate,
                supported: Self::SUPPORTED.to_vec(),
            }),
        }
    }

    /// Samples in one 20 ms frame
    pub fn samples_per_frame(self) -> usize {
        (self.hz() / FRAMES_PER_SECOND) as usize
    }

    /// Widest bandwidth this rate can carry
    pub fn max_bandwidth(self) -> Bandwidth {
        Bandwidth::for_sample_rate(self.hz())
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.hz())
    }
}

/// AMR-WB IO silence descriptor type, the STI bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SidKind {
    /// First SID after speech; carries no comfort noise update
    First,
    /// Periodic comfort noise update
    Update,
}

impl SidKind {
    /// Kind for an STI bit as read from the wire
    pub fn from_sti(sti: bool) -> Self {
        if sti {
            Self::First
        } else {
            Self::Update
        }
    }

    /// STI bit to write
    pub fn sti(self) -> bool {
        matches!(self, Self::First)
    }
}
