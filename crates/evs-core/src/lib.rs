//! # EVS-Core: 3GPP EVS Framing and Negotiation
//!
//! This library carries the 3GPP Enhanced Voice Services codec across RVOIP
//! media legs. It does not implement the EVS DSP itself; an external encoder
//! and decoder plug in through the [`EvsEncoder`] and [`EvsDecoder`] traits
//! and this crate does everything around them.
//!
//! ## Features
//!
//! - **SDP capabilities**: parse, generate and intersect EVS `a=fmtp` lines
//!   (3GPP TS 26.445 Annex A)
//! - **Mode selection**: pick primary or AMR-WB IO operation, bit rate and
//!   bandwidth from negotiated capabilities and react to peer mode requests
//! - **RTP framing**: header-full payloads with CMR and ToC bytes, including
//!   the AMR-WB IO bit reordering and SID trailer
//!
//! ## Usage
//!
//! ```rust
//! use rvoip_evs_core::{negotiate, CapabilityRecord};
//!
//! let local: CapabilityRecord = "br=13.2-24.4;bw=nb-swb".parse()?;
//! let joint = negotiate(&local, "br=7.2-16.4")?;
//!
//! assert_eq!(joint.fmtp_params(), "br=13.2-16.4;bw=nb-swb");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Framing sessions are generic over the external codec:
//!
//! ```rust
//! use rvoip_evs_core::{
//!     EncodedFrame, EncoderModeState, EvsEncoder, EvsEncoderSession, Result, SessionConfig,
//! };
//!
//! struct Silence;
//!
//! impl EvsEncoder for Silence {
//!     fn encode(&mut self, state: &EncoderModeState, _samples: &[i16]) -> Result<EncodedFrame> {
//!         let bits = (state.total_bitrate() / 50) as usize;
//!         Ok(EncodedFrame::new(vec![0; (bits + 7) / 8], bits))
//!     }
//! }
//!
//! let mut session = EvsEncoderSession::new(Silence, SessionConfig::default())?;
//! session.push_samples(&[0i16; 320])?;
//! let packets = session.frame_out(None);
//! assert_eq!(packets.len(), 1);
//! # Ok::<(), rvoip_evs_core::EvsError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod config;
pub mod error;
pub mod fmtp;
pub mod mode;
pub mod rate;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types and traits
pub use bitstream::{
    parse_payload, BitOrder, DecodeReport, EvsDecoderSession, EvsEncoderSession, FramedPacket,
    ParsedPayload,
};
pub use config::SessionConfig;
pub use error::{EvsError, NegotiationConflict, Result};
pub use fmtp::{negotiate, parse_fmtp, CapabilityRecord, Perspective};
pub use mode::EncoderModeState;
pub use rate::{index_to_mode, rate_to_mode, LegacyIoMode, PrimaryMode, RateBucket};
pub use types::{
    Bandwidth, CodecFamily, CodecMode, EncodedFrame, EvsDecoder, EvsEncoder, FrameInfo,
    SampleRate, SidKind,
};

/// Version information for the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SDP encoding name registered for EVS
pub const ENCODING_NAME: &str = "EVS";

/// RTP clock rate for EVS, independent of the PCM sample rate
pub const RTP_CLOCK_RATE: u32 = 16000;

/// Initialize the library
///
/// Sets up logging if nothing else has and checks the compiled-in AMR-WB
/// IO sort tables. It's safe to call multiple times.
///
/// # Errors
///
/// Returns [`EvsError::InvalidBitOrder`] if a sort table is not a
/// permutation of its rate's bits.
pub fn init() -> Result<()> {
    // Initialize logging if not already done
    let _ = tracing_subscriber::fmt::try_init();

    BitOrder::from_static(bitstream::sort_tables::SORT_TABLES)?;

    tracing::info!("EVS-Core v{} initialized", VERSION);
    tracing::info!(
        "Supported sample rates: {:?}",
        SampleRate::SUPPORTED
    );

    Ok(())
}

/// Get library information
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        encoding_name: ENCODING_NAME,
        rtp_clock_rate: RTP_CLOCK_RATE,
        sample_rates: SampleRate::SUPPORTED.to_vec(),
    }
}

/// Library information structure
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    /// Library version
    pub version: &'static str,
    /// SDP encoding name
    pub encoding_name: &'static str,
    /// RTP timestamp clock
    pub rtp_clock_rate: u32,
    /// PCM sample rates a session accepts
    pub sample_rates: Vec<u32>,
}
