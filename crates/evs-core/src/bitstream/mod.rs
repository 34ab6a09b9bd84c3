//! RTP payload framing for EVS (3GPP TS 26.445 Annex A.2, header-full format)
//!
//! - [`cursor`]: MSB-first bit access
//! - [`header`]: CMR, ToC and mode bytes
//! - [`order`]: AMR-WB IO wire bit ordering
//! - [`sort_tables`]: 3GPP sensitivity order per AMR-WB IO rate
//! - [`framer`]: encoder session, PCM to packets
//! - [`parser`]: decoder session, packets to PCM

pub mod cursor;
pub mod framer;
pub mod header;
pub mod order;
pub mod parser;
pub mod sort_tables;

pub use cursor::{BitReader, BitWriter};
pub use framer::{EvsEncoderSession, FramedPacket};
pub use header::{BandwidthClass, TocByte, NO_REQUEST};
pub use order::BitOrder;
pub use parser::{parse_payload, DecodeReport, EvsDecoderSession, ParsedPayload};
