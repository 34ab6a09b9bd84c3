//! SDP `a=fmtp` capabilities for EVS (3GPP TS 26.445 Annex A)
//!
//! - [`record`]: the bit-packed [`CapabilityRecord`]
//! - [`parse`]: fmtp text to record
//! - [`generate`]: record to fmtp text
//! - [`joint`]: intersection of two records

pub mod generate;
pub mod joint;
pub mod parse;
pub mod record;

pub use generate::{bandwidth_label, bit_rate_label, bucket_label};
pub use joint::negotiate;
pub use parse::{bucket_of, parse_fmtp, Perspective};
pub use record::{
    BandwidthMask, BitRateMask, CapabilityRecord, CmrMode, Dtx, HeaderFormat, ModeSet, ModeSwitch,
};
