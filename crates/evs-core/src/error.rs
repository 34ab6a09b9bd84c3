//! Error handling for EVS framing and negotiation
//!
//! Every error here is local to one frame, one negotiation attempt or one
//! session setup. Nothing in this crate aborts a running session.

#![allow(missing_docs)]

use std::fmt;
use thiserror::Error;

/// Result type alias for EVS operations
pub type Result<T> = std::result::Result<T, EvsError>;

/// Error type for EVS framing, parsing and negotiation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvsError {
    /// Invalid session configuration
    #[error("Invalid EVS configuration: {details}")]
    InvalidConfig { details: String },

    /// Invalid sample rate
    #[error("Invalid sample rate: {rate}Hz (supported: {supported:?})")]
    InvalidSampleRate { rate: u32, supported: Vec<u32> },

    /// Legacy IO bit order table does not describe a permutation
    #[error("Invalid bit order for {mode}: {details}")]
    InvalidBitOrder { mode: String, details: String },

    /// Bit count or rate index outside both rate ladders
    #[error("Unknown rate: {details}")]
    UnknownRate { details: String },

    /// Packet too short or otherwise unusable
    #[error("Invalid payload data: {details}")]
    InvalidPayload { details: String },

    /// Sample accumulation buffer would overflow
    #[error("Buffer overflow: attempted to write {size} samples to {capacity} sample buffer")]
    BufferOverflow { size: usize, capacity: usize },

    /// Capabilities have no overlap
    #[error("Negotiation failed: {conflict}")]
    NegotiationFailed { conflict: NegotiationConflict },

    /// External encoder failed on a window
    #[error("Encoding failed: {reason}")]
    EncodingFailed { reason: String },

    /// External decoder failed on a frame
    #[error("Decoding failed: {reason}")]
    DecodingFailed { reason: String },
}

/// Reason a joint capability could not be formed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationConflict {
    #[error("no AMR-WB IO mode in common")]
    NoCommonModeSet,

    #[error("no bit-rate in common")]
    NoCommonBitRate,

    #[error("no bandwidth in common")]
    NoCommonBandwidth,

    #[error("{direction} channel count mismatch ({local} vs {remote})")]
    ChannelMismatch {
        direction: &'static str,
        local: u32,
        remote: u32,
    },

    #[error("conflicting change mode request ({local} vs {remote})")]
    CmrConflict { local: i32, remote: i32 },
}

impl EvsError {
    /// Create a new invalid configuration error
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }

    /// Create a new unknown rate error
    pub fn unknown_rate(details: impl Into<String>) -> Self {
        Self::UnknownRate {
            details: details.into(),
        }
    }

    /// Create a new invalid payload error
    pub fn invalid_payload(details: impl Into<String>) -> Self {
        Self::InvalidPayload {
            details: details.into(),
        }
    }

    /// Create a new negotiation failure
    pub fn negotiation(conflict: NegotiationConflict) -> Self {
        Self::NegotiationFailed { conflict }
    }

    /// Create a new encoding failed error
    pub fn encoding_failed(reason: impl Into<String>) -> Self {
        Self::EncodingFailed {
            reason: reason.into(),
        }
    }

    /// Create a new decoding failed error
    pub fn decoding_failed(reason: impl Into<String>) -> Self {
        Self::DecodingFailed {
            reason: reason.into(),
        }
    }

    /// Check if this error only costs the current frame
    ///
    /// Recoverable errors leave the session usable; the caller drops the
    /// frame (or window) and continues.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::UnknownRate { .. }
            | Self::InvalidPayload { .. }
            | Self::BufferOverflow { .. }
            | Self::EncodingFailed { .. }
            | Self::DecodingFailed { .. } => true,

            Self::InvalidConfig { .. }
            | Self::InvalidSampleRate { .. }
            | Self::InvalidBitOrder { .. }
            | Self::NegotiationFailed { .. } => false,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig { .. }
            | Self::InvalidSampleRate { .. }
            | Self::InvalidBitOrder { .. } => ErrorCategory::Configuration,

            Self::UnknownRate { .. } | Self::InvalidPayload { .. } => ErrorCategory::Framing,

            Self::NegotiationFailed { .. } => ErrorCategory::Negotiation,

            Self::BufferOverflow { .. } => ErrorCategory::Memory,

            Self::EncodingFailed { .. } | Self::DecodingFailed { .. } => ErrorCategory::External,
        }
    }
}

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration and parameter errors
    Configuration,
    /// Corrupted or unsupported frames
    Framing,
    /// Capability intersection failures
    Negotiation,
    /// Buffer management errors
    Memory,
    /// Failures reported by the external encoder/decoder
    External,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Framing => write!(f, "Framing"),
            Self::Negotiation => write!(f, "Negotiation"),
            Self::Memory => write!(f, "Memory"),
            Self::External => write!(f, "External"),
        }
    }
}

impl From<NegotiationConflict> for EvsError {
    fn from(conflict: NegotiationConflict) -> Self {
        Self::negotiation(conflict)
    }
}
