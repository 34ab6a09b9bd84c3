//! Session configuration

use crate::bitstream::order::BitOrder;
use crate::error::{EvsError, Result};
use crate::fmtp::CapabilityRecord;
use crate::rate::FRAMES_PER_SECOND;
use crate::types::SampleRate;
use std::sync::Arc;

/// Default sample buffer capacity (120 ms at 48 kHz)
pub const BUFFER_SAMPLES: usize = 5760;

/// Samples per frame reported for every encoded packet (20 ms at 16 kHz)
pub const EVS_SAMPLES: usize = 320;

/// Configuration shared by encoder and decoder sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// PCM sample rate on the linear side
    pub sample_rate: SampleRate,
    /// AMR-WB IO wire bit order
    pub bit_order: Arc<BitOrder>,
    /// Capacity of the encoder's sample buffer
    pub buffer_samples: usize,
    /// Negotiated capabilities, `None` for an unnegotiated session
    pub capabilities: Option<CapabilityRecord>,
}

impl SessionConfig {
    /// Create a configuration for `sample_rate`
    pub fn new(sample_rate: SampleRate) -> Self {
        Self {
            sample_rate,
            bit_order: BitOrder::amr_wb_io(),
            buffer_samples: BUFFER_SAMPLES,
            capabilities: None,
        }
    }

    /// Create a configuration from a rate in Hz
    pub fn from_hz(hz: u32) -> Result<Self> {
        SampleRate::from_hz(hz).map(Self::new)
    }

    /// Set sample rate
    pub fn with_sample_rate(mut self, sample_rate: SampleRate) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the AMR-WB IO bit order
    pub fn with_bit_order(mut self, bit_order: Arc<BitOrder>) -> Self {
        self.bit_order = bit_order;
        self
    }

    /// Set sample buffer capacity
    pub fn with_buffer_samples(mut self, buffer_samples: usize) -> Self {
        self.buffer_samples = buffer_samples;
        self
    }

    /// Set negotiated capabilities
    pub fn with_capabilities(mut self, capabilities: CapabilityRecord) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Samples in one 20 ms frame
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate.hz() / FRAMES_PER_SECOND) as usize
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.buffer_samples < self.samples_per_frame() {
            return Err(EvsError::invalid_config(format!(
                "buffer of {} samples cannot hold one {} sample frame",
                self.buffer_samples,
                self.samples_per_frame()
            )));
        }

        if let Some(capabilities) = &self.capabilities {
            if capabilities.ch_send > 1 || capabilities.ch_recv > 1 {
                return Err(EvsError::invalid_config(format!(
                    "only mono sessions are supported (ch-send={}, ch-recv={})",
                    capabilities.ch_send, capabilities.ch_recv
                )));
            }
        }

        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(SampleRate::Rate16000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.sample_rate, SampleRate::Rate16000);
        assert_eq!(config.buffer_samples, BUFFER_SAMPLES);
        assert_eq!(config.samples_per_frame(), 320);
        assert!(config.capabilities.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::from_hz(48000)
            .unwrap()
            .with_buffer_samples(1920)
            .with_capabilities(CapabilityRecord::any());
        assert_eq!(config.samples_per_frame(), 960);
        assert!(config.validate().is_ok());

        assert!(SessionConfig::from_hz(22050).is_err());
    }

    #[test]
    fn test_validate_rejects_small_buffer() {
        let config = SessionConfig::new(SampleRate::Rate48000).with_buffer_samples(500);
        assert!(matches!(
            config.validate(),
            Err(EvsError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_multichannel() {
        let mut record = CapabilityRecord::any();
        record.ch_send = 2;
        let config = SessionConfig::default().with_capabilities(record);
        assert!(config.validate().is_err());
    }
}
