//! Test suite for evs-core
//!
//! Cross-module scenarios: SDP negotiation feeding encoder sessions, and
//! packets travelling from an encoder session to a decoder session.

use crate::error::*;
use crate::types::*;

mod property_tests;

/// Common test utilities
pub mod utils {
    use super::*;
    use crate::bitstream::cursor::bytes_for_bits;
    use crate::mode::EncoderModeState;

    /// Generate test signal
    pub fn generate_test_signal(
        length: usize,
        sample_rate: u32,
        frequency: f32,
        amplitude: f32,
    ) -> Vec<i16> {
        let mut signal = Vec::with_capacity(length);

        for i in 0..length {
            let t = i as f32 / sample_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * frequency * t).sin() * amplitude;
            signal.push(sample.clamp(-32768.0, 32767.0) as i16);
        }

        signal
    }

    /// Generate speech-like signal
    pub fn generate_speech_signal(length: usize, sample_rate: u32) -> Vec<i16> {
        let mut signal = Vec::with_capacity(length);

        let formants = [500.0, 1500.0, 2500.0];
        let gains = [0.8, 0.6, 0.4];

        for i in 0..length {
            let t = i as f32 / sample_rate as f32;
            let mut sample = 0.0;

            for (freq, gain) in formants.iter().zip(gains.iter()) {
                sample += (2.0 * std::f32::consts::PI * freq * t).sin() * gain;
            }

            sample += (rand::random::<f32>() - 0.5) * 0.1;

            let envelope = (2.0 * std::f32::consts::PI * 5.0 * t).sin().abs();
            sample *= envelope * 8000.0;

            signal.push(sample.clamp(-32768.0, 32767.0) as i16);
        }

        signal
    }

    /// Stand-in encoder: the low byte of each sample becomes one payload byte
    ///
    /// Produces exactly the bit count of the state's target rate, with pad
    /// bits cleared. Every `sid_every`-th window (if set) is a SID frame.
    #[derive(Debug, Default)]
    pub struct LoopbackEncoder {
        pub sid_every: Option<usize>,
        pub windows: usize,
    }

    impl EvsEncoder for LoopbackEncoder {
        fn encode(&mut self, state: &EncoderModeState, samples: &[i16]) -> Result<EncodedFrame> {
            self.windows += 1;

            let sid = self.sid_every.is_some_and(|n| self.windows % n == 0);
            let bit_count = if !sid {
                (state.total_bitrate() / 50) as usize
            } else if state.legacy_io {
                crate::rate::LegacyIoMode::Sid.bits_per_frame()
            } else {
                crate::rate::PrimaryMode::Sid.bits_per_frame()
            };

            let mut bits: Vec<u8> = samples
                .iter()
                .cycle()
                .take(bytes_for_bits(bit_count))
                .map(|&s| s as u8)
                .collect();
            let spare = bits.len() * 8 - bit_count;
            if let Some(last) = bits.last_mut() {
                *last &= 0xff << spare;
            }

            let frame = EncodedFrame::new(bits, bit_count);
            Ok(if sid {
                frame.with_sid(SidKind::Update)
            } else {
                frame
            })
        }
    }

    /// Stand-in decoder: echoes payload bytes back as samples
    #[derive(Debug, Default)]
    pub struct LoopbackDecoder {
        pub frames: Vec<(FrameInfo, usize, bool)>,
    }

    impl EvsDecoder for LoopbackDecoder {
        fn decode(
            &mut self,
            info: &FrameInfo,
            bits: &[u8],
            bit_count: usize,
            bad_frame: bool,
        ) -> Result<Vec<i16>> {
            self.frames.push((*info, bit_count, bad_frame));
            Ok(bits.iter().map(|&b| i16::from(b)).collect())
        }
    }

    /// Decoder that fails on bad frames and decodes silence otherwise
    #[derive(Debug, Default)]
    pub struct BadFrameDecoder;

    impl EvsDecoder for BadFrameDecoder {
        fn decode(
            &mut self,
            _info: &FrameInfo,
            _bits: &[u8],
            _bit_count: usize,
            bad_frame: bool,
        ) -> Result<Vec<i16>> {
            if bad_frame {
                return Err(EvsError::decoding_failed("bad frame"));
            }
            Ok(Vec::new())
        }
    }

    /// Encoder that always fails
    #[derive(Debug, Default)]
    pub struct FailingEncoder;

    impl EvsEncoder for FailingEncoder {
        fn encode(&mut self, _state: &EncoderModeState, _samples: &[i16]) -> Result<EncodedFrame> {
            Err(EvsError::encoding_failed("test encoder"))
        }
    }
}
