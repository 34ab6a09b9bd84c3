//! Encode path: PCM windows to header-full RTP payloads
//!
//! Each packet carries one frame:
//!
//! ```text
//!   [CMR]? [ToC] [payload bits, zero-padded to a byte]
//! ```
//!
//! The CMR byte is present for AMR-WB IO, when `cmr=1` was negotiated, or
//! when a mode request is queued.

use super::cursor::{bytes_for_bits, BitWriter};
use super::header::{cmr_byte, TocByte};
use crate::config::{SessionConfig, EVS_SAMPLES};
use crate::error::{EvsError, Result};
use crate::fmtp::CmrMode;
use crate::mode::EncoderModeState;
use crate::rate::{rate_to_mode, LegacyIoMode, RateBucket};
use crate::types::{EncodedFrame, EvsEncoder, SidKind};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, error, trace};

/// One RTP payload ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedPacket {
    /// Header and payload bytes
    pub payload: Bytes,
    /// Duration in the 16 kHz RTP clock
    pub samples: usize,
}

/// Encoder side of one media leg
pub struct EvsEncoderSession<E: EvsEncoder> {
    encoder: E,
    config: SessionConfig,
    state: EncoderModeState,
    cmr: CmrMode,
    buffer: Vec<i16>,
    pending_request: Option<u8>,
}

impl<E: EvsEncoder> EvsEncoderSession<E> {
    /// Create a session around an external encoder
    ///
    /// The operating mode comes from the negotiated capabilities in
    /// `config`, or the wideband 16.4 kbit/s default without them.
    pub fn new(encoder: E, config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let (state, cmr) = match &config.capabilities {
            Some(record) => (
                EncoderModeState::from_capabilities(record, config.sample_rate),
                record.cmr,
            ),
            None => (EncoderModeState::new(config.sample_rate), CmrMode::default()),
        };

        debug!(
            "Created EVS encoder session at {} ({} bps, {:?})",
            config.sample_rate,
            state.total_bitrate(),
            state.codec_mode
        );

        Ok(Self {
            encoder,
            buffer: Vec::with_capacity(config.buffer_samples),
            config,
            state,
            cmr,
            pending_request: None,
        })
    }

    /// Current operating mode
    pub fn mode_state(&self) -> &EncoderModeState {
        &self.state
    }

    /// Mode byte to keep as the session's current mode
    pub fn current_mode(&self) -> u8 {
        self.state.mode_byte()
    }

    /// Samples waiting for a full window
    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Ask the peer to switch modes with the next packet
    pub fn request_mode(&mut self, mode: u8) {
        self.pending_request = Some(mode);
    }

    /// Drop a queued mode request
    pub fn clear_mode_request(&mut self) {
        self.pending_request = None;
    }

    fn reserve(&self, count: usize) -> Result<()> {
        let size = self.buffer.len() + count;
        if size > self.config.buffer_samples {
            return Err(EvsError::BufferOverflow {
                size,
                capacity: self.config.buffer_samples,
            });
        }
        Ok(())
    }

    /// Append PCM samples
    ///
    /// # Errors
    ///
    /// Returns [`EvsError::BufferOverflow`] and appends nothing if the
    /// samples do not fit.
    pub fn push_samples(&mut self, samples: &[i16]) -> Result<()> {
        self.reserve(samples.len())?;
        self.buffer.extend_from_slice(samples);
        Ok(())
    }

    /// Append native-endian 16-bit linear PCM bytes
    pub fn push_slin_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() % 2 != 0 {
            return Err(EvsError::invalid_payload(format!(
                "odd slin length {}",
                bytes.len()
            )));
        }

        let count = bytes.len() / 2;
        self.reserve(count)?;

        let start = self.buffer.len();
        self.buffer.resize(start + count, 0);
        bytemuck::cast_slice_mut::<i16, u8>(&mut self.buffer[start..]).copy_from_slice(bytes);
        Ok(())
    }

    /// Encode every full 20 ms window in the buffer
    ///
    /// `current_mode` is the session's stored mode byte (for example the
    /// last CMR the peer sent). With `None` a negotiated session keeps its
    /// negotiated mode and an unnegotiated one uses the default mode.
    /// Windows the encoder fails on, or that produce an unknown bit count,
    /// are logged and skipped. DTX windows produce no packet.
    pub fn frame_out(&mut self, current_mode: Option<u8>) -> Vec<FramedPacket> {
        match current_mode {
            Some(mode) => self.state.apply_mode_request(mode),
            None if self.config.capabilities.is_none() => {
                let mode = self.state.default_mode_byte();
                self.state.apply_mode_request(mode);
            }
            None => {}
        }

        let n_samples = self.config.samples_per_frame();
        let mut packets = Vec::new();
        let mut consumed = 0;

        while self.buffer.len() - consumed >= n_samples {
            let window = &self.buffer[consumed..consumed + n_samples];
            consumed += n_samples;

            let frame = match self.encoder.encode(&self.state, window) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Error encoding the EVS frame: {}", e);
                    continue;
                }
            };

            match rate_to_mode(self.state.family(), frame.bit_count) {
                RateBucket::Unknown => {
                    error!("Error encoding the EVS frame (bits: {})", frame.bit_count);
                }
                bucket if bucket.is_no_data() => {
                    trace!("DTX window, nothing to send");
                }
                bucket => match self.build_packet(bucket, &frame) {
                    Ok(payload) => packets.push(FramedPacket {
                        payload,
                        samples: EVS_SAMPLES,
                    }),
                    Err(e) => error!("Dropping EVS frame: {}", e),
                },
            }
        }

        self.buffer.drain(..consumed);
        packets
    }

    fn build_packet(&mut self, bucket: RateBucket, frame: &EncodedFrame) -> Result<Bytes> {
        let byte_count = bytes_for_bits(frame.bit_count);
        if frame.bits.len() < byte_count {
            return Err(EvsError::encoding_failed(format!(
                "{} bits announced but only {} bytes produced",
                frame.bit_count,
                frame.bits.len()
            )));
        }

        let (family, rate_index) = match (bucket.family(), bucket.index()) {
            (Some(family), Some(index)) => (family, index),
            _ => return Err(EvsError::unknown_rate(format!("bits {}", frame.bit_count))),
        };

        let mut out = BytesMut::with_capacity(byte_count + 3);

        if self.state.legacy_io || self.cmr == CmrMode::Always || self.pending_request.is_some() {
            out.put_u8(cmr_byte(self.pending_request.take()));
        }
        out.put_u8(TocByte::for_frame(family, rate_index).to_byte());

        match bucket {
            RateBucket::LegacyIo(mode) => {
                let mut writer = BitWriter::with_capacity(frame.bit_count + 5);
                self.config
                    .bit_order
                    .native_to_wire(mode, &frame.bits, &mut writer);

                if mode == LegacyIoMode::Sid {
                    let sid = frame.sid.unwrap_or(SidKind::Update);
                    writer.push_bit(sid.sti());
                    writer.push_bits(u32::from(self.state.legacy.index()), 4);
                }
                out.put_slice(&writer.into_bytes());
            }
            _ => {
                out.put_slice(&frame.bits[..byte_count]);
                let spare = byte_count * 8 - frame.bit_count;
                if spare > 0 {
                    if let Some(last) = out.last_mut() {
                        *last &= 0xff << spare;
                    }
                }
            }
        }

        Ok(out.freeze())
    }
}

impl<E: EvsEncoder> Drop for EvsEncoderSession<E> {
    fn drop(&mut self) {
        debug!("Destroyed EVS encoder session");
    }
}
