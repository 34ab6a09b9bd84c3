//! Decode path: header-full RTP payloads to PCM
//!
//! Only one frame per packet is decoded. A second CMR byte or a ToC with
//! the F bit set is logged as corruption and parsing carries on with what
//! it has.

use super::cursor::{bytes_for_bits, BitReader};
use super::header::{is_header_type, parse_cmr, TocByte};
use super::order::BitOrder;
use crate::config::SessionConfig;
use crate::error::{EvsError, Result};
use crate::rate::{index_to_mode, LegacyIoMode, RateBucket, FRAMES_PER_SECOND, MAX_BITS_PER_FRAME};
use crate::types::{EvsDecoder, FrameInfo, SidKind};
use bytes::Bytes;
use tracing::{debug, error};

/// Bits after an AMR-WB IO SID frame: STI and the 4-bit mode indication
const SID_TRAILER_BITS: usize = 5;

/// One parsed payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPayload {
    /// Mode the peer asked us to send, `None` for no request
    pub mode_request: Option<u8>,
    /// The frame's ToC byte
    pub toc: TocByte,
    /// What the decoder needs to know about the frame
    pub info: FrameInfo,
    /// Payload bits in native order, MSB first
    pub bits: Vec<u8>,
    /// Meaningful bits in `bits`
    pub bit_count: usize,
    /// The sender flagged the frame as damaged
    pub bad_frame: bool,
}

/// Split a packet into CMR, ToC and native-order payload bits
///
/// # Errors
///
/// - [`EvsError::InvalidPayload`] if the packet has no ToC or is shorter
///   than its rate requires
/// - [`EvsError::UnknownRate`] if the ToC names a rate index outside the
///   family's ladder
pub fn parse_payload(packet: &[u8], order: &BitOrder) -> Result<ParsedPayload> {
    let mut idx = 0;
    let mut mode_request = None;

    let first = *packet
        .first()
        .ok_or_else(|| EvsError::invalid_payload("empty packet"))?;
    if is_header_type(first) {
        mode_request = parse_cmr(first);
        idx += 1;
    }

    let toc = TocByte::from_byte(
        *packet
            .get(idx)
            .ok_or_else(|| EvsError::invalid_payload("CMR without ToC"))?,
    );
    if toc.header_type {
        error!("2nd CMR; bitstream is corrupted");
    }
    if toc.follows {
        error!("2nd frame; bitstream is corrupted");
    }

    let bucket = index_to_mode(toc.family, toc.rate_index);
    let bit_rate = bucket.bit_rate().ok_or_else(|| {
        EvsError::unknown_rate(format!("{} rate index {}", toc.family, toc.rate_index))
    })?;

    let bit_count = (bit_rate / FRAMES_PER_SECOND) as usize;
    if bit_count > MAX_BITS_PER_FRAME {
        error!("more than {} bits; bitstream is corrupted", MAX_BITS_PER_FRAME);
    }

    let payload = &packet[idx + 1..];
    let mut info = FrameInfo {
        family: toc.family,
        bucket,
        bit_rate,
        quality: toc.quality,
        sid: None,
        cmi: None,
    };

    let bits = match bucket {
        RateBucket::LegacyIo(mode) => {
            let needed = if mode == LegacyIoMode::Sid {
                bit_count + SID_TRAILER_BITS
            } else {
                bit_count
            };
            ensure_len(payload, needed)?;

            let mut reader = BitReader::new(payload);
            let native = order.wire_to_native(mode, &mut reader);

            if mode == LegacyIoMode::Sid {
                let sid = SidKind::from_sti(reader.next_bit());
                info.cmi = Some(reader.read_bits(4) as u8);
                info.sid = Some(sid);
                if sid == SidKind::First {
                    info.bit_rate = 0;
                }
            }
            native
        }
        _ => {
            ensure_len(payload, bit_count)?;
            payload[..bytes_for_bits(bit_count)].to_vec()
        }
    };

    Ok(ParsedPayload {
        mode_request,
        toc,
        info,
        bits,
        bit_count,
        bad_frame: toc.is_bad_frame(),
    })
}

fn ensure_len(payload: &[u8], bits: usize) -> Result<()> {
    if payload.len() < bytes_for_bits(bits) {
        return Err(EvsError::invalid_payload(format!(
            "{} payload bytes, {} bits expected",
            payload.len(),
            bits
        )));
    }
    Ok(())
}

/// Outcome of decoding one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeReport {
    /// Mode request carried by the packet
    pub mode_request: Option<u8>,
    /// Frame header details
    pub info: FrameInfo,
    /// Frame was flagged as damaged
    pub bad_frame: bool,
    /// Samples appended to the output
    pub samples: usize,
}

/// Decoder side of one media leg
pub struct EvsDecoderSession<D: EvsDecoder> {
    decoder: D,
    config: SessionConfig,
    output: Vec<i16>,
}

impl<D: EvsDecoder> EvsDecoderSession<D> {
    /// Create a session around an external decoder
    pub fn new(decoder: D, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        debug!("Created EVS decoder session at {}", config.sample_rate);

        Ok(Self {
            decoder,
            output: Vec::with_capacity(config.buffer_samples),
            config,
        })
    }

    /// Decode one packet into exactly one 20 ms frame of PCM
    ///
    /// A received mode request is only reported; storing it is up to the
    /// caller (see [`CapabilityRecord::apply_mode_request`](crate::fmtp::CapabilityRecord::apply_mode_request)).
    ///
    /// # Errors
    ///
    /// Parsing and decoder failures cost this packet only. A full output
    /// buffer returns [`EvsError::BufferOverflow`] before anything is
    /// decoded.
    pub fn frame_in(&mut self, packet: &[u8]) -> Result<DecodeReport> {
        let n_samples = self.config.samples_per_frame();
        let size = self.output.len() + n_samples;
        if size > self.config.buffer_samples {
            return Err(EvsError::BufferOverflow {
                size,
                capacity: self.config.buffer_samples,
            });
        }

        let parsed = parse_payload(packet, &self.config.bit_order)?;
        let mut pcm = self.decoder.decode(
            &parsed.info,
            &parsed.bits,
            parsed.bit_count,
            parsed.bad_frame,
        )?;
        pcm.resize(n_samples, 0);
        self.output.extend_from_slice(&pcm);

        Ok(DecodeReport {
            mode_request: parsed.mode_request,
            info: parsed.info,
            bad_frame: parsed.bad_frame,
            samples: n_samples,
        })
    }

    /// Samples decoded but not yet taken
    pub fn output_len(&self) -> usize {
        self.output.len()
    }

    /// Drain decoded PCM
    pub fn take_output(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.output)
    }

    /// Drain decoded PCM as native-endian 16-bit linear bytes
    pub fn take_slin_bytes(&mut self) -> Bytes {
        let samples = self.take_output();
        Bytes::copy_from_slice(bytemuck::cast_slice(&samples))
    }
}

impl<D: EvsDecoder> Drop for EvsDecoderSession<D> {
    fn drop(&mut self) {
        debug!("Destroyed EVS decoder session");
    }
}
