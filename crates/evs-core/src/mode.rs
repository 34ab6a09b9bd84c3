//! Encoder operating mode
//!
//! Turns negotiated capabilities and received mode requests into the knobs
//! the external encoder needs: family, bit rate, bandwidth cap, DTX,
//! channel-aware mode and the internal core (`CodecMode`).

use crate::bitstream::header::{mode_byte, BandwidthClass};
use crate::fmtp::{CapabilityRecord, ModeSwitch};
use crate::rate::{LegacyIoMode, PrimaryMode};
use crate::types::{Bandwidth, CodecFamily, CodecMode, SampleRate};
use tracing::{error, warn};

/// Core coder for a bit rate
///
/// AMR-WB IO always runs on Mode 1. At 13.2 kbit/s only the channel-aware
/// variant uses Mode 2.
pub fn select_mode(legacy_io: bool, channel_aware: bool, total_bitrate: u32) -> Option<CodecMode> {
    if legacy_io {
        return Some(CodecMode::Mode1);
    }

    match total_bitrate {
        2400 | 2800 | 5900 | 7200 | 8000 => Some(CodecMode::Mode1),
        9600 => Some(CodecMode::Mode2),
        13200 if channel_aware => Some(CodecMode::Mode2),
        13200 => Some(CodecMode::Mode1),
        16400 | 24400 => Some(CodecMode::Mode2),
        32000 => Some(CodecMode::Mode1),
        48000 => Some(CodecMode::Mode2),
        64000 => Some(CodecMode::Mode1),
        96000 | 128000 => Some(CodecMode::Mode2),
        rate => {
            error!("Unexpected EVS bit rate {}", rate);
            None
        }
    }
}

/// Cap a primary rate to what the bandwidth supports
///
/// Narrowband stops at 24.4 kbit/s.
pub fn select_bit_rate(requested: PrimaryMode, max_bandwidth: Bandwidth) -> PrimaryMode {
    match max_bandwidth {
        Bandwidth::Narrowband => requested.min(PrimaryMode::Rate24400),
        _ => requested,
    }
}

/// Everything the external encoder needs to know about the current frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderModeState {
    /// Session sample rate
    pub sample_rate: SampleRate,
    /// Encode with the AMR-WB IO modes
    pub legacy_io: bool,
    /// Channel-aware (partial redundancy) mode
    pub channel_aware: bool,
    /// Partial redundancy offset in frames, 0 when channel-aware is off
    pub rf_fec_offset: u8,
    /// Source-controlled variable bit rate
    pub vbr: bool,
    /// Discontinuous transmission
    pub dtx: bool,
    /// Audio bandwidth cap
    pub max_bandwidth: Bandwidth,
    /// Primary rate bucket; index 0 stands for VBR
    pub primary: PrimaryMode,
    /// AMR-WB IO rate bucket
    pub legacy: LegacyIoMode,
    /// Core coder, `None` if the rate has no core
    pub codec_mode: Option<CodecMode>,
}

impl EncoderModeState {
    /// State for a session without negotiated capabilities
    ///
    /// Wideband primary at 16.4 kbit/s, which every bandwidth supports.
    pub fn new(sample_rate: SampleRate) -> Self {
        let max_bandwidth = if sample_rate.hz() <= 8000 {
            Bandwidth::Narrowband
        } else {
            Bandwidth::Wideband
        };

        let mut state = Self {
            sample_rate,
            legacy_io: false,
            channel_aware: false,
            rf_fec_offset: 0,
            vbr: false,
            dtx: false,
            max_bandwidth,
            primary: select_bit_rate(PrimaryMode::Rate16400, max_bandwidth),
            legacy: LegacyIoMode::Rate23850,
            codec_mode: None,
        };
        state.codec_mode = state.select_codec_mode();
        state
    }

    /// State derived from a negotiated record
    pub fn from_capabilities(record: &CapabilityRecord, sample_rate: SampleRate) -> Self {
        let channel_aware = record.ch_aw_send.min(record.ch_aw_recv);
        let rf_on = channel_aware > 0;
        let rf_fec_offset = if rf_on {
            channel_aware.min(CapabilityRecord::MAX_RF_FEC_OFFSET) as u8
        } else {
            0
        };

        let dtx = record.dtx.value().min(record.dtx_send) > 0;
        let legacy_io = record.evs_mode_switch == ModeSwitch::LegacyIo;

        let bandwidth_limit = record.bw_send.highest();
        let requested = record
            .br_send
            .highest()
            .and_then(|bucket| PrimaryMode::from_index(bucket - 1))
            .unwrap_or(PrimaryMode::Rate16400);
        let vbr = requested == PrimaryMode::Rate2800;

        let legacy = record
            .mode_set
            .highest()
            .and_then(LegacyIoMode::from_index)
            .unwrap_or(LegacyIoMode::Rate23850);

        let hz = sample_rate.hz();
        let max_bandwidth = if hz <= 8000 || bandwidth_limit == Some(Bandwidth::Narrowband) {
            Bandwidth::Narrowband
        } else if hz <= 16000 || bandwidth_limit == Some(Bandwidth::Wideband) || vbr {
            Bandwidth::Wideband
        } else if hz <= 32000 || bandwidth_limit == Some(Bandwidth::SuperWideband) {
            Bandwidth::SuperWideband
        } else {
            Bandwidth::Fullband
        };

        let primary = if vbr {
            requested
        } else {
            select_bit_rate(requested, max_bandwidth)
        };

        let mut state = Self {
            sample_rate,
            legacy_io,
            channel_aware: rf_on,
            rf_fec_offset,
            vbr,
            dtx,
            max_bandwidth,
            primary,
            legacy,
            codec_mode: None,
        };
        state.codec_mode = state.select_codec_mode();
        state
    }

    /// Codec family the next frames will use
    pub fn family(&self) -> CodecFamily {
        CodecFamily::from_legacy_bit(self.legacy_io)
    }

    /// Target bit rate in bits per second
    ///
    /// VBR averages 5.9 kbit/s but is configured at 7.2.
    pub fn total_bitrate(&self) -> u32 {
        if self.legacy_io {
            self.legacy.bit_rate()
        } else if self.vbr {
            PrimaryMode::Rate7200.bit_rate()
        } else {
            self.primary.bit_rate()
        }
    }

    /// Mode byte describing this state
    pub fn mode_byte(&self) -> u8 {
        if self.legacy_io {
            mode_byte(BandwidthClass::LegacyIo, self.legacy.index())
        } else {
            mode_byte(
                BandwidthClass::for_bandwidth(self.max_bandwidth),
                self.primary.index(),
            )
        }
    }

    /// Mode byte used when the session has none stored
    pub fn default_mode_byte(&self) -> u8 {
        if self.legacy_io {
            mode_byte(BandwidthClass::LegacyIo, PrimaryMode::Rate16400.index())
        } else {
            mode_byte(BandwidthClass::Wideband, PrimaryMode::Rate16400.index())
        }
    }

    /// Apply a mode byte from a change mode request or the session record
    ///
    /// Values above 0x7f and the reserved 0x7_ class change nothing. The
    /// bandwidth is never raised above what the sample rate carries.
    pub fn apply_mode_request(&mut self, mode: u8) {
        if mode > 0x7f {
            return;
        }

        let rate_index = mode & 0x0f;
        let rate_limit = self.sample_rate.max_bandwidth();
        let class = BandwidthClass::from_mode(mode);

        match class {
            BandwidthClass::Reserved => return,
            BandwidthClass::LegacyIo => match LegacyIoMode::from_index(rate_index) {
                Some(legacy) => {
                    self.legacy_io = true;
                    self.legacy = legacy;
                }
                None => {
                    warn!("Ignoring AMR-WB IO mode request {:#04x}", mode);
                    return;
                }
            },
            BandwidthClass::WidebandChannelAware | BandwidthClass::SuperWidebandChannelAware => {
                let limit = if class == BandwidthClass::WidebandChannelAware {
                    Bandwidth::Wideband
                } else {
                    Bandwidth::SuperWideband
                };
                self.legacy_io = false;
                self.vbr = false;
                self.channel_aware = true;
                self.primary = PrimaryMode::Rate13200;
                self.max_bandwidth = rate_limit.min(limit);
            }
            BandwidthClass::Narrowband
            | BandwidthClass::Wideband
            | BandwidthClass::SuperWideband
            | BandwidthClass::Fullband => {
                let Some(primary) = PrimaryMode::from_index(rate_index).filter(|p| p.is_speech())
                else {
                    warn!("Ignoring EVS mode request {:#04x}", mode);
                    return;
                };
                let limit = match class {
                    BandwidthClass::Narrowband => Bandwidth::Narrowband,
                    BandwidthClass::Wideband => Bandwidth::Wideband,
                    BandwidthClass::SuperWideband => Bandwidth::SuperWideband,
                    _ => Bandwidth::Fullband,
                };

                self.legacy_io = false;
                self.channel_aware = false;
                self.primary = primary;
                self.max_bandwidth = rate_limit.min(limit);
                self.vbr = limit <= Bandwidth::Wideband && primary == PrimaryMode::Rate2800;
            }
        }

        self.codec_mode = self.select_codec_mode();
    }

    fn select_codec_mode(&self) -> Option<CodecMode> {
        select_mode(self.legacy_io, self.channel_aware, self.total_bitrate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fmtp::BitRateMask;

    #[test]
    fn test_select_mode_table() {
        assert_eq!(select_mode(true, false, 0), Some(CodecMode::Mode1));
        assert_eq!(select_mode(false, false, 2400), Some(CodecMode::Mode1));
        assert_eq!(select_mode(false, false, 5900), Some(CodecMode::Mode1));
        assert_eq!(select_mode(false, false, 9600), Some(CodecMode::Mode2));
        assert_eq!(select_mode(false, false, 13200), Some(CodecMode::Mode1));
        assert_eq!(select_mode(false, true, 13200), Some(CodecMode::Mode2));
        assert_eq!(select_mode(false, false, 32000), Some(CodecMode::Mode1));
        assert_eq!(select_mode(false, false, 128000), Some(CodecMode::Mode2));
        assert_eq!(select_mode(false, false, 12345), None);
    }

    #[test]
    fn test_select_bit_rate() {
        assert_eq!(
            select_bit_rate(PrimaryMode::Rate64000, Bandwidth::Narrowband),
            PrimaryMode::Rate24400
        );
        assert_eq!(
            select_bit_rate(PrimaryMode::Rate9600, Bandwidth::Narrowband),
            PrimaryMode::Rate9600
        );
        assert_eq!(
            select_bit_rate(PrimaryMode::Rate64000, Bandwidth::Wideband),
            PrimaryMode::Rate64000
        );
    }

    #[test]
    fn test_default_state() {
        let state = EncoderModeState::new(SampleRate::Rate16000);
        assert_eq!(state.total_bitrate(), 16400);
        assert_eq!(state.max_bandwidth, Bandwidth::Wideband);
        assert_eq!(state.codec_mode, Some(CodecMode::Mode2));
        assert_eq!(state.mode_byte(), 0x25);
        assert_eq!(state.default_mode_byte(), 0x25);

        let state = EncoderModeState::new(SampleRate::Rate8000);
        assert_eq!(state.max_bandwidth, Bandwidth::Narrowband);
        assert_eq!(state.mode_byte(), 0x05);
    }

    #[test]
    fn test_from_any_capabilities() {
        let state =
            EncoderModeState::from_capabilities(&CapabilityRecord::any(), SampleRate::Rate48000);
        assert!(!state.legacy_io);
        assert!(state.dtx);
        // ch-aw-send 7 but ch-aw-recv 0
        assert!(!state.channel_aware);
        assert_eq!(state.max_bandwidth, Bandwidth::Fullband);
        assert_eq!(state.total_bitrate(), 128000);
        assert_eq!(state.mode_byte(), 0x4b);
    }

    #[test]
    fn test_from_capabilities_caps_bandwidth() {
        let record: CapabilityRecord = "br=13.2-64;bw=nb-wb".parse().unwrap();
        let state = EncoderModeState::from_capabilities(&record, SampleRate::Rate32000);
        assert_eq!(state.max_bandwidth, Bandwidth::Wideband);
        assert_eq!(state.total_bitrate(), 64000);

        let record: CapabilityRecord = "br=13.2-64;bw=nb".parse().unwrap();
        let state = EncoderModeState::from_capabilities(&record, SampleRate::Rate32000);
        assert_eq!(state.max_bandwidth, Bandwidth::Narrowband);
        assert_eq!(state.total_bitrate(), 24400);
        assert_eq!(state.mode_byte(), 0x06);
    }

    #[test]
    fn test_from_capabilities_vbr() {
        let mut record = CapabilityRecord::any();
        record.br_send = BitRateMask::from_range(1, 1);
        let state = EncoderModeState::from_capabilities(&record, SampleRate::Rate48000);
        assert!(state.vbr);
        assert_eq!(state.max_bandwidth, Bandwidth::Wideband);
        assert_eq!(state.total_bitrate(), 7200);
        assert_eq!(state.mode_byte(), 0x20);
    }

    #[test]
    fn test_from_capabilities_legacy() {
        let record: CapabilityRecord = "evs-mode-switch=1;mode-set=0,1,2".parse().unwrap();
        let state = EncoderModeState::from_capabilities(&record, SampleRate::Rate16000);
        assert!(state.legacy_io);
        assert_eq!(state.family(), CodecFamily::LegacyIo);
        assert_eq!(state.total_bitrate(), 12650);
        assert_eq!(state.codec_mode, Some(CodecMode::Mode1));
        assert_eq!(state.mode_byte(), 0x12);
        assert_eq!(state.default_mode_byte(), 0x15);
    }

    #[test]
    fn test_from_capabilities_channel_aware() {
        let mut record = CapabilityRecord::any();
        record.ch_aw_recv = 12;
        record.br_send = BitRateMask::from_range(5, 5);
        let state = EncoderModeState::from_capabilities(&record, SampleRate::Rate16000);
        assert!(state.channel_aware);
        assert_eq!(state.rf_fec_offset, 7);
        assert_eq!(state.codec_mode, Some(CodecMode::Mode2));
    }

    #[test]
    fn test_apply_mode_request() {
        let mut state = EncoderModeState::new(SampleRate::Rate16000);

        state.apply_mode_request(0x15);
        assert!(state.legacy_io);
        assert_eq!(state.total_bitrate(), 18250);

        // super-wideband request on a 16 kHz session stays wideband
        state.apply_mode_request(0x37);
        assert!(!state.legacy_io);
        assert_eq!(state.max_bandwidth, Bandwidth::Wideband);
        assert_eq!(state.total_bitrate(), 32000);
        assert_eq!(state.codec_mode, Some(CodecMode::Mode1));

        state.apply_mode_request(0x20);
        assert!(state.vbr);
        assert_eq!(state.total_bitrate(), 7200);

        state.apply_mode_request(0x50);
        assert!(state.channel_aware);
        assert!(!state.vbr);
        assert_eq!(state.total_bitrate(), 13200);
        assert_eq!(state.codec_mode, Some(CodecMode::Mode2));
    }

    #[test]
    fn test_apply_mode_request_no_ops() {
        let mut state = EncoderModeState::new(SampleRate::Rate16000);
        let before = state.clone();

        state.apply_mode_request(0x7f);
        state.apply_mode_request(0x75);
        state.apply_mode_request(0xa5);
        state.apply_mode_request(0x2d);
        state.apply_mode_request(0x1c);
        assert_eq!(state, before);
    }
}
