//! `a=fmtp` parameter parsing
//!
//! Parsing is lenient in the way SDP peers expect: keys are matched
//! case-insensitively anywhere in the line, values are scanned with a
//! bounded width, and anything unreadable leaves the parameter at its
//! default. Parsing never fails.

use super::record::{
    BandwidthMask, BitRateMask, CapabilityRecord, CmrMode, Dtx, HeaderFormat, ModeSet, ModeSwitch,
};
use crate::error::{EvsError, Result};
use std::str::FromStr;
use tracing::debug;

const INT_WIDTH: usize = 30;
const FLOAT_WIDTH: usize = 4;
const TOKEN_WIDTH: usize = 6;

/// Whose point of view the send/receive fields take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Perspective {
    /// Keys are stored as written; `br-send` fills `br_send`
    #[default]
    Local,
    /// The line came from the peer; its send direction is our receive
    /// direction and vice versa
    Remote,
}

/// Bit-rate bucket for a value in kbit/s
///
/// Each boundary belongs to the lower bucket; anything above 96 lands in
/// bucket 12 (128 kbit/s).
pub fn bucket_of(kbps: f32) -> u8 {
    const LADDER: [f32; 11] = [5.9, 7.2, 8.0, 9.7, 13.2, 16.4, 24.4, 32.0, 48.0, 64.0, 96.0];

    LADDER
        .iter()
        .position(|&limit| kbps <= limit)
        .map_or(BitRateMask::MAX_BUCKET, |idx| idx as u8 + 1)
}

/// Mask covering `low` up to `high` kbit/s; a missing or zero `high` means
/// the single bucket of `low`
pub fn bit_rate_range(low: f32, high: Option<f32>) -> BitRateMask {
    let start = bucket_of(low);
    let end = match high {
        Some(high) if high != 0.0 => bucket_of(high),
        _ => start,
    };
    BitRateMask::from_range(start, end)
}

/// Mask for a bandwidth token; unknown tokens mean every bandwidth
pub fn bandwidth_from_token(token: &str) -> BandwidthMask {
    match token {
        "nb-swb" => BandwidthMask::from_bits(0x0e),
        "nb-wb" => BandwidthMask::from_bits(0x06),
        "fb" => BandwidthMask::from_bits(0x10),
        "swb" => BandwidthMask::from_bits(0x08),
        "wb" => BandwidthMask::from_bits(0x04),
        "nb" => BandwidthMask::from_bits(0x02),
        _ => BandwidthMask::ALL,
    }
}

/// Parse one `a=fmtp` parameter list
pub fn parse_fmtp(attributes: &str, perspective: Perspective) -> CapabilityRecord {
    FmtpParams::scan(attributes).into_record(perspective)
}

impl FromStr for CapabilityRecord {
    type Err = EvsError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(parse_fmtp(s, Perspective::Local))
    }
}

/// Raw values found in the line, before perspective is applied
#[derive(Debug, Default)]
struct FmtpParams {
    evs_mode_switch: Option<u32>,
    hf_only: Option<u32>,
    dtx: Option<u32>,
    dtx_recv: Option<u32>,
    max_red: Option<u32>,
    cmr: Option<i32>,
    ch_send: Option<u32>,
    ch_recv: Option<u32>,
    ch_aw_recv: Option<i32>,
    br: Option<BitRateMask>,
    br_send: Option<BitRateMask>,
    br_recv: Option<BitRateMask>,
    bw: Option<BandwidthMask>,
    bw_send: Option<BandwidthMask>,
    bw_recv: Option<BandwidthMask>,
    mode_set: Option<(ModeSet, Option<u8>)>,
    mode_change_period: Option<u32>,
    mode_change_neighbor: Option<u32>,
}

impl FmtpParams {
    fn scan(attributes: &str) -> Self {
        let lower = attributes.to_ascii_lowercase();
        let line = lower.as_str();

        Self {
            evs_mode_switch: value_of(line, "evs-mode-switch=").and_then(scan_unsigned),
            hf_only: value_of(line, "hf-only=").and_then(scan_unsigned),
            dtx: value_of(line, "dtx=").and_then(scan_unsigned),
            dtx_recv: value_of(line, "dtx-recv=").and_then(scan_unsigned),
            max_red: value_of(line, "max-red=").and_then(scan_unsigned),
            cmr: value_of(line, "cmr=").and_then(scan_signed),
            ch_send: value_of(line, "ch-send=").and_then(scan_count),
            ch_recv: value_of(line, "ch-recv=").and_then(scan_count),
            ch_aw_recv: value_of(line, "ch-aw-recv=").and_then(scan_signed),
            br: value_of(line, "br=").and_then(scan_bit_rate),
            br_send: value_of(line, "br-send=").and_then(scan_bit_rate),
            br_recv: value_of(line, "br-recv=").and_then(scan_bit_rate),
            bw: value_of(line, "bw=").and_then(scan_bandwidth),
            bw_send: value_of(line, "bw-send=").and_then(scan_bandwidth),
            bw_recv: value_of(line, "bw-recv=").and_then(scan_bandwidth),
            mode_set: value_of(line, "mode-set=").and_then(scan_mode_set),
            mode_change_period: value_of(line, "mode-change-period=").and_then(scan_unsigned),
            mode_change_neighbor: value_of(line, "mode-change-neighbor=").and_then(scan_unsigned),
        }
    }

    fn into_record(self, perspective: Perspective) -> CapabilityRecord {
        let mut record = CapabilityRecord::any();

        record.evs_mode_switch = self
            .evs_mode_switch
            .and_then(ModeSwitch::from_value)
            .unwrap_or_default();
        record.hf_only = self
            .hf_only
            .and_then(HeaderFormat::from_value)
            .unwrap_or_default();
        record.dtx = self.dtx.map(Dtx::from_value).unwrap_or_default();
        record.max_red = self.max_red;

        if let Some(value) = self.cmr {
            match CmrMode::from_value(value) {
                Some(cmr) => {
                    record.cmr = cmr;
                    record.cmr_included = true;
                }
                None => debug!("Ignoring unsupported cmr={}", value),
            }
        }

        if let Some(mask) = self.br {
            record.br_send = mask;
            record.br_recv = mask;
            record.br_included = true;
        }
        if let Some(mask) = self.bw {
            record.bw_send = mask;
            record.bw_recv = mask;
            record.bw_included = true;
        }

        match perspective {
            Perspective::Local => {
                record.dtx_send = 1;
                record.dtx_recv = self.dtx_recv.unwrap_or(2);
                record.ch_send = self.ch_send.unwrap_or(0);
                record.ch_recv = self.ch_recv.unwrap_or(0);
                record.ch_aw_send = 0;
                record.ch_aw_recv = self.ch_aw_recv.unwrap_or(-2);
                if let Some(mask) = self.br_send {
                    record.br_send = mask.explicit();
                }
                if let Some(mask) = self.br_recv {
                    record.br_recv = mask.explicit();
                }
                if let Some(mask) = self.bw_send {
                    record.bw_send = mask.explicit();
                }
                if let Some(mask) = self.bw_recv {
                    record.bw_recv = mask.explicit();
                }
            }
            Perspective::Remote => {
                record.dtx_send = self.dtx_recv.unwrap_or(1);
                record.dtx_recv = 2;
                record.ch_send = self.ch_recv.unwrap_or(0);
                record.ch_recv = self.ch_send.unwrap_or(0);
                record.ch_aw_send = self.ch_aw_recv.unwrap_or(0);
                record.ch_aw_recv = -2;
                if let Some(mask) = self.br_send {
                    record.br_recv = mask.explicit();
                }
                if let Some(mask) = self.br_recv {
                    record.br_send = mask.explicit();
                }
                if let Some(mask) = self.bw_send {
                    record.bw_recv = mask.explicit();
                }
                if let Some(mask) = self.bw_recv {
                    record.bw_send = mask.explicit();
                }
            }
        }

        if let Some((mode_set, last)) = self.mode_set {
            record.mode_set = mode_set;
            if let Some(mode) = last {
                record.current_mode = mode;
            }
        }
        record.mode_change_period = self.mode_change_period.unwrap_or(0);
        record.mode_change_neighbor = self.mode_change_neighbor.unwrap_or(0);

        record
    }
}

/// Text right after the first occurrence of `key`
fn value_of<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.find(key).map(|idx| &line[idx + key.len()..])
}

/// Leading run of at most `width` characters accepted by `accept`
fn take_while_bounded(s: &str, width: usize, mut accept: impl FnMut(usize, char) -> bool) -> &str {
    let end = s
        .char_indices()
        .take(width)
        .find(|&(idx, c)| !accept(idx, c))
        .map_or_else(
            || s.char_indices().nth(width).map_or(s.len(), |(idx, _)| idx),
            |(idx, _)| idx,
        );
    &s[..end]
}

fn scan_digits(s: &str, allow_sign: bool) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let token = take_while_bounded(s, INT_WIDTH, |idx, c| {
        c.is_ascii_digit() || (allow_sign && idx == 0 && (c == '-' || c == '+'))
    });
    if token.is_empty() || token == "-" || token == "+" {
        return None;
    }
    Some((token, &s[token.len()..]))
}

fn scan_unsigned(s: &str) -> Option<u32> {
    scan_digits(s, false).and_then(|(token, _)| token.parse().ok())
}

fn scan_signed(s: &str) -> Option<i32> {
    scan_digits(s, true).and_then(|(token, _)| token.parse().ok())
}

fn scan_count(s: &str) -> Option<u32> {
    scan_signed(s).and_then(|value| u32::try_from(value).ok())
}

fn scan_float(s: &str) -> Option<(f32, &str)> {
    let s = s.trim_start();
    let mut seen_dot = false;
    let token = take_while_bounded(s, FLOAT_WIDTH, |idx, c| match c {
        '0'..='9' => true,
        '.' if !seen_dot => {
            seen_dot = true;
            true
        }
        '+' | '-' => idx == 0,
        _ => false,
    });
    let value = token.parse::<f32>().ok()?;
    Some((value, &s[token.len()..]))
}

/// `low[-high]` in kbit/s
fn scan_bit_rate(s: &str) -> Option<BitRateMask> {
    let (low, rest) = scan_float(s)?;
    let high = rest.strip_prefix('-').and_then(scan_float).map(|(high, _)| high);
    Some(bit_rate_range(low, high))
}

fn scan_bandwidth(s: &str) -> Option<BandwidthMask> {
    let token = take_while_bounded(s, TOKEN_WIDTH, |_, c| c != ' ' && c != ';');
    (!token.is_empty()).then(|| bandwidth_from_token(token))
}

/// Up to nine comma separated modes; returns the set and the last valid mode
fn scan_mode_set(s: &str) -> Option<(ModeSet, Option<u8>)> {
    let mut set = ModeSet::ALL;
    let mut last = None;
    let mut rest = s;
    let mut scanned = 0;

    while scanned < ModeSet::MODES {
        let Some((token, tail)) = scan_digits(rest, false) else {
            break;
        };
        scanned += 1;

        if let Ok(mode) = token.parse::<u8>() {
            if mode < ModeSet::MODES {
                set.insert(mode);
                last = Some(mode);
            }
        }

        match tail.strip_prefix(',') {
            Some(next) => rest = next,
            None => break,
        }
    }

    (scanned > 0).then_some((set, last))
}
