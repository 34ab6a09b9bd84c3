//! `a=fmtp` parameter generation
//!
//! Only parameters that differ from their defaults, or were explicitly
//! stated, are written. Bit-rate masks collapse to their lowest and highest
//! bucket, so a mask with holes does not survive a round trip.

use super::record::{BandwidthMask, BitRateMask, CapabilityRecord, Dtx};
use std::fmt;

const BUCKET_LABELS: [&str; 12] = [
    "5.9", "7.2", "8", "9.6", "13.2", "16.4", "24.4", "32", "48", "64", "96", "128",
];

/// fmtp label for a bit-rate bucket (1 to 12)
pub fn bucket_label(bucket: u8) -> &'static str {
    match bucket {
        1..=12 => BUCKET_LABELS[bucket as usize - 1],
        _ => "13.2",
    }
}

/// `low-high` or a single value when both ends are the same bucket
pub fn bit_rate_label(mask: BitRateMask) -> String {
    let low = bucket_label(mask.lowest().unwrap_or(BitRateMask::MIN_BUCKET));
    let high = bucket_label(mask.highest().unwrap_or(BitRateMask::MAX_BUCKET));

    if low == high {
        low.to_string()
    } else {
        format!("{}-{}", low, high)
    }
}

/// Bandwidth token; masks without a token of their own read as `nb-fb`
pub fn bandwidth_label(mask: BandwidthMask) -> &'static str {
    match mask.selectable() {
        0x0e => "nb-swb",
        0x06 => "nb-wb",
        0x10 => "fb",
        0x08 => "swb",
        0x04 => "wb",
        0x02 => "nb",
        _ => "nb-fb",
    }
}

impl CapabilityRecord {
    /// Parameters to advertise, in fixed order
    pub fn fmtp_entries(&self) -> Vec<String> {
        let mut entries = Vec::new();

        if let Some(value) = self.evs_mode_switch.value() {
            entries.push(format!("evs-mode-switch={}", value));
        }
        if let Some(value) = self.hf_only.value() {
            entries.push(format!("hf-only={}", value));
        }
        if self.dtx != Dtx::EnabledDefault {
            entries.push(format!("dtx={}", self.dtx.value()));
        }
        if self.dtx_recv != 2 {
            entries.push(format!("dtx-recv={}", self.dtx_recv));
        }
        if let Some(max_red) = self.max_red {
            entries.push(format!("max-red={}", max_red));
        }
        if self.cmr.value() != 0 || self.cmr_included {
            entries.push(format!("cmr={}", self.cmr.value()));
        }

        self.push_bit_rates(&mut entries);
        self.push_bandwidths(&mut entries);

        if self.ch_send != 0 {
            entries.push(format!("ch-send={}", self.ch_send));
        }
        if self.ch_recv != 0 {
            entries.push(format!("ch-recv={}", self.ch_recv));
        }
        if self.ch_aw_recv != 0 && self.ch_aw_recv != -2 {
            entries.push(format!("ch-aw-recv={}", self.ch_aw_recv));
        }

        if !self.mode_set.is_unrestricted() {
            let modes: Vec<String> = self.mode_set.iter().map(|mode| mode.to_string()).collect();
            entries.push(format!("mode-set={}", modes.join(",")));
        }
        if self.mode_change_period != 0 {
            entries.push(format!("mode-change-period={}", self.mode_change_period));
        }
        if self.mode_change_neighbor != 0 {
            entries.push(format!("mode-change-neighbor={}", self.mode_change_neighbor));
        }

        entries
    }

    fn push_bit_rates(&self, entries: &mut Vec<String>) {
        let (send, recv) = (self.br_send, self.br_recv);
        let same = send.selectable() == recv.selectable();

        if same && (self.br_included || send != BitRateMask::ALL) {
            entries.push(format!("br={}", bit_rate_label(send)));
        }
        if send.is_explicit() || (!same && send != BitRateMask::ALL) {
            entries.push(format!("br-send={}", bit_rate_label(send)));
        }
        if recv.is_explicit() || (!same && recv != BitRateMask::ALL) {
            entries.push(format!("br-recv={}", bit_rate_label(recv)));
        }
    }

    fn push_bandwidths(&self, entries: &mut Vec<String>) {
        let (send, recv) = (self.bw_send, self.bw_recv);
        let same = send.selectable() == recv.selectable();

        if same && (self.bw_included || send != BandwidthMask::ALL) {
            entries.push(format!("bw={}", bandwidth_label(send)));
        }
        if send.is_explicit() || (!same && send != BandwidthMask::ALL) {
            entries.push(format!("bw-send={}", bandwidth_label(send)));
        }
        if recv.is_explicit() || (!same && recv != BandwidthMask::ALL) {
            entries.push(format!("bw-recv={}", bandwidth_label(recv)));
        }
    }

    /// `;`-joined parameter list, empty when everything is default
    pub fn fmtp_params(&self) -> String {
        self.fmtp_entries().join(";")
    }

    /// Full SDP attribute line for `payload_type`
    ///
    /// Returns `None` when there is nothing to advertise.
    pub fn sdp_fmtp_line(&self, payload_type: u8) -> Option<String> {
        let params = self.fmtp_params();
        (!params.is_empty()).then(|| format!("a=fmtp:{} {}\r\n", payload_type, params))
    }
}

impl fmt::Display for CapabilityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fmtp_params())
    }
}
