//! Capability intersection
//!
//! Most fields combine symmetrically; the channel-aware offsets do not.
//! The joint sender offset is the smaller of the two, the joint receiver
//! offset the larger.

use super::parse::{parse_fmtp, Perspective};
use super::record::{CapabilityRecord, CmrMode, ModeSet};
use crate::error::{NegotiationConflict, Result};
use std::borrow::Cow;
use tracing::{debug, warn};

impl CapabilityRecord {
    /// Capabilities both records accept
    ///
    /// Joining with the canonical "accept anything" record borrows the other
    /// side whenever the full intersection would reproduce it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EvsError::NegotiationFailed`](crate::EvsError::NegotiationFailed)
    /// when mode sets, bit rates or bandwidths do not overlap, when
    /// multi-channel counts differ, or when both sides demand different
    /// CMR usage.
    pub fn joint<'a>(&'a self, other: &'a Self) -> Result<Cow<'a, Self>> {
        if other.is_any() && self.is_within_any() {
            return Ok(Cow::Borrowed(self));
        }
        if self.is_any() && other.is_within_any() {
            return Ok(Cow::Borrowed(other));
        }

        self.intersect(other).map(Cow::Owned).map_err(|conflict| {
            warn!("EVS negotiation failed: {}", conflict);
            conflict.into()
        })
    }

    /// Every min/max field already lies inside the canonical record's range
    /// and no mask is empty
    fn is_within_any(&self) -> bool {
        let any = &Self::ANY;
        self.dtx_send <= any.dtx_send
            && self.dtx_recv <= any.dtx_recv
            && self.ch_aw_send <= any.ch_aw_send
            && self.ch_aw_recv >= any.ch_aw_recv
            && self.ch_send <= 1
            && self.ch_recv <= 1
            && self.br_send.selectable() != 0
            && self.br_recv.selectable() != 0
            && self.bw_send.selectable() != 0
            && self.bw_recv.selectable() != 0
    }

    pub(crate) fn intersect(&self, other: &Self) -> std::result::Result<Self, NegotiationConflict> {
        let mode_set = self
            .mode_set
            .intersect(other.mode_set)
            .ok_or(NegotiationConflict::NoCommonModeSet)?;

        let br_send = self.br_send.intersect(other.br_send);
        let br_recv = self.br_recv.intersect(other.br_recv);
        if br_send.selectable() == 0 || br_recv.selectable() == 0 {
            return Err(NegotiationConflict::NoCommonBitRate);
        }

        let bw_send = self.bw_send.intersect(other.bw_send);
        let bw_recv = self.bw_recv.intersect(other.bw_recv);
        if bw_send.selectable() == 0 || bw_recv.selectable() == 0 {
            return Err(NegotiationConflict::NoCommonBandwidth);
        }

        let cmr = joint_cmr(self.cmr, other.cmr)?;
        let ch_recv = joint_channels("receive", self.ch_recv, other.ch_recv)?;
        let ch_send = joint_channels("send", self.ch_send, other.ch_send)?;

        let current_mode = joint_current_mode(self, other, mode_set);

        Ok(Self {
            evs_mode_switch: self.evs_mode_switch.max(other.evs_mode_switch),
            hf_only: self.hf_only.max(other.hf_only),
            dtx: self.dtx.min(other.dtx),
            dtx_send: self.dtx_send.min(other.dtx_send),
            dtx_recv: self.dtx_recv.min(other.dtx_recv),
            max_red: self.max_red.max(other.max_red),
            cmr,
            cmr_included: self.cmr_included || other.cmr_included,
            br_included: self.br_included || other.br_included,
            br_send,
            br_recv,
            bw_included: self.bw_included || other.bw_included,
            bw_send,
            bw_recv,
            ch_send,
            ch_recv,
            ch_aw_send: self.ch_aw_send.min(other.ch_aw_send),
            ch_aw_recv: self.ch_aw_recv.max(other.ch_aw_recv),
            mode_set,
            mode_change_period: self.mode_change_period.max(other.mode_change_period),
            mode_change_neighbor: self.mode_change_neighbor.max(other.mode_change_neighbor),
            current_mode,
        })
    }

    /// Whether the two records can describe the same stream at all
    ///
    /// Only multi-channel counts make records incompatible; every other
    /// difference is settled by [`joint`](Self::joint).
    pub fn is_compatible(&self, other: &Self) -> bool {
        joint_channels("receive", self.ch_recv, other.ch_recv).is_ok()
            && joint_channels("send", self.ch_send, other.ch_send).is_ok()
    }
}

fn joint_cmr(a: CmrMode, b: CmrMode) -> std::result::Result<CmrMode, NegotiationConflict> {
    match (a, b) {
        (CmrMode::Optional, other) | (other, CmrMode::Optional) => Ok(other),
        (a, b) if a == b => Ok(a),
        (a, b) => Err(NegotiationConflict::CmrConflict {
            local: a.value(),
            remote: b.value(),
        }),
    }
}

/// An unrestricted side defers to the other; two restricted sides that
/// disagree fall back to the lowest common mode.
fn joint_current_mode(a: &CapabilityRecord, b: &CapabilityRecord, mode_set: ModeSet) -> u8 {
    match (a.mode_set.is_unrestricted(), b.mode_set.is_unrestricted()) {
        (false, true) => a.current_mode,
        (true, false) => b.current_mode,
        (true, true) => a.current_mode.max(b.current_mode),
        (false, false) if a.current_mode == b.current_mode => a.current_mode,
        (false, false) => mode_set.lowest().unwrap_or(a.current_mode),
    }
}

fn joint_channels(
    direction: &'static str,
    a: u32,
    b: u32,
) -> std::result::Result<u32, NegotiationConflict> {
    if (a > 1 || b > 1) && a != b {
        return Err(NegotiationConflict::ChannelMismatch {
            direction,
            local: a,
            remote: b,
        });
    }
    Ok(a.max(b))
}

/// Joint of our capabilities and the peer's `a=fmtp` parameters
///
/// The peer's line is read with [`Perspective::Remote`], so its send
/// direction lines up with our receive direction.
pub fn negotiate(local: &CapabilityRecord, remote_fmtp: &str) -> Result<CapabilityRecord> {
    let remote = parse_fmtp(remote_fmtp, Perspective::Remote);
    let joint = local.joint(&remote)?.into_owned();
    debug!("Negotiated EVS parameters: {}", joint);
    Ok(joint)
}
