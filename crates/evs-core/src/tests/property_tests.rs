//! Property tests for negotiation and payload parsing

use crate::bitstream::{parse_payload, BitOrder};
use crate::fmtp::*;
use proptest::prelude::*;
use std::borrow::Cow;

const BANDWIDTH_TOKENS: [&str; 6] = ["nb", "wb", "swb", "fb", "nb-wb", "nb-swb"];
const BIT_RATE_VALUES: [&str; 12] = [
    "5.9", "7.2", "8", "9.6", "13.2", "16.4", "24.4", "32", "48", "64", "96", "128",
];

/// fmtp lines with contiguous bit-rate ranges and tokenised bandwidths
fn fmtp_line() -> impl Strategy<Value = String> {
    (
        prop::option::of((0usize..12, 0usize..12)),
        prop::option::of(0usize..BANDWIDTH_TOKENS.len()),
        prop::option::of(0u32..3),
        prop::option::of(prop::sample::subsequence((0u8..9).collect::<Vec<_>>(), 1..4)),
        prop::option::of(0u32..2),
        prop::option::of(-1i32..2),
    )
        .prop_map(|(br, bw, dtx, modes, switch, cmr)| {
            let mut params = Vec::new();
            if let Some(switch) = switch {
                params.push(format!("evs-mode-switch={}", switch));
            }
            if let Some(dtx) = dtx {
                params.push(format!("dtx={}", dtx));
            }
            if let Some(cmr) = cmr {
                params.push(format!("cmr={}", cmr));
            }
            if let Some((a, b)) = br {
                let (low, high) = (a.min(b), a.max(b));
                params.push(format!(
                    "br={}-{}",
                    BIT_RATE_VALUES[low], BIT_RATE_VALUES[high]
                ));
            }
            if let Some(bw) = bw {
                params.push(format!("bw={}", BANDWIDTH_TOKENS[bw]));
            }
            if let Some(modes) = modes {
                let modes: Vec<String> = modes.iter().map(u8::to_string).collect();
                params.push(format!("mode-set={}", modes.join(",")));
            }
            params.join(";")
        })
}

/// fmtp lines that also state channel-aware offsets, read from either side
fn channel_aware_record() -> impl Strategy<Value = CapabilityRecord> {
    (fmtp_line(), prop::option::of(-2i32..8), any::<bool>()).prop_map(|(line, ch_aw, remote)| {
        let line = match ch_aw {
            Some(offset) if line.is_empty() => format!("ch-aw-recv={}", offset),
            Some(offset) => format!("{};ch-aw-recv={}", line, offset),
            None => line,
        };
        let perspective = if remote {
            Perspective::Remote
        } else {
            Perspective::Local
        };
        parse_fmtp(&line, perspective)
    })
}

fn without_current_mode(mut record: CapabilityRecord) -> CapabilityRecord {
    record.current_mode = 0;
    record
}

proptest! {
    #[test]
    fn prop_joint_with_any_matches_intersection(record in channel_aware_record()) {
        let any = CapabilityRecord::any();

        let forward = record.joint(&any).unwrap();
        let backward = any.joint(&record).unwrap();
        prop_assert_eq!(&*forward, &record.intersect(&any).unwrap());
        prop_assert_eq!(&*backward, &*forward);
        if matches!(forward, Cow::Borrowed(_)) {
            prop_assert_eq!(&*forward, &record);
        }
    }

    #[test]
    fn prop_self_joint_matches_intersection(record in channel_aware_record()) {
        let copy = record.clone();
        let general = record.intersect(&copy).unwrap();

        let joint = record.joint(&record).unwrap();
        prop_assert_eq!(&*joint, &general);
        prop_assert_eq!(&general, &record);
    }

    #[test]
    fn prop_joint_channel_aware_is_min_send_max_recv(
        a in channel_aware_record(),
        b in channel_aware_record(),
    ) {
        if let Ok(joint) = a.joint(&b) {
            prop_assert_eq!(joint.ch_aw_send, a.ch_aw_send.min(b.ch_aw_send));
            prop_assert_eq!(joint.ch_aw_recv, a.ch_aw_recv.max(b.ch_aw_recv));
        }
    }

    #[test]
    fn prop_joint_is_commutative(a in fmtp_line(), b in fmtp_line()) {
        let a: CapabilityRecord = a.parse().unwrap();
        let b: CapabilityRecord = b.parse().unwrap();

        match (a.joint(&b), b.joint(&a)) {
            (Ok(ab), Ok(ba)) => prop_assert_eq!(
                without_current_mode(ab.into_owned()),
                without_current_mode(ba.into_owned())
            ),
            (Err(_), Err(_)) => {}
            (ab, ba) => prop_assert!(false, "one-sided failure: {:?} / {:?}", ab, ba),
        }
    }

    #[test]
    fn prop_joint_narrows_bit_rates(a in fmtp_line(), b in fmtp_line()) {
        let ra: CapabilityRecord = a.parse().unwrap();
        let rb: CapabilityRecord = b.parse().unwrap();

        if let Ok(joint) = ra.joint(&rb) {
            let selectable = joint.br_send.selectable();
            prop_assert_ne!(selectable, 0);
            prop_assert_eq!(selectable & !ra.br_send.selectable(), 0);
            prop_assert_eq!(selectable & !rb.br_send.selectable(), 0);
        }
    }

    #[test]
    fn prop_generation_is_idempotent(line in fmtp_line()) {
        let record: CapabilityRecord = line.parse().unwrap();
        let generated = record.fmtp_params();
        let reparsed: CapabilityRecord = generated.parse().unwrap();

        prop_assert_eq!(reparsed.fmtp_params(), generated);
        prop_assert_eq!(reparsed.br_send, record.br_send);
        prop_assert_eq!(reparsed.bw_send, record.bw_send);
        prop_assert_eq!(reparsed.mode_set, record.mode_set);
    }

    #[test]
    fn prop_sparse_bit_rates_collapse_to_span(bits in 1u16..0x1000) {
        let mask = BitRateMask::from_bits(bits << 1);
        let (low, high) = (mask.lowest().unwrap(), mask.highest().unwrap());

        let mut record = CapabilityRecord::any();
        record.br_send = mask;
        record.br_recv = mask;
        let reparsed: CapabilityRecord = record.fmtp_params().parse().unwrap();

        let span = BitRateMask::from_range(low, high);
        prop_assert_eq!(reparsed.br_send.selectable(), span.selectable());
        prop_assert_eq!(reparsed.br_recv.selectable(), span.selectable());
        prop_assert_eq!(reparsed.br_send.selectable() == mask.selectable(), mask.is_contiguous());
    }

    #[test]
    fn prop_bucket_boundary_is_inclusive(idx in 0usize..11, eps in 0.001f32..0.5) {
        const BOUNDARIES: [f32; 11] = [5.9, 7.2, 8.0, 9.7, 13.2, 16.4, 24.4, 32.0, 48.0, 64.0, 96.0];
        let boundary = BOUNDARIES[idx];
        let bucket = idx as u8 + 1;

        prop_assert_eq!(bucket_of(boundary), bucket);
        prop_assert_eq!(bucket_of(boundary - eps), bucket);
        prop_assert_eq!(bucket_of(boundary + eps), bucket + 1);
    }

    #[test]
    fn prop_bucket_of_is_monotone(a in 0.0f32..200.0, b in 0.0f32..200.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(bucket_of(low) <= bucket_of(high));
        prop_assert!((1..=12).contains(&bucket_of(high)));
    }

    #[test]
    fn prop_parse_never_panics(line in ".{0,80}") {
        let local = parse_fmtp(&line, Perspective::Local);
        let remote = parse_fmtp(&line, Perspective::Remote);
        let _ = local.fmtp_params();
        let _ = local.joint(&remote);
    }

    #[test]
    fn prop_parse_payload_never_panics(packet in prop::collection::vec(any::<u8>(), 0..400)) {
        let order = BitOrder::amr_wb_io();
        if let Ok(parsed) = parse_payload(&packet, &order) {
            prop_assert!(parsed.bits.len() * 8 >= parsed.bit_count);
        }
    }
}
