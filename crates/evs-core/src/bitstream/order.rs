//! AMR-WB IO bit ordering
//!
//! AMR-WB IO frames travel in the RFC 4867 order, sorted by sensitivity
//! class, while the codec works on its native parameter order. A
//! [`BitOrder`] holds one row per AMR-WB IO rate: entry `i` of a row is the
//! native position of the `i`-th bit on the wire.
//!
//! Sessions use [`BitOrder::amr_wb_io`], built from the compiled-in
//! [`sort_tables`](crate::bitstream::sort_tables).

use crate::bitstream::cursor::{bytes_for_bits, get_bit, set_bit, BitReader, BitWriter};
use crate::bitstream::sort_tables::SORT_TABLES;
use crate::error::{EvsError, Result};
use crate::rate::LegacyIoMode;
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::sync::Arc;

static AMR_WB_IO: Lazy<Arc<BitOrder>> = Lazy::new(|| {
    Arc::new(BitOrder {
        rows: SORT_TABLES.map(Cow::Borrowed),
    })
});

static IDENTITY: Lazy<Arc<BitOrder>> = Lazy::new(|| {
    let rows = LegacyIoMode::BY_INDEX.map(|mode| {
        let bits = mode.bits_per_frame() as u16;
        Cow::Owned((0..bits).collect())
    });
    Arc::new(BitOrder { rows })
});

/// Wire-to-native bit permutation for every AMR-WB IO rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitOrder {
    rows: [Cow<'static, [u16]>; LegacyIoMode::COUNT],
}

impl BitOrder {
    /// The 3GPP sensitivity order shared by every session
    pub fn amr_wb_io() -> Arc<Self> {
        Arc::clone(&AMR_WB_IO)
    }

    /// Order that leaves every bit in place
    pub fn identity() -> Arc<Self> {
        Arc::clone(&IDENTITY)
    }

    /// Build from owned rows, indexed by AMR-WB IO rate index
    ///
    /// # Errors
    ///
    /// Returns [`EvsError::InvalidBitOrder`] if a row has the wrong length
    /// for its rate or is not a permutation.
    pub fn new(rows: [Vec<u16>; LegacyIoMode::COUNT]) -> Result<Self> {
        Self::validated(rows.map(Cow::Owned))
    }

    /// Build from compiled-in tables, indexed by AMR-WB IO rate index
    pub fn from_static(rows: [&'static [u16]; LegacyIoMode::COUNT]) -> Result<Self> {
        Self::validated(rows.map(Cow::Borrowed))
    }

    fn validated(rows: [Cow<'static, [u16]>; LegacyIoMode::COUNT]) -> Result<Self> {
        for (mode, row) in LegacyIoMode::BY_INDEX.iter().zip(rows.iter()) {
            let bits = mode.bits_per_frame();
            if row.len() != bits {
                return Err(EvsError::InvalidBitOrder {
                    mode: mode.to_string(),
                    details: format!("expected {} entries, got {}", bits, row.len()),
                });
            }

            let mut seen = vec![false; bits];
            for &pos in row.iter() {
                let pos = pos as usize;
                if pos >= bits || seen[pos] {
                    return Err(EvsError::InvalidBitOrder {
                        mode: mode.to_string(),
                        details: format!("position {} is out of range or repeated", pos),
                    });
                }
                seen[pos] = true;
            }
        }

        Ok(Self { rows })
    }

    /// Permutation row for one rate
    pub fn row(&self, mode: LegacyIoMode) -> &[u16] {
        &self.rows[mode.index() as usize]
    }

    /// Scatter wire-order bits into native order
    ///
    /// Consumes exactly `mode.bits_per_frame()` bits from `reader` and
    /// returns them packed MSB first, zero-padded to a byte boundary.
    pub fn wire_to_native(&self, mode: LegacyIoMode, reader: &mut BitReader<'_>) -> Vec<u8> {
        let row = self.row(mode);
        let mut native = vec![0u8; bytes_for_bits(row.len())];

        for &pos in row {
            let bit = reader.next_bit();
            set_bit(&mut native, pos as usize, bit);
        }

        native
    }

    /// Gather native-order bits into wire order, appending to `writer`
    pub fn native_to_wire(&self, mode: LegacyIoMode, native: &[u8], writer: &mut BitWriter) {
        for &pos in self.row(mode) {
            writer.push_bit(get_bit(native, pos as usize));
        }
    }
}

impl Default for BitOrder {
    fn default() -> Self {
        BitOrder::clone(&AMR_WB_IO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reversed_rows() -> [Vec<u16>; LegacyIoMode::COUNT] {
        LegacyIoMode::BY_INDEX.map(|mode| {
            let bits = mode.bits_per_frame() as u16;
            (0..bits).rev().collect()
        })
    }

    #[test]
    fn test_identity_rows() {
        let order = BitOrder::identity();
        for mode in LegacyIoMode::ALL {
            let row = order.row(mode);
            assert_eq!(row.len(), mode.bits_per_frame());
            assert!(row.iter().enumerate().all(|(i, &pos)| i == pos as usize));
        }
    }

    #[test]
    fn test_builtin_tables_validate() {
        let order = BitOrder::from_static(SORT_TABLES).unwrap();
        assert_eq!(order, *BitOrder::amr_wb_io());
        assert_eq!(BitOrder::default(), order);
        assert_ne!(order, *BitOrder::identity());
    }

    #[test]
    fn test_6600_wire_to_native() {
        let order = BitOrder::amr_wb_io();
        let mode = LegacyIoMode::Rate6600;

        // second wire bit only: lands on native bit 5
        let mut wire = [0u8; 17];
        wire[0] = 0x40;
        let native = order.wire_to_native(mode, &mut BitReader::new(&wire));
        assert_eq!(native.len(), 17);
        assert_eq!(native[0], 0x04);
        assert!(native[1..].iter().all(|&b| b == 0));

        // last wire bit is native bit 125
        let mut wire = [0u8; 17];
        set_bit(&mut wire, 131, true);
        let native = order.wire_to_native(mode, &mut BitReader::new(&wire));
        assert!(get_bit(&native, 125));
        assert_eq!(native.iter().map(|b| b.count_ones()).sum::<u32>(), 1);
    }

    #[test]
    fn test_6600_native_to_wire() {
        let order = BitOrder::amr_wb_io();

        // native bit 61 is the fifth bit on the wire
        let mut native = [0u8; 17];
        set_bit(&mut native, 61, true);
        let mut writer = BitWriter::new();
        order.native_to_wire(LegacyIoMode::Rate6600, &native, &mut writer);
        assert_eq!(writer.bit_len(), 132);
        assert_eq!(writer.into_bytes()[0], 0x08);
    }

    #[test]
    fn test_sid_keeps_native_order() {
        let order = BitOrder::amr_wb_io();
        let row = order.row(LegacyIoMode::Sid);
        assert!(row.iter().enumerate().all(|(i, &pos)| i == pos as usize));
    }

    #[test]
    fn test_rejects_wrong_length() {
        let mut rows = reversed_rows();
        rows[LegacyIoMode::Rate6600.index() as usize].pop();
        let err = BitOrder::new(rows).unwrap_err();
        assert!(matches!(err, EvsError::InvalidBitOrder { .. }));
    }

    #[test]
    fn test_rejects_repeated_position() {
        let mut rows = reversed_rows();
        rows[LegacyIoMode::Sid.index() as usize][0] = 1;
        assert!(BitOrder::new(rows).is_err());
    }

    #[test]
    fn test_reversed_order_round_trip() {
        let order = BitOrder::new(reversed_rows()).unwrap();
        let mode = LegacyIoMode::Sid;

        // 35 bits: first bit set, rest clear
        let wire = [0x80, 0x00, 0x00, 0x00, 0x00];
        let native = order.wire_to_native(mode, &mut BitReader::new(&wire));
        assert_eq!(native.len(), 5);
        assert!(get_bit(&native, 34));
        assert!(!get_bit(&native, 0));

        let mut writer = BitWriter::new();
        order.native_to_wire(mode, &native, &mut writer);
        assert_eq!(writer.bit_len(), 35);
        assert_eq!(writer.into_bytes(), wire.to_vec());
    }
}
