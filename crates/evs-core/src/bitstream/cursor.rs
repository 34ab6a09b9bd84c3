//! MSB-first bit cursors over packed payload bytes

/// Read one bit at an absolute position, MSB first
///
/// Positions past the end of `data` read as zero.
pub fn get_bit(data: &[u8], pos: usize) -> bool {
    let byte_idx = pos / 8;
    let bit_idx = 7 - (pos % 8);

    data.get(byte_idx)
        .map_or(false, |byte| (byte >> bit_idx) & 1 == 1)
}

/// Write one bit at an absolute position, MSB first
///
/// Positions past the end of `data` are ignored.
pub fn set_bit(data: &mut [u8], pos: usize, bit: bool) {
    let byte_idx = pos / 8;
    let bit_idx = 7 - (pos % 8);

    if let Some(byte) = data.get_mut(byte_idx) {
        if bit {
            *byte |= 1 << bit_idx;
        } else {
            *byte &= !(1 << bit_idx);
        }
    }
}

/// Bytes needed to hold `bits` bits
pub fn bytes_for_bits(bits: usize) -> usize {
    (bits + 7) / 8
}

/// Sequential reader yielding one bit at a time
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Start reading at the first bit of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Next bit, MSB first; zero once the data is exhausted
    pub fn next_bit(&mut self) -> bool {
        let bit = get_bit(self.data, self.pos);
        self.pos += 1;
        bit
    }

    /// Next `num_bits` bits as an unsigned value, first bit most significant
    pub fn read_bits(&mut self, num_bits: usize) -> u32 {
        let mut value = 0u32;

        for _ in 0..num_bits {
            value = (value << 1) | u32::from(self.next_bit());
        }

        value
    }

    /// Bits consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bits left before the data is exhausted
    pub fn remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.pos)
    }
}

/// Sequential writer that grows its buffer as bits are pushed
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    pos: usize,
}

impl BitWriter {
    /// Empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty writer with room for `bits` bits
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes_for_bits(bits)),
            pos: 0,
        }
    }

    /// Append one bit
    pub fn push_bit(&mut self, bit: bool) {
        if self.pos % 8 == 0 {
            self.data.push(0);
        }
        set_bit(&mut self.data, self.pos, bit);
        self.pos += 1;
    }

    /// Append the low `num_bits` bits of `value`, most significant first
    pub fn push_bits(&mut self, value: u32, num_bits: usize) {
        for i in 0..num_bits {
            self.push_bit((value >> (num_bits - 1 - i)) & 1 == 1);
        }
    }

    /// Bits written so far
    pub fn bit_len(&self) -> usize {
        self.pos
    }

    /// Packed bytes, last byte zero-padded
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
