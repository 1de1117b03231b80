//! Append-only bit buffer
//!
//! All instruction payloads are assembled through this buffer. Bits are
//! accumulated in order and packed 8 per byte, most-significant-bit first,
//! when the stream is finalized. Finalization left-pads with zero bits, so a
//! stream that is not byte-aligned keeps its trailing fields intact.

use crate::errors::{AssetError, AssetResult, CapacityError};

use super::precision;

/// Ordered, append-only sequence of bits
#[derive(Debug, Clone, Default)]
pub struct BitStream {
    bits: Vec<bool>,
}

impl BitStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits accumulated so far
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Packed size in bytes after finalization
    pub fn byte_len(&self) -> usize {
        self.bits.len().div_ceil(8)
    }

    /// Append a literal binary string such as `"101"`
    pub fn add_bits(&mut self, bits: &str) -> AssetResult<&mut Self> {
        for c in bits.chars() {
            match c {
                '0' => self.bits.push(false),
                '1' => self.bits.push(true),
                _ => {
                    return Err(AssetError::Validation(format!(
                        "invalid binary string: {bits}"
                    )))
                }
            }
        }
        Ok(self)
    }

    /// Append a hex string, four bits per nibble
    pub fn add_hex(&mut self, hex: &str) -> AssetResult<&mut Self> {
        for c in hex.chars() {
            let nibble = c
                .to_digit(16)
                .ok_or_else(|| AssetError::Validation(format!("invalid hex string: {hex}")))?;
            self.push_value(nibble as u64, 4);
        }
        Ok(self)
    }

    /// Append whole bytes
    pub fn add_buffer(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.push_value(b as u64, 8);
        }
        self
    }

    /// Append `value` as a big-endian fixed-width field, width 1..=64
    pub fn add_integer(&mut self, value: u64, width: u32) -> AssetResult<&mut Self> {
        if width > 64 || (width < 64 && value >= 1u64 << width) {
            return Err(CapacityError::FieldOverflow { value, width }.into());
        }
        self.push_value(value, width);
        Ok(self)
    }

    /// Append `value` in the variable-length precision encoding
    pub fn add_precision(&mut self, value: u64) -> AssetResult<&mut Self> {
        precision::encode_into(self, value)?;
        Ok(self)
    }

    fn push_value(&mut self, value: u64, width: u32) {
        for i in (0..width).rev() {
            self.bits.push(value >> i & 1 == 1);
        }
    }

    /// Left-pad with zero bits to the next byte boundary, then pack
    pub fn to_buffer(&self) -> Vec<u8> {
        let missing = (8 - self.bits.len() % 8) % 8;
        let mut packed = vec![0u8; (self.bits.len() + missing) / 8];
        for (i, &bit) in self.bits.iter().enumerate() {
            if bit {
                let pos = i + missing;
                packed[pos / 8] |= 0x80 >> (pos % 8);
            }
        }
        packed
    }
}
