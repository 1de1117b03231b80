//! Variable-length, exponent-compressed integer encoding
//!
//! On-chain quantities are large, round numbers far more often than not, so
//! the format factors trailing decimal zeros into a small exponent and stores
//! `mantissa * 10^exponent` in the smallest of seven tagged layouts (1 to 7
//! bytes). This is a domain-specific compressed-decimal format, not IEEE
//! floating point: every encoded value reconstructs exactly.
//!
//! Layouts, selected by mantissa magnitude:
//!
//! | tag   | mantissa bits | exponent bits | total |
//! |-------|---------------|---------------|-------|
//! | `000` | 5 (raw byte)  | -             | 1B    |
//! | `001` | 9             | 4             | 2B    |
//! | `010` | 17            | 4             | 3B    |
//! | `011` | 25            | 4             | 4B    |
//! | `100` | 34            | 3             | 5B    |
//! | `101` | 42            | 3             | 6B    |
//! | `11`  | 54            | -             | 7B    |

use crate::errors::{AssetError, AssetResult, CapacityError};

use super::bitstream::BitStream;

/// Largest encodable value, 2^54 - 1
pub const MAX_VALUE: u64 = (1 << 54) - 1;

const MAX_MANTISSA_42: u64 = (1 << 42) - 1;
const MAX_MANTISSA_34: u64 = (1 << 34) - 1;
const MAX_MANTISSA_25: u64 = (1 << 25) - 1;
const MAX_MANTISSA_17: u64 = (1 << 17) - 1;
const MAX_MANTISSA_9: u64 = (1 << 9) - 1;

/// Append `value` to `stream` in the smallest viable layout
pub fn encode_into(stream: &mut BitStream, value: u64) -> AssetResult<()> {
    if value > MAX_VALUE {
        return Err(CapacityError::PrecisionRange(value).into());
    }

    // Small values skip compression entirely
    if value < 32 {
        stream.add_integer(value, 8)?;
        return Ok(());
    }

    let mut mantissa = value;
    let mut exponent: u32 = 0;
    while mantissa % 10 == 0 {
        mantissa /= 10;
        exponent += 1;
    }

    if mantissa > MAX_MANTISSA_42 {
        // No layout with an exponent field can hold this mantissa
        mantissa = value;
        exponent = 0;
    } else if mantissa > MAX_MANTISSA_25 && exponent > 7 {
        // 3-bit exponent field caps at 7
        mantissa *= 10u64.pow(exponent - 7);
        exponent = 7;
    } else if exponent > 15 {
        // 4-bit exponent field caps at 15
        mantissa *= 10u64.pow(exponent - 15);
        exponent = 15;
    }

    if mantissa > MAX_MANTISSA_42 {
        stream.add_bits("11")?;
        stream.add_integer(mantissa, 54)?;
    } else if mantissa > MAX_MANTISSA_34 {
        stream.add_bits("101")?;
        stream.add_integer(mantissa, 42)?;
        stream.add_integer(exponent as u64, 3)?;
    } else if mantissa > MAX_MANTISSA_25 {
        stream.add_bits("100")?;
        stream.add_integer(mantissa, 34)?;
        stream.add_integer(exponent as u64, 3)?;
    } else if mantissa > MAX_MANTISSA_17 {
        stream.add_bits("011")?;
        stream.add_integer(mantissa, 25)?;
        stream.add_integer(exponent as u64, 4)?;
    } else if mantissa > MAX_MANTISSA_9 {
        stream.add_bits("010")?;
        stream.add_integer(mantissa, 17)?;
        stream.add_integer(exponent as u64, 4)?;
    } else {
        stream.add_bits("001")?;
        stream.add_integer(mantissa, 9)?;
        stream.add_integer(exponent as u64, 4)?;
    }
    Ok(())
}

/// Read one precision-encoded value from the front of `bytes`
///
/// Returns the reconstructed value and the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> AssetResult<(u64, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| AssetError::Validation("empty precision field".to_string()))?;

    let (consumed, mantissa_bits, exp_bits) = if first >> 6 == 0b11 {
        (7usize, 54u32, 0u32)
    } else if first >> 5 == 0b101 {
        (6, 42, 3)
    } else if first >> 5 == 0b100 {
        (5, 34, 3)
    } else if first >> 5 == 0b011 {
        (4, 25, 4)
    } else if first >> 5 == 0b010 {
        (3, 17, 4)
    } else if first >> 5 == 0b001 {
        (2, 9, 4)
    } else {
        (1, 8, 0)
    };

    if bytes.len() < consumed {
        return Err(AssetError::Validation(format!(
            "truncated precision field: need {consumed} bytes, have {}",
            bytes.len()
        )));
    }

    let mut raw: u64 = 0;
    for &b in &bytes[..consumed] {
        raw = raw << 8 | b as u64;
    }

    let mantissa = raw >> exp_bits & ((1u64 << mantissa_bits) - 1);
    let exponent = (raw & ((1u64 << exp_bits) - 1)) as u32;

    let value = 10u64
        .checked_pow(exponent)
        .and_then(|scale| mantissa.checked_mul(scale))
        .filter(|&v| v <= MAX_VALUE)
        .ok_or(CapacityError::PrecisionRange(mantissa))?;

    Ok((value, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> AssetResult<Vec<u8>> {
        let mut stream = BitStream::new();
        encode_into(&mut stream, value)?;
        Ok(stream.to_buffer())
    }

    fn roundtrip(value: u64) -> (u64, usize) {
        let bytes = encode(value).unwrap();
        decode(&bytes).unwrap()
    }

    #[test]
    fn test_small_values_take_one_byte() {
        for v in [0u64, 1, 5, 31] {
            let bytes = encode(v).unwrap();
            assert_eq!(bytes.len(), 1, "value {v}");
            assert_eq!(decode(&bytes).unwrap(), (v, 1));
        }
    }

    #[test]
    fn test_31_is_exactly_one_byte() {
        assert_eq!(encode(31).unwrap(), vec![0x1f]);
    }

    #[test]
    fn test_round_amounts_compress() {
        // 1000 -> mantissa 1, exponent 3 -> 2 bytes: 001 000000001 0011
        let bytes = encode(1000).unwrap();
        assert_eq!(bytes, vec![0x20, 0x13]);
        assert_eq!(decode(&bytes).unwrap(), (1000, 2));
    }

    #[test]
    fn test_roundtrip_across_all_widths() {
        let cases = [
            32u64,
            511,
            512,
            131_071,
            131_072,
            1_000_000,
            33_554_431,
            33_554_432,
            17_179_869_183,
            17_179_869_184,
            4_398_046_511_103,
            4_398_046_511_104,
            987_654_321_012_345,
            MAX_VALUE,
        ];
        for v in cases {
            let (decoded, _) = roundtrip(v);
            assert_eq!(decoded, v, "value {v}");
        }
    }

    #[test]
    fn test_roundtrip_round_magnitudes() {
        let mut v = 1u64;
        while v <= 10_000_000_000_000_000 {
            if v >= 32 {
                let (decoded, _) = roundtrip(v);
                assert_eq!(decoded, v, "value {v}");
            }
            v *= 10;
        }
    }

    #[test]
    fn test_exponent_cap_for_large_round_mantissas() {
        // 33554432 * 10^8: mantissa exceeds 25 bits so the exponent caps at 7
        let v = 3_355_443_200_000_000;
        let (decoded, consumed) = roundtrip(v);
        assert_eq!(decoded, v);
        assert!(consumed <= 6);
    }

    #[test]
    fn test_max_value_rejected_past_range() {
        assert!(encode(MAX_VALUE).is_ok());
        assert!(matches!(
            encode(MAX_VALUE + 1),
            Err(AssetError::Capacity(CapacityError::PrecisionRange(_)))
        ));
        assert_eq!(MAX_VALUE, 18_014_398_509_481_983);
    }

    #[test]
    fn test_decode_truncated_field() {
        let bytes = encode(1000).unwrap();
        assert!(decode(&bytes[..1]).is_err());
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode(&[]).is_err());
    }
}
