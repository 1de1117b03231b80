//! Rule bitstream grammar
//!
//! Rules are serialized as a sequence of 4-bit tagged feature blocks
//! terminated by tag `0xF`, then padded with 1-bits to the next byte
//! boundary. Padding with ones keeps trailing padding distinguishable from a
//! zero-valued field, and readers can skip unknown future tags up to the
//! terminator.

use crate::encoding::BitStream;
use crate::errors::{AssetError, AssetResult};
use crate::types::Aggregation;

use super::rules::{RuleSet, MAX_VOTE_OPTIONS, VOTE_ADDRESSES};

const TAG_ROYALTIES: &str = "1";
const TAG_ROYALTIES_PRICED: &str = "9";
const TAG_VOTE: &str = "4";
const TAG_DEFLATE: &str = "5";
const TAG_END: &str = "f";

/// Serialize the rule blocks of an issuance
///
/// `output_count` is the number of asset-bearing outputs in the instruction's
/// sorted order; an injected oracle-payment output is not counted.
pub fn encode_rules(
    rules: &RuleSet,
    aggregation: Aggregation,
    output_count: usize,
) -> AssetResult<BitStream> {
    let mut bits = BitStream::new();

    if !rules.royalties.is_empty() {
        match &rules.currency {
            None => {
                bits.add_hex(TAG_ROYALTIES)?;
            }
            Some(currency) => {
                bits.add_hex(TAG_ROYALTIES_PRICED)?;
                bits.add_integer(currency.wire_index() as u64, 8)?;
            }
        }
        bits.add_precision(output_count as u64)?;
        bits.add_precision(rules.royalties.len() as u64)?;
    }

    if let Some(vote) = &rules.vote {
        if rules.rewritable {
            return Err(AssetError::Validation(
                "votes can not be rewritable".to_string(),
            ));
        }
        if vote.options.len() > MAX_VOTE_OPTIONS || vote.options.len() > VOTE_ADDRESSES.len() {
            return Err(AssetError::Validation(format!(
                "too many vote options: {}",
                vote.options.len()
            )));
        }
        bits.add_hex(TAG_VOTE)?;
        bits.add_bits(if vote.movable { "1" } else { "0" })?;
        bits.add_integer(vote.options.len() as u64, 7)?;
        bits.add_precision(vote.cutoff)?;
        // Reserved trailer
        bits.add_precision(0)?;
    }

    if let Some(units) = rules.deflate {
        if aggregation != Aggregation::Aggregable {
            return Err(AssetError::Validation(
                "deflationary assets must be aggregable".to_string(),
            ));
        }
        if units == 0 {
            return Err(AssetError::Validation(
                "deflation amount must be a positive number".to_string(),
            ));
        }
        bits.add_hex(TAG_DEFLATE)?;
        bits.add_precision(units)?;
    }

    bits.add_hex(TAG_END)?;
    while bits.len() % 8 != 0 {
        bits.add_bits("1")?;
    }

    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::rules::VoteCutoff;

    const ADDR_A: &str = "D8LWk1fGksGDxZai17A5wQUVsRiV69Nk7J";
    const ADDR_B: &str = "DBJNvWeirccgeAdZn9gV5otheutdthzWxx";

    #[test]
    fn test_empty_rules_encode_to_terminator_only() {
        let bits = encode_rules(&RuleSet::new(), Aggregation::Aggregable, 2).unwrap();
        // tag F then four 1-bits of padding
        assert_eq!(bits.to_buffer(), vec![0xff]);
    }

    #[test]
    fn test_native_royalty_block() {
        let mut rules = RuleSet::new();
        rules.add_royalties(ADDR_A, 50_000).unwrap();
        rules.add_royalties(ADDR_B, 25_000).unwrap();
        let bits = encode_rules(&rules, Aggregation::Aggregable, 2).unwrap();
        // tag 1, precision(2), precision(2), tag F: 24 bits, no padding
        assert_eq!(bits.to_buffer(), vec![0x10, 0x20, 0x2f]);
    }

    #[test]
    fn test_priced_royalty_block_carries_index_byte() {
        let mut rules = RuleSet::new();
        rules.add_royalties_in(ADDR_A, 100, "USD").unwrap();
        let bits = encode_rules(&rules, Aggregation::Aggregable, 3).unwrap();
        // tag 9, index 1+128, precision(3), precision(1), tag F: 32 bits
        assert_eq!(bits.to_buffer(), vec![0x98, 0x10, 0x30, 0x1f]);
    }

    #[test]
    fn test_crypto_table_uses_second_offset() {
        let mut rules = RuleSet::new();
        rules.add_royalties_in(ADDR_A, 100, "ETH").unwrap();
        let bits = encode_rules(&rules, Aggregation::Aggregable, 1).unwrap();
        // index byte is 1 + 138 = 139 = 0x8b
        assert_eq!(bits.to_buffer()[0..2], [0x98, 0xb0]);
    }

    #[test]
    fn test_vote_block() {
        let mut rules = RuleSet::new();
        rules
            .set_vote(
                vec!["yes".into(), "no".into()],
                true,
                VoteCutoff::Height(500_000),
            )
            .unwrap();
        let bits = encode_rules(&rules, Aggregation::Aggregable, 1).unwrap();
        let packed = bits.to_buffer();
        // tag 4 (0100), movable bit 1, then the top of the 7-bit count
        assert_eq!(packed[0], 0x48);
        // 500000 compresses to mantissa 5, exponent 5 in the 2-byte layout
        assert_eq!(packed.len(), 5);
    }

    #[test]
    fn test_deflate_block_requires_aggregable() {
        let mut rules = RuleSet::new();
        rules.set_deflate(10).unwrap();
        assert!(encode_rules(&rules, Aggregation::Dispersed, 1).is_err());
        assert!(encode_rules(&rules, Aggregation::Hybrid, 1).is_err());
        let bits = encode_rules(&rules, Aggregation::Aggregable, 1).unwrap();
        // tag 5, precision(10) raw byte, tag F: 16 bits
        assert_eq!(bits.to_buffer(), vec![0x50, 0xaf]);
    }

    #[test]
    fn test_padding_is_ones() {
        // Royalty block plus deflate block lands at 36 bits, forcing padding
        let mut rules = RuleSet::new();
        rules.add_royalties(ADDR_A, 1).unwrap();
        rules.set_deflate(10).unwrap();
        let bits = encode_rules(&rules, Aggregation::Aggregable, 1).unwrap();
        assert_eq!(bits.len() % 8, 0);
        let packed = bits.to_buffer();
        // terminator nibble then four 1-bits of padding
        assert_eq!(packed[packed.len() - 1], 0xff);
    }
}
