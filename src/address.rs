//! Address shape validation
//!
//! The encoders never build scripts themselves (that is the signing engine's
//! job) but they refuse to plan outputs toward addresses that cannot possibly
//! be valid: legacy base58check addresses are checksum-verified, bech32
//! addresses are checked against the `dgb1` human-readable part and charset.

use bitcoin::base58;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BECH32_RE: Regex =
        Regex::new(r"^dgb1[02-9ac-hj-np-z]{6,87}$").expect("static regex compiles");
}

/// Leading version bytes of legacy pay-to-pubkey-hash and pay-to-script-hash
/// addresses on the asset chain
const BASE58_VERSIONS: &[u8] = &[0x1e, 0x3f];

/// Check whether `address` is plausibly spendable
pub fn is_valid(address: &str) -> bool {
    if BECH32_RE.is_match(address) {
        return true;
    }
    match base58::decode_check(address) {
        Ok(payload) => payload.len() == 21 && BASE58_VERSIONS.contains(&payload[0]),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_addresses_validate() {
        assert!(is_valid("D8LWk1fGksGDxZai17A5wQUVsRiV69Nk7J"));
        assert!(is_valid("DBJNvWeirccgeAdZn9gV5otheutdthzWxx"));
    }

    #[test]
    fn test_bech32_addresses_validate() {
        assert!(is_valid("dgb1qunxh378eltj2jrwza5sj9grvu5xud43vqvudwh"));
        assert!(is_valid("dgb1qjnzadu643tsfzjqjydnh06s9lgzp3m4sg3j68x"));
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        // Last character flipped
        assert!(!is_valid("D8LWk1fGksGDxZai17A5wQUVsRiV69Nk7K"));
    }

    #[test]
    fn test_foreign_prefixes_rejected() {
        assert!(!is_valid("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"));
        assert!(!is_valid("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
        assert!(!is_valid(""));
        assert!(!is_valid("not an address"));
    }

    #[test]
    fn test_bech32_mixed_case_rejected() {
        assert!(!is_valid("DGB1QUNXH378ELTJ2JRWZA5SJ9GRVU5XUD43VQVUDWH"));
    }
}
