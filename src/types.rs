//! Core types shared across the encoding pipeline
//!
//! Fundamental value types used throughout the asset protocol: UTXOs, asset
//! references, output intents and the protocol-wide monetary constants.

use serde::{Deserialize, Serialize};

/// Satoshis attached to every asset-bearing output
pub const DUST_SATOSHIS: u64 = 600;

/// Gas surplus below this is folded into the fee instead of producing a
/// change output
pub const UNECONOMICAL_CHANGE: u64 = 1000;

/// Hard ceiling for the packed instruction embedded in a data output
pub const MAX_INSTRUCTION_BYTES: usize = 80;

/// Highest addressable asset output; index 31 is reserved for the burn entry
pub const MAX_ASSET_OUTPUTS: usize = 31;

/// Aggregation policy baked into an asset at issuance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    /// Units of the asset merge freely across UTXOs
    Aggregable,
    /// Units merge only when they share a metadata reference
    Hybrid,
    /// Every unit is tracked individually; outputs must carry exactly one
    Dispersed,
}

impl Aggregation {
    /// Two-bit wire representation used in the issuance-flags byte
    pub fn flag_bits(self) -> u8 {
        match self {
            Aggregation::Aggregable => 0,
            Aggregation::Hybrid => 1,
            Aggregation::Dispersed => 2,
        }
    }
}

/// Asset payload carried by an asset-bearing UTXO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub asset_id: String,
    /// Content reference of the descriptive metadata document
    pub metadata: String,
    /// Divisible asset units held by the output
    pub amount: u64,
}

/// Unspent output consumed or produced by an encoder
///
/// A gas UTXO carries no asset payload and is spent only for fees and dust.
/// An asset UTXO additionally carries an [`AssetRef`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub satoshis: u64,
    pub address: String,
    /// Hex-encoded output script, required to derive unlocked asset ids
    pub script: Option<String>,
    pub asset: Option<AssetRef>,
}

impl Utxo {
    /// Unique "txid:vout" key for this output
    pub fn outpoint(&self) -> String {
        format!("{}:{}", self.txid, self.vout)
    }

    pub fn is_asset(&self) -> bool {
        self.asset.is_some()
    }
}

/// Caller-requested asset-bearing output: `amount` is in asset units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputIntent {
    pub address: String,
    pub amount: u64,
}

/// Plain satoshi payment (royalty, storage fee, oracle dust)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub address: String,
    pub satoshis: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utxo_outpoint() {
        let utxo = Utxo {
            txid: "abc123".to_string(),
            vout: 5,
            satoshis: 1000,
            address: "D8LWk1fGksGDxZai17A5wQUVsRiV69Nk7J".to_string(),
            script: None,
            asset: None,
        };
        assert_eq!(utxo.outpoint(), "abc123:5");
        assert!(!utxo.is_asset());
    }

    #[test]
    fn test_asset_utxo_detection() {
        let utxo = Utxo {
            txid: "abc123".to_string(),
            vout: 0,
            satoshis: DUST_SATOSHIS,
            address: "D8LWk1fGksGDxZai17A5wQUVsRiV69Nk7J".to_string(),
            script: None,
            asset: Some(AssetRef {
                asset_id: "Ua".to_string() + &"1".repeat(36),
                metadata: "meta".to_string(),
                amount: 42,
            }),
        };
        assert!(utxo.is_asset());
    }

    #[test]
    fn test_aggregation_flag_bits() {
        assert_eq!(Aggregation::Aggregable.flag_bits(), 0);
        assert_eq!(Aggregation::Hybrid.flag_bits(), 1);
        assert_eq!(Aggregation::Dispersed.flag_bits(), 2);
    }
}
