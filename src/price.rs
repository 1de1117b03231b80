//! Oracle publisher tables and royalty pricing arithmetic
//!
//! Royalties may be denominated in a foreign currency and converted to
//! satoshis at transfer time using a caller-supplied rate snapshot. The two
//! well-known oracle publishers and their ticker slots are fixed protocol
//! constants; fetching and decoding the published rates is an external
//! concern.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Satoshis per whole coin
pub const SATS_PER_COIN: u64 = 100_000_000;

/// Publisher of fiat exchange rates
pub const FIAT_ORACLE_ADDRESS: &str = "dgb1qunxh378eltj2jrwza5sj9grvu5xud43vqvudwh";

/// Ticker slots of the fiat oracle, in published order
pub const FIAT_TICKERS: &[&str] = &[
    "CAD", "USD", "EUR", "GBP", "AUD", "JPY", "CNY", "TRY", "BRL", "CHF",
];

/// Publisher of crypto exchange rates
pub const CRYPTO_ORACLE_ADDRESS: &str = "dgb1qlk3hldeynl3prqw259u8gv0jh7w5nwppxlvt3v";

/// Ticker slots of the crypto oracle, in published order
pub const CRYPTO_TICKERS: &[&str] = &[
    "BTC", "ETH", "LTC", "DCR", "ZIL", "RVN", "XVG", "RDD", "NXS", "POT",
];

/// Offset added to a fiat ticker index in the royalty rule block
pub const FIAT_INDEX_OFFSET: u8 = 128;

/// Offset added to a crypto ticker index (second oracle table)
pub const CRYPTO_INDEX_OFFSET: u8 = 138;

/// Royalty pricing currency: an oracle publisher address plus the index of
/// the ticker within that publisher's rate vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub address: String,
    pub index: u8,
    pub name: String,
}

impl Currency {
    /// True when the currency resolves to one of the two fixed publishers
    pub fn is_known_publisher(&self) -> bool {
        self.address == FIAT_ORACLE_ADDRESS || self.address == CRYPTO_ORACLE_ADDRESS
    }

    /// 8-bit oracle-index byte emitted in the royalty rule block
    pub fn wire_index(&self) -> u8 {
        if self.address == CRYPTO_ORACLE_ADDRESS {
            self.index + CRYPTO_INDEX_OFFSET
        } else {
            self.index + FIAT_INDEX_OFFSET
        }
    }
}

/// Resolve a ticker against the fixed publisher tables
pub fn resolve_ticker(ticker: &str) -> Option<Currency> {
    let ticker = ticker.to_uppercase();
    if let Some(index) = FIAT_TICKERS.iter().position(|&t| t == ticker) {
        return Some(Currency {
            address: FIAT_ORACLE_ADDRESS.to_string(),
            index: index as u8,
            name: ticker,
        });
    }
    if let Some(index) = CRYPTO_TICKERS.iter().position(|&t| t == ticker) {
        return Some(Currency {
            address: CRYPTO_ORACLE_ADDRESS.to_string(),
            index: index as u8,
            name: ticker,
        });
    }
    None
}

/// Point-in-time exchange rates: currency name to satoshis per currency unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSnapshot {
    rates: HashMap<String, u64>,
}

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, name: &str, satoshis_per_unit: u64) -> Self {
        self.rates.insert(name.to_uppercase(), satoshis_per_unit);
        self
    }

    pub fn rate(&self, name: &str) -> Option<u64> {
        self.rates.get(&name.to_uppercase()).copied()
    }
}

/// Convert a priced royalty into satoshis, rounding up
///
/// Every intermediate rounding is a ceiling so a royalty is always
/// over-collected, never under-collected.
pub fn royalty_satoshis(amount: u64, rate_satoshis: u64) -> u64 {
    let product = amount as u128 * rate_satoshis as u128;
    product.div_ceil(SATS_PER_COIN as u128) as u64
}
