//! Asset rule sets
//!
//! A rule set is frozen by the caller before it is handed to an encoder.
//! Mutators enforce the rule-combination invariants immediately rather than
//! deferring everything to build time, so a caller learns about a disallowed
//! combination at the call that introduces it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AssetError, AssetResult};
use crate::price::{self, Currency};

/// Holder-screening requirement attached to an asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kyc {
    #[default]
    None,
    /// Any verified identity may hold the asset
    Required,
    /// Only holders verified in one of the listed countries
    AllowList(Vec<String>),
    /// Verified holders except those in the listed countries
    BanList(Vec<String>),
}

/// Voting window; an expiry is a vote with no options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRule {
    pub options: Vec<String>,
    /// Whether the asset may still move to non-ballot addresses
    pub movable: bool,
    /// Block height, or milliseconds since the epoch when at or above
    /// [`CUTOFF_TIME_FLOOR`]
    pub cutoff: u64,
}

/// Cutoff scalars at or above this are wall-clock milliseconds; below it they
/// are block heights
pub const CUTOFF_TIME_FLOOR: u64 = 1_577_836_800_000;

/// 7-bit option-count field
pub const MAX_VOTE_OPTIONS: usize = 127;

/// Fixed ballot addresses, one per vote option slot
pub const VOTE_ADDRESSES: &[&str] = &[
    "D8LWk1fGksGDxZai17A5wQUVsRiV69Nk7J",
    "DBJNvWeirccgeAdZn9gV5otheutdthzWxx",
    "D9zaWjGHuVNB32G7Pf5BMmtvDifdoS3Wsq",
    "DEKQEMFHTc1M8Gs4xvY6paZ5RKtE1cbqNp",
    "D8jnQigMYwhrB6Zjs73deF5RKprUdX5uvd",
    "DELKWiuSj86pMfDb7aDaAUhLYG8D7H6JVj",
    "DHUg85Pbc6mDK3y7kaWmsqjRaWfRVGys2U",
    "D9rxXUhaDxku4ZhdkLtyZzmmGG5ViUAYds",
    "DNehqnpzLWnv7vTTxkbHsneajBEzGjvLo2",
    "DAKiRnvVCfD4imp5A41tCeoZkezzkPXB4C",
    "D69jwFMuawBkG1hii1muQESFrbZFenZrmL",
    "D7PJqwFSLmCURDNnd5cc9Ham856GwDQ9zy",
    "DFHa9HQ9BDHuDKmBPvPzBE5dsLm85prUd4",
    "DAJMr7m4ZyaCRa9Y1o8pMaAPViBhSZTENs",
    "DFXqwRzai3Khd3n1uRaYgZTq1BhAUhyu3m",
    "DSTKiCYQqpvrXME3rEFeYEsH3dZHCPU8ez",
    "DG1rJMg6zCMoiptWeEozxpuVWKGmZkiHTf",
    "DRgWqHV6d7HSxYhA5bCMvtLhuS3kbRYKo3",
    "DD9kssWTzT8s5fv4Xg3MthRNCT7RtawQSw",
    "DLLYN7hv535nXzpvZv25ySG8GdsfYNk1Bx",
    "DJQEaiT39GyJgCJK7noarscutoeWHXMLaM",
    "DEkaR4NfvWx3bq1MBw2nTcTP2JEPxKyaBX",
    "DN9vVGNYzbjqTGRRGXkjiGVTpuKRz1eYe3",
    "D6kCF8PDhwdPzSg3xeUmrDzVK9eK3nuEJj",
    "DR3F3WE78aJmHvyGA35NjkLLf5F9X8eKaz",
    "DSMdwgWYbEpPNQJ2Hs9Y89JqNmQdiwhWaq",
    "DGJCxLgqW2sbhomNZvsDGsjam8pnY2b7uA",
    "DAaQuGSbvRQA2B7zzbrQ3SRRYC9qaQVZch",
    "DJbcjvGf7wzQaAQQ9GpHP1menk6jHyCsW4",
    "DC5vxafEZQeqpqDawTyDx7nBW81V6LfrE5",
    "DKJhzwe5PzFQuUdrzJR9gUfkvk4jzvUrZU",
    "DRX7r83LHBf1cWKnBoAd8q1iN6UP833kPx",
    "DShw4ZaRmW9fyWnP3umEyZ9KyJHWR9v6BD",
    "DK9zdFCv9yz3C7jVbnTbVCZgGAd8S1Xqxk",
    "DG2Gv2aZRALtMkKtaJEQr75bFqsL3JbKmB",
    "D9zt7Xb1RgBepPrrYSRPv6N6YCUcS5CRx6",
    "DAgRoBgYaDx7g6JPRZyufvFQAQc4zdjaP1",
    "DPLi14JkyEjkbWQMQGavBARN8xo4avmuMh",
    "DU4mqG99gi77BcZoS8FaJEiHk5HRYXNEcb",
    "D6QdquB54saxViwAfL9xKiwoXaFo7UU5ec",
    "DStTMUY2U1XSLsdq9uuWgfQefPDkQJkGQC",
    "DPUV7Htc7jBwhc9z5rqoDFmKW3y1fE8xwA",
    "DEGatQLqYCD9BumaXAqTFRCYZ4vznhQXcY",
    "DCL7fkgzSSQSLvDMXqiRdnR9qQx5MjK89t",
    "DNxc93Q2rrCm92sVyrtKhCn5MMC5YtuXxK",
    "DDtWWXHe9a4EPn2EawiTDzYjq8SEKKRS6J",
    "DNr54LSpN6iAQda1QYqykqeU7j7TyLeCcA",
    "DE6eJePsjMDrTdKoi8HAGbX6Sdwh4RGTP9",
    "D5kY1eMcDfLZWznQFSjCQMUW8DiSoxhmuy",
    "D6dSnsPqcLaVvcH1MSFRMUy5KyVbnDufiX",
];

/// Vote cutoff in any of the accepted shapes
#[derive(Debug, Clone, Copy)]
pub enum VoteCutoff {
    Height(u64),
    Millis(u64),
    Time(DateTime<Utc>),
}

impl VoteCutoff {
    fn scalar(self) -> AssetResult<u64> {
        match self {
            VoteCutoff::Height(h) => {
                if h >= CUTOFF_TIME_FLOOR {
                    return Err(AssetError::Validation(format!(
                        "cutoff height {h} collides with the timestamp range"
                    )));
                }
                Ok(h)
            }
            VoteCutoff::Millis(ms) => Ok(ms),
            VoteCutoff::Time(t) => {
                let ms = t.timestamp_millis();
                if ms < 0 {
                    return Err(AssetError::Validation(
                        "cutoff time before the epoch".to_string(),
                    ));
                }
                Ok(ms as u64)
            }
        }
    }
}

/// Policy attached to an asset at issuance
///
/// Royalty amounts are keyed by address in a sorted map so every encoder run
/// over the same rule set produces identical output order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    pub rewritable: bool,
    pub royalties: BTreeMap<String, u64>,
    /// Pricing currency shared by all royalties; `None` means native satoshis
    pub currency: Option<Currency>,
    pub kyc: Kyc,
    pub vote: Option<VoteRule>,
    pub deflate: Option<u64>,
    /// Whether `vote` was installed through the expiry sugar
    expires: bool,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no rule is active and the issuance can use the no-rules
    /// record type
    pub fn is_empty(&self) -> bool {
        !self.rewritable
            && self.royalties.is_empty()
            && self.kyc == Kyc::None
            && self.vote.is_none()
            && self.deflate.is_none()
    }

    pub fn set_rewritable(&mut self, rewritable: bool) -> AssetResult<&mut Self> {
        if rewritable && self.vote.is_some() {
            return Err(AssetError::Validation(
                "votes can not be rewritable".to_string(),
            ));
        }
        self.rewritable = rewritable;
        Ok(self)
    }

    /// Add a royalty paid in native satoshis
    pub fn add_royalties(&mut self, address: &str, satoshis: u64) -> AssetResult<&mut Self> {
        self.add_royalty_entry(address, satoshis, None)
    }

    /// Add a royalty denominated in a known oracle ticker such as `"USD"`
    pub fn add_royalties_in(
        &mut self,
        address: &str,
        amount: u64,
        ticker: &str,
    ) -> AssetResult<&mut Self> {
        if ticker.eq_ignore_ascii_case("DGB") {
            return self.add_royalty_entry(address, amount, None);
        }
        let currency = price::resolve_ticker(ticker).ok_or_else(|| {
            AssetError::Validation(format!("royalty currency not supported: {ticker}"))
        })?;
        self.add_royalty_entry(address, amount, Some(currency))
    }

    /// Add a royalty priced by a caller-supplied oracle descriptor
    pub fn add_royalties_with(
        &mut self,
        address: &str,
        amount: u64,
        currency: Currency,
    ) -> AssetResult<&mut Self> {
        self.add_royalty_entry(address, amount, Some(currency))
    }

    fn add_royalty_entry(
        &mut self,
        address: &str,
        amount: u64,
        currency: Option<Currency>,
    ) -> AssetResult<&mut Self> {
        if !crate::address::is_valid(address) {
            return Err(AssetError::Validation(format!(
                "invalid royalty address: {address}"
            )));
        }
        // One currency across all royalties; native and priced never mix
        if !self.royalties.is_empty() && self.currency != currency {
            return Err(AssetError::Validation(
                "only one royalty currency allowed".to_string(),
            ));
        }
        self.currency = currency;
        self.royalties.insert(address.to_string(), amount);
        Ok(self)
    }

    /// Require holders to be KYC-verified
    ///
    /// The KYC policy has no block in the on-chain rule bitstream; it travels
    /// with the rule set record and is enforced by the verification layer,
    /// not by the instruction itself.
    pub fn set_kyc(&mut self) -> &mut Self {
        self.kyc = Kyc::Required;
        self
    }

    /// Restrict holders to the listed countries; not serialized on chain,
    /// see [`set_kyc`](Self::set_kyc)
    pub fn set_kyc_allow(&mut self, countries: Vec<String>) -> &mut Self {
        self.kyc = Kyc::AllowList(countries);
        self
    }

    /// Exclude holders from the listed countries; not serialized on chain,
    /// see [`set_kyc`](Self::set_kyc)
    pub fn set_kyc_ban(&mut self, countries: Vec<String>) -> &mut Self {
        self.kyc = Kyc::BanList(countries);
        self
    }

    pub fn set_vote(
        &mut self,
        options: Vec<String>,
        movable: bool,
        cutoff: VoteCutoff,
    ) -> AssetResult<&mut Self> {
        if self.rewritable {
            return Err(AssetError::Validation(
                "votes can not be rewritable".to_string(),
            ));
        }
        if self.vote.is_some() {
            let reason = if self.expires {
                "can't use both vote and expires"
            } else {
                "vote already set"
            };
            return Err(AssetError::Validation(reason.to_string()));
        }
        if options.len() > MAX_VOTE_OPTIONS || options.len() > VOTE_ADDRESSES.len() {
            return Err(AssetError::Validation(format!(
                "too many vote options: {}",
                options.len()
            )));
        }
        self.vote = Some(VoteRule {
            options,
            movable,
            cutoff: cutoff.scalar()?,
        });
        Ok(self)
    }

    /// Expiry sugar: a movable vote with no options
    pub fn set_expires(&mut self, cutoff: VoteCutoff) -> AssetResult<&mut Self> {
        if self.vote.is_some() {
            return Err(AssetError::Validation(
                "can't use both vote and expires".to_string(),
            ));
        }
        if self.rewritable {
            return Err(AssetError::Validation(
                "votes can not be rewritable".to_string(),
            ));
        }
        self.vote = Some(VoteRule {
            options: Vec::new(),
            movable: true,
            cutoff: cutoff.scalar()?,
        });
        self.expires = true;
        Ok(self)
    }

    /// Burn a fixed number of units on every transfer
    pub fn set_deflate(&mut self, units: u64) -> AssetResult<&mut Self> {
        if units == 0 {
            return Err(AssetError::Validation(
                "deflation amount must be a positive number".to_string(),
            ));
        }
        self.deflate = Some(units);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::FIAT_ORACLE_ADDRESS;

    const ADDR_A: &str = "D8LWk1fGksGDxZai17A5wQUVsRiV69Nk7J";
    const ADDR_B: &str = "DBJNvWeirccgeAdZn9gV5otheutdthzWxx";

    #[test]
    fn test_empty_rule_set() {
        assert!(RuleSet::new().is_empty());
    }

    #[test]
    fn test_native_royalties() {
        let mut rules = RuleSet::new();
        rules.add_royalties(ADDR_A, 50_000).unwrap();
        rules.add_royalties(ADDR_B, 25_000).unwrap();
        assert_eq!(rules.royalties.len(), 2);
        assert!(rules.currency.is_none());
        assert!(!rules.is_empty());
    }

    #[test]
    fn test_single_currency_enforced_at_mutation() {
        let mut rules = RuleSet::new();
        rules.add_royalties_in(ADDR_A, 100, "USD").unwrap();
        assert_eq!(
            rules.currency.as_ref().unwrap().address,
            FIAT_ORACLE_ADDRESS
        );
        // A second currency, or a native royalty, is rejected immediately
        assert!(rules.add_royalties_in(ADDR_B, 100, "EUR").is_err());
        assert!(rules.add_royalties(ADDR_B, 100).is_err());
    }

    #[test]
    fn test_dgb_ticker_is_native() {
        let mut rules = RuleSet::new();
        rules.add_royalties_in(ADDR_A, 600, "dgb").unwrap();
        assert!(rules.currency.is_none());
    }

    #[test]
    fn test_unknown_ticker_rejected() {
        let mut rules = RuleSet::new();
        assert!(matches!(
            rules.add_royalties_in(ADDR_A, 100, "XYZ"),
            Err(AssetError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_royalty_address_rejected() {
        let mut rules = RuleSet::new();
        assert!(rules.add_royalties("garbage", 100).is_err());
    }

    #[test]
    fn test_vote_and_rewritable_exclusive() {
        let mut rules = RuleSet::new();
        rules.set_rewritable(true).unwrap();
        assert!(rules
            .set_vote(vec!["yes".into(), "no".into()], true, VoteCutoff::Height(1000))
            .is_err());

        let mut rules = RuleSet::new();
        rules
            .set_vote(vec!["yes".into()], true, VoteCutoff::Height(1000))
            .unwrap();
        assert!(rules.set_rewritable(true).is_err());
    }

    #[test]
    fn test_vote_and_expires_exclusive() {
        let mut rules = RuleSet::new();
        rules.set_expires(VoteCutoff::Height(500_000)).unwrap();
        assert!(rules
            .set_vote(vec!["yes".into()], true, VoteCutoff::Height(1000))
            .is_err());

        let mut rules = RuleSet::new();
        rules
            .set_vote(vec!["yes".into()], true, VoteCutoff::Height(1000))
            .unwrap();
        assert!(rules.set_expires(VoteCutoff::Height(500_000)).is_err());
    }

    #[test]
    fn test_expires_is_an_optionless_vote() {
        let mut rules = RuleSet::new();
        rules.set_expires(VoteCutoff::Height(750_000)).unwrap();
        let vote = rules.vote.as_ref().unwrap();
        assert!(vote.options.is_empty());
        assert!(vote.movable);
        assert_eq!(vote.cutoff, 750_000);
    }

    #[test]
    fn test_vote_option_limit() {
        let mut rules = RuleSet::new();
        let options: Vec<String> = (0..51).map(|i| format!("option {i}")).collect();
        assert!(rules
            .set_vote(options, true, VoteCutoff::Height(1000))
            .is_err());
    }

    #[test]
    fn test_cutoff_shapes() {
        assert!(VoteCutoff::Height(CUTOFF_TIME_FLOOR).scalar().is_err());
        assert_eq!(VoteCutoff::Millis(CUTOFF_TIME_FLOOR).scalar().unwrap(), CUTOFF_TIME_FLOOR);
        let t = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(VoteCutoff::Time(t).scalar().unwrap() >= CUTOFF_TIME_FLOOR);
    }

    #[test]
    fn test_deflate_must_be_positive() {
        let mut rules = RuleSet::new();
        assert!(rules.set_deflate(0).is_err());
        rules.set_deflate(5).unwrap();
        assert_eq!(rules.deflate, Some(5));
    }
}
