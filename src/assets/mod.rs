//! Asset protocol: identifiers, rules, metadata and the two encoders

pub mod asset_id;
pub mod encoder;
pub mod grammar;
pub mod issuance;
pub mod metadata;
pub mod rules;
pub mod transfer;

pub use asset_id::{derive_asset_id, is_asset_id, ContentRef};
pub use issuance::{IssuanceEncoder, IssuanceParams};
pub use metadata::Metadata;
pub use rules::{Kyc, RuleSet, VoteCutoff};
pub use transfer::TransferEncoder;
