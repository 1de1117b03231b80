//! UTXO asset protocol encoders
//!
//! Library for minting and moving colored-coin assets on a UTXO chain. The
//! crate encodes the on-chain instruction formats (issuance and transfer),
//! derives asset identifiers, serializes rule sets, runs the gas/fee/change
//! economics and hands fully planned transactions to an external signing
//! engine supplied by the caller.

pub mod address;
pub mod assets;
pub mod encoding;
pub mod errors;
pub mod price;
pub mod tx;
pub mod types;

pub use assets::{IssuanceEncoder, IssuanceParams, Metadata, RuleSet, TransferEncoder};
pub use errors::{AssetError, AssetResult, CapacityError};
pub use tx::{BuildResult, SignedTransaction, TransactionSigner, TxPlan};
pub use types::Aggregation;
