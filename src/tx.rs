//! Contract with the external signing and serialization engine
//!
//! The core never touches keys or scripts directly. It assembles a complete
//! [`TxPlan`] and hands it to a [`TransactionSigner`]; whatever that engine
//! returns is passed through untouched, and its failures are propagated to
//! the caller uninterpreted.

use serde::{Deserialize, Serialize};

use crate::types::{Payment, Utxo};

/// Fully planned transaction handed to the signing engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxPlan {
    pub inputs: Vec<Utxo>,
    /// Spendable outputs in final order; asset-bearing dust first
    pub outputs: Vec<Payment>,
    /// Instruction bytes carried in a zero-value data output
    pub data: Vec<u8>,
    /// Requested change output, absent when the surplus folded into the fee
    pub change: Option<Payment>,
    pub fee: u64,
}

/// Signed, serialized transaction returned by the engine
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub txid: String,
    pub raw: Vec<u8>,
}

/// External signing and serialization engine
pub trait TransactionSigner {
    /// Sign and serialize `plan` with `keys`. Errors are opaque to the core.
    fn sign_transaction(&self, plan: &TxPlan, keys: &[String]) -> Result<SignedTransaction, String>;
}

/// Outcome of a successful encoder build
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub txid: String,
    /// Serialized size in bytes
    pub size: usize,
    pub fee: u64,
    pub raw: Vec<u8>,
    /// UTXOs consumed by the transaction
    pub inputs: Vec<Utxo>,
    /// UTXOs produced by the transaction; asset outputs carry their tag
    pub outputs: Vec<Utxo>,
}
