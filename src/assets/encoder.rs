//! Accumulation state shared by the issuance and transfer encoders
//!
//! Both encoders collect the same kinds of material - gas UTXOs, asset
//! output intents, royalty payments, an optional storage fee, a gas-change
//! address and signing keys - and run the same fee/change arithmetic over
//! it. The state lives in a plain composed struct; the encoders own one each
//! rather than inheriting from a mutable base.

use tracing::debug;

use crate::errors::{AssetError, AssetResult};
use crate::types::{OutputIntent, Payment, Utxo, DUST_SATOSHIS, UNECONOMICAL_CHANGE};

/// Fee and change decision produced by gas accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPlan {
    pub fee: u64,
    /// Change satoshis worth paying out; `None` when the surplus folded into
    /// the fee
    pub change: Option<u64>,
}

/// Size estimate used for fee planning, not exact serialization
pub trait SizeEstimate {
    /// Planning estimate of the signed transaction size in bytes
    fn estimated_size(&self) -> u64;
}

/// Builder state shared by both encoders
#[derive(Debug, Default)]
pub struct EncoderCore {
    pub gas: Vec<Utxo>,
    pub outputs: Vec<OutputIntent>,
    pub royalties: Vec<Payment>,
    pub storage: Option<Payment>,
    pub gas_change: Option<String>,
    pub keys: Option<Vec<String>>,
    /// Extra bytes folded into the size estimate
    pub extra: u64,
    pub built: bool,
}

impl EncoderCore {
    /// Reject accumulation and rebuilds once `build()` has run
    pub fn ensure_open(&self) -> AssetResult<()> {
        if self.built {
            return Err(AssetError::State(
                "encoder already built; use a fresh instance".to_string(),
            ));
        }
        Ok(())
    }

    pub fn take_keys(&mut self) -> AssetResult<Vec<String>> {
        self.keys
            .take()
            .ok_or_else(|| AssetError::Validation("no signing keys provided".to_string()))
    }

    /// Generic planning estimate shared by both encoders
    pub fn estimate(&self, input_count: usize, output_count: usize) -> u64 {
        input_count as u64 * 180 + output_count as u64 * 34 + 10 + input_count as u64 + 80
            + self.extra
    }

    /// Fee/change arithmetic over the accumulated obligations
    ///
    /// `available` is the satoshi sum of every consumed input;
    /// `dust_outputs` the number of asset-bearing outputs (each owed
    /// [`DUST_SATOSHIS`]); `extra_payments` any satoshis owed beyond dust,
    /// royalties and storage; `estimated` the size-derived base fee.
    pub fn gas_plan(
        &self,
        available: u64,
        dust_outputs: usize,
        extra_payments: u64,
        estimated: u64,
    ) -> AssetResult<GasPlan> {
        let royalty_total: u64 = self.royalties.iter().map(|r| r.satoshis).sum();
        let storage_total = self.storage.as_ref().map_or(0, |s| s.satoshis);
        let obligations = dust_outputs as u64 * DUST_SATOSHIS
            + royalty_total
            + storage_total
            + extra_payments
            + estimated;

        let change = available.checked_sub(obligations).ok_or_else(|| {
            AssetError::Economics(format!(
                "not enough gas: {available} satoshis available, {obligations} required"
            ))
        })?;

        let plan = if change < UNECONOMICAL_CHANGE {
            // Surplus too small to be worth an output; miners get it
            GasPlan {
                fee: estimated + change,
                change: None,
            }
        } else {
            GasPlan {
                fee: estimated,
                change: Some(change),
            }
        };
        debug!(
            available,
            obligations,
            fee = plan.fee,
            change = ?plan.change,
            "gas accounting settled"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> EncoderCore {
        EncoderCore::default()
    }

    #[test]
    fn test_ensure_open() {
        let mut c = core();
        assert!(c.ensure_open().is_ok());
        c.built = true;
        assert!(matches!(c.ensure_open(), Err(AssetError::State(_))));
    }

    #[test]
    fn test_take_keys_requires_sign() {
        let mut c = core();
        assert!(c.take_keys().is_err());
        c.keys = Some(vec!["key".to_string()]);
        assert_eq!(c.take_keys().unwrap(), vec!["key".to_string()]);
        // consumed
        assert!(c.keys.is_none());
    }

    #[test]
    fn test_estimate_formula() {
        let c = core();
        assert_eq!(c.estimate(2, 5), 2 * 180 + 5 * 34 + 10 + 2 + 80);
    }

    #[test]
    fn test_gas_plan_insufficient() {
        let c = core();
        assert!(matches!(
            c.gas_plan(100, 1, 0, 500),
            Err(AssetError::Economics(_))
        ));
    }

    #[test]
    fn test_gas_plan_dust_folding_boundary() {
        let c = core();
        // surplus of 999 folds into the fee
        let plan = c.gas_plan(600 + 500 + 999, 1, 0, 500).unwrap();
        assert_eq!(plan.fee, 500 + 999);
        assert_eq!(plan.change, None);
        // surplus of 1000 becomes a change output
        let plan = c.gas_plan(600 + 500 + 1000, 1, 0, 500).unwrap();
        assert_eq!(plan.fee, 500);
        assert_eq!(plan.change, Some(1000));
    }

    #[test]
    fn test_gas_plan_counts_royalties_and_storage() {
        let mut c = core();
        c.royalties.push(Payment {
            address: "a".to_string(),
            satoshis: 700,
        });
        c.storage = Some(Payment {
            address: "b".to_string(),
            satoshis: 300,
        });
        let plan = c.gas_plan(600 + 700 + 300 + 500 + 2000, 1, 0, 500).unwrap();
        assert_eq!(plan.change, Some(2000));
    }
}
