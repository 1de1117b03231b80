//! Transfer encoder
//!
//! Moves units of one previously issued asset between addresses, optionally
//! burning some. Like the issuance encoder this is a single-use builder:
//! accumulate inputs and outputs, then `build()` verifies conservation,
//! settles royalties, encodes the instruction and hands the plan to the
//! signing engine.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::address;
use crate::encoding::BitStream;
use crate::errors::{AssetError, AssetResult, CapacityError};
use crate::price::{royalty_satoshis, PriceSnapshot, SATS_PER_COIN};
use crate::tx::{BuildResult, TransactionSigner, TxPlan};
use crate::types::{
    AssetRef, OutputIntent, Payment, Utxo, DUST_SATOSHIS, MAX_ASSET_OUTPUTS,
    MAX_INSTRUCTION_BYTES,
};

use super::encoder::{EncoderCore, SizeEstimate};
use super::issuance::STORAGE_ADDRESS;
use super::rules::RuleSet;

/// Magic opening a plain transfer instruction
pub const TRANSFER_MAGIC: &str = "44410315";

/// Magic variant signalling the instruction carries a burn entry
pub const TRANSFER_BURN_MAGIC: &str = "44410325";

/// Output index reserved for the burn entry
const BURN_INDEX: u64 = 31;

/// Single-use builder for a transfer transaction
#[derive(Debug)]
pub struct TransferEncoder {
    core: EncoderCore,
    asset_inputs: Vec<Utxo>,
    rules: RuleSet,
    price: Option<PriceSnapshot>,
    asset_change: Option<String>,
    to_burn: u64,
    burn_extra: bool,
    result: Option<BuildResult>,
}

impl TransferEncoder {
    /// `rules` is the active rule set of the asset being moved, as recorded
    /// by its most recent (rewritable) issuance. A price snapshot is only
    /// needed when the rules carry oracle-priced royalties.
    pub fn new(rules: RuleSet, price: Option<PriceSnapshot>) -> Self {
        Self {
            core: EncoderCore::default(),
            asset_inputs: Vec::new(),
            rules,
            price,
            asset_change: None,
            to_burn: 0,
            burn_extra: false,
            result: None,
        }
    }

    /// Add a UTXO to spend; asset-bearing inputs contribute units, plain
    /// inputs contribute gas
    pub fn add_input(&mut self, utxo: Utxo) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        if utxo.is_asset() {
            self.asset_inputs.push(utxo);
        } else {
            self.core.gas.push(utxo);
        }
        Ok(self)
    }

    pub fn add_inputs(&mut self, utxos: Vec<Utxo>) -> AssetResult<&mut Self> {
        for utxo in utxos {
            self.add_input(utxo)?;
        }
        Ok(self)
    }

    /// Send `amount` asset units to `address`
    pub fn add_output(&mut self, address: &str, amount: u64) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        if !address::is_valid(address) {
            return Err(AssetError::Validation(format!(
                "invalid output address: {address}"
            )));
        }
        if amount == 0 {
            return Err(AssetError::Validation(
                "asset output amount must be a positive number".to_string(),
            ));
        }
        self.core.outputs.push(OutputIntent {
            address: address.to_string(),
            amount,
        });
        Ok(self)
    }

    /// Destroy `amount` units on top of any rule-mandated deflation
    pub fn burn_assets(&mut self, amount: u64) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        self.to_burn = self
            .to_burn
            .checked_add(amount)
            .ok_or(CapacityError::PrecisionRange(u64::MAX))?;
        Ok(self)
    }

    /// Burn whatever input units remain unassigned instead of returning them
    /// as asset change
    pub fn set_burn_extra(&mut self, burn_extra: bool) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        self.burn_extra = burn_extra;
        Ok(self)
    }

    /// Address receiving unassigned asset units
    pub fn set_asset_change(&mut self, address: &str) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        if !address::is_valid(address) {
            return Err(AssetError::Validation(format!(
                "invalid asset change address: {address}"
            )));
        }
        self.asset_change = Some(address.to_string());
        Ok(self)
    }

    pub fn set_gas_change(&mut self, address: &str) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        if !address::is_valid(address) {
            return Err(AssetError::Validation(format!(
                "invalid change address: {address}"
            )));
        }
        self.core.gas_change = Some(address.to_string());
        Ok(self)
    }

    /// Exchange rates used to settle oracle-priced royalties
    pub fn set_price(&mut self, snapshot: PriceSnapshot) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        self.price = Some(snapshot);
        Ok(self)
    }

    /// Pay the metadata storage fee alongside the transfer
    pub fn set_storage(&mut self, bytes: u64, sats_per_usd: u64) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        let satoshis =
            (bytes as u128 * 12 * sats_per_usd as u128).div_ceil(10_000_000) as u64 + 10;
        self.core.storage = Some(Payment {
            address: STORAGE_ADDRESS.to_string(),
            satoshis,
        });
        Ok(self)
    }

    pub fn sign(&mut self, keys: Vec<String>) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        self.core.keys = Some(keys);
        Ok(self)
    }

    pub fn result(&self) -> AssetResult<&BuildResult> {
        self.result
            .as_ref()
            .ok_or_else(|| AssetError::State("build() has not run".to_string()))
    }

    /// Resolve the single asset on the inputs and its total unit count
    ///
    /// Inputs group by asset id AND metadata reference; units under the same
    /// id but a different metadata document are a different holding and must
    /// not be merged.
    fn input_asset(&self) -> AssetResult<(AssetRef, u64)> {
        let mut seen: Option<AssetRef> = None;
        let mut total: u64 = 0;
        for utxo in &self.asset_inputs {
            let Some(tag) = &utxo.asset else { continue };
            match &seen {
                None => {
                    seen = Some(AssetRef {
                        asset_id: tag.asset_id.clone(),
                        metadata: tag.metadata.clone(),
                        amount: 0,
                    })
                }
                Some(prior)
                    if prior.asset_id != tag.asset_id || prior.metadata != tag.metadata =>
                {
                    return Err(AssetError::Validation(format!(
                        "inputs mix asset groups {}:{} and {}:{}",
                        prior.asset_id, prior.metadata, tag.asset_id, tag.metadata
                    )));
                }
                Some(_) => {}
            }
            total = total
                .checked_add(tag.amount)
                .ok_or(CapacityError::PrecisionRange(u64::MAX))?;
        }
        let tag = seen.ok_or_else(|| {
            AssetError::Economics("no asset units on the inputs".to_string())
        })?;
        Ok((tag, total))
    }

    /// Settle the rule-set royalties into `core.royalties`
    ///
    /// Each royalty is owed once per asset-bearing recipient output. Native
    /// royalties are satoshi amounts taken verbatim; priced royalties convert
    /// through the rate snapshot with ceiling arithmetic.
    fn settle_royalties(&mut self, recipient_count: usize) -> AssetResult<()> {
        self.core.royalties.clear();
        if self.rules.royalties.is_empty() {
            return Ok(());
        }
        let recipients = recipient_count.max(1) as u64;
        let rate = match &self.rules.currency {
            None => SATS_PER_COIN,
            Some(currency) => self
                .price
                .as_ref()
                .and_then(|p| p.rate(&currency.name))
                .ok_or_else(|| {
                    AssetError::Economics(format!(
                        "royalties are priced in {} but no rate was supplied",
                        currency.name
                    ))
                })?,
        };
        for (address, amount) in &self.rules.royalties {
            let per_recipient = royalty_satoshis(*amount, rate);
            let owed = per_recipient
                .checked_mul(recipients)
                .ok_or(CapacityError::PrecisionRange(u64::MAX))?;
            self.core.royalties.push(Payment {
                address: address.clone(),
                satoshis: owed,
            });
        }
        Ok(())
    }

    /// Verify, encode, sign and settle. Runs at most once per instance.
    pub fn build<S: TransactionSigner>(&mut self, signer: &S) -> AssetResult<&BuildResult> {
        self.core.ensure_open()?;

        // -- verify ------------------------------------------------------
        let (asset, input_total) = self.input_asset()?;

        let mut burn_total = self
            .to_burn
            .checked_add(self.rules.deflate.unwrap_or(0))
            .ok_or(CapacityError::PrecisionRange(u64::MAX))?;
        let mut committed: u64 = burn_total;
        for output in &self.core.outputs {
            committed = committed
                .checked_add(output.amount)
                .ok_or(CapacityError::PrecisionRange(u64::MAX))?;
        }
        if committed > input_total {
            return Err(AssetError::Economics(format!(
                "outputs and burns commit {committed} units but inputs carry {input_total}"
            )));
        }

        // Every input unit must land somewhere; leftovers go to asset change
        // or, when requested, onto the burn pile
        let mut placed = self.core.outputs.clone();
        let remainder = input_total - committed;
        if remainder > 0 {
            if self.burn_extra {
                burn_total += remainder;
            } else if let Some(change_address) = &self.asset_change {
                placed.push(OutputIntent {
                    address: change_address.clone(),
                    amount: remainder,
                });
            } else {
                return Err(AssetError::Economics(format!(
                    "{remainder} units unassigned: set an asset change address or burn the extra"
                )));
            }
        }
        if placed.len() > MAX_ASSET_OUTPUTS {
            return Err(CapacityError::TooManyOutputs {
                count: placed.len(),
                max: MAX_ASSET_OUTPUTS,
            }
            .into());
        }

        self.settle_royalties(placed.len())?;

        // -- encode ------------------------------------------------------
        placed.sort_by(|a, b| b.amount.cmp(&a.amount));

        let mut data = BitStream::new();
        data.add_hex(if burn_total > 0 {
            TRANSFER_BURN_MAGIC
        } else {
            TRANSFER_MAGIC
        })?;
        for (index, output) in placed.iter().enumerate() {
            data.add_integer(0, 3)?;
            data.add_integer(index as u64, 5)?;
            data.add_precision(output.amount)?;
        }
        if burn_total > 0 {
            data.add_integer(0, 3)?;
            data.add_integer(BURN_INDEX, 5)?;
            data.add_precision(burn_total)?;
        }

        let instruction = data.to_buffer();
        if instruction.len() > MAX_INSTRUCTION_BYTES {
            return Err(CapacityError::PayloadTooLarge(instruction.len()).into());
        }
        debug!(
            bytes = instruction.len(),
            outputs = placed.len(),
            burn_total,
            "transfer instruction encoded"
        );

        // -- delegate ----------------------------------------------------
        let mut inputs: Vec<Utxo> = self.asset_inputs.clone();
        inputs.extend(self.core.gas.iter().cloned());
        let available: u64 = inputs.iter().map(|u| u.satoshis).sum();
        // Same estimate the caller can read before building, so the charged
        // fee never drifts from the published one
        let estimated = self.estimated_size();
        let plan = self.core.gas_plan(available, placed.len(), 0, estimated)?;

        let change = match plan.change {
            Some(satoshis) => {
                let address = self.core.gas_change.clone().ok_or_else(|| {
                    AssetError::Economics("no gas change address set".to_string())
                })?;
                Some(Payment { address, satoshis })
            }
            None => None,
        };

        let mut payments: Vec<Payment> = placed
            .iter()
            .map(|o| Payment {
                address: o.address.clone(),
                satoshis: DUST_SATOSHIS,
            })
            .collect();
        payments.extend(self.core.royalties.iter().cloned());
        payments.extend(self.core.storage.iter().cloned());

        let tx_plan = TxPlan {
            inputs: inputs.clone(),
            outputs: payments,
            data: instruction,
            change,
            fee: plan.fee,
        };

        let keys = self.core.take_keys()?;
        let signed = signer
            .sign_transaction(&tx_plan, &keys)
            .map_err(AssetError::Signer)?;
        drop(keys);

        // -- produce -----------------------------------------------------
        let mut produced: Vec<Utxo> = Vec::new();
        let mut vout: u32 = 0;
        for output in &placed {
            produced.push(Utxo {
                txid: signed.txid.clone(),
                vout,
                satoshis: DUST_SATOSHIS,
                address: output.address.clone(),
                script: None,
                asset: Some(AssetRef {
                    asset_id: asset.asset_id.clone(),
                    metadata: asset.metadata.clone(),
                    amount: output.amount,
                }),
            });
            vout += 1;
        }
        for payment in self.core.royalties.iter().chain(self.core.storage.iter()) {
            produced.push(Utxo {
                txid: signed.txid.clone(),
                vout,
                satoshis: payment.satoshis,
                address: payment.address.clone(),
                script: None,
                asset: None,
            });
            vout += 1;
        }
        // the zero-value data output occupies the next vout
        vout += 1;
        if let Some(change) = &tx_plan.change {
            produced.push(Utxo {
                txid: signed.txid.clone(),
                vout,
                satoshis: change.satoshis,
                address: change.address.clone(),
                script: None,
                asset: None,
            });
        }

        info!(
            txid = %signed.txid,
            asset_id = %asset.asset_id,
            moved = input_total - burn_total,
            burned = burn_total,
            fee = plan.fee,
            "transfer built"
        );
        self.result = Some(BuildResult {
            txid: signed.txid,
            size: signed.raw.len(),
            fee: plan.fee,
            raw: signed.raw,
            inputs,
            outputs: produced,
        });
        self.core.built = true;
        self.result()
    }

    /// Group input units per asset id, mostly useful for diagnostics
    pub fn input_balances(&self) -> BTreeMap<String, u64> {
        let mut balances = BTreeMap::new();
        for utxo in &self.asset_inputs {
            if let Some(tag) = &utxo.asset {
                *balances.entry(tag.asset_id.clone()).or_insert(0) += tag.amount;
            }
        }
        balances
    }
}

impl SizeEstimate for TransferEncoder {
    fn estimated_size(&self) -> u64 {
        let outputs = self.core.outputs.len()
            + self.asset_change.is_some() as usize
            + self.rules.royalties.len()
            + self.core.storage.is_some() as usize
            + 2;
        self.core
            .estimate(self.asset_inputs.len() + self.core.gas.len(), outputs)
    }
}
