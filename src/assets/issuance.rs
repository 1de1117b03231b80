//! Issuance encoder
//!
//! Builds the instruction and transaction plan that mints a new asset. The
//! encoder accumulates gas, outputs and options through builder calls, then
//! `build()` runs once: verify, encode, delegate to the signing engine,
//! produce the result record. Instances are single-use.

use tracing::{debug, info};

use crate::address;
use crate::encoding::BitStream;
use crate::errors::{AssetError, AssetResult, CapacityError};
use crate::tx::{BuildResult, TransactionSigner, TxPlan};
use crate::types::{
    Aggregation, AssetRef, OutputIntent, Payment, Utxo, DUST_SATOSHIS, MAX_ASSET_OUTPUTS,
    MAX_INSTRUCTION_BYTES,
};

use super::asset_id::{derive_asset_id, issuance_flags, ContentRef};
use super::encoder::{EncoderCore, SizeEstimate};
use super::grammar::encode_rules;
use super::metadata::Metadata;
use super::rules::RuleSet;

/// Protocol magic opening every issuance instruction
pub const ISSUANCE_MAGIC: &str = "444103";

const RECORD_NO_RULES: &str = "01";
const RECORD_REWRITABLE: &str = "03";
const RECORD_FIXED_RULES: &str = "04";

/// Well-known address collecting metadata storage fees
pub const STORAGE_ADDRESS: &str = "dgb1qjnzadu643tsfzjqjydnh06s9lgzp3m4sg3j68x";

/// Immutable characteristics fixed at issuance
#[derive(Debug, Clone, Copy)]
pub struct IssuanceParams {
    pub locked: bool,
    pub aggregation: Aggregation,
    pub divisibility: u8,
}

/// Single-use builder for a new-asset transaction
#[derive(Debug)]
pub struct IssuanceEncoder {
    core: EncoderCore,
    metadata: Metadata,
    rules: Option<RuleSet>,
    params: IssuanceParams,
    result: Option<BuildResult>,
}

impl IssuanceEncoder {
    pub fn new(
        metadata: Metadata,
        rules: Option<RuleSet>,
        params: IssuanceParams,
    ) -> AssetResult<Self> {
        if params.divisibility > 7 {
            return Err(AssetError::Validation(format!(
                "divisibility must be 0-7, got {}",
                params.divisibility
            )));
        }
        // An all-default rule set downgrades to the no-rules record type
        let rules = rules.filter(|r| !r.is_empty());
        Ok(Self {
            core: EncoderCore::default(),
            metadata,
            rules,
            params,
            result: None,
        })
    }

    /// Add a gas UTXO to spend for fees and dust
    pub fn add_gas(&mut self, utxo: Utxo) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        if utxo.is_asset() {
            return Err(AssetError::Validation(format!(
                "asset-bearing UTXO {} cannot fund an issuance",
                utxo.outpoint()
            )));
        }
        self.core.gas.push(utxo);
        Ok(self)
    }

    pub fn add_gas_many(&mut self, utxos: Vec<Utxo>) -> AssetResult<&mut Self> {
        for utxo in utxos {
            self.add_gas(utxo)?;
        }
        Ok(self)
    }

    /// Request `amount` freshly issued units at `address`
    pub fn add_output(&mut self, address: &str, amount: u64) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        if !address::is_valid(address) {
            return Err(AssetError::Validation(format!(
                "invalid output address: {address}"
            )));
        }
        self.core.outputs.push(OutputIntent {
            address: address.to_string(),
            amount,
        });
        Ok(self)
    }

    /// Pay the metadata storage fee for `bytes` of asset files
    ///
    /// `sats_per_usd` is the satoshi value of one US dollar. The rate is
    /// 1.2 USD per megabyte with a 10-satoshi floor, computed in integer
    /// arithmetic.
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

    /// Provide the signing keys handed to the signing engine
    pub fn sign(&mut self, keys: Vec<String>) -> AssetResult<&mut Self> {
        self.core.ensure_open()?;
        self.core.keys = Some(keys);
        Ok(self)
    }

    /// Read the build outcome
    pub fn result(&self) -> AssetResult<&BuildResult> {
        self.result
            .as_ref()
            .ok_or_else(|| AssetError::State("build() has not run".to_string()))
    }

    fn oracle_payment(&self) -> Option<Payment> {
        let currency = self.rules.as_ref()?.currency.as_ref()?;
        if currency.is_known_publisher() {
            return None;
        }
        // Caller-supplied oracles are paid dust plus their index so the
        // payment output identifies the rate slot
        Some(Payment {
            address: currency.address.clone(),
            satoshis: DUST_SATOSHIS + currency.index as u64,
        })
    }

    fn planned_output_count(&self) -> usize {
        let royalty_count = self.rules.as_ref().map_or(0, |r| r.royalties.len());
        let oracle = self.oracle_payment().is_some() as usize;
        // plus the data output and a potential change output
        self.core.outputs.len() + royalty_count + oracle + self.core.storage.is_some() as usize + 2
    }

    /// Verify, encode, sign and settle. Runs at most once per instance.
    pub fn build<S: TransactionSigner>(&mut self, signer: &S) -> AssetResult<&BuildResult> {
        self.core.ensure_open()?;

        // -- verify ------------------------------------------------------
        if self.core.outputs.is_empty() {
            return Err(AssetError::Validation("no asset outputs".to_string()));
        }
        if self.core.outputs.len() > MAX_ASSET_OUTPUTS {
            return Err(CapacityError::TooManyOutputs {
                count: self.core.outputs.len(),
                max: MAX_ASSET_OUTPUTS,
            }
            .into());
        }
        let mut total_issued: u64 = 0;
        for output in &self.core.outputs {
            if self.params.aggregation == Aggregation::Dispersed && output.amount != 1 {
                return Err(AssetError::Validation(
                    "dispersed assets require single-unit outputs".to_string(),
                ));
            }
            total_issued = total_issued
                .checked_add(output.amount)
                .ok_or(CapacityError::PrecisionRange(u64::MAX))?;
        }

        self.core.royalties.clear();
        if let Some(rules) = &self.rules {
            for (address, satoshis) in &rules.royalties {
                self.core.royalties.push(Payment {
                    address: address.clone(),
                    satoshis: *satoshis,
                });
            }
        }
        let oracle_payment = self.oracle_payment();

        let first_gas = self
            .core
            .gas
            .first()
            .ok_or_else(|| AssetError::Economics("no gas inputs".to_string()))?;
        let asset_id = if self.params.locked {
            let outpoint = first_gas.outpoint();
            derive_asset_id(
                ContentRef::Outpoint(&outpoint),
                self.params.aggregation,
                self.params.divisibility,
            )?
        } else {
            let script_hex = first_gas.script.as_deref().ok_or_else(|| {
                AssetError::Validation(
                    "unlocked issuance needs the first input's script".to_string(),
                )
            })?;
            let script = hex::decode(script_hex).map_err(|e| {
                AssetError::Validation(format!("invalid input script hex: {e}"))
            })?;
            derive_asset_id(
                ContentRef::Script(&script),
                self.params.aggregation,
                self.params.divisibility,
            )?
        };

        // -- encode ------------------------------------------------------
        // Descending amounts; decoders replicate this sort, so every 5-bit
        // index in the rule bitstream refers to the same output
        self.core.outputs.sort_by(|a, b| b.amount.cmp(&a.amount));

        let metadata_hash = self.metadata.to_hash()?;
        let mut data = BitStream::new();
        data.add_hex(ISSUANCE_MAGIC)?;
        match &self.rules {
            None => data.add_hex(RECORD_NO_RULES)?,
            Some(rules) => data.add_hex(if rules.rewritable {
                RECORD_REWRITABLE
            } else {
                RECORD_FIXED_RULES
            })?,
        };
        data.add_buffer(&metadata_hash);
        data.add_precision(total_issued)?;
        if let Some(rules) = &self.rules {
            let rule_bits =
                encode_rules(rules, self.params.aggregation, self.core.outputs.len())?;
            data.add_buffer(&rule_bits.to_buffer());
        }
        for (index, output) in self.core.outputs.iter().enumerate() {
            data.add_integer(0, 3)?;
            data.add_integer(index as u64, 5)?;
            data.add_precision(output.amount)?;
        }
        data.add_integer(
            issuance_flags(
                self.params.locked,
                self.params.aggregation,
                self.params.divisibility,
            ) as u64,
            8,
        )?;

        let instruction = data.to_buffer();
        if instruction.len() > MAX_INSTRUCTION_BYTES {
            return Err(CapacityError::PayloadTooLarge(instruction.len()).into());
        }
        debug!(
            bytes = instruction.len(),
            outputs = self.core.outputs.len(),
            total_issued,
            "issuance instruction encoded"
        );

        // -- delegate ----------------------------------------------------
        let available: u64 = self.core.gas.iter().map(|u| u.satoshis).sum();
        let extra = oracle_payment.as_ref().map_or(0, |p| p.satoshis);
        let estimated = self.estimated_size();
        let plan = self
            .core
            .gas_plan(available, self.core.outputs.len(), extra, estimated)?;

        let change = match plan.change {
            Some(satoshis) => {
                let address = self.core.gas_change.clone().ok_or_else(|| {
                    AssetError::Economics("no gas change address set".to_string())
                })?;
                Some(Payment { address, satoshis })
            }
            None => None,
        };

        let mut payments: Vec<Payment> = self
            .core
            .outputs
            .iter()
            .map(|o| Payment {
                address: o.address.clone(),
                satoshis: DUST_SATOSHIS,
            })
            .collect();
        payments.extend(self.core.royalties.iter().cloned());
        payments.extend(oracle_payment.clone());
        payments.extend(self.core.storage.iter().cloned());

        let tx_plan = TxPlan {
            inputs: self.core.gas.clone(),
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
        let metadata_ref = hex::encode(metadata_hash);
        let mut produced: Vec<Utxo> = Vec::new();
        let mut vout: u32 = 0;
        for output in &self.core.outputs {
            produced.push(Utxo {
                txid: signed.txid.clone(),
                vout,
                satoshis: DUST_SATOSHIS,
                address: output.address.clone(),
                script: None,
                asset: Some(AssetRef {
                    asset_id: asset_id.clone(),
                    metadata: metadata_ref.clone(),
                    amount: output.amount,
                }),
            });
            vout += 1;
        }
        for payment in self
            .core
            .royalties
            .iter()
            .chain(oracle_payment.iter())
            .chain(self.core.storage.iter())
        {
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

        info!(txid = %signed.txid, asset_id = %asset_id, fee = plan.fee, "issuance built");
        self.result = Some(BuildResult {
            txid: signed.txid,
            size: signed.raw.len(),
            fee: plan.fee,
            raw: signed.raw,
            inputs: self.core.gas.clone(),
            outputs: produced,
        });
        self.core.built = true;
        self.result()
    }
}

impl SizeEstimate for IssuanceEncoder {
    fn estimated_size(&self) -> u64 {
        self.core
            .estimate(self.core.gas.len(), self.planned_output_count())
    }
}
