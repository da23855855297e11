// =============================================================================
// TIDESWAP v1.2 - Atomic Swap Transactions
// =============================================================================
//
// Builder, fee engine and signer for swap-leg transactions. One value per
// swap leg, mutated in place by exactly one owner:
//
//   new -> set_locktime -> generate_hash -> build_atomic_swap_contract
//       -> create_unsigned_transaction -> add_fee -> sign
//
// `create_unsigned_transaction` runs the earlier steps itself when they
// have not been performed, so the usual entry point is
// `NetworkParams::atomic_swap` followed by `add_fee_and_sign`.
//
// =============================================================================

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::address::address_to_hash160;
use crate::coins::{format_coins, round_to_base_unit, to_base_units};
use crate::error::SwapError;
use crate::networks::NetworkParams;
use crate::script::{p2pkh_script, push_data, script_to_p2sh_script_pubkey};
use crate::swaps::htlc_script::{
    build_contract_script, contract_address, redeem_script_sig, refund_script_sig,
};
use crate::swaps::{
    generate_secret, hash_secret, INITIATE_LOCKTIME_HOURS, PARTICIPATE_LOCKTIME_HOURS,
    SECRET_HASH_SIZE,
};
use crate::transaction::{Transaction, TxIn, TxOut, SIGHASH_ALL};
use crate::utxo::Utxo;
use crate::wallet::Wallet;

// =============================================================================
// Transaction Details
// =============================================================================

/// Fully-populated record describing a built swap transaction, used both
/// for display and for handing a contract to the counterparty (the
/// `contract` and `contract_transaction` fields round-trip into
/// `audit_contract`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransactionDetails {
    pub contract: String,
    pub contract_transaction: String,
    pub transaction_hash: String,
    pub recipient_address: String,
    pub refund_address: String,
    pub secret: String,
    pub secret_hash: String,
    pub size_text: String,
    pub value_text: String,
    pub fee_text: String,
    pub fee_per_kb_text: String,
    pub locktime: DateTime<Utc>,
    pub size: usize,
    pub value: f64,
    pub fee: f64,
    pub fee_per_kb: f64,
}

// =============================================================================
// Atomic Swap Transaction
// =============================================================================

/// A swap-leg transaction being assembled, fee'd and signed.
///
/// Not safe for concurrent mutation; each leg carries its own instance.
#[derive(Clone, Debug)]
pub struct AtomicSwapTransaction {
    pub network: &'static NetworkParams,
    pub sender_address: String,
    pub recipient_address: String,
    /// Amount in whole coin units
    pub value: f64,
    /// The exact UTXO set to spend, in input order
    pub solvable_utxo: Vec<Utxo>,
    pub secret: Option<Vec<u8>>,
    pub secret_hash: Option<Vec<u8>>,
    pub locktime: Option<DateTime<Utc>>,
    /// Serialized contract script
    pub contract: Option<Vec<u8>>,
    pub tx: Transaction,
    /// Total fee in whole coin units, set by `calculate_fee`
    pub fee: Option<f64>,
    /// Fee rate in whole coin units per kB, supplied by the caller
    pub fee_per_kb: Option<f64>,
}

impl AtomicSwapTransaction {
    /// Start a new funding leg. With `secret_hash` set this is the
    /// participating side, which never learns the secret from here.
    pub fn new(
        network: &'static NetworkParams,
        sender_address: String,
        recipient_address: String,
        value: f64,
        solvable_utxo: Vec<Utxo>,
        secret_hash: Option<Vec<u8>>,
    ) -> Self {
        AtomicSwapTransaction {
            network,
            sender_address,
            recipient_address,
            value,
            solvable_utxo,
            secret: None,
            secret_hash,
            locktime: None,
            contract: None,
            tx: Transaction::new(),
            fee: None,
            fee_per_kb: None,
        }
    }

    // =========================================================================
    // Contract Assembly
    // =========================================================================

    /// Set the contract locktime to now plus `number_of_hours`, truncated
    /// to whole seconds (sub-second precision is not representable in the
    /// contract and both sides must agree on the truncation).
    pub fn set_locktime(&mut self, number_of_hours: i64) {
        let locktime = Utc::now() + Duration::hours(number_of_hours);
        self.locktime = Utc.timestamp_opt(locktime.timestamp(), 0).single();
    }

    /// Generate the swap secret and derive its hash.
    ///
    /// An already-present secret is never overwritten; calling this again
    /// only re-derives the hash.
    pub fn generate_hash(&mut self) {
        let secret = self
            .secret
            .get_or_insert_with(|| generate_secret().to_vec());
        self.secret_hash = Some(hash_secret(secret).to_vec());
    }

    /// Emit the contract script from the current terms.
    pub fn build_atomic_swap_contract(&mut self) -> Result<(), SwapError> {
        let locktime = self
            .locktime
            .ok_or_else(|| SwapError::Validation("Locktime is not set.".to_string()))?;
        let secret_hash = self
            .secret_hash
            .as_ref()
            .ok_or_else(|| SwapError::Validation("Secret hash is not set.".to_string()))?;
        if secret_hash.len() != SECRET_HASH_SIZE {
            return Err(SwapError::Validation("Invalid secret hash length.".to_string()));
        }
        let mut hash = [0u8; SECRET_HASH_SIZE];
        hash.copy_from_slice(secret_hash);

        let (_, recipient_hash) = address_to_hash160(&self.recipient_address)
            .map_err(|_| SwapError::Validation("Invalid recipient address.".to_string()))?;
        let (_, refund_hash) = address_to_hash160(&self.sender_address)
            .map_err(|_| SwapError::Validation("Invalid sender address.".to_string()))?;

        self.contract = Some(build_contract_script(
            &hash,
            locktime.timestamp() as u32,
            &recipient_hash,
            &refund_hash,
        ));
        Ok(())
    }

    /// The contract's P2SH funding address.
    pub fn contract_address(&self) -> Result<String, SwapError> {
        let contract = self.require_contract()?;
        Ok(contract_address(self.network, contract))
    }

    // =========================================================================
    // Transaction Assembly
    // =========================================================================

    /// Assemble the unsigned funding transaction: output 0 funds the
    /// contract, output 1 returns the change to the sender. Runs the
    /// locktime/secret/contract steps first when they are still pending.
    pub fn create_unsigned_transaction(&mut self) -> Result<(), SwapError> {
        if self.locktime.is_none() {
            // The participating leg (pre-shared hash, no secret) closes
            // its refund window in half the time
            let hours = if self.secret_hash.is_some() && self.secret.is_none() {
                PARTICIPATE_LOCKTIME_HOURS
            } else {
                INITIATE_LOCKTIME_HOURS
            };
            self.set_locktime(hours);
        }
        if self.secret_hash.is_none() {
            self.generate_hash();
        }
        if self.contract.is_none() {
            self.build_atomic_swap_contract()?;
        }

        if self.solvable_utxo.is_empty() {
            return Err(SwapError::Funding(
                "Cannot create transaction without UTXOs.".to_string(),
            ));
        }
        let utxo_value: u64 = self
            .solvable_utxo
            .iter()
            .map(|utxo| utxo.value_base_units())
            .sum();
        let value = to_base_units(self.value);
        if utxo_value < value {
            return Err(SwapError::Funding(
                "Provided UTXO value is lower than the transaction value.".to_string(),
            ));
        }

        let (_, sender_hash) = address_to_hash160(&self.sender_address)
            .map_err(|_| SwapError::Validation("Invalid sender address.".to_string()))?;
        let contract = self.require_contract()?;

        let mut tx = Transaction::new();
        for utxo in &self.solvable_utxo {
            tx.inputs.push(TxIn::new(utxo.outpoint()?));
        }
        tx.outputs.push(TxOut {
            value,
            script_pubkey: script_to_p2sh_script_pubkey(contract),
        });
        // Change output, fee deduction target; kept even when zero
        tx.outputs.push(TxOut {
            value: utxo_value - value,
            script_pubkey: p2pkh_script(&sender_hash),
        });

        self.tx = tx;
        Ok(())
    }

    /// Build a transaction spending a contract output through one of its
    /// branches, paying the full output value to `recipient_address`.
    pub(crate) fn contract_spend(
        network: &'static NetworkParams,
        recipient_address: String,
        value: f64,
        utxo: Utxo,
        secret_hash: Vec<u8>,
        locktime: DateTime<Utc>,
        contract: Vec<u8>,
        refund: bool,
    ) -> Result<Self, SwapError> {
        let (_, recipient_hash) = address_to_hash160(&recipient_address)
            .map_err(|_| SwapError::Validation("Invalid recipient address.".to_string()))?;

        let mut tx = Transaction::new();
        let mut input = TxIn::new(utxo.outpoint()?);
        if refund {
            // CLTV needs a transaction locktime at the contract deadline
            // and a non-final sequence
            input.sequence = 0;
            tx.lock_time = locktime.timestamp() as u32;
        }
        tx.inputs.push(input);
        tx.outputs.push(TxOut {
            value: to_base_units(value),
            script_pubkey: p2pkh_script(&recipient_hash),
        });

        let secret = utxo.secret.clone();
        Ok(AtomicSwapTransaction {
            network,
            sender_address: contract_address(network, &contract),
            recipient_address,
            value,
            solvable_utxo: vec![utxo],
            secret,
            secret_hash: Some(secret_hash),
            locktime: Some(locktime),
            contract: Some(contract),
            tx,
            fee: None,
            fee_per_kb: None,
        })
    }

    // =========================================================================
    // Fees
    // =========================================================================

    /// Serialized size in bytes at the current state.
    pub fn size(&self) -> usize {
        self.tx.size()
    }

    /// Derive the fee from the current serialized size and `fee_per_kb`,
    /// rounded to the chain's base unit.
    pub fn calculate_fee(&mut self) -> Result<(), SwapError> {
        let fee_per_kb = self
            .fee_per_kb
            .ok_or_else(|| SwapError::Validation("Fee per kB is not set.".to_string()))?;
        self.fee = Some(round_to_base_unit(fee_per_kb * self.size() as f64 / 1000.0));
        Ok(())
    }

    /// Subtract the fee from the current change output value.
    ///
    /// This call is NOT idempotent: invoking it twice subtracts the fee a
    /// second time from the already-reduced change amount. Call it exactly
    /// once per transaction, before signing.
    pub fn add_fee(&mut self) -> Result<(), SwapError> {
        if self.fee.is_none() {
            self.calculate_fee()?;
        }
        let fee = self
            .fee
            .ok_or_else(|| SwapError::Validation("Fee is not calculated.".to_string()))?;
        let fee = to_base_units(fee);

        let change = self
            .tx
            .outputs
            .last_mut()
            .ok_or_else(|| SwapError::Validation("Transaction has no outputs.".to_string()))?;
        if change.value < fee {
            return Err(SwapError::Funding(
                "Cannot subtract the fee from the change output. Add more UTXO inputs.".to_string(),
            ));
        }
        change.value -= fee;
        Ok(())
    }

    /// `add_fee` followed by `sign`.
    pub fn add_fee_and_sign(&mut self, default_wallet: Option<&Wallet>) -> Result<(), SwapError> {
        self.add_fee()?;
        self.sign(default_wallet)
    }

    // =========================================================================
    // Signing
    // =========================================================================

    /// Produce the spending script for every input.
    ///
    /// The signing capability is resolved per input: an explicit
    /// `default_wallet` argument overrides, otherwise the UTXO's own
    /// wallet is used. Re-invoking replaces the spending scripts.
    pub fn sign(&mut self, default_wallet: Option<&Wallet>) -> Result<(), SwapError> {
        for index in 0..self.tx.inputs.len() {
            let utxo = self.solvable_utxo.get(index).ok_or_else(|| {
                SwapError::Validation("Missing UTXO for transaction input.".to_string())
            })?;
            let wallet = default_wallet
                .or(utxo.wallet.as_ref())
                .ok_or_else(|| {
                    SwapError::Signing("Cannot sign transaction without a wallet.".to_string())
                })?;

            // Script-hash inputs sign over the contract itself
            let script_code = match &utxo.contract {
                Some(contract) => hex::decode(contract).map_err(|_| {
                    SwapError::Validation("Invalid contract script hex.".to_string())
                })?,
                None => utxo.parsed_script()?,
            };

            let digest = self.tx.signature_hash(index, &script_code, SIGHASH_ALL)?;
            let mut signature = wallet.sign(&digest);
            signature.push(SIGHASH_ALL as u8);
            let pubkey = wallet.public_key_bytes();

            let script_sig = if utxo.contract.is_some() {
                if utxo.refund {
                    refund_script_sig(&signature, &pubkey, &script_code)
                } else {
                    let secret = utxo.secret.clone().unwrap_or_default();
                    redeem_script_sig(&signature, &pubkey, &secret, &script_code)
                }
            } else {
                let mut script = Vec::new();
                push_data(&mut script, &signature);
                push_data(&mut script, &pubkey);
                script
            };

            self.tx.inputs[index].script_sig = script_sig;
        }
        Ok(())
    }

    // =========================================================================
    // Output
    // =========================================================================

    pub fn raw_transaction(&self) -> String {
        self.tx.to_hex()
    }

    pub fn transaction_hash(&self) -> String {
        self.tx.txid_hex()
    }

    /// The fixed detail record for a built swap transaction.
    pub fn show_details(&self) -> Result<TransactionDetails, SwapError> {
        let contract = self.require_contract()?;
        let locktime = self
            .locktime
            .ok_or_else(|| SwapError::Validation("Locktime is not set.".to_string()))?;
        let secret_hash = self
            .secret_hash
            .as_ref()
            .ok_or_else(|| SwapError::Validation("Secret hash is not set.".to_string()))?;

        let symbol = self.network.default_symbol();
        let size = self.size();
        let fee = self.fee.unwrap_or(0.0);
        let fee_per_kb = self.fee_per_kb.unwrap_or(0.0);

        Ok(TransactionDetails {
            contract: hex::encode(contract),
            contract_transaction: self.raw_transaction(),
            transaction_hash: self.transaction_hash(),
            recipient_address: self.recipient_address.clone(),
            refund_address: self.sender_address.clone(),
            secret: self.secret.as_ref().map(hex::encode).unwrap_or_default(),
            secret_hash: hex::encode(secret_hash),
            size_text: format!("{} bytes", size),
            value_text: format_coins(self.value, symbol),
            fee_text: format_coins(fee, symbol),
            fee_per_kb_text: format!("{} / 1 kB", format_coins(fee_per_kb, symbol)),
            locktime,
            size,
            value: self.value,
            fee,
            fee_per_kb,
        })
    }

    fn require_contract(&self) -> Result<&Vec<u8>, SwapError> {
        self.contract.as_ref().ok_or_else(|| {
            SwapError::Validation("Transaction does not carry an atomic swap contract.".to_string())
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
