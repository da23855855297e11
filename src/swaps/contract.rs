// =============================================================================
// TIDESWAP v1.2 - Contract Audit
// =============================================================================
//
// Validates a counterparty's funding transaction against the contract
// script they claim it pays into, and exposes the result as a read-only
// view that can produce the follow-up transactions: redeem (with the
// secret), refund (after the locktime) and participate (the second swap
// leg on another chain).
//
// =============================================================================

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::address::hash160_to_address;
use crate::coins::{format_coins, from_base_units};
use crate::error::SwapError;
use crate::networks::{get_network_by_symbol, NetworkParams};
use crate::script::script_to_p2sh_script_pubkey;
use crate::swaps::htlc_script::{contract_address, parse_contract_script, ContractTerms};
use crate::swaps::transaction::AtomicSwapTransaction;
use crate::transaction::Transaction;
use crate::utxo::Utxo;
use crate::wallet::Wallet;

// =============================================================================
// Audit
// =============================================================================

/// Validate a funding transaction against the claimed contract script.
///
/// The script must match the contract template and one of the
/// transaction's outputs must pay to its script hash.
pub fn audit_contract(
    network: &'static NetworkParams,
    contract: &str,
    raw_transaction: &str,
) -> Result<Contract, SwapError> {
    let tx = Transaction::from_hex(raw_transaction)?;
    if tx.outputs.is_empty() {
        return Err(SwapError::Validation(
            "Given transaction has no outputs.".to_string(),
        ));
    }

    let contract_bytes = hex::decode(contract).map_err(|_| invalid_contract())?;
    let script_pubkey = script_to_p2sh_script_pubkey(&contract_bytes);
    let (vout, output) = tx
        .outputs
        .iter()
        .enumerate()
        .find(|(_, output)| output.script_pubkey == script_pubkey)
        .ok_or_else(invalid_contract)?;

    let terms = parse_contract_script(&contract_bytes).map_err(|_| invalid_contract())?;
    let locktime = Utc
        .timestamp_opt(terms.locktime as i64, 0)
        .single()
        .ok_or_else(invalid_contract)?;
    let address = contract_address(network, &contract_bytes);

    Ok(Contract {
        network,
        contract: contract.to_string(),
        contract_bytes,
        raw_transaction: raw_transaction.to_string(),
        transaction_hash: tx.txid_hex(),
        address,
        vout: vout as u32,
        locktime,
        recipient_address: hash160_to_address(
            network.pubkey_address_prefix,
            &terms.recipient_hash,
        ),
        refund_address: hash160_to_address(network.pubkey_address_prefix, &terms.refund_hash),
        secret_hash: hex::encode(terms.secret_hash),
        value: from_base_units(output.value),
        terms,
    })
}

fn invalid_contract() -> SwapError {
    SwapError::Validation("Given transaction is not a valid contract.".to_string())
}

// =============================================================================
// Contract View
// =============================================================================

/// Read-only view of an audited funding transaction.
#[derive(Clone, Debug)]
pub struct Contract {
    pub network: &'static NetworkParams,
    /// Contract script, hex
    pub contract: String,
    contract_bytes: Vec<u8>,
    /// Funding transaction, raw hex
    pub raw_transaction: String,
    pub transaction_hash: String,
    /// P2SH funding address of the contract
    pub address: String,
    /// Index of the contract output in the funding transaction
    pub vout: u32,
    pub locktime: DateTime<Utc>,
    pub recipient_address: String,
    pub refund_address: String,
    /// RIPEMD-160 hash of the swap secret, hex
    pub secret_hash: String,
    /// Contract output value in whole coin units
    pub value: f64,
    terms: ContractTerms,
}

/// Detail record for an audited contract; every field matches the
/// corresponding field of the originating transaction's details.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContractDetails {
    pub contract: String,
    pub contract_transaction: String,
    pub transaction_hash: String,
    pub recipient_address: String,
    pub refund_address: String,
    pub secret_hash: String,
    pub locktime: DateTime<Utc>,
    pub value: f64,
    pub value_text: String,
}

impl Contract {
    /// Build the transaction redeeming the contract output with the swap
    /// secret, paying the full value to the recipient.
    ///
    /// The secret is deliberately not checked against the contract's
    /// secret hash here: a wrong secret produces a spending script that
    /// the network's consensus rules reject, not a local error. Only
    /// malformed hex is rejected.
    pub fn redeem(&self, wallet: Wallet, secret: &str) -> Result<AtomicSwapTransaction, SwapError> {
        let secret_bytes = hex::decode(secret)
            .map_err(|_| SwapError::Validation("Provided secret is not valid hex.".to_string()))?;

        let utxo = self.contract_utxo(wallet, Some(secret_bytes), false);
        AtomicSwapTransaction::contract_spend(
            self.network,
            self.recipient_address.clone(),
            self.value,
            utxo,
            self.terms.secret_hash.to_vec(),
            self.locktime,
            self.contract_bytes.clone(),
            false,
        )
    }

    /// Build the transaction refunding the contract output back to the
    /// sender. Permitted only once the locktime has passed.
    pub fn refund(&self, wallet: Wallet) -> Result<AtomicSwapTransaction, SwapError> {
        if Utc::now() < self.locktime {
            return Err(SwapError::Timing(format!(
                "This contract is still valid! It can't be refunded until {}.",
                self.locktime.format("%Y-%m-%d %H:%M:%S")
            )));
        }

        let utxo = self.contract_utxo(wallet, None, true);
        AtomicSwapTransaction::contract_spend(
            self.network,
            self.refund_address.clone(),
            self.value,
            utxo,
            self.terms.secret_hash.to_vec(),
            self.locktime,
            self.contract_bytes.clone(),
            true,
        )
    }

    /// Build the counterparty funding leg on the chain named by `symbol`,
    /// reusing this contract's secret hash under a fresh, shorter
    /// locktime.
    pub fn participate(
        &self,
        symbol: &str,
        sender_address: String,
        recipient_address: String,
        value: f64,
        solvable_utxo: Vec<Utxo>,
    ) -> Result<AtomicSwapTransaction, SwapError> {
        // Stay on test networks when this leg was audited on one
        let lookup = if self.network.is_test_network() {
            format!("{}-TESTNET", symbol.to_uppercase())
        } else {
            symbol.to_uppercase()
        };
        let network = get_network_by_symbol(&lookup)
            .ok_or_else(|| SwapError::Validation(format!("Unknown network symbol: {}.", symbol)))?;

        network.atomic_swap(
            sender_address,
            recipient_address,
            value,
            solvable_utxo,
            Some(self.terms.secret_hash.to_vec()),
        )
    }

    pub fn show_details(&self) -> ContractDetails {
        ContractDetails {
            contract: self.contract.clone(),
            contract_transaction: self.raw_transaction.clone(),
            transaction_hash: self.transaction_hash.clone(),
            recipient_address: self.recipient_address.clone(),
            refund_address: self.refund_address.clone(),
            secret_hash: self.secret_hash.clone(),
            locktime: self.locktime,
            value: self.value,
            value_text: format_coins(self.value, self.network.default_symbol()),
        }
    }

    fn contract_utxo(&self, wallet: Wallet, secret: Option<Vec<u8>>, refund: bool) -> Utxo {
        Utxo::contract_spend(
            self.transaction_hash.clone(),
            self.vout,
            self.value,
            hex::encode(script_to_p2sh_script_pubkey(&self.contract_bytes)),
            wallet,
            secret,
            refund,
            self.contract.clone(),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
