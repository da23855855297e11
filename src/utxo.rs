// =============================================================================
// TIDESWAP v1.2 - UTXO Records
// =============================================================================
//
// Immutable spendable-output records. Callers obtain these from a block
// explorer or their own node and hand the exact set to spend; no coin
// selection happens here. Contract spends carry the extra fields needed to
// assemble the HTLC branch-selection script.
//
// =============================================================================

use crate::coins::{from_base_units, to_base_units};
use crate::error::SwapError;
use crate::transaction::OutPoint;
use crate::wallet::Wallet;

#[derive(Clone, Debug)]
pub struct Utxo {
    /// Funding transaction hash, display-order hex
    pub tx_id: String,
    /// Output index in the funding transaction
    pub vout: u32,
    /// Amount in whole coin units
    pub value: f64,
    /// Locking script of the output, hex
    pub tx_script: String,
    /// Signing capability for this output, if attached
    pub wallet: Option<Wallet>,
    /// Secret revealed when redeeming an HTLC output
    pub secret: Option<Vec<u8>>,
    /// Whether an HTLC output is spent through the refund branch
    pub refund: bool,
    /// Serialized contract script for HTLC outputs, hex
    pub contract: Option<String>,
}

impl Utxo {
    pub fn new(
        tx_id: String,
        vout: u32,
        value: f64,
        tx_script: String,
        wallet: Option<Wallet>,
    ) -> Self {
        Utxo {
            tx_id,
            vout,
            value,
            tx_script,
            wallet,
            secret: None,
            refund: false,
            contract: None,
        }
    }

    /// Build a record from a UTXO listing that reports the amount in the
    /// chain's base units, as block explorers do.
    pub fn from_base_units(
        tx_id: String,
        vout: u32,
        value_base_units: u64,
        tx_script: String,
        wallet: Option<Wallet>,
    ) -> Self {
        Utxo::new(
            tx_id,
            vout,
            from_base_units(value_base_units),
            tx_script,
            wallet,
        )
    }

    /// Record for spending an HTLC contract output through either branch.
    pub(crate) fn contract_spend(
        tx_id: String,
        vout: u32,
        value: f64,
        tx_script: String,
        wallet: Wallet,
        secret: Option<Vec<u8>>,
        refund: bool,
        contract: String,
    ) -> Self {
        Utxo {
            tx_id,
            vout,
            value,
            tx_script,
            wallet: Some(wallet),
            secret,
            refund,
            contract: Some(contract),
        }
    }

    pub fn outpoint(&self) -> Result<OutPoint, SwapError> {
        OutPoint::from_hex(&self.tx_id, self.vout)
    }

    /// Locking script bytes of this output.
    pub fn parsed_script(&self) -> Result<Vec<u8>, SwapError> {
        hex::decode(&self.tx_script)
            .map_err(|_| SwapError::Validation("Invalid UTXO locking script hex.".to_string()))
    }

    pub fn value_base_units(&self) -> u64 {
        to_base_units(self.value)
    }
}
