// =============================================================================
// TIDESWAP v1.2 - Secret Extraction
// =============================================================================
//
// Recovers the swap secret from a redeeming transaction. Redeeming is what
// publishes the secret: once the counterparty's redeem transaction is on
// the wire, the other leg can be claimed with the value extracted here.
//
// =============================================================================

use crate::error::SwapError;
use crate::script::{opcodes, parse_script, ScriptOp};
use crate::transaction::Transaction;

/// Extract the secret pushed by an HTLC-redeem spending script.
///
/// The redeem branch spends with `<sig> <pubkey> <secret> OP_1 <contract>`,
/// so the secret is the data push right before the branch selector. The
/// value is returned verbatim as hex.
pub fn extract_secret(raw_transaction: &str) -> Result<String, SwapError> {
    let tx = Transaction::from_hex(raw_transaction).map_err(|_| {
        SwapError::Protocol("Given transaction is impossible to deserialize.".to_string())
    })?;

    if tx.inputs.is_empty() {
        return Err(SwapError::Protocol(
            "Given transaction has no inputs.".to_string(),
        ));
    }

    let script_sig = &tx.inputs[0].script_sig;
    let ops = parse_script(script_sig)
        .map_err(|_| unrecognized())?;

    if ops.len() >= 3 && ops[ops.len() - 2] == ScriptOp::Op(opcodes::OP_1) {
        if let Some(secret) = ops[ops.len() - 3].push_data() {
            return Ok(hex::encode(secret));
        }
    }

    Err(unrecognized())
}

fn unrecognized() -> SwapError {
    SwapError::Protocol("Unable to find the secret in the given transaction.".to_string())
}
