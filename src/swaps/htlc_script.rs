// =============================================================================
// TIDESWAP v1.2 - HTLC Contract Script
// =============================================================================
//
// Script template for Hash Time Lock Contracts used in atomic swaps.
//
// Contract structure:
// OP_IF
//     OP_RIPEMD160 <secret_hash> OP_EQUALVERIFY
//     OP_DUP OP_HASH160 <recipient_pubkey_hash>
// OP_ELSE
//     <locktime> OP_CHECKLOCKTIMEVERIFY OP_DROP
//     OP_DUP OP_HASH160 <refund_pubkey_hash>
// OP_ENDIF
// OP_EQUALVERIFY OP_CHECKSIG
//
// To redeem with the secret:
//     <signature> <pubkey> <secret> OP_1 <contract>
//
// To refund after the locktime:
//     <signature> <pubkey> OP_0 <contract>
//
// The contract is funded through a P2SH output paying to its HASH160, so
// the full script only appears on-chain when the output is spent.
//
// =============================================================================

use crate::address::hash160_to_address;
use crate::error::SwapError;
use crate::networks::NetworkParams;
use crate::script::{hash160, opcodes, parse_script, push_data, ScriptOp};
use crate::swaps::SECRET_HASH_SIZE;

/// Number of script tokens in the contract template.
const TEMPLATE_OPS: usize = 17;

// =============================================================================
// Contract Terms
// =============================================================================

/// The parameters recovered from (or used to build) a contract script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractTerms {
    /// RIPEMD-160 hash of the swap secret
    pub secret_hash: [u8; SECRET_HASH_SIZE],
    /// Absolute locktime, seconds since the epoch
    pub locktime: u32,
    /// HASH160 of the recipient's public key
    pub recipient_hash: [u8; 20],
    /// HASH160 of the refund (sender) public key
    pub refund_hash: [u8; 20],
}

// =============================================================================
// Script Creation
// =============================================================================

/// Build the contract script from its terms.
pub fn build_contract_script(
    secret_hash: &[u8; SECRET_HASH_SIZE],
    locktime: u32,
    recipient_hash: &[u8; 20],
    refund_hash: &[u8; 20],
) -> Vec<u8> {
    let mut script = Vec::with_capacity(81);

    // Redeem branch
    script.push(opcodes::OP_IF);
    script.push(opcodes::OP_RIPEMD160);
    push_data(&mut script, secret_hash);
    script.push(opcodes::OP_EQUALVERIFY);
    script.push(opcodes::OP_DUP);
    script.push(opcodes::OP_HASH160);
    push_data(&mut script, recipient_hash);

    // Refund branch
    script.push(opcodes::OP_ELSE);
    push_data(&mut script, &locktime.to_le_bytes());
    script.push(opcodes::OP_CHECKLOCKTIMEVERIFY);
    script.push(opcodes::OP_DROP);
    script.push(opcodes::OP_DUP);
    script.push(opcodes::OP_HASH160);
    push_data(&mut script, refund_hash);
    script.push(opcodes::OP_ENDIF);

    // Shared signature check
    script.push(opcodes::OP_EQUALVERIFY);
    script.push(opcodes::OP_CHECKSIG);

    script
}

/// ScriptSig spending the redeem branch.
pub fn redeem_script_sig(
    signature: &[u8],
    pubkey: &[u8],
    secret: &[u8],
    contract: &[u8],
) -> Vec<u8> {
    let mut script = Vec::new();
    push_data(&mut script, signature);
    push_data(&mut script, pubkey);
    push_data(&mut script, secret);
    script.push(opcodes::OP_1);
    push_data(&mut script, contract);
    script
}

/// ScriptSig spending the refund branch.
pub fn refund_script_sig(signature: &[u8], pubkey: &[u8], contract: &[u8]) -> Vec<u8> {
    let mut script = Vec::new();
    push_data(&mut script, signature);
    push_data(&mut script, pubkey);
    script.push(opcodes::OP_0);
    push_data(&mut script, contract);
    script
}

// =============================================================================
// Script Parsing
// =============================================================================

/// Parse a contract script, failing unless it matches the template exactly.
pub fn parse_contract_script(script: &[u8]) -> Result<ContractTerms, SwapError> {
    let ops = parse_script(script)?;

    if ops.len() != TEMPLATE_OPS {
        return Err(invalid_template());
    }

    expect_op(&ops[0], opcodes::OP_IF)?;
    expect_op(&ops[1], opcodes::OP_RIPEMD160)?;
    let secret_hash = expect_push(&ops[2], SECRET_HASH_SIZE)?;
    expect_op(&ops[3], opcodes::OP_EQUALVERIFY)?;
    expect_op(&ops[4], opcodes::OP_DUP)?;
    expect_op(&ops[5], opcodes::OP_HASH160)?;
    let recipient_hash = expect_push(&ops[6], 20)?;
    expect_op(&ops[7], opcodes::OP_ELSE)?;
    let locktime_bytes = expect_push(&ops[8], 4)?;
    expect_op(&ops[9], opcodes::OP_CHECKLOCKTIMEVERIFY)?;
    expect_op(&ops[10], opcodes::OP_DROP)?;
    expect_op(&ops[11], opcodes::OP_DUP)?;
    expect_op(&ops[12], opcodes::OP_HASH160)?;
    let refund_hash = expect_push(&ops[13], 20)?;
    expect_op(&ops[14], opcodes::OP_ENDIF)?;
    expect_op(&ops[15], opcodes::OP_EQUALVERIFY)?;
    expect_op(&ops[16], opcodes::OP_CHECKSIG)?;

    let locktime = u32::from_le_bytes([
        locktime_bytes[0],
        locktime_bytes[1],
        locktime_bytes[2],
        locktime_bytes[3],
    ]);

    Ok(ContractTerms {
        secret_hash: to_array(&secret_hash),
        locktime,
        recipient_hash: to_array(&recipient_hash),
        refund_hash: to_array(&refund_hash),
    })
}

/// Whether a script is a syntactically well-formed contract.
pub fn is_valid_contract_script(script: &[u8]) -> bool {
    parse_contract_script(script).is_ok()
}

/// The contract's funding address: its HASH160 under the chain's P2SH
/// address encoding.
pub fn contract_address(network: &NetworkParams, script: &[u8]) -> String {
    hash160_to_address(network.script_address_prefix, &hash160(script))
}

// =============================================================================
// Helpers
// =============================================================================

fn invalid_template() -> SwapError {
    SwapError::Validation("Script does not match the contract template.".to_string())
}

fn expect_op(op: &ScriptOp, wanted: u8) -> Result<(), SwapError> {
    match op {
        ScriptOp::Op(b) if *b == wanted => Ok(()),
        _ => Err(invalid_template()),
    }
}

fn expect_push(op: &ScriptOp, len: usize) -> Result<Vec<u8>, SwapError> {
    match op {
        ScriptOp::Push(data) if data.len() == len => Ok(data.clone()),
        _ => Err(invalid_template()),
    }
}

fn to_array(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(data);
    out
}

// =============================================================================
// Tests
// =============================================================================
