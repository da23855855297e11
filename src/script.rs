// =============================================================================
// TIDESWAP v1.2 - Script Primitives
// =============================================================================
//
// Byte-level Bitcoin Script helpers shared by the contract template and the
// transaction builder. Only construction and tokenizing are implemented;
// script execution belongs to the chains themselves.
//
// Standard templates used here:
//   P2PKH: OP_DUP OP_HASH160 <pubKeyHash> OP_EQUALVERIFY OP_CHECKSIG
//   P2SH:  OP_HASH160 <scriptHash> OP_EQUAL
//
// =============================================================================

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::SwapError;

// =============================================================================
// Opcodes
// =============================================================================

pub mod opcodes {
    pub const OP_0: u8 = 0x00;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_1: u8 = 0x51;
    pub const OP_IF: u8 = 0x63;
    pub const OP_ELSE: u8 = 0x67;
    pub const OP_ENDIF: u8 = 0x68;
    pub const OP_DROP: u8 = 0x75;
    pub const OP_DUP: u8 = 0x76;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_RIPEMD160: u8 = 0xa6;
    pub const OP_SHA256: u8 = 0xa8;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_CHECKSIG: u8 = 0xac;
    pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;
}

// =============================================================================
// Script Tokens
// =============================================================================

/// A single parsed script token: an opcode or a pushed data item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptOp {
    Op(u8),
    Push(Vec<u8>),
}

impl ScriptOp {
    pub fn push_data(&self) -> Option<&[u8]> {
        match self {
            ScriptOp::Push(data) => Some(data),
            ScriptOp::Op(_) => None,
        }
    }
}

/// Tokenize a script into opcodes and data pushes.
///
/// Handles direct pushes (0x01-0x4b), OP_PUSHDATA1 and OP_PUSHDATA2.
/// Fails on truncated push data.
pub fn parse_script(bytes: &[u8]) -> Result<Vec<ScriptOp>, SwapError> {
    let mut ops = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if (0x01..=0x4b).contains(&b) {
            let len = b as usize;
            if i + 1 + len > bytes.len() {
                return Err(SwapError::Validation("Invalid push data length.".to_string()));
            }
            ops.push(ScriptOp::Push(bytes[i + 1..i + 1 + len].to_vec()));
            i += 1 + len;
        } else if b == opcodes::OP_PUSHDATA1 {
            if i + 1 >= bytes.len() {
                return Err(SwapError::Validation("Missing PUSHDATA1 length.".to_string()));
            }
            let len = bytes[i + 1] as usize;
            if i + 2 + len > bytes.len() {
                return Err(SwapError::Validation("Invalid PUSHDATA1 length.".to_string()));
            }
            ops.push(ScriptOp::Push(bytes[i + 2..i + 2 + len].to_vec()));
            i += 2 + len;
        } else if b == opcodes::OP_PUSHDATA2 {
            if i + 2 >= bytes.len() {
                return Err(SwapError::Validation("Missing PUSHDATA2 length.".to_string()));
            }
            let len = u16::from_le_bytes([bytes[i + 1], bytes[i + 2]]) as usize;
            if i + 3 + len > bytes.len() {
                return Err(SwapError::Validation("Invalid PUSHDATA2 length.".to_string()));
            }
            ops.push(ScriptOp::Push(bytes[i + 3..i + 3 + len].to_vec()));
            i += 3 + len;
        } else {
            ops.push(ScriptOp::Op(b));
            i += 1;
        }
    }

    Ok(ops)
}

/// Append a data push with the minimal push prefix.
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len <= 75 {
        script.push(len as u8);
    } else if len <= 255 {
        script.push(opcodes::OP_PUSHDATA1);
        script.push(len as u8);
    } else {
        script.push(opcodes::OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    }
    script.extend_from_slice(data);
}

// =============================================================================
// Standard Script Templates
// =============================================================================

/// P2PKH locking script for a 20-byte public key hash.
pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(opcodes::OP_DUP);
    script.push(opcodes::OP_HASH160);
    push_data(&mut script, pubkey_hash);
    script.push(opcodes::OP_EQUALVERIFY);
    script.push(opcodes::OP_CHECKSIG);
    script
}

/// P2SH locking script for a 20-byte script hash.
pub fn p2sh_script(script_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.push(opcodes::OP_HASH160);
    push_data(&mut script, script_hash);
    script.push(opcodes::OP_EQUAL);
    script
}

/// P2SH locking script paying to the hash of the given serialized script.
pub fn script_to_p2sh_script_pubkey(script: &[u8]) -> Vec<u8> {
    p2sh_script(&hash160(script))
}

// =============================================================================
// Digest Helpers
// =============================================================================

/// HASH160: RIPEMD-160 of SHA-256.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    out
}

/// HASH256: double SHA-256.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_direct_push() {
        let mut script = Vec::new();
        push_data(&mut script, &[0xab; 20]);
        script.push(opcodes::OP_CHECKSIG);

        let ops = parse_script(&script).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], ScriptOp::Push(vec![0xab; 20]));
        assert_eq!(ops[1], ScriptOp::Op(opcodes::OP_CHECKSIG));
    }

    #[test]
    fn test_parse_pushdata1() {
        let mut script = Vec::new();
        push_data(&mut script, &[0xcd; 80]);

        assert_eq!(script[0], opcodes::OP_PUSHDATA1);
        let ops = parse_script(&script).unwrap();
        assert_eq!(ops[0], ScriptOp::Push(vec![0xcd; 80]));
    }

    #[test]
    fn test_parse_pushdata2() {
        let mut script = Vec::new();
        push_data(&mut script, &[0xef; 300]);

        assert_eq!(script[0], opcodes::OP_PUSHDATA2);
        let ops = parse_script(&script).unwrap();
        assert_eq!(ops[0], ScriptOp::Push(vec![0xef; 300]));
    }

    #[test]
    fn test_parse_truncated_push_fails() {
        // Claims 20 bytes of data but carries only 3
        let script = vec![0x14, 0x01, 0x02, 0x03];
        assert!(parse_script(&script).is_err());
    }

    #[test]
    fn test_p2pkh_template() {
        let script = p2pkh_script(&[0u8; 20]);
        assert_eq!(script.len(), 25);
        assert_eq!(script[0], opcodes::OP_DUP);
        assert_eq!(script[1], opcodes::OP_HASH160);
        assert_eq!(script[24], opcodes::OP_CHECKSIG);
    }

    #[test]
    fn test_p2sh_template() {
        let script = p2sh_script(&[0u8; 20]);
        assert_eq!(script.len(), 23);
        assert_eq!(script[0], opcodes::OP_HASH160);
        assert_eq!(script[22], opcodes::OP_EQUAL);
    }

    #[test]
    fn test_hash160_length() {
        assert_eq!(hash160(b"tideswap").len(), 20);
        assert_eq!(hash256(b"tideswap").len(), 32);
    }
}
