// =============================================================================
// TIDESWAP v1.2 - Address Encoding
// =============================================================================
//
// Base58check address and WIF codecs. Version bytes always come from the
// caller's explicit network parameters; nothing here consults a global
// chain selection.
//
// =============================================================================

use sha2::{Digest, Sha256};

use crate::error::SwapError;
use crate::networks::NetworkParams;
use crate::script::hash160;

/// Encode a 20-byte hash as a base58check address under the given version byte.
pub fn hash160_to_address(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(25);
    payload.push(version);
    payload.extend_from_slice(hash);

    let checksum = Sha256::digest(Sha256::digest(&payload));
    payload.extend_from_slice(&checksum[..4]);

    bs58::encode(payload).into_string()
}

/// Decode a base58check address into its version byte and 20-byte hash.
pub fn address_to_hash160(address: &str) -> Result<(u8, [u8; 20]), SwapError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|_| SwapError::Validation("Invalid address encoding.".to_string()))?;

    if decoded.len() != 25 {
        return Err(SwapError::Validation("Invalid address length.".to_string()));
    }

    let payload = &decoded[..21];
    let checksum = &decoded[21..];
    let computed = Sha256::digest(Sha256::digest(payload));
    if checksum != &computed[..4] {
        return Err(SwapError::Validation("Invalid address checksum.".to_string()));
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&decoded[1..21]);
    Ok((decoded[0], hash))
}

/// Check whether an address is well-formed and carries one of the
/// network's version bytes (P2PKH or P2SH).
pub fn is_valid_address(network: &NetworkParams, address: &str) -> bool {
    match address_to_hash160(address) {
        Ok((version, _)) => {
            version == network.pubkey_address_prefix || version == network.script_address_prefix
        }
        Err(_) => false,
    }
}

/// Derive a P2PKH address for a serialized public key.
pub fn pubkey_to_address(network: &NetworkParams, pubkey: &[u8]) -> String {
    hash160_to_address(network.pubkey_address_prefix, &hash160(pubkey))
}

/// Decode a WIF-encoded private key into its raw 32 bytes.
///
/// Accepts both the plain 33-byte payload and the 34-byte payload with the
/// trailing compressed-key flag. The version byte must match the network.
pub fn decode_wif(network: &NetworkParams, wif: &str) -> Result<[u8; 32], SwapError> {
    let decoded = bs58::decode(wif.trim())
        .into_vec()
        .map_err(|_| SwapError::Validation("Invalid WIF encoding.".to_string()))?;

    if decoded.len() < 37 {
        return Err(SwapError::Validation("Invalid WIF length.".to_string()));
    }

    let (payload, checksum) = decoded.split_at(decoded.len() - 4);
    let computed = Sha256::digest(Sha256::digest(payload));
    if checksum != &computed[..4] {
        return Err(SwapError::Validation("Invalid WIF checksum.".to_string()));
    }

    if payload[0] != network.wif_prefix {
        return Err(SwapError::Validation("Invalid WIF version byte.".to_string()));
    }

    let key_bytes: &[u8] = if payload.len() == 34 && payload[33] == 0x01 {
        &payload[1..33]
    } else if payload.len() == 33 {
        &payload[1..33]
    } else {
        return Err(SwapError::Validation("Invalid WIF length.".to_string()));
    };

    let mut key = [0u8; 32];
    key.copy_from_slice(key_bytes);
    Ok(key)
}
