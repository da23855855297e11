// =============================================================================
// TIDESWAP v1.2 - Atomic Swaps
// =============================================================================
//
// Trustless cross-chain exchanges using Hash Time Lock Contracts (HTLCs).
//
// How it works:
// 1. Alice wants Bob's LTC, Bob wants Alice's BTC
// 2. Alice generates secret R, builds a BTC contract locked to H(R),
//    refundable to her after 48h, and funds it
// 3. Bob audits Alice's contract, then funds an LTC contract locked to the
//    same H(R), refundable to him after 24h (the participate leg)
// 4. Alice redeems Bob's contract, revealing R on the LTC chain
// 5. Bob extracts R from Alice's redeem transaction and redeems the BTC
//    contract
// 6. If anyone walks away, both contracts expire into refunds
//
// The initiator's window is twice the participant's so the secret is always
// revealed while the participant can still redeem.
//
// =============================================================================

pub mod contract;
pub mod htlc_script;
pub mod secret;
pub mod transaction;

pub use contract::{audit_contract, Contract, ContractDetails};
pub use htlc_script::{
    build_contract_script, contract_address, is_valid_contract_script, parse_contract_script,
    ContractTerms,
};
pub use secret::extract_secret;
pub use transaction::{AtomicSwapTransaction, TransactionDetails};

use ripemd::{Digest, Ripemd160};

// =============================================================================
// Constants
// =============================================================================

/// Secret/preimage size in bytes
pub const SECRET_SIZE: usize = 32;

/// Secret hash size in bytes (RIPEMD-160 output)
pub const SECRET_HASH_SIZE: usize = 20;

/// Default locktime for the initiating leg (hours)
pub const INITIATE_LOCKTIME_HOURS: i64 = 48;

/// Default locktime for the participating leg (hours)
pub const PARTICIPATE_LOCKTIME_HOURS: i64 = 24;

// =============================================================================
// Secrets
// =============================================================================

/// Generate a random secret for a swap leg.
pub fn generate_secret() -> [u8; SECRET_SIZE] {
    rand::random()
}

/// Hash a secret the way the contract template does (single RIPEMD-160).
pub fn hash_secret(secret: &[u8]) -> [u8; SECRET_HASH_SIZE] {
    let digest = Ripemd160::digest(secret);
    let mut hash = [0u8; SECRET_HASH_SIZE];
    hash.copy_from_slice(&digest);
    hash
}

/// Verify a secret against a contract's secret hash.
pub fn verify_secret(secret: &[u8], hash: &[u8]) -> bool {
    hash_secret(secret) == hash
}

// =============================================================================
// Tests
// =============================================================================
