// =============================================================================
// TIDESWAP v1.2 - Cross-Chain Atomic Swaps
// =============================================================================
//
// Atomic swaps over UTXO chains using Hash Time Lock Contracts: build and
// fund the contract, audit the counterparty's funding transaction, produce
// the redeem/refund/participate follow-ups, extract revealed secrets, and
// watch the P2P network for transaction propagation.
//
// Typical flow:
//
//   let swap = BITCOIN.atomic_swap(sender, recipient, 0.7, utxo, None)?;
//   swap.add_fee_and_sign(None)?;            // after setting fee_per_kb
//   let details = swap.show_details()?;      // hand to the counterparty
//
//   let contract = LITECOIN.audit_contract(&their.contract,
//                                          &their.contract_transaction)?;
//   let redeem = contract.redeem(wallet, &secret)?;
//
// =============================================================================

pub mod address;
pub mod coins;
pub mod error;
pub mod networks;
pub mod p2p;
pub mod script;
pub mod swaps;
pub mod transaction;
pub mod utxo;
pub mod wallet;

pub use error::SwapError;
pub use networks::{
    get_network_by_symbol, NetworkParams, BITCOIN, BITCOIN_TESTNET, CANNABISCOIN, DOGECOIN,
    LITECOIN, NETWORKS,
};
pub use p2p::{capture_messages, Interest, ListenerState, NetMessage};
pub use swaps::{
    audit_contract, extract_secret, AtomicSwapTransaction, Contract, ContractDetails,
    TransactionDetails,
};
pub use utxo::Utxo;
pub use wallet::Wallet;

/// User agent announced during the version handshake.
pub const USER_AGENT: &str = "/tideswap:1.2.0/";
