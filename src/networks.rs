// =============================================================================
// TIDESWAP v1.2 - Network Parameters
// =============================================================================
//
// Static table of immutable per-chain parameter records: seed hostnames,
// P2P port, wire magic, protocol version and base58 version bytes. A chain
// is selected by symbol key; every routine that encodes addresses, builds
// scripts or frames wire messages takes one of these records explicitly.
//
// =============================================================================

use std::time::Duration;

use crate::error::SwapError;
use crate::p2p::{self, Interest, NetMessage};
use crate::swaps::contract::{self, Contract};
use crate::swaps::secret;
use crate::swaps::transaction::AtomicSwapTransaction;
use crate::utxo::Utxo;

// =============================================================================
// Parameter Record
// =============================================================================

#[derive(Debug)]
pub struct NetworkParams {
    /// Human-readable chain name; test networks carry a `test-` prefix.
    pub name: &'static str,
    /// Ticker symbols, primary first.
    pub symbols: &'static [&'static str],
    /// DNS seed hostnames used to find peers.
    pub seeds: &'static [&'static str],
    /// Default P2P port.
    pub port: u16,
    /// Wire message start (magic) bytes.
    pub message_start: [u8; 4],
    /// Protocol version announced during the handshake.
    pub protocol_version: u32,
    /// Base58 version byte for P2PKH addresses.
    pub pubkey_address_prefix: u8,
    /// Base58 version byte for P2SH addresses.
    pub script_address_prefix: u8,
    /// Base58 version byte for WIF private keys.
    pub wif_prefix: u8,
}

impl NetworkParams {
    pub fn default_symbol(&self) -> &'static str {
        self.symbols[0]
    }

    pub fn is_test_network(&self) -> bool {
        self.name.starts_with("test-")
    }

    // =========================================================================
    // Swap API
    // =========================================================================

    /// Build an unsigned atomic swap funding transaction for this chain.
    ///
    /// With `secret_hash` set this creates the participating (second) leg,
    /// reusing the counterparty's hash under a shorter locktime.
    pub fn atomic_swap(
        &'static self,
        sender_address: String,
        recipient_address: String,
        value: f64,
        solvable_utxo: Vec<Utxo>,
        secret_hash: Option<Vec<u8>>,
    ) -> Result<AtomicSwapTransaction, SwapError> {
        let mut transaction = AtomicSwapTransaction::new(
            self,
            sender_address,
            recipient_address,
            value,
            solvable_utxo,
            secret_hash,
        );
        transaction.create_unsigned_transaction()?;
        Ok(transaction)
    }

    /// Validate a counterparty's funding transaction against the claimed
    /// contract script and expose it as a [`Contract`] view.
    pub fn audit_contract(
        &'static self,
        contract: &str,
        raw_transaction: &str,
    ) -> Result<Contract, SwapError> {
        contract::audit_contract(self, contract, raw_transaction)
    }

    /// Recover the revealed swap secret from a redeeming transaction.
    pub fn extract_secret(raw_transaction: &str) -> Result<String, SwapError> {
        secret::extract_secret(raw_transaction)
    }

    /// Listen on this chain's P2P network until a message matching one of
    /// `interests` arrives or `timeout` elapses.
    pub fn capture_messages(
        &'static self,
        interests: &[Interest],
        timeout: Duration,
    ) -> Result<Option<NetMessage>, SwapError> {
        p2p::capture_messages(self, interests, timeout)
    }
}

// =============================================================================
// Network Table
// =============================================================================

pub static BITCOIN: NetworkParams = NetworkParams {
    name: "bitcoin",
    symbols: &["BTC"],
    seeds: &[
        "seed.bitcoin.sipa.be",
        "dnsseed.bluematt.me",
        "dnsseed.bitcoin.dashjr.org",
        "seed.bitcoinstats.com",
        "seed.bitcoin.jonasschnelli.ch",
    ],
    port: 8333,
    message_start: [0xf9, 0xbe, 0xb4, 0xd9],
    protocol_version: 70015,
    pubkey_address_prefix: 0x00,
    script_address_prefix: 0x05,
    wif_prefix: 0x80,
};

pub static BITCOIN_TESTNET: NetworkParams = NetworkParams {
    name: "test-bitcoin",
    symbols: &["BTC"],
    seeds: &[
        "testnet-seed.bitcoin.jonasschnelli.ch",
        "seed.tbtc.petertodd.org",
        "testnet-seed.bluematt.me",
    ],
    port: 18333,
    message_start: [0x0b, 0x11, 0x09, 0x07],
    protocol_version: 70015,
    pubkey_address_prefix: 0x6f,
    script_address_prefix: 0xc4,
    wif_prefix: 0xef,
};

pub static LITECOIN: NetworkParams = NetworkParams {
    name: "litecoin",
    symbols: &["LTC"],
    seeds: &[
        "seed-a.litecoin.loshan.co.uk",
        "dnsseed.thrasher.io",
        "dnsseed.litecointools.com",
        "dnsseed.litecoinpool.org",
    ],
    port: 9333,
    message_start: [0xfb, 0xc0, 0xb6, 0xdb],
    protocol_version: 70015,
    pubkey_address_prefix: 0x30,
    script_address_prefix: 0x32,
    wif_prefix: 0xb0,
};

pub static DOGECOIN: NetworkParams = NetworkParams {
    name: "dogecoin",
    symbols: &["DOGE"],
    seeds: &["seed.dogecoin.com", "seed.multidoge.org", "seed2.multidoge.org"],
    port: 22556,
    message_start: [0xc0, 0xc0, 0xc0, 0xc0],
    protocol_version: 70015,
    pubkey_address_prefix: 0x1e,
    script_address_prefix: 0x16,
    wif_prefix: 0x9e,
};

pub static CANNABISCOIN: NetworkParams = NetworkParams {
    name: "cannabiscoin",
    symbols: &["CANN"],
    seeds: &["seed.cannabiscoin.net", "seed2.cannabiscoin.net"],
    port: 39348,
    message_start: [0xfe, 0xc3, 0xb9, 0xde],
    protocol_version: 70015,
    pubkey_address_prefix: 28,
    script_address_prefix: 5,
    wif_prefix: 156,
};

pub static NETWORKS: &[&NetworkParams] = &[
    &BITCOIN,
    &BITCOIN_TESTNET,
    &LITECOIN,
    &DOGECOIN,
    &CANNABISCOIN,
];

/// Look up a network by ticker symbol.
///
/// Symbols name mainnets; append `-TESTNET` to select the test network
/// with the same ticker (e.g. `BTC-TESTNET`).
pub fn get_network_by_symbol(symbol: &str) -> Option<&'static NetworkParams> {
    let (ticker, want_testnet) = match symbol.strip_suffix("-TESTNET") {
        Some(ticker) => (ticker, true),
        None => (symbol, false),
    };

    NETWORKS.iter().copied().find(|network| {
        network.is_test_network() == want_testnet
            && network
                .symbols
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ticker))
    })
}
