// =============================================================================
// TIDESWAP v1.2 - P2P Listener
// =============================================================================
//
// Minimal wire-protocol client used to detect that a transaction has
// propagated: connect to one of the network's seed nodes, perform the
// version/verack handshake, then filter inbound messages until one of the
// caller's interests matches or the deadline passes.
//
// Message framing (all supported chains):
//   magic(4) | command(12, zero-padded) | length(4 LE) | checksum(4) | payload
// where checksum is the first 4 bytes of double-SHA256(payload).
//
// The transport is an explicit abstraction so tests drive the listener
// with scripted bytes instead of sockets. One socket per call, blocking
// I/O, closed on every exit path.
//
// =============================================================================

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::SwapError;
use crate::networks::NetworkParams;
use crate::transaction::{double_sha256, write_varint, Reader};
use crate::USER_AGENT;

// =============================================================================
// Constants
// =============================================================================

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
const RECV_POLL_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024; // 4MB
const HEADER_SIZE: usize = 24;

pub mod commands {
    pub const VERSION: &str = "version";
    pub const VERACK: &str = "verack";
    pub const GETDATA: &str = "getdata";
    pub const REJECT: &str = "reject";
}

/// Inventory type for transactions in `inv`/`getdata` payloads.
pub const MSG_TX: u32 = 1;

// =============================================================================
// Messages
// =============================================================================

/// A received wire message: its command name and raw payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetMessage {
    pub command: String,
    pub payload: Vec<u8>,
}

/// One entry of an inventory payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvEntry {
    pub kind: u32,
    /// Object hash in internal byte order
    pub hash: [u8; 32],
}

/// What the listener is waiting for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interest {
    /// Any message with this wire command
    Command(String),
    /// A `getdata` naming this transaction hash (display-order hex) —
    /// the signal that a broadcast transaction reached a peer
    GetDataFor(String),
}

impl Interest {
    fn matches(&self, message: &NetMessage) -> bool {
        match self {
            Interest::Command(command) => message.command == *command,
            Interest::GetDataFor(tx_id) => {
                if message.command != commands::GETDATA {
                    return false;
                }
                let mut wanted = match hex::decode(tx_id) {
                    Ok(bytes) if bytes.len() == 32 => bytes,
                    _ => return false,
                };
                wanted.reverse();
                match parse_inventory(&message.payload) {
                    Ok(entries) => entries
                        .iter()
                        .any(|entry| entry.kind == MSG_TX && entry.hash[..] == wanted[..]),
                    Err(_) => false,
                }
            }
        }
    }
}

// =============================================================================
// Framing
// =============================================================================

/// Frame a payload into a complete wire message for the given network.
pub fn frame_message(network: &NetworkParams, command: &str, payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(HEADER_SIZE + payload.len());
    data.extend_from_slice(&network.message_start);

    let mut name = [0u8; 12];
    name[..command.len()].copy_from_slice(command.as_bytes());
    data.extend_from_slice(&name);

    data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&double_sha256(payload)[..4]);
    data.extend_from_slice(payload);
    data
}

/// Take one complete message off the front of `buffer`, if present.
fn take_frame(
    network: &NetworkParams,
    buffer: &mut Vec<u8>,
) -> Result<Option<NetMessage>, SwapError> {
    if buffer.len() < HEADER_SIZE {
        return Ok(None);
    }
    if buffer[..4] != network.message_start {
        return Err(SwapError::Protocol("Invalid message start bytes.".to_string()));
    }

    let length = u32::from_le_bytes([buffer[16], buffer[17], buffer[18], buffer[19]]) as usize;
    if length > MAX_MESSAGE_SIZE {
        return Err(SwapError::Protocol("Oversized message.".to_string()));
    }
    if buffer.len() < HEADER_SIZE + length {
        return Ok(None);
    }

    let payload = buffer[HEADER_SIZE..HEADER_SIZE + length].to_vec();
    if buffer[20..24] != double_sha256(&payload)[..4] {
        return Err(SwapError::Protocol("Invalid message checksum.".to_string()));
    }

    let name_end = buffer[4..16].iter().position(|&b| b == 0).unwrap_or(12);
    let command = std::str::from_utf8(&buffer[4..4 + name_end])
        .map_err(|_| SwapError::Protocol("Invalid message command.".to_string()))?
        .to_string();

    buffer.drain(..HEADER_SIZE + length);
    Ok(Some(NetMessage { command, payload }))
}

/// Version payload announcing the network's protocol version.
pub fn build_version_payload(network: &NetworkParams) -> Vec<u8> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    let mut payload = Vec::with_capacity(86 + USER_AGENT.len());
    payload.extend_from_slice(&(network.protocol_version as i32).to_le_bytes());
    payload.extend_from_slice(&0u64.to_le_bytes()); // services
    payload.extend_from_slice(&timestamp.to_le_bytes());
    payload.extend_from_slice(&[0u8; 26]); // addr_recv
    payload.extend_from_slice(&[0u8; 26]); // addr_from
    payload.extend_from_slice(&rand::random::<u64>().to_le_bytes()); // nonce
    write_varint(&mut payload, USER_AGENT.len() as u64);
    payload.extend_from_slice(USER_AGENT.as_bytes());
    payload.extend_from_slice(&0i32.to_le_bytes()); // start height
    payload.push(0x01); // relay
    payload
}

/// Parse an `inv`/`getdata` payload into its inventory entries.
pub fn parse_inventory(payload: &[u8]) -> Result<Vec<InvEntry>, SwapError> {
    let mut reader = Reader::new(payload);
    let count = reader.read_varint()?;
    if count > (MAX_MESSAGE_SIZE / 36) as u64 {
        return Err(SwapError::Protocol("Oversized inventory.".to_string()));
    }

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let kind = reader.read_u32()?;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(reader.read_bytes(32)?);
        entries.push(InvEntry { kind, hash });
    }
    Ok(entries)
}

fn log_reject(payload: &[u8]) {
    let mut reader = Reader::new(payload);
    let message = read_varstr(&mut reader).unwrap_or_default();
    let _code = reader.read_u8();
    let reason = read_varstr(&mut reader).unwrap_or_default();
    log::debug!("Skipping reject message for '{}': {}", message, reason);
}

fn read_varstr(reader: &mut Reader) -> Result<String, SwapError> {
    let len = reader.read_varint()? as usize;
    let bytes = reader.read_bytes(len)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

// =============================================================================
// Transport
// =============================================================================

/// Blocking byte transport the listener runs over. Implemented by real
/// sockets in production and by scripted buffers in tests.
pub trait Transport {
    fn send(&mut self, data: &[u8]) -> Result<(), SwapError>;

    /// Read available bytes into `buf`. Returns `Ok(0)` when nothing
    /// arrived within the poll window; a closed connection is an error.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SwapError>;

    fn close(&mut self);
}

pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Resolve the network's seed hostnames and connect to the first
    /// reachable candidate.
    pub fn connect(network: &NetworkParams) -> Result<Self, SwapError> {
        for seed in network.seeds {
            let candidates = match (*seed, network.port).to_socket_addrs() {
                Ok(addrs) => addrs,
                Err(err) => {
                    log::warn!("Failed to resolve DNS seed {}: {}", seed, err);
                    continue;
                }
            };

            for addr in candidates {
                match TcpStream::connect_timeout(&addr, CONNECTION_TIMEOUT) {
                    Ok(stream) => {
                        let _ = stream.set_read_timeout(Some(RECV_POLL_TIMEOUT));
                        log::debug!("Connected to {} ({})", addr, network.name);
                        return Ok(TcpTransport { stream });
                    }
                    Err(err) => {
                        log::debug!("Connection to {} failed: {}", addr, err);
                    }
                }
            }
        }

        Err(SwapError::Network(
            "Unable to connect to any seed node.".to_string(),
        ))
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> Result<(), SwapError> {
        self.stream
            .write_all(data)
            .map_err(|err| SwapError::Network(format!("Send failed: {}", err)))
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SwapError> {
        match self.stream.read(buf) {
            Ok(0) => Err(SwapError::Network("Connection closed by peer.".to_string())),
            Ok(n) => Ok(n),
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(0)
            }
            Err(err) => Err(SwapError::Network(format!("Receive failed: {}", err))),
        }
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

// =============================================================================
// Message Capture
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Handshaking,
    Listening,
    Matched,
    TimedOut,
    Errored,
}

/// One capture session over a connected transport.
pub struct MessageCapture<T: Transport> {
    network: &'static NetworkParams,
    transport: T,
    state: ListenerState,
    buffer: Vec<u8>,
}

impl<T: Transport> MessageCapture<T> {
    pub fn new(network: &'static NetworkParams, transport: T) -> Self {
        MessageCapture {
            network,
            transport,
            state: ListenerState::Connecting,
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Handshake, then listen until an interest matches or the deadline
    /// passes. The transport is closed on every exit path.
    pub fn run(
        &mut self,
        interests: &[Interest],
        timeout: Duration,
    ) -> Result<Option<NetMessage>, SwapError> {
        let deadline = Instant::now() + timeout;
        let result = self.run_inner(interests, deadline);
        self.transport.close();
        self.state = match &result {
            Ok(Some(_)) => ListenerState::Matched,
            Ok(None) => ListenerState::TimedOut,
            Err(_) => ListenerState::Errored,
        };
        result
    }

    fn run_inner(
        &mut self,
        interests: &[Interest],
        deadline: Instant,
    ) -> Result<Option<NetMessage>, SwapError> {
        self.state = ListenerState::Handshaking;
        self.send_message(commands::VERSION, &build_version_payload(self.network))?;

        loop {
            if Instant::now() >= deadline {
                return Err(SwapError::Network("Handshake timed out.".to_string()));
            }
            let message = match self.next_message()? {
                Some(message) => message,
                None => continue,
            };
            match message.command.as_str() {
                commands::VERSION => self.send_message(commands::VERACK, &[])?,
                commands::VERACK => break,
                commands::REJECT => log_reject(&message.payload),
                _ => {}
            }
        }

        self.state = ListenerState::Listening;
        loop {
            if Instant::now() >= deadline {
                return Ok(None);
            }
            let message = match self.next_message()? {
                Some(message) => message,
                None => continue,
            };
            if message.command == commands::REJECT {
                log_reject(&message.payload);
                continue;
            }
            if interests.iter().any(|interest| interest.matches(&message)) {
                return Ok(Some(message));
            }
        }
    }

    fn send_message(&mut self, command: &str, payload: &[u8]) -> Result<(), SwapError> {
        let framed = frame_message(self.network, command, payload);
        self.transport.send(&framed)
    }

    fn next_message(&mut self) -> Result<Option<NetMessage>, SwapError> {
        if let Some(message) = take_frame(self.network, &mut self.buffer)? {
            return Ok(Some(message));
        }
        let mut chunk = [0u8; 4096];
        let n = self.transport.recv(&mut chunk)?;
        if n > 0 {
            self.buffer.extend_from_slice(&chunk[..n]);
        }
        take_frame(self.network, &mut self.buffer)
    }
}

/// Connect to the network, handshake and listen for `interests`.
///
/// Returns the matching message, or `None` when the timeout elapsed
/// without a match.
pub fn capture_messages(
    network: &'static NetworkParams,
    interests: &[Interest],
    timeout: Duration,
) -> Result<Option<NetMessage>, SwapError> {
    let transport = TcpTransport::connect(network)?;
    let mut capture = MessageCapture::new(network, transport);
    capture.run(interests, timeout)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use crate::networks::BITCOIN_TESTNET;

    #[derive(Default)]
    struct ScriptedInner {
        incoming: VecDeque<Vec<u8>>,
        sent: Vec<Vec<u8>>,
        closed: bool,
        fail_recv: bool,
    }

    #[derive(Clone, Default)]
    struct ScriptedTransport(Rc<RefCell<ScriptedInner>>);

    impl ScriptedTransport {
        fn push_incoming(&self, data: Vec<u8>) {
            self.0.borrow_mut().incoming.push_back(data);
        }

        fn sent_commands(&self) -> Vec<String> {
            self.0
                .borrow()
                .sent
                .iter()
                .map(|frame| {
                    let name_end = frame[4..16].iter().position(|&b| b == 0).unwrap_or(12);
                    String::from_utf8_lossy(&frame[4..4 + name_end]).into_owned()
                })
                .collect()
        }

        fn closed(&self) -> bool {
            self.0.borrow().closed
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&mut self, data: &[u8]) -> Result<(), SwapError> {
            self.0.borrow_mut().sent.push(data.to_vec());
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SwapError> {
            let mut inner = self.0.borrow_mut();
            if inner.fail_recv {
                return Err(SwapError::Network("Connection reset.".to_string()));
            }
            match inner.incoming.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }

        fn close(&mut self) {
            self.0.borrow_mut().closed = true;
        }
    }

    fn handshake_chunk() -> Vec<u8> {
        let mut chunk = frame_message(
            &BITCOIN_TESTNET,
            commands::VERSION,
            &build_version_payload(&BITCOIN_TESTNET),
        );
        chunk.extend_from_slice(&frame_message(&BITCOIN_TESTNET, commands::VERACK, &[]));
        chunk
    }

    fn getdata_frame(hash: [u8; 32]) -> Vec<u8> {
        let mut payload = Vec::new();
        write_varint(&mut payload, 1);
        payload.extend_from_slice(&MSG_TX.to_le_bytes());
        payload.extend_from_slice(&hash);
        frame_message(&BITCOIN_TESTNET, commands::GETDATA, &payload)
    }

    fn display_hex(mut hash: [u8; 32]) -> String {
        hash.reverse();
        hex::encode(hash)
    }

    #[test]
    fn test_capture_matches_getdata() {
        let hash = [0x5a; 32];
        let transport = ScriptedTransport::default();
        transport.push_incoming(handshake_chunk());
        transport.push_incoming(getdata_frame(hash));

        let mut capture = MessageCapture::new(&BITCOIN_TESTNET, transport.clone());
        let interests = [Interest::GetDataFor(display_hex(hash))];
        let result = capture.run(&interests, Duration::from_millis(200)).unwrap();

        let message = result.unwrap();
        assert_eq!(message.command, "getdata");
        assert_eq!(capture.state(), ListenerState::Matched);
        assert_eq!(transport.sent_commands(), vec!["version", "verack"]);
        assert!(transport.closed());
    }

    #[test]
    fn test_other_getdata_does_not_match() {
        let transport = ScriptedTransport::default();
        transport.push_incoming(handshake_chunk());
        transport.push_incoming(getdata_frame([0x11; 32]));

        let mut capture = MessageCapture::new(&BITCOIN_TESTNET, transport.clone());
        let interests = [Interest::GetDataFor(display_hex([0x22; 32]))];
        let result = capture.run(&interests, Duration::from_millis(30)).unwrap();

        assert!(result.is_none());
        assert_eq!(capture.state(), ListenerState::TimedOut);
    }

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_reject_is_skipped() {
        init_logs();

        // reject payload: varstr "tx", code 0x10, varstr "bad"
        let mut payload = vec![2u8];
        payload.extend_from_slice(b"tx");
        payload.push(0x10);
        payload.push(3u8);
        payload.extend_from_slice(b"bad");

        let hash = [0x5a; 32];
        let transport = ScriptedTransport::default();
        transport.push_incoming(handshake_chunk());
        transport.push_incoming(frame_message(&BITCOIN_TESTNET, commands::REJECT, &payload));
        transport.push_incoming(getdata_frame(hash));

        let mut capture = MessageCapture::new(&BITCOIN_TESTNET, transport.clone());
        // A reject interest would still not terminate the loop
        let interests = [Interest::GetDataFor(display_hex(hash))];
        let result = capture.run(&interests, Duration::from_millis(200)).unwrap();

        assert!(result.is_some());
        assert_eq!(capture.state(), ListenerState::Matched);
    }

    #[test]
    fn test_timeout_releases_connection() {
        let transport = ScriptedTransport::default();
        transport.push_incoming(handshake_chunk());

        let mut capture = MessageCapture::new(&BITCOIN_TESTNET, transport.clone());
        let interests = [Interest::Command("getdata".to_string())];
        let result = capture.run(&interests, Duration::from_millis(30)).unwrap();

        assert!(result.is_none());
        assert_eq!(capture.state(), ListenerState::TimedOut);
        assert!(transport.closed());
    }

    #[test]
    fn test_invalid_magic_errors_and_closes() {
        let transport = ScriptedTransport::default();
        transport.push_incoming(vec![0xde, 0xad, 0xbe, 0xef].repeat(8));

        let mut capture = MessageCapture::new(&BITCOIN_TESTNET, transport.clone());
        let interests = [Interest::Command("getdata".to_string())];
        let result = capture.run(&interests, Duration::from_millis(100));

        assert!(matches!(result, Err(SwapError::Protocol(_))));
        assert_eq!(capture.state(), ListenerState::Errored);
        assert!(transport.closed());
    }

    #[test]
    fn test_recv_failure_errors_and_closes() {
        let transport = ScriptedTransport::default();
        transport.0.borrow_mut().fail_recv = true;

        let mut capture = MessageCapture::new(&BITCOIN_TESTNET, transport.clone());
        let result = capture.run(&[], Duration::from_millis(100));

        assert!(matches!(result, Err(SwapError::Network(_))));
        assert_eq!(capture.state(), ListenerState::Errored);
        assert!(transport.closed());
    }

    #[test]
    fn test_connect_without_seeds_fails() {
        static NO_SEEDS: NetworkParams = NetworkParams {
            name: "test-isolated",
            symbols: &["ISO"],
            seeds: &[],
            port: 1,
            message_start: [0, 0, 0, 0],
            protocol_version: 70015,
            pubkey_address_prefix: 0x6f,
            script_address_prefix: 0xc4,
            wif_prefix: 0xef,
        };

        let result = TcpTransport::connect(&NO_SEEDS);
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("Unable to connect to any seed node.".to_string())
        );
    }

    #[test]
    fn test_frame_round_trip() {
        let frame = frame_message(&BITCOIN_TESTNET, commands::GETDATA, &[1, 2, 3]);
        let mut buffer = frame.clone();
        let message = take_frame(&BITCOIN_TESTNET, &mut buffer).unwrap().unwrap();

        assert_eq!(message.command, "getdata");
        assert_eq!(message.payload, vec![1, 2, 3]);
        assert!(buffer.is_empty());

        // Incomplete frames stay buffered
        let mut partial = frame[..frame.len() - 1].to_vec();
        assert!(take_frame(&BITCOIN_TESTNET, &mut partial).unwrap().is_none());
        assert!(!partial.is_empty());
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        let mut frame = frame_message(&BITCOIN_TESTNET, commands::GETDATA, &[1, 2, 3]);
        let last = frame.len() - 1;
        frame[last] ^= 0xff;
        let mut buffer = frame;
        assert!(take_frame(&BITCOIN_TESTNET, &mut buffer).is_err());
    }

    #[test]
    fn test_parse_inventory() {
        let mut payload = Vec::new();
        write_varint(&mut payload, 2);
        payload.extend_from_slice(&MSG_TX.to_le_bytes());
        payload.extend_from_slice(&[0xaa; 32]);
        payload.extend_from_slice(&2u32.to_le_bytes()); // MSG_BLOCK
        payload.extend_from_slice(&[0xbb; 32]);

        let entries = parse_inventory(&payload).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, MSG_TX);
        assert_eq!(entries[0].hash, [0xaa; 32]);
        assert_eq!(entries[1].kind, 2);

        assert!(parse_inventory(&[5]).is_err());
    }
}
