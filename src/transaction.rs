// =============================================================================
// TIDESWAP v1.2 - Transactions (UTXO Model)
// =============================================================================
//
// Consensus-format transaction model with byte-exact legacy serialization:
// little-endian integers, varint counts, txid in internal byte order. This
// is the encoding every supported chain accepts for pre-segwit spends, so
// raw hex produced here can be broadcast and audited as-is.
//
// =============================================================================

use sha2::{Digest, Sha256};

use crate::error::SwapError;

/// Legacy SIGHASH_ALL flag.
pub const SIGHASH_ALL: u32 = 0x01;

/// Sequence value that disables locktime checks for an input.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

// =============================================================================
// Transaction Components
// =============================================================================

/// Reference to a previous transaction output.
///
/// `txid` is kept in internal byte order; display order (as found in
/// explorers and UTXO listings) is the byte-reversed hex.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    /// Build an outpoint from a display-order txid hex string.
    pub fn from_hex(tx_id: &str, vout: u32) -> Result<Self, SwapError> {
        let mut bytes = hex::decode(tx_id)
            .map_err(|_| SwapError::Validation("Invalid transaction id hex.".to_string()))?;
        if bytes.len() != 32 {
            return Err(SwapError::Validation("Invalid transaction id length.".to_string()));
        }
        bytes.reverse();
        let mut txid = [0u8; 32];
        txid.copy_from_slice(&bytes);
        Ok(OutPoint { txid, vout })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxIn {
    pub fn new(previous_output: OutPoint) -> Self {
        TxIn {
            previous_output,
            script_sig: Vec::new(),
            sequence: SEQUENCE_FINAL,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    /// Amount in base units
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// A complete transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Transaction::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.extend_from_slice(&self.version.to_le_bytes());

        write_varint(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(&input.previous_output.txid);
            buf.extend_from_slice(&input.previous_output.vout.to_le_bytes());
            write_varint(&mut buf, input.script_sig.len() as u64);
            buf.extend_from_slice(&input.script_sig);
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_varint(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_le_bytes());
            write_varint(&mut buf, output.script_pubkey.len() as u64);
            buf.extend_from_slice(&output.script_pubkey);
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());

        buf
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, SwapError> {
        let mut reader = Reader::new(bytes);

        let version = reader.read_u32()? as i32;

        let input_count = reader.read_varint()?;
        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            let mut txid = [0u8; 32];
            txid.copy_from_slice(reader.read_bytes(32)?);
            let vout = reader.read_u32()?;
            let script_len = reader.read_varint()? as usize;
            let script_sig = reader.read_bytes(script_len)?.to_vec();
            let sequence = reader.read_u32()?;
            inputs.push(TxIn {
                previous_output: OutPoint { txid, vout },
                script_sig,
                sequence,
            });
        }

        let output_count = reader.read_varint()?;
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            let value = reader.read_u64()?;
            let script_len = reader.read_varint()? as usize;
            let script_pubkey = reader.read_bytes(script_len)?.to_vec();
            outputs.push(TxOut {
                value,
                script_pubkey,
            });
        }

        let lock_time = reader.read_u32()?;

        if !reader.is_empty() {
            return Err(SwapError::Validation(
                "Trailing bytes after transaction.".to_string(),
            ));
        }

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Parse a raw transaction from hex, as received from a counterparty.
    pub fn from_hex(raw_transaction: &str) -> Result<Self, SwapError> {
        let bytes = hex::decode(raw_transaction).map_err(|_| {
            SwapError::Validation("Given transaction is impossible to deserialize.".to_string())
        })?;
        Transaction::deserialize(&bytes).map_err(|_| {
            SwapError::Validation("Given transaction is impossible to deserialize.".to_string())
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Serialized length in bytes at the current state.
    pub fn size(&self) -> usize {
        self.serialize().len()
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    /// Transaction hash (double SHA-256) in internal byte order.
    pub fn txid(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    /// Transaction hash in display byte order, as used by explorers.
    pub fn txid_hex(&self) -> String {
        let mut hash = self.txid();
        hash.reverse();
        hex::encode(hash)
    }

    /// Legacy signature hash for one input.
    ///
    /// All other spending scripts are blanked and the signed input carries
    /// `script_code` (the locking script being satisfied, or the serialized
    /// contract for script-hash spends).
    pub fn signature_hash(
        &self,
        input_index: usize,
        script_code: &[u8],
        sighash_type: u32,
    ) -> Result<[u8; 32], SwapError> {
        if input_index >= self.inputs.len() {
            return Err(SwapError::Validation(
                "Input index out of bounds.".to_string(),
            ));
        }

        let mut tx_copy = self.clone();
        for input in &mut tx_copy.inputs {
            input.script_sig = Vec::new();
        }
        tx_copy.inputs[input_index].script_sig = script_code.to_vec();

        let mut preimage = tx_copy.serialize();
        preimage.extend_from_slice(&sighash_type.to_le_bytes());

        Ok(double_sha256(&preimage))
    }
}

// =============================================================================
// Varints & Digests
// =============================================================================

/// Encode a u64 as a Bitcoin varint.
pub fn write_varint(buf: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

// =============================================================================
// Bounded Reader
// =============================================================================

pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], SwapError> {
        if self.pos + len > self.buf.len() {
            return Err(SwapError::Validation("Unexpected end of data.".to_string()));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, SwapError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, SwapError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, SwapError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, SwapError> {
        let bytes = self.read_bytes(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(arr))
    }

    pub fn read_varint(&mut self) -> Result<u64, SwapError> {
        match self.read_u8()? {
            0xfd => Ok(self.read_u16()? as u64),
            0xfe => Ok(self.read_u32()? as u64),
            0xff => self.read_u64(),
            n => Ok(n as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::p2pkh_script;

    fn sample_transaction() -> Transaction {
        let outpoint = OutPoint::from_hex(&"ab".repeat(32), 1).unwrap();
        Transaction {
            version: 1,
            inputs: vec![TxIn::new(outpoint)],
            outputs: vec![TxOut {
                value: 70_000_000,
                script_pubkey: p2pkh_script(&[0x11; 20]),
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn test_empty_transaction_round_trip() {
        // version + two zero counts + locktime = 10 bytes
        let tx = Transaction::new();
        let bytes = tx.serialize();
        assert_eq!(bytes.len(), 10);
        assert_eq!(hex::encode(&bytes), "01000000000000000000");

        let decoded = Transaction::deserialize(&bytes).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn test_round_trip() {
        let tx = sample_transaction();
        let decoded = Transaction::from_hex(&tx.to_hex()).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn test_deserialize_known_transaction() {
        // Mainnet spend with one P2SH output and one P2PKH change output
        let raw = "0100000001350ff23c56027e3f7b8206d01a8fa2302d7ef82898e7ac795674a4e6450dd427000000008a47\
                   3044022033a4d693aedc99fea12d03acb07d3fbd2c26eb1da88df2820a2544058010a750022032195aaed8\
                   e773fa984bb3fe98ab138f6af36a500151f910a473f437bd63631501410402282aa6329ceada82ebcd53af\
                   7b1739cbc958e137ddde2b5da21183fa545b54cf75ce0c2296af902d53dd2a06fd783b7d8de00d74e612e8\
                   52bfee952d6744e70000000002a0e92f000000000017a914a2e40d94f0fa9d2bb8b6f424607f44a2e153da\
                   6f87c059693b000000001976a9143dfd3bba567574ba0508d01a96e89300af292b0688ac00000000";
        let tx = Transaction::from_hex(raw).unwrap();

        assert_eq!(tx.version, 1);
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[0].value, 0x002f_e9a0);
        assert_eq!(tx.outputs[0].script_pubkey[0], 0xa9); // OP_HASH160 (P2SH)
        assert_eq!(tx.to_hex(), raw.replace(' ', ""));
    }

    #[test]
    fn test_deserialize_garbage_fails() {
        assert!(Transaction::from_hex("I am an invalid transaction :)").is_err());
        assert!(Transaction::from_hex("0100").is_err());
        // Valid transaction with trailing bytes
        let mut bytes = Transaction::new().serialize();
        bytes.push(0x00);
        assert!(Transaction::deserialize(&bytes).is_err());
    }

    #[test]
    fn test_txid_is_reversed_double_sha() {
        let tx = sample_transaction();
        let mut expected = double_sha256(&tx.serialize());
        expected.reverse();
        assert_eq!(tx.txid_hex(), hex::encode(expected));
    }

    #[test]
    fn test_varint_boundaries() {
        for n in [0u64, 0xfc, 0xfd, 0xffff, 0x10000, 0xffff_ffff, 0x1_0000_0000] {
            let mut buf = Vec::new();
            write_varint(&mut buf, n);
            let mut reader = Reader::new(&buf);
            assert_eq!(reader.read_varint().unwrap(), n);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn test_signature_hash_blanks_other_inputs() {
        let mut tx = sample_transaction();
        tx.inputs.push(TxIn::new(OutPoint::from_hex(&"cd".repeat(32), 0).unwrap()));
        tx.inputs[0].script_sig = vec![0xde, 0xad];
        tx.inputs[1].script_sig = vec![0xbe, 0xef];

        let script_code = p2pkh_script(&[0x22; 20]);
        let digest_a = tx.signature_hash(0, &script_code, SIGHASH_ALL).unwrap();

        // Existing spending scripts must not influence the digest
        tx.inputs[1].script_sig = vec![0xff; 40];
        let digest_b = tx.signature_hash(0, &script_code, SIGHASH_ALL).unwrap();
        assert_eq!(digest_a, digest_b);

        assert!(tx.signature_hash(5, &script_code, SIGHASH_ALL).is_err());
    }
}
