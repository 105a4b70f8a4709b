//! Log record codec
//!
//! Three record kinds share a self-describing binary format:
//!
//! ```text
//! kind: u8                 // 0x01 Write, 0x02 Transaction, 0x03 Decision
//! body_len: varint
//! body                     // kind-specific fields, varint + length-prefixed
//! ```
//!
//! Encoded records are opaque bytes to the log; round-trip through
//! encode/decode is exact.

use crate::error::{Error, Result};
use crate::varint::{decode_varint, encode_varint};
use crate::TxIndex;

const TAG_WRITE: u8 = 0x01;
const TAG_TRANSACTION: u8 = 0x02;
const TAG_DECISION: u8 = 0x03;

/// Maximum byte length of a key in a record.
pub const MAX_KEY_LEN: usize = 4096;

/// Maximum byte length of a value in a record.
pub const MAX_VALUE_LEN: usize = 1 << 20;

/// Maximum number of conditions or writes in one transaction record.
pub const MAX_TX_OPS: usize = 1024;

/// Single-key ingest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl WriteRecord {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Precondition of a transaction: key K was last committed at `index`
/// (0 = K absent).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub key: Vec<u8>,
    pub index: TxIndex,
}

impl Condition {
    pub fn new(key: impl Into<Vec<u8>>, index: TxIndex) -> Self {
        Self {
            key: key.into(),
            index,
        }
    }
}

/// Conditional multi-key proposal
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TransactionRecord {
    pub conditions: Vec<Condition>,
    pub writes: Vec<WriteRecord>,
}

/// Outcome for the transaction proposed at `tx_index`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecisionRecord {
    pub tx_index: TxIndex,
    pub commit: bool,
}

/// Tagged union of everything that can be appended to the log
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogRecord {
    Write(WriteRecord),
    Transaction(TransactionRecord),
    Decision(DecisionRecord),
}

impl LogRecord {
    /// The kind tag byte this record encodes with
    pub fn kind_tag(&self) -> u8 {
        match self {
            LogRecord::Write(_) => TAG_WRITE,
            LogRecord::Transaction(_) => TAG_TRANSACTION,
            LogRecord::Decision(_) => TAG_DECISION,
        }
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(64);
        match self {
            LogRecord::Write(w) => {
                encode_kv(w, &mut body)?;
            }
            LogRecord::Transaction(tx) => {
                if tx.conditions.len() > MAX_TX_OPS {
                    return Err(Error::encode(format!(
                        "transaction has {} conditions, max is {MAX_TX_OPS}",
                        tx.conditions.len()
                    )));
                }
                if tx.writes.len() > MAX_TX_OPS {
                    return Err(Error::encode(format!(
                        "transaction has {} writes, max is {MAX_TX_OPS}",
                        tx.writes.len()
                    )));
                }
                encode_varint(tx.conditions.len() as u64, &mut body);
                for cond in &tx.conditions {
                    encode_len_bytes(&cond.key, MAX_KEY_LEN, &mut body)?;
                    encode_varint(cond.index, &mut body);
                }
                encode_varint(tx.writes.len() as u64, &mut body);
                for w in &tx.writes {
                    encode_kv(w, &mut body)?;
                }
            }
            LogRecord::Decision(d) => {
                encode_varint(d.tx_index, &mut body);
                body.push(u8::from(d.commit));
            }
        }

        let mut buf = Vec::with_capacity(body.len() + 6);
        buf.push(self.kind_tag());
        encode_varint(body.len() as u64, &mut buf);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Decode from wire bytes. The input must contain exactly one record.
    pub fn decode(data: &[u8]) -> Result<LogRecord> {
        let mut pos = 0;
        let kind = take_byte(data, &mut pos)?;
        let body_len = decode_varint(data, &mut pos)? as usize;
        if pos + body_len != data.len() {
            return Err(Error::decode(format!(
                "record body length {body_len} does not match remaining {} bytes",
                data.len() - pos
            )));
        }

        let record = match kind {
            TAG_WRITE => LogRecord::Write(decode_kv(data, &mut pos)?),
            TAG_TRANSACTION => {
                let cond_count = decode_count(data, &mut pos, MAX_TX_OPS, "conditions")?;
                let mut conditions = Vec::with_capacity(cond_count);
                for _ in 0..cond_count {
                    let key = decode_len_bytes(data, &mut pos, MAX_KEY_LEN)?;
                    let index = decode_varint(data, &mut pos)?;
                    conditions.push(Condition { key, index });
                }
                let write_count = decode_count(data, &mut pos, MAX_TX_OPS, "writes")?;
                let mut writes = Vec::with_capacity(write_count);
                for _ in 0..write_count {
                    writes.push(decode_kv(data, &mut pos)?);
                }
                LogRecord::Transaction(TransactionRecord { conditions, writes })
            }
            TAG_DECISION => {
                let tx_index = decode_varint(data, &mut pos)?;
                let commit = match take_byte(data, &mut pos)? {
                    0 => false,
                    1 => true,
                    b => {
                        return Err(Error::decode(format!(
                            "invalid decision commit byte 0x{b:02x}"
                        )))
                    }
                };
                LogRecord::Decision(DecisionRecord { tx_index, commit })
            }
            other => return Err(Error::decode(format!("unknown record kind 0x{other:02x}"))),
        };

        if pos != data.len() {
            return Err(Error::decode(format!(
                "trailing bytes: consumed {pos} of {}",
                data.len()
            )));
        }
        Ok(record)
    }
}

fn encode_kv(w: &WriteRecord, buf: &mut Vec<u8>) -> Result<()> {
    encode_len_bytes(&w.key, MAX_KEY_LEN, buf)?;
    encode_len_bytes(&w.value, MAX_VALUE_LEN, buf)
}

fn decode_kv(data: &[u8], pos: &mut usize) -> Result<WriteRecord> {
    let key = decode_len_bytes(data, pos, MAX_KEY_LEN)?;
    let value = decode_len_bytes(data, pos, MAX_VALUE_LEN)?;
    Ok(WriteRecord { key, value })
}

fn encode_len_bytes(bytes: &[u8], max: usize, buf: &mut Vec<u8>) -> Result<()> {
    if bytes.len() > max {
        return Err(Error::encode(format!(
            "field length {} exceeds maximum {max}",
            bytes.len()
        )));
    }
    encode_varint(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
    Ok(())
}

fn decode_len_bytes(data: &[u8], pos: &mut usize, max: usize) -> Result<Vec<u8>> {
    let len64 = decode_varint(data, pos)?;
    if len64 > max as u64 {
        return Err(Error::decode(format!(
            "field length {len64} exceeds maximum {max}"
        )));
    }
    let len = len64 as usize;
    if *pos + len > data.len() {
        return Err(Error::UnexpectedEof);
    }
    let out = data[*pos..*pos + len].to_vec();
    *pos += len;
    Ok(out)
}

fn decode_count(data: &[u8], pos: &mut usize, max: usize, what: &str) -> Result<usize> {
    let count = decode_varint(data, pos)?;
    if count > max as u64 {
        return Err(Error::decode(format!(
            "{what} count {count} exceeds maximum {max}"
        )));
    }
    Ok(count as usize)
}

fn take_byte(data: &[u8], pos: &mut usize) -> Result<u8> {
    if *pos >= data.len() {
        return Err(Error::UnexpectedEof);
    }
    let b = data[*pos];
    *pos += 1;
    Ok(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(record: LogRecord) {
        let bytes = record.encode().unwrap();
        let decoded = LogRecord::decode(&bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_write_round_trip() {
        round_trip(LogRecord::Write(WriteRecord::new("a", "1")));
        round_trip(LogRecord::Write(WriteRecord::new(vec![0u8; 100], vec![])));
    }

    #[test]
    fn test_transaction_round_trip() {
        round_trip(LogRecord::Transaction(TransactionRecord {
            conditions: vec![Condition::new("a", 1), Condition::new("b", 2)],
            writes: vec![WriteRecord::new("c", "1+2")],
        }));
        round_trip(LogRecord::Transaction(TransactionRecord::default()));
    }

    #[test]
    fn test_decision_round_trip() {
        round_trip(LogRecord::Decision(DecisionRecord {
            tx_index: 3,
            commit: true,
        }));
        round_trip(LogRecord::Decision(DecisionRecord {
            tx_index: u64::MAX,
            commit: false,
        }));
    }

    #[test]
    fn test_golden_bytes_decision() {
        let bytes = LogRecord::Decision(DecisionRecord {
            tx_index: 3,
            commit: true,
        })
        .encode()
        .unwrap();
        // kind 0x03, body_len 2, tx_index varint 3, commit 1
        assert_eq!(bytes, vec![0x03, 0x02, 0x03, 0x01]);
    }

    #[test]
    fn test_golden_bytes_write() {
        let bytes = LogRecord::Write(WriteRecord::new("a", "1")).encode().unwrap();
        // kind 0x01, body_len 4, key_len 1, 'a', value_len 1, '1'
        assert_eq!(bytes, vec![0x01, 0x04, 0x01, b'a', 0x01, b'1']);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = LogRecord::decode(&[0x7f, 0x00]).unwrap_err();
        assert!(err.to_string().contains("unknown record kind"));
    }

    #[test]
    fn test_truncation_rejected() {
        let bytes = LogRecord::Transaction(TransactionRecord {
            conditions: vec![Condition::new("key", 9)],
            writes: vec![WriteRecord::new("k2", "v2")],
        })
        .encode()
        .unwrap();
        for cut in 0..bytes.len() {
            assert!(
                LogRecord::decode(&bytes[..cut]).is_err(),
                "cut at {cut} should fail"
            );
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = LogRecord::Write(WriteRecord::new("a", "1")).encode().unwrap();
        bytes.push(0);
        assert!(LogRecord::decode(&bytes).is_err());
    }

    #[test]
    fn test_oversize_value_rejected() {
        let record = LogRecord::Write(WriteRecord::new("a", vec![0u8; MAX_VALUE_LEN + 1]));
        assert!(record.encode().is_err());
    }

    #[test]
    fn test_bad_commit_byte_rejected() {
        let bytes = vec![0x03, 0x02, 0x03, 0x02];
        assert!(LogRecord::decode(&bytes).is_err());
    }
}
