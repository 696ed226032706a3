//! Minimal ABI helpers for the governance contract surface.
//!
//! Only what the ledger reader needs: 4-byte selectors, event topics,
//! uint argument encoding, and decoding of 32-byte-word return data
//! (uint, bool, address, dynamic string). Word reads validate range so
//! corrupt return data surfaces as a decode error, never a panic.

use sha3::{Digest, Keccak256};

const WORD: usize = 32;

/// Keccak-256 of a signature string.
fn keccak(signature: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// 4-byte function selector for a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak(signature);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// `topics[0]` value for an event signature, 0x-prefixed.
pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak(signature)))
}

/// A u64 encoded as a 32-byte big-endian word, 0x-prefixed.
/// Usable both as calldata argument and as an indexed log topic.
pub fn uint_word(value: u64) -> String {
    format!("0x{:064x}", value)
}

/// Calldata for `signature` with uint arguments, 0x-prefixed.
pub fn encode_call(signature: &str, args: &[u64]) -> String {
    let mut data = String::with_capacity(2 + 8 + args.len() * 64);
    data.push_str("0x");
    data.push_str(&hex::encode(selector(signature)));
    for arg in args {
        data.push_str(&format!("{:064x}", arg));
    }
    data
}

/// Decoded return data, addressed word by word.
#[derive(Debug, Clone)]
pub struct Words {
    bytes: Vec<u8>,
}

impl Words {
    /// Parse 0x-prefixed hex return data. Length must be word-aligned.
    pub fn parse(data: &str) -> Result<Self, String> {
        let bytes = hex::decode(data.trim_start_matches("0x"))
            .map_err(|e| format!("invalid hex return data: {}", e))?;
        if bytes.len() % WORD != 0 {
            return Err(format!(
                "return data length {} is not word-aligned",
                bytes.len()
            ));
        }
        Ok(Words { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / WORD
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn word(&self, index: usize) -> Result<&[u8], String> {
        self.bytes
            .get(index * WORD..(index + 1) * WORD)
            .ok_or_else(|| format!("word {} out of range ({} words)", index, self.len()))
    }

    /// Word `index` as u64. Errors if the value exceeds u64.
    pub fn uint(&self, index: usize) -> Result<u64, String> {
        let word = self.word(index)?;
        if word[..WORD - 8].iter().any(|b| *b != 0) {
            return Err(format!("uint at word {} exceeds u64", index));
        }
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&word[WORD - 8..]);
        Ok(u64::from_be_bytes(tail))
    }

    /// Word `index` as bool. Must be exactly 0 or 1.
    pub fn boolean(&self, index: usize) -> Result<bool, String> {
        match self.uint(index)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(format!("bool at word {} has value {}", index, other)),
        }
    }

    /// Word `index` as a 0x-prefixed lowercase address (last 20 bytes).
    pub fn address(&self, index: usize) -> Result<String, String> {
        let word = self.word(index)?;
        Ok(format!("0x{}", hex::encode(&word[WORD - 20..])))
    }

    /// Dynamic string whose offset lives at word `index`.
    pub fn string(&self, index: usize) -> Result<String, String> {
        let offset = self.uint(index)? as usize;
        if offset % WORD != 0 {
            return Err(format!("string offset {} is not word-aligned", offset));
        }
        let len_word = offset / WORD;
        let len = self.uint(len_word)? as usize;
        let start = offset + WORD;
        let end = start
            .checked_add(len)
            .ok_or_else(|| "string length overflows".to_string())?;
        let raw = self
            .bytes
            .get(start..end)
            .ok_or_else(|| format!("string data {}..{} out of range", start, end))?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_vector() {
        // keccak("transfer(address,uint256)")[..4] == a9059cbb
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn uint_word_is_padded() {
        let word = uint_word(7);
        assert_eq!(word.len(), 2 + 64);
        assert!(word.ends_with("07"));
    }

    #[test]
    fn encode_call_appends_arguments() {
        let data = encode_call("getProposal(uint256)", &[3]);
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.ends_with("03"));
    }

    #[test]
    fn uint_decode_and_overflow_guard() {
        let words = Words::parse(&uint_word(42)).unwrap();
        assert_eq!(words.uint(0).unwrap(), 42);

        let big = format!("0x01{}", "00".repeat(31));
        let words = Words::parse(&big).unwrap();
        assert!(words.uint(0).is_err());
    }

    #[test]
    fn boolean_rejects_nonbinary() {
        let words = Words::parse(&uint_word(2)).unwrap();
        assert!(words.boolean(0).is_err());
        assert!(Words::parse(&uint_word(1)).unwrap().boolean(0).unwrap());
    }

    #[test]
    fn address_takes_low_twenty_bytes() {
        let mut padded = "0x".to_string();
        padded.push_str(&"00".repeat(12));
        padded.push_str(&"ab".repeat(20));
        let words = Words::parse(&padded).unwrap();
        assert_eq!(
            words.address(0).unwrap(),
            format!("0x{}", "ab".repeat(20))
        );
    }

    #[test]
    fn string_decode() {
        // Layout: [offset=0x20][len=5]["hello" padded]
        let mut data = "0x".to_string();
        data.push_str(&format!("{:064x}", 0x20));
        data.push_str(&format!("{:064x}", 5));
        data.push_str(&hex::encode("hello"));
        data.push_str(&"00".repeat(27));
        let words = Words::parse(&data).unwrap();
        assert_eq!(words.string(0).unwrap(), "hello");
    }

    #[test]
    fn truncated_data_is_an_error_not_a_panic() {
        let mut data = "0x".to_string();
        data.push_str(&format!("{:064x}", 0x20));
        // Offset points past the end.
        let words = Words::parse(&data).unwrap();
        assert!(words.string(0).is_err());
        assert!(words.uint(9).is_err());
    }
}
