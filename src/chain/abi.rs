//! Minimal ABI and RLP plumbing for the escrow contract surface.
//!
//! Only the encodings the oracle actually calls are implemented: static
//! words, one trailing dynamic `bytes` argument, and legacy transaction
//! RLP envelopes.

use crate::game::types::Address;
use sha3::{Digest, Keccak256};

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// First four bytes of the keccak of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Left-pad a u128 into a 32-byte ABI word.
pub fn encode_u256(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Left-pad an address into a 32-byte ABI word.
pub fn encode_address(addr: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(addr.as_bytes());
    word
}

/// Build call data from a selector and static 32-byte words.
pub fn encode_call(sel: [u8; 4], words: &[[u8; 32]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + words.len() * 32);
    data.extend_from_slice(&sel);
    for word in words {
        data.extend_from_slice(word);
    }
    data
}

/// Build call data with static words followed by one dynamic `bytes`
/// argument (head holds the offset, tail holds length + padded payload).
pub fn encode_call_with_bytes(sel: [u8; 4], words: &[[u8; 32]], bytes: &[u8]) -> Vec<u8> {
    let head_words = words.len() + 1;
    let mut data = Vec::with_capacity(4 + head_words * 32 + 64 + bytes.len());
    data.extend_from_slice(&sel);
    for word in words {
        data.extend_from_slice(word);
    }
    data.extend_from_slice(&encode_u256((head_words * 32) as u128));
    data.extend_from_slice(&encode_u256(bytes.len() as u128));
    data.extend_from_slice(bytes);
    let padding = (32 - bytes.len() % 32) % 32;
    data.extend_from_slice(&vec![0u8; padding]);
    data
}

/// Borrow the i-th 32-byte word of an ABI return blob.
pub fn word_at(data: &[u8], index: usize) -> Option<&[u8]> {
    let start = index * 32;
    data.get(start..start + 32)
}

pub fn word_to_bytes32(word: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&word[..32]);
    out
}

pub fn word_to_address(word: &[u8]) -> Address {
    let mut out = [0u8; 20];
    out.copy_from_slice(&word[12..32]);
    Address(out)
}

pub fn word_to_u128(word: &[u8]) -> u128 {
    let mut out = [0u8; 16];
    out.copy_from_slice(&word[16..32]);
    u128::from_be_bytes(out)
}

pub fn word_to_u64(word: &[u8]) -> u64 {
    let mut out = [0u8; 8];
    out.copy_from_slice(&word[24..32]);
    u64::from_be_bytes(out)
}

pub fn word_to_u8(word: &[u8]) -> u8 {
    word[31]
}

/// RLP-encode a byte string.
pub fn rlp_bytes(b: &[u8]) -> Vec<u8> {
    if b.len() == 1 && b[0] < 0x80 {
        return b.to_vec();
    }
    if b.len() <= 55 {
        let mut out = vec![0x80 + b.len() as u8];
        out.extend_from_slice(b);
        return out;
    }
    let len_bytes = minimal_be_bytes(b.len() as u128);
    let mut out = vec![0xb7 + len_bytes.len() as u8];
    out.extend_from_slice(&len_bytes);
    out.extend_from_slice(b);
    out
}

/// RLP-encode an unsigned integer (minimal big-endian form).
pub fn rlp_uint(value: u128) -> Vec<u8> {
    if value == 0 {
        return vec![0x80];
    }
    rlp_bytes(&minimal_be_bytes(value))
}

/// RLP-encode a list of already-encoded items.
pub fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len: usize = items.iter().map(|i| i.len()).sum();
    let mut payload = Vec::with_capacity(payload_len);
    for item in items {
        payload.extend_from_slice(item);
    }
    if payload_len <= 55 {
        let mut out = vec![0xc0 + payload_len as u8];
        out.extend_from_slice(&payload);
        return out;
    }
    let len_bytes = minimal_be_bytes(payload_len as u128);
    let mut out = vec![0xf7 + len_bytes.len() as u8];
    out.extend_from_slice(&len_bytes);
    out.extend_from_slice(&payload);
    out
}

fn minimal_be_bytes(value: u128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Parse a JSON-RPC hex quantity ("0x1a") into a u128.
pub fn parse_quantity(s: &str) -> Option<u128> {
    let stripped = s.strip_prefix("0x")?;
    if stripped.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(stripped, 16).ok()
}

/// Parse 0x-prefixed hex data into bytes.
pub fn parse_hex_data(s: &str) -> Option<Vec<u8>> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped).ok()
}
