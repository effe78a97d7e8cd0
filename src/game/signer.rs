//! Outcome attestation signing.
//!
//! The oracle turns a decided outcome into a signed payload the escrow
//! contract verifies before releasing funds. The packed field order of the
//! message hash is part of the contract interface and must not change.

use crate::chain::abi::keccak256;
use crate::errors::{OracleError, OracleResult};
use crate::game::types::{Address, RoomId};
use k256::ecdsa::{SigningKey, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// A signed room outcome.
///
/// `winner` is the zero address for a draw. The nonce makes each signed
/// payload unique per signing attempt; whether the contract also tracks
/// consumed nonces per room is not verified here, so treat it as a
/// uniqueness aid rather than a replay boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    pub room_id: RoomId,
    pub winner: Address,
    pub nonce: [u8; 32],
    /// 65-byte recoverable secp256k1 signature (r ‖ s ‖ v).
    pub signature: Vec<u8>,
}

impl Attestation {
    pub fn is_draw(&self) -> bool {
        self.winner.is_zero()
    }

    pub fn nonce_hex(&self) -> String {
        format!("0x{}", hex::encode(self.nonce))
    }

    pub fn signature_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.signature))
    }
}

pub struct OutcomeSigner {
    key: SigningKey,
    address: Address,
}

impl OutcomeSigner {
    pub fn from_hex_key(hex_key: &str) -> OracleResult<Self> {
        let stripped = hex_key.strip_prefix("0x").unwrap_or(hex_key);
        let bytes = hex::decode(stripped)
            .map_err(|e| OracleError::Signing(format!("signing key is not valid hex: {}", e)))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|e| OracleError::Signing(format!("invalid signing key: {}", e)))?;
        let address = derive_address(key.verifying_key());
        Ok(Self { key, address })
    }

    /// Account address derived from the signing key.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    /// Fresh nonce per signing attempt: keccak(roomId ‖ timestamp_ms ‖ salt).
    pub fn derive_nonce(&self, room_id: &RoomId) -> [u8; 32] {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let mut salt = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut buf = Vec::with_capacity(32 + 8 + 32);
        buf.extend_from_slice(room_id.as_bytes());
        buf.extend_from_slice(&now_ms.to_be_bytes());
        buf.extend_from_slice(&salt);
        keccak256(&buf)
    }

    /// Packed message hash: keccak(roomId ‖ winnerOrZero ‖ nonce).
    /// Field order matches the contract's verification routine exactly.
    pub fn message_hash(room_id: &RoomId, winner: &Address, nonce: &[u8; 32]) -> [u8; 32] {
        let mut buf = Vec::with_capacity(32 + 20 + 32);
        buf.extend_from_slice(room_id.as_bytes());
        buf.extend_from_slice(winner.as_bytes());
        buf.extend_from_slice(nonce);
        keccak256(&buf)
    }

    /// Sign an outcome. `winner` of `None` (or the zero address) attests a
    /// draw. Applies the conventional signed-message prefix before signing.
    pub fn sign_outcome(
        &self,
        room_id: &RoomId,
        winner: Option<Address>,
    ) -> OracleResult<Attestation> {
        let winner = winner.unwrap_or(Address::ZERO);
        let nonce = self.derive_nonce(room_id);
        let message = Self::message_hash(room_id, &winner, &nonce);

        let mut prefixed = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + 32);
        prefixed.extend_from_slice(SIGNED_MESSAGE_PREFIX);
        prefixed.extend_from_slice(&message);
        let digest = keccak256(&prefixed);

        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| OracleError::Signing(e.to_string()))?;

        let mut bytes = Vec::with_capacity(65);
        bytes.extend_from_slice(&signature.to_bytes());
        bytes.push(27 + recovery_id.to_byte());

        Ok(Attestation {
            room_id: *room_id,
            winner,
            nonce,
            signature: bytes,
        })
    }
}

fn derive_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{RecoveryId, Signature};

    fn signer() -> OutcomeSigner {
        // Throwaway key, 0x01 repeated.
        OutcomeSigner::from_hex_key(&"01".repeat(32)).unwrap()
    }

    #[test]
    fn message_hash_is_deterministic() {
        let room = RoomId([0x22; 32]);
        let winner = Address([0x33; 20]);
        let nonce = [0x44; 32];
        assert_eq!(
            OutcomeSigner::message_hash(&room, &winner, &nonce),
            OutcomeSigner::message_hash(&room, &winner, &nonce)
        );
    }

    #[test]
    fn changing_any_field_changes_the_hash() {
        let room = RoomId([0x22; 32]);
        let winner = Address([0x33; 20]);
        let nonce = [0x44; 32];
        let base = OutcomeSigner::message_hash(&room, &winner, &nonce);

        assert_ne!(base, OutcomeSigner::message_hash(&RoomId([0x23; 32]), &winner, &nonce));
        assert_ne!(base, OutcomeSigner::message_hash(&room, &Address([0x34; 20]), &nonce));
        assert_ne!(base, OutcomeSigner::message_hash(&room, &winner, &[0x45; 32]));
    }

    #[test]
    fn nonces_differ_per_attempt() {
        let signer = signer();
        let room = RoomId([0x01; 32]);
        assert_ne!(signer.derive_nonce(&room), signer.derive_nonce(&room));
    }

    #[test]
    fn signature_is_65_bytes_and_recovers_to_signer() {
        let signer = signer();
        let room = RoomId([0x05; 32]);
        let winner = Address([0x06; 20]);
        let attestation = signer.sign_outcome(&room, Some(winner)).unwrap();

        assert_eq!(attestation.signature.len(), 65);
        assert!(!attestation.is_draw());

        let message = OutcomeSigner::message_hash(&room, &winner, &attestation.nonce);
        let mut prefixed = Vec::new();
        prefixed.extend_from_slice(SIGNED_MESSAGE_PREFIX);
        prefixed.extend_from_slice(&message);
        let digest = keccak256(&prefixed);

        let sig = Signature::from_slice(&attestation.signature[..64]).unwrap();
        let rec = RecoveryId::try_from(attestation.signature[64] - 27).unwrap();
        let recovered = VerifyingKey::recover_from_prehash(&digest, &sig, rec).unwrap();
        assert_eq!(derive_address(&recovered), signer.address());
    }

    #[test]
    fn draw_attestation_uses_zero_winner() {
        let signer = signer();
        let attestation = signer.sign_outcome(&RoomId([0x07; 32]), None).unwrap();
        assert!(attestation.is_draw());
        assert_eq!(attestation.winner, Address::ZERO);
    }
}
