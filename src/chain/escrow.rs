//! Typed surface over the escrow contract.
//!
//! Reads go through the fault-tolerant reader; writes are legacy
//! transactions signed locally and pushed through the same endpoint pool.
//! Submitting an identical signed transaction twice yields the same hash,
//! so retrying a send across endpoints cannot double-spend.

use crate::chain::abi::{
    encode_address, encode_call, encode_call_with_bytes, encode_u256, keccak256, rlp_bytes,
    rlp_list, rlp_uint, selector, word_at, word_to_address, word_to_bytes32, word_to_u128,
    word_to_u64, word_to_u8,
};
use crate::chain::reader::FallbackReader;
use crate::chain::rpc::RpcClient;
use crate::chain::ChainGateway;
use crate::errors::{OracleError, OracleResult, ProviderError};
use crate::game::signer::Attestation;
use crate::game::types::{Address, GameMode, Room, RoomId, RoomStatus};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result of a submitted resolution.
///
/// `SubmittedUnconfirmed` is a distinct terminal outcome: the transaction
/// was accepted by the pool but no receipt arrived within the deadline.
/// Callers poll the hash themselves from there.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Confirmed { tx_hash: String, gas_used: u64 },
    SubmittedUnconfirmed { tx_hash: String },
}

pub struct EscrowContract {
    address: Address,
    chain_id: u64,
    rpc: RpcClient,
    reader: FallbackReader,
    tx_key: SigningKey,
    sender: Address,
    gas_limit: u64,
    gas_price_fallback: u128,
    confirm_timeout: Duration,
    confirm_poll: Duration,
}

impl EscrowContract {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: Address,
        chain_id: u64,
        rpc: RpcClient,
        reader: FallbackReader,
        tx_key: SigningKey,
        sender: Address,
        gas_limit: u64,
        gas_price_fallback: u128,
        confirm_timeout: Duration,
        confirm_poll: Duration,
    ) -> Self {
        Self {
            address,
            chain_id,
            rpc,
            reader,
            tx_key,
            sender,
            gas_limit,
            gas_price_fallback,
            confirm_timeout,
            confirm_poll,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, ProviderError> {
        let rpc = &self.rpc;
        let to = self.address;
        let data = &data;
        self.reader
            .read(|endpoint| async move { rpc.eth_call(&endpoint, &to, data).await })
            .await
    }

    fn decode_room(&self, data: &[u8], with_cards: bool) -> OracleResult<Room> {
        let decode_err = |message: String| {
            OracleError::Provider(ProviderError::Decode {
                endpoint: self.address.to_string(),
                message,
            })
        };

        let expected = if with_cards { 12 } else { 10 };
        if data.len() < expected * 32 {
            return Err(decode_err(format!(
                "room tuple too short: {} bytes, expected {} words",
                data.len(),
                expected
            )));
        }

        let word = |i: usize| word_at(data, i).expect("length checked above");

        let status_raw = word_to_u8(word(6));
        let status = RoomStatus::from_u8(status_raw)
            .ok_or_else(|| decode_err(format!("unknown room status {}", status_raw)))?;
        let mode_raw = word_to_u8(word(5));
        let game_mode = GameMode::from_u8(mode_raw)
            .ok_or_else(|| decode_err(format!("unknown game mode {}", mode_raw)))?;

        let card_selections = if with_cards {
            Some((word_to_u8(word(10)), word_to_u8(word(11))))
        } else {
            None
        };

        Ok(Room {
            id: RoomId(word_to_bytes32(word(0))),
            player1: word_to_address(word(1)),
            player2: word_to_address(word(2)),
            stake: word_to_u128(word(3)),
            tier: word_to_u8(word(4)),
            game_mode,
            status,
            winner: word_to_address(word(7)),
            created_at: word_to_u64(word(8)),
            resolved_at: word_to_u64(word(9)),
            card_selections,
        })
    }

    /// Emergency escape hatch: return escrowed funds without an outcome.
    pub async fn emergency_withdraw(&self, room_id: &RoomId) -> OracleResult<SubmitOutcome> {
        let data = encode_call(
            selector("emergencyWithdrawRoom(bytes32)"),
            &[*room_id.as_bytes()],
        );
        self.send_transaction(data).await
    }

    /// Sign and submit a legacy transaction carrying `data`, then wait for
    /// the receipt within the configured deadline.
    async fn send_transaction(&self, data: Vec<u8>) -> OracleResult<SubmitOutcome> {
        let rpc = &self.rpc;
        let sender = self.sender;

        let nonce = self
            .reader
            .read(|endpoint| async move { rpc.transaction_count(&endpoint, &sender).await })
            .await?;

        let gas_price = match self
            .reader
            .read(|endpoint| async move { rpc.gas_price(&endpoint).await })
            .await
        {
            Ok(price) => price,
            Err(e) => {
                warn!(error = %e, fallback = self.gas_price_fallback, "gas price lookup failed, using fallback");
                self.gas_price_fallback
            }
        };

        let raw = self.sign_legacy_transaction(nonce, gas_price, &data)?;

        let raw_ref = &raw;
        let tx_hash = self
            .reader
            .read(|endpoint| async move { rpc.send_raw_transaction(&endpoint, raw_ref).await })
            .await?;

        info!(tx_hash = tx_hash.as_str(), nonce, "resolution transaction submitted");
        self.wait_for_receipt(tx_hash).await
    }

    fn sign_legacy_transaction(
        &self,
        nonce: u64,
        gas_price: u128,
        data: &[u8],
    ) -> OracleResult<Vec<u8>> {
        let base_fields = |v: Vec<u8>, r: Vec<u8>, s: Vec<u8>| {
            vec![
                rlp_uint(nonce as u128),
                rlp_uint(gas_price),
                rlp_uint(self.gas_limit as u128),
                rlp_bytes(self.address.as_bytes()),
                rlp_uint(0),
                rlp_bytes(data),
                v,
                r,
                s,
            ]
        };

        let sighash = keccak256(&rlp_list(&base_fields(
            rlp_uint(self.chain_id as u128),
            rlp_uint(0),
            rlp_uint(0),
        )));

        let (signature, recovery_id) = self
            .tx_key
            .sign_prehash_recoverable(&sighash)
            .map_err(|e| OracleError::Signing(e.to_string()))?;

        let sig_bytes = signature.to_bytes();
        let v = self.chain_id * 2 + 35 + recovery_id.to_byte() as u64;

        Ok(rlp_list(&base_fields(
            rlp_uint(v as u128),
            rlp_trimmed(&sig_bytes[..32]),
            rlp_trimmed(&sig_bytes[32..]),
        )))
    }

    async fn wait_for_receipt(&self, tx_hash: String) -> OracleResult<SubmitOutcome> {
        let deadline = Instant::now() + self.confirm_timeout;
        let rpc = &self.rpc;

        loop {
            let hash_ref = tx_hash.as_str();
            let receipt = self
                .reader
                .read(|endpoint| async move { rpc.transaction_receipt(&endpoint, hash_ref).await })
                .await?;

            if let Some(receipt) = receipt {
                if !receipt.succeeded {
                    return Err(OracleError::ContractRevert(format!(
                        "transaction {} reverted on-chain",
                        tx_hash
                    )));
                }
                info!(
                    tx_hash = tx_hash.as_str(),
                    gas_used = receipt.gas_used,
                    block = receipt.block_number,
                    "resolution confirmed"
                );
                return Ok(SubmitOutcome::Confirmed {
                    tx_hash,
                    gas_used: receipt.gas_used,
                });
            }

            if Instant::now() >= deadline {
                warn!(tx_hash = tx_hash.as_str(), "confirmation deadline passed, reporting unconfirmed");
                return Ok(SubmitOutcome::SubmittedUnconfirmed { tx_hash });
            }
            tokio::time::sleep(self.confirm_poll).await;
        }
    }
}

#[async_trait]
impl ChainGateway for EscrowContract {
    async fn room_id_at(&self, index: u64) -> OracleResult<RoomId> {
        let data = encode_call(selector("roomAt(uint256)"), &[encode_u256(index as u128)]);
        let out = self.call(data).await?;
        let word = word_at(&out, 0).ok_or(OracleError::Provider(ProviderError::Decode {
            endpoint: self.address.to_string(),
            message: "roomAt returned fewer than 32 bytes".to_string(),
        }))?;
        Ok(RoomId(word_to_bytes32(word)))
    }

    async fn room_by_id(&self, id: &RoomId) -> OracleResult<Room> {
        let data = encode_call(selector("getRoom(bytes32)"), &[*id.as_bytes()]);
        let out = self.call(data).await?;
        let room = self.decode_room(&out, false)?;

        // Cards rooms carry two extra selection fields on a separate call.
        if room.game_mode == GameMode::Cards {
            let data = encode_call(selector("getCardRoom(bytes32)"), &[*id.as_bytes()]);
            let out = self.call(data).await?;
            return self.decode_room(&out, true);
        }
        Ok(room)
    }

    async fn submit_resolution(&self, attestation: &Attestation) -> OracleResult<SubmitOutcome> {
        let data = if attestation.is_draw() {
            encode_call_with_bytes(
                selector("resolveRoomDraw(bytes32,bytes32,bytes)"),
                &[*attestation.room_id.as_bytes(), attestation.nonce],
                &attestation.signature,
            )
        } else {
            encode_call_with_bytes(
                selector("resolveRoom(bytes32,address,bytes32,bytes)"),
                &[
                    *attestation.room_id.as_bytes(),
                    encode_address(&attestation.winner),
                    attestation.nonce,
                ],
                &attestation.signature,
            )
        };
        self.send_transaction(data).await
    }
}

/// RLP big-integer form: strip leading zeros so r/s encode minimally.
fn rlp_trimmed(bytes: &[u8]) -> Vec<u8> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    rlp_bytes(&bytes[first..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rlp_trimmed_strips_leading_zeros() {
        assert_eq!(rlp_trimmed(&[0, 0, 0x12, 0x34]), vec![0x82, 0x12, 0x34]);
        assert_eq!(rlp_trimmed(&[0, 0]), vec![0x80]);
    }

    #[test]
    fn decode_room_rejects_short_blobs() {
        let contract = test_contract();
        let result = contract.decode_room(&[0u8; 64], false);
        assert!(result.is_err());
    }

    #[test]
    fn decode_room_reads_all_fields() {
        let contract = test_contract();
        let mut data = Vec::new();
        data.extend_from_slice(&[0x11; 32]); // id
        data.extend_from_slice(&encode_address(&Address([0x22; 20]))); // player1
        data.extend_from_slice(&encode_address(&Address([0x33; 20]))); // player2
        data.extend_from_slice(&encode_u256(1_000)); // stake
        data.extend_from_slice(&encode_u256(2)); // tier
        data.extend_from_slice(&encode_u256(0)); // mode: duel
        data.extend_from_slice(&encode_u256(2)); // status: InGame
        data.extend_from_slice(&encode_address(&Address::ZERO)); // winner
        data.extend_from_slice(&encode_u256(1_700_000_000)); // createdAt
        data.extend_from_slice(&encode_u256(0)); // resolvedAt

        let room = contract.decode_room(&data, false).unwrap();
        assert_eq!(room.id, RoomId([0x11; 32]));
        assert_eq!(room.player1, Address([0x22; 20]));
        assert_eq!(room.stake, 1_000);
        assert_eq!(room.status, RoomStatus::InGame);
        assert_eq!(room.game_mode, GameMode::Duel);
        assert!(room.winner.is_zero());
        assert!(room.card_selections.is_none());
    }

    fn test_contract() -> EscrowContract {
        let key = SigningKey::from_slice(&[0x01; 32]).unwrap();
        EscrowContract::new(
            Address([0xcc; 20]),
            1,
            RpcClient::new(Duration::from_secs(5)),
            FallbackReader::new(vec![], 1, Duration::from_millis(1)),
            key,
            Address([0xdd; 20]),
            300_000,
            1_000_000_000,
            Duration::from_secs(1),
            Duration::from_millis(100),
        )
    }
}
