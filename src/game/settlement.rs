//! Settlement execution: decide a room's outcome, attest it, and
//! optionally submit the resolution on-chain.
//!
//! Every invocation is gated by the shared authorization secret. The
//! executor takes a short-lived advisory lock per room before doing any
//! work; the escrow contract's own status check remains the final
//! backstop against double resolution.

use crate::chain::{ChainGateway, SubmitOutcome};
use crate::errors::{OracleError, OracleResult};
use crate::game::decider::{decide, draw_token};
use crate::game::signer::{Attestation, OutcomeSigner};
use crate::game::types::{Address, Choice, GameRecord, Outcome, RoomId};
use crate::store::{load_game_record, room_lock_key, store_game_record, KvStore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementMode {
    /// Compute and sign only; the caller submits the transaction.
    SignOnly,
    /// Submit the resolve call and wait for confirmation.
    SubmitAndConfirm,
}

#[derive(Debug)]
pub struct SettlementResult {
    pub attestation: Attestation,
    pub outcome: Outcome,
    /// The fair token used, absent for forced draws and caller-supplied
    /// winners.
    pub token: Option<Choice>,
    pub submission: Option<SubmitOutcome>,
}

pub struct SettlementExecutor {
    chain: Arc<dyn ChainGateway>,
    store: Arc<dyn KvStore>,
    signer: OutcomeSigner,
    secret_hash: [u8; 32],
    lock_ttl: Duration,
}

impl SettlementExecutor {
    pub fn new(
        chain: Arc<dyn ChainGateway>,
        store: Arc<dyn KvStore>,
        signer: OutcomeSigner,
        shared_secret: &str,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            chain,
            store,
            signer,
            secret_hash: hash_secret(shared_secret),
            lock_ttl,
        }
    }

    pub fn oracle_address(&self) -> Address {
        self.signer.address()
    }

    /// Compare the caller's secret against the configured one. Hashes are
    /// compared instead of the raw strings.
    fn authorize(&self, secret: &str) -> OracleResult<()> {
        if hash_secret(secret) != self.secret_hash {
            return Err(OracleError::Unauthorized);
        }
        Ok(())
    }

    /// Run the settlement pipeline for one room.
    ///
    /// `requested_winner` lets a trusted caller dictate the outcome (the
    /// zero address meaning draw); when absent the outcome is decided
    /// from the recorded choices and a freshly drawn fair token.
    pub async fn execute(
        &self,
        secret: &str,
        room_id: RoomId,
        requested_winner: Option<Address>,
        mode: SettlementMode,
    ) -> OracleResult<SettlementResult> {
        self.authorize(secret)?;

        let lock_key = room_lock_key(&room_id);
        let acquired = self.store.set_nx(&lock_key, "1", self.lock_ttl).await?;
        if !acquired {
            return Err(OracleError::SettlementInProgress(room_id.to_string()));
        }

        let result = self.execute_locked(room_id, requested_winner, mode).await;
        // Advisory lock only; losing the delete just leaves it to expire.
        let _ = self.store.delete(&lock_key).await;
        result
    }

    async fn execute_locked(
        &self,
        room_id: RoomId,
        requested_winner: Option<Address>,
        mode: SettlementMode,
    ) -> OracleResult<SettlementResult> {
        let room = self.chain.room_by_id(&room_id).await?;
        if !room.status.is_resolvable() {
            return Err(OracleError::NotResolvable(room_id.to_string()));
        }

        let record = load_game_record(self.store.as_ref(), &room_id).await?;

        let (outcome, token) = match requested_winner {
            Some(addr) if addr.is_zero() => (Outcome::Draw, None),
            Some(addr) if addr == room.player1 => (Outcome::PlayerOne, None),
            Some(addr) if addr == room.player2 => (Outcome::PlayerTwo, None),
            Some(addr) => {
                return Err(OracleError::Validation(format!(
                    "winner {} is not a participant of room {}",
                    addr, room_id
                )))
            }
            None => {
                let choice1 = record.as_ref().and_then(|r| r.player1_choice);
                let choice2 = record.as_ref().and_then(|r| r.player2_choice);
                if choice1.is_none() || choice2.is_none() {
                    // Missing choice forces the refund path.
                    (Outcome::Draw, None)
                } else {
                    let token = draw_token(&mut rand::thread_rng());
                    (decide(choice1, choice2, token), Some(token))
                }
            }
        };

        let winner = match outcome {
            Outcome::PlayerOne => Some(room.player1),
            Outcome::PlayerTwo => Some(room.player2),
            Outcome::Draw => None,
        };

        let attestation = self.signer.sign_outcome(&room_id, winner)?;
        info!(
            room = %room_id,
            outcome = ?outcome,
            winner = %attestation.winner,
            "outcome attested"
        );

        let submission = match mode {
            SettlementMode::SignOnly => None,
            SettlementMode::SubmitAndConfirm => {
                Some(self.chain.submit_resolution(&attestation).await?)
            }
        };

        self.update_record(record, &room_id, outcome, token).await?;

        Ok(SettlementResult {
            attestation,
            outcome,
            token,
            submission,
        })
    }

    /// Advance the off-chain mirror so clients see the outcome without
    /// waiting for block confirmation.
    async fn update_record(
        &self,
        record: Option<GameRecord>,
        room_id: &RoomId,
        outcome: Outcome,
        token: Option<Choice>,
    ) -> OracleResult<()> {
        let mut record = record.unwrap_or_else(|| GameRecord::new(*room_id));
        if token.is_some() {
            record.flip = token;
        }
        record.status = Some(
            match outcome {
                Outcome::Draw => "draw",
                _ => "resolved",
            }
            .to_string(),
        );
        record.updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        store_game_record(self.store.as_ref(), &record).await
    }
}

fn hash_secret(secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}
