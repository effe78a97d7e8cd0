//! State reconciliation: merge the authoritative on-chain room with the
//! off-chain convenience record into the view clients render.

use crate::chain::ChainGateway;
use crate::errors::OracleResult;
use crate::game::types::{GameRecord, GameView, Room, RoomId, UiStatus};
use crate::store::{load_game_record, KvStore};
use std::sync::Arc;

pub struct StateReconciler {
    chain: Arc<dyn ChainGateway>,
    store: Arc<dyn KvStore>,
}

impl StateReconciler {
    pub fn new(chain: Arc<dyn ChainGateway>, store: Arc<dyn KvStore>) -> Self {
        Self { chain, store }
    }

    pub async fn view(&self, room_id: &RoomId) -> OracleResult<GameView> {
        let room = self.chain.room_by_id(room_id).await?;
        let record = load_game_record(self.store.as_ref(), room_id).await?;
        Ok(merge(&room, record.as_ref()))
    }
}

/// The reconciliation rule.
///
/// The off-chain record may advance a non-terminal chain status to
/// `resolved`/`draw` (masking confirmation latency); the reverse never
/// happens, chain-terminal statuses win unconditionally. A missing flip
/// token with a declared winner is reconstructed from the winner's own
/// recorded choice, an approximation flagged via `flip_reconstructed`.
pub fn merge(room: &Room, record: Option<&GameRecord>) -> GameView {
    let chain_status = UiStatus::from_chain(room.status);

    let status = if chain_status.is_terminal() {
        chain_status
    } else {
        match record.and_then(|r| r.status.as_deref()) {
            Some("resolved") => UiStatus::Resolved,
            Some("draw") => UiStatus::Draw,
            _ => chain_status,
        }
    };

    let mut flip = record.and_then(|r| r.flip);
    let mut flip_reconstructed = false;
    if flip.is_none() && !room.winner.is_zero() {
        // Assume the declared winner's own choice was correct.
        flip = record.and_then(|r| r.choice_of(room, &room.winner));
        flip_reconstructed = flip.is_some();
    }

    GameView {
        room_id: room.id,
        status,
        player1: room.player1,
        player2: room.player2,
        stake: room.stake.to_string(),
        tier: room.tier,
        game_mode: room.game_mode,
        winner: (!room.winner.is_zero()).then_some(room.winner),
        player1_choice: record.and_then(|r| r.player1_choice),
        player2_choice: record.and_then(|r| r.player2_choice),
        flip,
        flip_reconstructed,
        card_selections: room.card_selections,
        created_at: room.created_at,
        resolved_at: room.resolved_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::{Address, Choice, GameMode, RoomStatus};

    fn room(status: RoomStatus) -> Room {
        Room {
            id: RoomId([0x10; 32]),
            player1: Address([0x01; 20]),
            player2: Address([0x02; 20]),
            stake: 5_000,
            tier: 0,
            game_mode: GameMode::Duel,
            status,
            winner: Address::ZERO,
            created_at: 1,
            resolved_at: 0,
            card_selections: None,
        }
    }

    fn record_with_status(status: &str) -> GameRecord {
        let mut record = GameRecord::new(RoomId([0x10; 32]));
        record.status = Some(status.to_string());
        record
    }

    #[test]
    fn off_chain_resolved_advances_pending_chain_state() {
        let view = merge(&room(RoomStatus::InGame), Some(&record_with_status("resolved")));
        assert_eq!(view.status, UiStatus::Resolved);

        let view = merge(&room(RoomStatus::Filled), Some(&record_with_status("draw")));
        assert_eq!(view.status, UiStatus::Draw);
    }

    #[test]
    fn chain_terminal_status_is_never_downgraded() {
        // Off-chain cache still says resolved, chain says cancelled:
        // chain wins.
        let view = merge(&room(RoomStatus::Cancelled), Some(&record_with_status("resolved")));
        assert_eq!(view.status, UiStatus::Cancelled);

        let view = merge(&room(RoomStatus::Resolved), Some(&record_with_status("draw")));
        assert_eq!(view.status, UiStatus::Resolved);
    }

    #[test]
    fn unknown_mirror_status_is_ignored() {
        let view = merge(&room(RoomStatus::InGame), Some(&record_with_status("waiting")));
        assert_eq!(view.status, UiStatus::WaitingChoices);
    }

    #[test]
    fn missing_record_maps_chain_status_directly() {
        let view = merge(&room(RoomStatus::Open), None);
        assert_eq!(view.status, UiStatus::Open);
        assert!(view.flip.is_none());
        assert!(!view.flip_reconstructed);
    }

    #[test]
    fn missing_flip_is_reconstructed_from_the_winner() {
        let mut chain_room = room(RoomStatus::Resolved);
        chain_room.winner = chain_room.player2;

        let mut record = GameRecord::new(chain_room.id);
        record.player1_choice = Some(Choice::Front);
        record.player2_choice = Some(Choice::Back);

        let view = merge(&chain_room, Some(&record));
        assert_eq!(view.flip, Some(Choice::Back));
        assert!(view.flip_reconstructed);
        assert_eq!(view.winner, Some(chain_room.player2));
    }

    #[test]
    fn recorded_flip_wins_over_reconstruction() {
        let mut chain_room = room(RoomStatus::Resolved);
        chain_room.winner = chain_room.player1;

        let mut record = GameRecord::new(chain_room.id);
        record.player1_choice = Some(Choice::Front);
        record.player2_choice = Some(Choice::Back);
        record.flip = Some(Choice::Front);

        let view = merge(&chain_room, Some(&record));
        assert_eq!(view.flip, Some(Choice::Front));
        assert!(!view.flip_reconstructed);
    }
}
