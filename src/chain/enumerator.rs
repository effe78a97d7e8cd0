//! Room enumeration over the index-based on-chain room array.

use crate::chain::ChainGateway;
use crate::errors::{OracleError, OracleResult};
use crate::game::types::{GameMode, Room, RoomStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct RoomEnumerator {
    gateway: Arc<dyn ChainGateway>,
    /// Hard cap on the index walk, bounding cost on long room arrays.
    max_rooms: usize,
    /// Pause between detail fetches to stay under provider rate limits.
    fetch_delay: Duration,
}

impl RoomEnumerator {
    pub fn new(gateway: Arc<dyn ChainGateway>, max_rooms: usize, fetch_delay: Duration) -> Self {
        Self {
            gateway,
            max_rooms: max_rooms.max(1),
            fetch_delay,
        }
    }

    /// Walk the room array from index 0 and return full records matching
    /// the requested filters.
    ///
    /// A contract revert at index `i` is the authoritative end-of-array
    /// signal and ends the walk with the rooms gathered so far. A
    /// transport exhaustion of the whole pool is NOT end-of-list; it
    /// propagates as a provider error so a dead pool can't masquerade as
    /// an empty chain.
    pub async fn list_rooms(
        &self,
        game_mode: Option<GameMode>,
        status: Option<RoomStatus>,
    ) -> OracleResult<Vec<Room>> {
        let mut ids = Vec::new();
        for index in 0..self.max_rooms as u64 {
            match self.gateway.room_id_at(index).await {
                Ok(id) => ids.push(id),
                Err(OracleError::ContractRevert(_)) => {
                    debug!(index, "room array end reached");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let mut rooms = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if i > 0 && !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
            let room = self.gateway.room_by_id(id).await?;
            let mode_ok = game_mode.map_or(true, |m| room.game_mode == m);
            let status_ok = status.map_or(true, |s| room.status == s);
            if mode_ok && status_ok {
                rooms.push(room);
            }
        }

        debug!(
            walked = ids.len(),
            matched = rooms.len(),
            "room enumeration complete"
        );
        Ok(rooms)
    }
}
