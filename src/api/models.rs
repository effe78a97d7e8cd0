//! Request and response bodies for the HTTP surface.

use crate::game::types::{GameView, Room};
use crate::rewards::ClaimRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body shared by `/sign` and `/resolve`.
///
/// `winner` lets the trusted caller dictate the outcome (zero address for
/// a draw); when null the oracle decides from the recorded choices.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub room_id: String,
    #[serde(default)]
    pub winner: Option<String>,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub nonce: String,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub is_draw: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    /// `confirmed` or `submitted_unconfirmed`.
    pub status: String,
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub is_draw: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomsQuery {
    #[serde(default)]
    pub game_mode: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<Room>,
    pub total: usize,
}

pub type RoomViewResponse = GameView;

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsQuery {
    pub wallet: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewardsResponse {
    pub wallet: String,
    pub balance: f64,
    pub history: Vec<ClaimRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimRequest {
    pub wallet: String,
    pub amount: f64,
}
