//! Request handlers for the oracle's HTTP surface.
//!
//! Handlers are thin: parse and validate input, call into the domain
//! components, and map errors through [`ApiError`]. All state is shared
//! and immutable; nothing is held across awaits.

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::chain::{RoomEnumerator, SubmitOutcome};
use crate::game::types::{Address, GameMode, RoomId, RoomStatus};
use crate::game::{SettlementExecutor, SettlementMode, StateReconciler};
use crate::rewards::RewardsLedger;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use std::sync::Arc;

const HISTORY_LIMIT: usize = 50;

/// Shared application state.
pub struct AppState {
    pub executor: Arc<SettlementExecutor>,
    pub enumerator: Arc<RoomEnumerator>,
    pub reconciler: Arc<StateReconciler>,
    pub ledger: Arc<RewardsLedger>,
    pub version: String,
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
    })
}

fn parse_room_id(request_id: &str, raw: &str) -> Result<RoomId, ApiError> {
    RoomId::from_hex(raw).map_err(|e| ApiError::bad_request(request_id.to_string(), e))
}

fn parse_winner(request_id: &str, raw: &Option<String>) -> Result<Option<Address>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => Address::from_hex(s)
            .map(Some)
            .map_err(|e| ApiError::bad_request(request_id.to_string(), e)),
    }
}

/// POST /sign: attest an outcome, leaving submission to the caller.
pub async fn sign_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignRequest>,
) -> Result<Json<SignResponse>, ApiError> {
    let room_id = parse_room_id(&request_id.0, &body.room_id)?;
    let winner = parse_winner(&request_id.0, &body.winner)?;

    let result = state
        .executor
        .execute(&body.secret, room_id, winner, SettlementMode::SignOnly)
        .await
        .map_err(|e| ApiError::from_oracle(request_id.0.clone(), e))?;

    let attestation = &result.attestation;
    Ok(Json(SignResponse {
        nonce: attestation.nonce_hex(),
        signature: attestation.signature_hex(),
        winner: (!attestation.is_draw()).then(|| attestation.winner.to_string()),
        is_draw: attestation.is_draw(),
    }))
}

/// POST /resolve: attest, submit on-chain, and wait for confirmation.
pub async fn resolve_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let room_id = parse_room_id(&request_id.0, &body.room_id)?;
    let winner = parse_winner(&request_id.0, &body.winner)?;

    let result = state
        .executor
        .execute(&body.secret, room_id, winner, SettlementMode::SubmitAndConfirm)
        .await
        .map_err(|e| ApiError::from_oracle(request_id.0.clone(), e))?;

    let attestation = &result.attestation;
    let submission = result.submission.ok_or_else(|| {
        ApiError::internal_error(
            request_id.0.clone(),
            "resolve completed without a submission outcome".to_string(),
        )
    })?;

    let (status, tx_hash, gas_used) = match submission {
        SubmitOutcome::Confirmed { tx_hash, gas_used } => {
            ("confirmed".to_string(), tx_hash, Some(gas_used))
        }
        SubmitOutcome::SubmittedUnconfirmed { tx_hash } => {
            ("submitted_unconfirmed".to_string(), tx_hash, None)
        }
    };

    Ok(Json(ResolveResponse {
        status,
        tx_hash,
        gas_used,
        winner: (!attestation.is_draw()).then(|| attestation.winner.to_string()),
        is_draw: attestation.is_draw(),
    }))
}

/// GET /rooms?gameMode=&status=
pub async fn rooms_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<RoomsQuery>,
) -> Result<Json<RoomsResponse>, ApiError> {
    let game_mode = params
        .game_mode
        .as_deref()
        .map(|s| s.parse::<GameMode>())
        .transpose()
        .map_err(|e| ApiError::bad_request(request_id.0.clone(), e))?;
    let status = params
        .status
        .as_deref()
        .map(|s| s.parse::<RoomStatus>())
        .transpose()
        .map_err(|e| ApiError::bad_request(request_id.0.clone(), e))?;

    let rooms = state
        .enumerator
        .list_rooms(game_mode, status)
        .await
        .map_err(|e| ApiError::from_oracle(request_id.0.clone(), e))?;

    let total = rooms.len();
    Ok(Json(RoomsResponse { rooms, total }))
}

/// GET /room/:id: reconciled game view.
pub async fn room_view_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RoomViewResponse>, ApiError> {
    let room_id = parse_room_id(&request_id.0, &id)?;
    let view = state
        .reconciler
        .view(&room_id)
        .await
        .map_err(|e| ApiError::from_oracle(request_id.0.clone(), e))?;
    Ok(Json(view))
}

/// GET /rewards?wallet=
pub async fn rewards_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<RewardsQuery>,
) -> Result<Json<RewardsResponse>, ApiError> {
    let balance = state
        .ledger
        .balance(&params.wallet)
        .await
        .map_err(|e| ApiError::from_oracle(request_id.0.clone(), e))?;
    let history = state
        .ledger
        .history(&params.wallet, HISTORY_LIMIT)
        .await
        .map_err(|e| ApiError::from_oracle(request_id.0.clone(), e))?;

    Ok(Json(RewardsResponse {
        wallet: params.wallet,
        balance,
        history,
    }))
}

/// POST /rewards: create a claim against the wallet's balance.
pub async fn claim_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClaimRequest>,
) -> Result<Json<crate::rewards::ClaimRecord>, ApiError> {
    if body.wallet.is_empty() {
        return Err(ApiError::bad_request(
            request_id.0,
            "wallet must not be empty".to_string(),
        ));
    }

    let record = state
        .ledger
        .claim(&body.wallet, body.amount)
        .await
        .map_err(|e| ApiError::from_oracle(request_id.0.clone(), e))?;
    Ok(Json(record))
}
