//! Arbiter - outcome oracle and settlement service for escrowed duels.
//!
//! Funds live in an on-chain escrow contract; this service reads contract
//! state through a fault-tolerant RPC pool, decides duel outcomes from
//! choices recorded in a low-latency store, attests them with the oracle
//! key, submits resolutions on-chain, and reconciles the fast off-chain
//! view with the slower on-chain truth. A small rewards ledger queues
//! payout claims for asynchronous processing.

pub mod api;
pub mod chain;
pub mod config;
pub mod errors;
pub mod game;
pub mod rewards;
pub mod store;

pub use config::OracleConfig;
pub use errors::{LedgerError, OracleError, OracleResult, ProviderError};
