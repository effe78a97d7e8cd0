//! Game domain: room and record types, the outcome decision rule, the
//! attestation signer, settlement execution, and state reconciliation.

pub mod decider;
pub mod reconcile;
pub mod settlement;
pub mod signer;
pub mod types;

pub use decider::{decide, draw_token};
pub use reconcile::StateReconciler;
pub use settlement::{SettlementExecutor, SettlementMode, SettlementResult};
pub use signer::{Attestation, OutcomeSigner};
