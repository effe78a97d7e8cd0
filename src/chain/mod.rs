//! On-chain plumbing: RPC clients, the fault-tolerant reader, and the
//! typed escrow contract surface.

pub mod abi;
pub mod enumerator;
pub mod escrow;
pub mod reader;
pub mod rpc;

pub use enumerator::RoomEnumerator;
pub use escrow::{EscrowContract, SubmitOutcome};
pub use reader::FallbackReader;
pub use rpc::RpcClient;

use crate::errors::OracleResult;
use crate::game::signer::Attestation;
use crate::game::types::{Room, RoomId};
use async_trait::async_trait;

/// The contract operations the rest of the service depends on.
///
/// [`EscrowContract`] is the production implementation; tests substitute
/// fakes to exercise settlement and enumeration without a network.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Room id at a position of the on-chain room array. A contract
    /// revert (surfaced as `ContractRevert`) means the index is out of
    /// bounds.
    async fn room_id_at(&self, index: u64) -> OracleResult<RoomId>;

    /// Full room record, card selections included for cards-mode rooms.
    async fn room_by_id(&self, id: &RoomId) -> OracleResult<Room>;

    /// Submit the resolve (or resolve-draw) call and wait for
    /// confirmation within the configured deadline.
    async fn submit_resolution(&self, attestation: &Attestation) -> OracleResult<SubmitOutcome>;
}
