//! Rewards ledger: per-wallet balances, claim history, and the global
//! pending-claims queue.
//!
//! The debit is optimistic: balance drops at claim creation, and a later
//! payout failure is compensated through [`RewardsLedger::fail_claim`]
//! rather than rolled back transactionally. Claim records live under their
//! own keys; history and queue lists hold references.

use crate::errors::{LedgerError, OracleError, OracleResult};
use crate::store::{balance_key, claim_history_key, claim_key, KvStore, PENDING_CLAIMS_KEY};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub id: String,
    pub wallet: String,
    pub amount: f64,
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
}

/// Reference stored on the pending queue: enough to find the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClaimRef {
    wallet: String,
    id: String,
}

pub struct RewardsLedger {
    store: Arc<dyn KvStore>,
    /// Serializes claim read-modify-write per wallet so concurrent claims
    /// cannot jointly overdraw a balance.
    wallet_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl RewardsLedger {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            wallet_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, wallet: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.wallet_locks
            .entry(wallet.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .value()
            .clone()
    }

    async fn read_balance(&self, wallet: &str) -> OracleResult<f64> {
        let raw = self.store.get(&balance_key(wallet)).await?;
        match raw {
            Some(s) => s
                .parse::<f64>()
                .map_err(|e| OracleError::Store(format!("corrupt balance for {}: {}", wallet, e))),
            None => Ok(0.0),
        }
    }

    async fn write_balance(&self, wallet: &str, balance: f64) -> OracleResult<()> {
        self.store.set(&balance_key(wallet), &balance.to_string()).await
    }

    /// Current balance, zero when the wallet has never been credited.
    pub async fn balance(&self, wallet: &str) -> OracleResult<f64> {
        self.read_balance(wallet).await
    }

    /// Increase a wallet's balance. Used by payout flows and by claim
    /// compensation.
    pub async fn credit(&self, wallet: &str, amount: f64) -> OracleResult<f64> {
        if amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount).into());
        }
        let lock = self.lock_for(wallet);
        let _guard = lock.lock().await;

        let balance = self.read_balance(wallet).await? + amount;
        self.write_balance(wallet, balance).await?;
        Ok(balance)
    }

    /// Create a claim: debit the balance, record a pending claim, and
    /// queue it for asynchronous payout. Fails without side effects on a
    /// non-positive amount or insufficient balance.
    pub async fn claim(&self, wallet: &str, amount: f64) -> OracleResult<ClaimRecord> {
        if amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount).into());
        }

        let lock = self.lock_for(wallet);
        let _guard = lock.lock().await;

        let balance = self.read_balance(wallet).await?;
        if amount > balance {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: balance,
            }
            .into());
        }

        let record = ClaimRecord {
            id: Uuid::new_v4().to_string(),
            wallet: wallet.to_string(),
            amount,
            status: ClaimStatus::Pending,
            created_at: Utc::now(),
        };

        self.write_balance(wallet, balance - amount).await?;
        self.put_claim(&record).await?;
        self.store
            .list_push(&claim_history_key(wallet), &record.id)
            .await?;
        let reference = serde_json::to_string(&ClaimRef {
            wallet: wallet.to_string(),
            id: record.id.clone(),
        })
        .map_err(|e| OracleError::Store(e.to_string()))?;
        self.store.list_push(PENDING_CLAIMS_KEY, &reference).await?;

        info!(wallet, amount, claim_id = record.id.as_str(), "claim created");
        Ok(record)
    }

    /// Claim history for a wallet, newest first.
    pub async fn history(&self, wallet: &str, limit: usize) -> OracleResult<Vec<ClaimRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let ids = self
            .store
            .list_range(&claim_history_key(wallet), 0, limit - 1)
            .await?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_claim(wallet, &id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Pending-queue snapshot for an external payout worker.
    pub async fn pending_claims(&self, limit: usize) -> OracleResult<Vec<ClaimRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let refs = self
            .store
            .list_range(PENDING_CLAIMS_KEY, 0, limit - 1)
            .await?;
        let mut records = Vec::new();
        for raw in refs {
            let reference: ClaimRef = serde_json::from_str(&raw)
                .map_err(|e| OracleError::Store(format!("corrupt queue entry: {}", e)))?;
            if let Some(record) = self.get_claim(&reference.wallet, &reference.id).await? {
                if record.status == ClaimStatus::Pending || record.status == ClaimStatus::Processing {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// Mark a claim paid out. Idempotent on claim id.
    pub async fn complete_claim(&self, wallet: &str, claim_id: &str) -> OracleResult<()> {
        let lock = self.lock_for(wallet);
        let _guard = lock.lock().await;

        let mut record = self
            .get_claim(wallet, claim_id)
            .await?
            .ok_or_else(|| LedgerError::ClaimNotFound(claim_id.to_string()))?;
        if record.status == ClaimStatus::Completed {
            return Ok(());
        }
        record.status = ClaimStatus::Completed;
        self.put_claim(&record).await
    }

    /// Mark a claim failed and credit the amount back. Idempotent on
    /// claim id; a completed claim cannot fail afterwards.
    pub async fn fail_claim(&self, wallet: &str, claim_id: &str) -> OracleResult<()> {
        let lock = self.lock_for(wallet);
        let _guard = lock.lock().await;

        let mut record = self
            .get_claim(wallet, claim_id)
            .await?
            .ok_or_else(|| LedgerError::ClaimNotFound(claim_id.to_string()))?;
        match record.status {
            ClaimStatus::Failed => return Ok(()),
            ClaimStatus::Completed => {
                return Err(OracleError::Validation(format!(
                    "claim {} already completed",
                    claim_id
                )))
            }
            ClaimStatus::Pending | ClaimStatus::Processing => {}
        }

        record.status = ClaimStatus::Failed;
        self.put_claim(&record).await?;

        let balance = self.read_balance(wallet).await? + record.amount;
        self.write_balance(wallet, balance).await?;
        info!(wallet, claim_id, amount = record.amount, "claim failed, amount credited back");
        Ok(())
    }

    async fn get_claim(&self, wallet: &str, claim_id: &str) -> OracleResult<Option<ClaimRecord>> {
        let Some(raw) = self.store.get(&claim_key(wallet, claim_id)).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&raw)
            .map_err(|e| OracleError::Store(format!("corrupt claim {}: {}", claim_id, e)))?;
        Ok(Some(record))
    }

    async fn put_claim(&self, record: &ClaimRecord) -> OracleResult<()> {
        let raw = serde_json::to_string(record).map_err(|e| OracleError::Store(e.to_string()))?;
        self.store.set(&claim_key(&record.wallet, &record.id), &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ledger() -> RewardsLedger {
        RewardsLedger::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn balance_defaults_to_zero() {
        let ledger = ledger();
        assert_eq!(ledger.balance("0xwallet").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn claim_debits_exactly_and_queues() {
        let ledger = ledger();
        ledger.credit("0xwallet", 100.0).await.unwrap();

        let record = ledger.claim("0xwallet", 40.0).await.unwrap();
        assert_eq!(record.status, ClaimStatus::Pending);
        assert_eq!(ledger.balance("0xwallet").await.unwrap(), 60.0);

        let history = ledger.history("0xwallet", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, record.id);

        let pending = ledger.pending_claims(10).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn overdraw_fails_and_leaves_balance_untouched() {
        let ledger = ledger();
        ledger.credit("0xwallet", 100.0).await.unwrap();

        let err = ledger.claim("0xwallet", 150.0).await.unwrap_err();
        assert!(matches!(
            err,
            OracleError::Ledger(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.balance("0xwallet").await.unwrap(), 100.0);
        assert!(ledger.history("0xwallet", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_positive_amounts_rejected() {
        let ledger = ledger();
        for amount in [0.0, -5.0] {
            let err = ledger.claim("0xwallet", amount).await.unwrap_err();
            assert!(matches!(err, OracleError::Ledger(LedgerError::InvalidAmount(_))));
        }
    }

    #[tokio::test]
    async fn concurrent_claims_never_overdraw() {
        let ledger = Arc::new(ledger());
        ledger.credit("0xwallet", 100.0).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.claim("0xwallet", 30.0).await.is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        // 100 / 30 allows at most three successful claims.
        assert_eq!(successes, 3);
        let balance = ledger.balance("0xwallet").await.unwrap();
        assert!(balance >= 0.0);
        assert_eq!(balance, 10.0);
    }

    #[tokio::test]
    async fn failed_claim_credits_back_once() {
        let ledger = ledger();
        ledger.credit("0xwallet", 100.0).await.unwrap();
        let record = ledger.claim("0xwallet", 80.0).await.unwrap();
        assert_eq!(ledger.balance("0xwallet").await.unwrap(), 20.0);

        ledger.fail_claim("0xwallet", &record.id).await.unwrap();
        assert_eq!(ledger.balance("0xwallet").await.unwrap(), 100.0);

        // Idempotent: a second failure report must not double-credit.
        ledger.fail_claim("0xwallet", &record.id).await.unwrap();
        assert_eq!(ledger.balance("0xwallet").await.unwrap(), 100.0);
    }

    #[tokio::test]
    async fn completed_claim_cannot_fail() {
        let ledger = ledger();
        ledger.credit("0xwallet", 50.0).await.unwrap();
        let record = ledger.claim("0xwallet", 50.0).await.unwrap();

        ledger.complete_claim("0xwallet", &record.id).await.unwrap();
        let err = ledger.fail_claim("0xwallet", &record.id).await.unwrap_err();
        assert!(matches!(err, OracleError::Validation(_)));
        assert_eq!(ledger.balance("0xwallet").await.unwrap(), 0.0);

        // Completing again is a no-op.
        ledger.complete_claim("0xwallet", &record.id).await.unwrap();
    }
}
