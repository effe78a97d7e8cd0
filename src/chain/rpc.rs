//! Single-endpoint JSON-RPC client for the escrow chain.
//!
//! One method call = one HTTP round trip against one endpoint. Retry and
//! fallback across the endpoint pool live in [`crate::chain::reader`]; this
//! layer only classifies failures so the reader can tell a deterministic
//! contract revert apart from a dead provider.

use crate::chain::abi::{parse_hex_data, parse_quantity};
use crate::errors::ProviderError;
use crate::game::types::Address;
use serde_json::{json, Value};
use std::time::Duration;

/// Receipt fields the oracle cares about.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub succeeded: bool,
    pub gas_used: u64,
    pub block_number: u64,
}

#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    attempt_timeout: Duration,
}

impl RpcClient {
    pub fn new(attempt_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            attempt_timeout,
        }
    }

    /// Raw JSON-RPC request. Transport and HTTP failures map to
    /// `Transport`; a JSON-RPC error object is inspected for revert
    /// markers before being classified.
    async fn request(
        &self,
        endpoint: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, ProviderError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let response = self
            .http
            .post(endpoint)
            .timeout(self.attempt_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let body: Value = response.json().await.map_err(|e| ProviderError::Transport {
            endpoint: endpoint.to_string(),
            message: format!("invalid JSON body: {}", e),
        })?;

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            return Err(classify_rpc_error(endpoint, error));
        }

        body.get("result").cloned().ok_or_else(|| ProviderError::Decode {
            endpoint: endpoint.to_string(),
            message: "response missing result field".to_string(),
        })
    }

    /// `eth_call` against a contract, returning the raw return data.
    pub async fn eth_call(
        &self,
        endpoint: &str,
        to: &Address,
        data: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        let call = json!({
            "to": to.to_string(),
            "data": format!("0x{}", hex::encode(data)),
        });
        let result = self.request(endpoint, "eth_call", json!([call, "latest"])).await?;
        let hex_str = result.as_str().ok_or_else(|| ProviderError::Decode {
            endpoint: endpoint.to_string(),
            message: "eth_call result is not a string".to_string(),
        })?;
        parse_hex_data(hex_str).ok_or_else(|| ProviderError::Decode {
            endpoint: endpoint.to_string(),
            message: "eth_call result is not valid hex".to_string(),
        })
    }

    pub async fn send_raw_transaction(
        &self,
        endpoint: &str,
        raw: &[u8],
    ) -> Result<String, ProviderError> {
        let raw_hex = format!("0x{}", hex::encode(raw));
        let result = self
            .request(endpoint, "eth_sendRawTransaction", json!([raw_hex]))
            .await?;
        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::Decode {
                endpoint: endpoint.to_string(),
                message: "eth_sendRawTransaction result is not a string".to_string(),
            })
    }

    /// Returns `Ok(None)` while the transaction is still pending.
    pub async fn transaction_receipt(
        &self,
        endpoint: &str,
        tx_hash: &str,
    ) -> Result<Option<TxReceipt>, ProviderError> {
        let result = self
            .request(endpoint, "eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let decode_err = |message: &str| ProviderError::Decode {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        };

        let status = result
            .get("status")
            .and_then(|v| v.as_str())
            .and_then(parse_quantity)
            .ok_or_else(|| decode_err("receipt missing status"))?;
        let gas_used = result
            .get("gasUsed")
            .and_then(|v| v.as_str())
            .and_then(parse_quantity)
            .ok_or_else(|| decode_err("receipt missing gasUsed"))?;
        let block_number = result
            .get("blockNumber")
            .and_then(|v| v.as_str())
            .and_then(parse_quantity)
            .unwrap_or(0);

        Ok(Some(TxReceipt {
            transaction_hash: tx_hash.to_string(),
            succeeded: status == 1,
            gas_used: gas_used as u64,
            block_number: block_number as u64,
        }))
    }

    pub async fn transaction_count(
        &self,
        endpoint: &str,
        address: &Address,
    ) -> Result<u64, ProviderError> {
        let result = self
            .request(
                endpoint,
                "eth_getTransactionCount",
                json!([address.to_string(), "pending"]),
            )
            .await?;
        result
            .as_str()
            .and_then(parse_quantity)
            .map(|q| q as u64)
            .ok_or_else(|| ProviderError::Decode {
                endpoint: endpoint.to_string(),
                message: "eth_getTransactionCount result is not a quantity".to_string(),
            })
    }

    pub async fn gas_price(&self, endpoint: &str) -> Result<u128, ProviderError> {
        let result = self.request(endpoint, "eth_gasPrice", json!([])).await?;
        result
            .as_str()
            .and_then(parse_quantity)
            .ok_or_else(|| ProviderError::Decode {
                endpoint: endpoint.to_string(),
                message: "eth_gasPrice result is not a quantity".to_string(),
            })
    }
}

/// Decide whether a JSON-RPC error object is a contract revert or a
/// provider fault. Reverts carry code 3 (EIP-1474 execution error), a
/// `data` payload, or a "revert" marker in the message; anything else is
/// treated as retryable transport trouble.
fn classify_rpc_error(endpoint: &str, error: &Value) -> ProviderError {
    let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("unknown RPC error")
        .to_string();
    let has_revert_data = error
        .get("data")
        .and_then(|d| d.as_str())
        .map(|d| d.starts_with("0x") && d.len() > 2)
        .unwrap_or(false);

    if code == 3 || has_revert_data || message.to_lowercase().contains("revert") {
        ProviderError::Revert(message)
    } else {
        ProviderError::Transport {
            endpoint: endpoint.to_string(),
            message,
        }
    }
}
