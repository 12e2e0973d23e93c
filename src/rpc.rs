//! Blocking Solana JSON-RPC client.
//!
//! Only the two calls the enrollment needs: `getLatestBlockhash` and
//! `sendTransaction`. Nothing is retried.

use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::types::Hash;

/// What the workflow needs from a cluster.
pub trait Cluster {
    /// Most recent blockhash at the configured commitment.
    fn latest_blockhash(&self) -> Result<Hash, RpcError>;

    /// Submit a serialized signed transaction, returning the id the
    /// endpoint assigned to it.
    fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(format!(
                "unknown commitment {other:?} (expected processed, confirmed or finalized)"
            )),
        }
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

pub struct RpcClient {
    client: Client,
    url: String,
    commitment: Commitment,
}

impl RpcClient {
    pub fn new(url: &str, timeout: Duration, commitment: Commitment) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ledger-enroll/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            commitment,
        })
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        log::debug!("rpc {method} -> {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}

impl Cluster for RpcClient {
    fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        let reply: WithContext<BlockhashValue> = self.call(
            "getLatestBlockhash",
            json!([{ "commitment": self.commitment.as_str() }]),
        )?;
        let hash = Hash::from_str(&reply.value.blockhash).map_err(|e| {
            RpcError::Malformed(format!("blockhash {:?}: {e}", reply.value.blockhash))
        })?;
        log::debug!(
            "latest blockhash {hash}, valid until block height {}",
            reply.value.last_valid_block_height
        );
        Ok(hash)
    }

    fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        log::debug!("sending {} byte transaction", wire.len());
        self.call(
            "sendTransaction",
            json!([
                BASE64.encode(wire),
                {
                    "encoding": "base64",
                    "preflightCommitment": self.commitment.as_str(),
                }
            ]),
        )
    }
}

/// Decode a JSON-RPC reply body into its result, or classify its error.
pub(crate) fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, RpcError> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| RpcError::Malformed(e.to_string()))?;

    if let Some(error) = envelope.error {
        return Err(classify(error));
    }
    envelope
        .result
        .ok_or_else(|| RpcError::Malformed("reply has neither result nor error".into()))
}

/// Preflight failures carry the simulated transaction error in
/// `data.err`; an `InstructionError` there means the program itself
/// refused the call.
fn classify(error: ErrorObject) -> RpcError {
    let data = error.data.unwrap_or(Value::Null);
    let instruction_failed = data
        .get("err")
        .and_then(|err| err.get("InstructionError"))
        .is_some();

    if !instruction_failed {
        return RpcError::Node {
            code: error.code,
            message: error.message,
        };
    }

    let logs = data
        .get("logs")
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    RpcError::ProgramRejected {
        message: error.message,
        logs,
    }
}
