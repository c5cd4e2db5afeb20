//! JSON-RPC 2.0 envelopes and Starknet error codes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use starkindex_core::error::IndexerError;

/// Starknet JSON-RPC error codes the crawler treats specially.
pub mod codes {
    pub const CONTRACT_NOT_FOUND: i64 = 20;
    pub const BLOCK_NOT_FOUND: i64 = 24;
    pub const INVALID_CONTINUATION_TOKEN: i64 = 33;
    pub const TXN_HASH_NOT_FOUND: i64 = 29;
    /// Generic server error some providers return for overload.
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// A JSON-RPC 2.0 request with positional params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Map to the crawler's error taxonomy.
    ///
    /// `CONTRACT_NOT_FOUND` stays an `Rpc` error: it is an answer for code
    /// presence checks and a real failure everywhere else.
    pub fn into_indexer_error(self) -> IndexerError {
        match self.code {
            codes::BLOCK_NOT_FOUND | codes::TXN_HASH_NOT_FOUND => IndexerError::NotFound(self.message),
            codes::INTERNAL_ERROR => IndexerError::Transient(self.message),
            code => IndexerError::Rpc {
                code,
                message: self.message,
            },
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// The result value, or the node's error.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
