//! Wire types for the RPC surface.

use serde::{Deserialize, Serialize};

use crate::backup::BackupEntry;
use crate::master::RejectRules;
use crate::table::TabletDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
}

impl PingResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub table_id: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponse {
    pub object_id: u64,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadRequest {
    pub table_id: u64,
    pub object_id: u64,
    #[serde(default)]
    pub reject_rules: Option<RejectRules>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResponse {
    pub data: Vec<u8>,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRequest {
    pub table_id: u64,
    pub object_id: u64,
    pub data: Vec<u8>,
    #[serde(default)]
    pub reject_rules: Option<RejectRules>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteResponse {
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveRequest {
    pub table_id: u64,
    pub object_id: u64,
    #[serde(default)]
    pub reject_rules: Option<RejectRules>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTabletsRequest {
    pub tablets: Vec<TabletDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTabletsResponse {
    pub tablets: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoverRequest {
    pub master_id: u64,
    pub partition_id: u64,
    pub tablets: Vec<TabletDescriptor>,
    pub backups: Vec<BackupEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoverResponse {
    pub tablets: usize,
}

/// Body of every error response.
///
/// `status` is the stable numeric code; `version` is present on reject
/// errors so the client can see the version the rejection observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u32,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_request_rules_default_to_none() {
        let request: ReadRequest =
            serde_json::from_str(r#"{"table_id":0,"object_id":5}"#).unwrap();
        assert!(request.reject_rules.is_none());
    }

    #[test]
    fn test_error_body_omits_missing_version() {
        let body = ErrorBody {
            status: 7,
            code: "INTERNAL_ERROR".to_string(),
            message: "boom".to_string(),
            version: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("version"));
    }
}
