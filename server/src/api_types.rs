//! Wire envelope shared by the RPC handlers and the client.

use serde::{Deserialize, Serialize};

/// Discriminated result every `/api` endpoint returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RpcResponse<T> {
    Ok { data: T },
    Error { error: ErrorBody },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    Unauthenticated,
    Validation,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_and_error_are_tagged() {
        let ok: RpcResponse<u32> = RpcResponse::Ok { data: 7 };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "ok", "data": 7})
        );

        let err: RpcResponse<u32> = RpcResponse::Error {
            error: ErrorBody {
                kind: ErrorKind::NotFound,
                message: "user not found".to_string(),
                field: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"status": "error", "error": {"kind": "not_found", "message": "user not found"}})
        );
    }

    #[test]
    fn unit_payload_round_trips_as_null() {
        let parsed: RpcResponse<()> =
            serde_json::from_value(json!({"status": "ok", "data": null})).unwrap();
        assert_eq!(parsed, RpcResponse::Ok { data: () });
    }
}
