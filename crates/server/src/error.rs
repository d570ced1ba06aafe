//! Tool argument errors for the beekon-sw server.
//!
//! Failures inside the worker use `beekon_core::Error`; these cover
//! arguments that never reach it.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("INVALID_METHOD: {0}")]
    InvalidMethod(String),

    #[error("INVALID_HEADER: {0}")]
    InvalidHeader(String),

    #[error("UNKNOWN_PARTITION: {0}")]
    UnknownPartition(String),

    /// Output could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    SerializeFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidMethod(_) | ToolError::InvalidHeader(_) | ToolError::UnknownPartition(_) => -32602,
            ToolError::SerializeFailed(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_errors_are_invalid_params() {
        let err: McpError = ToolError::UnknownPartition("thumbnails".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert!(err.message.contains("UNKNOWN_PARTITION"));
    }

    #[test]
    fn test_serialize_failure_is_internal() {
        let err: McpError = ToolError::SerializeFailed("nan".into()).into();
        assert_eq!(err.code, ErrorCode(-32603));
    }
}
