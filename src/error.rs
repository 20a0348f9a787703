// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rmcp::model::{CallToolResult, Content, ErrorCode};
use rmcp::ErrorData;
use serde_json::{json, Value};
use thiserror::Error;

use crate::host::HostError;
use crate::model::SessionId;
use crate::tools::schema::SchemaViolations;

pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("tool not found: {name}")]
    ToolNotFound { name: String, suggestions: Vec<String> },
    #[error(transparent)]
    Validation(#[from] SchemaViolations),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn tool_not_found(name: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::ToolNotFound { name: name.into(), suggestions }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidArguments(_))
    }

    /// Host failures belong in the tool result; everything else is a protocol error.
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Self::Host(_))
    }

    pub fn json_rpc_code(&self) -> i32 {
        match self {
            Self::ToolNotFound { .. } => METHOD_NOT_FOUND,
            Self::Validation(_) | Self::InvalidArguments(_) => INVALID_PARAMS,
            Self::Host(_) | Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    pub fn data(&self) -> Option<Value> {
        match self {
            Self::ToolNotFound { suggestions, .. } => Some(json!({ "suggestions": suggestions })),
            Self::Validation(violations) => Some(json!({ "violations": violations.to_json() })),
            Self::InvalidArguments(_) | Self::Host(_) | Self::Internal(_) => None,
        }
    }

    pub fn to_error_data(&self) -> ErrorData {
        ErrorData::new(ErrorCode(self.json_rpc_code()), self.to_string(), self.data())
    }

    pub fn to_call_result(&self) -> CallToolResult {
        CallToolResult::error(vec![Content::text(self.to_string())])
    }
}

impl From<ToolError> for ErrorData {
    fn from(err: ToolError) -> Self {
        err.to_error_data()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session {0} does not exist")]
    NotFound(SessionId),
    #[error("session {0} is closed")]
    Closed(SessionId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::FieldViolation;

    #[test]
    fn not_found_carries_suggestions_as_data() {
        let err = ToolError::tool_not_found("serch_nodes", vec!["search_nodes".into()]);
        let data = err.to_error_data();
        assert_eq!(data.code, ErrorCode::METHOD_NOT_FOUND);
        assert_eq!(data.data, Some(json!({ "suggestions": ["search_nodes"] })));
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_maps_to_invalid_params_with_violations() {
        let err = ToolError::from(SchemaViolations {
            violations: vec![FieldViolation::new("uuid", "is required")],
        });
        let data = err.to_error_data();
        assert_eq!(data.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(
            data.data,
            Some(json!({ "violations": [{ "field": "uuid", "message": "is required" }] }))
        );
    }

    #[test]
    fn host_failures_are_tool_results() {
        let err = ToolError::from(HostError::NotFound("n-1".into()));
        assert!(err.is_tool_failure());
        assert_eq!(err.to_call_result().is_error, Some(true));
    }
}
