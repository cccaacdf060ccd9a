//! Outcome of one `route` call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use hr_catalog::ClassificationResult;

use crate::error::RouterError;

/// What the router did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    /// The intent's handler ran and succeeded.
    Dispatched,
    /// The caller must say more before anything runs.
    ClarificationRequested,
    /// The fallback handler ran and succeeded.
    Fallback,
    /// A handler failed or no handler could take the request.
    Error,
}

/// Question to put back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clarification {
    pub prompt: String,
    /// Candidate intent names, best first (at most three).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
    /// Required slots the input did not fill.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_slots: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterResult {
    pub classification: ClassificationResult,
    pub status: RouteStatus,
    /// Handler that ran (or failed); `"fallback"` for the fallback handler.
    pub handler_name: Option<String>,
    /// Handler output on success; on a handler failure, the error
    /// handler's output if one ran.
    pub result: Option<Value>,
    pub error: Option<RouterError>,
    pub clarification: Option<Clarification>,
}

impl RouterResult {
    pub(crate) fn completed(
        classification: ClassificationResult,
        status: RouteStatus,
        handler_name: &str,
        result: Value,
    ) -> Self {
        Self {
            classification,
            status,
            handler_name: Some(handler_name.to_string()),
            result: Some(result),
            error: None,
            clarification: None,
        }
    }

    pub(crate) fn clarify(classification: ClassificationResult, clarification: Clarification) -> Self {
        Self {
            classification,
            status: RouteStatus::ClarificationRequested,
            handler_name: None,
            result: None,
            error: None,
            clarification: Some(clarification),
        }
    }

    pub(crate) fn failed(
        classification: ClassificationResult,
        handler_name: Option<&str>,
        error: RouterError,
    ) -> Self {
        Self {
            classification,
            status: RouteStatus::Error,
            handler_name: handler_name.map(str::to_string),
            result: None,
            error: Some(error),
            clarification: None,
        }
    }

    pub(crate) fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn is_dispatched(&self) -> bool {
        self.status == RouteStatus::Dispatched
    }

    pub fn is_error(&self) -> bool {
        self.status == RouteStatus::Error
    }

    pub fn needs_clarification(&self) -> bool {
        self.status == RouteStatus::ClarificationRequested
    }
}
