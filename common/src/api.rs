use serde::{Deserialize, Serialize};

/// Claim the oldest new job (GET).
pub const GET_JOB_PATH: &str = "/get_job";
/// Create a task (POST).
pub const TASK_PATH: &str = "/task";
/// Report a job result (PUT).
pub const JOB_RESULT_PATH: &str = "/job_result";
/// Look up a single job (GET), followed by `/{id}`.
pub const JOB_PATH: &str = "/job";

/// JSON body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
