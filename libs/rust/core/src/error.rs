use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found: {0}")] NotFound(String),
    #[error("workflow mismatch: expected '{expected}', got '{actual}'")] WorkflowMismatch { expected: String, actual: String },
    #[error("invalid usage: {0}")] Usage(String),
    #[error(transparent)] Gateway(GatewayError),
    #[error("failed to decode {kind} payload: {source}")] Decode { kind: &'static str, #[source] source: serde_json::Error },
}

impl From<GatewayError> for ModelError {
    fn from(e: GatewayError) -> Self { ModelError::Gateway(e) }
}

pub type Result<T> = std::result::Result<T, ModelError>;

pub(crate) fn assert_workflows_match(expected: &str, actual: &str) -> Result<()> {
    if expected != actual {
        return Err(ModelError::WorkflowMismatch { expected: expected.to_string(), actual: actual.to_string() });
    }
    Ok(())
}
