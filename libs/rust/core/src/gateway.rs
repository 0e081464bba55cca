//! Remote resource gateway contract and its wire types.
//!
//! The gateway is the only way this crate talks to the evaluation platform. `HttpGateway` is the
//! production implementation; tests plug in an in-memory double.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Open metadata mapping stored with a model.
pub type Metadata = Map<String, Value>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("not found: {0}")] NotFound(String),
    #[error("server responded {status}: {message}")] Status { status: u16, message: String },
    #[error("transport error: {0}")] Transport(String),
    #[error("malformed response: {0}")] Decode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest { pub name: String, pub metadata: Metadata, pub workflow: String }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadByNameRequest { pub name: String }

/// Server-side canonical representation of a stored model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub workflow: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadInferencesRequest { pub model_id: i64, pub test_case_id: i64, pub batch_size: usize }

/// Opaque continuation token handed back by the server with every non-final page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(pub String);

/// One stored inference row: three payloads in the workflow's wire encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord { pub test_sample: Value, pub ground_truth: Value, pub inference: Value }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferencePage {
    pub records: Vec<InferenceRecord>,
    #[serde(default)]
    pub next_cursor: Option<PageCursor>,
}

/// Blocking access to the model endpoints of the platform.
pub trait Gateway {
    fn create_model(&self, request: &CreateRequest) -> Result<EntityData, GatewayError>;
    /// Fails with [`GatewayError::NotFound`] when no model of that name exists.
    fn load_model_by_name(&self, request: &LoadByNameRequest) -> Result<EntityData, GatewayError>;
    /// `cursor` is `None` for the first page and the previous page's `next_cursor` afterwards.
    fn fetch_inference_page(&self, request: &LoadInferencesRequest, cursor: Option<&PageCursor>) -> Result<InferencePage, GatewayError>;
    /// Human-readable link to the model, only used in log lines.
    fn model_url(&self, model_id: i64) -> String;
}
