//! Record codec: wire payloads to workflow-typed objects.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ModelError, Result};
use crate::gateway::InferenceRecord;
use crate::workflow::Workflow;

pub fn decode<T: DeserializeOwned>(kind: &'static str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|source| ModelError::Decode { kind, source })
}

/// Decodes one record into (test sample, ground truth, inference), in that order.
pub fn decode_record<W: Workflow>(record: InferenceRecord) -> Result<(W::TestSample, W::GroundTruth, W::Inference)> {
    let test_sample = decode("test sample", record.test_sample)?;
    let ground_truth = decode("ground truth", record.ground_truth)?;
    let inference = decode("inference", record.inference)?;
    Ok((test_sample, ground_truth, inference))
}
