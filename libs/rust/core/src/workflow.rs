//! Workflow binding: the named bundle of test sample, ground truth and inference types that a model
//! and its test cases share.

use serde::de::DeserializeOwned;

use crate::error::{ModelError, Result};

/// Implemented once per workflow. `Model<W>` is only constructible for a bound `W`, so there is no
/// unbound model type to instantiate.
pub trait Workflow {
    /// Server-side workflow name.
    const NAME: &'static str;
    type TestSample: DeserializeOwned;
    type GroundTruth: DeserializeOwned;
    type Inference: DeserializeOwned;
}

pub(crate) fn validate_workflow_name<W: Workflow>() -> Result<&'static str> {
    if W::NAME.trim().is_empty() { return Err(ModelError::Usage("workflow name must not be empty".into())); }
    Ok(W::NAME)
}
