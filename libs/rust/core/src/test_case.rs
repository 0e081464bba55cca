use serde::{Deserialize, Serialize};

/// Descriptor of a test case stored on the platform. Inferences are only loadable for test cases of
/// the model's own workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    id: i64,
    name: String,
    #[serde(default)]
    version: u32,
    workflow: String,
}

impl TestCase {
    pub fn new(id: i64, name: impl Into<String>, version: u32, workflow: impl Into<String>) -> Self {
        Self { id, name: name.into(), version, workflow: workflow.into() }
    }
    pub fn id(&self) -> i64 { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn version(&self) -> u32 { self.version }
    pub fn workflow(&self) -> &str { &self.workflow }
}
