//! Model descriptor: create-or-load reconciliation and retrieval of stored inferences.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{info, warn};

use crate::codec::decode_record;
use crate::error::{assert_workflows_match, ModelError, Result};
use crate::gateway::{CreateRequest, EntityData, Gateway, GatewayError, LoadByNameRequest, LoadInferencesRequest, Metadata};
use crate::pager::BatchedLoader;
use crate::test_case::TestCase;
use crate::workflow::{validate_workflow_name, Workflow};

/// Records requested per page when loading inferences.
pub const LOAD_SAMPLES_BATCH_SIZE: usize = 1_000_000;

/// Local inference function; never sent to the platform.
pub type InferFn<W> = Arc<dyn Fn(&<W as Workflow>::TestSample) -> <W as Workflow>::Inference + Send + Sync>;

pub type InferenceTriple<W> = (<W as Workflow>::TestSample, <W as Workflow>::GroundTruth, <W as Workflow>::Inference);

/// Descriptor of a model tested on the platform, bound to workflow `W`.
///
/// Fields are fixed at construction and there are no setters:
///
/// ```compile_fail
/// # fn f<W: evalkit_core::Workflow>(model: &mut evalkit_core::Model<W>) {
/// model.name = String::from("renamed");
/// # }
/// ```
///
/// ```compile_fail
/// # fn f<W: evalkit_core::Workflow>(model: &mut evalkit_core::Model<W>) {
/// model.id = 1;
/// # }
/// ```
///
/// ```compile_fail
/// # fn f<W: evalkit_core::Workflow>(model: &mut evalkit_core::Model<W>) {
/// model.metadata = Default::default();
/// # }
/// ```
pub struct Model<W: Workflow> {
    id: i64,
    name: String,
    metadata: Metadata,
    infer: Option<InferFn<W>>,
    _workflow: PhantomData<fn() -> W>,
}

impl<W: Workflow> Model<W> {
    /// Loads the model named `name`, creating it when the platform has none.
    ///
    /// Metadata already stored on the platform wins over `metadata`; a differing non-empty
    /// `metadata` is reported as a warning. `None` and an empty map both mean "unspecified" and
    /// never warn.
    pub fn new(gateway: &dyn Gateway, name: &str, infer: Option<InferFn<W>>, metadata: Option<Metadata>) -> Result<Self> {
        let metadata = metadata.unwrap_or_default();
        match Self::load(gateway, name, infer.clone()) {
            Ok(loaded) => {
                if !loaded.metadata.is_empty() && !metadata.is_empty() && loaded.metadata != metadata {
                    warn!(target: "evalkit::model", model = %name, loaded = %serde_json::Value::Object(loaded.metadata.clone()), "mismatch in model metadata, using loaded metadata");
                }
                Ok(loaded)
            }
            Err(ModelError::NotFound(_)) => Self::create(gateway, name, infer, Some(metadata)),
            Err(e) => Err(e),
        }
    }

    /// Creates a new model. Fails if the name is taken.
    pub fn create(gateway: &dyn Gateway, name: &str, infer: Option<InferFn<W>>, metadata: Option<Metadata>) -> Result<Self> {
        validate_name(name)?;
        let workflow = validate_workflow_name::<W>()?;
        let request = CreateRequest { name: name.to_string(), metadata: metadata.unwrap_or_default(), workflow: workflow.to_string() };
        let obj = Self::from_data_with_infer(gateway.create_model(&request)?, infer)?;
        info!(target: "evalkit::model", url = %gateway.model_url(obj.id), "created model '{name}'");
        Ok(obj)
    }

    /// Loads an existing model, failing with [`ModelError::NotFound`] when there is none.
    pub fn load(gateway: &dyn Gateway, name: &str, infer: Option<InferFn<W>>) -> Result<Self> {
        validate_name(name)?;
        validate_workflow_name::<W>()?;
        let request = LoadByNameRequest { name: name.to_string() };
        let data = gateway.load_model_by_name(&request).map_err(|e| match e {
            GatewayError::NotFound(msg) => ModelError::NotFound(msg),
            other => ModelError::Gateway(other),
        })?;
        let obj = Self::from_data_with_infer(data, infer)?;
        info!(target: "evalkit::model", url = %gateway.model_url(obj.id), "loaded model '{name}'");
        Ok(obj)
    }

    /// All inferences stored for this model on `test_case`, in server order.
    pub fn load_inferences(&self, gateway: &dyn Gateway, test_case: &TestCase) -> Result<Vec<InferenceTriple<W>>> {
        self.load_inferences_batched(gateway, test_case, LOAD_SAMPLES_BATCH_SIZE)
    }

    pub fn load_inferences_batched(&self, gateway: &dyn Gateway, test_case: &TestCase, batch_size: usize) -> Result<Vec<InferenceTriple<W>>> {
        self.iter_inferences_batched(gateway, test_case, batch_size)?.collect()
    }

    /// Lazily iterates inferences stored for this model on `test_case`. Pages are fetched as the
    /// iterator is consumed.
    pub fn iter_inferences<'g>(&self, gateway: &'g dyn Gateway, test_case: &TestCase) -> Result<InferenceIter<'g, W>> {
        self.iter_inferences_batched(gateway, test_case, LOAD_SAMPLES_BATCH_SIZE)
    }

    pub fn iter_inferences_batched<'g>(&self, gateway: &'g dyn Gateway, test_case: &TestCase, batch_size: usize) -> Result<InferenceIter<'g, W>> {
        assert_workflows_match(W::NAME, test_case.workflow())?;
        if batch_size == 0 { return Err(ModelError::Usage("batch size must be positive".into())); }
        let test_case_label = format!("'{}' (v{})", test_case.name(), test_case.version());
        info!(target: "evalkit::model", "loading inferences from model '{}' on test case {}", self.name, test_case_label);
        let request = LoadInferencesRequest { model_id: self.id, test_case_id: test_case.id(), batch_size };
        Ok(InferenceIter {
            loader: BatchedLoader::new(gateway, request),
            model_name: self.name.clone(),
            test_case_label,
            done: false,
            _workflow: PhantomData,
        })
    }

    pub fn id(&self) -> i64 { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn metadata(&self) -> &Metadata { &self.metadata }
    pub fn workflow(&self) -> &'static str { W::NAME }
    pub fn has_infer(&self) -> bool { self.infer.is_some() }

    /// Runs the local inference function, if one was supplied.
    pub fn infer(&self, test_sample: &W::TestSample) -> Option<W::Inference> { self.infer.as_ref().map(|f| f(test_sample)) }

    fn from_data_with_infer(data: EntityData, infer: Option<InferFn<W>>) -> Result<Self> {
        assert_workflows_match(W::NAME, &data.workflow)?;
        Ok(Self { id: data.id, name: data.name, metadata: data.metadata, infer, _workflow: PhantomData })
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() { return Err(ModelError::Usage("model name must not be empty".into())); }
    Ok(())
}

impl<W: Workflow> Clone for Model<W> {
    fn clone(&self) -> Self {
        Self { id: self.id, name: self.name.clone(), metadata: self.metadata.clone(), infer: self.infer.clone(), _workflow: PhantomData }
    }
}

impl<W: Workflow> fmt::Debug for Model<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("workflow", &W::NAME)
            .field("metadata", &self.metadata)
            .field("infer", &self.infer.is_some())
            .finish()
    }
}

/// Lazy view over a model's stored inferences. Single pass: call `iter_inferences` again to restart.
pub struct InferenceIter<'g, W: Workflow> {
    loader: BatchedLoader<'g>,
    model_name: String,
    test_case_label: String,
    done: bool,
    _workflow: PhantomData<fn() -> W>,
}

impl<W: Workflow> InferenceIter<'_, W> {
    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize { self.loader.pages_fetched() }
}

impl<W: Workflow> Iterator for InferenceIter<'_, W> {
    type Item = Result<InferenceTriple<W>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done { return None; }
        match self.loader.next() {
            Some(Ok(record)) => {
                let triple = decode_record::<W>(record);
                if triple.is_err() { self.done = true; }
                Some(triple)
            }
            Some(Err(e)) => { self.done = true; Some(Err(e)) }
            None => {
                self.done = true;
                info!(target: "evalkit::model", status = "success", "loaded inferences from model '{}' on test case {}", self.model_name, self.test_case_label);
                None
            }
        }
    }
}
