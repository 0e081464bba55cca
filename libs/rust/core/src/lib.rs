//! Client-side model descriptors for the evaluation platform.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::prelude::*;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Installs the global subscriber once. `RUST_LOG` drives filtering; `EVALKIT_JSON_LOG=1` switches
/// to JSON lines.
pub fn init_tracing() -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let json = std::env::var("EVALKIT_JSON_LOG").ok().map(|v| v=="1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);
        if json {
            registry.with(tracing_subscriber::fmt::layer().json().flatten_event(true).with_current_span(true).with_span_list(false)).try_init()?;
        } else {
            registry.with(tracing_subscriber::fmt::layer().with_target(true).with_line_number(true)).try_init()?;
        }
        Ok(())
    })?;
    info!(target: "evalkit", "tracing initialized");
    Ok(())
}

pub mod codec;
pub mod error;
pub mod gateway;
pub mod http;
pub mod model;
pub mod pager;
mod resilience;
pub mod settings;
pub mod test_case;
pub mod workflow;

pub use error::{ModelError, Result as ModelResult};
pub use gateway::{CreateRequest, EntityData, Gateway, GatewayError, InferencePage, InferenceRecord, LoadByNameRequest, LoadInferencesRequest, Metadata, PageCursor};
pub use http::HttpGateway;
pub use model::{InferFn, InferenceIter, InferenceTriple, Model, LOAD_SAMPLES_BATCH_SIZE};
pub use resilience::{retry_blocking, RetryConfig};
pub use settings::{ClientConfig, RetrySettings};
pub use test_case::TestCase;
pub use workflow::Workflow;
