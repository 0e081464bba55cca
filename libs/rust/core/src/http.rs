//! Blocking HTTP implementation of [`Gateway`].

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::gateway::{CreateRequest, EntityData, Gateway, GatewayError, InferencePage, LoadByNameRequest, LoadInferencesRequest, PageCursor};
use crate::resilience::{retry_blocking, RetryConfig};
use crate::settings::ClientConfig;

pub const CREATE_PATH: &str = "generic/model/create";
pub const LOAD_PATH: &str = "generic/model/load";
pub const LOAD_INFERENCES_PATH: &str = "generic/model/load-inferences";

#[derive(Serialize)]
struct PageRequest<'a> {
    #[serde(flatten)]
    request: &'a LoadInferencesRequest,
    cursor: Option<&'a PageCursor>,
}

pub struct HttpGateway {
    client: Client,
    api_url: String,
    platform_url: String,
    retry: RetryConfig,
}

impl HttpGateway {
    pub fn new(cfg: &ClientConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &cfg.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| GatewayError::Transport(format!("invalid api token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .timeout(cfg.timeout())
            .default_headers(headers)
            .user_agent(concat!("evalkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            platform_url: cfg.platform_url.trim_end_matches('/').to_string(),
            retry: cfg.retry_config(),
        })
    }

    fn send<B: Serialize, T: DeserializeOwned>(&self, method: Method, path: &str, body: &B) -> Result<T, GatewayError> {
        let url = format!("{}/{}", self.api_url, path);
        // a repeated POST may find its own earlier write
        let retry = if is_idempotent(&method) { self.retry.clone() } else { RetryConfig::none() };
        retry_blocking(&retry, |attempt| {
            debug!(%method, %url, attempt, "gateway request");
            let resp = self.client.request(method.clone(), &url).json(body).send().map_err(|e| GatewayError::Transport(e.to_string()))?;
            let status = resp.status();
            if status == StatusCode::NOT_FOUND { return Err(GatewayError::NotFound(resp.text().unwrap_or_default())); }
            if !status.is_success() { return Err(GatewayError::Status { status: status.as_u16(), message: resp.text().unwrap_or_default() }); }
            resp.json::<T>().map_err(|e| GatewayError::Decode(e.to_string()))
        }, is_transient)
    }
}

fn is_idempotent(method: &Method) -> bool { *method != Method::POST && *method != Method::PATCH }

fn is_transient(e: &GatewayError) -> bool {
    match e {
        GatewayError::Transport(_) => true,
        GatewayError::Status { status, .. } => *status == 429 || *status >= 500,
        GatewayError::NotFound(_) | GatewayError::Decode(_) => false,
    }
}

impl Gateway for HttpGateway {
    fn create_model(&self, request: &CreateRequest) -> Result<EntityData, GatewayError> { self.send(Method::POST, CREATE_PATH, request) }
    fn load_model_by_name(&self, request: &LoadByNameRequest) -> Result<EntityData, GatewayError> { self.send(Method::PUT, LOAD_PATH, request) }
    fn fetch_inference_page(&self, request: &LoadInferencesRequest, cursor: Option<&PageCursor>) -> Result<InferencePage, GatewayError> {
        self.send(Method::PUT, LOAD_INFERENCES_PATH, &PageRequest { request, cursor })
    }
    fn model_url(&self, model_id: i64) -> String { format!("{}/results?models={}", self.platform_url, model_id) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(is_transient(&GatewayError::Transport("refused".into())));
        assert!(is_transient(&GatewayError::Status { status: 503, message: String::new() }));
        assert!(is_transient(&GatewayError::Status { status: 429, message: String::new() }));
        assert!(!is_transient(&GatewayError::Status { status: 409, message: String::new() }));
        assert!(!is_transient(&GatewayError::NotFound(String::new())));
    }

    #[test]
    fn only_idempotent_methods_are_retried() {
        assert!(is_idempotent(&Method::PUT));
        assert!(is_idempotent(&Method::GET));
        assert!(!is_idempotent(&Method::POST));
    }

    #[test]
    fn page_request_flattens_cursor() {
        let request = LoadInferencesRequest { model_id: 1, test_case_id: 2, batch_size: 10 };
        let cursor = PageCursor("c".into());
        let body = serde_json::to_value(PageRequest { request: &request, cursor: Some(&cursor) }).unwrap();
        assert_eq!(body, serde_json::json!({"model_id": 1, "test_case_id": 2, "batch_size": 10, "cursor": "c"}));
    }

    #[test]
    fn model_url_uses_platform_url() {
        let cfg = ClientConfig::from_yaml("platform_url: https://app.example.test/\n").unwrap();
        let gw = HttpGateway::new(&cfg).unwrap();
        assert_eq!(gw.model_url(12), "https://app.example.test/results?models=12");
    }
}
