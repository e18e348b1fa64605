//! Data providers: where an operation is actually carried out.
//!
//! # Design
//! The mode flag is read once, by `select_provider`, which returns either a
//! `RemoteProvider` (HTTP through the host's `Transport`) or a
//! `LocalProvider` (an in-environment `LocalBackend`). Callers never probe
//! for a backend per call.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Mode, ResolvedConfig};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::operation::Operation;

/// Unparsed outcome of a dispatched operation, consumed by
/// `ApiClient::handle_response`.
#[derive(Debug, Clone)]
pub enum Reply {
    Http {
        response: HttpResponse,
        /// The request was made on behalf of a session, so a 401 means the
        /// session is gone.
        authenticated: bool,
    },
    Local(Value),
}

pub trait DataProvider {
    fn mode(&self) -> Mode;
    fn dispatch(&self, op: &Operation, token: Option<&str>) -> Result<Reply, ApiError>;
}

/// In-environment data store used in local mode. Receives every operation by
/// value and answers with the same JSON shape the backend would.
pub trait LocalBackend {
    fn invoke(&self, op: &Operation, token: Option<&str>) -> Result<Value, ApiError>;
}

pub struct RemoteProvider<T> {
    base_url: Option<String>,
    transport: T,
}

impl<T: Transport> RemoteProvider<T> {
    pub fn new(base_url: Option<&str>, transport: T) -> Self {
        Self {
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            transport,
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn build_request(&self, op: &Operation, token: Option<&str>) -> Result<HttpRequest, ApiError> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            ApiError::Configuration("no backend endpoint was resolved for this page".to_string())
        })?;

        let mut headers = Vec::new();
        let body = match op.body() {
            Some(value) => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(serde_json::to_string(&value).map_err(|e| ApiError::Serialization(e.to_string()))?)
            }
            None => None,
        };
        if let Some(token) = token.filter(|_| op.requires_auth()) {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        Ok(HttpRequest {
            method: op.method(),
            url: format!("{base_url}/{}", op.path()),
            headers,
            body,
            with_credentials: true,
        })
    }
}

impl<T: Transport> DataProvider for RemoteProvider<T> {
    fn mode(&self) -> Mode {
        Mode::Remote
    }

    fn dispatch(&self, op: &Operation, token: Option<&str>) -> Result<Reply, ApiError> {
        let request = self.build_request(op, token)?;
        debug!(operation = op.name(), method = request.method.as_str(), url = %request.url, "sending request");
        let response = self.transport.execute(request).map_err(|e| {
            let base_url = self.base_url.clone().unwrap_or_default();
            warn!(operation = op.name(), %base_url, error = %e, "request failed before a response arrived");
            ApiError::Connectivity {
                base_url,
                reason: e.to_string(),
            }
        })?;
        Ok(Reply::Http {
            response,
            authenticated: op.requires_auth(),
        })
    }
}

#[derive(Default)]
pub struct LocalProvider {
    backend: Option<Box<dyn LocalBackend>>,
}

impl LocalProvider {
    pub fn new(backend: Option<Box<dyn LocalBackend>>) -> Self {
        Self { backend }
    }
}

impl DataProvider for LocalProvider {
    fn mode(&self) -> Mode {
        Mode::Local
    }

    fn dispatch(&self, op: &Operation, token: Option<&str>) -> Result<Reply, ApiError> {
        let backend = self.backend.as_ref().ok_or(ApiError::LocalProviderUnavailable)?;
        debug!(operation = op.name(), "invoking local backend");
        backend.invoke(op, token).map(Reply::Local)
    }
}

/// Picks the provider for the page's lifetime from the resolved mode flag.
pub fn select_provider<T: Transport + 'static>(
    config: &ResolvedConfig,
    transport: T,
    local: Option<Box<dyn LocalBackend>>,
) -> Box<dyn DataProvider> {
    match config.mode() {
        Mode::Local => Box::new(LocalProvider::new(local)),
        Mode::Remote => Box::new(RemoteProvider::new(config.resolved_endpoint(), transport)),
    }
}
