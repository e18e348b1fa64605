//! Client core for the training-records backend.
//!
//! # Overview
//! Resolves, once per page load, which backend endpoint to use and whether
//! data operations go to the remote HTTP API or to a local in-environment
//! store, then exposes every backend operation through one `ApiClient`
//! façade. The core performs no I/O itself: HTTP goes through the host's
//! `Transport`, browser storage through `KeyValueStore`.
//!
//! # Design
//! - `config::resolve` layers injected config, persisted storage and the
//!   query string, validating every candidate URL and purging corrupt
//!   persisted ones.
//! - `SessionContext` carries the resolved config and the bearer token.
//! - `select_provider` picks `RemoteProvider` or `LocalProvider` from the
//!   mode flag exactly once.
//! - `ApiClient::handle_response` is the only place statuses become
//!   `ApiError` variants.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod operation;
pub mod provider;
pub mod session;
pub mod storage;
pub mod types;

pub use client::ApiClient;
pub use config::{
    resolve, validate_url, EndpointSource, InjectedConfig, Mode, PageContext, ResolvedConfig,
    ResolverSettings, RuntimeConfig,
};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use operation::Operation;
pub use provider::{select_provider, DataProvider, LocalBackend, LocalProvider, RemoteProvider, Reply};
pub use session::SessionContext;
pub use storage::{KeyValueStore, MemoryStore};
pub use types::{
    AuthSession, Credentials, Crew, CrewInput, CrewMember, Equipment, EquipmentInput, EquipmentType,
    EquipmentTypeInput, Id, Personnel, PersonnelInput, Registration, Role, User,
};
