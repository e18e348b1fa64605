//! Runtime configuration resolution.
//!
//! Decides once per page load which backend endpoint the client talks to and
//! whether data calls go to the remote API or to the local provider. Inputs
//! are layered and only partially trusted: an injected configuration object,
//! persisted storage and the page's query string.

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::error::ApiError;
use crate::storage::{KeyValueStore, API_BASE_URL_KEY, REMOTE_API_URL_KEY, USE_LOCAL_DB_KEY};

/// Endpoint used when the page itself is served from a loopback host.
pub const LOCAL_DEV_URL: &str = "http://localhost:3000/api";
/// Compiled-in remote endpoint.
pub const DEFAULT_REMOTE_URL: &str = "https://training-recording-backend.onrender.com/api";

/// Produced by a known bad-encoding bug; such values are never trusted.
const CORRUPT_MARKER: &str = "xn--_";
/// An unconfigured default still carries its template marker.
const PLACEHOLDER_MARKER: &str = "YOUR_";
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

const API_URL_PARAM: &str = "apiUrl";
const LOCAL_DB_PARAM: &str = "localDb";

/// Which backend every data operation is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Remote,
    Local,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    Injected,
    Stored,
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub value: String,
    pub source: SettingSource,
}

/// Which resolution step produced the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSource {
    ApiBaseUrl,
    RemoteApiUrl,
    LocalDevelopment,
    QueryParameter,
    CompiledDefault,
    Unresolved,
}

/// The page the client was loaded into.
#[derive(Debug, Clone)]
pub struct PageContext {
    url: Url,
}

impl PageContext {
    pub fn parse(href: &str) -> Result<Self, ApiError> {
        let url = Url::parse(href).map_err(|e| ApiError::InvalidUrl {
            value: href.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { url })
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    pub fn is_loopback(&self) -> bool {
        LOOPBACK_HOSTS.contains(&self.host())
    }

    fn is_static_host(&self, suffixes: &[String]) -> bool {
        let host = self.host();
        suffixes.iter().any(|s| {
            host == s.as_str() || host.strip_suffix(s.as_str()).is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// Configuration object injected into the page before the client loads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InjectedConfig {
    /// Only a JSON string is a candidate; any other type is ignored.
    pub api_base_url: Option<Value>,
    pub remote_api_url: Option<Value>,
    /// Boolean-like: `true`, `1`, `"yes"`, ...
    pub use_local_db: Option<Value>,
}

impl InjectedConfig {
    /// Anything other than a JSON object is treated as an empty config.
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        if !value.is_object() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| ApiError::Deserialization(e.to_string()))?;
        Self::from_value(value)
    }
}

/// Knobs for the resolution steps that depend on deployment.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub default_remote_url: Option<String>,
    pub local_dev_url: String,
    /// Host suffixes of static-hosting origins where a configuration step is
    /// expected.
    pub static_host_suffixes: Vec<String>,
    /// Use `default_remote_url` even when served from a static host with
    /// nothing configured.
    pub allow_default_on_static_host: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            default_remote_url: Some(DEFAULT_REMOTE_URL.to_string()),
            local_dev_url: LOCAL_DEV_URL.to_string(),
            static_host_suffixes: vec!["github.io".to_string()],
            allow_default_on_static_host: false,
        }
    }
}

/// Merged raw inputs, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub api_base_url: Option<Setting>,
    pub remote_api_url: Option<Setting>,
    pub use_local_db: Option<bool>,
}

impl RuntimeConfig {
    pub fn gather(page: &PageContext, injected: &InjectedConfig, store: &dyn KeyValueStore) -> Self {
        let use_local_db = page
            .query_param(LOCAL_DB_PARAM)
            .as_deref()
            .and_then(parse_bool)
            .or_else(|| injected.use_local_db.as_ref().and_then(bool_from_value))
            .or_else(|| store.get(USE_LOCAL_DB_KEY).as_deref().and_then(parse_bool));

        Self {
            api_base_url: layered(injected_url(&injected.api_base_url, "apiBaseUrl"), store, API_BASE_URL_KEY),
            remote_api_url: layered(
                injected_url(&injected.remote_api_url, "remoteApiUrl"),
                store,
                REMOTE_API_URL_KEY,
            ),
            use_local_db,
        }
    }
}

/// Outcome of resolution; computed once and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    endpoint: Option<String>,
    source: EndpointSource,
    use_local_db: bool,
}

impl ResolvedConfig {
    pub fn remote(endpoint: &str) -> Self {
        Self {
            endpoint: Some(endpoint.to_string()),
            source: EndpointSource::ApiBaseUrl,
            use_local_db: false,
        }
    }

    pub fn local() -> Self {
        Self {
            endpoint: None,
            source: EndpointSource::Unresolved,
            use_local_db: true,
        }
    }

    /// The resolved endpoint, or a configuration error when none was found.
    pub fn endpoint(&self) -> Result<&str, ApiError> {
        self.endpoint.as_deref().ok_or_else(|| {
            ApiError::Configuration(format!(
                "set {REMOTE_API_URL_KEY} in storage, remoteApiUrl in the page config, or ?{API_URL_PARAM}= in the address"
            ))
        })
    }

    pub fn resolved_endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn source(&self) -> EndpointSource {
        self.source
    }

    pub fn use_local_db(&self) -> bool {
        self.use_local_db
    }

    pub fn mode(&self) -> Mode {
        if self.use_local_db {
            Mode::Local
        } else {
            Mode::Remote
        }
    }
}

/// Accepts `1/0`, `true/false`, `yes/no`, `y/n` in any case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn bool_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => parse_bool(&n.to_string()),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

fn injected_url<'a>(value: &'a Option<Value>, field: &str) -> Option<&'a str> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) => {
            warn!(field, value = %other, "ignoring non-string injected API URL");
            None
        }
    }
}

fn layered(injected: Option<&str>, store: &dyn KeyValueStore, key: &str) -> Option<Setting> {
    if let Some(value) = injected.filter(|v| !v.is_empty()) {
        return Some(Setting {
            value: value.to_string(),
            source: SettingSource::Injected,
        });
    }
    store.get(key).filter(|v| !v.is_empty()).map(|value| Setting {
        value,
        source: SettingSource::Stored,
    })
}

fn is_corrupt(candidate: &str) -> bool {
    candidate.contains(CORRUPT_MARKER)
}

/// Checks that `candidate` is an absolute `http`/`https` URL free of the
/// corrupt-encoding marker. Returns the trimmed value.
pub fn validate_url(candidate: &str) -> Result<String, ApiError> {
    let trimmed = candidate.trim();
    let invalid = |reason: &str| ApiError::InvalidUrl {
        value: trimmed.to_string(),
        reason: reason.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }
    if is_corrupt(trimmed) {
        return Err(invalid("contains a corrupt encoding marker"));
    }
    let parsed = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(invalid(&format!("unsupported scheme {other}"))),
    }
}

/// Validates a candidate, purging its storage key when it must not survive
/// a reload.
fn accept(setting: &Setting, key: &str, store: &dyn KeyValueStore) -> Option<String> {
    match validate_url(&setting.value) {
        Ok(url) => Some(url),
        Err(err) => {
            warn!(key, source = ?setting.source, %err, "discarding API URL candidate");
            if is_corrupt(&setting.value) || setting.source == SettingSource::Stored {
                store.remove(key);
            }
            None
        }
    }
}

fn resolve_endpoint(
    page: &PageContext,
    runtime: &RuntimeConfig,
    store: &dyn KeyValueStore,
    settings: &ResolverSettings,
) -> (Option<String>, EndpointSource) {
    if let Some(url) = runtime
        .api_base_url
        .as_ref()
        .and_then(|s| accept(s, API_BASE_URL_KEY, store))
    {
        return (Some(url), EndpointSource::ApiBaseUrl);
    }

    if let Some(url) = runtime
        .remote_api_url
        .as_ref()
        .and_then(|s| accept(s, REMOTE_API_URL_KEY, store))
    {
        return (Some(url), EndpointSource::RemoteApiUrl);
    }

    if page.is_loopback() {
        return (Some(settings.local_dev_url.clone()), EndpointSource::LocalDevelopment);
    }

    if let Some(param) = page.query_param(API_URL_PARAM) {
        let setting = Setting {
            value: param,
            source: SettingSource::Query,
        };
        if let Some(url) = accept(&setting, REMOTE_API_URL_KEY, store) {
            store.set(REMOTE_API_URL_KEY, &url);
            return (Some(url), EndpointSource::QueryParameter);
        }
    }

    let static_host = page.is_static_host(&settings.static_host_suffixes);
    if let Some(default) = settings
        .default_remote_url
        .as_deref()
        .filter(|d| !d.contains(PLACEHOLDER_MARKER))
    {
        if static_host && !settings.allow_default_on_static_host {
            warn!(
                host = page.host(),
                "static host without configured API URL, not falling back to the compiled default"
            );
            return (None, EndpointSource::Unresolved);
        }
        match validate_url(default) {
            Ok(url) => return (Some(url), EndpointSource::CompiledDefault),
            Err(err) => warn!(%err, "compiled default API URL is invalid"),
        }
    }

    warn!(
        host = page.host(),
        "API URL is not configured, set {REMOTE_API_URL_KEY} in storage"
    );
    (None, EndpointSource::Unresolved)
}

/// Runs the full resolution: endpoint steps first-match-wins, then the mode
/// flag (query, injected, stored; default remote).
pub fn resolve(
    page: &PageContext,
    injected: &InjectedConfig,
    store: &dyn KeyValueStore,
    settings: &ResolverSettings,
) -> ResolvedConfig {
    let runtime = RuntimeConfig::gather(page, injected, store);
    let (endpoint, source) = resolve_endpoint(page, &runtime, store, settings);
    let use_local_db = runtime.use_local_db.unwrap_or(false);
    info!(
        endpoint = endpoint.as_deref().unwrap_or("<none>"),
        ?source,
        use_local_db,
        "resolved API configuration"
    );
    ResolvedConfig {
        endpoint,
        source,
        use_local_db,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use tracing_test::traced_test;

    fn page(href: &str) -> PageContext {
        PageContext::parse(href).unwrap()
    }

    fn run(href: &str, injected: &InjectedConfig, store: &MemoryStore) -> ResolvedConfig {
        resolve(&page(href), injected, store, &ResolverSettings::default())
    }

    #[test]
    fn parse_bool_accepts_known_spellings() {
        for raw in ["1", "true", "TRUE", " yes ", "Y"] {
            assert_eq!(parse_bool(raw), Some(true), "{raw}");
        }
        for raw in ["0", "false", "No", "n"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn validate_rejects_non_http_and_garbage() {
        for bad in ["ftp://example.com/api", "javascript:alert(1)", "not a url", "/api", ""] {
            assert!(
                matches!(validate_url(bad), Err(ApiError::InvalidUrl { .. })),
                "{bad}"
            );
        }
        assert_eq!(
            validate_url("  https://example.com/api ").unwrap(),
            "https://example.com/api"
        );
    }

    #[test]
    fn localhost_without_config_uses_local_dev_endpoint() {
        let store = MemoryStore::new();
        let resolved = run("http://localhost/index.html", &InjectedConfig::default(), &store);
        assert_eq!(resolved.resolved_endpoint(), Some("http://localhost:3000/api"));
        assert_eq!(resolved.source(), EndpointSource::LocalDevelopment);
        assert!(!resolved.use_local_db());
        assert_eq!(resolved.mode(), Mode::Remote);
    }

    #[test]
    fn injected_api_base_url_beats_localhost() {
        let store = MemoryStore::new();
        let injected = InjectedConfig {
            api_base_url: Some(json!("https://example.com/api")),
            ..Default::default()
        };
        let resolved = run("http://127.0.0.1:8080/", &injected, &store);
        assert_eq!(resolved.endpoint().unwrap(), "https://example.com/api");
        assert_eq!(resolved.source(), EndpointSource::ApiBaseUrl);
    }

    #[test]
    fn stored_remote_url_used_when_no_base_override() {
        let store = MemoryStore::with_entries([(REMOTE_API_URL_KEY, "https://backend.example.org/api")]);
        let resolved = run("https://someone.github.io/app/", &InjectedConfig::default(), &store);
        assert_eq!(resolved.resolved_endpoint(), Some("https://backend.example.org/api"));
        assert_eq!(resolved.source(), EndpointSource::RemoteApiUrl);
    }

    #[test]
    fn invalid_stored_value_is_purged_and_skipped() {
        let store = MemoryStore::with_entries([(API_BASE_URL_KEY, "ftp://files.example.com")]);
        let resolved = run("http://localhost:8080/", &InjectedConfig::default(), &store);
        assert_eq!(resolved.source(), EndpointSource::LocalDevelopment);
        assert!(store.get(API_BASE_URL_KEY).is_none());
    }

    #[test]
    fn invalid_injected_value_does_not_touch_storage() {
        let store = MemoryStore::with_entries([(REMOTE_API_URL_KEY, "https://kept.example.com/api")]);
        let injected = InjectedConfig {
            remote_api_url: Some(json!("not a url")),
            ..Default::default()
        };
        let resolved = run("https://app.example.net/", &injected, &store);
        assert_eq!(resolved.source(), EndpointSource::CompiledDefault);
        assert_eq!(
            store.get(REMOTE_API_URL_KEY).as_deref(),
            Some("https://kept.example.com/api")
        );
    }

    #[test]
    #[traced_test]
    fn corrupt_value_is_rejected_and_purged() {
        let store = MemoryStore::with_entries([(REMOTE_API_URL_KEY, "https://xn--_railway_domain/api")]);
        let resolved = run("https://someone.github.io/app/", &InjectedConfig::default(), &store);
        assert_eq!(resolved.resolved_endpoint(), None);
        assert!(store.get(REMOTE_API_URL_KEY).is_none());
        assert!(logs_contain("discarding API URL candidate"));
    }

    #[test]
    fn corrupt_injected_value_still_purges_its_key() {
        let store = MemoryStore::with_entries([(API_BASE_URL_KEY, "https://stale.example.com/api")]);
        let injected = InjectedConfig {
            api_base_url: Some(json!("https://xn--_bad/api")),
            ..Default::default()
        };
        run("http://localhost/", &injected, &store);
        assert!(store.get(API_BASE_URL_KEY).is_none());
    }

    #[test]
    fn query_api_url_is_validated_and_persisted() {
        let store = MemoryStore::new();
        let resolved = run(
            "https://app.example.net/?apiUrl=https%3A%2F%2Fbackend.example.org%2Fapi",
            &InjectedConfig::default(),
            &store,
        );
        assert_eq!(resolved.resolved_endpoint(), Some("https://backend.example.org/api"));
        assert_eq!(resolved.source(), EndpointSource::QueryParameter);
        assert_eq!(
            store.get(REMOTE_API_URL_KEY).as_deref(),
            Some("https://backend.example.org/api")
        );
    }

    #[test]
    fn invalid_query_api_url_is_not_persisted() {
        let store = MemoryStore::new();
        let resolved = run(
            "https://app.example.net/?apiUrl=mailto:ops@example.org",
            &InjectedConfig::default(),
            &store,
        );
        assert_eq!(resolved.source(), EndpointSource::CompiledDefault);
        assert!(store.get(REMOTE_API_URL_KEY).is_none());
    }

    #[test]
    fn static_host_without_config_is_unresolved() {
        let store = MemoryStore::new();
        let resolved = run("https://someone.github.io/app/", &InjectedConfig::default(), &store);
        assert_eq!(resolved.source(), EndpointSource::Unresolved);
        assert!(matches!(resolved.endpoint(), Err(ApiError::Configuration(_))));
    }

    #[test]
    fn static_host_may_opt_into_default() {
        let store = MemoryStore::new();
        let settings = ResolverSettings {
            allow_default_on_static_host: true,
            ..Default::default()
        };
        let resolved = resolve(
            &page("https://someone.github.io/app/"),
            &InjectedConfig::default(),
            &store,
            &settings,
        );
        assert_eq!(resolved.resolved_endpoint(), Some(DEFAULT_REMOTE_URL));
    }

    #[test]
    fn placeholder_default_is_never_used() {
        let store = MemoryStore::new();
        let settings = ResolverSettings {
            default_remote_url: Some("https://YOUR_DOMAIN.onrender.com/api".to_string()),
            ..Default::default()
        };
        let resolved = resolve(
            &page("https://app.example.net/"),
            &InjectedConfig::default(),
            &store,
            &settings,
        );
        assert_eq!(resolved.resolved_endpoint(), None);
    }

    #[test]
    fn query_mode_flag_beats_storage() {
        let store = MemoryStore::with_entries([(USE_LOCAL_DB_KEY, "false")]);
        let resolved = run("http://localhost/?localDb=true", &InjectedConfig::default(), &store);
        assert!(resolved.use_local_db());
        assert_eq!(resolved.mode(), Mode::Local);
    }

    #[test]
    fn ambiguous_query_flag_falls_through_to_injected_then_storage() {
        let store = MemoryStore::with_entries([(USE_LOCAL_DB_KEY, "yes")]);
        let injected = InjectedConfig::from_value(json!({ "useLocalDb": 0 })).unwrap();
        let resolved = run("http://localhost/?localDb=perhaps", &injected, &store);
        assert!(!resolved.use_local_db());

        let resolved = run("http://localhost/?localDb=perhaps", &InjectedConfig::default(), &store);
        assert!(resolved.use_local_db());
    }

    #[test]
    fn injected_config_from_json() {
        let injected = InjectedConfig::from_json(
            r#"{"apiBaseUrl":"https://a.example/api","useLocalDb":"Y","extra":1}"#,
        )
        .unwrap();
        assert_eq!(injected.api_base_url, Some(json!("https://a.example/api")));
        assert!(injected.remote_api_url.is_none());
        assert_eq!(injected.use_local_db, Some(json!("Y")));

        let empty = InjectedConfig::from_json("[1,2]").unwrap();
        assert!(empty.api_base_url.is_none());
    }

    #[test]
    fn empty_injected_string_falls_back_to_storage() {
        let store = MemoryStore::with_entries([(API_BASE_URL_KEY, "https://stored.example/api")]);
        let injected = InjectedConfig {
            api_base_url: Some(json!("")),
            ..Default::default()
        };
        let runtime = RuntimeConfig::gather(&page("https://x.example/"), &injected, &store);
        assert_eq!(
            runtime.api_base_url,
            Some(Setting {
                value: "https://stored.example/api".to_string(),
                source: SettingSource::Stored,
            })
        );
    }

    #[test]
    fn non_string_injected_url_is_skipped_not_fatal() {
        let injected = InjectedConfig::from_value(json!({
            "apiBaseUrl": 42,
            "remoteApiUrl": "https://ok.example.org/api"
        }))
        .unwrap();
        let store = MemoryStore::new();
        let resolved = run("https://app.example.net/", &injected, &store);
        assert_eq!(resolved.resolved_endpoint(), Some("https://ok.example.org/api"));
        assert_eq!(resolved.source(), EndpointSource::RemoteApiUrl);
    }

    #[test]
    fn non_string_injected_url_falls_back_to_storage() {
        let store = MemoryStore::with_entries([(API_BASE_URL_KEY, "https://stored.example/api")]);
        let injected = InjectedConfig::from_value(json!({ "apiBaseUrl": { "url": "x" } })).unwrap();
        let resolved = run("https://app.example.net/", &injected, &store);
        assert_eq!(resolved.resolved_endpoint(), Some("https://stored.example/api"));
        assert_eq!(resolved.source(), EndpointSource::ApiBaseUrl);
    }

    #[test]
    fn static_host_suffix_matches_whole_labels() {
        let suffixes = vec!["github.io".to_string()];
        assert!(page("https://unit.github.io/app/").is_static_host(&suffixes));
        assert!(page("https://github.io/").is_static_host(&suffixes));
        assert!(!page("https://evilgithub.io/").is_static_host(&suffixes));

        let store = MemoryStore::new();
        let resolved = run("https://evilgithub.io/", &InjectedConfig::default(), &store);
        assert_eq!(resolved.source(), EndpointSource::CompiledDefault);
    }
}
