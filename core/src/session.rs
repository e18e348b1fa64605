//! Per-page session state.
//!
//! Built once at startup from the resolved configuration and a
//! session-scoped store, then handed to the client. Holds the only mutable
//! process-wide state: the bearer token.

use crate::config::{Mode, ResolvedConfig};
use crate::storage::{KeyValueStore, AUTH_TOKEN_KEY};

pub struct SessionContext {
    config: ResolvedConfig,
    store: Box<dyn KeyValueStore>,
}

impl SessionContext {
    pub fn new(config: ResolvedConfig, store: impl KeyValueStore + 'static) -> Self {
        Self {
            config,
            store: Box::new(store),
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode()
    }

    /// Current bearer token; an empty stored value counts as absent.
    pub fn token(&self) -> Option<String> {
        self.store.get(AUTH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn set_token(&self, token: &str) {
        self.store.set(AUTH_TOKEN_KEY, token);
    }

    pub fn clear_token(&self) {
        self.store.remove(AUTH_TOKEN_KEY);
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("config", &self.config)
            .field("has_token", &self.token().is_some())
            .finish()
    }
}
