//! Endpoint set registry.
//!
//! # Responsibilities
//! - Hold the immutable, ordered {primary, fallback} pairs
//! - Own one lock-guarded FailoverState per set
//! - Resolve set indices from inbound requests
//!
//! # Design Decisions
//! - Immutable after construction; only the per-set state mutates
//! - Each set carries its own mutex, so sets never block each other
//! - The lock is never held across a network call: callers read what
//!   they need inside `with_state` and release before any await

use std::sync::{Arc, Mutex};

use alloy::providers::{Provider, ProviderBuilder};
use thiserror::Error;
use url::Url;

use crate::config::EndpointSetConfig;
use crate::failover::state::{FailoverState, Role};

/// Errors resolving an endpoint set for a request.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The request named a set index outside the configured range.
    #[error("invalid rpc set index {index}: {configured} sets configured")]
    InvalidSetIndex { index: usize, configured: usize },

    /// An endpoint URL failed to parse at startup.
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// An immutable {primary, fallback} URL pair.
#[derive(Debug, Clone)]
pub struct EndpointPair {
    pub primary: Url,
    pub fallback: Url,
}

impl EndpointPair {
    /// Resolve the concrete URL for a role.
    pub fn url_for(&self, role: Role) -> &Url {
        match role {
            Role::Primary => &self.primary,
            Role::Fallback => &self.fallback,
        }
    }
}

/// One configured endpoint set: the pair, its probe transport, and its
/// lock-guarded failover state.
pub struct EndpointSet {
    /// Position in the registry; carried in logs and metrics.
    pub index: usize,
    pub pair: EndpointPair,
    /// Probe transport for the primary endpoint. The monitor always
    /// probes the primary, whichever role is active.
    probe_provider: Arc<dyn Provider + Send + Sync>,
    state: Mutex<FailoverState>,
}

impl EndpointSet {
    fn new(index: usize, pair: EndpointPair) -> Self {
        let probe_provider = Arc::new(ProviderBuilder::new().connect_http(pair.primary.clone()))
            as Arc<dyn Provider + Send + Sync>;
        Self {
            index,
            pair,
            probe_provider,
            state: Mutex::new(FailoverState::new()),
        }
    }

    /// Run a closure against this set's state under its lock.
    ///
    /// Keep closures short: the critical section must not perform I/O.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut FailoverState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    /// Read the currently active role.
    pub fn active_role(&self) -> Role {
        self.with_state(|state| state.active_role())
    }

    /// Resolve the URL that should receive proxied traffic right now.
    pub fn active_url(&self) -> Url {
        self.pair.url_for(self.active_role()).clone()
    }

    pub fn probe_provider(&self) -> &(dyn Provider + Send + Sync) {
        self.probe_provider.as_ref()
    }
}

impl std::fmt::Debug for EndpointSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointSet")
            .field("index", &self.index)
            .field("primary", &self.pair.primary.as_str())
            .field("fallback", &self.pair.fallback.as_str())
            .finish()
    }
}

/// Immutable, ordered collection of endpoint sets, addressed by index.
#[derive(Debug)]
pub struct EndpointRegistry {
    sets: Vec<Arc<EndpointSet>>,
}

impl EndpointRegistry {
    /// Build the registry from validated configuration.
    pub fn from_config(configs: &[EndpointSetConfig]) -> Result<Self, RegistryError> {
        let mut sets = Vec::with_capacity(configs.len());
        for (index, config) in configs.iter().enumerate() {
            let parse = |url: &str| {
                Url::parse(url).map_err(|e| RegistryError::InvalidUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            };
            let pair = EndpointPair {
                primary: parse(&config.primary)?,
                fallback: parse(&config.fallback)?,
            };
            sets.push(Arc::new(EndpointSet::new(index, pair)));
        }
        Ok(Self { sets })
    }

    /// Look up a set by index. Out-of-range indices fail without
    /// touching any state.
    pub fn get(&self, index: usize) -> Result<&Arc<EndpointSet>, RegistryError> {
        self.sets.get(index).ok_or(RegistryError::InvalidSetIndex {
            index,
            configured: self.sets.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EndpointSet>> {
        self.sets.iter()
    }
}
