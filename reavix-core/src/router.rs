//! Router: route registry plus one path trie per method, behind a single mutex.
//!
//! Every registration and every lookup takes the same lock. Critical sections are in-memory
//! walks bounded by path length; handlers are cloned out and run after the lock is released.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::pipeline::HandlerRef;
use crate::registry::RouteRegistry;
use crate::security::RateLimit;
use crate::trie::{segments, PathParam, PathTrie};
use crate::CoreError;

/// Result of [`Router::match_route`].
#[derive(Clone)]
pub struct RouteMatch {
    pub handler: HandlerRef,
    pub params: Vec<PathParam>,
    pub rate_limit: Option<RateLimit>,
}

struct RouterState {
    registry: Option<RouteRegistry<HandlerRef>>,
    tries: HashMap<String, PathTrie<HandlerRef>>,
}

pub struct Router {
    state: Mutex<RouterState>,
}

/// Canonical form of a path template: leading slash, no empty segments.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in segments(path) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

impl Router {
    /// Uninitialized router; call [`initialize`](Self::initialize) before registering.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RouterState {
                registry: None,
                tries: HashMap::new(),
            }),
        }
    }

    pub fn with_max_routes(max_routes: usize) -> Result<Self, CoreError> {
        let router = Self::new();
        router.initialize(max_routes)?;
        Ok(router)
    }

    /// One-time setup. Fails without side effects when already initialized or `max_routes == 0`.
    pub fn initialize(&self, max_routes: usize) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        if state.registry.is_some() {
            return Err(CoreError::AlreadyInitialized);
        }
        state.registry = Some(RouteRegistry::with_capacity(max_routes)?);
        tracing::debug!(max_routes, "router initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().registry.is_some()
    }

    /// Register `handler` for `(method, path)`.
    ///
    /// The path is normalized first, so `/a/` and `/a` name the same route. A template that
    /// resolves to an already bound trie node is a conflict even when spelled differently:
    /// `/users/:name` after `/users/:id` is refused rather than left unreachable. See
    /// "Parameter collisions" in DESIGN.md.
    /// The trie insert runs before the registry append and both happen under one lock, so a
    /// failure leaves neither structure modified.
    pub fn register(&self, method: &str, path: &str, handler: HandlerRef) -> Result<(), CoreError> {
        if path.is_empty() {
            return Err(CoreError::InvalidArgument("empty path".into()));
        }
        let path = normalize_path(path);
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let registry = state.registry.as_mut().ok_or(CoreError::NotInitialized)?;
        if let Err(e) = registry.check(method, &path) {
            tracing::warn!(method, path = %path, error = %e, "route rejected");
            return Err(e);
        }
        let trie = state.tries.entry(method.to_owned()).or_default();
        // `/users/:id` and `/users/:name` land on the same node.
        if trie.get(&path).is_some() {
            tracing::warn!(method, path = %path, "route collides with an existing parameter route");
            return Err(CoreError::Conflict {
                method: method.to_owned(),
                path,
            });
        }
        trie.insert(&path, handler.clone())?;
        registry.push(method, &path, handler)?;
        tracing::info!(method, path = %path, "route registered");
        Ok(())
    }

    /// Attach a rate limit to a registered route.
    pub fn set_rate_limit(&self, method: &str, path: &str, limit: RateLimit) -> Result<(), CoreError> {
        let path = normalize_path(path);
        let mut state = self.state.lock();
        let attached = state
            .tries
            .get_mut(method)
            .map(|trie| trie.set_rate_limit(&path, limit))
            .unwrap_or(false);
        if attached {
            Ok(())
        } else {
            Err(CoreError::InvalidArgument(format!(
                "no route registered for {} {}",
                method, path
            )))
        }
    }

    /// Match a request path against the routes registered for `method`.
    pub fn match_route(&self, method: &str, path: &str) -> Option<RouteMatch> {
        let state = self.state.lock();
        let found = state.tries.get(method)?.match_path(path)?;
        Some(RouteMatch {
            handler: found.value.clone(),
            params: found.params,
            rate_limit: found.rate_limit.cloned(),
        })
    }

    /// Whether any method has a route matching `path`.
    pub fn matches_any_method(&self, path: &str) -> bool {
        let state = self.state.lock();
        state.tries.values().any(|t| t.match_path(path).is_some())
    }

    /// Registered `(method, path)` pairs in registration order.
    pub fn routes(&self) -> Vec<(String, String)> {
        let state = self.state.lock();
        state
            .registry
            .iter()
            .flat_map(|r| r.entries())
            .map(|e| (e.method.clone(), e.path.clone()))
            .collect()
    }

    /// Number of registry entries.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.registry.as_ref().map_or(0, |r| r.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of terminal trie nodes across all methods.
    pub fn leaf_count(&self) -> usize {
        let state = self.state.lock();
        state.tries.values().map(|t| t.len()).sum()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
