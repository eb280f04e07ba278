//! Flat, ordered list of registered routes with a fixed capacity.
//!
//! The registry answers "is `(method, path)` taken?" and "which methods exist for a path?".
//! It does not match request paths; [`crate::Router`] pairs it with the path tries.

use crate::CoreError;

/// One registered route.
#[derive(Clone, Debug)]
pub struct RouteEntry<H> {
    pub method: String,
    pub path: String,
    pub handler: H,
}

#[derive(Debug)]
pub struct RouteRegistry<H> {
    entries: Vec<RouteEntry<H>>,
    capacity: usize,
}

impl<H> RouteRegistry<H> {
    /// Registry holding at most `max_routes` entries. Zero is rejected.
    pub fn with_capacity(max_routes: usize) -> Result<Self, CoreError> {
        if max_routes == 0 {
            return Err(CoreError::InvalidArgument("max_routes must be > 0".into()));
        }
        Ok(Self {
            entries: Vec::new(),
            capacity: max_routes,
        })
    }

    /// Check that `(method, path)` could be appended: both non-empty, not taken, room left.
    pub fn check(&self, method: &str, path: &str) -> Result<(), CoreError> {
        if method.is_empty() {
            return Err(CoreError::InvalidArgument("empty method".into()));
        }
        if path.is_empty() {
            return Err(CoreError::InvalidArgument("empty path".into()));
        }
        if self.contains(method, path) {
            return Err(CoreError::Conflict {
                method: method.to_owned(),
                path: path.to_owned(),
            });
        }
        if self.entries.len() >= self.capacity {
            return Err(CoreError::Capacity(self.capacity));
        }
        Ok(())
    }

    /// Append a route after [`check`](Self::check).
    pub fn push(&mut self, method: &str, path: &str, handler: H) -> Result<(), CoreError> {
        self.check(method, path)?;
        self.entries.push(RouteEntry {
            method: method.to_owned(),
            path: path.to_owned(),
            handler,
        });
        Ok(())
    }

    pub fn contains(&self, method: &str, path: &str) -> bool {
        self.get(method, path).is_some()
    }

    pub fn get(&self, method: &str, path: &str) -> Option<&RouteEntry<H>> {
        self.entries
            .iter()
            .find(|e| e.method == method && e.path == path)
    }

    /// Methods registered for the exact path template, in registration order.
    pub fn methods_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.path == path)
            .map(|e| e.method.as_str())
    }

    pub fn entries(&self) -> &[RouteEntry<H>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
