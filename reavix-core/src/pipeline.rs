//! Per-request dispatch: middleware → pre-handler hooks → route match + handler (or 404)
//! → post-handler hooks.
//!
//! A middleware or pre-hook ends the request early by sending the response; the remaining
//! middleware, pre-hooks and the handler are then skipped. Post-hooks run exactly once for
//! every dispatched request, short-circuited or not.

use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::security::{NoRateLimit, RateLimiter};

/// Route handler. Implemented for any `Fn(&Request, &mut Response)`.
pub trait Handler: Send + Sync {
    fn handle(&self, req: &Request, res: &mut Response);
}

impl<F> Handler for F
where
    F: Fn(&Request, &mut Response) + Send + Sync,
{
    fn handle(&self, req: &Request, res: &mut Response) {
        self(req, res)
    }
}

pub type HandlerRef = Arc<dyn Handler>;

/// Runs before routing. Sending the response stops the pipeline.
/// Implemented for any `Fn(&mut Request, &mut Response)`.
pub trait Middleware: Send + Sync {
    fn call(&self, req: &mut Request, res: &mut Response);
}

impl<F> Middleware for F
where
    F: Fn(&mut Request, &mut Response) + Send + Sync,
{
    fn call(&self, req: &mut Request, res: &mut Response) {
        self(req, res)
    }
}

/// Hooks around route dispatch. Both hooks default to doing nothing.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Runs after the middleware chain, before routing. Sending the response stops the pipeline.
    fn before(&self, _req: &mut Request, _res: &mut Response) {}

    /// Runs once per request after the handler, the 404 fallback or a short-circuit.
    fn after(&self, _req: &Request, _res: &mut Response) {}
}

/// How a dispatch ended before the post-hooks ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A middleware or pre-hook sent the response.
    ShortCircuited,
    Handled,
    NotFound,
    /// The route's rate limiter refused the request.
    RateLimited,
}

pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
    plugins: Vec<Arc<dyn Plugin>>,
    rate_limiter: Arc<dyn RateLimiter>,
    not_found_message: String,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
            plugins: Vec::new(),
            rate_limiter: Arc::new(NoRateLimit),
            not_found_message: "Not Found".to_string(),
        }
    }

    pub fn set_not_found_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.not_found_message = message.into();
        self
    }

    pub fn add_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn add_plugin(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn set_rate_limiter(&mut self, limiter: impl RateLimiter + 'static) -> &mut Self {
        self.rate_limiter = Arc::new(limiter);
        self
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Run the full pipeline for one request.
    pub fn dispatch(&self, router: &Router, req: &mut Request, res: &mut Response) -> Outcome {
        let outcome = self.run_until_handled(router, req, res);
        for plugin in &self.plugins {
            plugin.after(req, res);
        }
        tracing::debug!(
            trace_id = req.trace_id().unwrap_or("-"),
            method = %req.method,
            path = %req.path,
            status = res.status(),
            ?outcome,
            "request dispatched"
        );
        outcome
    }

    fn run_until_handled(&self, router: &Router, req: &mut Request, res: &mut Response) -> Outcome {
        for middleware in &self.middleware {
            middleware.call(req, res);
            if res.is_sent() {
                return Outcome::ShortCircuited;
            }
        }
        for plugin in &self.plugins {
            plugin.before(req, res);
            if res.is_sent() {
                tracing::trace!(plugin = plugin.name(), "pre-hook sent the response");
                return Outcome::ShortCircuited;
            }
        }
        let Some(found) = router.match_route(&req.method, &req.path) else {
            res.send_error(404, &self.not_found_message);
            return Outcome::NotFound;
        };
        if let Some(limit) = &found.rate_limit {
            if !self.rate_limiter.check(req, limit) {
                res.send_error(429, "Too Many Requests");
                return Outcome::RateLimited;
            }
        }
        req.set_params(found.params);
        found.handler.handle(req, res);
        Outcome::Handled
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
