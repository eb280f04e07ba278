//! Application: registers routes, middleware and plugins; dispatches requests and serves them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::logging;
use crate::pipeline::{Handler, Middleware, Pipeline, Plugin};
use crate::plugins::{NegotiateCompression, RequestMetrics, SecurityHeaders};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::security::{RateLimit, RateLimiter};
use crate::service::Service;
use crate::CoreError;

/// Method under which WebSocket routes are registered and dispatched.
pub const WS_METHOD: &str = "WS";

pub struct Application {
    router: Arc<Router>,
    pipeline: Pipeline,
    config: ServerConfig,
    metrics: Option<RequestMetrics>,
}

impl Application {
    /// Initializes the router with `config.max_routes` and installs the built-in plugins the
    /// config asks for: security headers, compression negotiation, request metrics (with tracing).
    pub fn new(config: ServerConfig) -> Result<Self, CoreError> {
        let router = Router::with_max_routes(config.max_routes)?;
        let mut pipeline = Pipeline::new();
        pipeline.set_not_found_message(config.not_found_message.clone());

        let security = &config.security;
        if security.cors.is_some()
            || security.hsts.is_some()
            || security.content_security_policy.is_some()
        {
            pipeline.add_plugin(SecurityHeaders::new(security.clone()));
        }
        if config.compression {
            pipeline.add_plugin(NegotiateCompression);
        }
        let metrics = config.log.tracing.then(RequestMetrics::new);
        if let Some(metrics) = &metrics {
            pipeline.add_plugin(metrics.clone());
        }

        Ok(Self {
            router: Arc::new(router),
            pipeline,
            config,
            metrics,
        })
    }

    pub fn route(
        &mut self,
        method: &str,
        path: &str,
        handler: impl Handler + 'static,
    ) -> Result<&mut Self, CoreError> {
        self.router.register(method, path, Arc::new(handler))?;
        Ok(self)
    }

    pub fn get(&mut self, path: &str, handler: impl Handler + 'static) -> Result<&mut Self, CoreError> {
        self.route("GET", path, handler)
    }

    pub fn post(&mut self, path: &str, handler: impl Handler + 'static) -> Result<&mut Self, CoreError> {
        self.route("POST", path, handler)
    }

    pub fn put(&mut self, path: &str, handler: impl Handler + 'static) -> Result<&mut Self, CoreError> {
        self.route("PUT", path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: impl Handler + 'static) -> Result<&mut Self, CoreError> {
        self.route("DELETE", path, handler)
    }

    /// WebSocket route: the handler runs once per inbound text message, with the message as
    /// the body. Frames written with [`Response::ws_text`] go back to the client.
    pub fn ws(&mut self, path: &str, handler: impl Handler + 'static) -> Result<&mut Self, CoreError> {
        self.route(WS_METHOD, path, handler)
    }

    pub fn middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.pipeline.add_middleware(middleware);
        self
    }

    pub fn plugin(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.pipeline.add_plugin(plugin);
        self
    }

    pub fn set_rate_limit(&mut self, method: &str, path: &str, limit: RateLimit) -> Result<&mut Self, CoreError> {
        self.router.set_rate_limit(method, path, limit)?;
        Ok(self)
    }

    pub fn set_rate_limiter(&mut self, limiter: impl RateLimiter + 'static) -> &mut Self {
        self.pipeline.set_rate_limiter(limiter);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Request counter, present when tracing is enabled.
    pub fn metrics(&self) -> Option<&RequestMetrics> {
        self.metrics.as_ref()
    }

    pub fn has_ws_route(&self, path: &str) -> bool {
        self.router.match_route(WS_METHOD, path).is_some()
    }

    /// Dispatch one request through the pipeline. The returned response is always sent.
    pub fn handle(&self, mut req: Request) -> Response {
        if self.config.log.tracing && req.trace_id.is_none() {
            req.trace_id = Some(logging::new_trace_id());
        }
        let mut res = Response::new();
        self.pipeline.dispatch(&self.router, &mut req, &mut res);
        if !res.is_sent() {
            res.finish();
        }
        res
    }

    /// Install logging and serve on `config.host:config.port` until ctrl-c.
    pub fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        logging::init(&self.config.log);
        let addr = self.config.bind_address();
        crate::http::run(Arc::new(self), &addr)
    }
}

#[async_trait]
impl Service for Application {
    async fn call(&self, req: Request) -> Response {
        self.handle(req)
    }

    fn is_websocket(&self, path: &str) -> bool {
        self.has_ws_route(path)
    }
}
