//! Reavix core: trie routing, dispatch pipeline, request/response lifecycle, HTTP/WebSocket server.
//!
//! ```no_run
//! use reavix_core::{Application, Request, Response, ServerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut app = Application::new(ServerConfig::default())?;
//!     app.get("/users/:id", |req: &Request, res: &mut Response| {
//!         let id = req.param("id").unwrap_or_default();
//!         res.send_json(&format!(r#"{{"id":"{}"}}"#, id));
//!     })?;
//!     app.run()
//! }
//! ```

pub mod application;
pub mod compression;
pub mod config;
pub mod headers;
pub mod http;
pub mod logging;
pub mod pipeline;
pub mod plugins;
pub mod registry;
pub mod request;
pub mod response;
pub mod router;
pub mod security;
pub mod service;
pub mod static_files;
pub mod trie;
pub mod websocket;

pub use application::Application;
pub use compression::Compression;
pub use config::{LogConfig, ServerConfig};
pub use headers::HeaderList;
pub use pipeline::{Handler, HandlerRef, Middleware, Pipeline, Plugin};
pub use registry::{RouteEntry, RouteRegistry};
pub use request::Request;
pub use response::Response;
pub use router::{RouteMatch, Router};
pub use security::{RateLimit, SecurityPolicy};
pub use service::Service;
pub use trie::{PathParam, PathTrie};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("route already registered: {method} {path}")]
    Conflict { method: String, path: String },
    #[error("router already initialized")]
    AlreadyInitialized,
    #[error("router not initialized")]
    NotInitialized,
    #[error("route capacity exhausted ({0} routes)")]
    Capacity(usize),
    #[error("websocket payload too large: {0} bytes")]
    FrameTooLarge(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}
