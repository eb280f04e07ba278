//! Server configuration: TOML file, then `HOST`/`PORT` env, then `--host`/`--port` args.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::security::SecurityPolicy;
use crate::CoreError;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Capacity of the route registry.
    pub max_routes: usize,
    /// Directory served by the static file handler.
    pub static_dir: PathBuf,
    /// Message of the 404 envelope.
    pub not_found_message: String,
    /// Negotiate response compression from `Accept-Encoding`.
    pub compression: bool,
    pub log: LogConfig,
    pub security: SecurityPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            max_routes: 100,
            static_dir: PathBuf::from("static"),
            not_found_message: "Not Found".to_string(),
            compression: false,
            log: LogConfig::default(),
            security: SecurityPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. `info`, `reavix_core=debug`).
    pub level: String,
    /// Attach a trace id to every request.
    pub tracing: bool,
    /// ANSI colors in console output.
    pub colored: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            tracing: true,
            colored: true,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Override host/port from env `HOST`/`PORT`, then from `--host`/`--port` in the
    /// process arguments (arguments win).
    pub fn apply_env_and_args(&mut self) {
        self.apply_overrides(
            std::env::var("HOST").ok(),
            std::env::var("PORT").ok(),
            std::env::args(),
        );
    }

    pub fn apply_overrides(
        &mut self,
        env_host: Option<String>,
        env_port: Option<String>,
        args: impl IntoIterator<Item = String>,
    ) {
        if let Some(host) = env_host {
            self.host = host;
        }
        if let Some(port) = env_port.and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" => {
                    if let Some(host) = args.next() {
                        self.host = host;
                    }
                }
                "--port" => {
                    if let Some(port) = args.next().and_then(|p| p.parse().ok()) {
                        self.port = port;
                    }
                }
                _ => {}
            }
        }
    }
}
