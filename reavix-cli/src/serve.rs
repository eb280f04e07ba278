//! `reavix serve`: static files, a health check and a WebSocket echo.

use reavix_core::static_files::StaticFiles;
use reavix_core::{Application, CoreError, Request, Response, ServerConfig};

fn health(_req: &Request, res: &mut Response) {
    let body = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    res.send_json(&body.to_string());
}

fn echo(req: &Request, res: &mut Response) {
    if let Err(e) = res.ws_text(req.body_str().unwrap_or_default()) {
        tracing::warn!(error = %e, "echo dropped");
    }
}

/// Application with the bundled routes:
/// `GET /`, `GET /static/:file`, `GET /health`, `WS /ws/echo`.
pub fn build_app(config: ServerConfig) -> Result<Application, CoreError> {
    let static_dir = config.static_dir.clone();
    let mut app = Application::new(config)?;
    app.get("/", StaticFiles::new(&static_dir))?
        .get("/static/:file", StaticFiles::new(&static_dir))?
        .get("/health", health)?
        .ws("/ws/echo", echo)?;
    Ok(app)
}
