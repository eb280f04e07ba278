//! `reavix create <name>`: new application skeleton from templates.

use std::fs;
use std::path::{Path, PathBuf};

const CARGO_TOML: &str = r#"[package]
name = "APP_NAME"
version = "0.1.0"
edition = "2021"

[dependencies]
reavix-core = { path = CORE_PATH }
"#;

const MAIN_RS: &str = r##"//! Entry point: routes are registered on the application, then it serves until ctrl-c.
use reavix_core::static_files::StaticFiles;
use reavix_core::{Application, Request, Response, ServerConfig};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = ServerConfig::load("reavix.toml".as_ref())?;
    config.apply_env_and_args();
    let static_dir = config.static_dir.clone();

    let mut app = Application::new(config)?;
    app.get("/", StaticFiles::new(&static_dir))?;
    app.get("/static/:file", StaticFiles::new(&static_dir))?;
    app.get("/api/hello/:name", |req: &Request, res: &mut Response| {
        let name = req.param("name").unwrap_or("world");
        res.send_json(&format!(r#"{{"hello":"{}"}}"#, name));
    })?;
    app.ws("/ws", |req: &Request, res: &mut Response| {
        let _ = res.ws_text(req.body_str().unwrap_or_default());
    })?;
    app.run()
}
"##;

const REAVIX_TOML: &str = r#"host = "127.0.0.1"
port = 8081
static_dir = "static"
compression = true

[log]
level = "info"
tracing = true
colored = true
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>APP_NAME</title></head>
<body>
<h1>APP_NAME</h1>
<p id="status">connecting...</p>
<script>
const ws = new WebSocket(`ws://${location.host}/ws`);
ws.onopen = () => ws.send("hello");
ws.onmessage = (e) => { document.getElementById("status").textContent = "echo: " + e.data; };
</script>
</body>
</html>
"#;

const GITIGNORE: &str = "/target\n";

const FILES: &[(&str, &str)] = &[
    ("Cargo.toml", CARGO_TOML),
    ("src/main.rs", MAIN_RS),
    ("reavix.toml", REAVIX_TOML),
    ("static/index.html", INDEX_HTML),
    (".gitignore", GITIGNORE),
];

/// Package names: ASCII letters, digits, `-` and `_`, starting with a letter.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// The `reavix-core` checkout this CLI was built from.
pub fn default_core_path() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .unwrap_or(manifest_dir)
        .join("reavix-core")
}

fn render(template: &str, name: &str, core_path: &str) -> String {
    template
        .replace("APP_NAME", name)
        .replace("CORE_PATH", core_path)
}

/// Create `<parent>/<name>` with the project files. Refuses an existing directory.
/// The generated manifest depends on `reavix-core` through a path dependency on `core_path`.
/// Returns the created files, relative to the project root.
pub fn create_project(
    parent: &Path,
    name: &str,
    core_path: &Path,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>> {
    if !is_valid_name(name) {
        return Err(format!("invalid project name {:?}", name).into());
    }
    let core_path = core_path
        .to_str()
        .ok_or_else(|| format!("core path {} is not UTF-8", core_path.display()))?;
    // JSON string escapes are valid in a TOML basic string.
    let core_path = serde_json::to_string(core_path)?;
    let root = parent.join(name);
    if root.exists() {
        return Err(format!("{} already exists", root.display()).into());
    }
    let mut created = Vec::with_capacity(FILES.len());
    for (relative, template) in FILES {
        let path = root.join(relative);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, render(template, name, &core_path))?;
        created.push(PathBuf::from(relative));
    }
    tracing::debug!(project = name, files = created.len(), "project scaffolded");
    Ok(created)
}
