//! CLI for reavix: project scaffolding and the bundled server.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reavix_cli::{scaffold, serve};
use reavix_core::{logging, ServerConfig};

const DEFAULT_CONFIG: &str = "reavix.toml";

#[derive(Parser)]
#[command(name = "reavix")]
#[command(about = "Reavix CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new Reavix application in ./<name>.
    Create {
        /// Project name (letters, digits, `-`, `_`)
        name: String,
        /// reavix-core checkout the project depends on (default: the one this CLI was built from)
        #[arg(long)]
        core_path: Option<PathBuf>,
    },
    /// Serve static files, GET /health and WS /ws/echo.
    Serve {
        /// TOML config file (default: ./reavix.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Directory served under /static
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

fn run_create(
    name: &str,
    core_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let core_path = core_path.unwrap_or_else(scaffold::default_core_path);
    // Cargo resolves the path relative to the new project, not the current directory.
    let core_path = std::fs::canonicalize(&core_path)
        .map_err(|e| format!("reavix-core not found at {}: {}", core_path.display(), e))?;
    let files = scaffold::create_project(Path::new("."), name, &core_path)?;
    println!("Project {} created:", name);
    for file in files {
        println!("  {}/{}", name, file.display());
    }
    println!("Run `cd {} && cargo run` to start it.", name);
    Ok(())
}

fn run_serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match config_path {
        Some(path) => ServerConfig::load(&path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => ServerConfig::load(Path::new(DEFAULT_CONFIG))?,
        None => ServerConfig::default(),
    };
    // Env first; explicit flags below win.
    config.apply_overrides(
        std::env::var("HOST").ok(),
        std::env::var("PORT").ok(),
        std::iter::empty(),
    );
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = static_dir {
        config.static_dir = dir;
    }
    logging::init(&config.log);
    tracing::info!(
        addr = %config.bind_address(),
        static_dir = %config.static_dir.display(),
        "starting reavix server"
    );
    serve::build_app(config)?.run()
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Create { name, core_path } => run_create(&name, core_path),
        Commands::Serve {
            config,
            host,
            port,
            static_dir,
        } => run_serve(config, host, port, static_dir),
    }
}
