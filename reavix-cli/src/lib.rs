//! Reavix CLI: `create` scaffolds a new application, `serve` runs the bundled server.

pub mod scaffold;
pub mod serve;
