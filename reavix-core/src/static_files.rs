//! Static file handler: serves `<dir>/<:file>` via [`Response::send_file`].

use std::path::PathBuf;

use crate::pipeline::Handler;
use crate::request::Request;
use crate::response::Response;

/// Path param holding the file name.
pub const FILE_PARAM: &str = "file";
const INDEX_FILE: &str = "index.html";

#[derive(Clone, Debug)]
pub struct StaticFiles {
    dir: PathBuf,
}

impl StaticFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// File name is a single segment: no separators, no `..`, no hidden files.
    fn is_safe_name(name: &str) -> bool {
        !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains("..")
    }
}

impl Handler for StaticFiles {
    fn handle(&self, req: &Request, res: &mut Response) {
        let name = req.param(FILE_PARAM).unwrap_or(INDEX_FILE);
        if !Self::is_safe_name(name) {
            tracing::warn!(file = name, "rejected static file name");
            res.send_error(404, "File not found");
            return;
        }
        res.send_file(self.dir.join(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_names_are_rejected() {
        for name in ["", "..", "../etc", ".env", "a/b", "a\\b", "x..y"] {
            assert!(!StaticFiles::is_safe_name(name), "{name}");
        }
        for name in ["index.html", "app.js", "style.min.css"] {
            assert!(StaticFiles::is_safe_name(name), "{name}");
        }
    }

    #[test]
    fn traversal_answers_404_without_touching_disk() {
        let handler = StaticFiles::new("does-not-matter");
        let mut req = Request::new("GET", "/static/..");
        req.set_params(vec![crate::PathParam::new(FILE_PARAM, "..")]);
        let mut res = Response::new();
        handler.handle(&req, &mut res);
        assert_eq!(res.status(), 404);
        assert!(res.is_sent());
    }
}
