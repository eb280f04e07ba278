//! Outgoing response: status, ordered headers, body buffer, compression mode and the sent flag.
//!
//! The sent flag is one-shot. Every `send_*` method is a no-op once it is set, and the
//! pipeline reads it to detect that a middleware or plugin already answered.

use std::io::ErrorKind;
use std::path::Path;

use crate::compression::Compression;
use crate::headers::HeaderList;
use crate::websocket::encode_text_frame;
use crate::CoreError;

/// Largest file [`Response::send_file`] will serve (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_ENCODING: &str = "Content-Encoding";
pub const APPLICATION_JSON: &str = "application/json";

#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: HeaderList,
    body: Vec<u8>,
    compression: Compression,
    sent: bool,
}

/// `{"error":{"code":N,"message":"..."}}`
pub fn error_envelope(code: u16, message: &str) -> String {
    serde_json::json!({ "error": { "code": code, "message": message } }).to_string()
}

/// Content-Type for a file path, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        _ => "application/octet-stream",
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HeaderList::new(),
            body: Vec::new(),
            compression: Compression::None,
            sent: false,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Append a header; existing entries with the same name are kept.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.append(name, value);
        self
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    /// Remove the first header named `name` (case-insensitive).
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove_first(name)
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn set_compression(&mut self, compression: Compression) -> &mut Self {
        self.compression = compression;
        self
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Send `body` as JSON with status 200.
    pub fn send_json(&mut self, body: &str) {
        self.send_json_status(200, body);
    }

    /// Send the JSON error envelope with status `code`.
    pub fn send_error(&mut self, code: u16, message: &str) {
        self.send_json_status(code, &error_envelope(code, message));
    }

    fn send_json_status(&mut self, status: u16, body: &str) {
        if self.sent {
            return;
        }
        let mut payload = body.as_bytes().to_vec();
        if let Some(token) = self.compression.encoding_token() {
            match self.compression.compress(&payload) {
                Ok(compressed) => {
                    payload = compressed;
                    self.replace_header(CONTENT_ENCODING, token);
                }
                Err(e) => {
                    tracing::warn!(encoding = token, error = %e, "compression failed; sending identity body");
                }
            }
        }
        self.send_bytes(status, APPLICATION_JSON, payload);
    }

    /// Send `body` with an explicit status and Content-Type.
    pub fn send_text(&mut self, status: u16, content_type: &str, body: impl Into<Vec<u8>>) {
        if self.sent {
            return;
        }
        self.send_bytes(status, content_type, body.into());
    }

    /// Read a file fully into the body. Missing file → 404, larger than [`MAX_FILE_SIZE`] → 413,
    /// any other stat or read failure → 500.
    pub fn send_file(&mut self, path: impl AsRef<Path>) {
        if self.sent {
            return;
        }
        let path = path.as_ref();
        let meta = match std::fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return self.send_error(404, "File not found"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "file not found");
                return self.send_error(404, "File not found");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "file stat failed");
                return self.send_error(500, "File stat failed");
            }
        };
        if meta.len() > MAX_FILE_SIZE {
            return self.send_error(413, "File too large");
        }
        match std::fs::read(path) {
            Ok(content) => self.send_bytes(200, content_type_for(path), content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "file read failed");
                self.send_error(500, "File read failed");
            }
        }
    }

    /// Append raw bytes to the body. Refused (returns false) once the response is sent.
    pub fn write(&mut self, data: &[u8]) -> bool {
        if self.sent {
            return false;
        }
        self.body.extend_from_slice(data);
        true
    }

    /// Append `text` as an encoded WebSocket text frame.
    pub fn ws_text(&mut self, text: &str) -> Result<(), CoreError> {
        let frame = encode_text_frame(text.as_bytes())?;
        if !self.write(&frame) {
            return Err(CoreError::InvalidArgument("response already sent".into()));
        }
        Ok(())
    }

    /// Mark the response as final with whatever status and body it holds.
    pub fn finish(&mut self) {
        self.sent = true;
    }

    pub fn into_parts(self) -> (u16, HeaderList, Vec<u8>) {
        (self.status, self.headers, self.body)
    }

    fn send_bytes(&mut self, status: u16, content_type: &str, body: Vec<u8>) {
        self.status = status;
        self.body = body;
        self.replace_header(CONTENT_TYPE, content_type);
        self.sent = true;
    }

    fn replace_header(&mut self, name: &str, value: &str) {
        while self.headers.remove_first(name).is_some() {}
        self.headers.append(name, value);
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
