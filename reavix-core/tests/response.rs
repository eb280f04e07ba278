use std::fs;
use std::io::Read;
use std::path::PathBuf;

use reavix_core::response::MAX_FILE_SIZE;
use reavix_core::{Compression, Response};

/// Scratch directory under the system temp dir, removed on drop.
struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("reavix-test-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.0.join(name);
        fs::write(&path, content).unwrap();
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

const BODY: &str = r#"{"message":"hello hello hello hello hello hello hello hello"}"#;

fn compressed(mode: Compression) -> Response {
    let mut res = Response::new();
    res.set_compression(mode);
    res.send_json(BODY);
    res
}

#[test]
fn headers_are_case_insensitive_and_keep_duplicates() {
    let mut res = Response::new();
    res.set_header("Set-Cookie", "a=1");
    res.set_header("set-cookie", "b=2");
    assert_eq!(res.header("SET-COOKIE"), Some("a=1"));
    assert_eq!(res.headers().get_all("Set-Cookie").collect::<Vec<_>>(), ["a=1", "b=2"]);

    assert_eq!(res.remove_header("SET-cookie").as_deref(), Some("a=1"));
    assert_eq!(res.header("Set-Cookie"), Some("b=2"));
    assert!(res.remove_header("X-Missing").is_none());
}

#[test]
fn send_is_one_shot() {
    let mut res = Response::new();
    res.send_json(r#"{"a":1}"#);
    res.send_error(500, "late");
    res.send_text(201, "text/plain", "late");
    assert_eq!(res.status(), 200);
    assert_eq!(res.body(), br#"{"a":1}"#);
    assert_eq!(res.headers().get_all("Content-Type").count(), 1);
}

#[test]
fn send_error_keeps_its_status() {
    let mut res = Response::new();
    res.send_error(422, "bad input");
    assert_eq!(res.status(), 422);
    assert_eq!(res.header("Content-Type"), Some("application/json"));
    assert_eq!(res.body(), br#"{"error":{"code":422,"message":"bad input"}}"#);
}

#[test]
fn send_replaces_an_earlier_content_type() {
    let mut res = Response::new();
    res.set_header("Content-Type", "text/plain");
    res.send_json("{}");
    assert_eq!(res.headers().get_all("content-type").collect::<Vec<_>>(), ["application/json"]);
}

#[test]
fn write_appends_until_sent() {
    let mut res = Response::new();
    assert!(res.write(b"ab"));
    assert!(res.write(b"cd"));
    assert_eq!(res.body(), b"abcd");
    res.finish();
    assert!(!res.write(b"ef"));
    assert_eq!(res.body(), b"abcd");
}

#[test]
fn ws_text_appends_frames() {
    let mut res = Response::new();
    res.ws_text("a").unwrap();
    res.ws_text("bc").unwrap();
    assert_eq!(res.body(), &[0x81, 1, b'a', 0x81, 2, b'b', b'c']);
    assert!(res.ws_text(&"x".repeat(70_000)).is_err());
}

#[test]
fn uncompressed_json_has_no_content_encoding() {
    let res = compressed(Compression::None);
    assert!(!res.has_header("Content-Encoding"));
    assert_eq!(res.body(), BODY.as_bytes());
}

#[test]
fn gzip_body_decodes_to_original() {
    let res = compressed(Compression::Gzip);
    assert_eq!(res.header("Content-Encoding"), Some("gzip"));
    let mut out = String::new();
    flate2::read::GzDecoder::new(res.body())
        .read_to_string(&mut out)
        .unwrap();
    assert_eq!(out, BODY);
}

#[test]
fn deflate_body_is_zlib() {
    let res = compressed(Compression::Deflate);
    assert_eq!(res.header("Content-Encoding"), Some("deflate"));
    let mut out = String::new();
    flate2::read::ZlibDecoder::new(res.body())
        .read_to_string(&mut out)
        .unwrap();
    assert_eq!(out, BODY);
}

#[test]
fn brotli_body_decodes_to_original() {
    let res = compressed(Compression::Brotli);
    assert_eq!(res.header("Content-Encoding"), Some("br"));
    let mut out = String::new();
    brotli::Decompressor::new(res.body(), 4096)
        .read_to_string(&mut out)
        .unwrap();
    assert_eq!(out, BODY);
}

#[test]
fn error_envelope_is_compressed_too() {
    let mut res = Response::new();
    res.set_compression(Compression::Gzip);
    res.send_error(404, "Not Found");
    assert_eq!(res.status(), 404);
    assert_eq!(res.header("Content-Encoding"), Some("gzip"));
}

#[test]
fn send_file_serves_known_types() {
    let dir = TempDir::new();
    for (name, content_type) in [
        ("index.html", "text/html"),
        ("site.css", "text/css"),
        ("app.js", "text/javascript"),
        ("blob.bin", "application/octet-stream"),
        ("README", "application/octet-stream"),
    ] {
        let path = dir.file(name, b"content");
        let mut res = Response::new();
        res.send_file(&path);
        assert_eq!(res.status(), 200, "{name}");
        assert_eq!(res.header("Content-Type"), Some(content_type), "{name}");
        assert_eq!(res.body(), b"content");
    }
}

#[test]
fn send_file_missing_is_404() {
    let dir = TempDir::new();
    let mut res = Response::new();
    res.send_file(dir.0.join("nope.html"));
    assert_eq!(res.status(), 404);
    assert!(res.is_sent());

    let mut res = Response::new();
    res.send_file(&dir.0);
    assert_eq!(res.status(), 404);
}

#[test]
fn send_file_over_limit_is_413() {
    let dir = TempDir::new();
    let path = dir.0.join("big.bin");
    let file = fs::File::create(&path).unwrap();
    file.set_len(MAX_FILE_SIZE + 1).unwrap();
    drop(file);

    let mut res = Response::new();
    res.send_file(&path);
    assert_eq!(res.status(), 413);
    assert!(res.body().starts_with(br#"{"error":{"code":413"#));
}

#[test]
fn send_file_at_limit_is_served() {
    let dir = TempDir::new();
    let path = dir.0.join("edge.bin");
    let file = fs::File::create(&path).unwrap();
    file.set_len(MAX_FILE_SIZE).unwrap();
    drop(file);

    let mut res = Response::new();
    res.send_file(&path);
    assert_eq!(res.status(), 200);
    assert_eq!(res.body().len() as u64, MAX_FILE_SIZE);
}
