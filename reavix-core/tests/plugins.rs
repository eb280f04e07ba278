use reavix_core::plugins::{NegotiateCompression, RequestMetrics, SecurityHeaders};
use reavix_core::security::{CorsPolicy, HstsPolicy};
use reavix_core::{Application, Compression, Request, Response, SecurityPolicy, ServerConfig};

fn hello(_req: &Request, res: &mut Response) {
    res.send_json(r#"{"hello":"world"}"#);
}

fn app_with(config: ServerConfig) -> Application {
    let mut app = Application::new(config).unwrap();
    app.get("/hello", hello).unwrap();
    app
}

#[test]
fn compression_is_negotiated_when_enabled() {
    let config = ServerConfig {
        compression: true,
        ..ServerConfig::default()
    };
    let app = app_with(config);
    let res = app.handle(Request::new("GET", "/hello").with_header("Accept-Encoding", "gzip, br;q=0"));
    assert_eq!(res.header("Content-Encoding"), Some("gzip"));

    let res = app.handle(Request::new("GET", "/hello"));
    assert!(res.header("Content-Encoding").is_none());
}

#[test]
fn compression_is_off_by_default() {
    let app = app_with(ServerConfig::default());
    let res = app.handle(Request::new("GET", "/hello").with_header("Accept-Encoding", "br"));
    assert!(res.header("Content-Encoding").is_none());
    assert_eq!(res.body(), br#"{"hello":"world"}"#);
}

#[test]
fn negotiate_compression_prefers_brotli() {
    use reavix_core::Plugin;

    let mut req = Request::new("GET", "/").with_header("accept-encoding", "deflate, gzip, br");
    let mut res = Response::new();
    NegotiateCompression.before(&mut req, &mut res);
    assert_eq!(res.compression(), Compression::Brotli);
}

fn secured() -> ServerConfig {
    ServerConfig {
        security: SecurityPolicy {
            cors: Some(CorsPolicy {
                allow_origins: vec!["https://app.example".into()],
                allow_headers: vec!["Content-Type".into()],
                ..CorsPolicy::default()
            }),
            content_security_policy: Some("default-src 'self'".into()),
            hsts: Some(HstsPolicy::default()),
            ..SecurityPolicy::default()
        },
        ..ServerConfig::default()
    }
}

#[test]
fn security_headers_are_added_to_responses() {
    let app = app_with(secured());
    let res = app.handle(Request::new("GET", "/hello").with_header("Origin", "https://app.example"));
    assert_eq!(res.status(), 200);
    assert_eq!(res.header("Content-Security-Policy"), Some("default-src 'self'"));
    assert_eq!(
        res.header("Strict-Transport-Security"),
        Some("max-age=31536000; includeSubDomains")
    );
    assert_eq!(res.header("Access-Control-Allow-Origin"), Some("https://app.example"));
    assert_eq!(res.header("Vary"), Some("Origin"));
}

#[test]
fn foreign_origin_gets_no_cors_header() {
    let app = app_with(secured());
    let res = app.handle(Request::new("GET", "/hello").with_header("Origin", "https://evil.example"));
    assert!(res.header("Access-Control-Allow-Origin").is_none());
    assert!(res.header("Content-Security-Policy").is_some());
}

#[test]
fn handler_set_security_header_is_kept() {
    let mut app = Application::new(secured()).unwrap();
    app.get("/custom", |_req: &Request, res: &mut Response| {
        res.set_header("Content-Security-Policy", "none");
        res.send_json("{}");
    })
    .unwrap();
    let res = app.handle(Request::new("GET", "/custom"));
    assert_eq!(
        res.headers().get_all("Content-Security-Policy").collect::<Vec<_>>(),
        ["none"]
    );
}

#[test]
fn preflight_is_answered_without_a_route() {
    let app = app_with(secured());
    let res = app.handle(
        Request::new("OPTIONS", "/hello")
            .with_header("Origin", "https://app.example")
            .with_header("Access-Control-Request-Method", "POST"),
    );
    assert_eq!(res.status(), 204);
    assert_eq!(res.header("Access-Control-Allow-Methods"), Some("GET, POST"));
    assert_eq!(res.header("Access-Control-Allow-Headers"), Some("Content-Type"));
    assert_eq!(
        res.headers().get_all("Access-Control-Allow-Origin").count(),
        1
    );
}

#[test]
fn request_metrics_counts_across_clones() {
    let metrics = RequestMetrics::new();
    let mut config = ServerConfig::default();
    config.log.tracing = false;
    let mut app = app_with(config);
    app.plugin(metrics.clone());
    app.handle(Request::new("GET", "/hello"));
    app.handle(Request::new("GET", "/missing"));
    assert_eq!(metrics.handled(), 2);
}

#[test]
fn security_plugin_is_only_installed_when_configured() {
    let app = app_with(ServerConfig::default());
    let res = app.handle(Request::new("GET", "/hello"));
    assert!(res.header("Content-Security-Policy").is_none());
    assert!(res.header("Strict-Transport-Security").is_none());

    let req = Request::new("GET", "/hello");
    let mut res = Response::new();
    reavix_core::Plugin::after(&SecurityHeaders::new(SecurityPolicy::default()), &req, &mut res);
    assert!(res.headers().is_empty());
}

#[test]
fn websocket_messages_are_never_compressed() {
    let config = ServerConfig {
        compression: true,
        ..ServerConfig::default()
    };
    let mut app = Application::new(config).unwrap();
    app.ws("/ws", |req: &Request, res: &mut Response| {
        res.ws_text(req.body_str().unwrap_or_default()).unwrap();
    })
    .unwrap();
    let res = app.handle(
        Request::new("WS", "/ws")
            .with_header("Accept-Encoding", "gzip, deflate, br")
            .with_body("hi"),
    );
    assert_eq!(res.compression(), Compression::None);
    assert!(res.header("Content-Encoding").is_none());
    assert_eq!(res.body(), &[0x81, 2, b'h', b'i']);
}
