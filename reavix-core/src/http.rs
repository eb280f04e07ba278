//! Async HTTP server: tokio + hyper. Converts HTTP to [`Request`], calls the [`Service`],
//! converts the [`Response`] back. WebSocket upgrades on paths the service accepts.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Sink, SinkExt};
use ::http::{HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Response as HyperResponse;
use hyper_tungstenite::tungstenite::protocol::CloseFrame;
use hyper_tungstenite::tungstenite::Message;
use hyper_tungstenite::{is_upgrade_request, upgrade, HyperWebsocket};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_stream::StreamExt;

use crate::application::WS_METHOD;
use crate::headers::HeaderList;
use crate::request::Request;
use crate::response::{error_envelope, Response, APPLICATION_JSON, CONTENT_TYPE};
use crate::service::Service;
use crate::websocket::decode_text_frames;

type HyperRequest = hyper::Request<hyper::body::Incoming>;

/// Bind `addr` and serve on a multi-threaded runtime until ctrl-c.
pub fn run(
    service: Arc<dyn Service>,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(async move {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "server listening");
        serve(service, listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "ctrl-c handler failed");
            }
        })
        .await;
        tracing::info!("server stopped");
        Ok(())
    })
}

/// Accept loop on an already bound listener; returns when `shutdown` completes.
/// Connections in flight keep running on their own tasks.
pub async fn serve(
    service: Arc<dyn Service>,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accept_result = listener.accept() => {
                let (stream, peer) = match accept_result {
                    Ok(x) => x,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept error");
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let service = Arc::clone(&service);
                tokio::task::spawn(async move {
                    let conn_service = service_fn(move |req: HyperRequest| {
                        let service = Arc::clone(&service);
                        async move { http_or_ws(service, req).await }
                    });
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(io, conn_service)
                        .with_upgrades()
                        .await
                    {
                        tracing::debug!(%peer, error = %e, "connection error");
                    }
                });
            }
        }
    }
}

async fn http_or_ws(
    service: Arc<dyn Service>,
    req: HyperRequest,
) -> Result<HyperResponse<Full<Bytes>>, Infallible> {
    if is_upgrade_request(&req) && service.is_websocket(req.uri().path()) {
        return Ok(websocket_upgrade(service, req).await);
    }
    let request = match hyper_to_request(req).await {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "failed to read request body");
            let mut res = Response::new();
            res.send_error(400, "Bad Request");
            return Ok(response_to_hyper(res));
        }
    };
    Ok(response_to_hyper(service.call(request).await))
}

async fn hyper_to_request(req: HyperRequest) -> Result<Request, hyper::Error> {
    let (parts, body) = req.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let mut request = Request::new(parts.method.as_str(), target);
    request.headers = parts
        .headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.to_str().unwrap_or("")))
        .collect();
    request.body = body.collect().await?.to_bytes();
    Ok(request)
}

fn response_to_hyper(res: Response) -> HyperResponse<Full<Bytes>> {
    let (status, headers, body) = res.into_parts();
    let mut builder = HyperResponse::builder().status(status);
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    builder.body(Full::new(Bytes::from(body))).unwrap_or_else(|e| {
        tracing::warn!(status, error = %e, "invalid response parts");
        internal_error()
    })
}

fn internal_error() -> HyperResponse<Full<Bytes>> {
    let mut res = HyperResponse::new(Full::new(Bytes::from(error_envelope(
        500,
        "Internal Server Error",
    ))));
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    res
}

async fn websocket_upgrade(service: Arc<dyn Service>, req: HyperRequest) -> HyperResponse<Full<Bytes>> {
    let path = req.uri().path().to_string();
    let headers: HeaderList = req
        .headers()
        .iter()
        .map(|(k, v)| (k.as_str(), v.to_str().unwrap_or("")))
        .collect();
    let (response, websocket) = match upgrade(req, None) {
        Ok(x) => x,
        Err(e) => {
            let mut res = Response::new();
            res.send_error(400, &format!("upgrade error: {}", e));
            return response_to_hyper(res);
        }
    };
    tokio::spawn(async move {
        run_websocket(service, websocket, path, headers).await;
    });
    let (parts, body) = response.into_parts();
    let bytes = body
        .collect()
        .await
        .map(|b| b.to_bytes())
        .unwrap_or_default();
    HyperResponse::from_parts(parts, Full::new(bytes))
}

/// What the socket gets back for one dispatched message.
#[derive(Debug, PartialEq, Eq)]
enum WsReply {
    Texts(Vec<String>),
    /// Error response: close with a policy-violation frame carrying this reason.
    Close(String),
}

const POLICY_VIOLATION: u16 = 1008;
/// Close reasons share the 125-byte control payload with the 2-byte code.
const MAX_CLOSE_REASON: usize = 123;

/// Frames written with [`Response::ws_text`] go out one message each. Any other body is
/// sent as a single text message, unless the status is an error, which closes the socket.
fn ws_reply(res: &Response) -> WsReply {
    let body = res.body();
    if res.status() >= 400 {
        let reason = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
        return WsReply::Close(close_reason(reason));
    }
    match decode_text_frames(body) {
        Some(payloads) => WsReply::Texts(payloads.into_iter().map(str::to_owned).collect()),
        None => WsReply::Texts(vec![String::from_utf8_lossy(body).into_owned()]),
    }
}

fn close_reason(mut reason: String) -> String {
    if reason.len() > MAX_CLOSE_REASON {
        let mut end = MAX_CLOSE_REASON;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}

async fn send_texts<S>(sink: &mut S, texts: Vec<String>) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    for text in texts {
        sink.feed(Message::Text(text.into())).await?;
    }
    SinkExt::flush(sink).await
}

/// Dispatch every inbound text message as a `WS` request and send the reply through
/// the websocket sink.
async fn run_websocket(service: Arc<dyn Service>, websocket: HyperWebsocket, path: String, headers: HeaderList) {
    let mut stream = match websocket.await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "websocket handshake failed");
            return;
        }
    };
    tracing::debug!(path = %path, "websocket opened");
    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) => {
                let _ = SinkExt::close(&mut stream).await;
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "websocket read error");
                break;
            }
        };
        let mut req = Request::new(WS_METHOD, &path).with_body(text);
        req.headers = headers.clone();
        let res = service.call(req).await;
        match ws_reply(&res) {
            WsReply::Texts(texts) => {
                if let Err(e) = send_texts(&mut stream, texts).await {
                    tracing::debug!(path = %path, error = %e, "websocket write error");
                    break;
                }
            }
            WsReply::Close(reason) => {
                tracing::debug!(path = %path, status = res.status(), reason = %reason, "closing websocket");
                let frame = CloseFrame {
                    code: POLICY_VIOLATION.into(),
                    reason: reason.into(),
                };
                let _ = stream.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }
    tracing::debug!(path = %path, "websocket closed");
}
