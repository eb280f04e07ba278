//! Request → response seam between an application and the server running it.
//! The built-in hyper transport drives any `Service`; other servers can too.

use async_trait::async_trait;

use crate::request::Request;
use crate::response::Response;

#[async_trait]
pub trait Service: Send + Sync {
    /// Handle one request. The returned response is always final.
    async fn call(&self, req: Request) -> Response;

    /// Whether `path` is bound to a WebSocket route.
    fn is_websocket(&self, _path: &str) -> bool {
        false
    }
}
