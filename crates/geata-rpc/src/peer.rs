//! RPC Peer
//!
//! The single connection to the editor process: a dispatch table of
//! registered handlers, the inbound acceptance loop, and a cloneable handle
//! for outbound notifications.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::protocol::{RpcError, RpcNotification, RpcRequest, RpcResponse, JSONRPC_VERSION};

/// Future returned by a registered handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, RpcError>> + Send>>;

/// A registered inbound-call handler.
pub type Handler = Box<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Peer connection errors
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("failed to read frame: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write frame: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to serialize frame: {0}")]
    Serialize(#[source] serde_json::Error),
}

type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Cloneable handle for writing outbound frames to the peer.
///
/// Shared between the acceptance loop (responses) and the embedding
/// application (notifications); writes are serialized frame-by-frame.
#[derive(Clone)]
pub struct PeerHandle {
    writer: SharedWriter,
}

impl PeerHandle {
    /// Send a notification to the peer.
    pub async fn notify(&self, method: impl Into<String>, params: Value) -> Result<(), PeerError> {
        let frame = RpcNotification::new(method, params);
        let payload = serde_json::to_string(&frame).map_err(PeerError::Serialize)?;
        self.write_line(payload.as_bytes()).await
    }

    async fn write_line(&self, payload: &[u8]) -> Result<(), PeerError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(payload).await.map_err(PeerError::Write)?;
        writer.write_all(b"\n").await.map_err(PeerError::Write)?;
        writer.flush().await.map_err(PeerError::Write)
    }
}

/// The RPC peer for the process lifetime.
pub struct Peer<R> {
    reader: BufReader<R>,
    handle: PeerHandle,
    handlers: HashMap<String, Handler>,
}

impl<R: AsyncRead + Unpin> Peer<R> {
    pub fn new(reader: R, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            reader: BufReader::new(reader),
            handle: PeerHandle {
                writer: Arc::new(Mutex::new(Box::new(writer))),
            },
            handlers: HashMap::new(),
        }
    }

    /// Handle for outbound frames; stays valid while `serve` runs.
    pub fn handle(&self) -> PeerHandle {
        self.handle.clone()
    }

    /// Install a handler for an inbound method. Last registration wins.
    pub fn register(&mut self, method: impl Into<String>, handler: Handler) {
        self.handlers.insert(method.into(), handler);
    }

    /// Run the acceptance loop until the peer disconnects (`Ok`) or the
    /// connection fails. Consumes the peer; the dispatch table is frozen
    /// from here on.
    pub async fn serve(mut self) -> Result<(), PeerError> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(PeerError::Read)?;
            if n == 0 {
                debug!("peer disconnected");
                return Ok(());
            }

            let frame = line.trim();
            if frame.is_empty() {
                continue;
            }

            if let Some(response) = self.dispatch(frame).await {
                let payload = serde_json::to_string(&response).map_err(PeerError::Serialize)?;
                self.handle.write_line(payload.as_bytes()).await?;
            }
        }
    }

    /// Process one inbound frame. Notifications produce no response.
    async fn dispatch(&self, frame: &str) -> Option<RpcResponse> {
        let request: RpcRequest = match serde_json::from_str(frame) {
            Ok(request) => request,
            Err(e) => {
                return Some(RpcResponse::error(
                    None,
                    RpcError::parse_error(format!("invalid JSON: {}", e)),
                ));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(RpcResponse::error(
                request.id,
                RpcError::invalid_request("invalid JSON-RPC version, expected 2.0"),
            ));
        }

        debug!(method = %request.method, "inbound call");

        let handler = match self.handlers.get(&request.method) {
            Some(handler) => handler,
            None => {
                warn!(method = %request.method, "unknown method");
                return request
                    .id
                    .map(|id| RpcResponse::error(Some(id), RpcError::method_not_found(&request.method)));
            }
        };

        let result = handler(request.params.unwrap_or(Value::Null)).await;
        match request.id {
            Some(id) => Some(match result {
                Ok(value) => RpcResponse::success(Some(id), value),
                Err(e) => RpcResponse::error(Some(id), e),
            }),
            None => {
                if let Err(e) = result {
                    warn!(code = e.code, message = %e.message, "notification handler failed");
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{duplex, AsyncWriteExt, BufReader};

    fn echo() -> Handler {
        Box::new(|params: Value| -> HandlerFuture { Box::pin(async move { Ok(params) }) })
    }

    fn idle_peer() -> Peer<tokio::io::Empty> {
        Peer::new(tokio::io::empty(), tokio::io::sink())
    }

    #[tokio::test]
    async fn dispatches_a_registered_method() {
        let mut peer = idle_peer();
        peer.register("command:Greet", echo());

        let response = peer
            .dispatch(r#"{"jsonrpc":"2.0","id":1,"method":"command:Greet","params":["hi"]}"#)
            .await
            .unwrap();

        assert!(response.error.is_none());
        assert_eq!(response.result, Some(json!(["hi"])));
    }

    #[tokio::test]
    async fn unknown_method_is_answered_with_an_error() {
        let peer = idle_peer();

        let response = peer
            .dispatch(r#"{"jsonrpc":"2.0","id":2,"method":"command:Nope"}"#)
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, RpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_json_is_answered_with_a_parse_error() {
        let peer = idle_peer();

        let response = peer.dispatch("not valid json").await.unwrap();

        assert_eq!(response.error.unwrap().code, RpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn wrong_version_is_rejected() {
        let peer = idle_peer();

        let response = peer
            .dispatch(r#"{"jsonrpc":"1.0","id":3,"method":"command:Greet"}"#)
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, RpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let mut peer = idle_peer();
        peer.register("autocmd:BufEnter", echo());

        let response = peer
            .dispatch(r#"{"jsonrpc":"2.0","method":"autocmd:BufEnter","params":["a.txt"]}"#)
            .await;

        assert!(response.is_none());
    }

    #[tokio::test]
    async fn serves_frames_until_eof() {
        let (editor, host) = duplex(4096);
        let (host_read, host_write) = tokio::io::split(host);

        let mut peer = Peer::new(host_read, host_write);
        peer.register("function:Double", Box::new(|params: Value| -> HandlerFuture {
            Box::pin(async move {
                let n = params
                    .get(0)
                    .and_then(Value::as_i64)
                    .ok_or_else(|| RpcError::invalid_params("expected [number]"))?;
                Ok(json!(n * 2))
            })
        }));
        let serving = tokio::spawn(peer.serve());

        let (editor_read, mut editor_write) = tokio::io::split(editor);
        let mut lines = BufReader::new(editor_read).lines();

        editor_write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"function:Double\",\"params\":[21]}\n")
            .await
            .unwrap();
        let reply = lines.next_line().await.unwrap().unwrap();
        assert!(reply.contains("42"), "unexpected reply: {reply}");

        // Closing both editor halves signals EOF to the host.
        drop(editor_write);
        drop(lines);
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn handle_writes_notifications_while_serving() {
        let (editor, host) = duplex(4096);
        let (host_read, host_write) = tokio::io::split(host);

        let peer = Peer::new(host_read, host_write);
        let handle = peer.handle();
        let serving = tokio::spawn(peer.serve());

        handle.notify("nvim_set_client_info", json!(["geata"])).await.unwrap();

        let (editor_read, editor_write) = tokio::io::split(editor);
        let mut lines = BufReader::new(editor_read).lines();
        let frame = lines.next_line().await.unwrap().unwrap();
        assert!(frame.contains("nvim_set_client_info"));

        drop(editor_write);
        drop(lines);
        serving.await.unwrap().unwrap();
    }
}
