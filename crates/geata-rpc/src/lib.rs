//! RPC plumbing for a geata plugin host.
//!
//! Line-delimited JSON-RPC 2.0 frames over a single stream pair: the editor
//! writes requests to the plugin's stdin, the plugin writes responses and
//! notifications to its stdout. One peer per process lifetime.

pub mod peer;
pub mod protocol;

pub use peer::{Handler, HandlerFuture, Peer, PeerError, PeerHandle};
pub use protocol::{RequestId, RpcError, RpcNotification, RpcRequest, RpcResponse};
