//! geata is a Neovim remote-plugin host.
//!
//! An embedding application calls [`run`] with a registration callback. The
//! callback registers editor-invocable handlers against a [`PluginContext`];
//! the process then either serves the editor's RPC connection over stdio, or
//! (with `--manifest <host>`) emits the Vimscript registration manifest for
//! the editor's plugin registry, optionally merged in place into an existing
//! script file (`--location <file>`).

pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod manifest;
pub mod registry;

pub use error::HostError;
pub use identity::{ClientIdentity, ClientVersion};
pub use lifecycle::{run, Args};
pub use registry::{HandlerKind, HandlerRegistry, HandlerSpec, PluginContext};

// Re-exported so handler signatures can be written without depending on
// geata-rpc directly.
pub use geata_rpc::{PeerHandle, RpcError};
