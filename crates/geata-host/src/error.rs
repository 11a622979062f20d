//! Host Error Types
//!
//! Every variant is fatal at the lifecycle level: the process reports the
//! error once and exits non-zero. Nothing here is retried.

use std::path::PathBuf;

use geata_rpc::PeerError;

/// Terminal failures of a plugin host process.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A registered handler cannot be represented in the manifest
    #[error("invalid handler descriptor: {0}")]
    Config(String),

    /// The connection task was lost without reporting an outcome
    #[error("rpc transport lost: {0}")]
    Transport(String),

    /// The registration callback reported a failure
    #[error("handler registration failed: {0}")]
    Registration(anyhow::Error),

    /// The client-identity handshake could not be sent
    #[error("client info handshake failed: {0}")]
    Handshake(#[source] PeerError),

    /// The acceptance loop terminated abnormally
    #[error("rpc connection terminated: {0}")]
    Connection(#[source] PeerError),

    /// Reading or writing the target manifest file failed
    #[error("manifest file {}: {}", path.display(), source)]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
}
