//! Plugin Lifecycle
//!
//! Startup-mode selection and the one peer connection per process lifetime:
//! either emit the registration manifest and stop, or serve the editor's
//! RPC connection until it closes.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tracing::{debug, info};

use geata_rpc::Peer;

use crate::error::HostError;
use crate::identity::ClientIdentity;
use crate::manifest;
use crate::registry::PluginContext;

/// Command-line options recognized by a geata plugin process.
#[derive(Parser, Debug)]
#[command(name = "geata")]
pub struct Args {
    /// Write the registration manifest for this host instead of serving RPC
    #[arg(long, value_name = "host")]
    pub manifest: Option<String>,

    /// Merge the manifest into this Vimscript file instead of stdout
    #[arg(long, value_name = "file", requires = "manifest")]
    pub location: Option<PathBuf>,
}

impl Args {
    /// Host to render a manifest for. An empty value counts as unset, so
    /// `--manifest ''` still serves RPC.
    fn manifest_host(&self) -> Option<&str> {
        self.manifest.as_deref().filter(|host| !host.is_empty())
    }
}

/// Run the plugin process to completion.
///
/// Invokes `register` exactly once against a fresh context, then either
/// emits the manifest (`--manifest`, optionally `--location`) or serves the
/// editor connection over stdio until it closes. Every error is fatal; the
/// caller should surface it and exit non-zero.
pub async fn run<F>(register: F) -> Result<(), HostError>
where
    F: FnOnce(&mut PluginContext) -> anyhow::Result<()>,
{
    let args = Args::parse();

    // Stdout carries protocol frames in serve mode and the rendered block
    // in manifest mode; diagnostics must go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    run_with(args, register).await
}

async fn run_with<F>(args: Args, register: F) -> Result<(), HostError>
where
    F: FnOnce(&mut PluginContext) -> anyhow::Result<()>,
{
    match args.manifest_host() {
        Some(host) => write_manifest(host, args.location.as_deref(), register),
        None => serve_with(tokio::io::stdin(), tokio::io::stdout(), register).await,
    }
}

/// Manifest mode: one render-and-write pass, no serve loop.
fn write_manifest<F>(host: &str, location: Option<&Path>, register: F) -> Result<(), HostError>
where
    F: FnOnce(&mut PluginContext) -> anyhow::Result<()>,
{
    let mut ctx = PluginContext::detached();
    register(&mut ctx).map_err(HostError::Registration)?;
    let (registry, _handlers) = ctx.into_parts();

    let manifest = manifest::render(host, registry.specs())?;
    match location {
        Some(path) => {
            let existing = std::fs::read(path).map_err(|source| HostError::File {
                path: path.to_path_buf(),
                source,
            })?;
            let merged = manifest::merge(host, &existing, &manifest);
            std::fs::write(path, merged).map_err(|source| HostError::File {
                path: path.to_path_buf(),
                source,
            })?;
            info!(host = %host, path = %path.display(), "manifest merged");
        }
        None => {
            let mut stdout = std::io::stdout();
            stdout
                .write_all(&manifest)
                .and_then(|_| stdout.flush())
                .map_err(|source| HostError::File {
                    path: PathBuf::from("-"),
                    source,
                })?;
        }
    }
    Ok(())
}

/// Serve mode: one peer connection over the given stream pair.
async fn serve_with<R, W, F>(reader: R, writer: W, register: F) -> Result<(), HostError>
where
    R: AsyncRead + Send + Sync + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
    F: FnOnce(&mut PluginContext) -> anyhow::Result<()>,
{
    let mut peer = Peer::new(reader, writer);
    let handle = peer.handle();

    let mut ctx = PluginContext::connected(handle.clone());
    register(&mut ctx).map_err(HostError::Registration)?;
    let (registry, handlers) = ctx.into_parts();
    for (method, handler) in handlers {
        peer.register(method, handler);
    }
    info!(handlers = registry.len(), "serving editor connection");

    // Single-slot completion signal for the acceptance loop's terminal
    // outcome. The loop may already be fielding calls while the identity
    // notification below is still in flight.
    let (outcome_tx, outcome_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = outcome_tx.send(peer.serve().await);
    });

    let identity = ClientIdentity::host_default();
    handle
        .notify("nvim_set_client_info", identity.to_params())
        .await
        .map_err(HostError::Handshake)?;
    debug!(client = %identity.name, "client info sent");

    match outcome_rx.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HostError::Connection(e)),
        Err(_) => Err(HostError::Transport(
            "connection task ended without reporting an outcome".to_string(),
        )),
    }
}
