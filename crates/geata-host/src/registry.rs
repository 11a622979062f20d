//! Handler Registration
//!
//! The capability surface an embedding application registers its handlers
//! against, and the ordered registry the manifest is rendered from.

use std::collections::BTreeMap;
use std::future::Future;

use serde_json::Value;

use geata_rpc::{Handler, HandlerFuture, PeerHandle, RpcError};

/// Handler kinds recognized by the editor's plugin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Command,
    Function,
    Autocmd,
}

impl HandlerKind {
    /// Type tag used in the manifest and in dispatch method names.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Command => "command",
            HandlerKind::Function => "function",
            HandlerKind::Autocmd => "autocmd",
        }
    }
}

/// Descriptor for one registered handler.
///
/// The `opts` payload (nargs, pattern, eval, ...) is opaque to the host; it
/// is carried into the manifest verbatim, in key order.
#[derive(Debug, Clone)]
pub struct HandlerSpec {
    pub kind: HandlerKind,
    pub name: String,
    /// Whether the editor blocks on the call.
    pub sync: bool,
    pub opts: BTreeMap<String, Value>,
}

impl HandlerSpec {
    fn new(kind: HandlerKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            sync: false,
            opts: BTreeMap::new(),
        }
    }

    /// Descriptor for an ex command (`:Name`).
    pub fn command(name: impl Into<String>) -> Self {
        Self::new(HandlerKind::Command, name)
    }

    /// Descriptor for a Vimscript-callable function. Functions return a
    /// value, so they default to synchronous.
    pub fn function(name: impl Into<String>) -> Self {
        let mut spec = Self::new(HandlerKind::Function, name);
        spec.sync = true;
        spec
    }

    /// Descriptor for an autocmd on the named event.
    pub fn autocmd(event: impl Into<String>) -> Self {
        Self::new(HandlerKind::Autocmd, event)
    }

    /// Make the editor block until the handler returns.
    pub fn sync(mut self) -> Self {
        self.sync = true;
        self
    }

    /// Attach a kind-specific option.
    pub fn opt(mut self, key: impl Into<String>, value: Value) -> Self {
        self.opts.insert(key.into(), value);
        self
    }

    /// Method name the editor invokes this handler under.
    pub fn method(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.name)
    }
}

/// Ordered collection of handler descriptors.
///
/// Built once by the registration callback; immutable from the moment the
/// serve loop (or the manifest renderer) takes over.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    specs: Vec<HandlerSpec>,
}

impl HandlerRegistry {
    pub fn specs(&self) -> &[HandlerSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn push(&mut self, spec: HandlerSpec) {
        self.specs.push(spec);
    }
}

/// Registration context handed to the embedding application exactly once.
///
/// Detached when rendering a manifest, connected to the live peer when
/// serving. Registration is the only capability exposed, plus the peer
/// handle for handlers that want to notify the editor.
pub struct PluginContext {
    peer: Option<PeerHandle>,
    registry: HandlerRegistry,
    handlers: Vec<(String, Handler)>,
}

impl PluginContext {
    pub(crate) fn detached() -> Self {
        Self {
            peer: None,
            registry: HandlerRegistry::default(),
            handlers: Vec::new(),
        }
    }

    pub(crate) fn connected(peer: PeerHandle) -> Self {
        Self {
            peer: Some(peer),
            registry: HandlerRegistry::default(),
            handlers: Vec::new(),
        }
    }

    /// Handle to the live peer; `None` while rendering a manifest.
    pub fn peer(&self) -> Option<&PeerHandle> {
        self.peer.as_ref()
    }

    /// Register a handler under its descriptor. Build the descriptor with
    /// [`HandlerSpec::command`], [`HandlerSpec::function`] or
    /// [`HandlerSpec::autocmd`].
    pub fn register<F, Fut>(&mut self, spec: HandlerSpec, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        let method = spec.method();
        self.registry.push(spec);
        self.handlers.push((
            method,
            Box::new(move |params: Value| -> HandlerFuture { Box::pin(handler(params)) }),
        ));
    }

    pub(crate) fn into_parts(self) -> (HandlerRegistry, Vec<(String, Handler)>) {
        (self.registry, self.handlers)
    }
}
