//! Plugin Manifest
//!
//! Renders the Vimscript registration block for a host and merges it into an
//! existing script file without disturbing unrelated content.
//!
//! A block looks like:
//!
//! ```vim
//! call remote#host#RegisterPlugin('greeter', '0', [
//! \ {'type': 'command', 'name': 'Greet', 'sync': 1, 'opts': {'nargs': '*'}},
//! \ ])
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::HostError;
use crate::registry::HandlerSpec;

/// Line that terminates a registration block.
const END_MARKER: &str = "\\ ])";

/// Render the registration block for `host` from an ordered registry.
///
/// Deterministic: handler order is preserved, options render in key order.
/// Fails on a descriptor the block syntax cannot carry; nothing is dropped
/// silently.
pub fn render(host: &str, specs: &[HandlerSpec]) -> Result<Vec<u8>, HostError> {
    let mut out = String::new();
    out.push_str(&format!(
        "call remote#host#RegisterPlugin('{}', '0', [\n",
        vim_quote(host)
    ));
    for spec in specs {
        if spec.name.is_empty() {
            return Err(HostError::Config(format!(
                "{} handler with an empty name",
                spec.kind.as_str()
            )));
        }
        if spec.name.contains(['\n', '\r']) {
            return Err(HostError::Config(format!(
                "{} handler name contains a line break",
                spec.kind.as_str()
            )));
        }
        out.push_str(&format!(
            "\\ {{'type': '{}', 'name': '{}', 'sync': {}, 'opts': {}}},\n",
            spec.kind.as_str(),
            vim_quote(&spec.name),
            if spec.sync { 1 } else { 0 },
            vim_dict(&spec.opts)?,
        ));
    }
    out.push_str(END_MARKER);
    out.push('\n');
    Ok(out.into_bytes())
}

/// Replace the `host` block in `existing`, or append the manifest if no such
/// block is present.
///
/// Pure splice: bytes outside the identified block are preserved exactly,
/// and merging the same manifest twice is a fixed point.
pub fn merge(host: &str, existing: &[u8], manifest: &[u8]) -> Vec<u8> {
    match find_block(host, existing) {
        None => {
            let mut out = Vec::with_capacity(existing.len() + manifest.len() + 1);
            out.extend_from_slice(existing);
            if !existing.is_empty() && existing.last() != Some(&b'\n') {
                // Start the new block on its own line.
                out.push(b'\n');
            }
            out.extend_from_slice(manifest);
            out
        }
        Some((start, end)) => {
            let block = if end != existing.len() {
                // The replaced span excludes its line break; dropping the
                // manifest's own keeps mid-file splices single-spaced.
                manifest.strip_suffix(b"\n").unwrap_or(manifest)
            } else {
                manifest
            };
            let mut out = Vec::with_capacity(existing.len() - (end - start) + block.len());
            out.extend_from_slice(&existing[..start]);
            out.extend_from_slice(block);
            out.extend_from_slice(&existing[end..]);
            out
        }
    }
}

/// Locate the block registered for exactly `host`: from the start of its
/// begin-marker line to just after the `\ ])` terminator line, line break
/// excluded. A begin marker with no terminator anywhere after it is not a
/// block.
///
/// The host is matched as a literal token including its closing quote, so
/// `host1` never matches a `host10` block, and occurrences of the host text
/// inside another block's payload are ignored.
fn find_block(host: &str, input: &[u8]) -> Option<(usize, usize)> {
    let needle = format!("call remote#host#RegisterPlugin('{}'", vim_quote(host));
    let needle = needle.as_bytes();

    let mut line_start = 0;
    while line_start < input.len() {
        let line_end = match input[line_start..].iter().position(|&b| b == b'\n') {
            Some(i) => line_start + i + 1,
            None => input.len(),
        };
        if input[line_start..].starts_with(needle) {
            return end_of_block(input, line_end).map(|end| (line_start, end));
        }
        line_start = line_end;
    }
    None
}

/// Offset just past the first `\ ])` line at or after `line_start`.
fn end_of_block(input: &[u8], mut line_start: usize) -> Option<usize> {
    while line_start < input.len() {
        let newline = input[line_start..].iter().position(|&b| b == b'\n');
        let content_end = match newline {
            Some(i) => line_start + i,
            None => input.len(),
        };
        if &input[line_start..content_end] == END_MARKER.as_bytes() {
            return Some(content_end);
        }
        line_start = match newline {
            Some(i) => line_start + i + 1,
            None => input.len(),
        };
    }
    None
}

/// Escape for a Vimscript single-quoted string: quotes double, everything
/// else is literal.
fn vim_quote(s: &str) -> String {
    s.replace('\'', "''")
}

fn vim_dict(opts: &BTreeMap<String, Value>) -> Result<String, HostError> {
    let mut entries = Vec::with_capacity(opts.len());
    for (key, value) in opts {
        if key.is_empty() || key.contains(['\n', '\r']) {
            return Err(HostError::Config(format!("bad option key {:?}", key)));
        }
        entries.push(format!("'{}': {}", vim_quote(key), vim_literal(value)?));
    }
    Ok(format!("{{{}}}", entries.join(", ")))
}

/// Lower a JSON option value to a Vimscript literal.
fn vim_literal(value: &Value) -> Result<String, HostError> {
    match value {
        Value::Null => Err(HostError::Config("null option value".into())),
        Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => {
            if s.contains(['\n', '\r']) {
                return Err(HostError::Config(format!(
                    "option value {:?} contains a line break",
                    s
                )));
            }
            Ok(format!("'{}'", vim_quote(s)))
        }
        Value::Array(items) => {
            let items: Result<Vec<_>, _> = items.iter().map(vim_literal).collect();
            Ok(format!("[{}]", items?.join(", ")))
        }
        Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, value) in map {
                entries.push(format!("'{}': {}", vim_quote(key), vim_literal(value)?));
            }
            Ok(format!("{{{}}}", entries.join(", ")))
        }
    }
}
