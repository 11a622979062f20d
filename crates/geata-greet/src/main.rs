//! A minimal geata plugin: one command, one function, one autocmd.
//!
//! Run under Neovim as a remote plugin, or with `--manifest greeter` to
//! print the registration block (`--location <file>` merges it in place).

use anyhow::Result;
use serde_json::{json, Value};

use geata_host::{HandlerSpec, PluginContext, RpcError};

#[tokio::main]
async fn main() -> Result<()> {
    geata_host::run(register).await?;
    Ok(())
}

fn register(plugin: &mut PluginContext) -> Result<()> {
    plugin.register(
        HandlerSpec::command("Greet").sync().opt("nargs", json!("*")),
        |args| async move {
            let who = args.get(0).and_then(Value::as_str).unwrap_or("world");
            Ok(json!(format!("hello, {}", who)))
        },
    );

    plugin.register(HandlerSpec::function("GreetCount"), |args| async move {
        let args = args
            .as_array()
            .ok_or_else(|| RpcError::invalid_params("expected an argument list"))?;
        Ok(json!(args.len()))
    });

    plugin.register(
        HandlerSpec::autocmd("BufEnter").opt("pattern", json!("*.txt")),
        |_args| async move { Ok(Value::Null) },
    );

    Ok(())
}
