//! shelly-cli — poke a device over its RPC socket from the terminal.

use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use shellyrpc::{NOTIFY_WS_CLOSED, RpcClient, RpcError};
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("rpc failed: {0}")]
    Rpc(#[from] RpcError),
}

#[derive(Parser, Debug)]
#[command(name = "shelly-cli", about = "RPC CLI for Shelly-style devices")]
struct Cli {
    /// Device address: `ip[:port]`, or a full `ws://`/`wss://` URL.
    #[arg(long, env = "SHELLY_HOST")]
    host: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Invoke one RPC method and print its result.
    Call {
        method: String,

        /// Method parameters as a JSON object.
        #[arg(long)]
        params: Option<String>,

        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Print device notifications as they arrive.
    Listen {
        /// Stop after this many notifications.
        #[arg(long)]
        count: Option<usize>,
    },
    /// Shortcut for `Shelly.GetDeviceInfo`.
    Info,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Call { method, params, timeout_secs } => {
            run_call(&cli.host, &method, params.as_deref(), timeout_secs).await
        }
        Command::Listen { count } => run_listen(&cli.host, count).await,
        Command::Info => run_call(&cli.host, "Shelly.GetDeviceInfo", None, 10).await,
    }
}

async fn run_call(
    host: &str,
    method: &str,
    params: Option<&str>,
    timeout_secs: u64,
) -> Result<(), CliError> {
    let params = params.map(serde_json::from_str::<Value>).transpose()?;

    let client = RpcClient::new(host, |_method: &str, _params: Option<&Value>| {});
    client.connect().await?;
    let result = client
        .call_with_timeout(method, params, Duration::from_secs(timeout_secs))
        .await;
    let _ = client.disconnect().await;

    print_json(&result?)
}

async fn run_listen(host: &str, count: Option<usize>) -> Result<(), CliError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = RpcClient::new(host, move |method: &str, params: Option<&Value>| {
        let _ = tx.send((method.to_owned(), params.cloned()));
    });
    client.connect().await?;

    let mut seen = 0_usize;
    while let Some((method, params)) = rx.recv().await {
        if method == NOTIFY_WS_CLOSED {
            eprintln!("connection closed");
            return Ok(());
        }
        match params {
            Some(params) => println!("{method} {params}"),
            None => println!("{method}"),
        }
        seen = seen.saturating_add(1);
        if count.is_some_and(|limit| seen >= limit) {
            let _ = client.disconnect().await;
            return Ok(());
        }
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
