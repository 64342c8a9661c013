//! debug-broker: reads newline-delimited JSON command envelopes from stdin,
//! dispatches them against `debug-broker-core`'s command surface, and writes
//! one newline-delimited JSON result per line to stdout.
//!
//! No schema validation beyond serde's, no auth, no multi-transport support
//! — intentionally thin. A real controlling client talks a richer tool-call
//! RPC and drives `debug_broker_core::commands` directly instead of this
//! process.

use debug_broker::protocol::{self, Command};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "debug-broker starting");

    let cfg = match debug_broker::config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "no config file loaded, using defaults");
            debug_broker::config::BrokerConfig::default()
        }
    };
    info!(max_sessions = cfg.max_sessions, "config loaded");

    let registry = debug_broker::build_registry(&cfg);

    let stdin = BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    let mut lines = stdin.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "error reading stdin, shutting down");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Command>(&line) {
            Ok(command) => protocol::render(protocol::dispatch(&registry, command).await),
            Err(e) => serde_json::json!({
                "ok": false,
                "error": { "kind": "INVALID_PARAMETERS", "message": format!("malformed command line: {e}") },
            }),
        };

        let mut text = serde_json::to_string(&reply).expect("reply always serializes");
        text.push('\n');
        if stdout.write_all(text.as_bytes()).await.is_err() {
            break;
        }
    }

    info!("debug-broker shutting down");
}
