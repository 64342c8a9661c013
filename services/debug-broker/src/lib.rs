//! The thin stdio front end for the outer tool-call RPC: config loading,
//! logging setup, and a newline-delimited JSON command line protocol over
//! `debug-broker-core`'s command surface.
//!
//! Exposed as a library, not just a binary, so integration tests can drive
//! `protocol::dispatch` directly without spawning a process.

pub mod config;
pub mod protocol;

use std::sync::Arc;
use std::time::Duration;

use debug_broker_core::admission::AdmissionPolicy;
use debug_broker_core::source_map::DefaultSourceFetcher;
use debug_broker_core::SessionRegistry;

/// Build a [`SessionRegistry`] from a validated [`config::BrokerConfig`] and
/// spawn its background reaper task.
pub fn build_registry(cfg: &config::BrokerConfig) -> Arc<SessionRegistry> {
    let admission = AdmissionPolicy::new(cfg.allowed_hosts.iter().cloned(), cfg.allow_any_host);
    let registry = SessionRegistry::new(
        admission,
        cfg.max_sessions,
        Duration::from_millis(cfg.command_timeout_ms),
        Arc::new(DefaultSourceFetcher::default()),
    );
    registry.clone().spawn_reaper(Duration::from_millis(cfg.reaper_interval_ms));
    registry
}
