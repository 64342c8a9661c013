//! Exercises the stdio front end's dispatch layer directly (no process
//! spawn), calling into the library crate rather than shelling out to the
//! binary.

use debug_broker::config::load_config_from_str;
use debug_broker::protocol::{self, Command};

#[tokio::test]
async fn list_sessions_on_an_empty_registry_is_an_empty_array() {
    let cfg = load_config_from_str("").unwrap();
    let registry = debug_broker::build_registry(&cfg);

    let outcome = protocol::dispatch(&registry, Command::ListSessions).await;
    let rendered = protocol::render(outcome);
    assert_eq!(rendered["ok"], true);
    assert_eq!(rendered["result"], serde_json::json!([]));
}

#[tokio::test]
async fn connect_debugger_rejects_a_disallowed_host() {
    let cfg = load_config_from_str("").unwrap();
    let registry = debug_broker::build_registry(&cfg);

    let outcome = protocol::dispatch(
        &registry,
        Command::ConnectDebugger { websocket_url: "ws://evil.example.com/t".to_owned(), name: None },
    )
    .await;
    let rendered = protocol::render(outcome);
    assert_eq!(rendered["ok"], false);
    assert_eq!(rendered["error"]["kind"], "INVALID_PARAMETERS");
}

#[tokio::test]
async fn unknown_session_id_on_any_operation_is_session_not_found() {
    let cfg = load_config_from_str("").unwrap();
    let registry = debug_broker::build_registry(&cfg);

    let outcome = protocol::dispatch(
        &registry,
        Command::ListBreakpoints { session_id: "00000000-0000-0000-0000-000000000000".to_owned() },
    )
    .await;
    let rendered = protocol::render(outcome);
    assert_eq!(rendered["ok"], false);
    assert_eq!(rendered["error"]["kind"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn malformed_session_id_is_invalid_parameters() {
    let cfg = load_config_from_str("").unwrap();
    let registry = debug_broker::build_registry(&cfg);

    let outcome =
        protocol::dispatch(&registry, Command::ListBreakpoints { session_id: "not-a-uuid".to_owned() }).await;
    let rendered = protocol::render(outcome);
    assert_eq!(rendered["ok"], false);
    assert_eq!(rendered["error"]["kind"], "INVALID_PARAMETERS");
}
