#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use farmlink_gateway::config::{self, QueueBackend};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
gateway:
  listen: "0.0.0.0:8080"
  ping_intervall_ms: 20000 # typo should fail
devices:
  - uuid: "bot1"
    token: "s3cret"
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
devices:
  - uuid: "bot1"
    token: "s3cret"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.devices[0].uuid, "bot1");
    assert_eq!(cfg.queue.backend, QueueBackend::Memory);
    assert_eq!(cfg.dispatcher.inbox_capacity, 1024);
    assert_eq!(cfg.gateway.listen_addr().unwrap().port(), 8080);
}

#[test]
fn version_mismatch_is_unsupported() {
    let bad = r#"
version: 2
devices:
  - uuid: "bot1"
    token: "s3cret"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn empty_devices_rejected() {
    let err = config::load_from_str("version: 1\n").expect_err("must fail");
    assert!(err.to_string().contains("devices"), "{err}");
}

#[test]
fn duplicate_device_uuid_rejected() {
    let bad = r#"
version: 1
devices:
  - { uuid: "bot1", token: "a" }
  - { uuid: "bot1", token: "b" }
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("duplicate"), "{err}");
}

#[test]
fn out_of_range_values_rejected() {
    for section in [
        "gateway: { ping_interval_ms: 100 }",
        "gateway: { idle_timeout_ms: 5000000 }",
        "gateway: { ping_interval_ms: 60000, idle_timeout_ms: 30000 }",
        "gateway: { outbound_queue: 0 }",
        "gateway: { listen: \"not-an-addr\" }",
        "dispatcher: { inbox_capacity: 0 }",
    ] {
        let yaml = format!("version: 1\n{section}\ndevices:\n  - {{ uuid: bot1, token: t }}\n");
        let err = config::load_from_str(&yaml).expect_err(section);
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST", "{section}");
    }
}

#[test]
fn sqlite_backend_with_path() {
    let ok = r#"
version: 1
queue:
  backend: sqlite
  sqlite_path: "/var/lib/farmlink/queue.db"
devices:
  - uuid: "bot1"
    token: "s3cret"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.queue.backend, QueueBackend::Sqlite);
    assert_eq!(cfg.queue.sqlite_path.as_deref(), Some("/var/lib/farmlink/queue.db"));
}

#[test]
fn authenticate_checks_uuid_and_token() {
    let cfg = config::load_from_str(
        "version: 1\ndevices:\n  - { uuid: bot1, token: s3cret }\n  - { uuid: ui, token: other }\n",
    )
    .unwrap();
    assert!(cfg.authenticate("bot1", "s3cret"));
    assert!(!cfg.authenticate("bot1", "other"));
    assert!(!cfg.authenticate("nobody", "s3cret"));
}
