use std::time::Duration;

use restkit::config::{self, ConfigError, LogFormat, RunMode};
use restkit::metrics::{RecorderKind, RouteKey};

#[test]
fn empty_document_is_all_defaults() {
    let cfg = config::load_from_str("").expect("must parse");
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    assert_eq!(cfg.server.mode, RunMode::Release);
    assert_eq!(cfg.log.level, "info");
    assert_eq!(cfg.log.format, LogFormat::Pretty);
    assert_eq!(cfg.auth.token, "dummy-jwt-token");
    assert_eq!(cfg.events.exempt_paths, ["/health", "/metrics"]);
    assert_eq!(cfg.events.slow_request(), Duration::from_millis(500));
    assert_eq!(cfg.monitor.report_interval(), Duration::from_secs(60));
    assert_eq!(cfg.monitor.sample_recorder, RecorderKind::History);
    assert_eq!(cfg.monitor.route_key, RouteKey::Path);
}

#[test]
fn ok_full_config() {
    let ok = r#"
server:
  listen: "127.0.0.1:9000"
  mode: debug
log:
  level: "restkit=debug,info"
  format: json
auth:
  token: "s3cret"
  user_id: "42"
events:
  exempt_paths: ["/health"]
  slow_request_ms: 250
monitor:
  report_interval_secs: 5
  sample_recorder: histogram
  route_key: pattern
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.server.listen_addr().unwrap().port(), 9000);
    assert_eq!(cfg.server.mode, RunMode::Debug);
    assert_eq!(cfg.log.format, LogFormat::Json);
    assert_eq!(cfg.auth.user_id, "42");
    assert_eq!(cfg.events.exempt_paths, ["/health"]);
    assert_eq!(cfg.monitor.sample_recorder, RecorderKind::Histogram);
    assert_eq!(cfg.monitor.route_key, RouteKey::Pattern);
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
monitor:
  report_intervl_secs: 5 # typo should fail
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn semantic_validation() {
    let err = config::load_from_str("server: { listen: \"not-an-addr\" }").expect_err("must fail");
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = config::load_from_str("monitor: { report_interval_secs: 0 }").expect_err("must fail");
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = config::load_from_str("auth: { token: \"has space\" }").expect_err("must fail");
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let cfg = config::load_from_file("/definitely/not/here/restkit.yaml").expect("defaults");
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
}
