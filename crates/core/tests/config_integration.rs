//! dockwall.toml 통합 설정 테스트
//!
//! - dockwall.toml.example 파싱 테스트
//! - 부분 설정 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 파일 로딩 에러 테스트

use std::io::Write;

use dockwall_core::config::{ChainNames, DockwallConfig};
use dockwall_core::error::{ConfigError, DockwallError};

// =============================================================================
// dockwall.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_and_validates() {
    let content = include_str!("../../../dockwall.toml.example");
    let config = DockwallConfig::parse(content).expect("example config should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let content = include_str!("../../../dockwall.toml.example");
    let from_file = DockwallConfig::parse(content).expect("should parse");
    let from_code = DockwallConfig::default();

    assert_eq!(from_file.general.log_level, from_code.general.log_level);
    assert_eq!(from_file.general.log_format, from_code.general.log_format);

    assert_eq!(from_file.docker.socket, from_code.docker.socket);
    assert_eq!(from_file.docker.debounce_ms, from_code.docker.debounce_ms);
    assert_eq!(
        from_file.docker.retry_delay_ms,
        from_code.docker.retry_delay_ms
    );

    assert_eq!(
        from_file.firewall.iptables_command,
        from_code.firewall.iptables_command
    );
    assert_eq!(from_file.firewall.comment, from_code.firewall.comment);
    assert_eq!(from_file.firewall.chains, from_code.firewall.chains);

    assert_eq!(from_file.metrics.enabled, from_code.metrics.enabled);
    assert_eq!(from_file.metrics.listen_addr, from_code.metrics.listen_addr);
    assert_eq!(from_file.metrics.port, from_code.metrics.port);
}

// =============================================================================
// 부분 설정 로딩 테스트
// =============================================================================

#[test]
fn partial_config_firewall_only() {
    let toml = r#"
[firewall]
iptables_command = "/usr/sbin/iptables-legacy"
comment = ""
"#;
    let config = DockwallConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.firewall.iptables_command, "/usr/sbin/iptables-legacy");
    assert!(config.firewall.comment.is_empty());
    // 체인 이름은 기본값
    assert_eq!(config.firewall.chains, ChainNames::default());
    assert_eq!(config.docker.debounce_ms, 5_000);
}

#[test]
fn partial_config_with_colliding_chain_fails_validation() {
    let toml = r#"
[firewall.chains]
forward = "FORWARD"
"#;
    let config = DockwallConfig::parse(toml).expect("should parse");
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        DockwallError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn unknown_type_fails_parse() {
    let toml = r#"
[docker]
debounce_ms = "five seconds"
"#;
    let err = DockwallConfig::parse(toml).unwrap_err();
    assert!(matches!(
        err,
        DockwallError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_and_validates() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[docker]\ndebounce_ms = 200\nretry_delay_ms = 50").expect("write");

    let config = DockwallConfig::load(file.path()).await.expect("should load");
    assert_eq!(config.docker.debounce_ms, 200);
    assert_eq!(config.docker.retry_delay_ms, 50);
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_invalid_values_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[docker]\nretry_delay_ms = 0").expect("write");

    let err = DockwallConfig::load(file.path()).await.unwrap_err();
    assert!(err.to_string().contains("docker.retry_delay_ms"));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[docker]
debounce_ms = 1000
"#;

    let original = std::env::var("DOCKWALL_DOCKER_DEBOUNCE_MS").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("DOCKWALL_DOCKER_DEBOUNCE_MS", "750");
    }

    let mut config = DockwallConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.docker.debounce_ms;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("DOCKWALL_DOCKER_DEBOUNCE_MS", val),
            None => std::env::remove_var("DOCKWALL_DOCKER_DEBOUNCE_MS"),
        }
    }

    assert_eq!(result, 750);
}

#[test]
#[serial_test::serial]
fn env_override_chain_name() {
    let original = std::env::var("DOCKWALL_FIREWALL_CHAINS_ISOLATION").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("DOCKWALL_FIREWALL_CHAINS_ISOLATION", "DW_ISOLATE");
    }

    let result = DockwallConfig::from_env();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("DOCKWALL_FIREWALL_CHAINS_ISOLATION", val),
            None => std::env::remove_var("DOCKWALL_FIREWALL_CHAINS_ISOLATION"),
        }
    }

    let config = result.expect("env config should validate");
    assert_eq!(config.firewall.chains.isolation, "DW_ISOLATE");
}

#[test]
#[serial_test::serial]
fn env_override_invalid_value_is_rejected_by_validation() {
    let original = std::env::var("DOCKWALL_GENERAL_LOG_FORMAT").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("DOCKWALL_GENERAL_LOG_FORMAT", "xml");
    }

    let result = DockwallConfig::from_env();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("DOCKWALL_GENERAL_LOG_FORMAT", val),
            None => std::env::remove_var("DOCKWALL_GENERAL_LOG_FORMAT"),
        }
    }

    assert!(result.is_err());
}
