//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `dockwall_`
//! - 영역: `pass_`, `rules_`, `output_`, `monitor_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(dockwall_core::metrics::MONITOR_EVENTS_TOTAL).increment(1);
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 테이블 레이블 키 (nat, filter)
pub const LABEL_TABLE: &str = "table";

/// 실행 방식 레이블 키 (execute, invoke)
pub const LABEL_MODE: &str = "mode";

// ─── 생성 패스 ─────────────────────────────────────────────────────

/// 실행된 규칙 생성 패스 수 (counter, label: result)
pub const PASSES_TOTAL: &str = "dockwall_passes_total";

/// 패스 하나의 소요 시간 (histogram, 초)
pub const PASS_DURATION_SECONDS: &str = "dockwall_pass_duration_seconds";

/// 마지막 패스에서 생성된 규칙 수 (gauge, label: table)
pub const RULES_GENERATED: &str = "dockwall_rules_generated";

/// 마지막 패스에서 관찰된 NAT 대상 네트워크 수 (gauge)
pub const NAT_NETWORKS: &str = "dockwall_nat_networks";

/// 마지막 패스에서 관찰된 실행 중 컨테이너 수 (gauge)
pub const CONTAINERS: &str = "dockwall_containers";

// ─── 출력 ──────────────────────────────────────────────────────────

/// 이전 출력과 달라진 패스 수 (counter)
pub const OUTPUT_CHANGES_TOTAL: &str = "dockwall_output_changes_total";

/// 변경 없음으로 건너뛴 패스 수 (counter)
pub const OUTPUT_UNCHANGED_TOTAL: &str = "dockwall_output_unchanged_total";

/// 스크립트 실행 횟수 (counter, labels: mode, result)
pub const EXECUTIONS_TOTAL: &str = "dockwall_executions_total";

// ─── 이벤트 모니터 ─────────────────────────────────────────────────

/// 수신한 네트워크 이벤트 수 (counter)
pub const MONITOR_EVENTS_TOTAL: &str = "dockwall_monitor_events_total";

/// 디바운스 후 보낸 재생성 신호 수 (counter)
pub const MONITOR_SIGNALS_TOTAL: &str = "dockwall_monitor_signals_total";

/// 이벤트 스트림 재연결 시도 수 (counter)
pub const MONITOR_RECONNECTS_TOTAL: &str = "dockwall_monitor_reconnects_total";

/// 데몬 연결 상태 (gauge, 1 = connected)
pub const MONITOR_CONNECTED: &str = "dockwall_monitor_connected";

/// 패스 소요 시간 히스토그램 버킷 (초)
pub const PASS_DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    describe_counter!(PASSES_TOTAL, "Total number of rule synthesis passes");
    describe_histogram!(
        PASS_DURATION_SECONDS,
        "Time to run one inventory-synthesize-act pass in seconds"
    );
    describe_gauge!(
        RULES_GENERATED,
        "Number of rule statements generated by the last pass, per table"
    );
    describe_gauge!(NAT_NETWORKS, "Number of NAT-eligible networks seen by the last pass");
    describe_gauge!(CONTAINERS, "Number of running containers seen by the last pass");

    describe_counter!(
        OUTPUT_CHANGES_TOTAL,
        "Total number of passes whose output differed from the baseline"
    );
    describe_counter!(
        OUTPUT_UNCHANGED_TOTAL,
        "Total number of passes skipped because the output was unchanged"
    );
    describe_counter!(EXECUTIONS_TOTAL, "Total number of rule script executions");

    describe_counter!(
        MONITOR_EVENTS_TOTAL,
        "Total number of network events received from the docker daemon"
    );
    describe_counter!(
        MONITOR_SIGNALS_TOTAL,
        "Total number of debounced regeneration signals sent"
    );
    describe_counter!(
        MONITOR_RECONNECTS_TOTAL,
        "Total number of event stream reconnect attempts"
    );
    describe_gauge!(
        MONITOR_CONNECTED,
        "Whether the event monitor is subscribed to the docker daemon"
    );
}
