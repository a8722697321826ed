//! 메트릭 상수 및 설명 등록
//!
//! 하네스가 기록하는 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 단계는 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `devops_e2e_`
//! - 영역: `harness_`, `runner_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use devops_e2e_core::metrics;
//!
//! metrics::counter!(
//!     metrics::HARNESS_STEPS_TOTAL,
//!     metrics::LABEL_PHASE => "setup",
//!     metrics::LABEL_RESULT => "success",
//! )
//! .increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 단계 레이블 키 (setup, scenario, teardown)
pub const LABEL_PHASE: &str = "phase";

/// 스텝 레이블 키 (connect-cluster, create-claim, ...)
pub const LABEL_STEP: &str = "step";

/// 결과 레이블 키 (success, failure, skipped)
pub const LABEL_RESULT: &str = "result";

/// 실패 분류 레이블 키
pub const LABEL_KIND: &str = "kind";

/// 리소스 종류 레이블 키 (storage_class, encryption_class, claim)
pub const LABEL_RESOURCE: &str = "resource";

// ─── Harness 메트릭 ────────────────────────────────────────────────

/// Harness: 실행된 스텝 수 (counter, labels: phase, step, result)
pub const HARNESS_STEPS_TOTAL: &str = "devops_e2e_harness_steps_total";

/// Harness: 스텝 소요 시간 (histogram, 초, labels: phase, step)
pub const HARNESS_STEP_DURATION_SECONDS: &str = "devops_e2e_harness_step_duration_seconds";

/// Harness: 단계 소요 시간 (histogram, 초, label: phase)
pub const HARNESS_PHASE_DURATION_SECONDS: &str = "devops_e2e_harness_phase_duration_seconds";

/// Harness: 생성된 리소스 수 (counter, label: resource)
pub const HARNESS_RESOURCES_CREATED_TOTAL: &str = "devops_e2e_harness_resources_created_total";

/// Harness: 실행된 정리 동작 수 (counter, label: result)
pub const HARNESS_CLEANUPS_TOTAL: &str = "devops_e2e_harness_cleanups_total";

/// Harness: teardown 실패 수 (counter)
pub const HARNESS_TEARDOWN_FAILURES_TOTAL: &str = "devops_e2e_harness_teardown_failures_total";

/// Harness: 분류별 실패 수 (counter, label: kind)
pub const HARNESS_FAILURES_TOTAL: &str = "devops_e2e_harness_failures_total";

/// Harness: 덤프된 진단 이벤트 수 (counter)
pub const HARNESS_EVENTS_DUMPED_TOTAL: &str = "devops_e2e_harness_events_dumped_total";

// ─── Runner 메트릭 ──────────────────────────────────────────────────

/// Runner: 결과별 시나리오 실행 수 (counter, label: result)
pub const RUNNER_SCENARIOS_TOTAL: &str = "devops_e2e_runner_scenarios_total";

/// Runner: 빌드 정보 (gauge, 항상 1, label: version)
pub const RUNNER_BUILD_INFO: &str = "devops_e2e_runner_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 스텝 소요 시간 히스토그램 버킷 (초)
///
/// 10ms ~ 600s 범위 (VM 이미지 대기, 클레임 생성 포함)
pub const STEP_DURATION_BUCKETS: [f64; 10] =
    [0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0, 600.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        HARNESS_STEPS_TOTAL,
        "Total number of harness steps executed, by phase, step and result"
    );
    describe_histogram!(
        HARNESS_STEP_DURATION_SECONDS,
        "Duration of a single harness step in seconds"
    );
    describe_histogram!(
        HARNESS_PHASE_DURATION_SECONDS,
        "Duration of a harness phase (setup, scenario, teardown) in seconds"
    );
    describe_counter!(
        HARNESS_RESOURCES_CREATED_TOTAL,
        "Total number of cluster resources created by the harness"
    );
    describe_counter!(
        HARNESS_CLEANUPS_TOTAL,
        "Total number of scoped cleanup actions executed"
    );
    describe_counter!(
        HARNESS_TEARDOWN_FAILURES_TOTAL,
        "Total number of unexpected resource deletion failures during teardown"
    );
    describe_counter!(
        HARNESS_FAILURES_TOTAL,
        "Total number of harness failures by failure kind"
    );
    describe_counter!(
        HARNESS_EVENTS_DUMPED_TOTAL,
        "Total number of service namespace events dumped for diagnostics"
    );
    describe_counter!(
        RUNNER_SCENARIOS_TOTAL,
        "Total number of scenario runs by outcome"
    );
    describe_gauge!(
        RUNNER_BUILD_INFO,
        "Build information (always 1, labels carry version)"
    );
}
