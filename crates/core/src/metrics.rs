//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logvane_`
//! - 단계명: `syslog_`, `tail_`, `store_`, `parser_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logvane_core::metrics::SYSLOG_DATAGRAMS_RECEIVED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 문서 타입 레이블 키 (routerlog, router_syslog, iislog)
pub const LABEL_DOCUMENT_TYPE: &str = "document_type";

/// 레코드 종류 레이블 키 (kernel_firewall, generic_syslog, w3c_access)
pub const LABEL_RECORD_KIND: &str = "kind";

// ─── Syslog 수신 메트릭 ────────────────────────────────────────────

/// Syslog: 수신한 데이터그램 수 (counter)
pub const SYSLOG_DATAGRAMS_RECEIVED_TOTAL: &str = "logvane_syslog_datagrams_received_total";

/// Syslog: 두 문법 모두에 맞지 않아 버린 라인 수 (counter)
pub const SYSLOG_LINES_UNRECOGNIZED_TOTAL: &str = "logvane_syslog_lines_unrecognized_total";

// ─── 파서 메트릭 ───────────────────────────────────────────────────

/// Parser: 문법별 파싱된 레코드 수 (counter, label: kind)
pub const PARSER_RECORDS_PARSED_TOTAL: &str = "logvane_parser_records_parsed_total";

/// Parser: 컬럼 수가 맞지 않거나 시각이 잘못된 W3C 행 수 (counter)
pub const PARSER_W3C_ROWS_MALFORMED_TOTAL: &str = "logvane_parser_w3c_rows_malformed_total";

// ─── 저장소 메트릭 ─────────────────────────────────────────────────

/// Store: 기록된 문서 수 (counter, label: document_type)
pub const STORE_RECORDS_INDEXED_TOTAL: &str = "logvane_store_records_indexed_total";

/// Store: 실패한 쓰기 수 (counter, label: document_type)
pub const STORE_WRITE_FAILURES_TOTAL: &str = "logvane_store_write_failures_total";

/// Store: 벌크 요청 한 건의 소요 시간 (histogram, 초)
pub const STORE_BULK_DURATION_SECONDS: &str = "logvane_store_bulk_duration_seconds";

// ─── 테일링 메트릭 ─────────────────────────────────────────────────

/// Tail: 한 번의 실행에서 적재한 레코드 수 (counter)
pub const TAIL_RECORDS_LOADED_TOTAL: &str = "logvane_tail_records_loaded_total";

/// Tail: 처리한 파일 수 (counter)
pub const TAIL_FILES_PROCESSED_TOTAL: &str = "logvane_tail_files_processed_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    // Syslog
    describe_counter!(
        SYSLOG_DATAGRAMS_RECEIVED_TOTAL,
        "Total number of UDP syslog datagrams received"
    );
    describe_counter!(
        SYSLOG_LINES_UNRECOGNIZED_TOTAL,
        "Total number of syslog lines matching neither grammar"
    );

    // Parser
    describe_counter!(
        PARSER_RECORDS_PARSED_TOTAL,
        "Total number of records parsed, by grammar"
    );
    describe_counter!(
        PARSER_W3C_ROWS_MALFORMED_TOTAL,
        "Total number of W3C rows skipped as malformed"
    );

    // Store
    describe_counter!(
        STORE_RECORDS_INDEXED_TOTAL,
        "Total number of documents written to the store"
    );
    describe_counter!(
        STORE_WRITE_FAILURES_TOTAL,
        "Total number of document writes rejected or failed"
    );
    describe_histogram!(
        STORE_BULK_DURATION_SECONDS,
        "Time to complete a single bulk request in seconds"
    );

    // Tail
    describe_counter!(
        TAIL_RECORDS_LOADED_TOTAL,
        "Total number of W3C records loaded by tail jobs"
    );
    describe_counter!(
        TAIL_FILES_PROCESSED_TOTAL,
        "Total number of rotated log files read by tail jobs"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRICS: &[&str] = &[
        SYSLOG_DATAGRAMS_RECEIVED_TOTAL,
        SYSLOG_LINES_UNRECOGNIZED_TOTAL,
        PARSER_RECORDS_PARSED_TOTAL,
        PARSER_W3C_ROWS_MALFORMED_TOTAL,
        STORE_RECORDS_INDEXED_TOTAL,
        STORE_WRITE_FAILURES_TOTAL,
        STORE_BULK_DURATION_SECONDS,
        TAIL_RECORDS_LOADED_TOTAL,
        TAIL_FILES_PROCESSED_TOTAL,
    ];

    #[test]
    fn all_metrics_start_with_logvane_prefix() {
        for name in ALL_METRICS {
            assert!(name.starts_with("logvane_"), "{name} lacks prefix");
        }
    }

    #[test]
    fn metric_suffixes_follow_convention() {
        for name in ALL_METRICS {
            assert!(
                name.ends_with("_total") || name.ends_with("_seconds"),
                "{name} has unexpected suffix"
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRICS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRICS.len());
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }
}
