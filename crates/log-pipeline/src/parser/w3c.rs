//! W3C 확장 로그 형식 (고정 컬럼) 파서
//!
//! 공백으로 구분된 행을 컬럼 레이아웃에 맞춰 필드로 나눕니다.
//! 첫 두 컬럼(`date`, `time`)은 UTC 시각으로 읽어 지역 시각 `ts`로 변환합니다.
//!
//! # 파일 예시
//! ```text
//! #Software: Microsoft Internet Information Services 10.0
//! #Fields: date time s-ip cs-method cs-uri-stem ...
//! 2023-01-05 10:22:31 10.0.0.5 GET /index.html ...
//! ```
//!
//! `#Fields:` 지시자는 해당 파일의 나머지 부분에 대한 레이아웃을 바꿉니다.
//! 새 파일을 읽기 전에 [`W3cParser::begin_file`]로 기본 레이아웃을 복원해야 합니다.

use chrono::NaiveDateTime;
use logvane_core::types::{ParsedRecord, RecordKind};

use super::LocalZone;
use crate::error::LogPipelineError;

const FIELDS_DIRECTIVE: &str = "#Fields:";

/// 컬럼명을 필드명으로 정규화합니다.
///
/// `cs(User-Agent)` → `cs_user_agent`, `s-ip` → `s_ip`
pub fn normalize_column(column: &str) -> String {
    let replaced: String = column
        .chars()
        .map(|c| match c {
            '-' | '(' | ')' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect();
    replaced.trim_end_matches('_').to_owned()
}

/// W3C 고정 컬럼 파서
///
/// `#Fields:` 지시자 때문에 파일 단위 상태를 가집니다.
#[derive(Debug, Clone)]
pub struct W3cParser {
    default_layout: Vec<String>,
    active_layout: Vec<String>,
    zone: LocalZone,
}

impl W3cParser {
    /// 기본 레이아웃(원본 컬럼명 목록)으로 파서를 생성합니다.
    ///
    /// 레이아웃은 `date time`으로 시작하고 데이터 컬럼이 하나 이상 있어야 합니다.
    pub fn new<S: AsRef<str>>(columns: &[S], zone: LocalZone) -> Result<Self, LogPipelineError> {
        let layout = Self::build_layout(columns.iter().map(AsRef::as_ref))?;
        Ok(Self {
            default_layout: layout.clone(),
            active_layout: layout,
            zone,
        })
    }

    fn build_layout<'a>(
        columns: impl Iterator<Item = &'a str>,
    ) -> Result<Vec<String>, LogPipelineError> {
        let layout: Vec<String> = columns.map(normalize_column).collect();
        if layout.len() < 3 || layout[0] != "date" || layout[1] != "time" {
            return Err(LogPipelineError::Config {
                field: "columns".to_owned(),
                reason: format!(
                    "layout must start with 'date time' and name at least one data column, got {layout:?}"
                ),
            });
        }
        Ok(layout)
    }

    /// 새 파일을 시작합니다. 활성 레이아웃을 기본값으로 되돌립니다.
    pub fn begin_file(&mut self) {
        self.active_layout.clone_from(&self.default_layout);
    }

    /// 현재 활성 레이아웃 (정규화된 필드명)
    pub fn active_layout(&self) -> &[String] {
        &self.active_layout
    }

    /// 한 줄을 파싱합니다.
    ///
    /// - 빈 줄, 주석, 지시자 → `Ok(None)`
    /// - 데이터 행 → `Ok(Some(record))`
    /// - 컬럼 수 불일치, 잘못된 날짜/시각 → `Err(Parse)`
    ///
    /// 에러의 `offset`은 0이며, 파일 내 위치는 호출자가 알고 있습니다.
    pub fn parse_line(&mut self, line: &str) -> Result<Option<ParsedRecord>, LogPipelineError> {
        let line = line.trim_end();
        if line.trim_start().is_empty() {
            return Ok(None);
        }
        if let Some(directive) = line.strip_prefix(FIELDS_DIRECTIVE) {
            match Self::build_layout(directive.split_whitespace()) {
                Ok(layout) => self.active_layout = layout,
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unusable #Fields directive");
                }
            }
            return Ok(None);
        }
        if line.starts_with('#') {
            return Ok(None);
        }

        let values: Vec<&str> = line.split_whitespace().collect();
        if values.len() != self.active_layout.len() {
            return Err(malformed(format!(
                "expected {} columns, found {}",
                self.active_layout.len(),
                values.len()
            )));
        }

        let stamp = format!("{} {}", values[0], values[1]);
        let naive = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S")
            .map_err(|e| malformed(format!("invalid date/time '{stamp}': {e}")))?;
        let ts = self.zone.from_utc(&naive);

        let mut record = ParsedRecord::new(RecordKind::W3cAccess, ts);
        for (name, value) in self.active_layout.iter().zip(values).skip(2) {
            record.insert(name.as_str(), value);
        }
        Ok(Some(record))
    }
}

fn malformed(reason: String) -> LogPipelineError {
    LogPipelineError::Parse {
        format: "w3c".to_owned(),
        offset: 0,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};
    use logvane_core::config::DEFAULT_W3C_COLUMNS;

    const ROW: &str = "2023-01-05 10:22:31 10.0.0.5 GET /index.html q=1 443 - 8.8.8.8 \
                       Mozilla/5.0+(Windows+NT+10.0) - 200 0 0 15";

    fn parser() -> W3cParser {
        let columns: Vec<&str> = DEFAULT_W3C_COLUMNS.split_whitespace().collect();
        W3cParser::new(&columns, LocalZone::Fixed(FixedOffset::east_opt(3600).unwrap())).unwrap()
    }

    #[test]
    fn normalizes_column_names() {
        assert_eq!(normalize_column("cs(User-Agent)"), "cs_user_agent");
        assert_eq!(normalize_column("s-ip"), "s_ip");
        assert_eq!(normalize_column("time-taken"), "time_taken");
        assert_eq!(normalize_column("date"), "date");
    }

    #[test]
    fn parses_default_layout_row() {
        let mut parser = parser();
        let record = parser.parse_line(ROW).unwrap().unwrap();
        assert_eq!(record.kind(), RecordKind::W3cAccess);
        assert_eq!(record.get_text("c_ip"), Some("8.8.8.8"));
        assert_eq!(record.get_text("s_ip"), Some("10.0.0.5"));
        assert_eq!(
            record.get_text("cs_user_agent"),
            Some("Mozilla/5.0+(Windows+NT+10.0)")
        );
        assert_eq!(record.get_text("sc_status"), Some("200"));
        assert!(!record.contains("date"));
        assert!(!record.contains("time"));
        assert_eq!(record.len(), 13);
    }

    #[test]
    fn timestamp_is_utc_converted_to_zone() {
        let mut parser = parser();
        let record = parser.parse_line(ROW).unwrap().unwrap();
        assert_eq!(record.timestamp().hour(), 11);
        assert_eq!(record.timestamp().offset().local_minus_utc(), 3600);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let mut parser = parser();
        assert!(parser.parse_line("").unwrap().is_none());
        assert!(parser.parse_line("   \r\n").unwrap().is_none());
        assert!(parser.parse_line("#Software: IIS").unwrap().is_none());
        assert!(parser.parse_line("#Date: 2023-01-05 00:00:00").unwrap().is_none());
    }

    #[test]
    fn fields_directive_changes_layout_until_next_file() {
        let mut parser = parser();
        parser
            .parse_line("#Fields: date time c-ip cs-method sc-status")
            .unwrap();
        let record = parser
            .parse_line("2023-01-05 10:22:31 8.8.4.4 POST 201")
            .unwrap()
            .unwrap();
        assert_eq!(record.get_text("cs_method"), Some("POST"));
        assert_eq!(record.len(), 3);

        parser.begin_file();
        assert_eq!(parser.active_layout().len(), 15);
        assert!(parser.parse_line("2023-01-05 10:22:31 8.8.4.4 POST 201").is_err());
    }

    #[test]
    fn unusable_directive_keeps_layout() {
        let mut parser = parser();
        parser.parse_line("#Fields: c-ip").unwrap();
        assert_eq!(parser.active_layout().len(), 15);
    }

    #[test]
    fn column_count_mismatch_is_malformed() {
        let mut parser = parser();
        let err = parser
            .parse_line("2023-01-05 10:22:31 10.0.0.5 GET")
            .unwrap_err();
        assert!(err.to_string().contains("expected 15 columns, found 4"));
    }

    #[test]
    fn bad_date_is_malformed() {
        let mut parser = parser();
        let row = ROW.replacen("2023-01-05", "2023-13-05", 1);
        let err = parser.parse_line(&row).unwrap_err();
        assert!(matches!(err, LogPipelineError::Parse { .. }));
    }

    #[test]
    fn layout_must_start_with_date_time() {
        let result = W3cParser::new(&["c-ip", "date", "time"], LocalZone::System);
        assert!(result.is_err());
    }
}
