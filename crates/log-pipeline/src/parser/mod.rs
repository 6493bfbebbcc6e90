//! 로그 파싱 모듈 -- syslog 이중 문법, W3C 고정 컬럼 형식
//!
//! [`LineGrammar`]는 syslog 라인 하나를 두 문법으로 순서대로 분류합니다.
//! 커널 방화벽 문법([`FirewallGrammar`])을 먼저 시도하고, 실패하면
//! 일반 syslog 문법([`SyslogGrammar`])을 시도합니다.
//!
//! [`W3cParser`]는 파일 테일링에서 사용하는 공백 구분 고정 컬럼 파서입니다.
//!
//! # 사용 예시
//! ```ignore
//! use logvane_log_pipeline::parser::{GrammarMatch, LineGrammar};
//!
//! let grammar = LineGrammar::new()?;
//! match grammar.parse("<13>Jan  5 10:22:31 dhcpd[123]: assigned lease") {
//!     GrammarMatch::GenericSyslog(record) => assert_eq!(record.get_text("FAC"), Some("dhcpd")),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

pub mod firewall;
pub mod syslog;
pub mod w3c;

pub use firewall::FirewallGrammar;
pub use syslog::SyslogGrammar;
pub use w3c::W3cParser;

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use logvane_core::types::ParsedRecord;

use crate::error::LogPipelineError;

/// 타임스탬프를 해석할 지역 시간대
///
/// 운영 환경에서는 호스트 시간대([`LocalZone::System`])를 사용하고,
/// 테스트에서는 고정 오프셋으로 결과를 재현 가능하게 만듭니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocalZone {
    /// 호스트 시간대
    #[default]
    System,
    /// 고정 UTC 오프셋
    Fixed(FixedOffset),
}

impl LocalZone {
    /// 지역 시각을 타임존이 붙은 시각으로 변환합니다.
    ///
    /// 존재하지 않는 시각(DST 전환 구간)이면 `None`, 중복 시각이면 이른 쪽을 반환합니다.
    pub fn localize(&self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::System => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            Self::Fixed(offset) => offset.from_local_datetime(naive).single(),
        }
    }

    /// UTC 시각을 이 시간대의 시각으로 변환합니다.
    pub fn from_utc(&self, naive: &NaiveDateTime) -> DateTime<FixedOffset> {
        let utc = Utc.from_utc_datetime(naive);
        match self {
            Self::System => utc.with_timezone(&Local).fixed_offset(),
            Self::Fixed(offset) => utc.with_timezone(offset),
        }
    }

    /// 이 시간대 기준 현재 연도
    pub fn current_year(&self) -> i32 {
        match self {
            Self::System => Local::now().year(),
            Self::Fixed(offset) => Utc::now().with_timezone(offset).year(),
        }
    }
}

/// BSD syslog 타임스탬프(`Mon D HH:MM:SS`)를 주어진 연도로 해석합니다.
///
/// 월/일 사이 공백 수는 자유롭습니다. 잘못된 날짜나 DST 공백 시각이면 `None`.
pub(crate) fn parse_bsd_timestamp(
    raw: &str,
    year: i32,
    zone: &LocalZone,
) -> Option<DateTime<FixedOffset>> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let naive =
        NaiveDateTime::parse_from_str(&format!("{year} {normalized}"), "%Y %b %d %H:%M:%S").ok()?;
    zone.localize(&naive)
}

/// 라인 분류 결과
///
/// 모든 라인은 정확히 하나의 결과로 분류됩니다.
#[derive(Debug, Clone, PartialEq)]
pub enum GrammarMatch {
    /// 커널 방화벽 라인 (문법 A)
    KernelFirewall(ParsedRecord),
    /// 일반 syslog 라인 (문법 B)
    GenericSyslog(ParsedRecord),
    /// 어떤 문법에도 맞지 않음
    Unrecognized,
}

impl GrammarMatch {
    /// 레코드가 있으면 꺼냅니다.
    pub fn into_record(self) -> Option<ParsedRecord> {
        match self {
            Self::KernelFirewall(record) | Self::GenericSyslog(record) => Some(record),
            Self::Unrecognized => None,
        }
    }
}

/// syslog 이중 문법 분류기
///
/// 상태가 없으므로 한 번 만들어 여러 라인에 재사용합니다.
#[derive(Debug, Clone)]
pub struct LineGrammar {
    firewall: FirewallGrammar,
    syslog: SyslogGrammar,
    zone: LocalZone,
}

impl LineGrammar {
    /// 호스트 시간대를 사용하는 분류기를 생성합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        Self::with_zone(LocalZone::System)
    }

    /// 지정한 시간대를 사용하는 분류기를 생성합니다.
    pub fn with_zone(zone: LocalZone) -> Result<Self, LogPipelineError> {
        Ok(Self {
            firewall: FirewallGrammar::new()?,
            syslog: SyslogGrammar::new()?,
            zone,
        })
    }

    /// 현재 연도를 사용해 라인을 분류합니다.
    pub fn parse(&self, line: &str) -> GrammarMatch {
        self.parse_with_year(line, self.zone.current_year())
    }

    /// 지정한 연도를 사용해 라인을 분류합니다.
    ///
    /// syslog 타임스탬프에는 연도가 없으므로 호출자가 연도를 정합니다.
    pub fn parse_with_year(&self, line: &str, year: i32) -> GrammarMatch {
        let line = line.trim();
        if let Some(record) = self.firewall.parse(line, year, &self.zone) {
            return GrammarMatch::KernelFirewall(record);
        }
        if let Some(record) = self.syslog.parse(line, year, &self.zone) {
            return GrammarMatch::GenericSyslog(record);
        }
        GrammarMatch::Unrecognized
    }
}
