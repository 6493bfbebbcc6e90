//! 일반 syslog 문법 (문법 B)
//!
//! # 형식
//! ```text
//! <CODE>Mon D HH:MM:SS facility[pid]: message
//! ```
//!
//! `CODE`, `FAC`, `MSG` 필드를 만들고, 태그에 `[숫자]` 접미어가 있으면 `FAC_N`도 만듭니다.

use logvane_core::types::{ParsedRecord, RecordKind};
use regex::Regex;

use super::{LocalZone, parse_bsd_timestamp};
use crate::error::LogPipelineError;

const PATTERN: &str =
    r"^<(?P<code>\d+)>(?P<dt>\w+\s+\d+\s+\d+:\d+:\d+)\s+(?P<fac>[^:]+):\s+(?P<rest>.*)";

/// 일반 syslog 문법
#[derive(Debug, Clone)]
pub struct SyslogGrammar {
    pattern: Regex,
}

impl SyslogGrammar {
    /// 문법을 컴파일합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        Ok(Self {
            pattern: Regex::new(PATTERN)?,
        })
    }

    /// 라인을 파싱합니다. 문법에 맞지 않거나 시각이 잘못되면 `None`.
    pub fn parse(&self, line: &str, year: i32, zone: &LocalZone) -> Option<ParsedRecord> {
        let caps = self.pattern.captures(line)?;
        let timestamp = parse_bsd_timestamp(&caps["dt"], year, zone)?;

        let mut record = ParsedRecord::new(RecordKind::GenericSyslog, timestamp);
        record.insert("CODE", &caps["code"]);

        let (facility, pid) = split_facility(&caps["fac"]);
        record.insert("FAC", facility);
        if let Some(pid) = pid {
            record.insert("FAC_N", pid);
        }
        record.insert("MSG", &caps["rest"]);

        Some(record)
    }
}

/// `dhcpd[123]` → (`dhcpd`, `Some("123")`)
///
/// 괄호 안이 숫자가 아니면 태그 전체를 facility로 둡니다.
fn split_facility(tag: &str) -> (&str, Option<&str>) {
    if let Some((name, rest)) = tag.split_once('[')
        && let Some(pid) = rest.strip_suffix(']')
        && !pid.is_empty()
        && pid.bytes().all(|b| b.is_ascii_digit())
    {
        return (name, Some(pid));
    }
    (tag, None)
}
