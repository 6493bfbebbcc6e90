//! 커널 방화벽 syslog 문법 (문법 A)
//!
//! # 형식
//! ```text
//! <4>Mon D HH:MM:SS kernel: ACTION KEY=VALUE KEY= BARE ...
//! ```
//!
//! - 우선순위는 `<4>` (kern.warning) 고정
//! - 값 없는 토큰(`SYN`)은 `SYN=Y`, `KEY=`는 빈 값
//! - 허용 목록에 있는 키만 필드가 되고, 나머지 토큰은 `FLAGS`에 원문 그대로 이어 붙입니다.

use logvane_core::types::{ParsedRecord, RecordKind};
use regex::Regex;

use super::{LocalZone, parse_bsd_timestamp};
use crate::error::LogPipelineError;

/// 필드로 승격되는 옵션 키 목록
pub const ALLOWED_KEYS: &[&str] = &[
    "IN", "OUT", "PHYSIN", "PHYSOUT", "MAC", "SRC", "DST", "LEN", "TOS", "PREC", "TTL", "ID",
    "DF", "PROTO", "SPT", "DPT", "WINDOW", "RES", "SYN", "ACK", "FIN", "RST", "PSH", "URG",
    "URGP", "TYPE", "CODE", "SEQ", "MTU", "MARK",
];

/// 허용 목록 밖 토큰이 모이는 필드
pub const FLAGS_FIELD: &str = "FLAGS";

/// 동작 토큰 필드
pub const ACTION_FIELD: &str = "ACTION";

const PATTERN: &str =
    r"^<4>(?P<dt>\w+\s+\d+\s+\d+:\d+:\d+)\s+kernel:\s+(?P<action>[A-Z]+)\s+(?P<opts>.*)";

/// 커널 방화벽 문법
#[derive(Debug, Clone)]
pub struct FirewallGrammar {
    pattern: Regex,
}

impl FirewallGrammar {
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

        let mut record = ParsedRecord::new(RecordKind::KernelFirewall, timestamp);
        record.insert(ACTION_FIELD, &caps["action"]);

        let mut overflow: Vec<&str> = Vec::new();
        for token in caps["opts"].split_whitespace() {
            let (key, value) = token.split_once('=').unwrap_or((token, "Y"));
            if ALLOWED_KEYS.contains(&key) {
                record.insert(key, value);
            } else {
                overflow.push(token);
            }
        }
        if !overflow.is_empty() {
            record.insert(FLAGS_FIELD, overflow.join(" "));
        }

        Some(record)
    }

    /// 레코드를 문법 A 라인으로 다시 직렬화합니다.
    ///
    /// 방화벽 레코드가 아니거나 동작 토큰이 없으면 `None`.
    pub fn render(record: &ParsedRecord) -> Option<String> {
        if record.kind() != RecordKind::KernelFirewall {
            return None;
        }
        let action = record.get_text(ACTION_FIELD)?;

        let mut line = format!(
            "<4>{} kernel: {action}",
            record.timestamp().format("%b %e %H:%M:%S")
        );
        for key in ALLOWED_KEYS {
            if let Some(value) = record.get(key) {
                line.push(' ');
                line.push_str(key);
                line.push('=');
                line.push_str(&value.to_string());
            }
        }
        if let Some(flags) = record.get_text(FLAGS_FIELD) {
            line.push(' ');
            line.push_str(flags);
        }
        Some(line)
    }
}
