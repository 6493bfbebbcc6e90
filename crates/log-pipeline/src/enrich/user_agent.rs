//! User-Agent 평탄화
//!
//! W3C 로그의 User-Agent는 공백이 `+`로 인코딩되어 있으므로 먼저 복원한 뒤 분류합니다.
//! 분류기가 아무 속성도 찾지 못하면 원문을 `browser_name`으로 사용합니다.

use std::collections::BTreeMap;

use woothee::parser::Parser;

/// 분류기가 값을 모를 때 돌려주는 표식
const UNKNOWN: &str = "UNKNOWN";

/// User-Agent 평탄화기
pub struct UserAgentFlattener {
    parser: Parser,
}

impl UserAgentFlattener {
    /// 새 평탄화기를 생성합니다.
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// User-Agent 문자열을 속성 맵으로 분해합니다.
    ///
    /// 키: `browser_name`, `browser_version`, `browser_vendor`, `browser_type`,
    /// `os_name`, `os_version`, `category`. 값이 비었거나 알 수 없는 항목은 생략합니다.
    /// 빈 문자열과 W3C 빈 값(`-`)은 빈 맵을 돌려줍니다.
    pub fn flatten(&self, raw: &str) -> BTreeMap<&'static str, String> {
        let mut attrs = BTreeMap::new();
        let raw = raw.trim();
        if raw.is_empty() || raw == "-" {
            return attrs;
        }

        let decoded = raw.replace('+', " ");
        if let Some(result) = self.parser.parse(&decoded) {
            for (key, value) in [
                ("browser_name", result.name),
                ("browser_version", result.version),
                ("browser_vendor", result.vendor),
                ("browser_type", result.browser_type),
                ("os_name", result.os),
                ("os_version", &*result.os_version),
                ("category", result.category),
            ] {
                if !value.is_empty() && value != UNKNOWN {
                    attrs.insert(key, value.to_owned());
                }
            }
        }

        if attrs.is_empty() {
            attrs.insert("browser_name", decoded);
        }
        attrs
    }
}

impl Default for UserAgentFlattener {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UserAgentFlattener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAgentFlattener").finish_non_exhaustive()
    }
}
