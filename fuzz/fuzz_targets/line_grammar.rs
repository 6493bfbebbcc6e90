#![no_main]

use arbitrary::Arbitrary;
use chrono::FixedOffset;
use libfuzzer_sys::fuzz_target;
use logvane_log_pipeline::parser::{GrammarMatch, LineGrammar, LocalZone};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 라인 본문
    line: String,
    /// 연도 (윤년 처리 포함)
    year: u16,
    /// UTC 오프셋 (분)
    offset_minutes: i16,
}

fuzz_target!(|input: FuzzInput| {
    let offset = FixedOffset::east_opt(i32::from(input.offset_minutes % 1440) * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    let grammar = LineGrammar::with_zone(LocalZone::Fixed(offset)).unwrap();

    match grammar.parse_with_year(&input.line, i32::from(input.year % 10_000)) {
        GrammarMatch::KernelFirewall(record) => {
            assert!(record.get_text("ACTION").is_some());
            let _ = record.to_document();
        }
        GrammarMatch::GenericSyslog(record) => {
            assert!(record.get_text("CODE").is_some());
            let _ = record.to_document();
        }
        GrammarMatch::Unrecognized => {}
    }
});
