#![no_main]

use chrono::FixedOffset;
use libfuzzer_sys::fuzz_target;
use logvane_core::config::DEFAULT_W3C_COLUMNS;
use logvane_log_pipeline::parser::{LocalZone, W3cParser};

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };
    let columns: Vec<&str> = DEFAULT_W3C_COLUMNS.split_whitespace().collect();
    let zone = LocalZone::Fixed(FixedOffset::east_opt(0).unwrap());
    let mut parser = W3cParser::new(&columns, zone).unwrap();

    // 여러 줄 입력: #Fields 지시자가 이후 행의 레이아웃을 바꿀 수 있음
    for line in content.lines() {
        if let Ok(Some(record)) = parser.parse_line(line) {
            let _ = record.to_document();
        }
    }
});
