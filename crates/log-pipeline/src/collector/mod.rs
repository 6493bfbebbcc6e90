//! 로그 수집 모듈 -- 원시 라인을 수집합니다.
//!
//! # 수집 소스
//! - [`SyslogUdpCollector`]: UDP syslog 수신 (데이터그램 하나가 라인 하나)
//! - [`FileTailer`]: 로테이션된 `u_ex<YYMMDD>.log` 파일을 체크포인트부터 순차 읽기
//!
//! # 처리 모델
//! 수집기는 채널 없이 호출자가 한 건씩 끌어가는 방식입니다.
//! 다음 라인은 이전 라인 처리가 끝난 뒤에 읽히므로 느린 저장소 쓰기가 그대로 배압이 됩니다.

pub mod file;
pub mod syslog_udp;

pub use file::{FileTailer, RotatedFile, TailEvent, list_rotated_files, rotated_file_date};
pub use syslog_udp::SyslogUdpCollector;

use std::borrow::Cow;
use std::net::SocketAddr;

use bytes::Bytes;

/// 원시 라인의 도착 맥락
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// UDP 데이터그램 (송신자 주소)
    Datagram(SocketAddr),
    /// 파일 라인 (파일명, 라인 직후 바이트 오프셋)
    File {
        /// 파일명 (디렉토리 제외)
        name: String,
        /// 이 라인을 읽은 직후의 바이트 오프셋
        offset: u64,
    },
}

/// 수집된 원시 라인
///
/// 수집기가 생성하고 파서가 한 번 소비합니다.
#[derive(Debug, Clone)]
pub struct RawLine {
    /// 원시 바이트 (줄바꿈 포함 가능)
    pub data: Bytes,
    /// 도착 맥락
    pub origin: Origin,
}

impl RawLine {
    /// 새 RawLine을 생성합니다.
    pub fn new(data: impl Into<Bytes>, origin: Origin) -> Self {
        Self {
            data: data.into(),
            origin,
        }
    }

    /// 바이트를 텍스트로 해석합니다 (잘못된 UTF-8은 대체 문자로).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// 수집기 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorStatus {
    /// 실행 중
    Running,
    /// 에러로 중단됨
    Error(String),
    /// 정상 종료됨
    Stopped,
}
