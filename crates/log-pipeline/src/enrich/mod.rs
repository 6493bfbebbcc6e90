//! 레코드 보강 모듈 -- GeoIP, User-Agent
//!
//! - [`geo`]: IP 주소를 조직/도시/국가/좌표로 변환 (사설 대역은 조회 생략)
//! - [`user_agent`]: User-Agent 문자열을 평탄한 속성 집합으로 분해
//!
//! 보강 결과는 항상 값이며 실패를 뜻하는 `None`이 없습니다.
//! 조회에 실패한 항목은 결과에서 빠질 뿐입니다.

pub mod geo;
pub mod user_agent;

pub use geo::{CityInfo, EnrichmentResult, GeoEnricher, GeoLookup, KeyCase, MaxMindLookup};
pub use user_agent::UserAgentFlattener;
