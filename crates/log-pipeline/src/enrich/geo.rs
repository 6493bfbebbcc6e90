//! GeoIP 보강
//!
//! [`GeoEnricher`]는 IP 문자열 하나를 받아 [`EnrichmentResult`]를 만듭니다.
//! 사설/예약 대역은 데이터베이스를 조회하지 않고 빈 결과를 돌려줍니다.
//!
//! 조회는 두 개의 독립된 데이터베이스로 나뉩니다.
//! - ASN → `ORG`
//! - City → `CITY`, `COUNTRY`, `LOC`
//!
//! 한쪽이 실패해도 다른 쪽 결과는 유지됩니다.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::sync::Arc;

use logvane_core::types::FieldValue;
use maxminddb::{MaxMindDBError, Reader, geoip2};
use tracing::debug;

use crate::error::LogPipelineError;

/// 도시 데이터베이스 조회 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityInfo {
    /// 도시 이름 (영문)
    pub city: Option<String>,
    /// 국가 ISO 코드
    pub country: Option<String>,
    /// 위도/경도
    pub location: Option<(f64, f64)>,
}

/// GeoIP 데이터베이스 조회 trait
///
/// 주소가 데이터베이스에 없으면 `Ok(None)`을 반환합니다.
/// `Err`는 데이터베이스 손상 등 조회 자체의 실패입니다.
pub trait GeoLookup: Send + Sync {
    /// ASN 데이터베이스에서 조직명을 조회합니다.
    fn organization(&self, ip: IpAddr) -> Result<Option<String>, LogPipelineError>;

    /// 도시 데이터베이스에서 위치 정보를 조회합니다.
    fn city(&self, ip: IpAddr) -> Result<Option<CityInfo>, LogPipelineError>;
}

/// MaxMind DB 파일 기반 조회기
pub struct MaxMindLookup {
    asn: Reader<Vec<u8>>,
    city: Reader<Vec<u8>>,
}

impl MaxMindLookup {
    /// ASN/City 데이터베이스 파일을 엽니다.
    pub fn open(asn_path: impl AsRef<Path>, city_path: impl AsRef<Path>) -> Result<Self, LogPipelineError> {
        Ok(Self {
            asn: open_reader(asn_path.as_ref())?,
            city: open_reader(city_path.as_ref())?,
        })
    }
}

fn open_reader(path: &Path) -> Result<Reader<Vec<u8>>, LogPipelineError> {
    Reader::open_readfile(path).map_err(|e| LogPipelineError::ReferenceData {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn lookup_error(db: &str, err: MaxMindDBError) -> LogPipelineError {
    LogPipelineError::ReferenceData {
        path: db.to_owned(),
        reason: err.to_string(),
    }
}

impl GeoLookup for MaxMindLookup {
    fn organization(&self, ip: IpAddr) -> Result<Option<String>, LogPipelineError> {
        match self.asn.lookup::<geoip2::Asn>(ip) {
            Ok(asn) => Ok(asn.autonomous_system_organization.map(str::to_owned)),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(e) => Err(lookup_error("asn", e)),
        }
    }

    fn city(&self, ip: IpAddr) -> Result<Option<CityInfo>, LogPipelineError> {
        let record = match self.city.lookup::<geoip2::City>(ip) {
            Ok(record) => record,
            Err(MaxMindDBError::AddressNotFoundError(_)) => return Ok(None),
            Err(e) => return Err(lookup_error("city", e)),
        };

        let city = record
            .city
            .and_then(|c| c.names)
            .and_then(|names| names.get("en").map(|n| (*n).to_owned()));
        let country = record
            .country
            .and_then(|c| c.iso_code)
            .map(str::to_owned);
        let location = record
            .location
            .and_then(|loc| loc.latitude.zip(loc.longitude));

        Ok(Some(CityInfo {
            city,
            country,
            location,
        }))
    }
}

/// 보강 키 표기
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCase {
    /// `SRC_ORG` 형식 (syslog 계열)
    Upper,
    /// `c_ip_org` 형식 (파일 계열)
    Lower,
}

/// IP 하나에 대한 보강 결과
///
/// 사설 주소나 조회 실패 시 비어 있을 뿐 에러가 아닙니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentResult {
    /// 조직명 (`ORG`)
    pub org: Option<String>,
    /// 도시 (`CITY`)
    pub city: Option<String>,
    /// 국가 (`COUNTRY`)
    pub country: Option<String>,
    /// 좌표 (`LOC`)
    pub location: Option<(f64, f64)>,
}

impl EnrichmentResult {
    /// 빈 결과
    pub fn empty() -> Self {
        Self::default()
    }

    /// 보강된 항목이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.org.is_none() && self.city.is_none() && self.country.is_none() && self.location.is_none()
    }

    /// 접두어를 붙인 필드 목록으로 변환합니다.
    ///
    /// `namespaced("SRC", KeyCase::Upper)` → `SRC_ORG`, `SRC_LOC` ...
    pub fn namespaced(self, prefix: &str, case: KeyCase) -> Vec<(String, FieldValue)> {
        let key = |name: &str| match case {
            KeyCase::Upper => format!("{prefix}_{name}"),
            KeyCase::Lower => format!("{prefix}_{}", name.to_ascii_lowercase()),
        };

        let mut fields = Vec::with_capacity(4);
        if let Some(org) = self.org {
            fields.push((key("ORG"), FieldValue::Text(org)));
        }
        if let Some(city) = self.city {
            fields.push((key("CITY"), FieldValue::Text(city)));
        }
        if let Some(country) = self.country {
            fields.push((key("COUNTRY"), FieldValue::Text(country)));
        }
        if let Some((lat, lon)) = self.location {
            fields.push((key("LOC"), FieldValue::GeoPoint { lat, lon }));
        }
        fields
    }
}

/// GeoIP 보강기
///
/// 조회기가 없으면(설정에서 비활성화) 항상 빈 결과를 반환합니다.
#[derive(Clone)]
pub struct GeoEnricher {
    lookup: Option<Arc<dyn GeoLookup>>,
}

impl GeoEnricher {
    /// 조회기로 보강기를 생성합니다.
    pub fn new(lookup: Arc<dyn GeoLookup>) -> Self {
        Self {
            lookup: Some(lookup),
        }
    }

    /// 아무것도 조회하지 않는 보강기
    pub fn disabled() -> Self {
        Self { lookup: None }
    }

    /// 보강 활성화 여부
    pub fn is_enabled(&self) -> bool {
        self.lookup.is_some()
    }

    /// IP 문자열을 보강합니다.
    pub fn enrich(&self, ip: &str) -> EnrichmentResult {
        let Some(lookup) = &self.lookup else {
            return EnrichmentResult::empty();
        };
        let Ok(addr) = ip.trim().parse::<IpAddr>() else {
            debug!(ip, "skipping geo enrichment for unparseable address");
            return EnrichmentResult::empty();
        };
        if is_non_routable(&addr) {
            return EnrichmentResult::empty();
        }

        let mut result = EnrichmentResult::empty();

        match lookup.organization(addr) {
            Ok(org) => result.org = org,
            Err(e) => debug!(ip, error = %e, "asn lookup failed"),
        }

        match lookup.city(addr) {
            Ok(Some(info)) => {
                result.city = info.city;
                result.country = info.country;
                result.location = info.location;
            }
            Ok(None) => {}
            Err(e) => debug!(ip, error = %e, "city lookup failed"),
        }

        result
    }
}

impl std::fmt::Debug for GeoEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoEnricher")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// 공인 조회 대상이 아닌 주소인지 판별합니다.
pub fn is_non_routable(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_non_routable_v4(v4),
        IpAddr::V6(v6) => is_non_routable_v6(v6),
    }
}

fn is_non_routable_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        // 0.0.0.0/8
        || a == 0
        // 100.64.0.0/10 (CGNAT)
        || (a == 100 && (b & 0xc0) == 64)
        // 192.0.0.0/24 (IETF 프로토콜 할당)
        || (a == 192 && b == 0 && c == 0)
        // 198.18.0.0/15 (벤치마크)
        || (a == 198 && (b & 0xfe) == 18)
        // 240.0.0.0/4 (예약)
        || a >= 240
}

fn is_non_routable_v6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_non_routable_v4(&v4);
    }
    let segments = ip.segments();
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || ip.is_unique_local()
        || ip.is_unicast_link_local()
        // 2001:db8::/32 (문서용)
        || (segments[0] == 0x2001 && segments[1] == 0x0db8)
}
