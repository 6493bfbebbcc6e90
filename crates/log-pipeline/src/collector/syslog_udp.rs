//! UDP Syslog 수집기
//!
//! 각 UDP 데이터그램을 하나의 syslog 라인으로 취급합니다.
//! 표준 syslog 포트(514/udp)나 설정된 주소에 바인드합니다.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::info;

use super::{CollectorStatus, Origin, RawLine};
use crate::error::LogPipelineError;

/// UDP Syslog 수집기
pub struct SyslogUdpCollector {
    socket: UdpSocket,
    buf: Vec<u8>,
    status: CollectorStatus,
}

impl SyslogUdpCollector {
    /// 주소에 바인드합니다.
    ///
    /// `max_datagram_size`보다 긴 데이터그램은 잘립니다.
    pub async fn bind(addr: &str, max_datagram_size: usize) -> Result<Self, LogPipelineError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| LogPipelineError::Bind {
                addr: addr.to_owned(),
                reason: e.to_string(),
            })?;
        info!(addr = %socket.local_addr()?, "syslog UDP listener bound");
        Ok(Self {
            socket,
            buf: vec![0u8; max_datagram_size.max(1)],
            status: CollectorStatus::Running,
        })
    }

    /// 다음 데이터그램을 기다립니다.
    ///
    /// 취소 안전합니다. `tokio::select!` 안에서 취소되어도 데이터그램을 잃지 않습니다.
    pub async fn recv(&mut self) -> Result<RawLine, LogPipelineError> {
        match self.socket.recv_from(&mut self.buf).await {
            Ok((len, peer)) => Ok(RawLine::new(
                self.buf[..len].to_vec(),
                Origin::Datagram(peer),
            )),
            Err(e) => {
                self.status = CollectorStatus::Error(e.to_string());
                Err(LogPipelineError::Collector {
                    source_type: "syslog_udp".to_owned(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// 실제 바인드된 주소를 반환합니다 (포트 0 바인드 시 유용).
    pub fn local_addr(&self) -> Result<SocketAddr, LogPipelineError> {
        Ok(self.socket.local_addr()?)
    }

    /// 수집기를 정지 상태로 표시합니다.
    pub fn stop(&mut self) {
        self.status = CollectorStatus::Stopped;
    }

    /// 현재 상태를 반환합니다.
    pub fn status(&self) -> &CollectorStatus {
        &self.status
    }
}
