//! 도메인 타입 -- 컨테이너 호스트의 네트워크 인벤토리
//!
//! Docker 어댑터가 수집한 네트워크/컨테이너 정보를 규칙 생성기가
//! 소비할 수 있는 형태로 정규화한 타입들입니다.
//!
//! [`Inventory::new`]는 모든 목록을 안정적인 식별자 순으로 정렬합니다.
//! 실제 토폴로지가 바뀌지 않았다면 생성되는 규칙 스크립트도
//! 바이트 단위로 동일해야 하므로, 정렬은 생성기가 아니라 여기서 한 번만 수행합니다.

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

/// 전송 계층 프로토콜
///
/// 선언 순서(`Sctp < Tcp < Udp`)는 프로토콜 이름의 사전순과 같습니다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Sctp,
    Tcp,
    Udp,
}

impl Protocol {
    /// iptables `-p` / `-m` 인자에 쓰이는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sctp => "sctp",
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sctp" => Ok(Self::Sctp),
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            other => Err(format!("unsupported protocol: {other}")),
        }
    }
}

/// 게시된(published) 컨테이너 포트 하나
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMapping {
    /// 호스트에서 노출되는 포트
    pub public_port: u16,
    /// 컨테이너 내부 포트
    pub private_port: u16,
    /// 프로토콜
    pub protocol: Protocol,
}

impl PortMapping {
    fn sort_key(&self) -> (u16, Protocol, u16) {
        (self.public_port, self.protocol, self.private_port)
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}/{}",
            self.public_port, self.private_port, self.protocol
        )
    }
}

/// Docker 네트워크 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecord {
    /// 네트워크 ID
    pub id: String,
    /// 네트워크 이름
    pub name: String,
    /// 드라이버 (bridge, host, overlay 등)
    pub driver: String,
    /// 호스트 측 브리지 인터페이스 이름 (bridge 드라이버가 아니면 빈 문자열)
    pub interface_name: String,
    /// IPv4 NAT 대상 여부 (bridge 드라이버 + default IPAM)
    pub nat_ipv4: bool,
    /// NAT 대상 IPv4 서브넷
    pub nat_subnets: Vec<Ipv4Network>,
}

/// 컨테이너가 연결된 네트워크와 그 네트워크에서 할당받은 주소
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    /// 네트워크 ID
    pub network_id: String,
    /// 할당된 IPv4 주소
    pub ip_address: Ipv4Addr,
}

/// 실행 중인 컨테이너 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// 컨테이너 ID
    pub id: String,
    /// 컨테이너 이름 (선행 `/` 제거)
    pub name: String,
    /// 게시된 포트 목록
    pub ports: Vec<PortMapping>,
    /// 네트워크 연결 목록
    pub networks: Vec<NetworkAttachment>,
}

/// 한 번의 규칙 생성 패스가 사용하는 인벤토리 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// ID 순으로 정렬된 네트워크
    pub networks: Vec<NetworkRecord>,
    /// ID 순으로 정렬된 컨테이너
    pub containers: Vec<ContainerRecord>,
}

impl Inventory {
    /// 입력 순서와 무관하게 정렬된 인벤토리를 만듭니다.
    ///
    /// - 네트워크, 컨테이너: ID 순
    /// - 컨테이너의 포트: 공개 포트, 프로토콜, 내부 포트 순 (완전히 같은 항목은 제거)
    /// - 컨테이너의 네트워크 연결: 네트워크 ID 순
    pub fn new(mut networks: Vec<NetworkRecord>, mut containers: Vec<ContainerRecord>) -> Self {
        networks.sort_by(|a, b| a.id.cmp(&b.id));
        containers.sort_by(|a, b| a.id.cmp(&b.id));

        for container in &mut containers {
            container.ports.sort_by_key(PortMapping::sort_key);
            container.ports.dedup();
            container
                .networks
                .sort_by(|a, b| a.network_id.cmp(&b.network_id));
        }

        Self {
            networks,
            containers,
        }
    }

    /// 네트워크 ID로 레코드를 찾는 인덱스를 만듭니다.
    pub fn networks_by_id(&self) -> HashMap<&str, &NetworkRecord> {
        self.networks.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    /// NAT 대상 네트워크 수
    pub fn nat_network_count(&self) -> usize {
        self.networks.iter().filter(|n| n.nat_ipv4).count()
    }
}
