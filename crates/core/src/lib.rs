//! dockwall 공통 크레이트
//!
//! 다른 모든 크레이트가 공유하는 에러, 설정, 인벤토리 도메인 타입,
//! 메트릭 이름을 정의합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, DockerError, DockwallError};

// 설정
pub use config::DockwallConfig;

// 도메인 타입
pub use types::{ContainerRecord, Inventory, NetworkAttachment, NetworkRecord, PortMapping, Protocol};
