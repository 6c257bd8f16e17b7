//! dockwall Docker 어댑터
//!
//! 데몬에서 합성 패스용 인벤토리를 읽고, 네트워크 이벤트를 감시해
//! 디바운스된 재생성 신호를 제어 루프에 전달합니다.
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`DockerSourceError`)
//! - [`config`]: Monitor configuration (`MonitorConfig`, builder)
//! - [`event`]: Network events and subscription filters (`NetworkEvent`, `EventFilter`)
//! - [`docker`]: Docker API abstraction (`InventoryProvider`, `EventSubscriber`, `BollardDockerClient`)
//! - [`inventory`]: One-shot inventory loading (`load_inventory`)
//! - [`debounce`]: Debounce timer and single-slot regeneration channel
//! - [`monitor`]: Reconnecting event monitor (`EventMonitor`)
//!
//! # Architecture
//!
//! ```text
//! Docker events --stream--> EventMonitor
//!                               |
//!                          Debouncer (window)
//!                               |
//!                  RegenerateSignal --mpsc(1)--> control loop
//!                                                    |
//!                                             load_inventory()
//! ```

pub mod config;
pub mod debounce;
pub mod docker;
pub mod error;
pub mod event;
pub mod inventory;
pub mod monitor;

// --- Public API Re-exports ---

// Configuration
pub use config::{MonitorConfig, MonitorConfigBuilder};

// Error
pub use error::DockerSourceError;

// Events
pub use event::{EventFilter, NetworkEvent};

// Docker API
pub use docker::{BollardDockerClient, EventStream, EventSubscriber, InventoryProvider};

// Inventory
pub use inventory::load_inventory;

// Debounce / signalling
pub use debounce::{
    Debouncer, RegenerateReceiver, RegenerateSender, RegenerateSignal, regeneration_channel,
};

// Monitor
pub use monitor::{EventMonitor, MonitorState};
