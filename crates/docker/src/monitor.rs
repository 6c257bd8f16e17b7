//! 네트워크 이벤트 모니터 -- 이벤트를 디바운스하여 재생성 신호로 변환
//!
//! [`EventMonitor`]는 데몬의 네트워크 이벤트 스트림을 구독하고,
//! 이벤트가 디바운스 창 동안 잠잠해지면 제어 루프에 신호를 한 번 보냅니다.
//!
//! # 상태 전이
//!
//! ```text
//! Disconnected ──(ping + subscribe 성공)──▶ Connected
//!      ▲                                        │
//!      └──(스트림 에러/종료, retry_delay 대기)───┘
//! ```
//!
//! 연결이 끊길 때 대기 중인 디바운스가 있으면 재시도 대기 전에 먼저 신호를 보냅니다.
//! 제어 루프가 수신측을 drop하면 [`EventMonitor::run`]이 종료됩니다.

use std::fmt;
use std::sync::Arc;

use dockwall_core::metrics as m;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::debounce::{Debouncer, RegenerateSender, RegenerateSignal};
use crate::docker::EventSubscriber;
use crate::error::DockerSourceError;
use crate::event::EventFilter;

/// 모니터 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Disconnected,
    Connected,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// 세션이 끝난 이유
enum SessionEnd {
    /// 연결 실패 또는 스트림 에러/종료
    Disconnected,
    /// 제어 루프가 수신측을 drop함
    ReceiverDropped,
}

/// Docker 네트워크 이벤트 모니터
pub struct EventMonitor<S: EventSubscriber> {
    subscriber: Arc<S>,
    config: MonitorConfig,
    filter: EventFilter,
    sender: RegenerateSender,
    state: MonitorState,
    /// 마지막 신호 이후 합쳐진 이벤트 수
    pending_events: usize,
}

impl<S: EventSubscriber> EventMonitor<S> {
    pub fn new(subscriber: Arc<S>, config: MonitorConfig, sender: RegenerateSender) -> Self {
        Self {
            subscriber,
            config,
            filter: EventFilter::networks(),
            sender,
            state: MonitorState::Disconnected,
            pending_events: 0,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// 모니터 루프를 실행합니다.
    ///
    /// 연결 실패는 에러로 반환하지 않고 `retry_delay` 간격으로 무한 재시도합니다.
    /// 수신측이 drop되면 `Ok(())`로 종료합니다.
    pub async fn run(mut self) -> Result<(), DockerSourceError> {
        let mut debouncer = Debouncer::new(self.config.debounce());

        info!(
            debounce_ms = self.config.debounce_ms,
            retry_delay_ms = self.config.retry_delay_ms,
            "starting network event monitor"
        );

        loop {
            if let SessionEnd::ReceiverDropped = self.session(&mut debouncer).await {
                break;
            }

            self.set_state(MonitorState::Disconnected);

            if debouncer.is_armed() {
                debouncer.expired().await;
                if !self.fire().await {
                    break;
                }
            }

            info!(delay_ms = self.config.retry_delay_ms, "retrying docker connection");
            tokio::select! {
                () = tokio::time::sleep(self.config.retry_delay()) => {}
                () = self.sender.closed() => break,
            }
            metrics::counter!(m::MONITOR_RECONNECTS_TOTAL).increment(1);
        }

        self.set_state(MonitorState::Disconnected);
        info!("regeneration receiver dropped, stopping network event monitor");
        Ok(())
    }

    /// 한 번의 연결 세션: ping, 구독, 스트림 소비.
    async fn session(&mut self, debouncer: &mut Debouncer) -> SessionEnd {
        if let Err(e) = self.subscriber.ping().await {
            warn!(error = %e, "docker daemon not reachable");
            return SessionEnd::Disconnected;
        }

        let mut stream = match self.subscriber.subscribe(&self.filter).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "failed to subscribe to docker events");
                return SessionEnd::Disconnected;
            }
        };

        self.set_state(MonitorState::Connected);
        info!("monitoring network events");

        loop {
            tokio::select! {
                item = stream.next() => match item {
                    Some(Ok(event)) => {
                        debug!(event = %event, "network event received");
                        metrics::counter!(m::MONITOR_EVENTS_TOTAL).increment(1);
                        self.pending_events += 1;
                        debouncer.arm();
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "docker event stream failed");
                        return SessionEnd::Disconnected;
                    }
                    None => {
                        warn!("docker event stream closed");
                        return SessionEnd::Disconnected;
                    }
                },
                () = debouncer.expired() => {
                    if !self.fire().await {
                        return SessionEnd::ReceiverDropped;
                    }
                }
                () = self.sender.closed() => return SessionEnd::ReceiverDropped,
            }
        }
    }

    /// 재생성 신호를 보냅니다. 수신측이 사라졌으면 `false`.
    async fn fire(&mut self) -> bool {
        let signal = RegenerateSignal {
            events: std::mem::take(&mut self.pending_events),
        };
        debug!(events = signal.events, "debounce window elapsed, requesting regeneration");

        match self.sender.notify(signal).await {
            Ok(()) => {
                metrics::counter!(m::MONITOR_SIGNALS_TOTAL).increment(1);
                true
            }
            Err(_) => false,
        }
    }

    fn set_state(&mut self, state: MonitorState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "monitor state changed");
        }
        self.state = state;
        let connected = if state == MonitorState::Connected { 1.0 } else { 0.0 };
        metrics::gauge!(m::MONITOR_CONNECTED).set(connected);
    }
}
