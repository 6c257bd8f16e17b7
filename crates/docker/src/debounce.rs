//! 디바운스 타이머와 재생성 신호 채널
//!
//! [`Debouncer`]는 이벤트가 올 때마다 마감 시각을 창(window)만큼 뒤로 미룹니다.
//! 마감이 지나면 모니터가 [`RegenerateSender::notify`]로 신호를 한 번 보냅니다.
//!
//! 신호 채널의 용량은 1입니다. 제어 루프가 아직 가져가지 않은 신호가 있으면
//! `notify`는 빈 자리가 날 때까지 대기하고, 그동안 모니터는 이벤트를 읽지 않습니다.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::DockerSourceError;

/// 트레일링 엣지 디바운스 타이머
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// 마감 시각을 지금부터 `window` 뒤로 (재)설정합니다.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// 마감 시각이 지나면 완료되고 타이머를 해제합니다.
    ///
    /// 설정되지 않은 상태에서는 영원히 대기하므로 `select!` 분기로 사용할 수 있습니다.
    /// 완료 전에 drop되면 마감 시각은 그대로 유지됩니다.
    pub async fn expired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}

/// 재생성 요청 신호
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegenerateSignal {
    /// 이 신호로 합쳐진 이벤트 수
    pub events: usize,
}

/// 모니터 → 제어 루프 방향 신호 송신측
#[derive(Debug, Clone)]
pub struct RegenerateSender {
    tx: mpsc::Sender<RegenerateSignal>,
}

impl RegenerateSender {
    /// 신호를 보냅니다. 앞선 신호가 소비되지 않았으면 소비될 때까지 대기합니다.
    ///
    /// # Errors
    ///
    /// 수신측이 drop되었으면 `DockerSourceError::Channel`을 반환합니다.
    pub async fn notify(&self, signal: RegenerateSignal) -> Result<(), DockerSourceError> {
        self.tx
            .send(signal)
            .await
            .map_err(|_| DockerSourceError::Channel("regeneration receiver dropped".to_owned()))
    }

    /// 수신측이 drop되면 완료됩니다.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }
}

/// 제어 루프가 소유하는 신호 수신측
#[derive(Debug)]
pub struct RegenerateReceiver {
    rx: mpsc::Receiver<RegenerateSignal>,
}

impl RegenerateReceiver {
    /// 다음 신호를 기다립니다. 모든 송신측이 사라지면 `None`.
    pub async fn recv(&mut self) -> Option<RegenerateSignal> {
        self.rx.recv().await
    }

    /// 대기 중인 신호가 있으면 즉시 가져옵니다.
    pub fn try_recv(&mut self) -> Option<RegenerateSignal> {
        self.rx.try_recv().ok()
    }
}

/// 용량 1의 재생성 신호 채널을 만듭니다.
pub fn regeneration_channel() -> (RegenerateSender, RegenerateReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (RegenerateSender { tx }, RegenerateReceiver { rx })
}
