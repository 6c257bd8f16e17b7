//! 통합 테스트 -- 모니터 → 디바운스 → 재생성 신호 플로우 검증
//!
//! 이벤트 스트림을 채널로 구동하고 tokio 가상 시간으로 타이밍을 검사합니다.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dockwall_core::types::{ContainerRecord, NetworkRecord};
use dockwall_docker::{
    DockerSourceError, EventFilter, EventMonitor, MonitorConfigBuilder, NetworkEvent,
    RegenerateSignal, load_inventory, regeneration_channel,
};
use futures_util::StreamExt;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

type EventSender = mpsc::UnboundedSender<Result<NetworkEvent, DockerSourceError>>;
type EventReceiver = mpsc::UnboundedReceiver<Result<NetworkEvent, DockerSourceError>>;

mod mock {
    use super::*;
    use dockwall_docker::{EventStream, EventSubscriber, InventoryProvider};

    /// 구독마다 미리 준비된 채널 하나를 스트림으로 돌려주는 테스트 클라이언트
    pub struct TestDockerClient {
        sessions: Arc<Mutex<VecDeque<EventReceiver>>>,
        filters: Arc<Mutex<Vec<EventFilter>>>,
        networks: Arc<Mutex<Vec<NetworkRecord>>>,
        reachable: Arc<Mutex<bool>>,
    }

    impl TestDockerClient {
        pub fn new() -> Self {
            Self {
                sessions: Arc::new(Mutex::new(VecDeque::new())),
                filters: Arc::new(Mutex::new(Vec::new())),
                networks: Arc::new(Mutex::new(Vec::new())),
                reachable: Arc::new(Mutex::new(true)),
            }
        }

        /// 새 세션을 등록하고 그 이벤트 송신측을 돌려줍니다.
        pub async fn add_session(&self) -> EventSender {
            let (tx, rx) = mpsc::unbounded_channel();
            self.sessions.lock().await.push_back(rx);
            tx
        }

        pub async fn add_network(&self, network: NetworkRecord) {
            self.networks.lock().await.push(network);
        }

        pub async fn set_reachable(&self, reachable: bool) {
            *self.reachable.lock().await = reachable;
        }

        pub async fn subscriptions(&self) -> Vec<EventFilter> {
            self.filters.lock().await.clone()
        }

        async fn check_reachable(&self) -> Result<(), DockerSourceError> {
            if *self.reachable.lock().await {
                Ok(())
            } else {
                Err(DockerSourceError::DockerConnection(
                    "connection refused".to_owned(),
                ))
            }
        }
    }

    impl InventoryProvider for TestDockerClient {
        async fn ping(&self) -> Result<(), DockerSourceError> {
            self.check_reachable().await
        }

        async fn list_networks(&self) -> Result<Vec<NetworkRecord>, DockerSourceError> {
            Ok(self.networks.lock().await.clone())
        }

        async fn list_containers(&self) -> Result<Vec<ContainerRecord>, DockerSourceError> {
            Ok(Vec::new())
        }
    }

    impl EventSubscriber for TestDockerClient {
        async fn ping(&self) -> Result<(), DockerSourceError> {
            self.check_reachable().await
        }

        async fn subscribe(&self, filter: &EventFilter) -> Result<EventStream, DockerSourceError> {
            self.filters.lock().await.push(filter.clone());
            let rx = self
                .sessions
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| DockerSourceError::EventStream("no session".to_owned()))?;

            let stream = futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });
            Ok(stream.boxed())
        }
    }
}

use mock::TestDockerClient;

const WINDOW: Duration = Duration::from_millis(100);
const RETRY: Duration = Duration::from_millis(1000);

fn monitor(
    client: &Arc<TestDockerClient>,
) -> (
    EventMonitor<TestDockerClient>,
    dockwall_docker::RegenerateReceiver,
) {
    let config = MonitorConfigBuilder::new()
        .debounce(WINDOW)
        .retry_delay(RETRY)
        .build()
        .unwrap();
    let (tx, rx) = regeneration_channel();
    (EventMonitor::new(Arc::clone(client), config, tx), rx)
}

fn connect(container: &str) -> Result<NetworkEvent, DockerSourceError> {
    let mut event = NetworkEvent::new("connect", "n1");
    event.container_id = Some(container.to_owned());
    Ok(event)
}

#[tokio::test(start_paused = true)]
async fn subscribes_to_network_events_only() {
    let client = Arc::new(TestDockerClient::new());
    let _events = client.add_session().await;
    let (monitor, _rx) = monitor(&client);
    let _handle = tokio::spawn(monitor.run());

    tokio::time::sleep(Duration::from_millis(1)).await;
    let filters = client.subscriptions().await;
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].values("type"), ["network"]);
}

#[tokio::test(start_paused = true)]
async fn unconsumed_signal_stalls_the_monitor() {
    let client = Arc::new(TestDockerClient::new());
    let events = client.add_session().await;
    let (monitor, mut rx) = monitor(&client);
    let _handle = tokio::spawn(monitor.run());

    // 첫 신호는 채널 슬롯에 들어가고 소비되지 않음
    events.send(connect("a")).unwrap();
    tokio::time::sleep(WINDOW * 2).await;

    // 두 번째 신호는 슬롯이 빌 때까지 대기
    events.send(connect("b")).unwrap();
    tokio::time::sleep(WINDOW * 2).await;

    // 대기 중에 온 이벤트는 읽히지 않은 채 남음
    events.send(connect("c")).unwrap();
    tokio::time::sleep(WINDOW * 5).await;

    assert_eq!(rx.try_recv(), Some(RegenerateSignal { events: 1 }));
    assert_eq!(rx.try_recv(), None);

    let second = rx.recv().await;
    assert_eq!(second, Some(RegenerateSignal { events: 1 }));

    let released = Instant::now();
    let third = rx.recv().await;
    assert_eq!(third, Some(RegenerateSignal { events: 1 }));
    assert_eq!(released.elapsed(), WINDOW);
}

#[tokio::test(start_paused = true)]
async fn recovers_after_daemon_restart() {
    let client = Arc::new(TestDockerClient::new());
    let first = client.add_session().await;
    let second = client.add_session().await;
    let (monitor, mut rx) = monitor(&client);
    let _handle = tokio::spawn(monitor.run());

    // 데몬 재시작: 스트림 종료 후 한동안 접속 불가
    first.send(connect("a")).unwrap();
    drop(first);
    client.set_reachable(false).await;

    assert_eq!(rx.recv().await, Some(RegenerateSignal { events: 1 }));

    tokio::time::sleep(RETRY * 3).await;
    assert_eq!(client.subscriptions().await.len(), 1);

    client.set_reachable(true).await;
    tokio::time::sleep(RETRY * 2).await;
    assert_eq!(client.subscriptions().await.len(), 2);

    second.send(connect("b")).unwrap();
    second.send(connect("c")).unwrap();
    assert_eq!(rx.recv().await, Some(RegenerateSignal { events: 2 }));
}

#[tokio::test(start_paused = true)]
async fn control_loop_shutdown_stops_monitor() {
    let client = Arc::new(TestDockerClient::new());
    client.set_reachable(false).await;
    let (monitor, rx) = monitor(&client);
    let handle = tokio::spawn(monitor.run());

    tokio::time::sleep(RETRY / 2).await;
    drop(rx);

    let result = tokio::time::timeout(RETRY * 2, handle).await;
    assert!(result.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn load_inventory_uses_provider() {
    let client = TestDockerClient::new();
    client
        .add_network(NetworkRecord {
            id: "n1".to_owned(),
            name: "frontend".to_owned(),
            driver: "bridge".to_owned(),
            interface_name: "br-n1".to_owned(),
            nat_ipv4: true,
            nat_subnets: vec!["172.18.0.0/16".parse().unwrap()],
        })
        .await;

    let inventory = load_inventory(&client).await.unwrap();
    assert_eq!(inventory.networks.len(), 1);
    assert_eq!(inventory.nat_network_count(), 1);

    client.set_reachable(false).await;
    let err = load_inventory(&client).await.unwrap_err();
    assert!(matches!(err, DockerSourceError::DockerConnection(_)));
}
