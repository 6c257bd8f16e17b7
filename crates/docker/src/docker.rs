//! Docker API abstraction for testability.
//!
//! Two narrow capability traits sit between dockwall and the daemon:
//!
//! - [`InventoryProvider`]: lists networks and running containers for one synthesis pass
//! - [`EventSubscriber`]: opens a filtered event stream for the monitor
//!
//! [`BollardDockerClient`] implements both against the real daemon; tests use
//! `MockDockerClient` (unit tests) or their own implementations (integration tests).
//!
//! # Architecture
//!
//! ```text
//!  control loop          EventMonitor
//!       │                     │
//!       ▼                     ▼
//! ┌─────────────────┐  ┌───────────────┐
//! │InventoryProvider│  │EventSubscriber│ (traits)
//! └─────────────────┘  └───────────────┘
//!          │                  │
//!          ▼                  ▼
//!        ┌──────────────────────┐
//!        │ BollardDockerClient  │
//!        └──────────┬───────────┘
//!                   ▼
//!             Docker Daemon
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::pin::Pin;
use std::sync::Arc;

use bollard::models::{ContainerSummary, EventMessage, Network, Port, PortTypeEnum};
use dockwall_core::types::{
    ContainerRecord, NetworkAttachment, NetworkRecord, PortMapping, Protocol,
};
use futures_util::{Stream, StreamExt};
use ipnetwork::Ipv4Network;

use crate::config::MonitorConfig;
use crate::error::DockerSourceError;
use crate::event::{EventFilter, NetworkEvent};

/// Network option naming the host bridge interface.
pub const BRIDGE_NAME_OPTION: &str = "com.docker.network.bridge.name";

/// Stream of network events (or stream errors) from one subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<NetworkEvent, DockerSourceError>> + Send>>;

/// Supplies the raw inventory for one synthesis pass.
///
/// Any failure is a hard error for that pass; there are no retries here.
pub trait InventoryProvider: Send + Sync + 'static {
    /// Checks daemon connectivity.
    ///
    /// # Errors
    ///
    /// Returns `DockerSourceError::DockerConnection` if the daemon is unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), DockerSourceError>> + Send;

    /// Lists all networks, converted to [`NetworkRecord`]s.
    fn list_networks(
        &self,
    ) -> impl Future<Output = Result<Vec<NetworkRecord>, DockerSourceError>> + Send;

    /// Lists running containers, converted to [`ContainerRecord`]s.
    fn list_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerRecord>, DockerSourceError>> + Send;
}

/// Opens event subscriptions for the monitor.
pub trait EventSubscriber: Send + Sync + 'static {
    /// Checks daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), DockerSourceError>> + Send;

    /// Subscribes to daemon events matching `filter`.
    ///
    /// The returned stream ends or yields an error when the connection drops.
    fn subscribe(
        &self,
        filter: &EventFilter,
    ) -> impl Future<Output = Result<EventStream, DockerSourceError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Internally uses `Arc<bollard::Docker>` so clones share one connection pool.
#[derive(Clone)]
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects using the socket from `config`, or the local defaults
    /// (`DOCKER_HOST`, then `/var/run/docker.sock`) when it is empty.
    pub fn connect(config: &MonitorConfig) -> Result<Self, DockerSourceError> {
        if config.socket.is_empty() {
            Self::connect_local()
        } else {
            Self::connect_with_socket(&config.socket)
        }
    }

    /// Connects to Docker using the default local socket.
    ///
    /// # Errors
    ///
    /// Returns `DockerSourceError::DockerConnection` if the client cannot be created.
    pub fn connect_local() -> Result<Self, DockerSourceError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            DockerSourceError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker using a specific socket path.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, DockerSourceError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    DockerSourceError::DockerConnection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    async fn ping_daemon(&self) -> Result<(), DockerSourceError> {
        self.docker
            .ping()
            .await
            .map_err(|e| DockerSourceError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

impl InventoryProvider for BollardDockerClient {
    async fn ping(&self) -> Result<(), DockerSourceError> {
        self.ping_daemon().await
    }

    async fn list_networks(&self) -> Result<Vec<NetworkRecord>, DockerSourceError> {
        use bollard::network::ListNetworksOptions;

        let networks = self
            .docker
            .list_networks(None::<ListNetworksOptions<String>>)
            .await
            .map_err(|e| DockerSourceError::DockerApi(format!("list networks failed: {e}")))?;

        Ok(networks.into_iter().filter_map(network_from_model).collect())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, DockerSourceError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| DockerSourceError::DockerApi(format!("list containers failed: {e}")))?;

        Ok(containers
            .into_iter()
            .filter_map(container_from_summary)
            .collect())
    }
}

impl EventSubscriber for BollardDockerClient {
    async fn ping(&self) -> Result<(), DockerSourceError> {
        self.ping_daemon().await
    }

    async fn subscribe(&self, filter: &EventFilter) -> Result<EventStream, DockerSourceError> {
        use bollard::system::EventsOptions;

        let options = EventsOptions::<String> {
            filters: filter.to_filters(),
            ..Default::default()
        };

        let stream = self.docker.events(Some(options)).map(|item| match item {
            Ok(message) => Ok(event_from_message(message)),
            Err(e) => Err(DockerSourceError::EventStream(e.to_string())),
        });

        Ok(stream.boxed())
    }
}

/// Converts a daemon network model into a [`NetworkRecord`].
///
/// Only bridge networks get an interface name; they are NAT-eligible when the
/// IPAM driver is `default`, and only their IPv4 subnets are kept.
/// Networks without an ID are dropped.
pub fn network_from_model(network: Network) -> Option<NetworkRecord> {
    let id = network.id.filter(|id| !id.is_empty())?;
    let name = network.name.unwrap_or_default();
    let driver = network.driver.unwrap_or_default();

    let mut interface_name = String::new();
    let mut nat_ipv4 = false;
    let mut nat_subnets = Vec::new();

    if driver == "bridge" {
        interface_name = bridge_interface_name(&id, network.options.as_ref());

        if let Some(ipam) = network.ipam {
            if ipam.driver.as_deref() == Some("default") {
                nat_ipv4 = true;
                nat_subnets = ipam
                    .config
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|config| config.subnet)
                    .filter_map(|subnet| subnet.parse::<Ipv4Network>().ok())
                    .collect();
            }
        }
    }

    Some(NetworkRecord {
        id,
        name,
        driver,
        interface_name,
        nat_ipv4,
        nat_subnets,
    })
}

/// Host interface of a bridge network: the explicit bridge name option,
/// else `br-` followed by the first 12 characters of the ID.
pub fn bridge_interface_name(id: &str, options: Option<&HashMap<String, String>>) -> String {
    match options.and_then(|o| o.get(BRIDGE_NAME_OPTION)) {
        Some(name) if !name.is_empty() => name.clone(),
        _ => format!("br-{}", id.chars().take(12).collect::<String>()),
    }
}

/// Converts a container summary into a [`ContainerRecord`].
///
/// Ports without a public port and IPv6 host bindings are skipped, as are
/// network attachments without an IPv4 address.
pub fn container_from_summary(summary: ContainerSummary) -> Option<ContainerRecord> {
    let id = summary.id.filter(|id| !id.is_empty())?;
    let name = summary
        .names
        .unwrap_or_default()
        .first()
        .map(|n| n.trim_start_matches('/').to_owned())
        .unwrap_or_default();

    let ports = summary
        .ports
        .unwrap_or_default()
        .into_iter()
        .filter_map(port_mapping)
        .collect();

    let networks = summary
        .network_settings
        .and_then(|settings| settings.networks)
        .unwrap_or_default()
        .into_values()
        .filter_map(|endpoint| {
            let network_id = endpoint.network_id.filter(|id| !id.is_empty())?;
            let ip_address = endpoint.ip_address?.parse::<Ipv4Addr>().ok()?;
            Some(NetworkAttachment {
                network_id,
                ip_address,
            })
        })
        .collect();

    Some(ContainerRecord {
        id,
        name,
        ports,
        networks,
    })
}

fn port_mapping(port: Port) -> Option<PortMapping> {
    let public_port = port.public_port.filter(|p| *p != 0)?;

    if port
        .ip
        .as_deref()
        .is_some_and(|ip| ip.parse::<Ipv6Addr>().is_ok())
    {
        return None;
    }

    let protocol = match port.typ {
        Some(PortTypeEnum::UDP) => Protocol::Udp,
        Some(PortTypeEnum::SCTP) => Protocol::Sctp,
        _ => Protocol::Tcp,
    };

    Some(PortMapping {
        public_port,
        private_port: port.private_port,
        protocol,
    })
}

fn event_from_message(message: EventMessage) -> NetworkEvent {
    let actor = message.actor.unwrap_or_default();
    let mut attributes = actor.attributes.unwrap_or_default();

    NetworkEvent {
        action: message.action.unwrap_or_default(),
        network_id: actor.id.unwrap_or_default(),
        network_name: attributes.remove("name"),
        container_id: attributes.remove("container"),
        time: message.time.unwrap_or_default(),
    }
}

/// 테스트용 Mock Docker 클라이언트
///
/// 인벤토리는 고정값을 반환하고, 이벤트 구독은 미리 등록한 채널을
/// 순서대로 하나씩 스트림으로 돌려줍니다. 채널 송신측을 drop하면 스트림이 끝납니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    pub networks: Vec<NetworkRecord>,
    pub containers: Vec<ContainerRecord>,
    pub fail_listing: bool,
    ping_failures: std::sync::atomic::AtomicUsize,
    sessions: std::sync::Mutex<
        std::collections::VecDeque<
            tokio::sync::mpsc::UnboundedReceiver<Result<NetworkEvent, DockerSourceError>>,
        >,
    >,
    subscribe_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockDockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_networks(mut self, networks: Vec<NetworkRecord>) -> Self {
        self.networks = networks;
        self
    }

    pub fn with_containers(mut self, containers: Vec<ContainerRecord>) -> Self {
        self.containers = containers;
        self
    }

    /// 목록 조회가 실패하도록 설정합니다.
    pub fn with_failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// 처음 `count`번의 ping이 실패하도록 설정합니다.
    pub fn with_ping_failures(self, count: usize) -> Self {
        self.ping_failures
            .store(count, std::sync::atomic::Ordering::SeqCst);
        self
    }

    /// 다음 구독에 돌려줄 이벤트 채널을 추가합니다.
    pub fn with_session(
        self,
        rx: tokio::sync::mpsc::UnboundedReceiver<Result<NetworkEvent, DockerSourceError>>,
    ) -> Self {
        self.sessions.lock().unwrap().push_back(rx);
        self
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    fn take_ping_failure(&self) -> bool {
        use std::sync::atomic::Ordering;
        self.ping_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[cfg(test)]
impl InventoryProvider for MockDockerClient {
    async fn ping(&self) -> Result<(), DockerSourceError> {
        if self.take_ping_failure() {
            return Err(DockerSourceError::DockerConnection("mock unreachable".to_owned()));
        }
        Ok(())
    }

    async fn list_networks(&self) -> Result<Vec<NetworkRecord>, DockerSourceError> {
        if self.fail_listing {
            return Err(DockerSourceError::DockerApi("mock failure".to_owned()));
        }
        Ok(self.networks.clone())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, DockerSourceError> {
        if self.fail_listing {
            return Err(DockerSourceError::DockerApi("mock failure".to_owned()));
        }
        Ok(self.containers.clone())
    }
}

#[cfg(test)]
impl EventSubscriber for MockDockerClient {
    async fn ping(&self) -> Result<(), DockerSourceError> {
        InventoryProvider::ping(self).await
    }

    async fn subscribe(&self, _filter: &EventFilter) -> Result<EventStream, DockerSourceError> {
        self.subscribe_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let rx = self
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DockerSourceError::EventStream("no mock session left".to_owned()))?;

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{
        ContainerSummaryNetworkSettings, EndpointSettings, EventActor, Ipam, IpamConfig,
    };

    fn bridge_model(id: &str, ipam_driver: &str, subnets: &[&str]) -> Network {
        Network {
            id: Some(id.to_owned()),
            name: Some("frontend".to_owned()),
            driver: Some("bridge".to_owned()),
            ipam: Some(Ipam {
                driver: Some(ipam_driver.to_owned()),
                config: Some(
                    subnets
                        .iter()
                        .map(|s| IpamConfig {
                            subnet: Some((*s).to_owned()),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn bridge_network_derives_interface_from_id() {
        let record =
            network_from_model(bridge_model("0123456789abcdef", "default", &["172.18.0.0/16"]))
                .unwrap();
        assert_eq!(record.interface_name, "br-0123456789ab");
        assert!(record.nat_ipv4);
        assert_eq!(record.nat_subnets.len(), 1);
        assert_eq!(record.nat_subnets[0].to_string(), "172.18.0.0/16");
    }

    #[test]
    fn bridge_name_option_wins() {
        let mut model = bridge_model("0123456789abcdef", "default", &["172.17.0.0/16"]);
        model.options = Some(HashMap::from([(
            BRIDGE_NAME_OPTION.to_owned(),
            "docker0".to_owned(),
        )]));
        let record = network_from_model(model).unwrap();
        assert_eq!(record.interface_name, "docker0");
    }

    #[test]
    fn ipv6_subnets_are_dropped() {
        let record = network_from_model(bridge_model(
            "abc",
            "default",
            &["fd00::/64", "10.10.0.0/24"],
        ))
        .unwrap();
        assert_eq!(record.nat_subnets.len(), 1);
        assert_eq!(record.nat_subnets[0].to_string(), "10.10.0.0/24");
    }

    #[test]
    fn non_default_ipam_is_not_nat_eligible() {
        let record =
            network_from_model(bridge_model("abc", "custom", &["10.0.0.0/8"])).unwrap();
        assert!(!record.nat_ipv4);
        assert!(record.nat_subnets.is_empty());
        assert_eq!(record.interface_name, "br-abc");
    }

    #[test]
    fn non_bridge_network_has_no_interface() {
        let model = Network {
            id: Some("hostnet".to_owned()),
            name: Some("host".to_owned()),
            driver: Some("host".to_owned()),
            ..Default::default()
        };
        let record = network_from_model(model).unwrap();
        assert!(record.interface_name.is_empty());
        assert!(!record.nat_ipv4);
    }

    #[test]
    fn network_without_id_is_dropped() {
        assert!(network_from_model(Network::default()).is_none());
    }

    fn endpoint(network_id: &str, ip: &str) -> EndpointSettings {
        EndpointSettings {
            network_id: Some(network_id.to_owned()),
            ip_address: Some(ip.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn container_summary_conversion_filters_ports_and_attachments() {
        let summary = ContainerSummary {
            id: Some("c0ffee".to_owned()),
            names: Some(vec!["/web".to_owned()]),
            ports: Some(vec![
                Port {
                    ip: Some("0.0.0.0".to_owned()),
                    private_port: 80,
                    public_port: Some(8080),
                    typ: Some(PortTypeEnum::TCP),
                },
                Port {
                    ip: Some("::".to_owned()),
                    private_port: 80,
                    public_port: Some(8080),
                    typ: Some(PortTypeEnum::TCP),
                },
                Port {
                    ip: None,
                    private_port: 9000,
                    public_port: None,
                    typ: Some(PortTypeEnum::TCP),
                },
                Port {
                    ip: Some("0.0.0.0".to_owned()),
                    private_port: 53,
                    public_port: Some(5353),
                    typ: Some(PortTypeEnum::UDP),
                },
            ]),
            network_settings: Some(ContainerSummaryNetworkSettings {
                networks: Some(HashMap::from([
                    ("frontend".to_owned(), endpoint("n1", "172.18.0.2")),
                    ("v6only".to_owned(), endpoint("n2", "")),
                ])),
                ..Default::default()
            }),
            ..Default::default()
        };

        let record = container_from_summary(summary).unwrap();
        assert_eq!(record.name, "web");
        assert_eq!(record.ports.len(), 2);
        assert!(record.ports.contains(&PortMapping {
            public_port: 8080,
            private_port: 80,
            protocol: Protocol::Tcp,
        }));
        assert!(record.ports.contains(&PortMapping {
            public_port: 5353,
            private_port: 53,
            protocol: Protocol::Udp,
        }));
        assert_eq!(record.networks.len(), 1);
        assert_eq!(record.networks[0].ip_address, Ipv4Addr::new(172, 18, 0, 2));
    }

    #[test]
    fn event_message_conversion_reads_actor_attributes() {
        let message = EventMessage {
            action: Some("connect".to_owned()),
            actor: Some(EventActor {
                id: Some("n1".to_owned()),
                attributes: Some(HashMap::from([
                    ("name".to_owned(), "frontend".to_owned()),
                    ("container".to_owned(), "c0ffee".to_owned()),
                ])),
                ..Default::default()
            }),
            time: Some(1_700_000_000),
            ..Default::default()
        };
        let event = event_from_message(message);
        assert_eq!(event.action, "connect");
        assert_eq!(event.network_id, "n1");
        assert_eq!(event.network_name.as_deref(), Some("frontend"));
        assert_eq!(event.container_id.as_deref(), Some("c0ffee"));
        assert_eq!(event.time, 1_700_000_000);
    }

    #[tokio::test]
    async fn mock_client_lists_inventory() {
        let client = MockDockerClient::new().with_networks(vec![
            network_from_model(bridge_model("abc", "default", &["10.1.0.0/16"])).unwrap(),
        ]);
        assert_eq!(client.list_networks().await.unwrap().len(), 1);
        assert!(client.list_containers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mock_client_failing_listing() {
        let client = MockDockerClient::new().with_failing_listing();
        assert!(matches!(
            client.list_networks().await.unwrap_err(),
            DockerSourceError::DockerApi(_)
        ));
    }

    #[tokio::test]
    async fn mock_client_ping_failures_are_consumed() {
        let client = MockDockerClient::new().with_ping_failures(1);
        assert!(InventoryProvider::ping(&client).await.is_err());
        assert!(InventoryProvider::ping(&client).await.is_ok());
    }

    #[tokio::test]
    async fn mock_client_session_stream_ends_when_sender_dropped() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let client = MockDockerClient::new().with_session(rx);
        let mut stream = client.subscribe(&EventFilter::networks()).await.unwrap();

        tx.send(Ok(NetworkEvent::new("create", "n1"))).unwrap();
        drop(tx);

        assert_eq!(stream.next().await.unwrap().unwrap().action, "create");
        assert!(stream.next().await.is_none());
        assert!(client.subscribe(&EventFilter::networks()).await.is_err());
        assert_eq!(client.subscribe_calls(), 2);
    }

    #[test]
    fn clients_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<MockDockerClient>();
        assert_send_sync::<BollardDockerClient>();
    }
}
