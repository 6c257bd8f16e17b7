//! 인벤토리 수집 -- 한 번의 합성 패스에 필요한 네트워크/컨테이너 목록

use dockwall_core::types::Inventory;
use tracing::debug;

use crate::docker::InventoryProvider;
use crate::error::DockerSourceError;

/// 데몬에서 네트워크와 실행 중인 컨테이너를 읽어 [`Inventory`]를 만듭니다.
///
/// 연결 확인(ping)이 먼저 수행되므로 데몬에 닿지 못하면
/// `DockerSourceError::DockerConnection`이 반환됩니다.
///
/// # Errors
///
/// ping 또는 목록 조회 중 하나라도 실패하면 에러를 반환합니다. 재시도는 하지 않습니다.
pub async fn load_inventory<P: InventoryProvider>(
    provider: &P,
) -> Result<Inventory, DockerSourceError> {
    provider.ping().await?;

    let networks = provider.list_networks().await?;
    let containers = provider.list_containers().await?;
    let inventory = Inventory::new(networks, containers);

    debug!(
        networks = inventory.networks.len(),
        nat_networks = inventory.nat_network_count(),
        containers = inventory.containers.len(),
        "inventory loaded"
    );

    Ok(inventory)
}
