//! Rule synthesis: turns an [`Inventory`] into a populated [`RuleStore`].
//!
//! The synthesizer emits statements strictly in inventory order and never
//! reorders them; determinism comes from [`Inventory::new`] sorting its input.

use dockwall_core::types::{ContainerRecord, Inventory, NetworkRecord, PortMapping};
use tracing::debug;

use crate::store::{
    CHAIN_FORWARD, CHAIN_OUTPUT, CHAIN_POSTROUTING, CHAIN_PREROUTING, RuleOptions, RuleSettings,
    RuleStore,
};
use crate::table::Table;

/// Runs one synthesis pass over every table.
///
/// The returned store is fresh; nothing carries over from earlier passes.
pub fn synthesize(settings: &RuleSettings, inventory: &Inventory) -> RuleStore {
    let mut store = RuleStore::new(settings.clone());
    store.reset(&Table::ALL);
    populate(&mut store, inventory);

    debug!(
        networks = inventory.networks.len(),
        nat_networks = inventory.nat_network_count(),
        containers = inventory.containers.len(),
        nat_statements = store.statement_count(Table::Nat),
        filter_statements = store.statement_count(Table::Filter),
        "rule synthesis complete"
    );

    store
}

/// Populates an already reset store.
pub fn populate(store: &mut RuleStore, inventory: &Inventory) {
    let settings = store.settings().clone();
    let mode = settings.mode;
    let chains = &settings.chains;

    if !mode.update {
        let root_options = if mode.flush {
            RuleOptions::delete()
        } else if mode.restore {
            RuleOptions::default()
        } else {
            RuleOptions::insert_if_missing()
        };

        let jump_dnat = format!("-j {}", chains.dnat);
        store.append_rule(Table::Nat, CHAIN_PREROUTING, &jump_dnat, root_options);
        store.append_rule(Table::Nat, CHAIN_OUTPUT, &jump_dnat, root_options);
        store.append_rule(
            Table::Nat,
            CHAIN_POSTROUTING,
            &format!("-j {}", chains.snat),
            root_options,
        );
        store.append_rule(
            Table::Filter,
            CHAIN_FORWARD,
            &format!("-j {}", chains.forward),
            root_options,
        );
    }

    if mode.flush {
        store.remove_chain(Table::Nat, &chains.dnat);
        store.remove_chain(Table::Nat, &chains.snat);
        store.remove_chain(Table::Filter, &chains.forward);
        store.remove_chain(Table::Filter, &chains.isolation);
        return;
    }

    store.create_chain(Table::Nat, &chains.dnat);
    store.create_chain(Table::Nat, &chains.snat);
    store.create_chain(Table::Filter, &chains.forward);
    store.create_chain(Table::Filter, &chains.isolation);

    for network in inventory.networks.iter().filter(|n| n.nat_ipv4) {
        network_rules(store, &settings, network);
    }

    let networks = inventory.networks_by_id();
    for container in &inventory.containers {
        for attachment in &container.networks {
            let Some(network) = networks.get(attachment.network_id.as_str()) else {
                continue;
            };
            if !network.nat_ipv4 {
                continue;
            }
            for port in &container.ports {
                port_rules(
                    store,
                    &settings,
                    network,
                    container,
                    &attachment.ip_address.to_string(),
                    port,
                );
            }
        }
    }
}

fn network_rules(store: &mut RuleStore, settings: &RuleSettings, network: &NetworkRecord) {
    let chains = &settings.chains;
    let iface = network.interface_name.as_str();
    let plain = RuleOptions::default();

    for subnet in &network.nat_subnets {
        store.append_rule(
            Table::Nat,
            &chains.snat,
            &format!("-s {subnet} ! -o {iface} -j MASQUERADE"),
            plain,
        );
    }

    store.append_rule(
        Table::Nat,
        &chains.dnat,
        &format!("-i {iface} -j RETURN"),
        plain,
    );

    store.append_rule(
        Table::Filter,
        &chains.isolation,
        &format!("-o {iface} -j DROP"),
        plain,
    );

    store.append_rule(
        Table::Filter,
        &chains.forward,
        &format!("-i {iface} ! -o {iface} -j {}", chains.isolation),
        plain,
    );
    store.append_rule(
        Table::Filter,
        &chains.forward,
        &format!("-o {iface} -m conntrack --ctstate RELATED,ESTABLISHED -j ACCEPT"),
        plain,
    );
    store.append_rule(
        Table::Filter,
        &chains.forward,
        &format!("-i {iface} -j ACCEPT"),
        plain,
    );
}

fn port_rules(
    store: &mut RuleStore,
    settings: &RuleSettings,
    network: &NetworkRecord,
    container: &ContainerRecord,
    ip: &str,
    port: &PortMapping,
) {
    let chains = &settings.chains;
    let iface = network.interface_name.as_str();
    let proto = port.protocol.as_str();
    let public = port.public_port;
    let private = port.private_port;
    let plain = RuleOptions::default();

    debug!(
        container = %container.name,
        network = %network.name,
        port = %port,
        "publishing container port"
    );

    store.append_rule(
        Table::Nat,
        &chains.dnat,
        &format!(
            "! -i {iface} -p {proto} -m {proto} --dport {public} -j DNAT --to-destination {ip}:{private}"
        ),
        plain,
    );

    store.append_rule(
        Table::Nat,
        &chains.snat,
        &format!("-s {ip} -d {ip} -p {proto} -m {proto} --dport {public} -j MASQUERADE"),
        plain,
    );

    store.append_rule(
        Table::Filter,
        &chains.forward,
        &format!("-d {ip} ! -i {iface} -o {iface} -p {proto} -m {proto} --dport {public} -j ACCEPT"),
        plain,
    );
}
