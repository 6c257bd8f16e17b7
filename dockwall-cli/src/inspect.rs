//! `--inspect` report: the networks and containers a pass would work from.

use std::io::Write;

use dockwall_core::types::{ContainerRecord, Inventory, NetworkRecord};
use serde::Serialize;

use crate::output::Render;

/// Collected inventory, as shown by `--inspect`.
#[derive(Debug, Serialize)]
pub struct InspectReport<'a> {
    pub networks: &'a [NetworkRecord],
    pub containers: &'a [ContainerRecord],
}

impl<'a> InspectReport<'a> {
    pub fn new(inventory: &'a Inventory) -> Self {
        Self {
            networks: &inventory.networks,
            containers: &inventory.containers,
        }
    }
}

impl Render for InspectReport<'_> {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Networks ({}):", self.networks.len())?;
        for network in self.networks {
            writeln!(w)?;
            writeln!(w, "  {} ({})", network.name, network.id)?;
            writeln!(w, "    driver:    {}", network.driver)?;
            if !network.interface_name.is_empty() {
                writeln!(w, "    interface: {}", network.interface_name)?;
            }
            writeln!(w, "    nat:       {}", if network.nat_ipv4 { "yes" } else { "no" })?;
            for subnet in &network.nat_subnets {
                writeln!(w, "    subnet:    {subnet}")?;
            }
        }

        writeln!(w)?;
        writeln!(w, "Containers ({}):", self.containers.len())?;
        for container in self.containers {
            writeln!(w)?;
            writeln!(w, "  {} ({})", container.name, container.id)?;
            for port in &container.ports {
                writeln!(w, "    port:      {port}")?;
            }
            for attachment in &container.networks {
                writeln!(
                    w,
                    "    network:   {} {}",
                    attachment.network_id, attachment.ip_address
                )?;
            }
        }
        Ok(())
    }
}
