//! Docker network events.
//!
//! The monitor only cares that *something* changed in the network topology;
//! [`NetworkEvent`] keeps just enough of the daemon's message for logging.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A network event reported by the daemon (create, connect, disconnect, destroy, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEvent {
    /// Event action as reported by the daemon.
    pub action: String,
    /// ID of the affected network.
    pub network_id: String,
    /// Network name, when the daemon includes it.
    pub network_name: Option<String>,
    /// Affected container, for connect/disconnect events.
    pub container_id: Option<String>,
    /// Unix timestamp in seconds.
    pub time: i64,
}

impl NetworkEvent {
    /// Creates an event with only an action and network ID.
    pub fn new(action: impl Into<String>, network_id: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            network_id: network_id.into(),
            network_name: None,
            container_id: None,
            time: 0,
        }
    }
}

impl fmt::Display for NetworkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.network_name.as_deref().unwrap_or(&self.network_id);
        write!(f, "network {} {}", name, self.action)?;
        if let Some(container) = &self.container_id {
            write!(f, " (container {container})")?;
        }
        Ok(())
    }
}

/// Event subscription filter, rendered as docker API `filters`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    filters: HashMap<String, Vec<String>>,
}

impl EventFilter {
    /// Restricts the subscription to `type=network`.
    pub fn networks() -> Self {
        Self::default().with("type", "network")
    }

    /// Adds a filter value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters
            .entry(key.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Filter values for a key.
    pub fn values(&self, key: &str) -> &[String] {
        self.filters.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn to_filters(&self) -> HashMap<String, Vec<String>> {
        self.filters.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_filter_restricts_type() {
        let filter = EventFilter::networks();
        assert_eq!(filter.values("type"), ["network"]);
        assert!(filter.values("event").is_empty());
    }

    #[test]
    fn filters_render_for_the_events_api() {
        let filters = EventFilter::networks().with("type", "container").to_filters();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters["type"], ["network", "container"]);
    }

    #[test]
    fn display_prefers_network_name() {
        let mut event = NetworkEvent::new("connect", "abc123");
        event.network_name = Some("frontend".to_owned());
        event.container_id = Some("c0ffee".to_owned());
        assert_eq!(event.to_string(), "network frontend connect (container c0ffee)");
    }

    #[test]
    fn display_falls_back_to_id() {
        assert_eq!(
            NetworkEvent::new("destroy", "abc123").to_string(),
            "network abc123 destroy"
        );
    }
}
