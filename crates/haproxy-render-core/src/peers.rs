//! `peers` sections and the `peer` lines that join them.

use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::fragment::{peer_order, peers_order, ConfigFragment};
use crate::normalize::{normalize_addresses, OneOrMany};
use crate::settings::RenderSettings;
use crate::validate::{check_address, check_port, require_value};

#[derive(Debug, Clone, Default)]
pub struct PeersSection {
    pub name: String,
    pub config_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Peer {
    pub name: String,
    /// The `peers` section this peer belongs to.
    pub peers_name: String,
    /// Defaults to `[name]`.
    pub server_names: Option<OneOrMany<String>>,
    pub ipaddresses: OneOrMany<String>,
    pub port: i64,
    pub config_file: Option<String>,
}

impl Peer {
    pub fn new(
        name: impl Into<String>,
        peers_name: impl Into<String>,
        ipaddress: impl Into<String>,
        port: i64,
    ) -> Self {
        Self {
            name: name.into(),
            peers_name: peers_name.into(),
            server_names: None,
            ipaddresses: OneOrMany::One(ipaddress.into()),
            port,
            config_file: None,
        }
    }
}

pub fn render_peers(section: &PeersSection, settings: &RenderSettings) -> RenderResult<ConfigFragment> {
    require_value("peers name", &section.name)?;
    Ok(ConfigFragment::new(
        settings.target(section.config_file.as_deref()),
        peers_order(&section.name),
        format!("\npeers {}\n", section.name),
    ))
}

/// One fragment per server name, paired positionally with the addresses.
pub fn render_peer(peer: &Peer, settings: &RenderSettings) -> RenderResult<Vec<ConfigFragment>> {
    require_value("peer name", &peer.name)?;
    require_value("peers_name", &peer.peers_name)?;

    let port = check_port(&peer.port.to_string())?;
    let addresses = normalize_addresses(&peer.ipaddresses);
    for address in &addresses {
        check_address(address)?;
    }
    let server_names = match &peer.server_names {
        Some(names) => names.to_vec(),
        None => vec![peer.name.clone()],
    };
    if server_names.len() != addresses.len() {
        return Err(RenderError::invalid_argument(format!(
            "peer {}: {} server_names for {} ipaddresses",
            peer.name,
            server_names.len(),
            addresses.len()
        )));
    }

    let target = settings.target(peer.config_file.as_deref());
    let fragments: Vec<ConfigFragment> = server_names
        .iter()
        .zip(&addresses)
        .map(|(server, address)| {
            ConfigFragment::new(
                target,
                peer_order(&peer.peers_name, server),
                format!("  peer {server} {address}:{port}\n"),
            )
        })
        .collect();

    debug!(
        peer = %peer.name,
        peers = %peer.peers_name,
        lines = fragments.len(),
        "rendered peer"
    );
    Ok(fragments)
}
