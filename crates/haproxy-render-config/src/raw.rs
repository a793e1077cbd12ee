//! Serde shapes of one configuration layer, converted into core declarations
//! once every layer has been merged and validated.

use haproxy_render_core::{
    BalancerMember, BindInput, DefaultsSection, GlobalSection, ListenerParams, MapFile,
    MapFileEntry, MappingItem, OneOrMany, OptionsInput, Peer, PeersSection, PortsInput,
    ProxySection, SectionKind, SectionParams,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawConfig {
    #[serde(default)]
    pub settings: Option<RawSettings>,
    #[serde(default)]
    pub global: Option<RawGlobal>,
    #[serde(default)]
    pub defaults: Vec<RawDefaults>,
    #[serde(default)]
    pub listen: Vec<RawProxy>,
    #[serde(default)]
    pub frontend: Vec<RawProxy>,
    #[serde(default)]
    pub backend: Vec<RawProxy>,
    #[serde(default)]
    pub balancermember: Vec<RawMember>,
    #[serde(default)]
    pub peers: Vec<RawPeers>,
    #[serde(default)]
    pub peer: Vec<RawPeer>,
    #[serde(default)]
    pub mapfile: Vec<RawMapFile>,
    #[serde(default)]
    pub mapfile_entry: Vec<RawMapFileEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawSettings {
    pub config_file: Option<String>,
    pub map_dir: Option<String>,
    pub sort_options_alphabetic: Option<bool>,
    pub merge_options: Option<bool>,
    pub log_address: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawGlobal {
    pub options: Option<OptionsInput>,
    pub merge_options: Option<bool>,
    pub sort_options_alphabetic: Option<bool>,
    pub config_file: Option<String>,
}

impl RawGlobal {
    pub fn into_section(self) -> GlobalSection {
        GlobalSection {
            options: self.options,
            merge_options: self.merge_options,
            sort_options_alphabetic: self.sort_options_alphabetic,
            config_file: self.config_file,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawDefaults {
    pub name: String,
    pub options: Option<OptionsInput>,
    pub merge_options: Option<bool>,
    pub sort_options_alphabetic: Option<bool>,
    pub config_file: Option<String>,
}

impl RawDefaults {
    pub fn into_section(self) -> DefaultsSection {
        DefaultsSection {
            name: self.name,
            options: self.options,
            merge_options: self.merge_options,
            sort_options_alphabetic: self.sort_options_alphabetic,
            config_file: self.config_file,
        }
    }
}

/// Shared by `[[listen]]`, `[[frontend]]` and `[[backend]]`.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawProxy {
    pub name: String,
    pub ipaddress: Option<OneOrMany<String>>,
    pub ports: Option<PortsInput>,
    pub bind: Option<BindInput>,
    #[serde(default)]
    pub bind_options: Vec<String>,
    pub balance: Option<String>,
    pub mode: Option<String>,
    pub description: Option<String>,
    pub options: Option<OptionsInput>,
    pub sort_options_alphabetic: Option<bool>,
    pub defaults: Option<String>,
    #[serde(default)]
    pub order_index: u8,
    pub config_file: Option<String>,
}

impl RawProxy {
    pub fn into_section(self, kind: SectionKind) -> ProxySection {
        ProxySection {
            kind,
            params: SectionParams {
                name: self.name,
                balance: self.balance,
                mode: self.mode,
                description: self.description,
                options: self.options,
                sort_options_alphabetic: self.sort_options_alphabetic,
                defaults: self.defaults,
                order_index: self.order_index,
                config_file: self.config_file,
            },
            listener: ListenerParams {
                ipaddress: self.ipaddress,
                ports: self.ports,
                bind: self.bind,
                bind_options: self.bind_options,
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawMember {
    pub name: String,
    pub listening_service: String,
    pub server_names: Option<OneOrMany<String>>,
    pub ipaddresses: Option<OneOrMany<String>>,
    pub ports: Option<PortsInput>,
    pub options: Option<OneOrMany<String>>,
    #[serde(default)]
    pub define_cookies: bool,
    pub defaults: Option<String>,
    pub config_file: Option<String>,
}

impl RawMember {
    pub fn into_member(self) -> BalancerMember {
        BalancerMember {
            name: self.name,
            listening_service: self.listening_service,
            server_names: self.server_names,
            ipaddresses: self.ipaddresses,
            ports: self.ports,
            options: self.options,
            define_cookies: self.define_cookies,
            defaults: self.defaults,
            config_file: self.config_file,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawPeers {
    pub name: String,
    pub config_file: Option<String>,
}

impl RawPeers {
    pub fn into_section(self) -> PeersSection {
        PeersSection {
            name: self.name,
            config_file: self.config_file,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawPeer {
    pub name: String,
    pub peers_name: String,
    pub server_names: Option<OneOrMany<String>>,
    pub ipaddresses: OneOrMany<String>,
    pub port: i64,
    pub config_file: Option<String>,
}

impl RawPeer {
    pub fn into_peer(self) -> Peer {
        Peer {
            name: self.name,
            peers_name: self.peers_name,
            server_names: self.server_names,
            ipaddresses: self.ipaddresses,
            port: self.port,
            config_file: self.config_file,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawMapFile {
    pub name: String,
    pub path: Option<String>,
    #[serde(default)]
    pub mappings: Vec<MappingItem>,
}

impl RawMapFile {
    pub fn into_mapfile(self) -> MapFile {
        MapFile {
            name: self.name,
            path: self.path,
            mappings: self.mappings,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawMapFileEntry {
    pub name: String,
    pub mapfile: String,
    pub mappings: Option<Vec<MappingItem>>,
    pub order: Option<String>,
}

impl RawMapFileEntry {
    pub fn into_entry(self) -> MapFileEntry {
        MapFileEntry {
            name: self.name,
            mapfile: self.mapfile,
            mappings: self.mappings,
            order: self.order,
        }
    }
}
