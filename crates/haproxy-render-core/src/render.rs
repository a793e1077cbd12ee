use tracing::{debug, debug_span};

use crate::aggregate::{assemble_files, RenderedFile};
use crate::error::{RenderError, RenderResult};
use crate::fragment::ConfigFragment;
use crate::mapfile::{render_map_file, MapFile, MapFileEntry};
use crate::member::{render_member, BalancerMember};
use crate::peers::{render_peer, render_peers, Peer, PeersSection};
use crate::section::{
    render_defaults, render_global, render_proxy_section, DefaultsSection, GlobalSection,
    ProxySection,
};
use crate::settings::RenderSettings;

/// Everything one render pass turns into files.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    pub global: Option<GlobalSection>,
    pub defaults: Vec<DefaultsSection>,
    /// `listen`, `frontend` and `backend` blocks in declaration order.
    pub sections: Vec<ProxySection>,
    pub members: Vec<BalancerMember>,
    pub peers: Vec<PeersSection>,
    pub peer: Vec<Peer>,
    pub mapfiles: Vec<MapFile>,
    pub mapfile_entries: Vec<MapFileEntry>,
}

impl Declarations {
    pub fn is_empty(&self) -> bool {
        self.global.is_none()
            && self.defaults.is_empty()
            && self.sections.is_empty()
            && self.members.is_empty()
            && self.peers.is_empty()
            && self.peer.is_empty()
            && self.mapfiles.is_empty()
            && self.mapfile_entries.is_empty()
    }
}

/// Output of a full pass: every fragment plus the files they assemble into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub fragments: Vec<ConfigFragment>,
    pub files: Vec<RenderedFile>,
}

impl RenderOutput {
    pub fn file(&self, target: &str) -> Option<&RenderedFile> {
        self.files.iter().find(|file| file.target == target)
    }
}

pub struct Renderer<'a> {
    settings: &'a RenderSettings,
}

impl<'a> Renderer<'a> {
    pub fn new(settings: &'a RenderSettings) -> Self {
        Self { settings }
    }

    /// Renders every declaration. The first failure aborts the pass, so no
    /// partial output is ever returned.
    pub fn render_fragments(&self, declarations: &Declarations) -> RenderResult<Vec<ConfigFragment>> {
        let _span = debug_span!("render").entered();
        let settings = self.settings;
        let mut fragments = Vec::new();

        if let Some(global) = &declarations.global {
            fragments.push(render_global(global, settings)?);
        }
        for defaults in &declarations.defaults {
            fragments.push(render_defaults(defaults, settings)?);
        }
        for section in &declarations.sections {
            fragments.push(render_proxy_section(section, settings)?);
        }
        for member in &declarations.members {
            fragments.push(render_member(member, settings)?);
        }
        for peers in &declarations.peers {
            fragments.push(render_peers(peers, settings)?);
        }
        for peer in &declarations.peer {
            fragments.extend(render_peer(peer, settings)?);
        }
        fragments.extend(self.render_map_files(declarations)?);

        debug!(fragments = fragments.len(), "render pass complete");
        Ok(fragments)
    }

    pub fn render(&self, declarations: &Declarations) -> RenderResult<RenderOutput> {
        let fragments = self.render_fragments(declarations)?;
        let files = assemble_files(&fragments);
        Ok(RenderOutput { fragments, files })
    }

    fn render_map_files(&self, declarations: &Declarations) -> RenderResult<Vec<ConfigFragment>> {
        if let Some(orphan) = declarations.mapfile_entries.iter().find(|entry| {
            !declarations
                .mapfiles
                .iter()
                .any(|mapfile| mapfile.name == entry.mapfile)
        }) {
            return Err(RenderError::invalid_argument(format!(
                "mapfile entry '{}' references undeclared mapfile '{}'",
                orphan.name, orphan.mapfile
            )));
        }

        let mut fragments = Vec::new();
        for mapfile in &declarations.mapfiles {
            let entries: Vec<&MapFileEntry> = declarations
                .mapfile_entries
                .iter()
                .filter(|entry| entry.mapfile == mapfile.name)
                .collect();
            fragments.extend(render_map_file(mapfile, &entries, self.settings)?);
        }
        Ok(fragments)
    }
}
