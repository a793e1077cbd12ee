//! Configuration loader for haproxy-render.
//!
//! Declarations and settings are read from TOML layers in precedence order:
//! built-in defaults → `haproxy-render.toml` in the working directory →
//! `--config` override. Scalar `[settings]` keys from a later layer replace
//! earlier ones; declaration arrays accumulate in layer order. The merged
//! result is validated as a whole and converted into the core's typed
//! [`Declarations`] and [`RenderSettings`].

mod raw;

use std::collections::{HashMap, HashSet};
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use haproxy_render_core::validate::validate_address_or_host;
use haproxy_render_core::{Declarations, ExitCode, RenderSettings, SectionKind};
use thiserror::Error;
use tracing::{debug, warn};

use crate::raw::{
    RawConfig, RawDefaults, RawGlobal, RawMapFile, RawMapFileEntry, RawMember, RawPeer, RawPeers,
    RawProxy, RawSettings,
};

pub const CONFIG_FILE_NAME: &str = "haproxy-render.toml";

/// Complete configuration resolved from defaults and on-disk layers.
#[derive(Clone, Debug)]
pub struct Config {
    pub settings: RenderSettings,
    pub declarations: Declarations,
    pub sources: ConfigSources,
}

/// Provenance information for resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of configuration (default/local/override/inline).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    fn default() -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
        }
    }

    fn inline() -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Inline,
            path: None,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        ConfigSource {
            kind,
            path: Some(path),
        }
    }

    pub fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    Local,
    Override,
    Inline,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
            ConfigSourceKind::Inline => "inline config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to parse inline config: {0}")]
    InlineParse(toml::de::Error),
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl ConfigError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ConfigError::Validation(_) => ExitCode::Validation,
            _ => ExitCode::Config,
        }
    }
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::default();
        let mut merged = PartialConfig::default();
        merged.merge(defaults_layer(default_source.clone()));
        let mut source_layers = vec![default_source];

        let local_config_path = working_dir.join(CONFIG_FILE_NAME);
        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            source_layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            settings: resolved.settings,
            declarations: resolved.declarations,
            sources: ConfigSources {
                working_directory: working_dir,
                layers: source_layers,
            },
        })
    }

    /// Resolves a single in-memory document on top of the built-in defaults.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let default_source = ConfigSource::default();
        let inline_source = ConfigSource::inline();

        let mut merged = PartialConfig::default();
        merged.merge(defaults_layer(default_source.clone()));
        let layer =
            parse_layer(contents, inline_source.clone()).map_err(ConfigError::InlineParse)?;
        merged.merge(layer);

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            settings: resolved.settings,
            declarations: resolved.declarations,
            sources: ConfigSources {
                working_directory: PathBuf::from("."),
                layers: vec![default_source, inline_source],
            },
        })
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    let layer = parse_layer(&contents, source).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;
    debug!(path = %path.display(), "loaded configuration layer");
    Ok(layer)
}

fn parse_layer(contents: &str, source: ConfigSource) -> Result<PartialConfig, toml::de::Error> {
    let raw: RawConfig = toml::from_str(contents)?;
    Ok(PartialConfig::from_raw(raw, source))
}

fn defaults_layer(source: ConfigSource) -> PartialConfig {
    let defaults = RenderSettings::default();
    PartialConfig {
        settings: SettingsPartial {
            config_file: Some(Located::new(defaults.config_file, source.clone())),
            map_dir: Some(Located::new(defaults.map_dir, source.clone())),
            sort_options_alphabetic: Some(Located::new(
                defaults.sort_options_alphabetic,
                source.clone(),
            )),
            merge_options: Some(Located::new(defaults.merge_options, source.clone())),
            log_address: Some(Located::new(defaults.log_address, source)),
        },
        declarations: DeclarationsPartial::default(),
    }
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

fn locate_all<T>(values: Vec<T>, source: &ConfigSource) -> Vec<Located<T>> {
    values
        .into_iter()
        .map(|value| Located::new(value, source.clone()))
        .collect()
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    settings: SettingsPartial,
    declarations: DeclarationsPartial,
}

impl PartialConfig {
    fn from_raw(raw: RawConfig, source: ConfigSource) -> Self {
        let settings = raw
            .settings
            .map(|settings| SettingsPartial::from_raw(settings, &source))
            .unwrap_or_default();
        let declarations = DeclarationsPartial {
            global: raw.global.map(|global| Located::new(global, source.clone())),
            defaults: locate_all(raw.defaults, &source),
            listen: locate_all(raw.listen, &source),
            frontend: locate_all(raw.frontend, &source),
            backend: locate_all(raw.backend, &source),
            members: locate_all(raw.balancermember, &source),
            peers: locate_all(raw.peers, &source),
            peer: locate_all(raw.peer, &source),
            mapfiles: locate_all(raw.mapfile, &source),
            mapfile_entries: locate_all(raw.mapfile_entry, &source),
        };
        PartialConfig {
            settings,
            declarations,
        }
    }

    fn merge(&mut self, other: PartialConfig) {
        self.settings.merge(other.settings);
        self.declarations.merge(other.declarations);
    }

    fn finalize(self) -> Result<ResolvedConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();
        let settings = self.settings.finalize(&mut errors);
        self.declarations.validate(&mut errors);

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedConfig {
            settings,
            declarations: self.declarations.into_declarations(),
        })
    }
}

#[derive(Clone, Debug, Default)]
struct SettingsPartial {
    config_file: Option<Located<String>>,
    map_dir: Option<Located<String>>,
    sort_options_alphabetic: Option<Located<bool>>,
    merge_options: Option<Located<bool>>,
    log_address: Option<Located<String>>,
}

impl SettingsPartial {
    fn from_raw(raw: RawSettings, source: &ConfigSource) -> Self {
        SettingsPartial {
            config_file: raw
                .config_file
                .map(|value| Located::new(value, source.clone())),
            map_dir: raw.map_dir.map(|value| Located::new(value, source.clone())),
            sort_options_alphabetic: raw
                .sort_options_alphabetic
                .map(|value| Located::new(value, source.clone())),
            merge_options: raw
                .merge_options
                .map(|value| Located::new(value, source.clone())),
            log_address: raw
                .log_address
                .map(|value| Located::new(value, source.clone())),
        }
    }

    fn merge(&mut self, other: SettingsPartial) {
        if other.config_file.is_some() {
            self.config_file = other.config_file;
        }
        if other.map_dir.is_some() {
            self.map_dir = other.map_dir;
        }
        if other.sort_options_alphabetic.is_some() {
            self.sort_options_alphabetic = other.sort_options_alphabetic;
        }
        if other.merge_options.is_some() {
            self.merge_options = other.merge_options;
        }
        if other.log_address.is_some() {
            self.log_address = other.log_address;
        }
    }

    fn finalize(self, errors: &mut Vec<ConfigValidationError>) -> RenderSettings {
        let mut settings = RenderSettings::default();

        for (key, located, target) in [
            ("config_file", self.config_file, &mut settings.config_file),
            ("map_dir", self.map_dir, &mut settings.map_dir),
        ] {
            if let Some(located) = located {
                if located.value.trim().is_empty() {
                    errors.push(
                        ConfigValidationError::new(
                            Some(located.source),
                            "must not be empty".to_string(),
                        )
                        .with_context(format!("settings.{key}")),
                    );
                } else {
                    *target = located.value;
                }
            }
        }

        if let Some(located) = self.log_address {
            if validate_address_or_host(&located.value) {
                settings.log_address = located.value;
            } else {
                errors.push(
                    ConfigValidationError::new(
                        Some(located.source),
                        format!("invalid address '{}'", located.value),
                    )
                    .with_context("settings.log_address"),
                );
            }
        }

        if let Some(located) = self.sort_options_alphabetic {
            settings.sort_options_alphabetic = located.value;
        }
        if let Some(located) = self.merge_options {
            settings.merge_options = located.value;
        }

        settings
    }
}

#[derive(Clone, Debug, Default)]
struct DeclarationsPartial {
    global: Option<Located<RawGlobal>>,
    defaults: Vec<Located<RawDefaults>>,
    listen: Vec<Located<RawProxy>>,
    frontend: Vec<Located<RawProxy>>,
    backend: Vec<Located<RawProxy>>,
    members: Vec<Located<RawMember>>,
    peers: Vec<Located<RawPeers>>,
    peer: Vec<Located<RawPeer>>,
    mapfiles: Vec<Located<RawMapFile>>,
    mapfile_entries: Vec<Located<RawMapFileEntry>>,
}

impl DeclarationsPartial {
    fn merge(&mut self, other: DeclarationsPartial) {
        // `[global]` is a single block; a later layer replaces it whole.
        if other.global.is_some() {
            self.global = other.global;
        }
        self.defaults.extend(other.defaults);
        self.listen.extend(other.listen);
        self.frontend.extend(other.frontend);
        self.backend.extend(other.backend);
        self.members.extend(other.members);
        self.peers.extend(other.peers);
        self.peer.extend(other.peer);
        self.mapfiles.extend(other.mapfiles);
        self.mapfile_entries.extend(other.mapfile_entries);
    }

    fn validate(&self, errors: &mut Vec<ConfigValidationError>) {
        check_names("defaults", &self.defaults, |d| name_key(&[d.name.as_str()]), errors);
        check_names("listen", &self.listen, |s| name_key(&[s.name.as_str()]), errors);
        check_names("frontend", &self.frontend, |s| name_key(&[s.name.as_str()]), errors);
        check_names("backend", &self.backend, |s| name_key(&[s.name.as_str()]), errors);
        self.check_proxy_names_across_kinds(errors);
        check_names(
            "balancermember",
            &self.members,
            |m| name_key(&[m.name.as_str()]),
            errors,
        );
        check_names("peers", &self.peers, |p| name_key(&[p.name.as_str()]), errors);
        check_names(
            "peer",
            &self.peer,
            |p| name_key(&[p.peers_name.as_str(), p.name.as_str()]),
            errors,
        );
        check_names("mapfile", &self.mapfiles, |m| name_key(&[m.name.as_str()]), errors);
        check_names(
            "mapfile_entry",
            &self.mapfile_entries,
            |e| name_key(&[e.mapfile.as_str(), e.name.as_str()]),
            errors,
        );

        for peer in &self.peer {
            if !self.peers.iter().any(|p| p.value.name == peer.value.peers_name) {
                errors.push(
                    ConfigValidationError::new(
                        Some(peer.source.clone()),
                        format!("references unknown peers section '{}'", peer.value.peers_name),
                    )
                    .with_context(format!("peer '{}'", peer.value.name)),
                );
            }
        }

        for entry in &self.mapfile_entries {
            if !self.mapfiles.iter().any(|m| m.value.name == entry.value.mapfile) {
                errors.push(
                    ConfigValidationError::new(
                        Some(entry.source.clone()),
                        format!("references unknown mapfile '{}'", entry.value.mapfile),
                    )
                    .with_context(format!("mapfile_entry '{}'", entry.value.name)),
                );
            }
        }

        self.warn_dangling_references();
    }

    /// Proxy blocks of every kind share one order-key namespace.
    fn check_proxy_names_across_kinds(&self, errors: &mut Vec<ConfigValidationError>) {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        let proxies = [
            ("listen", &self.listen),
            ("frontend", &self.frontend),
            ("backend", &self.backend),
        ];
        for (kind, sections) in proxies {
            for section in sections {
                let name = section.value.name.trim();
                if name.is_empty() {
                    continue;
                }
                match owners.get(name) {
                    Some(owner) if *owner != kind => errors.push(
                        ConfigValidationError::new(
                            Some(section.source.clone()),
                            format!("'{name}' is already declared as a {owner} block"),
                        )
                        .with_context(kind.to_string()),
                    ),
                    Some(_) => {}
                    None => {
                        owners.insert(name, kind);
                    }
                }
            }
        }
    }

    /// Members and sections may target blocks rendered by another tool, so
    /// unresolved names are only worth a warning.
    fn warn_dangling_references(&self) {
        let services: HashSet<&str> = self
            .listen
            .iter()
            .chain(&self.backend)
            .map(|s| s.value.name.as_str())
            .collect();
        let defaults: HashSet<&str> = self.defaults.iter().map(|d| d.value.name.as_str()).collect();

        for member in &self.members {
            if !services.contains(member.value.listening_service.as_str()) {
                warn!(
                    member = %member.value.name,
                    service = %member.value.listening_service,
                    source = %member.source.describe(),
                    "balancermember targets an undeclared listen/backend block"
                );
            }
        }

        let referenced = self
            .listen
            .iter()
            .chain(&self.frontend)
            .chain(&self.backend)
            .filter_map(|s| s.value.defaults.as_deref())
            .chain(self.members.iter().filter_map(|m| m.value.defaults.as_deref()));
        for name in referenced {
            if !defaults.contains(name) {
                warn!(defaults = name, "block references an undeclared defaults section");
            }
        }
    }

    fn into_declarations(self) -> Declarations {
        let sections = self
            .listen
            .into_iter()
            .map(|s| s.value.into_section(SectionKind::Listen))
            .chain(
                self.frontend
                    .into_iter()
                    .map(|s| s.value.into_section(SectionKind::Frontend)),
            )
            .chain(
                self.backend
                    .into_iter()
                    .map(|s| s.value.into_section(SectionKind::Backend)),
            )
            .collect();

        Declarations {
            global: self.global.map(|g| g.value.into_section()),
            defaults: self.defaults.into_iter().map(|d| d.value.into_section()).collect(),
            sections,
            members: self.members.into_iter().map(|m| m.value.into_member()).collect(),
            peers: self.peers.into_iter().map(|p| p.value.into_section()).collect(),
            peer: self.peer.into_iter().map(|p| p.value.into_peer()).collect(),
            mapfiles: self.mapfiles.into_iter().map(|m| m.value.into_mapfile()).collect(),
            mapfile_entries: self
                .mapfile_entries
                .into_iter()
                .map(|e| e.value.into_entry())
                .collect(),
        }
    }
}

/// Identity of a declaration within its kind, or `None` when any part is blank.
fn name_key(parts: &[&str]) -> Option<String> {
    if parts.iter().any(|part| part.trim().is_empty()) {
        return None;
    }
    Some(parts.join("/"))
}

/// Reports blank names and names declared twice within one kind.
fn check_names<T>(
    kind: &str,
    items: &[Located<T>],
    key_of: impl Fn(&T) -> Option<String>,
    errors: &mut Vec<ConfigValidationError>,
) {
    let mut seen = HashSet::new();
    for item in items {
        let Some(key) = key_of(&item.value) else {
            errors.push(
                ConfigValidationError::new(Some(item.source.clone()), "name is required".into())
                    .with_context(kind.to_string()),
            );
            continue;
        };
        if !seen.insert(key.clone()) {
            errors.push(
                ConfigValidationError::new(
                    Some(item.source.clone()),
                    format!("'{key}' is declared more than once"),
                )
                .with_context(kind.to_string()),
            );
        }
    }
}

#[derive(Clone, Debug)]
struct ResolvedConfig {
    settings: RenderSettings,
    declarations: Declarations,
}

/// Container for validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError {
            source,
            message,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {}", context, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_settings_replace_earlier_ones() {
        let mut merged = PartialConfig::default();
        merged.merge(defaults_layer(ConfigSource::default()));
        merged.merge(
            parse_layer(
                "[settings]\nmerge_options = true\n",
                ConfigSource::for_file(ConfigSourceKind::Local, PathBuf::from("/a.toml")),
            )
            .unwrap(),
        );
        merged.merge(
            parse_layer(
                "[settings]\nmerge_options = false\nmap_dir = \"/srv\"\n",
                ConfigSource::for_file(ConfigSourceKind::Override, PathBuf::from("/b.toml")),
            )
            .unwrap(),
        );

        let source = merged.settings.merge_options.as_ref().unwrap().source.clone();
        assert_eq!(source.kind, ConfigSourceKind::Override);

        let resolved = merged.finalize().unwrap();
        assert!(!resolved.settings.merge_options);
        assert_eq!(resolved.settings.map_dir, "/srv");
        assert_eq!(resolved.settings.config_file, "/etc/haproxy/haproxy.cfg");
    }

    #[test]
    fn validation_error_names_its_layer() {
        let err = ConfigValidationError::new(
            Some(ConfigSource::for_file(
                ConfigSourceKind::Override,
                PathBuf::from("/etc/extra.toml"),
            )),
            "'web' is declared more than once".into(),
        )
        .with_context("listen");
        assert_eq!(
            err.to_string(),
            "listen: 'web' is declared more than once (override config at /etc/extra.toml)"
        );
    }

    #[test]
    fn blank_composite_names_are_rejected() {
        let mut errors = Vec::new();
        let source = ConfigSource::inline();
        let items = vec![Located::new(("tyler".to_string(), String::new()), source)];
        check_names(
            "peer",
            &items,
            |(a, b)| name_key(&[a.as_str(), b.as_str()]),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "name is required");
    }
}
