//! `global`, `defaults`, `listen`, `frontend` and `backend` blocks.

use tracing::debug;

use crate::bind::{binds_from_addresses, sort_bind, BindEntry};
use crate::error::{RenderError, RenderResult};
use crate::fragment::{defaults_order, section_order, ConfigFragment, GLOBAL_ORDER};
use crate::normalize::{
    normalize_addresses, normalize_bind, normalize_options, normalize_ports, BindInput,
    OneOrMany, OptionScalar, OptionValue, OptionsInput, OrderedPairs, PortsInput,
};
use crate::options::{defaults_builtin, global_builtin, merge_options, OptionEntry};
use crate::settings::RenderSettings;
use crate::validate::{
    check_address, check_exclusive_pair, check_mutual_exclusion, check_port,
    require_single_line, require_value, Param,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Listen,
    Frontend,
    Backend,
}

impl SectionKind {
    pub fn keyword(self) -> &'static str {
        match self {
            SectionKind::Listen => "listen",
            SectionKind::Frontend => "frontend",
            SectionKind::Backend => "backend",
        }
    }

    /// Options written when a block declares none at all.
    pub fn default_options(self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            SectionKind::Listen | SectionKind::Backend => {
                &[("balance", &["roundrobin"]), ("option", &["tcplog"])]
            }
            SectionKind::Frontend => &[("option", &["tcplog"])],
        }
    }
}

/// Parameters shared by every proxy block.
#[derive(Debug, Clone, Default)]
pub struct SectionParams {
    pub name: String,
    pub balance: Option<String>,
    pub mode: Option<String>,
    pub description: Option<String>,
    pub options: Option<OptionsInput>,
    pub sort_options_alphabetic: Option<bool>,
    /// Named `defaults` block this section follows in the file.
    pub defaults: Option<String>,
    pub order_index: u8,
    pub config_file: Option<String>,
}

/// Where a `listen`/`frontend` block accepts connections.
#[derive(Debug, Clone, Default)]
pub struct ListenerParams {
    pub ipaddress: Option<OneOrMany<String>>,
    pub ports: Option<PortsInput>,
    pub bind: Option<BindInput>,
    pub bind_options: Vec<String>,
}

impl ListenerParams {
    fn is_empty(&self) -> bool {
        self.ipaddress.is_none()
            && self.ports.is_none()
            && self.bind.is_none()
            && self.bind_options.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ProxySection {
    pub kind: SectionKind,
    pub params: SectionParams,
    pub listener: ListenerParams,
}

impl ProxySection {
    pub fn new(kind: SectionKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            params: SectionParams {
                name: name.into(),
                ..SectionParams::default()
            },
            listener: ListenerParams::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DefaultsSection {
    pub name: String,
    pub options: Option<OptionsInput>,
    pub merge_options: Option<bool>,
    pub sort_options_alphabetic: Option<bool>,
    pub config_file: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GlobalSection {
    /// `None` writes the builtin table as is.
    pub options: Option<OptionsInput>,
    pub merge_options: Option<bool>,
    pub sort_options_alphabetic: Option<bool>,
    pub config_file: Option<String>,
}

pub fn render_proxy_section(
    section: &ProxySection,
    settings: &RenderSettings,
) -> RenderResult<ConfigFragment> {
    let params = &section.params;
    let keyword = section.kind.keyword();
    require_value(&format!("{keyword} name"), &params.name)?;

    let binds = match section.kind {
        SectionKind::Backend if !section.listener.is_empty() => {
            return Err(RenderError::invalid_argument(format!(
                "backend {} does not accept bind parameters",
                params.name
            )));
        }
        SectionKind::Backend => Vec::new(),
        SectionKind::Listen | SectionKind::Frontend => resolve_binds(&section.listener)?,
    };
    let options = resolve_section_options(section.kind, params, settings)?;
    for (field, value) in [
        ("balance", &params.balance),
        ("mode", &params.mode),
        ("description", &params.description),
    ] {
        if let Some(value) = value {
            require_single_line(field, value)?;
        }
    }

    let mut content = format!("\n{keyword} {}\n", params.name);
    for bind in &binds {
        content.push_str(&bind.render_line());
    }
    push_directives(&mut content, params);
    for option in &options {
        option.render_lines(&mut content);
    }

    let fragment = ConfigFragment::new(
        settings.target(params.config_file.as_deref()),
        section_order(params.defaults.as_deref(), &params.name, params.order_index),
        content,
    );
    debug!(
        kind = keyword,
        name = %params.name,
        order = %fragment.order,
        binds = binds.len(),
        "rendered proxy section"
    );
    Ok(fragment)
}

/// Normalizes, validates and sorts the bind lines of a listener.
pub fn resolve_binds(listener: &ListenerParams) -> RenderResult<Vec<BindEntry>> {
    let bind_given = listener.bind.is_some();
    check_mutual_exclusion(
        Param::new("ports", listener.ports.is_some()),
        Param::new("bind", bind_given),
    )?;
    check_exclusive_pair(
        Param::new("ipaddress", listener.ipaddress.is_some()),
        Param::new("bind", bind_given),
    )?;

    let entries = match &listener.bind {
        Some(bind) => normalize_bind(bind)?,
        None => {
            let addresses = listener
                .ipaddress
                .as_ref()
                .map(normalize_addresses)
                .unwrap_or_default();
            for address in &addresses {
                check_address(address)?;
            }
            let ports = match &listener.ports {
                Some(ports) => normalize_ports(ports)?,
                None => Vec::new(),
            };
            for port in &ports {
                check_port(port)?;
            }
            for token in &listener.bind_options {
                require_single_line("bind token", token)?;
            }
            binds_from_addresses(&addresses, &ports, &listener.bind_options)
        }
    };

    Ok(sort_bind(entries))
}

fn resolve_section_options(
    kind: SectionKind,
    params: &SectionParams,
    settings: &RenderSettings,
) -> RenderResult<Vec<OptionEntry>> {
    for (field, value) in [("balance", &params.balance), ("mode", &params.mode)] {
        let option_name = format!("options[{field}]");
        let declared_in_options = params
            .options
            .as_ref()
            .is_some_and(|options| options.contains_key(field));
        check_mutual_exclusion(
            Param::new(field, value.is_some()),
            Param::new(&option_name, declared_in_options),
        )?;
    }

    let sort = params
        .sort_options_alphabetic
        .unwrap_or(settings.sort_options_alphabetic);
    match &params.options {
        Some(options) => normalize_options(options, sort),
        None => normalize_options(&kind_defaults(kind, params), sort),
    }
}

/// Per-kind default options, minus keys the block sets through a dedicated field.
fn kind_defaults(kind: SectionKind, params: &SectionParams) -> OptionsInput {
    let pairs: OrderedPairs<OptionValue> = kind
        .default_options()
        .iter()
        .filter(|(key, _)| match *key {
            "balance" => params.balance.is_none(),
            "mode" => params.mode.is_none(),
            _ => true,
        })
        .map(|(key, values)| {
            let values = values.iter().map(|value| OptionScalar::from(*value)).collect();
            (*key, OptionValue::Many(values))
        })
        .collect();
    OptionsInput::Mapping(pairs)
}

fn push_directives(content: &mut String, params: &SectionParams) {
    let directives = [
        ("balance", &params.balance),
        ("mode", &params.mode),
        ("description", &params.description),
    ];
    for (keyword, value) in directives {
        if let Some(value) = value {
            content.push_str(&format!("  {keyword} {value}\n"));
        }
    }
}

pub fn render_defaults(
    section: &DefaultsSection,
    settings: &RenderSettings,
) -> RenderResult<ConfigFragment> {
    require_value("defaults name", &section.name)?;

    let sort = section
        .sort_options_alphabetic
        .unwrap_or(settings.sort_options_alphabetic);
    let declared = section
        .options
        .as_ref()
        .map(|options| normalize_options(options, sort))
        .transpose()?
        .unwrap_or_default();
    let merge = section.merge_options.unwrap_or(settings.merge_options);
    let options = merge_options(declared, &defaults_builtin(), merge);

    let mut content = format!("\n\ndefaults {}\n", section.name);
    for option in &options {
        option.render_lines(&mut content);
    }

    debug!(name = %section.name, merge, "rendered defaults section");
    Ok(ConfigFragment::new(
        settings.target(section.config_file.as_deref()),
        defaults_order(&section.name),
        content,
    ))
}

pub fn render_global(
    section: &GlobalSection,
    settings: &RenderSettings,
) -> RenderResult<ConfigFragment> {
    let sort = section
        .sort_options_alphabetic
        .unwrap_or(settings.sort_options_alphabetic);
    let builtin = global_builtin(&settings.log_address);
    let options = match &section.options {
        Some(options) => {
            let merge = section.merge_options.unwrap_or(settings.merge_options);
            merge_options(normalize_options(options, sort)?, &builtin, merge)
        }
        None => builtin,
    };

    let mut content = String::from("global\n");
    for option in &options {
        option.render_lines(&mut content);
    }

    debug!(options = options.len(), "rendered global section");
    Ok(ConfigFragment::new(
        settings.target(section.config_file.as_deref()),
        GLOBAL_ORDER,
        content,
    ))
}
