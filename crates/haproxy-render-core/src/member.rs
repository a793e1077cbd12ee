//! `server` lines contributed to a listen or backend block.

use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::fragment::{section_order, ConfigFragment};
use crate::normalize::{normalize_addresses, normalize_ports, OneOrMany, PortsInput};
use crate::settings::RenderSettings;
use crate::validate::{check_address, check_port, require_single_line, require_value};

#[derive(Debug, Clone)]
pub struct BalancerMember {
    pub name: String,
    pub listening_service: String,
    /// Defaults to `[name]`.
    pub server_names: Option<OneOrMany<String>>,
    /// Defaults to the server names, which must then resolve as hostnames.
    pub ipaddresses: Option<OneOrMany<String>>,
    pub ports: Option<PortsInput>,
    pub options: Option<OneOrMany<String>>,
    pub define_cookies: bool,
    pub defaults: Option<String>,
    pub config_file: Option<String>,
}

impl BalancerMember {
    pub fn new(name: impl Into<String>, listening_service: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listening_service: listening_service.into(),
            server_names: None,
            ipaddresses: None,
            ports: None,
            options: None,
            define_cookies: false,
            defaults: None,
            config_file: None,
        }
    }
}

pub fn render_member(
    member: &BalancerMember,
    settings: &RenderSettings,
) -> RenderResult<ConfigFragment> {
    require_value("balancermember name", &member.name)?;
    require_value("listening_service", &member.listening_service)?;

    let server_names = match &member.server_names {
        Some(names) => normalize_addresses(names),
        None => vec![member.name.clone()],
    };
    let addresses = match &member.ipaddresses {
        Some(addresses) => normalize_addresses(addresses),
        None => server_names.clone(),
    };
    if server_names.len() != addresses.len() {
        return Err(RenderError::invalid_argument(format!(
            "balancermember {}: {} server_names for {} ipaddresses",
            member.name,
            server_names.len(),
            addresses.len()
        )));
    }
    for address in &addresses {
        check_address(address)?;
    }
    let ports = match &member.ports {
        Some(ports) => normalize_ports(ports)?,
        None => Vec::new(),
    };
    for port in &ports {
        check_port(port)?;
    }
    let options = member
        .options
        .as_ref()
        .map(OneOrMany::to_vec)
        .unwrap_or_default();
    for option in &options {
        require_single_line("server option", option)?;
    }
    let options = options.join(" ");

    let mut content = String::new();
    for (server, address) in server_names.iter().zip(&addresses) {
        let cookie = if member.define_cookies {
            format!(" cookie {server}")
        } else {
            String::new()
        };
        if ports.is_empty() {
            content.push_str(&format!("  server {server} {address}{cookie} {options}\n"));
        }
        for port in &ports {
            content.push_str(&format!(
                "  server {server} {address}:{port}{cookie} {options}\n"
            ));
        }
    }

    let order = format!(
        "{}-{}",
        section_order(member.defaults.as_deref(), &member.listening_service, 1),
        member.name
    );
    debug!(
        member = %member.name,
        service = %member.listening_service,
        %order,
        "rendered balancer member"
    );
    Ok(ConfigFragment::new(
        settings.target(member.config_file.as_deref()),
        order,
        content,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_lines_follow_the_service_block() {
        let mut member = BalancerMember::new("port 5556", "backend2");
        member.server_names = Some("test00.example.com".to_string().into());
        member.defaults = Some("http".into());
        member.ports = Some(PortsInput::Text("5556".into()));

        let fragment = render_member(&member, &RenderSettings::default()).unwrap();
        assert_eq!(fragment.order, "25-http-backend2-01-port 5556");
        assert_eq!(
            fragment.content,
            "  server test00.example.com test00.example.com:5556 \n"
        );
    }

    #[test]
    fn cookies_and_options_are_appended() {
        let mut member = BalancerMember::new("web01", "app");
        member.ipaddresses = Some("10.0.0.5".to_string().into());
        member.ports = Some(PortsInput::Text("80,8080".into()));
        member.options = Some(OneOrMany::Many(vec!["check".into(), "inter 2s".into()]));
        member.define_cookies = true;

        let fragment = render_member(&member, &RenderSettings::default()).unwrap();
        assert_eq!(fragment.order, "20-app-01-web01");
        assert_eq!(
            fragment.content,
            "  server web01 10.0.0.5:80 cookie web01 check inter 2s\n  server web01 10.0.0.5:8080 cookie web01 check inter 2s\n"
        );
    }

    #[test]
    fn invalid_member_address_is_reported() {
        let mut member = BalancerMember::new("web01", "app");
        member.ipaddresses = Some("2323.23.23".to_string().into());
        let err = render_member(&member, &RenderSettings::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid IP address or hostname 2323.23.23");
    }

    #[test]
    fn multi_line_server_options_are_rejected() {
        let mut member = BalancerMember::new("web01", "app");
        member.options = Some("check\n  server rogue 10.6.6.6".to_string().into());
        let err = render_member(&member, &RenderSettings::default()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidArgument(_)));
    }
}
