//! Address, port and parameter-combination checks.
//!
//! Predicates return plain booleans; the `check_*` helpers turn a failed
//! predicate into a fatal [`RenderError`] carrying the exact message HAProxy
//! operators grep for.

use std::net::Ipv6Addr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{RenderError, RenderResult};

const PORT_MIN: i64 = 1;
const PORT_MAX: i64 = 65535;

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.-]*$").expect("hostname pattern compiles")
    })
}

/// Parses a strict dotted quad (`a.b.c.d`, each octet 0-255, at most three
/// digits). Shared with the bind sorter so both agree on what an IPv4 is.
pub fn parse_ipv4_octets(value: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = value.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

/// True for IPv4 dotted quads, IPv6 literals, `*`, and plain hostnames.
pub fn validate_address_or_host(value: &str) -> bool {
    if value == "*" {
        return true;
    }

    if value.contains(':') {
        let literal = value
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(value);
        return literal.parse::<Ipv6Addr>().is_ok();
    }

    // Digits and dots only means the caller meant an IPv4 address; do not let
    // the hostname rule accept `256.168.0.1` or `2323.23.23`.
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return parse_ipv4_octets(value).is_some();
    }

    hostname_pattern().is_match(value)
}

pub fn validate_port(value: i64) -> bool {
    (PORT_MIN..=PORT_MAX).contains(&value)
}

/// Raises the fatal error for `text`. An absent or empty message is itself a
/// caller defect and is reported as an invalid argument.
pub fn build_error_message(text: Option<&str>) -> RenderError {
    match text {
        Some(text) if !text.is_empty() => RenderError::Validation(text.to_string()),
        _ => RenderError::invalid_argument("error message text is required"),
    }
}

pub fn check_address(value: &str) -> RenderResult<()> {
    if validate_address_or_host(value) {
        Ok(())
    } else {
        Err(build_error_message(Some(&format!(
            "Invalid IP address or hostname {value}"
        ))))
    }
}

/// Validates a normalized port string and returns its numeric form.
pub fn check_port(value: &str) -> RenderResult<u16> {
    // Digit strings too long for i64 are out of range by definition.
    let number = value.parse::<i64>().unwrap_or(i64::MAX);
    if validate_port(number) {
        Ok(number as u16)
    } else {
        Err(build_error_message(Some(&format!(
            "Port {value} is outside of range 1-65535"
        ))))
    }
}

/// Fails loudly when a required value is blank instead of rendering it.
pub fn require_value(what: &str, value: &str) -> RenderResult<()> {
    if value.trim().is_empty() {
        return Err(RenderError::invalid_argument(format!("{what} is required")));
    }
    Ok(())
}

/// Rejects values that would spill onto a second line of the rendered file.
pub fn require_single_line(what: &str, value: &str) -> RenderResult<()> {
    if value.contains(['\n', '\r']) {
        return Err(RenderError::invalid_argument(format!(
            "{what} {value:?} must not contain line breaks"
        )));
    }
    Ok(())
}

/// A named parameter and whether the caller supplied it.
#[derive(Debug, Clone, Copy)]
pub struct Param<'a> {
    pub name: &'a str,
    pub supplied: bool,
}

impl<'a> Param<'a> {
    pub fn new(name: &'a str, supplied: bool) -> Self {
        Self { name, supplied }
    }
}

pub fn check_mutual_exclusion(first: Param<'_>, second: Param<'_>) -> RenderResult<()> {
    if first.supplied && second.supplied {
        return Err(build_error_message(Some(&format!(
            "{} and {} are mutually exclusive",
            first.name, second.name
        ))));
    }
    Ok(())
}

pub fn check_required(first: Param<'_>, second: Param<'_>) -> RenderResult<()> {
    if !first.supplied && !second.supplied {
        return Err(build_error_message(Some(&format!(
            "{} or {} is needed",
            first.name, second.name
        ))));
    }
    Ok(())
}

/// Exactly one of the two parameters must be supplied.
pub fn check_exclusive_pair(first: Param<'_>, second: Param<'_>) -> RenderResult<()> {
    check_mutual_exclusion(first, second)?;
    check_required(first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_addresses_and_hostnames() {
        for value in [
            "10.0.0.10",
            "0.0.0.0",
            "255.255.255.255",
            "*",
            "some-hostname",
            "lb01.example.com",
            "::1",
            "2001:db8::10",
            "[fe80::1]",
        ] {
            assert!(validate_address_or_host(value), "{value} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for value in [
            "256.168.0.1",
            "2323.23.23",
            "1.2.3.4.5",
            ":::6",
            "$some_hostname",
            "-leading-dash",
            "under_score",
            "",
        ] {
            assert!(!validate_address_or_host(value), "{value} should be invalid");
        }
    }

    #[test]
    fn port_range_is_inclusive() {
        assert!(validate_port(1));
        assert!(validate_port(65535));
        assert!(!validate_port(0));
        assert!(!validate_port(65536));
        assert!(!validate_port(181400));
    }

    #[test]
    fn check_port_reports_input_text() {
        let err = check_port("80443").unwrap_err();
        assert_eq!(err.to_string(), "Port 80443 is outside of range 1-65535");
        let err = check_port("99999999999999999999999").unwrap_err();
        assert!(err.to_string().contains("outside of range 1-65535"));
        assert_eq!(check_port("443").unwrap(), 443);
    }

    #[test]
    fn error_message_is_reproduced_or_rejected() {
        assert_eq!(
            build_error_message(Some("Invalid IP address or hostname 2323.23.23")),
            RenderError::Validation("Invalid IP address or hostname 2323.23.23".into())
        );
        assert!(matches!(
            build_error_message(None),
            RenderError::InvalidArgument(_)
        ));
        assert!(matches!(
            build_error_message(Some("")),
            RenderError::InvalidArgument(_)
        ));
    }

    #[test]
    fn line_breaks_are_rejected() {
        assert!(require_single_line("option value", "X-Forwarded-Proto https").is_ok());
        let err = require_single_line("option value", "a\nb").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: option value \"a\\nb\" must not contain line breaks"
        );
        assert!(require_single_line("bind token", "ssl\r").is_err());
    }

    #[test]
    fn exclusive_pair_reports_both_failure_modes() {
        let both = check_exclusive_pair(Param::new("ipaddress", true), Param::new("bind", true))
            .unwrap_err();
        assert_eq!(both.to_string(), "ipaddress and bind are mutually exclusive");

        let neither =
            check_exclusive_pair(Param::new("ipaddress", false), Param::new("bind", false))
                .unwrap_err();
        assert_eq!(neither.to_string(), "ipaddress or bind is needed");

        assert!(
            check_exclusive_pair(Param::new("ipaddress", false), Param::new("bind", true)).is_ok()
        );
    }
}
