use serde::Serialize;

use crate::validate::parse_ipv4_octets;

/// One `bind` line: the address and the tokens that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindEntry {
    pub address: String,
    pub tokens: Vec<String>,
}

impl BindEntry {
    pub fn new(address: impl Into<String>, tokens: Vec<String>) -> Self {
        Self {
            address: address.into(),
            tokens,
        }
    }

    /// `  bind <address> <tokens>`; the separating space is always written,
    /// even when there are no tokens.
    pub fn render_line(&self) -> String {
        format!("  bind {} {}\n", self.address, self.tokens.join(" "))
    }
}

/// Numeric rank of the IPv4 prefix preceding the first `:`. `None` sorts
/// before every address and covers sockets, `fd@` references, wildcards,
/// hostnames and IPv6 literals.
fn ipv4_rank(address: &str) -> Option<[u8; 4]> {
    let prefix = address.split(':').next().unwrap_or_default();
    parse_ipv4_octets(prefix)
}

/// Orders bind entries by IPv4 rank. The sort is stable, so unranked entries
/// and entries with equal addresses keep their declared relative order.
pub fn sort_bind(mut entries: Vec<BindEntry>) -> Vec<BindEntry> {
    entries.sort_by_cached_key(|entry| ipv4_rank(&entry.address));
    entries
}

/// Expands `ipaddress` x `ports` into bind entries carrying `bind_options`.
pub fn binds_from_addresses(
    addresses: &[String],
    ports: &[String],
    bind_options: &[String],
) -> Vec<BindEntry> {
    addresses
        .iter()
        .flat_map(|address| {
            ports
                .iter()
                .map(move |port| BindEntry::new(format!("{address}:{port}"), bind_options.to_vec()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(entries: &[BindEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.address.as_str()).collect()
    }

    fn entries(addresses: &[&str]) -> Vec<BindEntry> {
        addresses
            .iter()
            .map(|address| BindEntry::new(*address, Vec::new()))
            .collect()
    }

    #[test]
    fn numeric_rank_beats_lexicographic_order() {
        let sorted = sort_bind(entries(&[
            "10.1.3.21:80",
            "8.252.206.100:80",
            ":443,:8443",
            "fd@${FD_APP1}",
        ]));
        assert_eq!(
            addresses(&sorted),
            vec![":443,:8443", "fd@${FD_APP1}", "8.252.206.100:80", "10.1.3.21:80"]
        );
    }

    #[test]
    fn unranked_entries_keep_declared_order() {
        let sorted = sort_bind(entries(&[
            "2.2.2.2:8000-8010",
            "/var/run/ssl-frontend.sock",
            "*:5000",
            ":443",
            "0.0.0.0:80",
        ]));
        assert_eq!(
            addresses(&sorted),
            vec![
                "/var/run/ssl-frontend.sock",
                "*:5000",
                ":443",
                "0.0.0.0:80",
                "2.2.2.2:8000-8010"
            ]
        );
    }

    #[test]
    fn equal_addresses_keep_declared_order() {
        let first = BindEntry::new("1.1.1.1:80", vec!["first".into()]);
        let second = BindEntry::new("1.1.1.1:80", vec!["second".into()]);
        let sorted = sort_bind(vec![first.clone(), second.clone()]);
        assert_eq!(sorted, vec![first, second]);
    }

    #[test]
    fn empty_tokens_leave_trailing_space() {
        assert_eq!(
            BindEntry::new("1.1.1.1:80", Vec::new()).render_line(),
            "  bind 1.1.1.1:80 \n"
        );
        assert_eq!(
            BindEntry::new("10.0.0.1:333", vec!["ssl".into(), "crt".into()]).render_line(),
            "  bind 10.0.0.1:333 ssl crt\n"
        );
    }

    #[test]
    fn expands_addresses_by_ports() {
        let binds = binds_from_addresses(
            &["23.23.23.23".to_string()],
            &["80".to_string(), "443".to_string()],
            &["ssl".to_string()],
        );
        assert_eq!(addresses(&binds), vec!["23.23.23.23:80", "23.23.23.23:443"]);
        assert!(binds.iter().all(|bind| bind.tokens == vec!["ssl".to_string()]));
    }
}
