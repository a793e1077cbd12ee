use serde::Serialize;

/// A named, ordered chunk of rendered configuration text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigFragment {
    pub target: String,
    pub order: String,
    pub content: String,
}

impl ConfigFragment {
    pub fn new(
        target: impl Into<String>,
        order: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            order: order.into(),
            content: content.into(),
        }
    }
}

/// Two-digit zero-padded sub-index used inside order keys.
pub fn sub_index(index: u8) -> String {
    format!("{index:02}")
}

/// Order key for a proxy section or one of its members. Sections bound to a
/// named defaults block sort right after that block.
pub fn section_order(defaults: Option<&str>, name: &str, index: u8) -> String {
    match defaults {
        Some(defaults) => format!("25-{defaults}-{name}-{}", sub_index(index)),
        None => format!("20-{name}-{}", sub_index(index)),
    }
}

pub fn defaults_order(name: &str) -> String {
    format!("25-{name}")
}

pub const GLOBAL_ORDER: &str = "10-global";

pub fn peers_order(peers_name: &str) -> String {
    format!("30-peers-00-{peers_name}")
}

pub fn peer_order(peers_name: &str, hostname: &str) -> String {
    format!("30-peers-01-{peers_name}-{hostname}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_keys_follow_block_conventions() {
        assert_eq!(section_order(None, "apache", 0), "20-apache-00");
        assert_eq!(section_order(Some("http"), "apache", 1), "25-http-apache-01");
        assert_eq!(defaults_order("test"), "25-test");
        assert_eq!(peer_order("tyler", "dero"), "30-peers-01-tyler-dero");
        assert!(peers_order("tyler") < peer_order("tyler", "dero"));
        assert!(defaults_order("http") < section_order(Some("http"), "apache", 0));
    }
}
