use serde::Serialize;

/// One option keyword and the values it is written with, one line per value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionEntry {
    pub key: String,
    pub values: Vec<String>,
}

impl OptionEntry {
    pub fn new(key: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, vec![value.into()])
    }

    pub fn render_lines(&self, out: &mut String) {
        for value in &self.values {
            if value.is_empty() {
                out.push_str(&format!("  {}\n", self.key));
            } else {
                out.push_str(&format!("  {} {}\n", self.key, value));
            }
        }
    }
}

/// Built-in options appended to a `defaults` section when merging is enabled.
pub const DEFAULTS_BUILTIN_OPTIONS: &[(&str, &[&str])] = &[
    ("log", &["global"]),
    ("maxconn", &["8000"]),
    ("option", &["redispatch"]),
    ("retries", &["3"]),
    ("stats", &["enable"]),
    (
        "timeout",
        &[
            "http-request 10s",
            "queue 1m",
            "connect 10s",
            "client 1m",
            "server 1m",
            "check 10s",
        ],
    ),
];

/// Built-in `global` options. `log` is filled from the explicit log address.
pub const GLOBAL_BUILTIN_OPTIONS: &[(&str, &[&str])] = &[
    ("chroot", &["/var/lib/haproxy"]),
    ("pidfile", &["/var/run/haproxy.pid"]),
    ("maxconn", &["4000"]),
    ("user", &["haproxy"]),
    ("group", &["haproxy"]),
    ("daemon", &[""]),
    ("stats", &["socket /var/lib/haproxy/stats"]),
];

pub fn table_entries(table: &[(&str, &[&str])]) -> Vec<OptionEntry> {
    table
        .iter()
        .map(|(key, values)| {
            OptionEntry::new(*key, values.iter().map(|value| value.to_string()).collect())
        })
        .collect()
}

pub fn defaults_builtin() -> Vec<OptionEntry> {
    table_entries(DEFAULTS_BUILTIN_OPTIONS)
}

pub fn global_builtin(log_address: &str) -> Vec<OptionEntry> {
    let mut entries = vec![OptionEntry::single("log", format!("{log_address} local0"))];
    entries.extend(table_entries(GLOBAL_BUILTIN_OPTIONS));
    entries
}

/// Appends every builtin entry whose key is absent from `declared`.
/// Declared entries always win and keep their position.
pub fn merge_options(
    declared: Vec<OptionEntry>,
    builtin: &[OptionEntry],
    merge_enabled: bool,
) -> Vec<OptionEntry> {
    if !merge_enabled {
        return declared;
    }

    let missing: Vec<OptionEntry> = builtin
        .iter()
        .filter(|entry| !declared.iter().any(|existing| existing.key == entry.key))
        .cloned()
        .collect();

    let mut merged = declared;
    merged.extend(missing);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(entries: &[OptionEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.key.as_str()).collect()
    }

    #[test]
    fn disabled_merge_returns_declared() {
        let declared = vec![OptionEntry::single("balance", "roundrobin")];
        let merged = merge_options(declared.clone(), &defaults_builtin(), false);
        assert_eq!(merged, declared);
    }

    #[test]
    fn declared_keys_win_and_keep_position() {
        let declared = vec![
            OptionEntry::single("timeout", "client 5m"),
            OptionEntry::single("balance", "roundrobin"),
        ];
        let merged = merge_options(declared, &defaults_builtin(), true);
        assert_eq!(
            keys(&merged),
            vec!["timeout", "balance", "log", "maxconn", "option", "retries", "stats"]
        );
        assert_eq!(merged[0].values, vec!["client 5m".to_string()]);
    }

    #[test]
    fn key_comparison_is_case_sensitive() {
        let declared = vec![OptionEntry::single("LOG", "127.0.0.1")];
        let merged = merge_options(declared, &defaults_builtin(), true);
        assert!(keys(&merged).contains(&"log"));
    }

    #[test]
    fn empty_value_renders_bare_keyword() {
        let mut out = String::new();
        OptionEntry::single("daemon", "").render_lines(&mut out);
        OptionEntry::new("acl", vec!["a".into(), "b".into()]).render_lines(&mut out);
        assert_eq!(out, "  daemon\n  acl a\n  acl b\n");
    }

    #[test]
    fn global_builtin_leads_with_log_address() {
        let entries = global_builtin("10.0.0.5");
        assert_eq!(entries[0], OptionEntry::single("log", "10.0.0.5 local0"));
        assert_eq!(entries.len(), GLOBAL_BUILTIN_OPTIONS.len() + 1);
    }
}
