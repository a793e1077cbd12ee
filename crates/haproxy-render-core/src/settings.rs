/// Rendering settings threaded explicitly through every renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    /// Main configuration file every block targets unless it overrides it.
    pub config_file: String,
    /// Directory holding `<name>.map` files.
    pub map_dir: String,
    /// Sort keyed option tables alphabetically when a block does not say.
    pub sort_options_alphabetic: bool,
    /// Merge builtin options into `defaults`/`global` when a block does not say.
    pub merge_options: bool,
    /// Address written into the builtin `global` `log` line.
    pub log_address: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            config_file: "/etc/haproxy/haproxy.cfg".to_string(),
            map_dir: "/etc/haproxy".to_string(),
            sort_options_alphabetic: true,
            merge_options: false,
            log_address: "127.0.0.1".to_string(),
        }
    }
}

impl RenderSettings {
    pub fn target<'a>(&'a self, config_file: Option<&'a str>) -> &'a str {
        config_file.unwrap_or(&self.config_file)
    }

    pub fn map_path(&self, name: &str) -> String {
        format!("{}/{name}.map", self.map_dir.trim_end_matches('/'))
    }
}
