//! Shared fixtures for haproxy-render tests.

use haproxy_render_config::Config;
use haproxy_render_core::{RenderOutput, Renderer};

/// Declarations covering every block kind, rendered into `/etc/haproxy`.
pub const SITE_TOML: &str = r#"
[global]

[[defaults]]
name = "http"
options = { mode = "http" }

[[listen]]
name = "croy"
ipaddress = "1.1.1.1"
ports = "18140"

[[backend]]
name = "backend2"
defaults = "http"

[[balancermember]]
name = "port 5556"
listening_service = "backend2"
server_names = "test00.example.com"
defaults = "http"
ports = "5556"

[[peers]]
name = "tyler"

[[peer]]
name = "dero"
peers_name = "tyler"
ipaddresses = "1.1.1.1"
port = 1024

[[mapfile]]
name = "domains-to-backends"
mappings = [{ "app01.example.com" = "bk_app01" }]

[[mapfile_entry]]
name = "example.com example-backend"
mapfile = "domains-to-backends"
"#;

/// Rendered `/etc/haproxy/haproxy.cfg` for [`SITE_TOML`].
pub const SITE_CONFIG: &str = "global\n  log 127.0.0.1 local0\n  chroot /var/lib/haproxy\n  pidfile /var/run/haproxy.pid\n  maxconn 4000\n  user haproxy\n  group haproxy\n  daemon\n  stats socket /var/lib/haproxy/stats\n\nlisten croy\n  bind 1.1.1.1:18140 \n  balance roundrobin\n  option tcplog\n\n\ndefaults http\n  mode http\n\nbackend backend2\n  balance roundrobin\n  option tcplog\n  server test00.example.com test00.example.com:5556 \n\npeers tyler\n  peer dero 1.1.1.1:1024\n";

/// Rendered `/etc/haproxy/domains-to-backends.map` for [`SITE_TOML`].
pub const SITE_MAP: &str = "app01.example.com bk_app01\nexample.com example-backend\n";

/// Parses `contents` on top of the defaults and renders it, panicking on failure.
pub fn render_toml(contents: &str) -> RenderOutput {
    let config = Config::parse(contents).expect("fixture config parses");
    Renderer::new(&config.settings)
        .render(&config.declarations)
        .expect("fixture config renders")
}
