use std::process;

use haproxy_render_core::ExitCode;

fn main() {
    match haproxy_render_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("haproxy-render error: {err:#}");
            process::exit(ExitCode::Config.code());
        }
    }
}
