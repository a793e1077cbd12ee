use std::fs;
use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use haproxy_render_test_support::{render_toml, SITE_CONFIG, SITE_MAP, SITE_TOML};
use predicates::prelude::*;
use tempfile::TempDir;

fn setup_file(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    let mut file = fs::File::create(&path).expect("create file");
    file.write_all(contents.as_bytes()).expect("write file");
}

/// Working directory whose declarations render into `out/`.
fn site() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    setup_file(
        temp.path(),
        "haproxy-render.toml",
        &format!("[settings]\nconfig_file = \"out/haproxy.cfg\"\nmap_dir = \"out\"\n{SITE_TOML}"),
    );
    temp
}

fn haproxy_render(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("haproxy-render").expect("binary");
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn render_prints_every_file_with_a_header() {
    let temp = site();
    let output = haproxy_render(temp.path())
        .arg("render")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).expect("stdout utf8");
    assert_eq!(
        stdout,
        format!(
            "# ==> out/domains-to-backends.map <==\n{SITE_MAP}# ==> out/haproxy.cfg <==\n{SITE_CONFIG}"
        )
    );
}

#[test]
fn render_matches_the_library_output() {
    let temp = site();
    let expected = render_toml(SITE_TOML)
        .file("/etc/haproxy/haproxy.cfg")
        .expect("config rendered")
        .content
        .clone();
    assert_eq!(expected, SITE_CONFIG);

    haproxy_render(temp.path())
        .args(["render", "--target", "out/haproxy.cfg"])
        .assert()
        .success()
        .stdout(predicate::eq(expected));
}

#[test]
fn render_target_prints_exact_file_content() {
    let temp = site();
    haproxy_render(temp.path())
        .args(["render", "--target", "out/haproxy.cfg"])
        .assert()
        .success()
        .stdout(predicate::eq(SITE_CONFIG));
}

#[test]
fn render_unknown_target_is_an_invalid_argument() {
    let temp = site();
    haproxy_render(temp.path())
        .args(["render", "--target", "out/nothing.cfg"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("nothing renders into out/nothing.cfg"));
}

#[test]
fn render_json_includes_fragments() {
    let temp = site();
    let output = haproxy_render(temp.path())
        .args(["render", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let payload: serde_json::Value = serde_json::from_slice(&output).expect("json output");
    let orders: Vec<&str> = payload["fragments"]
        .as_array()
        .expect("fragments array")
        .iter()
        .filter_map(|fragment| fragment["order"].as_str())
        .collect();
    assert!(orders.contains(&"30-peers-01-tyler-dero"));
    assert_eq!(payload["files"][1]["target"], "out/haproxy.cfg");
    assert_eq!(payload["files"][1]["content"], SITE_CONFIG);
}

#[test]
fn check_reports_missing_then_clean_files() {
    let temp = site();
    haproxy_render(temp.path())
        .arg("check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("out/haproxy.cfg: missing"));

    setup_file(temp.path(), "out/haproxy.cfg", SITE_CONFIG);
    setup_file(temp.path(), "out/domains-to-backends.map", SITE_MAP);
    haproxy_render(temp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: 2 file(s) up to date"));
}

#[test]
fn check_diff_shows_drift() {
    let temp = site();
    setup_file(
        temp.path(),
        "out/haproxy.cfg",
        &SITE_CONFIG.replace("maxconn 4000", "maxconn 10"),
    );
    setup_file(temp.path(), "out/domains-to-backends.map", SITE_MAP);

    haproxy_render(temp.path())
        .args(["check", "--diff"])
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("-  maxconn 10")
                .and(predicate::str::contains("+  maxconn 4000"))
                .and(predicate::str::contains("b/out/haproxy.cfg")),
        );

    haproxy_render(temp.path())
        .args(["check", "--quiet"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn validate_reports_ok_or_the_render_error() {
    let temp = site();
    haproxy_render(temp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ok"));

    setup_file(
        temp.path(),
        "broken.toml",
        "[[listen]]\nname = \"web\"\nipaddress = \"10.0.0.1\"\nports = \"80443\"\n",
    );
    haproxy_render(temp.path())
        .args(["--config", "broken.toml", "validate"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Port 80443 is outside of range 1-65535",
        ));
}

#[test]
fn config_problems_map_to_exit_codes() {
    let temp = site();
    haproxy_render(temp.path())
        .args(["--config", "missing.toml", "validate"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not found"));

    setup_file(
        temp.path(),
        "dangling.toml",
        "[[mapfile_entry]]\nname = \"a b\"\nmapfile = \"nowhere\"\n",
    );
    haproxy_render(temp.path())
        .args(["--config", "dangling.toml", "validate"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("references unknown mapfile 'nowhere'"));
}

#[test]
fn working_dir_flag_replaces_current_directory() {
    let temp = site();
    let elsewhere = TempDir::new().expect("tempdir");
    let working_dir = temp.path().to_str().expect("utf8 path");
    haproxy_render(elsewhere.path())
        .args(["--working-dir", working_dir, "render", "--target", "out/domains-to-backends.map"])
        .assert()
        .success()
        .stdout(predicate::eq(SITE_MAP));
}
