use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn netconsole(dir: &Path) -> Command {
    let config = dir.join("netconsole.toml");
    if !config.exists() {
        fs::write(&config, "").expect("write config");
    }
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("netconsole"));
    cmd.env_remove("SSH_CONNECTION")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(config)
        .arg("--interfaces")
        .arg(dir.join("interfaces"))
        .arg("--resolv-conf")
        .arg(dir.join("resolv.conf"))
        .arg("--dhcp-state-dir")
        .arg(dir.join("interface"));
    cmd
}

fn copy_fixture(dir: &Path, name: &str) {
    fs::copy(
        fixture(&format!("fixtures/interfaces/{name}")),
        dir.join("interfaces"),
    )
    .expect("copy fixture");
}

#[test]
fn list_hides_loopback_and_marks_default() {
    let dir = tempdir().expect("tempdir");
    copy_fixture(dir.path(), "appliance");

    netconsole(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("eth0  192.168.1.10 (static) [*]"))
        .stdout(predicate::str::contains("eth1  (dhcp)"))
        .stdout(predicate::str::contains("lo").not());
}

#[test]
fn list_all_includes_virtual_adapters() {
    let dir = tempdir().expect("tempdir");
    copy_fixture(dir.path(), "appliance");

    netconsole(dir.path())
        .args(["list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lo    (loopback)"));
}

#[test]
fn list_shows_bridged_default_instead_of_its_ports() {
    let dir = tempdir().expect("tempdir");
    copy_fixture(dir.path(), "bridged");
    fs::write(dir.path().join("netconsole.toml"), "default_nic = \"br0\"\n")
        .expect("write config");

    netconsole(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("br0   10.20.0.1 (static) [*]"))
        .stdout(predicate::str::contains("eth1  not configured"))
        .stdout(predicate::str::contains("eth0").not());
}

#[test]
fn list_json_reports_every_visible_adapter() {
    let dir = tempdir().expect("tempdir");
    copy_fixture(dir.path(), "appliance");

    let output = netconsole(dir.path())
        .args(["list", "--format", "json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let rows: Value = serde_json::from_slice(&output.stdout).expect("json");
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "eth0");
    assert_eq!(rows[0]["default"], true);
    assert_eq!(rows[1]["method"], "dhcp");
    assert_eq!(rows[1]["address"], Value::Null);
}

#[test]
fn show_static_adapter_with_static_nameservers() {
    let dir = tempdir().expect("tempdir");
    copy_fixture(dir.path(), "appliance");

    netconsole(dir.path())
        .args(["show", "eth0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IP Address:      192.168.1.10"))
        .stdout(predicate::str::contains("Netmask:         255.255.255.0"))
        .stdout(predicate::str::contains("Default Gateway: 192.168.1.1"))
        .stdout(predicate::str::contains(
            "Name Server(s):  8.8.8.8 8.8.4.4 (static)",
        ))
        .stdout(predicate::str::contains(
            "Networking configuration method: static",
        ));
}

#[test]
fn show_json_uses_dhcp_resolver_state() {
    let dir = tempdir().expect("tempdir");
    copy_fixture(dir.path(), "appliance");
    fs::create_dir(dir.path().join("interface")).expect("mkdir");
    fs::write(
        dir.path().join("interface/eth1.dhclient"),
        "nameserver 192.168.50.1\n",
    )
    .expect("write lease");
    fs::write(dir.path().join("resolv.conf"), "nameserver 127.0.0.53\n").expect("write");

    let output = netconsole(dir.path())
        .args(["show", "eth1", "--format", "json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["method"], "dhcp");
    assert_eq!(report["nameservers"]["source"], "dhcp-resolver");
    assert_eq!(report["nameservers"]["nameservers"][0], "192.168.50.1");
}

#[test]
fn show_unknown_adapter_fails() {
    let dir = tempdir().expect("tempdir");
    copy_fixture(dir.path(), "appliance");

    netconsole(dir.path())
        .args(["show", "eth9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("interface eth9 is not configured"));
}

#[test]
fn nameservers_fall_back_to_system_resolver() {
    let dir = tempdir().expect("tempdir");
    copy_fixture(dir.path(), "appliance");
    fs::copy(
        fixture("fixtures/resolver/resolv.conf"),
        dir.path().join("resolv.conf"),
    )
    .expect("copy resolv.conf");

    netconsole(dir.path())
        .args(["nameservers", "eth7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.1.1.1 1.0.0.1 (system-resolver)"));
}

#[test]
fn nameservers_without_any_source_prints_none() {
    let dir = tempdir().expect("tempdir");

    netconsole(dir.path())
        .args(["nameservers", "eth0", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"source\": \"none\""));
}

#[test]
fn option_outside_stanza_is_reported_with_line() {
    let dir = tempdir().expect("tempdir");
    copy_fixture(dir.path(), "orphan-option");

    netconsole(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"))
        .stderr(predicate::str::contains("address"));
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempdir().expect("tempdir");
    copy_fixture(dir.path(), "appliance");

    Command::new(assert_cmd::cargo::cargo_bin!("netconsole"))
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--interfaces")
        .arg(dir.path().join("interfaces"))
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load console config"));
}
