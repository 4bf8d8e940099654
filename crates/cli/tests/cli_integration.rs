use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn make_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before UNIX_EPOCH")
        .as_nanos();
    let pid = std::process::id();
    let dir = std::env::temp_dir().join(format!("golem-desk-integ-{prefix}-{pid}-{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn golem_desk(dir: &PathBuf) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_golem-desk"));
    cmd.current_dir(dir)
        .env_remove("GOLEM_DESK_CLI")
        .env_remove("GOLEM_DESK_PROFILE")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} failed:\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        out.status,
        stdout(out),
        stderr(out),
    );
}

#[test]
fn help_works() {
    let dir = make_temp_dir("help");
    let out = golem_desk(&dir)
        .arg("--help")
        .output()
        .expect("failed to run golem-desk --help");
    assert_success(&out, "golem-desk --help");
    let text = stdout(&out);
    assert!(
        text.contains("golem-desk") && text.contains("invoke") && text.contains("skeleton"),
        "unexpected help output:\n{text}"
    );
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn init_writes_settings() {
    let dir = make_temp_dir("init");
    let out = golem_desk(&dir)
        .arg("init")
        .arg(&dir)
        .output()
        .expect("failed to run golem-desk init");
    assert_success(&out, "golem-desk init");

    let contents = fs::read_to_string(dir.join("golem-desk.json")).expect("settings not written");
    let json: serde_json::Value = serde_json::from_str(&contents).expect("settings are not JSON");
    assert_eq!(json["schemaVersion"], 1);
    assert_eq!(json["golemCli"], "golem");
    assert_eq!(json["profile"], "local");

    let again = golem_desk(&dir)
        .arg("init")
        .arg(&dir)
        .output()
        .expect("failed to run golem-desk init");
    assert!(!again.status.success(), "second init should refuse to overwrite");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn skeleton_for_type() {
    let dir = make_temp_dir("skeleton");
    let out = golem_desk(&dir)
        .args([
            "skeleton",
            "--type",
            "record { qty: u32, priority: enum { high, medium, low }, note: option<string> }",
        ])
        .output()
        .expect("failed to run golem-desk skeleton");
    assert_success(&out, "golem-desk skeleton");
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("not JSON");
    assert_eq!(
        value,
        serde_json::json!({ "qty": 0, "priority": "low", "note": null })
    );
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn validate_reports_field_errors() {
    let dir = make_temp_dir("validate");
    let ok = golem_desk(&dir)
        .args(["validate", "--type", "u8", "--value", "255"])
        .output()
        .expect("failed to run golem-desk validate");
    assert_success(&ok, "golem-desk validate");

    let bad = golem_desk(&dir)
        .args([
            "validate",
            "--type",
            "record { qty: u32 }",
            "--value",
            r#"{"qty": -5}"#,
            "--field",
            "item",
        ])
        .output()
        .expect("failed to run golem-desk validate");
    assert!(!bad.status.success(), "negative u32 should be rejected");
    let err = stderr(&bad);
    assert!(
        err.contains("item.qty") && err.contains("unsigned 32-bit"),
        "unexpected stderr:\n{err}"
    );
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn encode_with_and_without_type() {
    let dir = make_temp_dir("encode");
    let untyped = golem_desk(&dir)
        .args(["encode", "--value", r#"{"b": 1, "a": "x"}"#])
        .output()
        .expect("failed to run golem-desk encode");
    assert_success(&untyped, "golem-desk encode");
    assert_eq!(stdout(&untyped).trim_end(), r#"{b: 1, a: "x"}"#);

    let typed = golem_desk(&dir)
        .args(["encode", "--value", r#""low""#, "--type", "enum { low, high }"])
        .output()
        .expect("failed to run golem-desk encode");
    assert_success(&typed, "golem-desk encode --type");
    assert_eq!(stdout(&typed).trim_end(), "low");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn invoke_dry_run_prints_golem_command() {
    let dir = make_temp_dir("invoke-dry");
    let out = golem_desk(&dir)
        .args([
            "invoke",
            "--signature",
            "shop:cart/api.{add}(item: record { qty: u32 }, priority: enum { low, medium, high })",
            "-w",
            "cart-1",
            "--args",
            r#"{"item": {"qty": 2}}"#,
            "--dry-run",
        ])
        .output()
        .expect("failed to run golem-desk invoke");
    assert_success(&out, "golem-desk invoke --dry-run");
    assert_eq!(
        stdout(&out).trim_end(),
        "golem worker invoke cart-1 'shop:cart/api.{add}' '{qty: 2}' low"
    );
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn invoke_with_invalid_args_does_not_run_golem() {
    let dir = make_temp_dir("invoke-invalid");
    fs::write(
        dir.join("golem-desk.json"),
        r#"{ "schemaVersion": 1, "golemCli": "/nonexistent/golem" }"#,
    )
    .expect("failed to write settings");

    let out = golem_desk(&dir)
        .args([
            "invoke",
            "--signature",
            "add(item: record { qty: u32 }, note: string)",
            "-w",
            "cart-1",
            "--arg",
            r#"item={"qty": -5}"#,
            "--arg",
            "note=not json",
        ])
        .output()
        .expect("failed to run golem-desk invoke");
    assert!(!out.status.success(), "invalid arguments should fail");
    let err = stderr(&out);
    assert!(err.contains("2 parameter(s) failed validation"), "{err}");
    assert!(err.contains("qty") && err.contains("unsigned"), "{err}");
    assert!(err.contains("not valid JSON"), "{err}");
    assert!(!err.contains("failed to run"), "golem was spawned:\n{err}");
    let _ = fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn invoke_runs_configured_golem_binary() {
    use std::os::unix::fs::PermissionsExt;

    let dir = make_temp_dir("invoke-run");
    let script = dir.join("fake-golem.sh");
    fs::write(&script, "#!/bin/sh\nfor a in \"$@\"; do echo \"[$a]\"; done\n")
        .expect("failed to write fake golem");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
        .expect("failed to chmod fake golem");
    fs::write(
        dir.join("golem-desk.json"),
        format!(
            r#"{{ "schemaVersion": 1, "golemCli": "{}", "profile": "local" }}"#,
            script.display()
        ),
    )
    .expect("failed to write settings");

    let out = golem_desk(&dir)
        .args([
            "invoke",
            "--signature",
            "api.{tag}(labels: list<string>, due: option<u64>)",
            "-w",
            "w-1",
            "--args",
            r#"{"labels": ["a b"]}"#,
        ])
        .output()
        .expect("failed to run golem-desk invoke");
    assert_success(&out, "golem-desk invoke");
    let lines: Vec<String> = stdout(&out).lines().map(String::from).collect();
    assert_eq!(
        lines,
        vec![
            "[--profile]",
            "[local]",
            "[worker]",
            "[invoke]",
            "[w-1]",
            "[api.{tag}]",
            "[[\"a b\"]]",
            "[none]",
        ]
    );
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn exports_lists_metadata_functions() {
    let dir = make_temp_dir("exports");
    let metadata = dir.join("metadata.json");
    fs::write(
        &metadata,
        r#"{
  "exports": [
    {
      "name": "shop:cart/api",
      "functions": [
        {
          "name": "add",
          "parameters": [{ "name": "qty", "typ": { "type": "U32" } }],
          "results": [{ "name": null, "typ": { "type": "Bool" } }]
        }
      ]
    }
  ]
}"#,
    )
    .expect("failed to write metadata");

    let out = golem_desk(&dir)
        .arg("exports")
        .arg("--metadata")
        .arg(&metadata)
        .output()
        .expect("failed to run golem-desk exports");
    assert_success(&out, "golem-desk exports");
    assert_eq!(
        stdout(&out).trim_end(),
        "shop:cart/api.{add}(qty: u32) -> bool"
    );
    let _ = fs::remove_dir_all(&dir);
}
