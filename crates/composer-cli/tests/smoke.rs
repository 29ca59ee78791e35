use serde_json::{Value, json};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn write_flow_file(path: &Path) {
    let document = json!({
        "flowName": "checkout",
        "model": {
            "type": "flowApplication",
            "props": {"title": "Application"},
            "children": [
                {
                    "type": "flowComponentInstance",
                    "props": {
                        "componentName": "Button",
                        "componentInstance": "submit",
                        "outputs": [{"name": "onClick"}],
                        "acceptableTypes": ["stale"]
                    },
                    "children": [{
                        "type": "flowUserFunction",
                        "props": {
                            "functionName": "sendOrder",
                            "isSelected": true,
                            "inputs": [{"name": "order", "connectedTo": "onClick"}],
                            "outputs": [{"name": "exception"}, {"name": "done"}]
                        }
                    }]
                },
                {"type": "flowPage", "props": {"pagePath": "/thanks"}}
            ]
        }
    });
    std::fs::write(path, document.to_string()).expect("flow file write should succeed");
}

fn write_page_file(path: &Path) {
    let document = json!({
        "pageName": "Home",
        "pagePath": "/",
        "componentsTree": {
            "type": "div",
            "props": {},
            "children": [
                {"type": "Button", "props": {"componentName": "Button", "componentInstance": "ok"}},
                {"type": "Button", "props": {"componentName": "Button", "componentInstance": "ok"}},
                {"type": "Link", "props": {"componentName": "Link", "componentInstance": "help"}}
            ]
        }
    });
    std::fs::write(path, document.to_string()).expect("page file write should succeed");
}

fn run_cli(args: &[&str], cwd: &Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_composer-cli"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("cli process should start")
}

fn assert_success(output: &std::process::Output) {
    assert!(
        output.status.success(),
        "stdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn inspect_command_flow_file_expected_summary() {
    let temp = TempDir::new().expect("tempdir should create");
    let flow_file = temp.path().join("checkout.json");
    write_flow_file(&flow_file);

    let output = run_cli(
        &["inspect", "--flow-file", flow_file.to_str().expect("flow path should be utf8")],
        temp.path(),
    );
    assert_success(&output);

    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf8");
    assert!(stdout.contains("flow_name: checkout"));
    assert!(stdout.contains("root_key: node1"));
    assert!(stdout.contains("nodes: 4"));
    assert!(stdout.contains("particles: 2"));
    assert!(stdout.contains("selected: node3"));
}

#[test]
fn inspect_command_json_expected_fields() {
    let temp = TempDir::new().expect("tempdir should create");
    let flow_file = temp.path().join("checkout.json");
    write_flow_file(&flow_file);

    let output = run_cli(
        &["inspect", "--flow-file", flow_file.to_str().expect("flow path should be utf8"), "--json"],
        temp.path(),
    );
    assert_success(&output);

    let value: Value = serde_json::from_slice(&output.stdout).expect("json output should parse");
    assert_eq!(value.get("node_count").and_then(Value::as_u64), Some(4));
    assert_eq!(value.get("fingerprint").and_then(Value::as_str).map(str::len), Some(64));
}

#[test]
fn normalize_command_expected_pruned_keyless_document() {
    let temp = TempDir::new().expect("tempdir should create");
    let flow_file = temp.path().join("checkout.json");
    write_flow_file(&flow_file);

    let output = run_cli(
        &["normalize", "--flow-file", flow_file.to_str().expect("flow path should be utf8")],
        temp.path(),
    );
    assert_success(&output);

    let value: Value = serde_json::from_slice(&output.stdout).expect("json output should parse");
    assert_eq!(value.get("flowName").and_then(Value::as_str), Some("checkout"));
    let text = value.to_string();
    assert!(!text.contains("acceptableTypes"));
    assert!(!text.contains("\"key\""));
    let outputs = &value["model"]["children"][0]["children"][0]["props"]["outputs"];
    assert_eq!(outputs, &json!([{"name": "done"}, {"name": "exception"}]));
}

#[test]
fn particles_command_expected_json_list() {
    let temp = TempDir::new().expect("tempdir should create");
    let flow_file = temp.path().join("checkout.json");
    write_flow_file(&flow_file);

    let output = run_cli(
        &["particles", "--flow-file", flow_file.to_str().expect("flow path should be utf8")],
        temp.path(),
    );
    assert_success(&output);

    let value: Value = serde_json::from_slice(&output.stdout).expect("json output should parse");
    let kinds: Vec<&str> = value
        .as_array()
        .expect("particles should be a list")
        .iter()
        .filter_map(|particle| particle.get("flowParticleType").and_then(Value::as_str))
        .collect();
    assert_eq!(kinds, vec!["flowComponentInstance", "flowUserFunction"]);
}

#[test]
fn instances_command_expected_unique_pairs() {
    let temp = TempDir::new().expect("tempdir should create");
    let page_file = temp.path().join("home.json");
    write_page_file(&page_file);

    let output = run_cli(
        &["instances", "--page-file", page_file.to_str().expect("page path should be utf8")],
        temp.path(),
    );
    assert_success(&output);

    let value: Value = serde_json::from_slice(&output.stdout).expect("json output should parse");
    assert_eq!(
        value,
        json!([
            {"componentName": "Button", "componentInstance": "ok"},
            {"componentName": "Link", "componentInstance": "help"}
        ])
    );
}

#[test]
fn missing_flow_file_expected_error_exit() {
    let temp = TempDir::new().expect("tempdir should create");
    let output = run_cli(&["inspect", "--flow-file", "absent.json"], temp.path());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr should be utf8");
    assert!(stderr.contains("error: failed reading 'absent.json'"));
}

#[test]
fn malformed_flow_file_expected_error_exit() {
    let temp = TempDir::new().expect("tempdir should create");
    let flow_file = temp.path().join("broken.json");
    std::fs::write(&flow_file, "{ not json").expect("flow file write should succeed");
    let output = run_cli(
        &["particles", "--flow-file", flow_file.to_str().expect("flow path should be utf8")],
        temp.path(),
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr should be utf8");
    assert!(stderr.contains("is not a flow document"));
}
