use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn run(args: &[&str], stdin: &str) -> Output {
  let mut child = Command::new(env!("CARGO_BIN_EXE_apigw-enrich"))
    .args(args)
    .env_remove("RUST_LOG")
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .unwrap_or_else(|err| panic!("failed to spawn apigw-enrich: {err}"));
  child
    .stdin
    .take()
    .unwrap()
    .write_all(stdin.as_bytes())
    .unwrap();
  child.wait_with_output().unwrap()
}

fn temp_path(name: &str) -> PathBuf {
  std::env::temp_dir().join(format!("apigw-enrich-{}-{name}", std::process::id()))
}

#[test]
fn test_success() {
  let query = json!({
    "service": "MyService",
    "version": "1.0.0",
    "endpoints": json!({
      "GET /a": {
        "lambda": {"invoke_arn": "arn:a"},
        "payload_format_version": "2.0",
        "timeout_milliseconds": 3000,
      },
    })
    .to_string(),
    "cors_configuration": r#"{"allow_headers": ["X-Foo"], "allow_origins": ["*"]}"#,
  });
  let output = run(&[], &query.to_string());

  assert!(
    output.status.success(),
    "{}",
    String::from_utf8_lossy(&output.stderr)
  );
  let stdout: Value = serde_json::from_slice(&output.stdout).unwrap();
  let spec: Value =
    serde_json::from_str(stdout["json_specification"].as_str().unwrap()).unwrap();
  assert_eq!(
    spec["info"],
    json!({"title": "MyService", "version": "1.0.0"})
  );
  assert_eq!(
    spec["paths"]["/a"]["options"]["x-amazon-apigateway-integration"]["responses"]["default"]
      ["responseParameters"]["method.response.header.Access-Control-Allow-Origin"],
    json!("'*'")
  );
  assert!(output.stdout.ends_with(b"}\n"));
}

#[test]
fn test_input_failure() {
  let output = run(&[], r#"{"version": "1.0.0"}"#);
  assert_eq!(output.status.code(), Some(1));
  assert!(output.stdout.is_empty());
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(
    stderr.starts_with("Failed to read input - MissingField: missing required field `service`"),
    "{stderr}"
  );

  let output = run(&[], "not json");
  assert_eq!(output.status.code(), Some(1));

  let output = run(&["--input", "/nonexistent/apigw-enrich/query.json"], "");
  assert_eq!(output.status.code(), Some(1));

  let output = run(&["--no-such-flag"], "");
  assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_amendment_failure() {
  let query = json!({
    "service": "MyService",
    "version": "1.0.0",
    "authorizers": r#"{"token": {"iam_role_arn": "arn:role", "result_ttl_in_seconds": 300}}"#,
  });
  let output = run(&[], &query.to_string());
  assert_eq!(output.status.code(), Some(2));
  assert!(output.stdout.is_empty());
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(
    stderr.starts_with("Failed to modify OpenAPI specification - InvalidAuthorizer"),
    "{stderr}"
  );
}

#[test]
fn test_output_failure() {
  let output = run(
    &["--output", "/nonexistent/apigw-enrich/out.json"],
    r#"{"service": "s", "version": "v"}"#,
  );
  assert_eq!(output.status.code(), Some(3));
  assert!(String::from_utf8_lossy(&output.stderr).starts_with("Failed to write output"));
}

#[test]
fn test_file_input_and_output() {
  let input_path = temp_path("query.json");
  let output_path = temp_path("out.json");
  std::fs::write(&input_path, r#"{"service": "s", "version": "v"}"#).unwrap();

  let output = run(
    &[
      "--input",
      input_path.to_str().unwrap(),
      "--output",
      output_path.to_str().unwrap(),
    ],
    "",
  );
  assert!(output.status.success());
  assert!(output.stdout.is_empty());

  let written: Value = serde_json::from_slice(&std::fs::read(&output_path).unwrap()).unwrap();
  let spec: Value =
    serde_json::from_str(written["json_specification"].as_str().unwrap()).unwrap();
  assert_eq!(spec["info"]["title"], json!("s"));

  let _ = std::fs::remove_file(input_path);
  let _ = std::fs::remove_file(output_path);
}

#[test]
fn test_file_output_matches_stdout() {
  let query = r#"{"service": "s", "version": "v", "validation": "FULL"}"#;
  let output_path = temp_path("matches-stdout.json");

  let to_stdout = run(&[], query);
  assert!(to_stdout.status.success());
  let to_file = run(&["--output", output_path.to_str().unwrap()], query);
  assert!(to_file.status.success());
  assert!(to_file.stdout.is_empty());

  assert_eq!(
    String::from_utf8(std::fs::read(&output_path).unwrap()).unwrap(),
    String::from_utf8(to_stdout.stdout).unwrap()
  );

  let _ = std::fs::remove_file(output_path);
}
