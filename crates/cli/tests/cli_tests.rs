// Integration tests for the `cnpj` binary: exit codes, stdout/stderr split, and
// a full generate -> ingest -> lookup run in a temp directory.
// Run with: cargo test -p cnpj-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn cnpj(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cnpj"));
    cmd.current_dir(dir);
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("CNPJ_CONFIG");
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    cnpj(dir).args(args).output().expect("spawn cnpj")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_success(output: &Output) {
    assert!(output.status.success(), "exit code: {:?}\nstderr: {}", output.status, stderr(output));
}

/// Latin-1 raw extract rows: identifier, name, then five filler fields.
fn write_raw(dir: &Path, name: &str, rows: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    let mut bytes = Vec::new();
    for (id, company) in rows {
        bytes.extend_from_slice(id.as_bytes());
        bytes.push(b';');
        bytes.extend(company.chars().map(|c| c as u32 as u8));
        bytes.extend_from_slice(b";2062;49;0,00;05;\n");
    }
    fs::write(dir.join(name), bytes).unwrap();
}

// ---------------------------------------------------------------------------
// Version / validate
// ---------------------------------------------------------------------------

#[test]
fn version_includes_build_info() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["--version"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("cnpj "), "{stdout}");
}

#[test]
fn validate_prints_resolved_config() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("cnpj.toml"), "[lookup]\nexport = \"hits.csv\"\n").unwrap();

    let output = run(dir.path(), &["--config", "cnpj.toml", "validate", "--json"]);
    assert_success(&output);

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["ingest"]["delimiter"], ";");
    let export = config["lookup"]["export"].as_str().unwrap();
    assert!(export.ends_with("hits.csv"), "{export}");
}

#[test]
fn validate_defaults_as_toml() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["validate"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[ingest]"), "{stdout}");
    assert!(stdout.contains("encoding = \"latin1\""), "{stdout}");
}

#[test]
fn bad_config_exits_3() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("cnpj.toml"), "[ingest]\ndelimiter = \";;\"\n").unwrap();

    let output = run(dir.path(), &["--config", "cnpj.toml", "validate"]);
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("delimiter"));
}

#[test]
fn unknown_command_is_a_usage_error() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["frobnicate"]);
    assert_eq!(output.status.code(), Some(2));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn missing_input_dir_exits_4_with_hint() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["ingest", "--input", "nope"]);
    assert_eq!(output.status.code(), Some(4), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("nope"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn short_row_exits_5_naming_file_and_line() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("EMPRECSV"), "11222333;ALFA;1;2;3;4;5\n99888777;BETA\n").unwrap();

    let output = run(dir.path(), &["-q", "ingest"]);
    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("EMPRECSV") && err.contains("line 2"), "{err}");
    assert!(!input.join("../output/EMPRECSV.parquet").exists());
}

#[test]
fn unsupported_export_exits_3() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["lookup", "--export", "hits.json"]);
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

#[test]
fn generate_ingest_lookup() {
    let dir = tempdir().unwrap();
    let root = dir.path();

    let output = run(root, &["generate", "-n", "20", "--seed", "9", "--output", "cnpj/cnpjs.csv", "--json"]);
    assert_success(&output);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["count"], 20);

    let candidates = fs::read_to_string(root.join("cnpj/cnpjs.csv")).unwrap();
    let first = candidates.lines().nth(1).unwrap().to_string();
    assert_eq!(first.len(), 14);

    write_raw(
        &root.join("input"),
        "K3241.EMPRECSV",
        &[(&first[..8], "ALFA CONSTRUÇÕES"), ("00000001", "OUTRA"), ("1234", "CURTA")],
    );

    let output = run(root, &["-q", "ingest", "--json"]);
    assert_success(&output);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_rows"], 3);
    assert!(root.join("output/K3241_EMPRECSV.parquet").exists());

    let output = run(root, &["-q", "lookup", "--export", "hits.csv", "--json"]);
    assert_success(&output);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["matched"], 1);
    assert_eq!(report["rows_scanned"], 3);

    let hits = fs::read_to_string(root.join("hits.csv")).unwrap();
    assert_eq!(
        hits.lines().collect::<Vec<_>>(),
        ["CNPJ_BÁSICO,RAZÃO_SOCIAL".to_string(), format!("{},ALFA CONSTRUÇÕES", &first[..8])]
    );
}

#[test]
fn run_logs_to_stderr_and_reports_to_stdout() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_raw(&root.join("input"), "A", &[("11222333000199", "Alpha Ltd"), ("99888777000100", "Beta Ltd")]);
    fs::create_dir_all(root.join("cnpj")).unwrap();
    fs::write(root.join("cnpj/cnpjs.csv"), "ds_cnpj_usuf\n11222333000181\n").unwrap();

    let output = run(root, &["run", "--json"]);
    assert_success(&output);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["lookup"]["matched"], 1);
    assert!(report["ingest"]["files"][0]["blake3"].as_str().unwrap().len() == 64);
    assert!(stderr(&output).contains("pipeline finished"), "{}", stderr(&output));
    assert!(root.join("nome_cnpj.xlsx").exists());
}
