//! End-to-end tests for the sdx-report binary.
//!
//! Each test writes a job (and optionally a branding file) into a temp
//! directory, runs the binary and checks exit code, files and manifest.

use assert_cmd::Command;
use predicates::prelude::*;
use sha2::{Digest, Sha256};
use std::path::Path;
use tempfile::TempDir;

fn sdx_report() -> Command {
    Command::cargo_bin("sdx-report").expect("sdx-report binary should exist")
}

const BRAND: &str = r#"
[assets]
width = 320
height = 180

[layout]
table_rows_per_page = 10
"#;

fn job_json(client: &str, with_missing_chart: bool) -> String {
    let mut charts = vec![serde_json::json!({
        "kind": "chart",
        "title": "Weekly volume",
        "mark": "line",
        "categories": ["W1", "W2", "W3", "W4"],
        "series": [{"name": "Opened", "values": [120, 134, 128, 141]}]
    })];
    if with_missing_chart {
        charts.push(serde_json::json!({
            "kind": "missing",
            "title": "Backlog age",
            "reason": "no resolved_at column"
        }));
    }
    serde_json::json!({
        "cover": {
            "client_name": client,
            "period_label": "Q3 2026",
            "generated_at": "2026-10-01T09:00:00Z"
        },
        "requested_formats": ["pdf", "docx"],
        "kpis": [{"label": "Tickets opened", "value": "523"}],
        "modules": [
            {
                "title": "Ticket volume",
                "charts": charts,
                "narrative": ["Volume rose 4% over the quarter."],
                "recommendations": {
                    "cost": [{
                        "recommendation": "Automate password resets",
                        "explanation": "Most frequent request",
                        "benefit": "Fewer tickets",
                        "cost_calculation": "300 x 0.25h",
                        "evidence": "18% of volume"
                    }]
                }
            }
        ]
    })
    .to_string()
}

fn setup(client: &str, with_missing_chart: bool) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("job.json"), job_json(client, with_missing_chart)).unwrap();
    std::fs::write(dir.path().join("brand.toml"), BRAND).unwrap();
    dir
}

fn generate(dir: &Path) -> Command {
    let mut cmd = sdx_report();
    cmd.arg("generate")
        .arg("--job")
        .arg(dir.join("job.json"))
        .arg("--brand")
        .arg(dir.join("brand.toml"))
        .arg("--out")
        .arg(dir.join("out"));
    cmd
}

fn manifest(dir: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(dir.join("out/manifest.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

mod generate {
    use super::*;

    #[test]
    fn writes_outputs_and_manifest() {
        let dir = setup("Acme", false);
        generate(dir.path()).assert().code(0);

        let pdf = std::fs::read(dir.path().join("out/report.pdf")).unwrap();
        let docx = std::fs::read(dir.path().join("out/report.docx")).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert!(docx.starts_with(b"PK"));

        let manifest = manifest(dir.path());
        assert_eq!(manifest["client_name"], "Acme");
        assert_eq!(manifest["page_count"], 3);
        assert_eq!(manifest["toc"][0]["title"], "Ticket volume");
        assert_eq!(manifest["toc"][0]["page"], 3);
        assert_eq!(manifest["warnings"].as_array().unwrap().len(), 0);

        let outputs = manifest["outputs"].as_array().unwrap();
        assert_eq!(outputs.len(), 2);
        for entry in outputs {
            let file = entry["file"].as_str().unwrap();
            let bytes = std::fs::read(dir.path().join("out").join(file)).unwrap();
            assert_eq!(entry["bytes"], bytes.len());
            assert_eq!(entry["sha256"], hex::encode(Sha256::digest(&bytes)));
        }
    }

    #[test]
    fn warnings_exit_with_one() {
        let dir = setup("Acme", true);
        generate(dir.path())
            .assert()
            .code(1)
            .stdout(predicate::str::contains("data_unavailable"));

        let manifest = manifest(dir.path());
        let warnings = manifest["warnings"].as_array().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0]["section"], "Ticket volume");
    }

    #[test]
    fn format_flag_overrides_job() {
        let dir = setup("Acme", false);
        generate(dir.path()).args(["--format", "pdf"]).assert().code(0);

        assert!(dir.path().join("out/report.pdf").exists());
        assert!(!dir.path().join("out/report.docx").exists());
    }

    #[test]
    fn outputs_are_reproducible() {
        let dir = setup("Acme", false);
        generate(dir.path()).assert().code(0);
        let first = std::fs::read(dir.path().join("out/report.docx")).unwrap();
        generate(dir.path()).assert().code(0);
        let second = std::fs::read(dir.path().join("out/report.docx")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn jsonl_logs_are_json() {
        let dir = setup("Acme", false);
        let output = generate(dir.path())
            .args(["--log-format", "jsonl"])
            .env_remove("RUST_LOG")
            .env_remove("SDX_LOG")
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(0));
        let stderr = String::from_utf8(output.stderr).unwrap();
        let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
        assert!(!lines.is_empty());
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("level").is_some());
        }
    }
}

mod errors {
    use super::*;

    #[test]
    fn blank_client_is_config_error() {
        let dir = setup("  ", false);
        generate(dir.path())
            .assert()
            .code(10)
            .stderr(predicate::str::contains("client_name"));
        assert!(!dir.path().join("out/report.pdf").exists());
    }

    #[test]
    fn missing_job_is_io_error() {
        let dir = TempDir::new().unwrap();
        sdx_report()
            .arg("generate")
            .arg("--job")
            .arg(dir.path().join("nope.json"))
            .arg("--out")
            .arg(dir.path().join("out"))
            .assert()
            .code(21);
    }

    #[test]
    fn malformed_job_is_args_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("job.json"), "{ not json").unwrap();
        sdx_report()
            .arg("validate")
            .arg("--job")
            .arg(dir.path().join("job.json"))
            .assert()
            .code(10)
            .stderr(predicate::str::contains("invalid job file"));
    }

    #[test]
    fn bad_brand_is_args_error() {
        let dir = setup("Acme", false);
        std::fs::write(dir.path().join("brand.toml"), "[layout]\ntable_rows_per_page = \"many\"").unwrap();
        generate(dir.path())
            .assert()
            .code(10)
            .stderr(predicate::str::contains("branding"));
    }

    #[test]
    fn unknown_command_is_args_error() {
        sdx_report().arg("publish").assert().code(10);
    }

    #[test]
    fn zero_rows_per_page_rejected() {
        let dir = setup("Acme", false);
        generate(dir.path())
            .args(["--rows-per-page", "0"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("table_rows_per_page"));
    }
}

mod validate {
    use super::*;

    #[test]
    fn valid_job_reports_summary() {
        let dir = setup("Acme", true);
        sdx_report()
            .arg("validate")
            .arg("--job")
            .arg(dir.path().join("job.json"))
            .arg("--brand")
            .arg(dir.path().join("brand.toml"))
            .assert()
            .code(0)
            .stdout(predicate::str::contains(r#""status":"ok""#))
            .stdout(predicate::str::contains(r#""charts":2"#));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn help_exits_clean() {
        sdx_report()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("generate"));
    }
}
