// End-to-end runs of the `apaper` binary: exit codes, stdout JSON, files on
// disk. Run with: cargo test -p auditpaper-cli --test cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use auditpaper_engine::{CellAddress, Workbook, Worksheet};
use auditpaper_io::write_workbook;

const HEADER: &str = "TRADENAME,UIFREFERENCENUMBER,SHUTDOWN_FROM,SHUTDOWN_TILL,IDNUMBER,FIRSTNAME,LASTNAME,EMPLOYMENTSTARTDATE,TERMINATIONDATE,PAYMENT_STATUS_ID,PAYMENTMEDIUMID,BANK_PAY_AMOUNT,LEAVE_INCOME,MONTHLY_SALARY,PAYMENTDATE,PAY_REF_ITR_1";

/// The binary with a private, empty config directory.
fn apaper(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_apaper"));
    cmd.env_remove("APAPER_CONFIG")
        .env_remove("APAPER_CONSULTANT")
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("apaper runs")
}

fn code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}

fn export(dir: &Path, name: &str, reference: &str) -> PathBuf {
    let path = dir.join(name);
    let body = format!(
        "{HEADER}\n\
         Acme Bakery,{reference},2020-03-27,2020-04-16,8001,Thandi,Zulu,2015-02-01,,3,2,1000,0,5000,2020-05-02,REF-A\n\
         Acme Bakery,{reference},2020-03-27,2020-04-16,7002,Pieter,Botha,2018-09-15,,3,2,750.50,0,4200,2020-05-02,REF-B\n"
    );
    std::fs::write(&path, body).unwrap();
    path
}

fn narrow_export(dir: &Path) -> PathBuf {
    let path = dir.join("narrow.csv");
    std::fs::write(
        &path,
        "TRADENAME,UIFREFERENCENUMBER,SHUTDOWN_FROM,SHUTDOWN_TILL,IDNUMBER,PAYMENT_STATUS_ID,PAYMENTMEDIUMID,BANK_PAY_AMOUNT\n\
         Narrow Ltd,U777/01,2020-03-27,2020-04-16,8001,3,2,1000\n",
    )
    .unwrap();
    path
}

fn template(dir: &Path, name: &str, sheets: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut sheets: Vec<Worksheet> = sheets.iter().map(|s| Worksheet::new(*s)).collect();
    sheets[0].set_value(CellAddress::parse("A40").unwrap(), "Table copy");
    write_workbook(&Workbook::from_sheets(sheets), &path).unwrap();
    path
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn generate_single_report_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = export(dir.path(), "export.csv", "U123/45");
    let tp2 = template(dir.path(), "TP2.xlsx", &["TP2.1", "TP2.2"]);
    let out = dir.path().join("papers");

    let output = run(apaper(dir.path()).args([
        "generate",
        path_arg(&input),
        "--report",
        "tp2",
        "--template",
        path_arg(&tp2),
        "--out",
        path_arg(&out),
        "--consultant",
        "J. Smith",
        "--json",
    ]));
    assert_eq!(code(&output), 0, "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON report");
    assert_eq!(report["report"], "tp2");
    assert_eq!(report["summary"]["employee_count"], 2);
    assert_eq!(report["sheets"][0]["rows"], 2);
    assert!(out.join("TP.2_Employment Verification Testing_U123_45.xlsx").is_file());
}

#[test]
fn missing_fields_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let input = narrow_export(dir.path());
    let tp2 = template(dir.path(), "TP2.xlsx", &["TP2.1", "TP2.2"]);

    let output = run(apaper(dir.path()).args([
        "generate",
        path_arg(&input),
        "-r",
        "tp2",
        "-t",
        path_arg(&tp2),
        "-o",
        path_arg(dir.path()),
    ]));
    assert_eq!(code(&output), 4);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: missing required field(s)"), "stderr: {stderr}");
    assert!(stderr.contains("hint:"));
}

#[test]
fn all_reports_need_a_config() {
    let dir = tempfile::tempdir().unwrap();
    let input = export(dir.path(), "export.csv", "U123/45");
    let output = run(apaper(dir.path()).args(["generate", path_arg(&input)]));
    assert_eq!(code(&output), 2);
}

#[test]
fn invalid_config_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let input = export(dir.path(), "export.csv", "U123/45");
    let config = dir.path().join("apaper.toml");
    std::fs::write(&config, "[templates]\ntp1 = \"\"\n").unwrap();

    let output = run(apaper(dir.path()).args(["generate", path_arg(&input), "--config", path_arg(&config)]));
    assert_eq!(code(&output), 6);
}

#[test]
fn batch_reports_partial_failure() {
    let dir = tempfile::tempdir().unwrap();
    template(dir.path(), "TP1.xlsx", &["Lead"]);
    template(dir.path(), "TP2.xlsx", &["TP2.1", "TP2.2"]);
    let config = dir.path().join("apaper.toml");
    std::fs::write(
        &config,
        "output_dir = \"out\"\nfolders = true\n\n[templates]\ntp1 = \"TP1.xlsx\"\ntp2 = \"TP2.xlsx\"\n",
    )
    .unwrap();
    let good = export(dir.path(), "good.csv", "U123/45");
    let narrow = narrow_export(dir.path());

    let output = run(apaper(dir.path()).args([
        "batch",
        path_arg(&good),
        path_arg(&narrow),
        "--config",
        path_arg(&config),
        "--json",
    ]));
    assert_eq!(code(&output), 8);

    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("JSON line"))
        .collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines.iter().filter(|l| l["ok"] == true).count(), 3);
    let failed = lines.iter().find(|l| l["ok"] == false).unwrap();
    assert_eq!(failed["report"], "tp2");
    assert_eq!(failed["error_kind"], "missing_field");

    let company = dir.path().join("out").join("U123_45 - Acme Bakery");
    assert!(company.join("UIF DATAFILE").join("good.csv").is_file());
}

#[test]
fn summary_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = export(dir.path(), "export.csv", "U123/45");
    let output = run(apaper(dir.path()).args(["summary", path_arg(&input), "--json"]));
    assert_eq!(code(&output), 0);

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["trade_name"], "Acme Bakery");
    assert_eq!(summary["uif_reference"], "U123/45");
    assert_eq!(summary["employee_count"], 2);
    assert_eq!(summary["records"], 2);
}

#[test]
fn inspect_flags_missing_markers() {
    let dir = tempfile::tempdir().unwrap();
    let tp3 = template(dir.path(), "TP3.xlsx", &["TP3.1", "TP3.2", "TP3.3"]);
    let config = dir.path().join("apaper.toml");
    std::fs::write(
        &config,
        r#"[templates]
tp3 = "TP3.xlsx"

[[markers]]
report = "tp3"
text = "Table copy"
kind = "table_copy"
start_row = 15

[[markers]]
report = "tp3"
text = "Conclusion"
kind = "table_copy"
start_row = 15
"#,
    )
    .unwrap();

    let output = run(apaper(dir.path()).args([
        "inspect",
        path_arg(&tp3),
        "--report",
        "tp3",
        "--config",
        path_arg(&config),
        "--json",
    ]));
    assert_eq!(code(&output), 5);

    let inspect: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(inspect["sheets"].as_array().unwrap().len(), 3);
    assert_eq!(inspect["markers"][0]["found_at"], "A40");
    assert!(inspect["markers"][1]["found_at"].is_null());
}
