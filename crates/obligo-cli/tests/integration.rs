#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn obligo(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("obligo").unwrap();
    cmd.current_dir(dir.path()).env("OBLIGO_ROOT", dir.path());
    cmd
}

fn init_project(dir: &TempDir) {
    obligo(dir).arg("init").assert().success();
}

/// Every configured day exists in every month, so runs succeed on any date.
const GST_YAML: &str = r#"
id: gst
name: GST Returns
fields:
  - name: arn
    required: true
sub_obligations:
  - id: gstr-1
    name: GSTR-1
    cadence: monthly
    frequency_config:
      monthlyDay: 11
      monthlyTime: "9:00 am"
      dailyTime: "10:00 AM"
  - id: gstr-3b
    name: GSTR-3B
    cadence: monthly
    frequency_config:
      monthlyDay: 20
      monthlyTime: "09:00 AM"
  - id: gstr-9
    name: GSTR-9
    cadence: yearly
    frequency_config:
      yearlyMonth: December
      yearlyDate: 31
      yearlyTime: "05:00 PM"
"#;

const TDS_YAML: &str = r#"
id: tds
name: TDS Returns
cadence: quarterly
frequency_config:
  quarterlyMonths: [July, October, January, April]
  quarterlyDay: 15
  quarterlyTime: "10:00 AM"
"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn add_obligation(dir: &TempDir, name: &str, yaml: &str) {
    let file = write_file(dir, name, yaml);
    obligo(dir)
        .args(["obligation", "add"])
        .arg(&file)
        .assert()
        .success();
}

fn seeded_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    add_obligation(&dir, "gst.yaml", GST_YAML);
    add_obligation(&dir, "tds.yaml", TDS_YAML);
    obligo(&dir)
        .args(["client", "add", "acme", "--name", "Acme Traders", "--branch", "mumbai"])
        .args(["--assign", "gst", "--assign", "tds"])
        .assert()
        .success();
    obligo(&dir)
        .args(["client", "add", "zen", "--name", "Zen Foods", "--assign", "gst/gstr-3b"])
        .assert()
        .success();
    dir
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--json").output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// obligo init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_tree() {
    let dir = TempDir::new().unwrap();
    obligo(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .obligo/config.yaml"));

    assert!(dir.path().join(".obligo/obligations").is_dir());
    assert!(dir.path().join(".obligo/clients").is_dir());
    assert!(dir.path().join(".obligo/config.yaml").exists());
    assert!(dir.path().join(".obligo/timelines.db").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    obligo(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .obligo/config.yaml"));
}

#[test]
fn commands_require_init() {
    let dir = TempDir::new().unwrap();
    obligo(&dir)
        .args(["run", "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn unknown_timezone_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join(".obligo/config.yaml"),
        "timezone: Mars/Olympus\n",
    )
    .unwrap();
    obligo(&dir)
        .args(["run", "--cadence", "monthly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Mars/Olympus"));
}

// ---------------------------------------------------------------------------
// obligo obligation
// ---------------------------------------------------------------------------

#[test]
fn obligation_add_normalizes_and_lists() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    add_obligation(&dir, "gst.yaml", GST_YAML);

    let stored = std::fs::read_to_string(dir.path().join(".obligo/obligations/gst.yaml")).unwrap();
    assert!(stored.contains("09:00 AM"));
    assert!(!stored.contains("dailyTime"));

    obligo(&dir)
        .args(["obligation", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GST Returns"))
        .stdout(predicate::str::contains("monthly, yearly"));
}

#[test]
fn obligation_add_refuses_duplicates() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    add_obligation(&dir, "gst.yaml", GST_YAML);

    let file = dir.path().join("gst.yaml");
    obligo(&dir)
        .args(["obligation", "add"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    obligo(&dir)
        .args(["obligation", "add", "--replace"])
        .arg(&file)
        .assert()
        .success();
}

#[test]
fn quarterly_needs_four_months() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let file = write_file(
        &dir,
        "bad.yaml",
        &TDS_YAML.replace("[July, October, January, April]", "[July, October, January]"),
    );
    obligo(&dir)
        .args(["obligation", "add"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("quarterlyMonths"));
    assert!(!dir.path().join(".obligo/obligations/tds.yaml").exists());
}

#[test]
fn obligation_validate_does_not_store() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let file = write_file(&dir, "gst.yaml", GST_YAML);
    obligo(&dir)
        .args(["obligation", "validate"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("09:00 AM"));
    assert!(!dir.path().join(".obligo/obligations/gst.yaml").exists());
}

#[test]
fn obligation_show_json() {
    let dir = seeded_project();
    let shown = json_output(obligo(&dir).args(["obligation", "show", "tds"]));
    assert_eq!(shown["cadence"], "quarterly");
    assert_eq!(shown["frequency_config"]["quarterlyDay"], 15);
}

// ---------------------------------------------------------------------------
// obligo client
// ---------------------------------------------------------------------------

#[test]
fn client_assignment_must_reference_known_obligation() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    obligo(&dir)
        .args(["client", "add", "acme", "--name", "Acme", "--assign", "pf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("obligation not found: pf"));
}

#[test]
fn client_list_shows_pins() {
    let dir = seeded_project();
    obligo(&dir)
        .args(["client", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gst/gstr-3b"))
        .stdout(predicate::str::contains("mumbai"));
}

// ---------------------------------------------------------------------------
// obligo run / timeline
// ---------------------------------------------------------------------------

#[test]
fn monthly_run_is_idempotent() {
    let dir = seeded_project();

    let first = json_output(obligo(&dir).args(["run", "--cadence", "monthly"]));
    // acme: gstr-1 + gstr-3b, zen: gstr-3b only
    assert_eq!(first["processed"], 3);
    assert_eq!(first["created"], 3);
    assert_eq!(first["results"][0]["cadence"], "monthly");

    let second = json_output(obligo(&dir).args(["run", "--cadence", "monthly"]));
    assert_eq!(second["processed"], 3);
    assert_eq!(second["created"], 0);

    let timelines = json_output(obligo(&dir).args(["timeline", "list"]));
    assert_eq!(timelines.as_array().unwrap().len(), 3);
}

#[test]
fn run_all_covers_every_scheduled_cadence() {
    let dir = seeded_project();
    let summary = json_output(obligo(&dir).args(["run", "--all"]));
    assert_eq!(summary["results"].as_array().unwrap().len(), 4);
    // 3 monthly + 1 yearly (acme gstr-9) + 1 quarterly (acme tds)
    assert_eq!(summary["created"], 5);
    assert_eq!(summary["failed"], 0);

    let acme = json_output(obligo(&dir).args(["timeline", "list", "--client", "acme"]));
    let acme = acme.as_array().unwrap();
    assert_eq!(acme.len(), 4);
    assert!(acme.iter().all(|t| t["branch_id"] == "mumbai"));
    let tds = acme.iter().find(|t| t["obligation_id"] == "tds").unwrap();
    assert!(tds["sub_obligation_id"].is_null());
    assert!(tds["period"].as_str().unwrap().starts_with('Q'));
}

#[test]
fn run_requires_cadence_or_all() {
    let dir = seeded_project();
    obligo(&dir).arg("run").assert().failure();
    obligo(&dir)
        .args(["run", "--cadence", "monthly", "--all"])
        .assert()
        .failure();
}

#[test]
fn status_survives_rerun() {
    let dir = seeded_project();
    obligo(&dir)
        .args(["run", "--cadence", "monthly"])
        .assert()
        .success();

    let zen = json_output(obligo(&dir).args(["timeline", "list", "--client", "zen"]));
    let period = zen[0]["period"].as_str().unwrap().to_string();

    obligo(&dir)
        .args(["timeline", "status", "zen", "gst", &period, "completed", "--sub", "gstr-3b"])
        .assert()
        .success();
    obligo(&dir)
        .args(["run", "--cadence", "monthly"])
        .assert()
        .success();

    let zen = json_output(obligo(&dir).args(["timeline", "list", "--client", "zen"]));
    assert_eq!(zen.as_array().unwrap().len(), 1);
    assert_eq!(zen[0]["status"], "completed");
}

#[test]
fn status_of_missing_timeline_fails() {
    let dir = seeded_project();
    obligo(&dir)
        .args(["timeline", "status", "zen", "gst", "July-1999", "completed"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// obligo period / due
// ---------------------------------------------------------------------------

#[test]
fn period_identifiers() {
    let dir = TempDir::new().unwrap();
    let cases = [
        ("monthly", "July-2024"),
        ("quarterly", "Q1-2024"),
        ("yearly", "2024-2025"),
        ("daily", "2024-07-03"),
        ("weekly", "2024-W27"),
        ("one-time", "one-time"),
    ];
    for (cadence, expected) in cases {
        obligo(&dir)
            .args(["period", "--cadence", cadence, "--at", "2024-07-03T10:00"])
            .assert()
            .success()
            .stdout(format!("{expected}\n"));
    }
}

#[test]
fn period_in_first_quarter_of_calendar_year() {
    let dir = TempDir::new().unwrap();
    obligo(&dir)
        .args(["period", "--cadence", "yearly", "--at", "2025-02-10"])
        .assert()
        .success()
        .stdout("2024-2025\n");
    obligo(&dir)
        .args(["period", "--cadence", "quarterly", "--at", "2025-02-10"])
        .assert()
        .success()
        .stdout("Q3-2025\n");
}

#[test]
fn due_next_occurrence_and_current_period() {
    let dir = seeded_project();
    obligo(&dir)
        .args(["due", "gst", "--sub", "gstr-3b", "--from", "2024-07-03T10:00"])
        .assert()
        .success()
        .stdout("2024-08-20 09:00\n");
    obligo(&dir)
        .args(["due", "gst", "--sub", "gstr-3b", "--from", "2024-07-03T10:00", "--current"])
        .assert()
        .success()
        .stdout("2024-07-20 09:00\n");
    obligo(&dir)
        .args(["due", "tds", "--from", "2024-07-20"])
        .assert()
        .success()
        .stdout("2024-10-15 10:00\n");
}

#[test]
fn due_requires_sub_when_ambiguous() {
    let dir = seeded_project();
    obligo(&dir)
        .args(["due", "gst"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--sub"));
}
