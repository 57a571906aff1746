use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "shadow-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_shadow-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("teardown-safety"));
}

#[test]
fn cli_runs_smoke_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_shadow-tester");
    let output_path = temp_path("smoke.json");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "smoke,teardown",
            "--iterations",
            "1",
            "--seeds",
            "1,0x2a",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Shadow Companion Automated Tester"));

    let content = std::fs::read_to_string(output_path).expect("read report");
    let results: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    let results = results.as_array().expect("array of results");
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r["passed"] == true));
    assert!(results.iter().any(|r| r["seed"] == 42));
}

#[test]
fn cli_rejects_word_seeds() {
    let exe = env!("CARGO_BIN_EXE_shadow-tester");
    let output = Command::new(exe)
        .args(["--report", "json", "--seeds", "pumpkin"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
}

#[test]
fn cli_profile_persists_between_runs() {
    let exe = env!("CARGO_BIN_EXE_shadow-tester");
    let profile = temp_path("profile.json");
    for _ in 0..2 {
        let output = Command::new(exe)
            .args(["--days", "2", "--strategy", "sloppy", "--seeds", "9", "--profile"])
            .arg(&profile)
            .output()
            .expect("run cli");
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    }
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&profile).expect("profile saved"))
            .expect("profile is json");
    let payload = saved["shadow-companion-storage"]
        .as_str()
        .expect("snapshot slot");
    let snapshot: serde_json::Value = serde_json::from_str(payload).expect("snapshot json");
    assert_eq!(snapshot["diary"].as_array().map(Vec::len), Some(4));
    let _ = std::fs::remove_file(profile);
}
