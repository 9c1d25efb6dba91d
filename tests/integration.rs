use std::{env, fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) -> bool {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_bandit-duopoly"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    if !output.status.success() {
        let stdout_str =
            std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
        let stderr_str =
            std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");
        eprintln!(
            "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
        );
    }
    output.status.success()
}

fn config_contents(beta: f64) -> String {
    String::new()
        + "[model]\n"
        + "alpha = 0.48\n"
        + &format!("beta = {beta:?}\n")
        + "gamma = 0.6\n"
        + "floor_profit = false\n"
        + "\n"
        + "[sweep]\n"
        + "deltas = [ 1.0, 1000.0,]\n"
        + "\n"
        + "[trial]\n"
        + "n_rounds = 4096\n"
        + "window = 256\n"
        + "n_reps = 16\n"
        + "seed = 12345\n"
}

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    fs::write(&config_path, config_contents(0.9)).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert!(run_bin(&["--sim-dir", test_dir_str, "run"]));
    assert!(test_dir.join("sweep-0000.msgpack").exists());
    assert!(test_dir.join("sweep-0001.msgpack").exists());

    // Resuming with every record present is a no-op.
    let record = fs::read(test_dir.join("sweep-0001.msgpack")).expect("failed to read record");
    assert!(run_bin(&["--sim-dir", test_dir_str, "run"]));
    let resumed = fs::read(test_dir.join("sweep-0001.msgpack")).expect("failed to read record");
    assert_eq!(record, resumed);

    assert!(run_bin(&["--sim-dir", test_dir_str, "analyze"]));
    let analysis = fs::read_to_string(test_dir.join("analysis.json"))
        .expect("failed to read analysis file");
    let analysis: serde_json::Value =
        serde_json::from_str(&analysis).expect("failed to parse analysis file");
    let reports = analysis.as_array().expect("analysis must be an array");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["delta"], 1.0);
    assert_eq!(reports[1]["n_trials"], 16);

    // A record produced with different settings is refused.
    fs::write(&config_path, config_contents(0.95)).expect("failed to write config file");
    assert!(!run_bin(&["--sim-dir", test_dir_str, "run"]));

    assert!(run_bin(&["--sim-dir", test_dir_str, "clean"]));
    assert!(!test_dir.join("sweep-0000.msgpack").exists());
    assert!(!test_dir.join("analysis.json").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn rejects_invalid_config() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("rejects_invalid_config");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    // beta equal to gamma leaves the collusive price undefined.
    fs::write(test_dir.join("config.toml"), config_contents(0.6))
        .expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert!(!run_bin(&["--sim-dir", test_dir_str, "run"]));
    assert!(!test_dir.join("sweep-0000.msgpack").exists());

    fs::remove_dir_all(&test_dir).ok();
}
