use std::process::{Command, Output};

fn sprout_siege(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sprout-siege"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch the sprout-siege binary")
}

#[test]
fn short_run_prints_the_banner_and_summary() {
    let output = sprout_siege(&["--seconds", "1", "--tick-hz", "50"]);
    assert!(output.status.success(), "run failed: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Welcome to Sprout Siege."), "{stdout}");
    assert!(stdout.contains("encounter:     Meadow"), "{stdout}");
    assert!(stdout.contains("outcome:       TimeUp"), "{stdout}");
    assert!(stdout.contains("over 50 ticks"), "{stdout}");
}

#[test]
fn zero_tick_rate_is_refused() {
    let output = sprout_siege(&["--tick-hz", "0"]);
    assert!(!output.status.success());
}

#[test]
fn missing_encounter_file_is_reported() {
    let output = sprout_siege(&["--encounter", "does/not/exist.toml"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read encounter"), "{stderr}");
}
