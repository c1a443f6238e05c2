//! The binary's command-line surface

use assert_cmd::Command;
use predicates::prelude::*;

use tickertest::cli::USAGE;

fn tickertest() -> Command {
    Command::cargo_bin("tickertest").unwrap()
}

#[test]
fn test_help_prints_usage_and_runs_nothing() {
    tickertest()
        .arg("-help")
        .assert()
        .success()
        .stdout(USAGE);
}

#[test]
fn test_help_output_ignores_other_flags() {
    for args in [
        vec!["-ticker", "-help"],
        vec!["-help", "-sleep", "-nogo"],
        vec!["-go", "-ingo", "-help"],
    ] {
        tickertest()
            .args(&args)
            .assert()
            .success()
            .stdout(USAGE)
            .stdout(predicate::str::contains("app start time").not());
    }
}

#[test]
fn test_no_loop_prints_start_and_finish() {
    tickertest()
        .assert()
        .success()
        .stdout(predicate::str::starts_with("app start time"))
        .stdout(predicate::str::ends_with("Finished\n"));
}

#[test]
fn test_ticker_without_strategy() {
    tickertest()
        .arg("-ticker")
        .assert()
        .success()
        .stdout(predicate::str::contains("tick 0 start time"))
        .stdout(predicate::str::contains("tick 4 finish time"))
        .stdout(predicate::str::contains("tick 5 time since last tick"))
        .stdout(predicate::str::contains("tick 5 finish time").not());
}

#[test]
fn test_unknown_flag_is_a_usage_error() {
    tickertest()
        .arg("-bogus")
        .assert()
        .failure()
        .code(2);
}
