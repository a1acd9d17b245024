use assert_cmd::Command;
use predicates::prelude::*;
use std::{path::Path, process::Stdio};
use tempfile::TempDir;

const FACILITY: &str = "6f1d2f1c-3d0b-4f5e-8c4a-1b2c3d4e5f60";
const PROGRAM: &str = "0a9b8c7d-6e5f-4a3b-9c2d-1e0f9a8b7c6d";

/// A `tally` invocation isolated from the caller's environment and pointed
/// at `store`.
fn tally(store: &Path) -> Command {
    Command::from_std(tally_process(store))
}

fn tally_process(store: &Path) -> std::process::Command {
    let mut cmd = std::process::Command::new(assert_cmd::cargo_bin!("tally"));
    for var in [
        "TALLY_STORE_PATH",
        "TALLY_REVERT_FLOOR",
        "TALLY_ALLOCATOR",
        "TALLY_LOG",
        "TALLY_LOG_JSON",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.current_dir(store.parent().expect("store has a parent"))
        .arg("--store-path")
        .arg(store);
    cmd
}

const SCOPE_ARGS: [&str; 6] = ["--facility", FACILITY, "--program", PROGRAM, "--year", "2024"];

fn with_scope<'a>(cmd: &'a mut Command, sub: &str, emergency: bool) -> &'a mut Command {
    cmd.arg(sub).args(SCOPE_ARGS);
    if emergency {
        cmd.arg("--emergency");
    }
    cmd
}

fn store_in(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("counters.json")
}

#[test]
fn allocate_counts_up_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    for expected in 1..=3 {
        with_scope(&mut tally(&store), "allocate", false)
            .assert()
            .success()
            .stdout(format!("{expected}\n"));
    }

    with_scope(&mut tally(&store), "current", false)
        .assert()
        .success()
        .stdout("3\n");
}

#[test]
fn emergency_sequence_is_separate() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    with_scope(&mut tally(&store), "allocate", false)
        .assert()
        .success()
        .stdout("1\n");
    with_scope(&mut tally(&store), "allocate", true)
        .assert()
        .success()
        .stdout("1\n");

    tally(&store)
        .arg("list")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("/2024/regular 1")
                .and(predicate::str::contains("/2024/emergency 1")),
        );
}

#[test]
fn revert_undoes_allocation() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    with_scope(&mut tally(&store), "allocate", false)
        .assert()
        .success();
    with_scope(&mut tally(&store), "allocate", false)
        .assert()
        .success();
    with_scope(&mut tally(&store), "revert", false)
        .assert()
        .success()
        .stdout("");
    with_scope(&mut tally(&store), "allocate", false)
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn revert_unknown_scope_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    with_scope(&mut tally(&store), "revert", false)
        .assert()
        .success();
    with_scope(&mut tally(&store), "current", false)
        .assert()
        .success()
        .stdout("none\n");
    assert!(!store.exists());
}

#[test]
fn floor_from_environment_refuses_revert() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    with_scope(&mut tally(&store), "allocate", false)
        .assert()
        .success();
    with_scope(tally(&store).env("TALLY_REVERT_FLOOR", "1"), "revert", false)
        .assert()
        .failure()
        .stderr(predicate::str::contains("floor is 1"));
    with_scope(&mut tally(&store), "current", false)
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn keyed_allocator_shares_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    with_scope(&mut tally(&store), "allocate", false)
        .assert()
        .success()
        .stdout("1\n");
    with_scope(
        tally(&store).args(["--allocator", "keyed"]),
        "allocate",
        false,
    )
    .assert()
    .success()
    .stdout("2\n");
}

#[test]
fn concurrent_invocations_never_repeat_a_value() {
    const PROCESSES: i64 = 24;

    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let children: Vec<_> = (0..PROCESSES)
        .map(|i| {
            let mut cmd = tally_process(&store);
            if i % 2 == 1 {
                cmd.args(["--allocator", "keyed"]);
            }
            cmd.arg("allocate")
                .args(SCOPE_ARGS)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .expect("tally starts")
        })
        .collect();

    let mut values: Vec<i64> = children
        .into_iter()
        .map(|child| {
            let output = child.wait_with_output().unwrap();
            assert!(
                output.status.success(),
                "{}",
                String::from_utf8_lossy(&output.stderr)
            );
            String::from_utf8(output.stdout)
                .unwrap()
                .trim()
                .parse()
                .unwrap()
        })
        .collect();
    values.sort_unstable();

    assert_eq!(values, (1..=PROCESSES).collect::<Vec<_>>());
    with_scope(&mut tally(&store), "current", false)
        .assert()
        .success()
        .stdout(format!("{PROCESSES}\n"));
}

#[test]
fn logs_stay_off_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    with_scope(tally(&store).env("TALLY_LOG", "debug"), "allocate", false)
        .assert()
        .success()
        .stdout("1\n")
        .stderr(predicate::str::contains("allocated"));
}

#[test]
fn bad_uuid_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    tally(&store)
        .args([
            "allocate",
            "--facility",
            "nope",
            "--program",
            PROGRAM,
            "--year",
            "2024",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--facility"));
}
