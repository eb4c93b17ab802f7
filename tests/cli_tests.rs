use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::{contains, diff};

fn m6800() -> Command {
    let mut cmd = Command::cargo_bin("m6800").unwrap();
    cmd.env_remove("M6800_STEP_LIMIT");
    cmd
}

#[test]
fn runs_without_arguments() {
    m6800().assert().success();
}

#[test]
fn runs_add() {
    m6800()
        .arg("run")
        .arg("tests/files/add.asm")
        .arg("--minimal")
        .assert()
        .success()
        .stdout(diff(
            "PC: $C000 -> LDAA -> A = 5\n\
             PC: $C002 -> ADDA -> A = 8\n\
             PC: $C004 -> STAA -> [$0010] = 8\n\
             A 8\nB 0\nX 0\nPC 49158\n\
             $0010 = $08 (8)\n",
        ));
}

#[test]
fn runs_path_without_subcommand() {
    m6800()
        .arg("tests/files/add.asm")
        .assert()
        .success()
        .stdout(contains("Assembling"))
        .stdout(contains("A = 8"))
        .stdout(contains("Completed"));
}

#[test]
fn runs_machine_code() {
    m6800()
        .arg("run")
        .arg("tests/files/add.hex")
        .arg("--minimal")
        .assert()
        .success()
        .stdout(contains("PC: $C002 -> ADDA -> A = 8"))
        .stdout(contains("PC 49156"));
}

#[test]
fn runs_loop() {
    m6800()
        .arg("run")
        .arg("tests/files/loop.asm")
        .arg("--minimal")
        .assert()
        .success()
        .stdout(contains("PC: $C004 -> BNE taken -> $C002"))
        .stdout(contains("PC: $C004 -> BNE not taken -> continue"))
        .stdout(contains("$0200 = $03 (3)"))
        .stdout(contains("A 3\nB 0\n"));
}

#[test]
fn halts_endless_loop() {
    m6800()
        .arg("run")
        .arg("tests/files/forever.asm")
        .arg("--max-steps")
        .arg("5")
        .assert()
        .success()
        .stdout(contains("Stopped after 5 steps (infinite loop detected)"))
        .stdout(contains("Halted"));
}

#[test]
fn step_limit_from_env() {
    m6800()
        .env("M6800_STEP_LIMIT", "7")
        .arg("run")
        .arg("tests/files/forever.asm")
        .arg("--minimal")
        .assert()
        .success()
        .stdout(contains("Stopped after 7 steps"));
}

#[test]
fn default_step_limit() {
    m6800()
        .arg("run")
        .arg("tests/files/forever.asm")
        .arg("--minimal")
        .assert()
        .success()
        .stdout(contains("Stopped after 100 steps"))
        .stdout(contains("PC: $C000 -> BRA taken -> $C000").count(100));
}

#[test]
fn runs_past_errors() {
    m6800()
        .arg("run")
        .arg("tests/files/errors.asm")
        .arg("--minimal")
        .assert()
        .success()
        .stdout(contains("PC: $C002 -> cannot decode: ERROR: invalid instruction -> FOO"))
        .stdout(contains("PC: $C002 -> INCA -> A = 2"));
}

#[test]
fn lists_assembly() {
    m6800()
        .arg("asm")
        .arg("tests/files/loop.asm")
        .assert()
        .success()
        .stdout(contains("C000  C6 03"))
        .stdout(contains("C004  26 FC"))
        .stdout(contains("C006  B7 02 00"))
        .stdout(contains("LOOP         $C002"));
}

#[test]
fn writes_machine_code() {
    let dest = std::env::temp_dir().join("m6800_cli_tests_loop.hex");
    m6800()
        .arg("asm")
        .arg("tests/files/loop.asm")
        .arg(&dest)
        .assert()
        .success()
        .stdout(contains("Saved"));

    let written = std::fs::read_to_string(&dest).unwrap();
    assert_eq!(written, "\nC6 03\n4C\n5A\n26 FC\nB7 02 00\n\n");

    m6800()
        .arg("run")
        .arg(&dest)
        .arg("--minimal")
        .assert()
        .success()
        .stdout(contains("$0200 = $03 (3)"));
    let _ = std::fs::remove_file(&dest);
}

#[test]
fn lists_errors_in_place() {
    m6800()
        .arg("asm")
        .arg("tests/files/errors.asm")
        .assert()
        .success()
        .stdout(contains("ERROR: invalid instruction -> FOO"))
        .stdout(contains("ERROR: cannot resolve operand -> NOWHERE"))
        .stdout(contains("ERROR: value 99999 out of range -> 99999"))
        .stdout(contains("C002  4C"))
        .stdout(contains("with 3 errors"));
}

#[test]
fn checks_clean_file() {
    m6800()
        .arg("check")
        .arg("tests/files/loop.asm")
        .assert()
        .success()
        .stdout(contains("no errors found!"));
}

#[test]
fn check_reports_errors() {
    m6800()
        .arg("check")
        .arg("tests/files/errors.asm")
        .assert()
        .failure()
        .stderr(contains("asm::instruction"))
        .stderr(contains("asm::operand"))
        .stderr(contains("asm::range"))
        .stderr(contains("found 3 errors"));
}

#[test]
fn dumps_image() {
    m6800()
        .arg("dump")
        .arg("tests/files/loop.asm")
        .assert()
        .success()
        .stdout(contains("C000: C6 03 4C 5A 26 FC B7 02 00"));
}

#[test]
fn rejects_unknown_extension() {
    m6800()
        .arg("run")
        .arg("Cargo.toml")
        .assert()
        .failure()
        .stderr(contains("unknown extension"));
}
