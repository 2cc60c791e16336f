//! Integration tests for core CLI contract behavior.

use {predicates::prelude::*, std::fs, tempfile::tempdir};

fn cli_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sinoflash");
    cmd.env_remove("RUST_LOG")
        .env_remove("SINOFLASH_PORT")
        .env_remove("SINOFLASH_BAUD");
    cmd
}

/// A checksummed single-record Intel HEX image holding 01 02 03 04 at 0.
const GOOD_HEX: &str = ":0400000001020304F2\n:00000001FF\n";

/// Second record has its checksum off by one.
const BAD_HEX: &str = ":0400000001020304F2\n:0400040005060708DD\n:00000001FF\n";

#[test]
fn help_exits_zero_and_writes_stdout_only() {
    let mut cmd = cli_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sinoflash"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn version_exits_zero_and_writes_stdout_only() {
    let mut cmd = cli_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sinoflash"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn completions_command_writes_to_stdout() {
    let mut cmd = cli_cmd();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .code(0)
        .stdout(predicate::str::contains("sinoflash"));
}

#[test]
fn list_ports_json_returns_valid_json() {
    let mut cmd = cli_cmd();
    let output = cmd
        .args(["list-ports", "--json"])
        .output()
        .expect("command should execute");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("stdout should be JSON");
    assert!(parsed.is_array());
}

// ============================================================================
// Exit codes
// ============================================================================

#[test]
fn exit_code_two_for_usage_error_unknown_command() {
    let mut cmd = cli_cmd();
    cmd.arg("unknown-command-xyz")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unrecognized").or(predicate::str::contains("unknown")));
}

#[test]
fn exit_code_two_for_usage_error_invalid_flag() {
    let mut cmd = cli_cmd();
    cmd.arg("--invalid-flag-xyz")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn exit_code_two_for_missing_required_arg() {
    let mut cmd = cli_cmd();
    cmd.args(["-t", "dummy", "read", "-o", "out.bin"])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::is_empty());
}

#[test]
fn exit_code_two_for_bad_address() {
    let mut cmd = cli_cmd();
    cmd.args(["-t", "dummy", "erase", "-a", "0xZZ", "-s", "1"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn exit_code_one_for_missing_image() {
    let dir = tempdir().expect("tempdir should be created");
    let missing = dir.path().join("does_not_exist.hex");

    let mut cmd = cli_cmd();
    cmd.args(["-t", "dummy", "flash"])
        .arg(&missing)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does_not_exist.hex"));
}

#[test]
fn invalid_local_config_warns_and_continues() {
    let dir = tempdir().expect("tempdir should be created");
    fs::write(dir.path().join("sinoflash.toml"), "invalid toml [[[")
        .expect("write invalid config");

    let output = cli_cmd()
        .current_dir(dir.path())
        .arg("list-ports")
        .output()
        .expect("command should execute");

    assert!(
        output.status.success(),
        "command should succeed despite config warning"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TOML"), "should warn about invalid TOML");
}

#[test]
fn unknown_command_suggests_similar() {
    let mut cmd = cli_cmd();
    cmd.arg("falsh")
        .assert()
        .failure()
        .stderr(predicate::str::contains("flash"));
}

#[test]
fn non_interactive_environment_variable_works() {
    let mut cmd = cli_cmd();
    cmd.env("SINOFLASH_NON_INTERACTIVE", "true")
        .arg("--version")
        .assert()
        .success();
}

// ============================================================================
// Intel HEX handling
// ============================================================================

#[test]
fn malformed_hex_names_the_line() {
    let dir = tempdir().expect("tempdir should be created");
    let image = dir.path().join("bad.hex");
    fs::write(&image, BAD_HEX).expect("write hex");

    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["-t", "dummy", "flash", "-f", "ihex"])
        .arg(&image)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn hex_flash_and_verify_on_dummy_target() {
    let dir = tempdir().expect("tempdir should be created");
    let image = dir.path().join("fw.hex");
    fs::write(&image, GOOD_HEX).expect("write hex");

    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["-t", "dummy", "flash", "--verify"])
        .arg(&image)
        .assert()
        .success()
        .stderr(predicate::str::contains("Intel HEX: 1 segment(s), 4 bytes at 0x0000"))
        .stderr(predicate::str::contains("Erased 1 block(s)"))
        .stderr(predicate::str::contains("Verification PASSED"));
}

// ============================================================================
// Dummy target end to end
// ============================================================================

#[test]
fn binary_write_alias_and_verify_on_dummy_target() {
    let dir = tempdir().expect("tempdir should be created");
    let image = dir.path().join("fw.bin");
    let data: Vec<u8> = (1..=200u8).collect();
    fs::write(&image, &data).expect("write image");

    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["-t", "dummy", "write", "-a", "0x100", "--verify"])
        .arg(&image)
        .assert()
        .success()
        .stderr(predicate::str::contains("Binary: 200 bytes at 0x0100"))
        .stderr(predicate::str::contains("Verification PASSED"));
}

#[test]
fn no_erase_flash_skips_block_report() {
    let dir = tempdir().expect("tempdir should be created");
    let image = dir.path().join("fw.bin");
    fs::write(&image, [0x5Au8; 8]).expect("write image");

    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["-t", "dummy", "flash", "--no-erase"])
        .arg(&image)
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote 8 bytes at 0x0000"))
        .stderr(predicate::str::contains("Erased").not());
}

#[test]
fn erase_reports_aligned_range_and_block_count() {
    let dir = tempdir().expect("tempdir should be created");

    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["-t", "dummy", "erase", "-a", "100", "-s", "2000"])
        .assert()
        .success()
        .stderr(predicate::str::contains("0x0000..0x0C00"))
        .stderr(predicate::str::contains("Erased 3 block(s)"));
}

#[test]
fn read_writes_erased_bytes_to_file() {
    let dir = tempdir().expect("tempdir should be created");
    let output = dir.path().join("dump.bin");

    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["-t", "dummy", "read", "-s", "128", "-o"])
        .arg(&output)
        .assert()
        .success();

    let dumped = fs::read(&output).expect("dump should exist");
    assert_eq!(dumped, vec![0u8; 128]);
}

#[test]
fn verify_mismatch_exits_one() {
    let dir = tempdir().expect("tempdir should be created");
    let image = dir.path().join("nonzero.bin");
    fs::write(&image, [0xAAu8; 16]).expect("write image");

    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["-t", "dummy", "verify"])
        .arg(&image)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Verification failed at 0x0000"));
}

#[test]
fn quiet_mode_keeps_stderr_clean_on_success() {
    let dir = tempdir().expect("tempdir should be created");

    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["-q", "-t", "dummy", "erase", "-s", "1"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn colors_disabled_when_not_tty() {
    let output = cli_cmd()
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    assert!(
        !stdout.contains("\x1b["),
        "Colors should be disabled in non-TTY mode"
    );
}
