use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn vsum() -> Command {
    let mut cmd = Command::cargo_bin("vsum").unwrap();
    for var in ["VSUM_VENDOR", "VSUM_BINARY", "VSUM_KERNEL", "VSUM_LENGTH", "VSUM_RUNTIME", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

fn image_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"simulated accelerator image").unwrap();
    file
}

#[test]
fn help_works() {
    vsum().arg("--help").assert().success();
}

#[test]
fn version_works() {
    vsum().arg("--version").assert().success();
}

#[test]
fn help_mentions_core_subcommands() {
    let out = vsum().arg("--help").assert().success().get_output().stdout.clone();
    let s = String::from_utf8(out).unwrap();
    for needle in ["run", "devices", "config", "--log-level"] {
        assert!(s.contains(needle), "help missing `{needle}`");
    }
}

#[test]
fn invalid_command_fails() {
    vsum().arg("nonexistent-command").assert().failure();
}

#[test]
fn simulated_run_passes_with_exit_zero() {
    let image = image_file();
    vsum()
        .args(["run", "--runtime", "sim", "--binary"])
        .arg(image.path())
        .assert()
        .code(0)
        .stdout(predicate::str::contains("TEST PASSED"))
        .stdout(predicate::str::contains("Platform: Xilinx (simulated)"));
}

#[test]
fn faulty_kernel_reports_first_mismatch_and_fails() {
    let image = image_file();
    vsum()
        .args(["run", "--runtime", "sim", "--sim-kernel", "first-operand", "--binary"])
        .arg(image.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Error: Result mismatch"))
        .stdout(predicate::str::contains("i = 1: CPU result = 3 Krnl Result = 1"))
        .stdout(predicate::str::contains("TEST FAILED"));
}

#[test]
fn missing_binary_fails_before_verification() {
    let dir = tempfile::tempdir().unwrap();
    vsum()
        .args(["run", "--runtime", "sim", "--binary"])
        .arg(dir.path().join("sum.awsxclbin"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("TEST").not())
        .stderr(predicate::str::contains("not readable"));
}

#[test]
fn unmatched_vendor_fails() {
    let image = image_file();
    vsum()
        .args(["run", "--runtime", "sim", "--vendor", "Altera", "--binary"])
        .arg(image.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("TEST").not())
        .stderr(predicate::str::contains("Altera"));
}

#[test]
fn unknown_kernel_name_fails() {
    let image = image_file();
    vsum()
        .args(["run", "--runtime", "sim", "--kernel", "vadd", "--binary"])
        .arg(image.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("TEST").not())
        .stderr(predicate::str::contains("vadd"));
}

#[test]
fn vendor_prefix_of_simulated_platform_matches() {
    let image = image_file();
    vsum()
        .args(["run", "--runtime", "sim", "--vendor", "Xil", "--length", "16", "--binary"])
        .arg(image.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("TEST PASSED"));
}

#[test]
fn devices_marks_no_platform_for_foreign_vendor() {
    vsum()
        .args(["devices", "--runtime", "sim", "--vendor", "Altera"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  Platform: Xilinx (simulated)"))
        .stdout(predicate::str::contains("* Platform").not());
}

#[test]
fn run_without_binary_is_a_config_error() {
    vsum().args(["run", "--runtime", "sim"]).assert().code(1);
}

#[test]
fn binary_from_environment_is_used() {
    let image = image_file();
    vsum()
        .args(["run", "--runtime", "sim", "--length", "64"])
        .env("VSUM_BINARY", image.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("over 64 elements"));
}

#[test]
fn config_file_is_honoured() {
    let image = image_file();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vsum.toml");
    std::fs::write(
        &path,
        format!("runtime = \"sim\"\nlength = 32\nbinary = {:?}\n", image.path().display().to_string()),
    )
    .unwrap();

    vsum()
        .arg("--config")
        .arg(&path)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("over 32 elements"));
}

#[test]
fn config_command_prints_toml() {
    vsum()
        .args(["config", "--kernel", "vadd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vendor = \"Xilinx\""))
        .stdout(predicate::str::contains("kernel = \"vadd\""));
}

#[test]
fn devices_lists_simulated_card() {
    vsum()
        .args(["devices", "--runtime", "sim"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* Platform: Xilinx (simulated)"))
        .stdout(predicate::str::contains("[0] simulated accelerator card"));
}

#[cfg(not(feature = "opencl"))]
#[test]
fn opencl_runtime_requires_feature() {
    let image = image_file();
    vsum()
        .args(["run", "--runtime", "opencl", "--binary"])
        .arg(image.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("opencl"));
}
