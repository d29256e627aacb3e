use std::fs::{read_to_string, remove_file};

use assert_cmd::Command;

fn compose2nomad() -> Command {
	let mut cmd = Command::cargo_bin("compose2nomad").unwrap();
	cmd.arg("--ignore-config-file");
	cmd
}

#[test]
fn convert_prints_hcl() {
	let output = compose2nomad()
		.args(["convert", "tests/fixtures/web.yml"])
		.assert()
		.success()
		.get_output()
		.stdout
		.clone();

	let hcl = String::from_utf8(output).unwrap();

	assert!(hcl.starts_with("job \"docker-compose\" {"));
	assert!(hcl.contains("group \"web\""));
}

#[test]
fn convert_reads_stdin() {
	let output = compose2nomad()
		.args(["convert", "-", "--job-name", "shop", "-f", "json"])
		.write_stdin(read_to_string("tests/fixtures/web.yml").unwrap())
		.assert()
		.success()
		.get_output()
		.stdout
		.clone();

	let job: serde_json::Value = serde_json::from_slice(&output).unwrap();

	assert_eq!(job["id"], "shop");
	assert_eq!(job["groups"]["web"]["tasks"]["web"]["config"]["image"], "nginx:alpine");
}

#[test]
fn convert_writes_to_a_file() {
	let output = std::env::temp_dir().join("compose2nomad-cli-test.nomad.hcl");

	compose2nomad()
		.args(["convert", "tests/fixtures/web.yml", "-o"])
		.arg(&output)
		.assert()
		.success();

	let hcl = read_to_string(&output).unwrap();
	remove_file(&output).unwrap();

	assert!(hcl.contains("port \"port_0\""));
}

#[test]
fn partial_failures_still_print_the_job() {
	let assert = compose2nomad()
		.args(["convert", "tests/fixtures/partial_failure.yml"])
		.assert()
		.failure();

	let output = assert.get_output();
	let stdout = String::from_utf8_lossy(&output.stdout);
	let stderr = String::from_utf8_lossy(&output.stderr);

	assert!(stdout.contains("group \"web\""));
	assert!(stdout.contains("group \"db\""));
	assert!(!stdout.contains("group \"api\""));
	assert!(stderr.contains("error: Service 'api'"));
}

#[test]
fn validate_reports_every_error() {
	let assert = compose2nomad()
		.args(["validate", "tests/fixtures/invalid.yml"])
		.assert()
		.failure();

	let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();

	assert_eq!(stderr.matches("error: Service").count(), 2);
}

#[test]
fn validate_accepts_valid_files() {
	compose2nomad()
		.args(["validate", "tests/fixtures/full_stack.yml"])
		.assert()
		.success();
}
