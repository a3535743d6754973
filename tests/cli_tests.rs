use assert_cmd::Command;
use predicates::prelude::*;

fn releaser() -> Command {
    let mut cmd = Command::cargo_bin("imagemonkey_releaser").expect("binary is built");
    cmd.env_clear();
    cmd
}

#[test]
fn test_missing_configuration_fails_fast() {
    releaser()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Missing required value 'docker user'"))
        .stderr(predicate::str::contains("DOCKER_USER"));
}

#[test]
fn test_empty_environment_value_is_missing() {
    releaser()
        .env("DOCKER_USER", "acme")
        .env("DOCKER_PASSWORD", "")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DOCKER_PASSWORD"));
}

#[test]
fn test_missing_project_version_names_its_variable() {
    releaser()
        .env("DOCKER_USER", "acme")
        .env("DOCKER_PASSWORD", "secret")
        .env("GITHUB_ACCESS_TOKEN", "token")
        .env("GITHUB_PROJECT_OWNER", "acme")
        .args(["--project", "playground"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("IMAGEMONKEY_PLAYGROUND_VERSION"))
        .stderr(predicate::str::contains("secret").not());
}

#[test]
fn test_unknown_project_is_rejected() {
    releaser()
        .args(["--project", "website"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("website"));
}

#[test]
fn test_help_lists_env_fallbacks() {
    releaser()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("IMAGEMONKEY_VERSION"))
        .stdout(predicate::str::contains("DOCKER_PASSWORD"));
}
