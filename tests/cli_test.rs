//! Integration tests for the recipe-sieve binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MANIFEST: &str = r#"{
  "os": "linux",
  "platform": "ubuntu",
  "platformFamily": "debian",
  "platformVersion": "22.04",
  "discoveredProcesses": [
    {"name": "java", "pid": 100},
    {"name": "nginx", "pid": 200},
    {"name": "bash"}
  ]
}"#;

fn setup_recipes(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("recipes");
    fs::create_dir_all(&dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
    fs::write(temp.path().join("host.json"), MANIFEST).unwrap();
    temp
}

fn sieve(root: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("recipe-sieve"));
    cmd.current_dir(root);
    cmd.env_remove("RUST_LOG");
    cmd.env("NO_COLOR", "1");
    cmd
}

const JAVA: &str = r#"
id: java-1
name: java-agent
processMatch: ["java"]
preInstall:
  requireAtDiscovery: exit 0
"#;

const MYSQL: &str = r#"
id: mysql-1
name: mysql-integration
processMatch: ["mysqld"]
preInstall:
  requireAtDiscovery: exit 0
"#;

const UNSUPPORTED: &str = r#"
id: x
name: x-agent
processMatch: ["nginx"]
preInstall:
  requireAtDiscovery: |
    echo '{"metadata": {"reason": "unsupported-os"}}' > "$RECIPE_OUTPUT_FILE"
    exit 132
"#;

const FAILING: &str = r#"
id: y
name: y-agent
preInstall:
  requireAtDiscovery: exit 1
"#;

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("recipe-sieve"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Decide which install recipes apply"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("recipe-sieve"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_requires_subcommand() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("recipe-sieve"));
    cmd.assert().failure();
    Ok(())
}

#[cfg(unix)]
#[test]
fn filter_lists_applicable_recipes() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_recipes(&[
        ("java.yml", JAVA),
        ("mysql.yml", MYSQL),
        ("x.yml", UNSUPPORTED),
        ("y.yml", FAILING),
    ]);

    sieve(temp.path())
        .args(["filter", "recipes", "--manifest", "host.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 4 recipes apply to this host"))
        .stdout(predicate::str::contains("java-agent (java-1)"))
        .stdout(predicate::str::contains("mysql-integration (mysql-1) excluded by process-match"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn filter_json_reports_detection_metadata() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_recipes(&[("java.yml", JAVA), ("x.yml", UNSUPPORTED)]);

    let output = sieve(temp.path())
        .args(["filter", "recipes", "--manifest", "host.json", "--json"])
        .output()?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["survivors"][0]["id"], "java-1");
    assert_eq!(value["excluded"][0]["recipeId"], "x");
    assert_eq!(value["excluded"][0]["error"]["kind"], "detected-unsupported");
    assert_eq!(
        value["excluded"][0]["error"]["metadata"]["reason"],
        "unsupported-os"
    );
    let detected: Vec<_> = value["statuses"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["status"] == "DETECTED")
        .collect();
    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0]["event"]["metadata"]["reason"], "unsupported-os");
    Ok(())
}

#[cfg(unix)]
#[test]
fn filter_passes_vars_to_scripts() -> Result<(), Box<dyn std::error::Error>> {
    let recipe = r#"
id: region
name: region-agent
preInstall:
  requireAtDiscovery: '[ "{{.REGION}}" = "eu" ]'
"#;
    let temp = setup_recipes(&[("region.yml", recipe)]);

    sieve(temp.path())
        .args(["filter", "recipes", "--manifest", "host.json", "--var", "REGION=eu"])
        .assert()
        .success()
        .stdout(predicate::str::contains("region-agent (region)"));

    sieve(temp.path())
        .args(["filter", "recipes", "--manifest", "host.json", "--var", "REGION=us"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 of 1 recipes"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn filter_reads_project_config() -> Result<(), Box<dyn std::error::Error>> {
    let recipe = r#"
id: slow
name: slow-agent
preInstall:
  requireAtDiscovery: sleep 10
"#;
    let temp = setup_recipes(&[("slow.yml", recipe)]);
    let config_dir = temp.path().join(".recipe-sieve");
    fs::create_dir_all(&config_dir)?;
    fs::write(config_dir.join("config.yml"), "script_timeout_secs: 1\n")?;

    sieve(temp.path())
        .args(["filter", "recipes", "--manifest", "host.json", "--json"])
        .timeout(std::time::Duration::from_secs(8))
        .assert()
        .success()
        .stdout(predicate::str::contains("execution-error"))
        .stdout(predicate::str::contains("timed out after 1s"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn filter_deadline_cancels_run() -> Result<(), Box<dyn std::error::Error>> {
    let recipe = r#"
- id: a
  name: a
  preInstall:
    requireAtDiscovery: sleep 10
- id: b
  name: b
  preInstall:
    requireAtDiscovery: sleep 10
"#;
    let temp = setup_recipes(&[("slow.yml", recipe)]);

    sieve(temp.path())
        .args([
            "filter",
            "recipes",
            "--manifest",
            "host.json",
            "--deadline",
            "1",
            "-j",
            "1",
        ])
        .timeout(std::time::Duration::from_secs(8))
        .assert()
        .failure()
        .stdout(predicate::str::contains("b not evaluated"))
        .stderr(predicate::str::contains("Filtering cancelled"));
    Ok(())
}

#[test]
fn filter_missing_recipes_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_recipes(&[]);

    sieve(temp.path())
        .args(["filter", "nowhere", "--manifest", "host.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Recipe source not found"));
    Ok(())
}

#[test]
fn filter_bad_manifest_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_recipes(&[("java.yml", JAVA)]);
    fs::write(temp.path().join("bad.json"), "{ not json")?;

    sieve(temp.path())
        .args(["filter", "recipes", "--manifest", "bad.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse manifest"));
    Ok(())
}

#[test]
fn filter_without_scripts() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_recipes(&[("x.yml", UNSUPPORTED), ("mysql.yml", MYSQL)]);

    sieve(temp.path())
        .args(["filter", "recipes", "--manifest", "host.json", "--no-scripts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("x-agent (x)"))
        .stdout(predicate::str::contains("1 of 2 recipes"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn check_explains_detection() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_recipes(&[("x.yml", UNSUPPORTED)]);

    sieve(temp.path())
        .args(["check", "recipes/x.yml", "--manifest", "host.json", "--verbose"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("process-match: pass"))
        .stdout(predicate::str::contains("reason: unsupported-os"))
        .stderr(predicate::str::contains("Detected but unsupported"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn check_compatible_recipe_exits_zero() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_recipes(&[("java.yml", JAVA), ("y.yml", FAILING)]);

    sieve(temp.path())
        .args(["check", "recipes", "--id", "java-1", "--manifest", "host.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("java-agent applies to this host"));
    Ok(())
}

#[test]
fn discover_prints_manifest_json() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::new(cargo_bin("recipe-sieve"))
        .args(["discover", "--no-processes"])
        .output()?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["os"], std::env::consts::OS);
    Ok(())
}
