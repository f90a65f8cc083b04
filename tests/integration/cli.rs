//! The `seedmap` binary.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;

use seedmap::test_utils::TestProject;

fn seedmap(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("seedmap").unwrap();
    cmd.env_remove("SEEDMAP_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--quiet")
        .arg("--project")
        .arg(&project.root);
    cmd
}

#[test]
fn test_build_reports_documents() -> Result<()> {
    let project = TestProject::order()?;

    seedmap(&project)
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 3 documents"))
        .stdout(predicate::str::contains("demo.OrderMapper"))
        .stdout(predicate::str::contains("placeholder"));
    Ok(())
}

#[test]
fn test_build_writes_output_dir() -> Result<()> {
    let project = TestProject::order()?;

    seedmap(&project)
        .args(["build", "--output", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 documents"));

    assert!(project.exists("out/demo.OrderMapper.xml"));
    assert!(project.read("out/demo.OrderMapper.xml")?.contains("id=\"topOrders\""));
    Ok(())
}

#[test]
fn test_inspect_lists_statements() -> Result<()> {
    let project = TestProject::order()?;

    seedmap(&project)
        .args(["inspect", "demo.OrderMapper", "--statements"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo.OrderMapper.topOrders"))
        .stdout(predicate::str::contains("demo.OrderMapper.getById"));
    Ok(())
}

#[test]
fn test_inspect_json_report() -> Result<()> {
    let project = TestProject::order()?;

    let output = seedmap(&project)
        .args(["inspect", "demo.OrderMapper", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["namespace"], "demo.OrderMapper");
    assert_eq!(report["origin"], "generated");
    assert_eq!(report["primary_key"]["key_column"], "id");
    Ok(())
}

#[test]
fn test_inspect_reports_fill_values() -> Result<()> {
    let project = TestProject::order()?;
    project.write(
        "seedmap.toml",
        r#"
[[fills]]
handler = "gmtCreate"
column = "gmt_create"
phase = "insert"
supplier = "timestamp"

[[fills]]
handler = "gmtModified"
column = "gmt_modified"
phase = "insert_and_update"
supplier = "timestamp"
"#,
    )?;

    let output = seedmap(&project)
        .args(["inspect", "demo.OrderMapper", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["insert_fills"]["gmt_create"].as_str().unwrap().len(), 19);
    assert!(report["insert_fills"]["gmt_modified"].is_string());
    assert!(report["update_fills"]["gmt_create"].is_null());
    assert!(report["update_fills"]["gmt_modified"].is_string());
    Ok(())
}

#[test]
fn test_inspect_unknown_namespace_suggests() -> Result<()> {
    let project = TestProject::order()?;

    seedmap(&project)
        .args(["inspect", "demo.OrdrMapper"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No document for namespace"))
        .stderr(predicate::str::contains("Did you mean 'demo.OrderMapper'?"));
    Ok(())
}

#[test]
fn test_build_fails_on_missing_namespace() -> Result<()> {
    let project = TestProject::order()?;
    project.write("mapper/Broken.xml", "<mapper><select id=\"x\">SELECT 1</select></mapper>")?;

    seedmap(&project)
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Broken.xml"));
    Ok(())
}
