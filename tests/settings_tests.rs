use eyre::Result;
use ordmix::prelude::*;
use std::io::Write;

fn toml_file(contents: &str) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Test reading a complete settings file
#[test]
fn test_read_full_settings() -> Result<()> {
    let file = toml_file(
        r#"
[config]
tolerance = 1e-4
max_cycles = 25

[optimizer]
max_retries = 5
lbfgs_memory = 10
iterations_per_parameter = 1.0
gradient_tolerance = 1e-6
cost_tolerance = 1e-10

[log]
level = "debug"
file = "ordmix.log"
stdout = false
"#,
    )?;
    let settings = read_settings(file.path())?;

    assert_eq!(settings.config.tolerance, 1e-4);
    assert_eq!(settings.config.max_cycles, 25);
    assert_eq!(settings.optimizer.max_retries, 5);
    assert_eq!(settings.optimizer.lbfgs_memory, 10);
    assert_eq!(settings.optimizer.max_iters(18), 18);
    assert_eq!(settings.log.file.as_deref(), Some("ordmix.log"));
    assert!(!settings.log.stdout);
    Ok(())
}

/// Test that missing sections and keys fall back to their defaults
#[test]
fn test_read_partial_settings() -> Result<()> {
    let file = toml_file(
        r#"
[config]
max_cycles = 3
"#,
    )?;
    let settings = read_settings(file.path())?;

    assert_eq!(settings.config.max_cycles, 3);
    assert_eq!(settings.config.tolerance, 1e-6);
    assert_eq!(settings.optimizer.max_retries, 25);
    assert_eq!(settings.optimizer.lbfgs_memory, 7);
    assert!(settings.log.file.is_none());
    Ok(())
}

/// Test that environment variables override the file
#[test]
fn test_environment_override() -> Result<()> {
    let file = toml_file(
        r#"
[optimizer]
lbfgs_memory = 4
"#,
    )?;
    std::env::set_var("ORDMIX_OPTIMIZER__COST_TOLERANCE", "0.5");
    let settings = read_settings(file.path());
    std::env::remove_var("ORDMIX_OPTIMIZER__COST_TOLERANCE");
    let settings = settings?;

    assert_eq!(settings.optimizer.lbfgs_memory, 4);
    assert_eq!(settings.optimizer.cost_tolerance, 0.5);
    Ok(())
}

/// Test that a missing file is an error
#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_settings(dir.path().join("absent.toml")).is_err());
}

/// Test writing settings to JSON and reading them back
#[test]
fn test_write_json() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("settings.json");

    let mut settings = Settings::default();
    settings.config.max_cycles = 42;
    settings.log.file = Some("run.log".to_string());
    settings.write_json(&path)?;

    let contents = std::fs::read_to_string(&path)?;
    assert!(contents.contains("\"max_cycles\": 42"));
    let back: Settings = serde_json::from_str(&contents)?;
    assert_eq!(back, settings);
    Ok(())
}
