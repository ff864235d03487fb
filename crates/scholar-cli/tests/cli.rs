//! Integration tests for the scholar CLI commands.
//!
//! Tests run in serial and never touch the network; every command is pointed at a temporary
//! configuration, paper directory and database.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::tempdir;

// Helper function to create a clean command instance
fn scholar(config: &Path) -> Command {
  let mut cmd = Command::cargo_bin("scholar").unwrap();
  cmd.arg("--config").arg(config).env_remove("OPENROUTER_API_KEY").env_remove("RUST_LOG");
  cmd
}

// Helper to write a paper file for one date and category
fn write_papers(papers_dir: &Path, date: &str, category: &str, body: &str) -> PathBuf {
  let dir = papers_dir.join(date);
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join(format!("{category}_papers.json"));
  std::fs::write(&path, body).unwrap();
  path
}

#[test]
#[serial]
fn test_help_lists_commands() {
  let dir = tempdir().unwrap();
  scholar(&dir.path().join("config.toml"))
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("fetch"))
    .stdout(predicate::str::contains("analyze"))
    .stdout(predicate::str::contains("dates"))
    .stdout(predicate::str::contains("search"));
}

#[test]
#[serial]
fn test_dates_lists_newest_first() {
  let dir = tempdir().unwrap();
  let papers_dir = dir.path().join("papers");
  write_papers(&papers_dir, "2024-11-04", "cs.AI", "[]");
  write_papers(&papers_dir, "2024-11-05", "cs.LG", "[]");

  scholar(&dir.path().join("config.toml"))
    .arg("dates")
    .arg("--papers-dir")
    .arg(&papers_dir)
    .assert()
    .success()
    .stdout(predicate::str::is_match(r"(?s)2024-11-05.*2024-11-04").unwrap());
}

#[test]
#[serial]
fn test_dates_uses_configured_directory() {
  let dir = tempdir().unwrap();
  let papers_dir = dir.path().join("configured");
  write_papers(&papers_dir, "2024-10-01", "cs.CL", "[]");
  let config = dir.path().join("config.toml");
  std::fs::write(&config, format!("[output]\nbase_dir = {:?}\n", papers_dir.display().to_string()))
    .unwrap();

  scholar(&config).arg("dates").assert().success().stdout(predicate::str::contains("2024-10-01"));
}

#[test]
#[serial]
fn test_dates_without_papers() {
  let dir = tempdir().unwrap();
  scholar(&dir.path().join("config.toml"))
    .arg("dates")
    .arg("--papers-dir")
    .arg(dir.path().join("empty"))
    .assert()
    .success()
    .stdout(predicate::str::contains("No fetched papers"));
}

#[test]
#[serial]
fn test_analyze_requires_api_key() {
  let dir = tempdir().unwrap();
  let papers_dir = dir.path().join("papers");
  write_papers(&papers_dir, "2024-11-05", "cs.AI", r#"[{"id": "1", "title": "T"}]"#);

  scholar(&dir.path().join("config.toml"))
    .arg("analyze")
    .arg("2024-11-05")
    .arg("robotics")
    .arg("--papers-dir")
    .arg(&papers_dir)
    .assert()
    .failure()
    .stderr(predicate::str::contains("MissingApiKey"));
}

#[test]
#[serial]
fn test_analyze_rejects_unknown_audience() {
  let dir = tempdir().unwrap();
  scholar(&dir.path().join("config.toml"))
    .arg("analyze")
    .arg("2024-11-05")
    .arg("robotics")
    .arg("--audience")
    .arg("toddler")
    .assert()
    .failure()
    .stderr(predicate::str::contains("toddler"));
}

#[test]
#[serial]
fn test_analyze_records_missing_abstract() {
  let dir = tempdir().unwrap();
  let papers_dir = dir.path().join("papers");
  write_papers(&papers_dir, "2024-11-05", "cs.AI", r#"[{"id": "2411.1", "title": "No Abstract"}]"#);

  scholar(&dir.path().join("config.toml"))
    .arg("analyze")
    .arg("2024-11-05")
    .arg("robotics")
    .arg("--papers-dir")
    .arg(&papers_dir)
    .arg("--api-key")
    .arg("sk-test")
    .assert()
    .success()
    .stdout(predicate::str::contains("abstract_extraction"))
    .stdout(predicate::str::contains("Report saved to"));

  let reports: Vec<_> = std::fs::read_dir(papers_dir.join("2024-11-05"))
    .unwrap()
    .flatten()
    .map(|entry| entry.file_name().to_string_lossy().into_owned())
    .filter(|name| name.starts_with("analysis_robotics_general_"))
    .collect();
  assert_eq!(reports.len(), 1);
  assert!(reports[0].ends_with("_sr0.json"));
}

#[test]
#[serial]
fn test_search_empty_database() {
  let dir = tempdir().unwrap();
  let db_path = dir.path().join("papers.db");

  scholar(&dir.path().join("config.toml"))
    .arg("search")
    .arg("transformers")
    .arg("--database")
    .arg(&db_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("No papers found"));

  assert!(db_path.exists());
}
