//! End-to-end tests for atomic writes followed by resilient reads.

use cabletrace_jsonl::{Warning, read_jsonl_resilient, write_jsonl_atomic};
use rstest::rstest;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tempfile::{NamedTempFile, tempdir};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Port {
    id: u64,
    name: String,
}

fn port(id: u64, name: &str) -> Port {
    Port {
        id,
        name: name.to_string(),
    }
}

#[tokio::test]
async fn atomic_write_replaces_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ports.jsonl");

    write_jsonl_atomic(&path, &[port(1, "eth0"), port(2, "eth1")])
        .await
        .unwrap();
    write_jsonl_atomic(&path, &[port(3, "eth2")]).await.unwrap();

    let (ports, warnings) = read_jsonl_resilient::<Port, _>(&path).await.unwrap();
    assert_eq!(ports, vec![port(3, "eth2")]);
    assert!(warnings.is_empty());
    assert!(!dir.path().join("ports.jsonl.tmp").exists());
}

#[rstest]
#[case::truncated_object("{\"id\": 2, \"name\":", 2)]
#[case::wrong_type("{\"id\": \"two\", \"name\": \"eth1\"}", 2)]
#[case::plain_text("not json at all", 2)]
#[tokio::test]
async fn corrupt_line_is_skipped(#[case] corrupt: &str, #[case] expected_line: usize) {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{\"id\": 1, \"name\": \"eth0\"}}").unwrap();
    writeln!(file, "{corrupt}").unwrap();
    writeln!(file, "{{\"id\": 3, \"name\": \"eth2\"}}").unwrap();
    file.flush().unwrap();

    let (ports, warnings) = read_jsonl_resilient::<Port, _>(file.path()).await.unwrap();

    assert_eq!(ports, vec![port(1, "eth0"), port(3, "eth2")]);
    assert_eq!(warnings.len(), 1);
    assert!(matches!(warnings[0], Warning::MalformedJson { .. }));
    assert_eq!(warnings[0].line_number(), expected_line);
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let result = read_jsonl_resilient::<Port, _>(dir.path().join("absent.jsonl")).await;

    assert!(matches!(result, Err(cabletrace_jsonl::Error::Io(_))));
}

#[tokio::test]
async fn failed_rename_reports_the_target_and_cleans_up() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("ports.jsonl");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep"), "").unwrap();

    let result = write_jsonl_atomic(&target, &[port(1, "eth0")]).await;

    match result {
        Err(cabletrace_jsonl::Error::Replace { path, .. }) => assert_eq!(path, target),
        other => panic!("expected a replace error, got {other:?}"),
    }
    assert!(target.join("keep").exists());
    assert!(!dir.path().join("ports.jsonl.tmp").exists());
}
