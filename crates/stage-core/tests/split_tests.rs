//! Tests for chunked publishing through an external `split`
//!
//! These drive the real GNU `split`, so they only run on Linux.
#![cfg(target_os = "linux")]

use std::fs;

use pretty_assertions::assert_eq;
use rstest::rstest;
use stage_core::state::FileStatus;
use stage_core::{StateStore, SyncConfig, SyncEngine, SyncKind, SyncReport};
use stage_test_utils::StagingTree;

fn split_config(tree: &StagingTree) -> SyncConfig {
    let mut config = SyncConfig::new(SyncKind::Archive, tree.input(), tree.outputs());
    config.state_dir = Some(tree.state_dir());
    config.split = true;
    config
}

fn publish(config: &SyncConfig) -> SyncReport {
    let engine = SyncEngine::new(config.clone());
    engine.run().unwrap();
    engine.run().unwrap()
}

#[test]
fn empty_file_yields_one_empty_chunk() {
    let tree = StagingTree::new();
    tree.write("feed/empty.txt", "");

    let report = publish(&split_config(&tree));

    assert_eq!(report.counts.processed, 1);
    assert_eq!(tree.output_files(0), vec!["feed/empty.txt.part-0000"]);
    assert_eq!(tree.read_output(0, "feed/empty.txt.part-0000"), "");
}

#[test]
fn five_lines_at_two_per_chunk() {
    let tree = StagingTree::new();
    tree.write("feed/a.txt", "1\n2\n3\n4\n5\n");
    let mut config = split_config(&tree);
    config.lines = 2;

    let report = publish(&config);

    assert_eq!(
        tree.output_files(0),
        vec![
            "feed/a.txt.part-0000",
            "feed/a.txt.part-0001",
            "feed/a.txt.part-0002"
        ]
    );
    assert_eq!(tree.read_output(0, "feed/a.txt.part-0000"), "1\n2\n");
    assert_eq!(tree.read_output(0, "feed/a.txt.part-0001"), "3\n4\n");
    assert_eq!(tree.read_output(0, "feed/a.txt.part-0002"), "5\n");
    assert_eq!(report.published.len(), 3);
}

#[rstest]
#[case(1, 3)]
#[case(3, 1)]
#[case(4, 1)]
fn chunk_count_is_lines_over_limit_rounded_up(#[case] lines: u64, #[case] chunks: usize) {
    let tree = StagingTree::new();
    tree.write("a.txt", "x\ny\nz\n");
    let mut config = split_config(&tree);
    config.lines = lines;

    publish(&config);

    assert_eq!(tree.output_files(0).len(), chunks);
}

#[test]
fn bytes_limit_wins_over_lines() {
    let tree = StagingTree::new();
    tree.write("a.bin", "abcdefghij");
    let mut config = split_config(&tree);
    config.lines = 1;
    config.bytes = Some(4);

    publish(&config);

    assert_eq!(tree.read_output(0, "a.bin.part-0000"), "abcd");
    assert_eq!(tree.read_output(0, "a.bin.part-0001"), "efgh");
    assert_eq!(tree.read_output(0, "a.bin.part-0002"), "ij");
}

#[rstest]
#[case(true, "a\nb\n")]
#[case(false, "a\r\nb\r\n")]
fn clean_strips_carriage_returns(#[case] clean: bool, #[case] expected: &str) {
    let tree = StagingTree::new();
    tree.write("a.txt", "a\r\nb\r\n");
    let mut config = split_config(&tree);
    config.clean = clean;

    publish(&config);

    assert_eq!(tree.read_output(0, "a.txt.part-0000"), expected);
}

#[test]
fn every_chunk_gets_a_sidecar() {
    let tree = StagingTree::new();
    tree.write("feed/a.txt", "1\n2\n3\n");
    let mut config = split_config(&tree);
    config.lines = 2;
    config.metadata = true;

    publish(&config);

    let files = tree.output_files(0);
    let chunks: Vec<_> = files.iter().filter(|f| f.starts_with("feed/")).collect();
    let sidecars: Vec<_> = files.iter().filter(|f| f.starts_with("feed_meta/")).collect();
    assert_eq!(chunks.len(), 2);
    assert_eq!(sidecars.len(), 2);
    for (chunk, sidecar) in chunks.iter().zip(&sidecars) {
        assert_eq!(
            **sidecar,
            format!("feed_meta/{}.meta", &chunk["feed/".len()..])
        );
    }
}

#[test]
fn split_failure_leaves_file_pending() {
    let tree = StagingTree::new();
    let source = tree.write("a.txt", "data\n");
    let mut config = split_config(&tree);
    config.split_program = "false".to_string();

    let report = publish(&config);

    assert_eq!(report.counts.error, 1);
    assert_eq!(report.counts.processed, 0);
    assert!(report.failed());

    let state = StateStore::new(config.state_path(), false, false).load().unwrap();
    let source = fs::canonicalize(source).unwrap();
    assert_eq!(state.get(&source), Some(FileStatus::Pending(5)));

    config.split_program = "split".to_string();
    let retry = SyncEngine::new(config).run().unwrap();
    assert_eq!(retry.counts.processed, 1);
    assert_eq!(retry.counts.error, 0);
}

#[test]
fn republishing_replaces_stale_chunks() {
    let tree = StagingTree::new();
    tree.write("a.txt", "1\n2\n3\n");
    let mut config = split_config(&tree);
    config.lines = 1;
    publish(&config);
    assert_eq!(tree.output_files(0).len(), 3);

    config.restart = true;
    config.lines = 10;
    let engine = SyncEngine::new(config.clone());
    engine.run().unwrap();
    config.restart = false;
    SyncEngine::new(config).run().unwrap();

    assert_eq!(tree.output_files(0), vec!["a.txt.part-0000"]);
}
