//! End-to-end tests for single sync runs

use std::fs;

use pretty_assertions::assert_eq;
use rstest::rstest;
use stage_core::hooks::{HookConfig, HookEvent};
use stage_core::{Error, SyncConfig, SyncCounts, SyncEngine, SyncKind, SyncReport};
use stage_test_utils::StagingTree;

fn config(tree: &StagingTree, kind: SyncKind) -> SyncConfig {
    let mut config = SyncConfig::new(kind, tree.input(), tree.outputs());
    config.state_dir = Some(tree.state_dir());
    config
}

fn run(config: &SyncConfig) -> SyncReport {
    SyncEngine::new(config.clone()).run().unwrap()
}

mod quiescence {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_is_published_on_second_observation() {
        let tree = StagingTree::new();
        tree.write("feed/a.txt", "hello\n");
        let config = config(&tree, SyncKind::Archive);

        let first = run(&config);
        assert_eq!(
            first.counts,
            SyncCounts {
                examined: 1,
                new: 1,
                ..SyncCounts::default()
            }
        );
        assert!(tree.output_files(0).is_empty());

        let second = run(&config);
        assert_eq!(second.counts.processed, 1);
        assert_eq!(second.counts.new, 0);
        assert_eq!(tree.output_files(0), vec!["feed/a.txt"]);
        assert_eq!(tree.read_output(0, "feed/a.txt"), "hello\n");
        assert_eq!(second.published, vec![tree.output(0).join("feed/a.txt")]);
    }

    #[test]
    fn growing_file_waits_until_stable() {
        let tree = StagingTree::new();
        tree.write("a.txt", "one\n");
        let config = config(&tree, SyncKind::Archive);

        run(&config);
        tree.append("a.txt", "two\n");
        let growing = run(&config);
        assert_eq!(growing.counts.changed, 1);
        assert_eq!(growing.counts.new, 0);
        assert_eq!(growing.counts.processed, 0);

        let stable = run(&config);
        assert_eq!(stable.counts.processed, 1);
        assert_eq!(tree.read_output(0, "a.txt"), "one\ntwo\n");
    }

    #[test]
    fn rerun_without_changes_ignores_everything() {
        let tree = StagingTree::new();
        tree.write("a.txt", "a");
        tree.write("sub/b.txt", "b");
        let config = config(&tree, SyncKind::Archive);

        run(&config);
        run(&config);
        let third = run(&config);

        assert_eq!(third.counts.processed, 0);
        assert_eq!(third.counts.ignored, 2);
        assert_eq!(third.counts.examined, 2);
    }

    #[test]
    fn processed_file_is_never_republished() {
        let tree = StagingTree::new();
        tree.write("a.txt", "a");
        let config = config(&tree, SyncKind::Archive);
        run(&config);
        run(&config);

        tree.append("a.txt", "more");
        run(&config);
        let report = run(&config);

        assert_eq!(report.counts.ignored, 1);
        assert_eq!(report.counts.processed, 0);
    }

    #[test]
    fn deleted_file_disappears_from_counts() {
        let tree = StagingTree::new();
        tree.write("a.txt", "");
        let config = config(&tree, SyncKind::Archive);

        let first = run(&config);
        assert_eq!((first.counts.examined, first.counts.new), (1, 1));

        let second = run(&config);
        assert_eq!(second.counts.processed, 1);

        tree.remove("a.txt");
        let third = run(&config);
        assert_eq!(third.counts, SyncCounts::default());
        assert!(third.success());
    }
}

mod layout {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(unix)]
    #[test]
    fn hardlink_shares_the_inode() {
        use std::os::unix::fs::MetadataExt;

        let tree = StagingTree::new();
        let source = tree.write("feed/a.txt", "data");
        let config = config(&tree, SyncKind::Archive);
        run(&config);
        run(&config);

        let published = fs::metadata(tree.output(0).join("feed/a.txt")).unwrap();
        assert_eq!(published.ino(), fs::metadata(&source).unwrap().ino());
    }

    #[test]
    fn ordered_names_carry_top_level_and_counter() {
        let tree = StagingTree::new();
        tree.write("feed/sub/a.txt", "a");
        tree.write("loose.txt", "b");
        let mut config = config(&tree, SyncKind::Archive);
        config.ordered = true;
        run(&config);
        run(&config);

        let files = tree.output_files(0);
        assert_eq!(files.len(), 2);
        assert!(files[0].starts_with("feed/"), "{:?}", files);
        assert!(files[0].ends_with("-00000000-feed-sub-a.txt"), "{:?}", files);
        assert!(files[1].starts_with("root/"), "{:?}", files);
        assert!(files[1].ends_with("-00000001-loose.txt"), "{:?}", files);
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    fn round_robin_preserves_publish_order(#[case] outputs: usize) {
        let tree = StagingTree::with_outputs(outputs);
        let names = ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"];
        for name in names {
            tree.write(&format!("feed/{}", name), name);
        }
        let mut config = config(&tree, SyncKind::Prepare);
        config.ordered = true;
        run(&config);
        run(&config);

        let mut merged = Vec::new();
        for index in 0..outputs {
            let files = tree.output_files(index);
            let expected = names.iter().skip(index).step_by(outputs).count();
            assert_eq!(files.len(), expected, "output {}", index);
            merged.extend(files);
        }
        merged.sort_by(|a, b| file_name(a).cmp(file_name(b)));

        let order: Vec<_> = merged
            .iter()
            .map(|f| file_name(f).rsplit('-').next().unwrap().to_string())
            .collect();
        assert_eq!(order, names);
    }

    fn file_name(path: &str) -> &str {
        path.rsplit('/').next().unwrap()
    }

    #[test]
    fn metadata_sidecars_match_their_data() {
        let tree = StagingTree::new();
        tree.write("feed/a.txt", "hello world");
        let mut config = config(&tree, SyncKind::Archive);
        config.metadata = true;
        run(&config);
        let report = run(&config);

        let data = tree.output_files(0);
        let (sidecars, artifacts): (Vec<_>, Vec<_>) =
            data.iter().partition(|f| f.starts_with("feed_meta/"));
        assert_eq!(artifacts.len(), 1);
        assert_eq!(sidecars.len(), 1);
        assert_eq!(sidecars[0], &format!("feed_meta/{}.meta", &artifacts[0]["feed/".len()..]));
        assert_eq!(report.published, vec![tree.output(0).join(artifacts[0])]);

        let record: serde_json::Value =
            serde_json::from_str(&tree.read_output(0, sidecars[0])).unwrap();
        assert_eq!(record["size"], 11);
        assert_eq!(record["path"], artifacts[0].as_str());
        assert_eq!(record["meta_path"], sidecars[0].as_str());
        assert_eq!(
            record["checksum"],
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}

mod run_level {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lock_contention_fails_fast() {
        let tree = StagingTree::new();
        tree.write("a.txt", "a");
        let config = config(&tree, SyncKind::Archive);
        fs::write(config.lock_path(), "4242").unwrap();

        match SyncEngine::new(config.clone()).run() {
            Err(Error::LockHeld { pid, .. }) => assert_eq!(pid, Some(4242)),
            other => panic!("expected LockHeld, got {:?}", other),
        }
        assert!(config.lock_path().exists());
        assert!(!config.state_path().exists());
    }

    #[test]
    fn distinct_kinds_and_names_do_not_contend() {
        let tree = StagingTree::new();
        tree.write("a.txt", "a");
        let archive = config(&tree, SyncKind::Archive);
        fs::write(archive.lock_path(), "1").unwrap();

        let mut prepare = config(&tree, SyncKind::Prepare);
        assert!(SyncEngine::new(prepare.clone()).run().is_ok());

        let mut named = archive.clone();
        named.name = Some("feeds".to_string());
        assert!(SyncEngine::new(named).run().is_ok());

        prepare.name = Some("feeds".to_string());
        assert_ne!(prepare.lock_path(), archive.lock_path());
    }

    #[test]
    fn lock_is_released_after_run() {
        let tree = StagingTree::new();
        let config = config(&tree, SyncKind::Archive);

        run(&config);

        assert!(!config.lock_path().exists());
        assert!(config.state_path().exists());
    }

    #[test]
    fn corrupt_state_is_fatal_and_kept() {
        let tree = StagingTree::new();
        tree.write("a.txt", "a");
        let config = config(&tree, SyncKind::Archive);
        fs::write(config.state_path(), "{not json").unwrap();

        let result = SyncEngine::new(config.clone()).run();

        assert!(matches!(result, Err(Error::StateCorrupt { .. })), "{:?}", result);
        assert_eq!(fs::read_to_string(config.state_path()).unwrap(), "{not json");
        assert!(!config.lock_path().exists());
    }

    #[test]
    fn restart_ignores_previous_state() {
        let tree = StagingTree::new();
        tree.write("a.txt", "a");
        let mut config = config(&tree, SyncKind::Archive);
        run(&config);
        run(&config);

        config.restart = true;
        let report = run(&config);

        assert_eq!(report.counts.ignored, 0);
        assert_eq!(report.counts.new, 1);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let tree = StagingTree::new();
        tree.write("feed/a.txt", "a");
        let mut config = config(&tree, SyncKind::Archive);
        config.dry_run = true;
        config.metadata = true;

        let first = run(&config);
        let second = run(&config);

        assert_eq!(first.counts.new, 1);
        assert_eq!(second.counts.new, 1);
        assert!(second.dry_run);
        assert!(!tree.output(0).exists());
        assert!(!config.state_path().exists());
        assert!(!config.lock_path().exists());
    }

    #[rstest]
    #[case::missing_input(|c: &mut SyncConfig| c.input = Some("/definitely/not/here".into()))]
    #[case::no_outputs(|c: &mut SyncConfig| c.outputs.clear())]
    #[case::archive_with_two_outputs(|c: &mut SyncConfig| c.outputs.push("/tmp/second".into()))]
    #[case::zero_split_lines(|c: &mut SyncConfig| { c.split = true; c.lines = 0; })]
    fn configuration_errors_take_no_lock(#[case] break_config: fn(&mut SyncConfig)) {
        let tree = StagingTree::new();
        let mut config = config(&tree, SyncKind::Archive);
        break_config(&mut config);
        // A held lock would turn a late validation into LockHeld
        fs::write(config.lock_path(), "1").unwrap();

        let result = SyncEngine::new(config).run();

        assert!(matches!(result, Err(Error::Config { .. })), "{:?}", result);
    }

    #[test]
    fn output_that_is_a_file_is_rejected() {
        let tree = StagingTree::new();
        fs::write(tree.output(0), "not a dir").unwrap();
        let config = config(&tree, SyncKind::Archive);

        assert!(matches!(
            SyncEngine::new(config).run(),
            Err(Error::Config { .. })
        ));
    }
}

#[cfg(unix)]
mod hooks {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sh(event: HookEvent, script: &str) -> HookConfig {
        HookConfig {
            event,
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir: None,
        }
    }

    #[test]
    fn post_sync_sees_counts() {
        let tree = StagingTree::new();
        tree.write("a.txt", "a");
        let mut config = config(&tree, SyncKind::Archive);
        let marker = tree.root().join("post");
        config.hooks = vec![sh(
            HookEvent::PostSync,
            &format!("echo \"$STAGESYNC_KIND $STAGESYNC_PROCESSED\" > {}", marker.display()),
        )];

        run(&config);
        run(&config);

        assert_eq!(fs::read_to_string(&marker).unwrap(), "archive 1\n");
    }

    #[test]
    fn failing_pre_sync_aborts_and_releases_lock() {
        let tree = StagingTree::new();
        tree.write("a.txt", "a");
        let mut config = config(&tree, SyncKind::Archive);
        let marker = tree.root().join("failed");
        config.hooks = vec![
            sh(HookEvent::PreSync, "exit 1"),
            sh(
                HookEvent::SyncFailed,
                &format!("touch {}", marker.display()),
            ),
        ];

        let result = SyncEngine::new(config.clone()).run();

        assert!(matches!(result, Err(Error::HookFailed { .. })), "{:?}", result);
        assert!(!config.lock_path().exists());
        assert!(!config.state_path().exists());
        assert!(marker.exists());
    }

    #[test]
    fn failing_post_sync_is_only_logged() {
        let tree = StagingTree::new();
        let mut config = config(&tree, SyncKind::Archive);
        config.hooks = vec![sh(HookEvent::PostSync, "exit 1")];

        assert!(SyncEngine::new(config).run().is_ok());
    }
}
