use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tempfile::TempDir;
use tindex::{TagIndex, TindexConfig, TindexError};
use tindex_journal::{SeqIdGen, StaticJournalCtl};

fn service(dir: &TempDir) -> TagIndex {
    TagIndex::with_id_gen(
        TindexConfig::new(dir.path()),
        Arc::new(StaticJournalCtl::empty()),
        Box::new(SeqIdGen::new("j")),
    )
}

fn service_with_backend(dir: &TempDir, known: &[&str]) -> TagIndex {
    TagIndex::with_id_gen(
        TindexConfig::new(dir.path()),
        Arc::new(StaticJournalCtl::new(
            known.iter().map(|s| (*s).to_string()).collect(),
        )),
        Box::new(SeqIdGen::new("j")),
    )
}

fn snapshot_records(dir: &TempDir) -> HashMap<String, serde_json::Value> {
    let data = std::fs::read(dir.path().join("tindex.dat")).expect("read snapshot");
    serde_json::from_slice(&data).expect("snapshot json")
}

#[tokio::test]
async fn get_or_create_is_idempotent_across_spellings() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");

    let first = index.get_or_create_journal("b=2, a=1").expect("create");
    let second = index.get_or_create_journal("{a=1,b=2}").expect("lookup");

    assert_eq!(first, second);
    assert_eq!(index.len(), 1);
    assert_eq!(snapshot_records(&dir).len(), 1);
}

#[tokio::test]
async fn concurrent_creators_converge_on_one_journal() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");

    let ids: HashSet<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| index.get_or_create_journal("app=web, pod=api-0")))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("join").expect("create"))
            .collect()
    });

    assert_eq!(ids.len(), 1);
    assert_eq!(index.len(), 1);
    assert_eq!(snapshot_records(&dir).len(), 1);
}

#[tokio::test]
async fn snapshot_survives_a_restart() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");
    let web = index.get_or_create_journal("app=web").expect("create web");
    let db = index.get_or_create_journal("app=db").expect("create db");
    index.shutdown();

    // Backend empty: both records are merely stale, which is non-fatal.
    let restarted = service(&dir);
    restarted.init().await.expect("re-init");

    assert_eq!(
        restarted.get_or_create_journal("app=web").expect("lookup"),
        web
    );
    let (matched, total) = restarted.get_journals("", 10, true).expect("scan");
    assert_eq!(total, 2);
    assert_eq!(matched.len(), 2);
    assert!(matched.values().any(|id| *id == db));
}

#[tokio::test]
async fn empty_tags_are_rejected_without_side_effects() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");

    for raw in ["", "   ", " , , ", "{}"] {
        assert!(
            matches!(
                index.get_or_create_journal(raw),
                Err(TindexError::EmptySourceTags)
            ),
            "input {raw:?} should be rejected"
        );
    }
    assert_eq!(index.len(), 0);
    assert_eq!(snapshot_records(&dir).len(), 0);
}

#[tokio::test]
async fn malformed_tags_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");

    assert!(matches!(
        index.get_or_create_journal("no separator"),
        Err(TindexError::InvalidTagFormat(_))
    ));
    assert_eq!(index.len(), 0);
}

#[tokio::test]
async fn failed_save_rolls_the_entry_back() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");
    assert_eq!(index.get_or_create_journal("a=1").expect("create"), "j-1");

    // A non-empty directory at the backup path blocks the snapshot rotation.
    let backup = dir.path().join("tindex.bak");
    std::fs::create_dir(&backup).expect("mkdir");
    std::fs::write(backup.join("blocker"), b"x").expect("blocker");

    assert!(matches!(
        index.get_or_create_journal("b=2"),
        Err(TindexError::Persistence { .. })
    ));
    assert_eq!(index.len(), 1, "failed creation must be rolled back");
    assert_eq!(snapshot_records(&dir).len(), 1);

    // With the obstruction gone the same tags get a brand new entry; the id
    // burned by the failed attempt is never handed out.
    std::fs::remove_dir_all(&backup).expect("unblock");
    assert_eq!(index.get_or_create_journal("b=2").expect("retry"), "j-3");
    assert_eq!(index.len(), 2);
}

#[tokio::test]
async fn init_fails_on_orphaned_journal() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");
    index.get_or_create_journal("a=1").expect("create a");
    index.get_or_create_journal("b=2").expect("create b");
    index.shutdown();

    // j-1 is indexed, j-x is a journal nothing points to.
    let restarted = service_with_backend(&dir, &["j-1", "j-x"]);
    match restarted.init().await {
        Err(TindexError::Inconsistent { journals, records }) => {
            assert_eq!(journals, 2);
            assert_eq!(records, 2);
        }
        other => panic!("expected Inconsistent, got {other:?}"),
    }

    // The failed init leaves the service closed for business.
    assert!(matches!(
        restarted.get_or_create_journal("a=1"),
        Err(TindexError::ServiceClosed)
    ));
}

#[tokio::test]
async fn init_keeps_stale_records() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");
    index.get_or_create_journal("a=1").expect("create a");
    index.get_or_create_journal("b=2").expect("create b");
    index.shutdown();

    // The backend only holds j-1; the b=2 record is stale but stays indexed.
    let restarted = service_with_backend(&dir, &["j-1"]);
    restarted.init().await.expect("re-init");

    let (_, total) = restarted.get_journals("", 10, true).expect("scan");
    assert_eq!(total, 2);
}

#[tokio::test]
async fn scan_caps_results_and_counts_exactly_when_asked() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");

    for pod in ["p1", "p2", "p3", "p4", "p5"] {
        index
            .get_or_create_journal(&format!("app=web, pod={pod}"))
            .expect("create matching");
    }
    index.get_or_create_journal("app=db").expect("create other");

    let (matched, total) = index.get_journals("app=web", 2, false).expect("capped");
    assert_eq!(matched.len(), 2);
    assert!(total >= 2 && total <= 5, "early-stop count was {total}");

    let (matched, total) = index.get_journals("app=web", 2, true).expect("full scan");
    assert_eq!(matched.len(), 2);
    assert_eq!(total, 5);
}

#[tokio::test]
async fn selector_errors_propagate() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");

    assert!(matches!(
        index.get_journals("app=", 10, true),
        Err(TindexError::InvalidTagFormat(_))
    ));
}

#[tokio::test]
async fn shutdown_closes_the_service() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");
    index.get_or_create_journal("a=1").expect("create");

    index.shutdown();
    index.shutdown(); // idempotent

    assert!(matches!(
        index.get_or_create_journal("a=1"),
        Err(TindexError::ServiceClosed)
    ));
    assert!(matches!(
        index.get_journals("", 10, true),
        Err(TindexError::ServiceClosed)
    ));
}

#[tokio::test]
async fn operations_require_init() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);

    assert!(matches!(
        index.get_or_create_journal("a=1"),
        Err(TindexError::ServiceClosed)
    ));
    assert!(matches!(
        index.get_journals("", 10, true),
        Err(TindexError::ServiceClosed)
    ));
}

#[tokio::test]
async fn each_save_keeps_the_previous_snapshot_as_backup() {
    let dir = TempDir::new().expect("tempdir");
    let index = service(&dir);
    index.init().await.expect("init");

    index.get_or_create_journal("a=1").expect("create a");
    index.get_or_create_journal("b=2").expect("create b");

    let backup: HashMap<String, serde_json::Value> = serde_json::from_slice(
        &std::fs::read(dir.path().join("tindex.bak")).expect("read backup"),
    )
    .expect("backup json");
    assert_eq!(backup.len(), 1, "backup should hold the pre-mutation state");
    assert_eq!(snapshot_records(&dir).len(), 2);
}

#[tokio::test]
async fn init_fails_on_corrupted_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("tindex.dat"), b"not json").expect("corrupt");

    let index = service(&dir);
    assert!(matches!(
        index.init().await,
        Err(TindexError::Deserialize(_))
    ));
    assert!(matches!(
        index.get_or_create_journal("a=1"),
        Err(TindexError::ServiceClosed)
    ));
}

#[tokio::test]
async fn disabled_persistence_serves_from_memory_only() {
    let index = TagIndex::with_id_gen(
        TindexConfig::in_memory(),
        Arc::new(StaticJournalCtl::empty()),
        Box::new(SeqIdGen::new("j")),
    );
    index.init().await.expect("init");

    let id = index.get_or_create_journal("a=1").expect("create");
    assert_eq!(id, "j-1");
    assert_eq!(index.get_or_create_journal("a=1").expect("lookup"), id);
}
