//! Reconciliation: drift repair from ground truth and idempotency.

mod common;

use common::{doc_about, open_shelf};
use doc_shelf::ingest::{list_documents, upload_documents};
use doc_shelf::reconcile::reconcile;
use doc_shelf::search::query_documents;

#[tokio::test]
async fn reconcile_repairs_drift_in_both_directions() {
    let (_tmp, config, shelf) = open_shelf().await;

    let outcome = upload_documents(
        &shelf,
        vec![
            ("a.txt".to_string(), doc_about("zebra")),
            ("b.txt".to_string(), doc_about("violin")),
        ],
    )
    .await
    .unwrap();
    outcome.job.unwrap().await.unwrap();

    // Drift: b.txt loses its backing file, c.txt appears on disk without
    // ever being registered.
    std::fs::remove_file(config.storage.blob_dir().join("b.txt")).unwrap();
    std::fs::write(config.storage.blob_dir().join("c.txt"), doc_about("comet")).unwrap();

    let report = reconcile(&shelf).await.unwrap();
    assert_eq!(report.added_to_catalog, vec!["c.txt".to_string()]);
    assert_eq!(report.removed_from_catalog, vec!["b.txt".to_string()]);
    assert_eq!(report.indexed_files, 2);

    let mut documents = list_documents(&shelf).await.unwrap();
    documents.sort();
    assert_eq!(documents, vec!["a.txt".to_string(), "c.txt".to_string()]);

    // The rebuilt index matches the repaired catalog exactly.
    let hits = query_documents(&shelf, "comet", 3, None).await.unwrap();
    assert_eq!(hits[0].source, "c.txt");
    let hits = query_documents(&shelf, "violin", 5, None).await.unwrap();
    assert!(hits.iter().all(|h| h.source != "b.txt"));
}

#[tokio::test]
async fn reconcile_twice_changes_nothing_the_second_time() {
    let (_tmp, config, shelf) = open_shelf().await;

    let outcome = upload_documents(
        &shelf,
        vec![
            ("a.txt".to_string(), doc_about("zebra")),
            ("b.txt".to_string(), doc_about("violin")),
        ],
    )
    .await
    .unwrap();
    outcome.job.unwrap().await.unwrap();

    std::fs::write(config.storage.blob_dir().join("c.txt"), doc_about("comet")).unwrap();

    let first = reconcile(&shelf).await.unwrap();
    assert_eq!(first.added_to_catalog, vec!["c.txt".to_string()]);

    let catalog_after_first = list_documents(&shelf).await.unwrap();
    let index_after_first = shelf.index_filenames();

    let second = reconcile(&shelf).await.unwrap();
    assert!(second.added_to_catalog.is_empty());
    assert!(second.removed_from_catalog.is_empty());
    assert_eq!(second.indexed_files, first.indexed_files);
    assert_eq!(second.indexed_chunks, first.indexed_chunks);

    assert_eq!(list_documents(&shelf).await.unwrap(), catalog_after_first);
    assert_eq!(shelf.index_filenames(), index_after_first);
}

#[tokio::test]
async fn reconcile_restores_a_lost_index_artifact() {
    let (_tmp, config, shelf) = open_shelf().await;

    let outcome = upload_documents(&shelf, vec![("a.txt".to_string(), doc_about("zebra"))])
        .await
        .unwrap();
    outcome.job.unwrap().await.unwrap();

    // Simulate a crashed or lost artifact; catalog and blobs still agree.
    std::fs::remove_file(config.storage.index_path()).unwrap();
    assert!(query_documents(&shelf, "zebra", 3, None)
        .await
        .unwrap()
        .is_empty());

    let report = reconcile(&shelf).await.unwrap();
    assert!(report.added_to_catalog.is_empty());
    assert!(report.removed_from_catalog.is_empty());
    assert_eq!(report.indexed_files, 1);

    let hits = query_documents(&shelf, "zebra", 3, None).await.unwrap();
    assert_eq!(hits[0].source, "a.txt");
}

#[tokio::test]
async fn reconcile_on_empty_stores_is_a_no_op() {
    let (_tmp, _config, shelf) = open_shelf().await;

    let report = reconcile(&shelf).await.unwrap();
    assert!(report.added_to_catalog.is_empty());
    assert!(report.removed_from_catalog.is_empty());
    assert_eq!(report.indexed_files, 0);
    assert_eq!(report.indexed_chunks, 0);
    assert!(list_documents(&shelf).await.unwrap().is_empty());
}
