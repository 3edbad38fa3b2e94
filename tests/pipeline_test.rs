//! End-to-end tests of scan, export and merge against a fake engine.

mod common;

use common::{page_widths, touch, FakeEngine};
use sheets2pdf::engine::SheetVisibility::{Hidden, VeryHidden, Visible};
use sheets2pdf::{BatchRunner, Config, FolderScanner, NumberRange, SheetExporter};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn config(root: &Path, start: i64, end: i64) -> Config {
    Config {
        source_folder: root.join("source"),
        export_folder: root.join("export"),
        merge_folder: root.join("merged"),
        range: NumberRange::new(start, end).unwrap(),
    }
}

fn merged_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_full_run_exports_and_merges_in_range() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("source");
    touch(&source, "2990 Too Early", "inv2990.xlsx");
    touch(&source, "2991 ACME", "inv2991.xlsx");
    touch(&source, "2991 ACME", "readme.txt");
    touch(&source, "2992 Globex", "inv2992.xlsm");
    touch(&source, "2993 Initech", "inv2993.xlsx");
    touch(&source, "2995 Umbrella", "inv2995.xlsx");
    touch(&source, "2996 Too Late", "inv2996.xlsx");
    touch(&source, "Archive", "old.xlsx");

    let engine = FakeEngine::new().with_sheets("inv2993.xlsx", vec![Visible, Hidden, VeryHidden]);
    let summary = BatchRunner::new(config(root.path(), 2991, 2995), &engine)
        .run()
        .await
        .unwrap();

    assert_eq!(
        engine.opened_names(),
        vec!["inv2991.xlsx", "inv2992.xlsm", "inv2993.xlsx", "inv2995.xlsx"]
    );
    assert_eq!(*engine.closed.borrow(), 4);

    let numbers: Vec<i64> = summary.exported.iter().map(|e| e.number).collect();
    assert_eq!(numbers, vec![2991, 2992, 2995]);
    assert!(summary.exported[0]
        .path
        .ends_with("export/inv2991_invoice+specification.pdf"));

    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].path.ends_with("inv2993.xlsx"));
    assert!(!root
        .path()
        .join("export/inv2993_invoice+specification.pdf")
        .exists());

    let merged = summary.merged.clone().expect("merged PDF");
    assert_eq!(
        merged.file_name().unwrap().to_string_lossy(),
        "Invoice+Specification 2991-2992;2995.pdf"
    );
    assert_eq!(page_widths(&merged), vec![2991, 2992, 2995]);
    assert!(!summary.merge_failed());
}

#[tokio::test]
async fn test_merge_follows_walk_order_not_numeric_order() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("source");
    // "10 ..." sorts before "9 ..." by name.
    touch(&source, "10 Zeta", "b.xlsx");
    touch(&source, "9 Alpha", "a.xlsx");

    let engine = FakeEngine::new();
    let summary = BatchRunner::new(config(root.path(), 1, 20), &engine)
        .run()
        .await
        .unwrap();

    let merged = summary.merged.unwrap();
    assert_eq!(
        merged.file_name().unwrap().to_string_lossy(),
        "Invoice+Specification 9-10.pdf"
    );
    assert_eq!(page_widths(&merged), vec![10, 9]);
}

#[tokio::test]
async fn test_nothing_in_range_writes_no_merged_file() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("source");
    touch(&source, "100 Someone", "inv.xlsx");

    let engine = FakeEngine::new();
    let summary = BatchRunner::new(config(root.path(), 1, 5), &engine)
        .run()
        .await
        .unwrap();

    assert!(engine.opened_names().is_empty());
    assert!(summary.exported.is_empty());
    assert!(summary.merged.is_none());
    assert!(!summary.merge_failed());
    assert!(merged_files(&root.path().join("merged")).is_empty());
}

#[tokio::test]
async fn test_engine_failure_skips_only_that_file() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("source");
    touch(&source, "1 A", "one.xlsx");
    touch(&source, "2 B", "two.xlsx");
    touch(&source, "3 C", "three.xlsx");

    let engine = FakeEngine::new().failing("two.xlsx");
    let exporter = SheetExporter::new(&engine);
    let report = FolderScanner::new(exporter)
        .scan(
            &source,
            &root.path().join("export"),
            NumberRange::new(1, 3).unwrap(),
        )
        .await
        .unwrap();

    let numbers: Vec<i64> = report.exported.iter().map(|e| e.number).collect();
    assert_eq!(numbers, vec![1, 3]);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("converter crashed"));
    assert_eq!(*engine.closed.borrow(), 3);
}

#[tokio::test]
async fn test_scan_creates_export_folder() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("source");
    fs::create_dir_all(&source).unwrap();
    let export = root.path().join("deep/nested/export");

    let engine = FakeEngine::new();
    let report = FolderScanner::new(SheetExporter::new(&engine))
        .scan(&source, &export, NumberRange::new(1, 1).unwrap())
        .await
        .unwrap();

    assert!(report.exported.is_empty());
    assert!(export.is_dir());
}

#[tokio::test]
async fn test_corrupt_export_reports_merge_failure() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("source");
    touch(&source, "1 A", "one.xlsx");
    touch(&source, "2 B", "two.xlsx");

    let first = BatchRunner::new(config(root.path(), 1, 2), &FakeEngine::new())
        .run()
        .await
        .unwrap();
    assert!(first.merged.is_some());

    // The second run fails to re-export "two" and finds a damaged PDF left behind.
    fs::write(root.path().join("export/two_invoice+specification.pdf"), b"garbage").unwrap();
    let broken = FakeEngine::new().failing("two.xlsx");
    let summary = BatchRunner::new(config(root.path(), 1, 2), &broken)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.exported.len(), 2);
    assert!(summary.skipped.is_empty());
    assert!(summary.merge_failed());
    assert!(summary.merged.is_none());
}

#[tokio::test]
async fn test_missing_source_folder_fails_the_run() {
    let root = TempDir::new().unwrap();
    let engine = FakeEngine::new();

    let result = BatchRunner::new(config(root.path(), 1, 10), &engine).run().await;

    let err = result.expect_err("missing source must fail the run");
    assert!(err.to_string().contains("does not exist"), "got {}", err);
    assert!(engine.opened_names().is_empty());
    assert!(!root.path().join("merged").read_dir().unwrap().any(|_| true));
}
