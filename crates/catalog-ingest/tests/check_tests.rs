//! Dry runs over local files, as done by `catalog-ingest check`

mod helpers;

use catalog_ingest::config::IngestConfig;
use catalog_ingest::pipeline::dry_run;
use catalog_ingest::{ObjectRef, PipelineError};
use helpers::*;

fn run(path: &std::path::Path) -> Result<catalog_ingest::ProcessingOutcome, PipelineError> {
    let data = std::fs::read(path).unwrap();
    let object = ObjectRef::new("local", path.to_string_lossy());
    dry_run(&object, &data, &IngestConfig::default().limits)
}

#[test]
fn test_check_local_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products.csv");
    std::fs::write(&path, csv_file(&["Widget,A widget,9.99,5", ",Bad,-1,x"])).unwrap();

    let outcome = run(&path).unwrap();

    assert!(outcome.dry_run);
    assert_eq!(outcome.total_records, 2);
    assert_eq!(outcome.successful_inserts, 1);
    assert_eq!(outcome.failed_validations, 1);
    assert!(outcome.table_name.is_none());
}

#[test]
fn test_check_local_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stock.XLSX");
    std::fs::write(
        &path,
        xlsx_file(&[
            vec!["name".into(), "description".into(), "price".into(), "quantity".into()],
            vec!["Widget".into(), "A widget".into(), Cell::Number(9.99), Cell::Number(5.0)],
        ]),
    )
    .unwrap();

    let outcome = run(&path).unwrap();

    assert_eq!(outcome.total_records, 1);
    assert_eq!(outcome.successful_inserts, 1);
}

#[test]
fn test_check_rejects_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "name,description,price,quantity\n").unwrap();

    assert!(matches!(run(&path), Err(PipelineError::UnsupportedFormat(_))));
}
