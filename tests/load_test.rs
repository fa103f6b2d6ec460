mod common;

use crosstab::pivot::{self, Aggregation, PivotSpec};
use crosstab::sanitize::{self, ExclusionList};
use crosstab::table::ColumnKind;
use crosstab::{open_table, source, FileFormat, OpenOptions};
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

fn write_workbook(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("parts.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = ["region", "sales", "region", "id", "", "note"];
    for (col, name) in header.iter().enumerate().filter(|(_, n)| !n.is_empty()) {
        sheet.write_string(0, col as u16, *name).unwrap();
    }
    let rows: [(&str, f64, &str, f64, &str); 3] = [
        ("North", 10.0, "ignored", 1.0, "x"),
        ("South", 20.0, "ignored", 2.0, "y"),
        ("North", 30.0, "ignored", 3.0, "x"),
    ];
    for (i, (region, sales, dup, id, extra)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *region).unwrap();
        sheet.write_number(row, 1, *sales).unwrap();
        sheet.write_string(row, 2, *dup).unwrap();
        sheet.write_number(row, 3, *id).unwrap();
        sheet.write_string(row, 4, *extra).unwrap();
    }
    // "note" mixes numbers and text
    sheet.write_number(1, 5, 1.0).unwrap();
    sheet.write_string(2, 5, "see above").unwrap();
    sheet.write_number(3, 5, 2.0).unwrap();
    workbook.save(&path).unwrap();
    path
}

#[test]
fn test_excel_is_sanitized_on_load() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(&dir);
    let table = open_table(&path, &OpenOptions::new()).unwrap();

    assert_eq!(
        table.column_names(),
        vec!["region", "sales", "column_5", "note"]
    );
    assert_eq!(table.height(), 3);
    assert_eq!(table.kind("sales"), Some(ColumnKind::Numeric));
    assert_eq!(table.kind("note"), Some(ColumnKind::Mixed));
    let regions = table.string_values("region").unwrap();
    assert_eq!(regions[0].as_deref(), Some("North"));
}

#[test]
fn test_excel_mixed_measure_is_counted() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(&dir);
    let table = open_table(&path, &OpenOptions::new()).unwrap();
    let result = pivot::pivot(&table, &PivotSpec::new("region", "column_5", "note")).unwrap();
    assert_eq!(result.aggregation, Aggregation::Count);
    assert_eq!(result.value("North", "x"), Some(2.0));
    assert_eq!(result.value("South", "y"), Some(1.0));
}

#[test]
fn test_csv_load() {
    let dir = TempDir::new().unwrap();
    let path = common::write_file(
        dir.path(),
        "sales.csv",
        "region,product,sales,created_at\nNorth,A,10,2024-01-01\nSouth,B,20,2024-01-02\n",
    );
    let table = open_table(&path, &OpenOptions::new()).unwrap();
    assert_eq!(table.column_names(), vec!["region", "product", "sales"]);
    assert!(table.kind("sales").unwrap().is_numeric());
}

#[test]
fn test_csv_duplicate_headers_keep_first() {
    let dir = TempDir::new().unwrap();
    let path = common::write_file(dir.path(), "dup.csv", "a,b,a\n1,2,3\n4,5,6\n");
    let table = open_table(&path, &OpenOptions::new()).unwrap();
    assert_eq!(table.column_names(), vec!["a", "b"]);
    let a = table.string_values("a").unwrap();
    assert_eq!(a, vec![Some("1".to_string()), Some("4".to_string())]);
}

#[test]
fn test_forced_format_and_delimiter() {
    let dir = TempDir::new().unwrap();
    let path = common::write_file(dir.path(), "data.txt", "site;count\nx;1\ny;2\n");
    assert!(open_table(&path, &OpenOptions::new()).is_err());
    let options = OpenOptions::new()
        .with_format(FileFormat::Csv)
        .with_delimiter(b';');
    let table = open_table(&path, &options).unwrap();
    assert_eq!(table.column_names(), vec!["site", "count"]);
}

#[test]
fn test_tsv_by_extension() {
    let dir = TempDir::new().unwrap();
    let path = common::write_file(dir.path(), "data.tsv", "site\tcount\nx\t1\n");
    let table = open_table(&path, &OpenOptions::new()).unwrap();
    assert_eq!(table.column_names(), vec!["site", "count"]);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nowhere.csv");
    assert!(open_table(&path, &OpenOptions::new()).is_err());
}

#[test]
fn test_sanitize_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = common::write_file(
        dir.path(),
        "mixed.csv",
        "name,id,name,ref_no,price,image_url\nbolt,1,x,r,2.5,u\n",
    );
    let raw = source::load(&path, &OpenOptions::new()).unwrap();
    let once = sanitize::sanitize(&raw, &ExclusionList::builtin());
    let twice = sanitize::sanitize(&once, &ExclusionList::builtin());
    assert_eq!(once.column_names(), vec!["name", "price"]);
    assert_eq!(twice.column_names(), once.column_names());
}
