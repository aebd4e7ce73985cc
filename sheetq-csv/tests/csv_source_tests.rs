use std::fs;

use sheetq_csv::{CsvDataSource, CsvReadOptions};
use sheetq_result::Error;
use sheetq_source::{ConnectionDescriptor, DataSource};
use sheetq_types::CellValue;
use tempfile::TempDir;

fn companies_dir() -> TempDir {
    let dir = TempDir::new().expect("tmp dir");
    fs::write(
        dir.path().join("Companies.csv"),
        "Name,CEO,EmployeeCount\nACME,Paul,25\nOmni,Ann,300\nInitech,Bill,12\n",
    )
    .expect("write csv");
    fs::write(dir.path().join("notes.md"), "ignored").expect("write notes");
    dir
}

#[test]
fn csv_files_are_queryable_tables() {
    let dir = companies_dir();
    let descriptor =
        ConnectionDescriptor::for_file(dir.path().join("Companies.csv"), true, true).unwrap();
    let source = CsvDataSource::new(CsvReadOptions::default());
    let mut conn = source.open(&descriptor).unwrap();

    let set = conn
        .execute(
            "SELECT * FROM [Companies.csv] WHERE ([EmployeeCount] < ?) ORDER BY [Name] ASC",
            &[CellValue::Int(100)],
        )
        .unwrap();
    let rows: Vec<_> = set.rows.collect::<Result<_, _>>().unwrap();
    let names: Vec<_> = rows.iter().map(|r| r[0].to_string()).collect();
    assert_eq!(names, vec!["ACME", "Initech"]);

    assert_eq!(conn.worksheet_names().unwrap(), vec!["Companies.csv"]);
    assert_eq!(
        conn.column_names("Companies.csv").unwrap(),
        vec!["Name", "CEO", "EmployeeCount"]
    );
}

#[test]
fn workbook_descriptors_are_rejected() {
    let descriptor = ConnectionDescriptor::for_file("Companies.xlsx", true, true).unwrap();
    assert!(matches!(
        CsvDataSource::default().open(&descriptor),
        Err(Error::InvalidArgumentError(_))
    ));
}

#[test]
fn missing_file_is_a_data_source_error() {
    let dir = companies_dir();
    let descriptor =
        ConnectionDescriptor::for_file(dir.path().join("Missing.csv"), true, true).unwrap();
    let mut conn = CsvDataSource::default().open(&descriptor).unwrap();
    assert!(matches!(
        conn.execute("SELECT * FROM [Missing.csv]", &[]),
        Err(Error::DataSource(_))
    ));
}
