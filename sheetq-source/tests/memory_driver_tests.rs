use sheetq_result::Error;
use sheetq_source::{
    ConnectionDescriptor, DataSource, MemoryDataSource, NamedRange, Sheet, Workbook,
};
use sheetq_types::CellValue;

fn source() -> MemoryDataSource {
    let sheet = Sheet::new("Sheet1")
        .with_row(["Name", "CEO", "EmployeeCount"])
        .with_row([CellValue::from("ACME"), "Paul".into(), CellValue::Int(25)])
        .with_row([CellValue::from("Omni"), "Ann".into(), CellValue::Int(300)]);
    let workbook = Workbook::new()
        .with_sheet(sheet)
        .with_sheet(Sheet::new("Empty"))
        .with_named_range(NamedRange::new("Firms", "Sheet1", "A1:A3".parse().unwrap()).local());
    MemoryDataSource::new().with_workbook("Companies.xlsx", workbook)
}

#[test]
fn executes_parameterized_statements() {
    let source = source();
    let descriptor = ConnectionDescriptor::for_file("Companies.xlsx", true, true).unwrap();
    let mut conn = source.open(&descriptor).unwrap();

    let set = conn
        .execute(
            "SELECT * FROM [Sheet1$] WHERE ([EmployeeCount] > ?)",
            &[CellValue::Int(25)],
        )
        .unwrap();
    assert_eq!(set.columns, vec!["Name", "CEO", "EmployeeCount"]);
    let rows: Vec<_> = set.rows.collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], CellValue::from("Omni"));
    assert_eq!(source.open_count(), 1);
}

#[test]
fn metadata_queries() {
    let source = source();
    let descriptor = ConnectionDescriptor::for_file("Companies.xlsx", true, true).unwrap();
    let mut conn = source.open(&descriptor).unwrap();
    assert_eq!(conn.worksheet_names().unwrap(), vec!["Sheet1", "Empty"]);
    assert_eq!(conn.named_ranges(Some("Sheet1")).unwrap(), vec!["Firms"]);
    assert!(conn.named_ranges(None).unwrap().is_empty());
    assert_eq!(conn.column_names("Sheet1$Firms").unwrap(), vec!["Name"]);
    assert!(conn.column_names("Empty$").unwrap().is_empty());
}

#[test]
fn closed_connections_and_missing_files() {
    let source = source();
    let descriptor = ConnectionDescriptor::for_file("Companies.xlsx", true, true).unwrap();
    let mut conn = source.open(&descriptor).unwrap();
    conn.close().unwrap();
    assert!(matches!(
        conn.execute("SELECT * FROM [Sheet1$]", &[]),
        Err(Error::DataSource(_))
    ));

    let missing = ConnectionDescriptor::for_file("Other.xlsx", true, true).unwrap();
    assert!(matches!(source.open(&missing), Err(Error::DataSource(_))));
}
