//! Shared helpers for sheetq tests: tracing setup and the companies fixture.

use std::path::{Path, PathBuf};
use std::sync::Once;

use chrono::NaiveDate;
use sheetq_result::Result;
use sheetq_source::{CellRange, MemoryDataSource, NamedRange, Sheet, Workbook};
use sheetq_types::CellValue;

static INIT: Once = Once::new();

/// Initialize tracing for test binaries. Safe to call multiple times.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Another harness may already own the global subscriber.
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(feature = "auto-init")]
mod auto {
    // Use ctor to run at binary init time to avoid having to call init in every test.
    use ctor::ctor;

    #[ctor]
    fn init() {
        super::init_tracing_for_tests();
    }
}

/// Path the companies workbook is registered under.
pub const COMPANIES_PATH: &str = "Companies.xlsx";

pub const COMPANY_COLUMNS: [&str; 4] = ["Name", "CEO", "EmployeeCount", "StartDate"];

/// `(Name, CEO, EmployeeCount, StartDate)` rows of the companies fixture.
pub const COMPANIES: [(&str, &str, i64, (i32, u32, u32)); 7] = [
    ("ACME", "Bugs Bunny", 25, (1918, 11, 11)),
    ("Word Made Flesh", "Chris Heuertz", 16, (1991, 6, 30)),
    ("Anderson University", "James Edwards", 300, (1917, 9, 1)),
    ("Ontario Systems", "Paul", 450, (1980, 4, 15)),
    ("Omni Consumer Products", "Dick Jones", 1025, (1987, 7, 17)),
    ("Spacely Sprockets", "Cosmo Spacely", 8, (1962, 9, 23)),
    ("Initech", "Paul", 45, (1999, 2, 19)),
];

fn company_row(row: &(&str, &str, i64, (i32, u32, u32))) -> Vec<CellValue> {
    let (name, ceo, employees, (y, m, d)) = *row;
    vec![
        CellValue::from(name),
        CellValue::from(ceo),
        CellValue::Int(employees),
        NaiveDate::from_ymd_opt(y, m, d).map_or(CellValue::Null, CellValue::from),
    ]
}

/// Sheet `name` with a header row followed by every company.
pub fn companies_sheet(name: &str, with_header: bool) -> Sheet {
    let sheet = Sheet::new(name);
    let sheet = if with_header {
        sheet.with_row(COMPANY_COLUMNS)
    } else {
        sheet
    };
    COMPANIES
        .iter()
        .fold(sheet, |sheet, row| sheet.with_row(company_row(row)))
}

/// Workbook with `Sheet1` (companies), `NoHeader` (companies without a
/// header row) and `Empty`, plus two named ranges: `NamedRange` on Sheet1
/// (`A1:D4`) and the workbook-level `AllCompanies` (`A1:D8` of Sheet1).
pub fn companies_workbook() -> Result<Workbook> {
    let named: CellRange = "A1:D4".parse()?;
    let all: CellRange = "A1:D8".parse()?;
    Ok(Workbook::new()
        .with_sheet(companies_sheet("Sheet1", true))
        .with_sheet(companies_sheet("NoHeader", false))
        .with_sheet(Sheet::new("Empty"))
        .with_named_range(NamedRange::new("NamedRange", "Sheet1", named).local())
        .with_named_range(NamedRange::new("AllCompanies", "Sheet1", all)))
}

/// In-memory driver serving [`companies_workbook`] at [`COMPANIES_PATH`].
pub fn companies_source() -> Result<MemoryDataSource> {
    Ok(MemoryDataSource::new().with_workbook(COMPANIES_PATH, companies_workbook()?))
}

/// Write the companies fixture as `file_name` (comma separated, with a
/// header row) into `dir` and return the full path.
pub fn write_companies_csv(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let mut text = COMPANY_COLUMNS.join(",");
    text.push('\n');
    for (name, ceo, employees, (y, m, d)) in COMPANIES {
        text.push_str(&format!("{name},{ceo},{employees},{y:04}-{m:02}-{d:02}\n"));
    }
    let path = dir.join(file_name);
    std::fs::write(&path, text)?;
    Ok(path)
}
