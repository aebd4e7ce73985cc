//! sheetq: declarative queries over spreadsheets and CSV files.
//!
//! A query is a pipeline of operators over an expression tree. The pipeline
//! is translated into a parameterized statement scoped to a worksheet, cell
//! range or named range, executed through a [`DataSource`] driver, and the
//! rows come back as typed records, generic [`Row`]s or scalars.
//!
//! ```rust
//! use sheetq::{CellValue, MemoryDataSource, QueryFactory, Sheet, Workbook, field, record};
//!
//! #[derive(Debug, Default)]
//! struct Company {
//!     name: String,
//!     employee_count: i64,
//! }
//!
//! record!(Company { name: String, employee_count: i64 });
//!
//! let sheet = Sheet::new("Sheet1")
//!     .with_row(["Name", "EmployeeCount"])
//!     .with_row([CellValue::from("ACME"), CellValue::Int(25)])
//!     .with_row([CellValue::from("Omni"), CellValue::Int(300)]);
//! let source = MemoryDataSource::new()
//!     .with_workbook("Companies.xlsx", Workbook::new().with_sheet(sheet));
//!
//! let mut factory = QueryFactory::new("Companies.xlsx", source);
//! factory.add_mapping("name", "Name");
//! factory.add_mapping("employee_count", "EmployeeCount");
//!
//! let big = factory
//!     .worksheet::<Company>("Sheet1")
//!     .filter(field("employee_count").gt(100))
//!     .to_vec()
//!     .unwrap();
//! assert_eq!(big[0].name, "Omni");
//! ```
//!
//! # Crates
//!
//! - `sheetq-expr`: expression tree and operator pipeline
//! - `sheetq-plan`: translation into [`SqlStatement`]s
//! - `sheetq-source`: the driver contract and an in-memory workbook driver
//! - `sheetq-csv`: a delimited-text driver
//! - `sheetq-executor`: execution and materialization
#![forbid(unsafe_code)]

pub mod factory;
pub mod options;
pub mod query;

pub use factory::QueryFactory;
pub use options::FactoryOptions;
pub use query::{Projected, Query};

pub use sheetq_csv::{CsvDataSource, CsvReadOptions};
pub use sheetq_executor::{
    MemoryLogger, NoopLogger, QueryLogger, Record, Row, Rows, TracingLogger, record,
};
pub use sheetq_expr::{
    CapturedValue, Expr, QueryOp, Value, captured, column, column_at, date, field,
    is_null_or_empty, lit,
};
pub use sheetq_plan::{SqlStatement, StrictMapping, TrimSpaces};
pub use sheetq_result::{ConversionError, Error, Result};
pub use sheetq_source::{
    CellRange, Connection, ConnectionDescriptor, DataSource, MemoryDataSource, NamedRange, Sheet,
    Workbook,
};
pub use sheetq_types::{CellValue, FromCell};
