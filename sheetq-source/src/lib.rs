//! Tabular data drivers for sheetq.
//!
//! The query pipeline talks to files only through [`DataSource`] and
//! [`Connection`]. This crate defines that contract, derives
//! [`ConnectionDescriptor`]s from file paths and ships an in-memory workbook
//! driver whose [`engine`] executes the statements the planner renders.
#![forbid(unsafe_code)]

pub mod descriptor;
pub mod driver;
pub mod engine;
pub mod memory;
pub mod workbook;

pub use descriptor::{ConnectionDescriptor, FileKind};
pub use driver::{Connection, DataSource, ResultSet, RowIter};
pub use engine::{AGGREGATE_COLUMN, TableProvider};
pub use memory::{MemoryConnection, MemoryDataSource};
pub use workbook::{CellRange, NamedRange, Sheet, SheetTable, Workbook};
