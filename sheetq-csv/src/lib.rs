//! Delimited-text driver for sheetq, built on the arrow CSV reader.
#![forbid(unsafe_code)]

pub mod reader;
pub mod source;

pub use reader::{CsvReadOptions, read_table};
pub use source::{CsvConnection, CsvDataSource};
