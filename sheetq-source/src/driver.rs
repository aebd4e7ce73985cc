//! The contract between the query pipeline and a tabular data driver.

use std::fmt;

use sheetq_result::Result;
use sheetq_types::CellValue;

use crate::descriptor::ConnectionDescriptor;

/// Row cursor returned by [`Connection::execute`].
pub type RowIter = Box<dyn Iterator<Item = Result<Vec<CellValue>>>>;

/// Column schema plus a forward-only cursor over the rows.
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: RowIter,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: RowIter) -> Self {
        Self { columns, rows }
    }

    /// Build a result set over rows that are already in memory.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self::new(columns, Box::new(rows.into_iter().map(Ok)))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Opens connections for a descriptor.
pub trait DataSource {
    fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>>;
}

/// A shared source; the caller keeps a handle while a factory owns a clone.
impl<D: DataSource + ?Sized> DataSource for std::sync::Arc<D> {
    fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>> {
        (**self).open(descriptor)
    }
}

/// An open connection to one file.
pub trait Connection {
    /// Run `sql`, binding `params` to the `?` placeholders in order.
    fn execute(&mut self, sql: &str, params: &[CellValue]) -> Result<ResultSet>;

    /// Column names of a table token (`Sheet1$`, `Sheet1$A1:D4`, ...).
    fn column_names(&mut self, table: &str) -> Result<Vec<String>>;

    fn worksheet_names(&mut self) -> Result<Vec<String>>;

    /// Named ranges scoped to `worksheet`, or the workbook-level ranges when
    /// `worksheet` is `None`.
    fn named_ranges(&mut self, worksheet: Option<&str>) -> Result<Vec<String>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
