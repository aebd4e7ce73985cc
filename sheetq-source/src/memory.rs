//! Driver over workbooks held in memory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rustc_hash::FxHashMap;
use sheetq_result::{Error, Result};
use sheetq_types::CellValue;
use tracing::debug;

use crate::descriptor::ConnectionDescriptor;
use crate::driver::{Connection, DataSource, ResultSet};
use crate::engine::{self, TableProvider};
use crate::workbook::{SheetTable, Workbook};

/// Serves registered workbooks by path.
#[derive(Debug, Default)]
pub struct MemoryDataSource {
    workbooks: FxHashMap<PathBuf, Arc<Workbook>>,
    opened: AtomicUsize,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workbook(mut self, path: impl Into<PathBuf>, workbook: Workbook) -> Self {
        self.insert(path, workbook);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, workbook: Workbook) {
        self.workbooks.insert(path.into(), Arc::new(workbook));
    }

    /// Number of connections opened so far.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    fn workbook(&self, path: &Path) -> Result<Arc<Workbook>> {
        self.workbooks
            .get(path)
            .cloned()
            .ok_or_else(|| Error::data_source(format!("could not find file '{}'", path.display())))
    }
}

impl DataSource for MemoryDataSource {
    fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>> {
        if descriptor.kind.is_delimited() {
            return Err(Error::InvalidArgumentError(format!(
                "'{}' is delimited text; use the CSV data source",
                descriptor.path.display()
            )));
        }
        let workbook = self.workbook(&descriptor.path)?;
        self.opened.fetch_add(1, Ordering::Relaxed);
        debug!(path = %descriptor.path.display(), "opened in-memory workbook");
        Ok(Box::new(MemoryConnection {
            workbook,
            has_header: descriptor.has_header,
            closed: false,
        }))
    }
}

/// Connection to one in-memory workbook.
#[derive(Debug)]
pub struct MemoryConnection {
    workbook: Arc<Workbook>,
    has_header: bool,
    closed: bool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::data_source("connection is closed"));
        }
        Ok(())
    }
}

impl TableProvider for MemoryConnection {
    fn table(&self, token: &str) -> Result<SheetTable> {
        self.workbook.table(token, self.has_header)
    }
}

impl Connection for MemoryConnection {
    fn execute(&mut self, sql: &str, params: &[CellValue]) -> Result<ResultSet> {
        self.ensure_open()?;
        engine::execute(sql, params, &*self)
    }

    fn column_names(&mut self, table: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.table(table)?.columns)
    }

    fn worksheet_names(&mut self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.workbook.worksheet_names())
    }

    fn named_ranges(&mut self, worksheet: Option<&str>) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.workbook.named_ranges(worksheet))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
