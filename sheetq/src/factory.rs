//! Entry point: one factory per file.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use sheetq_csv::CsvDataSource;
use sheetq_executor::{Materialize, NoopLogger, QueryLogger};
use sheetq_plan::{ColumnMapping, QueryArgs, SourceTable, Transformation};
use sheetq_result::{Error, Result};
use sheetq_source::{Connection, ConnectionDescriptor, DataSource};
use sheetq_types::CellValue;
use tracing::debug;

use crate::options::FactoryOptions;
use crate::query::Query;

/// Cached connection plus the header flag it was opened with.
struct OpenConnection {
    has_header: bool,
    connection: Box<dyn Connection>,
}

/// Creates queries against one spreadsheet or delimited file.
///
/// The factory owns the long-lived settings (column mappings, value
/// transformations, [`FactoryOptions`] and the injected [`QueryLogger`]);
/// each query snapshots them into its own [`QueryArgs`] when it is created.
///
/// Without `persistent_connection` every query opens a connection, runs and
/// closes it again. With it, one connection is opened lazily and reused until
/// [`QueryFactory::close_connection`] or drop. The factory is not `Sync`;
/// callers serialize access.
pub struct QueryFactory {
    path: PathBuf,
    source: Box<dyn DataSource>,
    options: FactoryOptions,
    mapping: ColumnMapping,
    transformations: FxHashMap<String, Transformation>,
    logger: Arc<dyn QueryLogger>,
    connection: RefCell<Option<OpenConnection>>,
}

impl QueryFactory {
    pub fn new(path: impl Into<PathBuf>, source: impl DataSource + 'static) -> Self {
        Self {
            path: path.into(),
            source: Box::new(source),
            options: FactoryOptions::default(),
            mapping: ColumnMapping::new(),
            transformations: FxHashMap::default(),
            logger: Arc::new(NoopLogger),
            connection: RefCell::new(None),
        }
    }

    /// Factory over a `.csv`/`.txt` file read by the bundled CSV driver.
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self::new(path, CsvDataSource::default())
    }

    pub fn with_options(mut self, options: FactoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &FactoryOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut FactoryOptions {
        &mut self.options
    }

    /// Map logical field `logical` to worksheet column `physical`.
    pub fn add_mapping(&mut self, logical: impl Into<String>, physical: impl Into<String>) {
        self.mapping.insert(logical, physical);
    }

    /// Register a conversion from the textual cell value of `logical`'s
    /// column to the field value.
    pub fn add_transformation<F>(&mut self, logical: impl Into<String>, transformation: F)
    where
        F: Fn(&str) -> CellValue + Send + Sync + 'static,
    {
        self.transformations
            .insert(logical.into(), Arc::new(transformation));
    }

    pub fn worksheet<M: Materialize>(&self, name: impl Into<String>) -> Query<'_, M> {
        self.query(SourceTable::Worksheet(name.into()), true)
    }

    /// Worksheet whose first row is data; columns are named `F1`, `F2`, ...
    pub fn worksheet_no_header<M: Materialize>(&self, name: impl Into<String>) -> Query<'_, M> {
        self.query(SourceTable::Worksheet(name.into()), false)
    }

    /// Worksheet by zero-based position in the workbook.
    pub fn worksheet_at<M: Materialize>(&self, index: usize) -> Result<Query<'_, M>> {
        let names = self.worksheet_names()?;
        let name = names.get(index).cloned().ok_or_else(|| {
            Error::InvalidArgumentError(format!(
                "worksheet index {index} is out of range, the workbook has {} worksheet(s)",
                names.len()
            ))
        })?;
        Ok(self.worksheet(name))
    }

    /// Cells `start:end` (for example `A1:D4`) of `worksheet`.
    pub fn range<M: Materialize>(
        &self,
        worksheet: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Query<'_, M> {
        self.query(
            SourceTable::Range {
                worksheet: worksheet.into(),
                start: start.into(),
                end: end.into(),
            },
            true,
        )
    }

    pub fn range_no_header<M: Materialize>(
        &self,
        worksheet: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Query<'_, M> {
        self.query(
            SourceTable::Range {
                worksheet: worksheet.into(),
                start: start.into(),
                end: end.into(),
            },
            false,
        )
    }

    /// Named range, scoped to `worksheet` or to the whole workbook.
    pub fn named_range<M: Materialize>(
        &self,
        worksheet: Option<&str>,
        name: impl Into<String>,
    ) -> Query<'_, M> {
        self.query(
            SourceTable::NamedRange {
                worksheet: worksheet.map(str::to_string),
                name: name.into(),
            },
            true,
        )
    }

    /// Rows of the delimited file the factory points at.
    pub fn csv_rows<M: Materialize>(&self) -> Result<Query<'_, M>> {
        let file_name = self.descriptor(true)?.file_name();
        Ok(self.query(SourceTable::Csv { file_name }, true))
    }

    pub fn csv_rows_no_header<M: Materialize>(&self) -> Result<Query<'_, M>> {
        let file_name = self.descriptor(false)?.file_name();
        Ok(self.query(SourceTable::Csv { file_name }, false))
    }

    pub fn worksheet_names(&self) -> Result<Vec<String>> {
        self.with_connection(true, |conn, _| conn.worksheet_names())
    }

    pub fn column_names(&self, worksheet: &str) -> Result<Vec<String>> {
        let token = SourceTable::Worksheet(worksheet.to_string()).table_token();
        self.with_connection(true, |conn, _| conn.column_names(&token))
    }

    /// Column names of a named range.
    pub fn named_range_columns(&self, worksheet: Option<&str>, name: &str) -> Result<Vec<String>> {
        let token = SourceTable::NamedRange {
            worksheet: worksheet.map(str::to_string),
            name: name.to_string(),
        }
        .table_token();
        self.with_connection(true, |conn, _| conn.column_names(&token))
    }

    /// Named ranges scoped to `worksheet`, or the workbook-level ones.
    pub fn named_ranges(&self, worksheet: Option<&str>) -> Result<Vec<String>> {
        self.with_connection(true, |conn, _| conn.named_ranges(worksheet))
    }

    /// Close the persistent connection, if one is open.
    pub fn close_connection(&self) -> Result<()> {
        match self.connection.borrow_mut().take() {
            Some(mut open) => {
                debug!(path = %self.path.display(), "closing persistent connection");
                open.connection.close()
            }
            None => Ok(()),
        }
    }

    pub(crate) fn logger(&self) -> &dyn QueryLogger {
        self.logger.as_ref()
    }

    fn query<M: Materialize>(&self, source: SourceTable, has_header: bool) -> Query<'_, M> {
        let mut args = self.query_args(source, has_header);
        args.skip_empty_rows &= M::SKIPS_BLANK_ROWS;
        Query::new(self, args)
    }

    fn query_args(&self, source: SourceTable, has_header: bool) -> QueryArgs {
        let mut args = QueryArgs::new(source).with_header(has_header);
        args.mapping = self.mapping.clone();
        args.transformations = self.transformations.clone();
        args.strict_mapping = self.options.strict_mapping;
        args.trim_spaces = self.options.trim_spaces;
        args.skip_empty_rows = self.options.skip_empty_rows;
        args.read_only = self.options.read_only;
        args
    }

    fn descriptor(&self, has_header: bool) -> Result<ConnectionDescriptor> {
        ConnectionDescriptor::for_file(self.path.clone(), has_header, self.options.read_only)
    }

    /// Run `f` against a connection for this file, opening and closing one
    /// unless a persistent connection with the same header flag is cached.
    pub(crate) fn with_connection<T>(
        &self,
        has_header: bool,
        f: impl FnOnce(&mut dyn Connection, &ConnectionDescriptor) -> Result<T>,
    ) -> Result<T> {
        let descriptor = self.descriptor(has_header)?;

        if !self.options.persistent_connection {
            let mut connection = self.source.open(&descriptor)?;
            let result = f(&mut *connection, &descriptor);
            let closed = connection.close();
            let value = result?;
            closed?;
            return Ok(value);
        }

        let mut cached = self.connection.borrow_mut();
        if let Some(mut stale) = cached.take_if(|open| open.has_header != has_header) {
            stale.connection.close()?;
        }
        if cached.is_none() {
            debug!(path = %self.path.display(), "opening persistent connection");
            *cached = Some(OpenConnection {
                has_header,
                connection: self.source.open(&descriptor)?,
            });
        }
        match cached.as_mut() {
            Some(open) => f(&mut *open.connection, &descriptor),
            None => Err(Error::Internal("persistent connection missing".into())),
        }
    }
}

impl Drop for QueryFactory {
    fn drop(&mut self) {
        if let Some(mut open) = self.connection.get_mut().take() {
            if let Err(err) = open.connection.close() {
                debug!(error = %err, "failed to close persistent connection");
            }
        }
    }
}
