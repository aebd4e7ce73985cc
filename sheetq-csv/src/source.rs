use std::fs;
use std::path::PathBuf;

use sheetq_result::{Error, Result};
use sheetq_source::{Connection, ConnectionDescriptor, DataSource, ResultSet, SheetTable, TableProvider, engine};
use sheetq_types::CellValue;

use crate::reader::{CsvReadOptions, read_table};

/// Delimited-text driver: the descriptor's directory is the database and
/// every `.csv` / `.txt` file in it is a table addressed by file name.
#[derive(Debug, Clone, Default)]
pub struct CsvDataSource {
    options: CsvReadOptions,
}

impl CsvDataSource {
    pub fn new(options: CsvReadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CsvReadOptions {
        &self.options
    }
}

impl DataSource for CsvDataSource {
    fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>> {
        if !descriptor.kind.is_delimited() {
            return Err(Error::InvalidArgumentError(format!(
                "'{}' is not a delimited text file",
                descriptor.path.display()
            )));
        }
        let directory = descriptor.directory().to_path_buf();
        if !directory.as_os_str().is_empty() && !directory.is_dir() {
            return Err(Error::data_source(format!(
                "'{}' is not a valid path",
                directory.display()
            )));
        }
        Ok(Box::new(CsvConnection {
            directory,
            has_header: descriptor.has_header,
            options: self.options.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct CsvConnection {
    directory: PathBuf,
    has_header: bool,
    options: CsvReadOptions,
}

impl TableProvider for CsvConnection {
    fn table(&self, token: &str) -> Result<SheetTable> {
        let path = self.directory.join(token);
        if !path.is_file() {
            return Err(Error::data_source(format!(
                "the database engine could not find the object '{token}'"
            )));
        }
        read_table(&path, self.has_header, &self.options)
    }
}

impl Connection for CsvConnection {
    fn execute(&mut self, sql: &str, params: &[CellValue]) -> Result<ResultSet> {
        engine::execute(sql, params, &*self)
    }

    fn column_names(&mut self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.columns)
    }

    /// Delimited files in the directory, sorted by name.
    fn worksheet_names(&mut self) -> Result<Vec<String>> {
        let directory = if self.directory.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            self.directory.clone()
        };
        let mut names = Vec::new();
        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            let delimited = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("txt"));
            if delimited && path.is_file() {
                if let Some(name) = path.file_name() {
                    names.push(name.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn named_ranges(&mut self, _worksheet: Option<&str>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
