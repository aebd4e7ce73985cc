use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::csv::reader::{Format, ReaderBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use sheetq_result::Result;
use sheetq_source::SheetTable;
use sheetq_types::CellValue;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    pub delimiter: u8,
    pub batch_size: Option<usize>,
    /// Rows sampled to find the column count and header names.
    pub max_read_records: Option<usize>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            batch_size: None,
            max_read_records: None,
        }
    }
}

impl CsvReadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub(crate) fn to_format(&self, has_header: bool) -> Format {
        let mut format = Format::default().with_header(has_header);
        if self.delimiter != b',' {
            format = format.with_delimiter(self.delimiter);
        }
        format
    }
}

/// Load a delimited file into a [`SheetTable`].
///
/// Every field is read as text and typed per cell with
/// [`CellValue::infer`], the way the text driver guesses column contents.
/// Headerless files, and blank header fields, get `F1`, `F2`, ... names.
pub fn read_table(path: &Path, has_header: bool, options: &CsvReadOptions) -> Result<SheetTable> {
    let format = options.to_format(has_header);
    let (inferred, _) = format.infer_schema(File::open(path)?, options.max_read_records)?;
    if inferred.fields().is_empty() {
        return Ok(SheetTable::default());
    }

    let columns: Vec<String> = inferred
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            if has_header && !field.name().trim().is_empty() {
                field.name().clone()
            } else {
                format!("F{}", idx + 1)
            }
        })
        .collect();

    let text_schema = Schema::new(
        inferred
            .fields()
            .iter()
            .map(|field| Field::new(field.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let mut builder = ReaderBuilder::new(Arc::new(text_schema)).with_format(format);
    if let Some(batch_size) = options.batch_size {
        builder = builder.with_batch_size(batch_size);
    }
    let reader = builder.build(File::open(path)?)?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        let arrays: Vec<_> = batch.columns().iter().map(|c| c.as_string::<i32>()).collect();
        for row in 0..batch.num_rows() {
            rows.push(
                arrays
                    .iter()
                    .map(|array| {
                        if array.is_null(row) {
                            CellValue::Null
                        } else {
                            CellValue::infer(array.value(row))
                        }
                    })
                    .collect(),
            );
        }
    }
    debug!(path = %path.display(), rows = rows.len(), "loaded delimited file");
    Ok(SheetTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_sample_csv() -> NamedTempFile {
        let mut tmp = NamedTempFile::new().expect("create tmp");
        writeln!(tmp, "Name,CEO,EmployeeCount,StartDate").unwrap();
        writeln!(tmp, "ACME,Paul,25,2008-10-09").unwrap();
        writeln!(tmp, "Omni,,300,1999-01-01").unwrap();
        tmp
    }

    #[test]
    fn header_row_names_columns_and_cells_are_typed() {
        let tmp = write_sample_csv();
        let table = read_table(tmp.path(), true, &CsvReadOptions::default()).expect("read");
        assert_eq!(table.columns, vec!["Name", "CEO", "EmployeeCount", "StartDate"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], CellValue::Int(25));
        assert!(matches!(table.rows[0][3], CellValue::Date(_)));
        assert_eq!(table.rows[1][1], CellValue::Null);
    }

    #[test]
    fn headerless_files_use_positional_names() {
        let tmp = write_sample_csv();
        let table = read_table(tmp.path(), false, &CsvReadOptions::default()).expect("read");
        assert_eq!(table.columns, vec!["F1", "F2", "F3", "F4"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][0], CellValue::from("Name"));
    }

    #[test]
    fn custom_delimiter() {
        let mut tmp = NamedTempFile::new().expect("create tmp");
        writeln!(tmp, "Name;Count").unwrap();
        writeln!(tmp, "ACME;3").unwrap();
        let options = CsvReadOptions::default().with_delimiter(b';');
        let table = read_table(tmp.path(), true, &options).expect("read");
        assert_eq!(table.columns, vec!["Name", "Count"]);
        assert_eq!(table.rows[0][1], CellValue::Int(3));
    }
}
