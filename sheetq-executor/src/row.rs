//! Generic rows: ordered cells with lookup by column name.

use std::ops::Index;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use sheetq_result::{Error, Result};
use sheetq_types::{CellValue, FromCell};

/// Column names of a result set with a case-insensitive name → position
/// lookup. Built once per query and shared by every row.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    names: Vec<String>,
    positions: FxHashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new(names: Vec<String>) -> Self {
        let mut positions = FxHashMap::default();
        for (idx, name) in names.iter().enumerate() {
            // first occurrence wins for duplicate headers
            positions.entry(name.to_lowercase()).or_insert(idx);
        }
        Self { names, positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&name.to_lowercase()).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One result row.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    columns: Arc<ColumnIndex>,
    cells: Vec<CellValue>,
}

impl Row {
    pub fn new(columns: Arc<ColumnIndex>, cells: Vec<CellValue>) -> Self {
        Self { columns, cells }
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.columns.position(name).and_then(|idx| self.cells.get(idx))
    }

    /// Cell of column `name`, or an error naming the valid columns.
    pub fn cell(&self, name: &str) -> Result<&CellValue> {
        self.get(name).ok_or_else(|| Error::UnknownColumn {
            column: name.to_string(),
            valid: self.columns.names().to_vec(),
        })
    }

    /// Convert the cell of column `name` to `T`.
    pub fn get_as<T: FromCell>(&self, name: &str) -> Result<T> {
        let cell = self.cell(name)?;
        T::from_cell(cell).map_err(|err| {
            Error::InvalidArgumentError(format!("column '{name}': {err}"))
        })
    }

    pub fn at(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<CellValue> {
        self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Index<usize> for Row {
    type Output = CellValue;

    fn index(&self, index: usize) -> &CellValue {
        &self.cells[index]
    }
}

impl Index<&str> for Row {
    type Output = CellValue;

    /// Panics when the column does not exist; use [`Row::get`] to check first.
    fn index(&self, name: &str) -> &CellValue {
        match self.get(name) {
            Some(cell) => cell,
            None => panic!("no column named '{name}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        let columns = Arc::new(ColumnIndex::new(vec!["Name".into(), "EmployeeCount".into()]));
        Row::new(columns, vec!["ACME".into(), CellValue::Int(25)])
    }

    #[test]
    fn lookup_by_name_ignores_case() {
        let row = row();
        assert_eq!(row["name"], CellValue::from("ACME"));
        assert_eq!(row[1], CellValue::Int(25));
        assert_eq!(row.get_as::<u32>("EMPLOYEECOUNT").unwrap(), 25);
        assert!(row.get("CEO").is_none());
    }

    #[test]
    fn missing_columns_list_valid_names() {
        let err = row().cell("CEO").unwrap_err();
        assert!(err.to_string().contains("'Name', 'EmployeeCount'"));
    }
}
