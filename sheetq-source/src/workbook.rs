//! In-memory workbook model: worksheets as cell grids plus named ranges.

use std::fmt;
use std::str::FromStr;

use sheetq_result::{Error, Result};
use sheetq_types::CellValue;

/// A rectangular `A1:D4` style cell range, zero-based and inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRange {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

impl CellRange {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let (start, end) = text.split_once(':').ok_or_else(|| {
            Error::InvalidArgumentError(format!("'{text}' is not a cell range like 'A1:D4'"))
        })?;
        let (first_row, first_col) = parse_cell_ref(start)?;
        let (last_row, last_col) = parse_cell_ref(end)?;
        if last_row < first_row || last_col < first_col {
            return Err(Error::InvalidArgumentError(format!(
                "cell range '{text}' ends before it starts"
            )));
        }
        Ok(Self {
            first_row,
            first_col,
            last_row,
            last_col,
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_letters(self.first_col),
            self.first_row + 1,
            column_letters(self.last_col),
            self.last_row + 1
        )
    }
}

/// `"B12"` → `(11, 1)`.
pub fn parse_cell_ref(text: &str) -> Result<(usize, usize)> {
    let invalid = || Error::InvalidArgumentError(format!("'{text}' is not a cell reference"));
    let split = text
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (letters, digits) = text.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }
    let col = letters
        .bytes()
        .try_fold(0usize, |acc, b| {
            acc.checked_mul(26)?
                .checked_add(usize::from(b.to_ascii_uppercase() - b'A') + 1)
        })
        .ok_or_else(invalid)?
        - 1;
    let row: usize = digits.parse().map_err(|_| invalid())?;
    if row == 0 {
        return Err(invalid());
    }
    Ok((row - 1, col))
}

fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// One worksheet. Rows may be ragged; missing cells read as null.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn with_row<I, V>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn cell(&self, row: usize, col: usize) -> CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or_default()
    }

    /// Cells of `range`, or of the used area when `range` is `None`. Ranges
    /// are clipped to the used area.
    fn grid(&self, range: Option<CellRange>) -> Vec<Vec<CellValue>> {
        let width = self.width();
        if self.rows.is_empty() || width == 0 {
            return Vec::new();
        }
        let used = CellRange {
            first_row: 0,
            first_col: 0,
            last_row: self.rows.len() - 1,
            last_col: width - 1,
        };
        let range = match range {
            Some(range) if range.first_row > used.last_row || range.first_col > used.last_col => {
                return Vec::new();
            }
            Some(range) => CellRange {
                last_row: range.last_row.min(used.last_row),
                last_col: range.last_col.min(used.last_col),
                ..range
            },
            None => used,
        };
        (range.first_row..=range.last_row)
            .map(|row| {
                (range.first_col..=range.last_col)
                    .map(|col| self.cell(row, col))
                    .collect()
            })
            .collect()
    }
}

/// A named cell region. `scope` is the worksheet the name is local to, or
/// `None` for a workbook-level name.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedRange {
    pub name: String,
    pub scope: Option<String>,
    pub worksheet: String,
    pub range: CellRange,
}

impl NamedRange {
    pub fn new(name: impl Into<String>, worksheet: impl Into<String>, range: CellRange) -> Self {
        Self {
            name: name.into(),
            scope: None,
            worksheet: worksheet.into(),
            range,
        }
    }

    /// Make the name local to its worksheet.
    pub fn local(mut self) -> Self {
        self.scope = Some(self.worksheet.clone());
        self
    }
}

/// A table as a driver sees it: column names plus data rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetTable {
    /// Split a raw grid into header and data rows. Headerless grids, and
    /// blank header cells, get positional names `F1`, `F2`, ...
    pub fn from_grid(mut grid: Vec<Vec<CellValue>>, has_header: bool) -> Self {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut grid {
            row.resize(width, CellValue::Null);
        }
        let header = if has_header && !grid.is_empty() {
            Some(grid.remove(0))
        } else {
            None
        };
        let columns = (0..width)
            .map(|idx| match header.as_ref().map(|h| &h[idx]) {
                Some(cell) if !cell.is_blank() => cell.to_string(),
                _ => format!("F{}", idx + 1),
            })
            .collect();
        Self {
            columns,
            rows: grid,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// Worksheets and named ranges of one file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    named_ranges: Vec<NamedRange>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.sheets.push(sheet);
        self
    }

    pub fn with_named_range(mut self, range: NamedRange) -> Self {
        self.named_ranges.push(range);
        self
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn worksheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn named_ranges(&self, worksheet: Option<&str>) -> Vec<String> {
        self.named_ranges
            .iter()
            .filter(|r| match (&r.scope, worksheet) {
                (Some(scope), Some(ws)) => scope.eq_ignore_ascii_case(ws),
                (None, None) => true,
                _ => false,
            })
            .map(|r| r.name.clone())
            .collect()
    }

    /// Resolve a table token: `Sheet$`, `Sheet$A1:D4`, `Sheet$Name` or a
    /// workbook-level `Name`.
    pub fn table(&self, token: &str, has_header: bool) -> Result<SheetTable> {
        let grid = match token.rsplit_once('$') {
            Some((sheet_name, "")) => self.require_sheet(sheet_name, token)?.grid(None),
            Some((sheet_name, rest)) => {
                let sheet = self.require_sheet(sheet_name, token)?;
                if let Ok(range) = rest.parse::<CellRange>() {
                    sheet.grid(Some(range))
                } else {
                    let named = self
                        .named_ranges
                        .iter()
                        .find(|r| {
                            r.name.eq_ignore_ascii_case(rest)
                                && r.worksheet.eq_ignore_ascii_case(&sheet.name)
                        })
                        .ok_or_else(|| missing_object(token))?;
                    sheet.grid(Some(named.range))
                }
            }
            None => {
                let named = self
                    .named_ranges
                    .iter()
                    .find(|r| r.scope.is_none() && r.name.eq_ignore_ascii_case(token))
                    .ok_or_else(|| missing_object(token))?;
                self.require_sheet(&named.worksheet, token)?
                    .grid(Some(named.range))
            }
        };
        Ok(SheetTable::from_grid(grid, has_header))
    }

    fn require_sheet(&self, name: &str, token: &str) -> Result<&Sheet> {
        self.sheet(name).ok_or_else(|| missing_object(token))
    }
}

fn missing_object(token: &str) -> Error {
    Error::data_source(format!(
        "the database engine could not find the object '{token}'"
    ))
}
