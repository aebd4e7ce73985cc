//! Conversion of raw driver rows into caller-facing values.

use std::sync::Arc;

use sheetq_plan::{ColumnProjection, QueryArgs, Transformation, TrimSpaces};
use sheetq_result::{ConversionError, Error, Result};
use sheetq_types::CellValue;
use tracing::trace;

use crate::record::Record;
use crate::row::{ColumnIndex, Row};

/// Reads one column out of raw rows, applying trimming and the column's
/// transformation.
#[derive(Clone)]
pub struct ColumnReader {
    pub index: usize,
    trim: TrimSpaces,
    transformation: Option<Transformation>,
}

impl ColumnReader {
    pub fn new(index: usize, args: &QueryArgs, logical: Option<&str>) -> Self {
        Self {
            index,
            trim: args.trim_spaces,
            transformation: logical.and_then(|name| args.transformation(name)).cloned(),
        }
    }

    /// Locate `column` among `columns` and build a reader for it.
    pub fn for_projection(
        columns: &[String],
        column: &ColumnProjection,
        args: &QueryArgs,
    ) -> Result<Self> {
        let index = columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(&column.physical))
            .ok_or_else(|| Error::UnknownColumn {
                column: column.physical.clone(),
                valid: columns.to_vec(),
            })?;
        Ok(Self::new(index, args, column.logical.as_deref()))
    }

    pub fn read(&self, row: &[CellValue]) -> CellValue {
        let cell = row.get(self.index).cloned().unwrap_or_default();
        let cell = trim_cell(cell, self.trim);
        match &self.transformation {
            Some(transform) => {
                let text = if cell.is_null() { String::new() } else { cell.to_string() };
                transform(&text)
            }
            None => cell,
        }
    }
}

fn trim_cell(cell: CellValue, trim: TrimSpaces) -> CellValue {
    match cell {
        CellValue::Text(text) if trim != TrimSpaces::None => {
            CellValue::Text(trim.apply(&text).to_string())
        }
        other => other,
    }
}

/// Output types the executor can produce from raw rows.
///
/// `layout` runs once per result set and resolves everything that depends
/// only on the column schema; `materialize` runs once per row.
pub trait Materialize: Sized + 'static {
    type Layout: 'static;

    /// Whether the skip-empty-rows policy applies to this output shape.
    /// Only generic rows drop blank source rows.
    const SKIPS_BLANK_ROWS: bool = false;

    fn layout(
        columns: &[String],
        args: &QueryArgs,
        projection: Option<&ColumnProjection>,
    ) -> Result<Self::Layout>;

    fn materialize(layout: &Self::Layout, cells: Vec<CellValue>, row: usize) -> Result<Self>;
}

impl Materialize for Row {
    type Layout = (Arc<ColumnIndex>, TrimSpaces);

    const SKIPS_BLANK_ROWS: bool = true;

    fn layout(
        columns: &[String],
        args: &QueryArgs,
        projection: Option<&ColumnProjection>,
    ) -> Result<Self::Layout> {
        if projection.is_some() {
            return Err(Error::Internal("column projection cannot produce rows".into()));
        }
        Ok((Arc::new(ColumnIndex::new(columns.to_vec())), args.trim_spaces))
    }

    fn materialize(layout: &Self::Layout, cells: Vec<CellValue>, _row: usize) -> Result<Self> {
        let (columns, trim) = layout;
        let cells = cells.into_iter().map(|cell| trim_cell(cell, *trim)).collect();
        Ok(Row::new(Arc::clone(columns), cells))
    }
}

/// A single projected column.
impl Materialize for CellValue {
    type Layout = ColumnReader;

    fn layout(
        columns: &[String],
        args: &QueryArgs,
        projection: Option<&ColumnProjection>,
    ) -> Result<Self::Layout> {
        match projection {
            Some(column) => ColumnReader::for_projection(columns, column, args),
            None if columns.len() == 1 => Ok(ColumnReader::new(0, args, None)),
            None => Err(Error::InvalidArgumentError(format!(
                "a scalar result needs exactly one column, found {}",
                columns.len()
            ))),
        }
    }

    fn materialize(layout: &Self::Layout, cells: Vec<CellValue>, _row: usize) -> Result<Self> {
        Ok(layout.read(&cells))
    }
}

/// Field ↔ column binding resolved for one result set.
pub struct RecordLayout<R: 'static> {
    bindings: Vec<FieldBinding<R>>,
}

struct FieldBinding<R: 'static> {
    field: &'static crate::record::FieldAccessor<R>,
    column: String,
    reader: ColumnReader,
}

impl<R: Record> Materialize for R {
    type Layout = RecordLayout<R>;

    fn layout(
        columns: &[String],
        args: &QueryArgs,
        projection: Option<&ColumnProjection>,
    ) -> Result<Self::Layout> {
        if projection.is_some() {
            return Err(Error::Internal("column projection cannot produce records".into()));
        }
        let index = ColumnIndex::new(columns.to_vec());
        let mut bindings = Vec::new();
        let mut bound_columns = vec![false; columns.len()];

        for field in R::fields().iter() {
            let physical = args.mapping.physical(field.name).unwrap_or(field.name);
            match index.position(physical) {
                Some(position) => {
                    bound_columns[position] = true;
                    bindings.push(FieldBinding {
                        field,
                        column: columns[position].clone(),
                        reader: ColumnReader::new(position, args, Some(field.name)),
                    });
                }
                None if args.strict_mapping.class_strict() => {
                    return Err(Error::StrictMapping(format!(
                        "'{}' property is not mapped to a column",
                        field.name
                    )));
                }
                None => trace!(field = field.name, "record field has no column"),
            }
        }

        if args.strict_mapping.worksheet_strict() {
            if let Some(position) = bound_columns.iter().position(|bound| !bound) {
                return Err(Error::StrictMapping(format!(
                    "'{}' column is not mapped to a property",
                    columns[position]
                )));
            }
        }
        Ok(RecordLayout { bindings })
    }

    fn materialize(layout: &Self::Layout, cells: Vec<CellValue>, row: usize) -> Result<Self> {
        let mut record = R::default();
        for binding in &layout.bindings {
            let value = binding.reader.read(&cells);
            // null cells leave the field at its default
            if value.is_null() {
                continue;
            }
            if let Err(err) = (binding.field.set)(&mut record, &value) {
                let failure = ConversionError {
                    row,
                    column: binding.column.clone(),
                    value: value.to_string(),
                    target: binding.field.type_name,
                    reason: err.to_string(),
                };
                match record.conversion_errors() {
                    Some(errors) => errors.push(failure),
                    None => return Err(failure.into()),
                }
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetq_plan::{SourceTable, StrictMapping};

    #[derive(Debug, Default)]
    struct Company {
        name: String,
        boss: String,
        employee_count: i64,
        errors: Vec<ConversionError>,
    }

    crate::record!(Company { name: String, boss: String, employee_count: i64 }; errors = errors);

    #[derive(Debug, Default)]
    struct Strict {
        name: String,
    }

    crate::record!(Strict { name: String });

    fn columns() -> Vec<String> {
        vec!["Name".into(), "CEO".into(), "EmployeeCount".into()]
    }

    fn args() -> QueryArgs {
        QueryArgs::new(SourceTable::Worksheet("Sheet1".into()))
            .with_mapping("boss", "CEO")
            .with_mapping("employee_count", "EmployeeCount")
            .with_mapping("name", "Name")
    }

    #[test]
    fn records_follow_the_mapping() {
        let layout = Company::layout(&columns(), &args(), None).unwrap();
        let company = Company::materialize(
            &layout,
            vec!["ACME".into(), "Paul".into(), CellValue::Int(25)],
            0,
        )
        .unwrap();
        assert_eq!(company.name, "ACME");
        assert_eq!(company.boss, "Paul");
        assert_eq!(company.employee_count, 25);
    }

    #[test]
    fn conversion_failures_are_collected_when_requested() {
        let layout = Company::layout(&columns(), &args(), None).unwrap();
        let company = Company::materialize(
            &layout,
            vec!["ACME".into(), CellValue::Null, "lots".into()],
            4,
        )
        .unwrap();
        assert_eq!(company.boss, "");
        assert_eq!(company.errors.len(), 1);
        assert_eq!(company.errors[0].row, 4);
        assert_eq!(company.errors[0].column, "EmployeeCount");
    }

    #[test]
    fn strict_mapping_policies() {
        let mut args = args();
        args.strict_mapping = StrictMapping::WorksheetStrict;
        assert!(matches!(
            Strict::layout(&columns(), &args, None),
            Err(Error::StrictMapping(msg)) if msg.contains("CEO")
        ));

        args.strict_mapping = StrictMapping::ClassStrict;
        let columns = vec!["Title".to_string()];
        assert!(matches!(
            Strict::layout(&columns, &args, None),
            Err(Error::StrictMapping(msg)) if msg.contains("name")
        ));
    }

    #[test]
    fn transformations_and_trimming() {
        let mut args = args().with_transformation(
            "boss",
            Arc::new(|raw: &str| CellValue::Text(raw.to_uppercase())),
        );
        args.trim_spaces = TrimSpaces::Both;
        let layout = Company::layout(&columns(), &args, None).unwrap();
        let company = Company::materialize(
            &layout,
            vec!["  ACME ".into(), " paul".into(), CellValue::Int(1)],
            0,
        )
        .unwrap();
        assert_eq!(company.name, "ACME");
        assert_eq!(company.boss, "PAUL");
    }
}
