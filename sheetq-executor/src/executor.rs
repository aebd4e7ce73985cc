//! Runs a translated query against an open connection and shapes the rows.

use rustc_hash::FxHashSet;
use sheetq_aggregate::{AggregateKind, fold};
use sheetq_plan::{ColumnProjection, QueryArgs, Terminal, TranslatedQuery, ensure_known_columns};
use sheetq_result::{Error, Result};
use sheetq_source::{Connection, ResultSet, RowIter};
use sheetq_types::CellValue;
use tracing::{debug, warn};

use crate::logger::{QueryLogger, log_statement};
use crate::materialize::{ColumnReader, Materialize};

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T>;

/// Materialized rows produced on demand.
pub type MaterializedRows<M> = Box<dyn Iterator<Item = Result<M>>>;

/// Raw rows tagged with their position in the driver's result set.
type RawRows = Box<dyn Iterator<Item = Result<(usize, Vec<CellValue>)>>>;

/// Everything the executor needs besides the connection and the query.
pub struct ExecutionContext<'a> {
    pub args: &'a QueryArgs,
    pub logger: &'a dyn QueryLogger,
    pub connection_string: &'a str,
    /// Materialize rows while the caller iterates instead of up front.
    pub lazy: bool,
}

/// A sequence result, either fully materialized or materialized on demand.
pub enum Rows<M> {
    Eager(std::vec::IntoIter<M>),
    Lazy(MaterializedRows<M>),
}

impl<M> Rows<M> {
    pub fn is_lazy(&self) -> bool {
        matches!(self, Rows::Lazy(_))
    }

    pub fn into_vec(self) -> ExecutorResult<Vec<M>> {
        match self {
            Rows::Eager(rows) => Ok(rows.collect()),
            Rows::Lazy(rows) => rows.collect(),
        }
    }
}

impl<M> Iterator for Rows<M> {
    type Item = Result<M>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Rows::Eager(rows) => rows.next().map(Ok),
            Rows::Lazy(rows) => rows.next(),
        }
    }
}

/// What a query returns, by terminal operator.
pub enum QueryOutput<M> {
    Sequence(Rows<M>),
    Scalar(CellValue),
    /// `First`/`Last` style result. `None` only for the `OrDefault` forms.
    Element(Option<M>),
    Exists(bool),
}

impl<M> QueryOutput<M> {
    fn kind(&self) -> &'static str {
        match self {
            QueryOutput::Sequence(_) => "sequence",
            QueryOutput::Scalar(_) => "scalar",
            QueryOutput::Element(_) => "element",
            QueryOutput::Exists(_) => "exists",
        }
    }

    fn mismatch(self, expected: &str) -> Error {
        Error::Internal(format!("expected a {expected} result, got a {}", self.kind()))
    }

    pub fn into_rows(self) -> ExecutorResult<Rows<M>> {
        match self {
            QueryOutput::Sequence(rows) => Ok(rows),
            other => Err(other.mismatch("sequence")),
        }
    }

    pub fn into_scalar(self) -> ExecutorResult<CellValue> {
        match self {
            QueryOutput::Scalar(value) => Ok(value),
            other => Err(other.mismatch("scalar")),
        }
    }

    pub fn into_element(self) -> ExecutorResult<Option<M>> {
        match self {
            QueryOutput::Element(item) => Ok(item),
            other => Err(other.mismatch("element")),
        }
    }

    pub fn into_exists(self) -> ExecutorResult<bool> {
        match self {
            QueryOutput::Exists(found) => Ok(found),
            other => Err(other.mismatch("exists")),
        }
    }
}

/// Validate, log and run `query`, then materialize its result as `M`.
pub fn execute<M: Materialize>(
    conn: &mut dyn Connection,
    query: &TranslatedQuery,
    ctx: &ExecutionContext<'_>,
) -> ExecutorResult<QueryOutput<M>> {
    let table = query.statement.table.as_str();
    let available = conn.column_names(table)?;
    ensure_known_columns(&query.columns_used, &available)?;
    warn_missing_mappings(table, &available, ctx);

    let sql = query.statement.render();
    let params = &query.statement.parameters;
    log_statement(ctx.logger, ctx.connection_string, &sql, params);
    debug!(%sql, params = params.len(), "executing statement");
    let ResultSet { columns, rows } = conn.execute(&sql, params)?;

    let skip_blank = M::SKIPS_BLANK_ROWS;
    let output = match &query.terminal {
        Terminal::ServerAggregate(_) => QueryOutput::Scalar(first_value(rows)?),
        Terminal::ClientAggregate { kind, column } => {
            let shaped = shape_rows(rows, &columns, query, ctx.args, skip_blank)?;
            QueryOutput::Scalar(client_aggregate(shaped, &columns, *kind, column.as_ref(), ctx.args)?)
        }
        Terminal::Any => {
            let mut shaped = shape_rows(rows, &columns, query, ctx.args, skip_blank)?;
            QueryOutput::Exists(shaped.next().transpose()?.is_some())
        }
        Terminal::First { or_default } => {
            let layout = M::layout(&columns, ctx.args, query.projection.as_ref())?;
            let mut shaped = shape_rows(rows, &columns, query, ctx.args, skip_blank)?;
            let first = shaped.next().transpose()?;
            element(first, &layout, *or_default)?
        }
        Terminal::Last { or_default } => {
            let layout = M::layout(&columns, ctx.args, query.projection.as_ref())?;
            let mut last = None;
            for row in shape_rows(rows, &columns, query, ctx.args, skip_blank)? {
                last = Some(row?);
            }
            element(last, &layout, *or_default)?
        }
        Terminal::Sequence => {
            let layout = M::layout(&columns, ctx.args, query.projection.as_ref())?;
            let shaped = shape_rows(rows, &columns, query, ctx.args, skip_blank)?;
            let materialized =
                shaped.map(move |row| row.and_then(|(idx, cells)| M::materialize(&layout, cells, idx)));
            if ctx.lazy {
                QueryOutput::Sequence(Rows::Lazy(Box::new(materialized)))
            } else {
                let rows = materialized.collect::<Result<Vec<_>>>()?;
                debug!(rows = rows.len(), "materialized result");
                QueryOutput::Sequence(Rows::Eager(rows.into_iter()))
            }
        }
    };
    Ok(output)
}

fn warn_missing_mappings(table: &str, available: &[String], ctx: &ExecutionContext<'_>) {
    for (logical, physical) in ctx.args.mapping.iter_sorted() {
        if available.iter().any(|c| c.eq_ignore_ascii_case(physical)) {
            continue;
        }
        warn!(logical, physical, table, "mapped column is missing");
        ctx.logger.warn(&format!(
            "'{physical}' column that is mapped to the '{logical}' property does not exist in the '{table}' worksheet"
        ));
    }
}

/// First cell of the first row; `Null` for an empty result.
fn first_value(mut rows: RowIter) -> ExecutorResult<CellValue> {
    match rows.next().transpose()? {
        Some(cells) => Ok(cells.into_iter().next().unwrap_or_default()),
        None => Ok(CellValue::Null),
    }
}

/// Apply empty-row skipping and the deferred operators, in the order
/// distinct, reverse, skip, take. Blank rows are only dropped when
/// `skip_blank` is set for the output shape.
fn shape_rows(
    rows: RowIter,
    columns: &[String],
    query: &TranslatedQuery,
    args: &QueryArgs,
    skip_blank: bool,
) -> ExecutorResult<RawRows> {
    let mut shaped: RawRows = Box::new(
        rows.enumerate()
            .map(|(idx, row)| row.map(|cells| (idx, cells))),
    );

    if skip_blank && args.skip_empty_rows {
        shaped = Box::new(shaped.filter(|row| match row {
            Ok((_, cells)) => !cells.iter().all(CellValue::is_blank),
            Err(_) => true,
        }));
    }

    let deferred = &query.deferred;
    if deferred.distinct {
        let column = query
            .projection
            .as_ref()
            .ok_or_else(|| Error::Internal("Distinct without a projected column".into()))?;
        let reader = ColumnReader::for_projection(columns, column, args)?;
        let mut seen: FxHashSet<(&'static str, String)> = FxHashSet::default();
        shaped = Box::new(shaped.filter(move |row| match row {
            Ok((_, cells)) => {
                let value = reader.read(cells);
                seen.insert((value.type_name(), value.to_string()))
            }
            Err(_) => true,
        }));
    }

    if deferred.reverse {
        let mut buffered = shaped.collect::<Result<Vec<_>>>()?;
        buffered.reverse();
        shaped = Box::new(buffered.into_iter().map(Ok));
    }
    if let Some(skip) = deferred.skip {
        shaped = Box::new(shaped.skip(skip));
    }
    if let Some(take) = deferred.take {
        shaped = Box::new(shaped.take(take));
    }
    Ok(shaped)
}

fn client_aggregate(
    rows: RawRows,
    columns: &[String],
    kind: AggregateKind,
    column: Option<&ColumnProjection>,
    args: &QueryArgs,
) -> ExecutorResult<CellValue> {
    match (kind, column) {
        (AggregateKind::Count, None) => {
            let mut count = 0i64;
            for row in rows {
                row?;
                count += 1;
            }
            Ok(CellValue::Int(count))
        }
        (kind, Some(column)) => {
            let reader = ColumnReader::for_projection(columns, column, args)?;
            let values = rows
                .map(|row| row.map(|(_, cells)| reader.read(&cells)))
                .collect::<Result<Vec<_>>>()?;
            fold(kind, &values)
        }
        (kind, None) => Err(Error::Internal(format!(
            "{} aggregate without a column",
            kind.sql_name()
        ))),
    }
}

fn element<M: Materialize>(
    row: Option<(usize, Vec<CellValue>)>,
    layout: &M::Layout,
    or_default: bool,
) -> ExecutorResult<QueryOutput<M>> {
    match row {
        Some((idx, cells)) => Ok(QueryOutput::Element(Some(M::materialize(layout, cells, idx)?))),
        None if or_default => Ok(QueryOutput::Element(None)),
        None => Err(Error::EmptySequence),
    }
}
