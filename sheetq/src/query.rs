//! Fluent query builder.

use std::marker::PhantomData;

use sheetq_executor::{ExecutionContext, Materialize, QueryOutput, Rows, execute};
use sheetq_expr::{Expr, Projection, QueryModel, QueryOp};
use sheetq_plan::{QueryArgs, TranslatedQuery, translate};
use sheetq_result::{Error, Result};
use sheetq_types::{CellValue, FromCell};
use tracing::trace;

use crate::factory::QueryFactory;

/// A query over one source, producing `M` values.
///
/// Builder methods append operators; terminal methods (`to_vec`, `count`,
/// `first`, ...) translate the pipeline, run it and materialize the result.
/// `M` is a [`Record`](sheetq_executor::Record) type, a generic
/// [`Row`](sheetq_executor::Row), or a [`CellValue`] after
/// [`Query::select_column`].
pub struct Query<'f, M> {
    factory: &'f QueryFactory,
    args: QueryArgs,
    model: QueryModel,
    _output: PhantomData<fn() -> M>,
}

impl<'f, M> Clone for Query<'f, M> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory,
            args: self.args.clone(),
            model: self.model.clone(),
            _output: PhantomData,
        }
    }
}

impl<'f, M: Materialize> Query<'f, M> {
    pub(crate) fn new(factory: &'f QueryFactory, args: QueryArgs) -> Self {
        Self {
            factory,
            args,
            model: QueryModel::new(),
            _output: PhantomData,
        }
    }

    /// Append a raw operator.
    pub fn with_op(mut self, op: QueryOp) -> Self {
        self.model.push(op);
        self
    }

    pub fn filter(self, predicate: Expr) -> Self {
        self.with_op(QueryOp::Where(predicate))
    }

    pub fn order_by(self, key: Expr) -> Self {
        self.with_op(QueryOp::OrderBy {
            key,
            descending: false,
        })
    }

    pub fn order_by_descending(self, key: Expr) -> Self {
        self.with_op(QueryOp::OrderBy {
            key,
            descending: true,
        })
    }

    /// Secondary ordering. Statements carry a single ordering, so running a
    /// query that uses this fails with `UnsupportedOperation`.
    pub fn then_by(self, key: Expr) -> Self {
        self.with_op(QueryOp::ThenBy {
            key,
            descending: false,
        })
    }

    pub fn take(self, count: usize) -> Self {
        self.with_op(QueryOp::Take(count))
    }

    pub fn skip(self, count: usize) -> Self {
        self.with_op(QueryOp::Skip(count))
    }

    pub fn reverse(self) -> Self {
        self.with_op(QueryOp::Reverse)
    }

    pub fn distinct(self) -> Self {
        self.with_op(QueryOp::Distinct)
    }

    /// Project a single field or column.
    pub fn select_column(mut self, key: Expr) -> Query<'f, CellValue> {
        self.model.push(QueryOp::Select(Projection::Column(key)));
        self.args.skip_empty_rows = false;
        Query {
            factory: self.factory,
            args: self.args,
            model: self.model,
            _output: PhantomData,
        }
    }

    /// Map every materialized value through `f`.
    pub fn select<T, F>(mut self, f: F) -> Projected<'f, M, T>
    where
        F: FnMut(M) -> T + 'static,
    {
        self.model.push(QueryOp::Select(Projection::Client));
        Projected {
            query: self,
            map: Box::new(f),
        }
    }

    /// The statement this query would run, without running it.
    pub fn to_sql(&self) -> Result<String> {
        Ok(translate(&self.model, &self.args)?.statement.render())
    }

    pub fn translated(&self) -> Result<TranslatedQuery> {
        translate(&self.model, &self.args)
    }

    pub fn to_vec(self) -> Result<Vec<M>> {
        self.iter()?.into_vec()
    }

    /// Run the query; rows are materialized lazily when the factory is
    /// configured that way.
    pub fn iter(self) -> Result<Rows<M>> {
        self.run(None)?.into_rows()
    }

    pub fn count(self) -> Result<usize> {
        let value = self.run(Some(QueryOp::Count))?.into_scalar()?;
        usize::from_cell(&value)
            .map_err(|err| Error::Internal(format!("row count '{value}' is not a count: {err}")))
    }

    pub fn sum(self, key: Expr) -> Result<CellValue> {
        self.run(Some(QueryOp::Sum(key)))?.into_scalar()
    }

    pub fn average(self, key: Expr) -> Result<CellValue> {
        self.run(Some(QueryOp::Average(key)))?.into_scalar()
    }

    pub fn min(self, key: Expr) -> Result<CellValue> {
        self.run(Some(QueryOp::Min(key)))?.into_scalar()
    }

    pub fn max(self, key: Expr) -> Result<CellValue> {
        self.run(Some(QueryOp::Max(key)))?.into_scalar()
    }

    pub fn first(self) -> Result<M> {
        self.run(Some(QueryOp::First))?
            .into_element()?
            .ok_or(Error::EmptySequence)
    }

    pub fn first_or_default(self) -> Result<Option<M>> {
        self.run(Some(QueryOp::FirstOrDefault))?.into_element()
    }

    pub fn last(self) -> Result<M> {
        self.run(Some(QueryOp::Last))?
            .into_element()?
            .ok_or(Error::EmptySequence)
    }

    pub fn last_or_default(self) -> Result<Option<M>> {
        self.run(Some(QueryOp::LastOrDefault))?.into_element()
    }

    pub fn any(self) -> Result<bool> {
        self.run(Some(QueryOp::Any))?.into_exists()
    }

    fn run(mut self, terminal: Option<QueryOp>) -> Result<QueryOutput<M>> {
        if let Some(op) = terminal {
            self.model.push(op);
        }
        let translated = translate(&self.model, &self.args)?;
        trace!(sql = %translated.statement, "query translated");

        let factory = self.factory;
        let args = &self.args;
        factory.with_connection(args.has_header, |conn, descriptor| {
            let ctx = ExecutionContext {
                args,
                logger: factory.logger(),
                connection_string: descriptor.connection_string(),
                lazy: factory.options().lazy,
            };
            execute::<M>(conn, &translated, &ctx)
        })
    }
}

/// A query whose values are mapped by a caller-supplied function after
/// materialization.
pub struct Projected<'f, M, T> {
    query: Query<'f, M>,
    map: Box<dyn FnMut(M) -> T>,
}

impl<'f, M: Materialize, T: 'static> Projected<'f, M, T> {
    pub fn take(mut self, count: usize) -> Self {
        self.query = self.query.take(count);
        self
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.query = self.query.skip(count);
        self
    }

    pub fn reverse(mut self) -> Self {
        self.query = self.query.reverse();
        self
    }

    pub fn to_sql(&self) -> Result<String> {
        self.query.to_sql()
    }

    pub fn to_vec(self) -> Result<Vec<T>> {
        self.iter()?.collect()
    }

    pub fn iter(self) -> Result<impl Iterator<Item = Result<T>>> {
        let Projected { query, mut map } = self;
        let rows = query.iter()?;
        Ok(rows.map(move |row| row.map(&mut map)))
    }

    pub fn count(self) -> Result<usize> {
        self.query.count()
    }

    pub fn any(self) -> Result<bool> {
        self.query.any()
    }

    pub fn first(self) -> Result<T> {
        let Projected { query, mut map } = self;
        query.first().map(&mut map)
    }

    pub fn first_or_default(self) -> Result<Option<T>> {
        let Projected { query, mut map } = self;
        Ok(query.first_or_default()?.map(&mut map))
    }

    pub fn last(self) -> Result<T> {
        let Projected { query, mut map } = self;
        query.last().map(&mut map)
    }

    pub fn last_or_default(self) -> Result<Option<T>> {
        let Projected { query, mut map } = self;
        Ok(query.last_or_default()?.map(&mut map))
    }
}
