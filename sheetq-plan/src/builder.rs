//! Operator pipeline → statement plus the work left for the materializer.

use sheetq_aggregate::AggregateKind;
use sheetq_expr::{ColumnKey, Expr, Projection, QueryModel, QueryOp};
use sheetq_result::{Error, Result};
use tracing::trace;

use crate::args::QueryArgs;
use crate::predicate::PredicateTranslator;
use crate::resolver::ColumnResolver;
use crate::statement::SqlStatement;

/// A column selected by `Select` or targeted by an aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnProjection {
    /// Logical field name, when the projection was written against one.
    pub logical: Option<String>,
    pub physical: String,
}

/// Operators the statement cannot express. The materializer applies them in
/// the order `distinct`, `reverse`, `skip`, `take`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeferredOps {
    pub distinct: bool,
    pub reverse: bool,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

impl DeferredOps {
    pub fn any(&self) -> bool {
        self.distinct || self.reverse || self.skip.is_some() || self.take.is_some()
    }
}

/// What the caller gets back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminal {
    /// Every row.
    Sequence,
    /// The statement itself computes the aggregate; one scalar comes back.
    ServerAggregate(AggregateKind),
    /// The aggregate is folded over the materialized rows.
    ClientAggregate {
        kind: AggregateKind,
        column: Option<ColumnProjection>,
    },
    First { or_default: bool },
    Last { or_default: bool },
    Any,
}

/// Result of translating one query.
#[derive(Clone, Debug, PartialEq)]
pub struct TranslatedQuery {
    pub statement: SqlStatement,
    /// Physical columns referenced by filters, ordering, projections and
    /// aggregates, in first-use order.
    pub columns_used: Vec<String>,
    pub projection: Option<ColumnProjection>,
    /// A caller-supplied projection runs after materialization.
    pub client_projection: bool,
    pub deferred: DeferredOps,
    pub terminal: Terminal,
}

/// Translate `model` against `args`.
///
/// Unsupported operators are rejected before any clause is translated, so a
/// query containing one fails the same way however simple the rest is.
pub fn translate(model: &QueryModel, args: &QueryArgs) -> Result<TranslatedQuery> {
    reject_unsupported(model)?;

    let mut resolver = ColumnResolver::new(&args.mapping, args.has_header);
    let mut statement = SqlStatement::new(args.source.table_token());
    let mut deferred = DeferredOps::default();
    let mut projection: Option<ColumnProjection> = None;
    let mut client_projection = false;
    let mut terminal = Terminal::Sequence;
    // Set once Take, Skip, Reverse or Select has run; filters and ordering
    // must come before them.
    let mut shaped = false;
    // Blank rows are dropped after the statement runs, so row counts and
    // paging must be computed over what is left.
    let counts_client_side = args.skip_empty_rows;

    for (idx, op) in model.ops.iter().enumerate() {
        if op.is_terminal() && idx + 1 != model.ops.len() {
            return Err(Error::unsupported_operation(format!(
                "{} must be the last operator",
                op.name()
            )));
        }
        trace!(op = op.name(), "translating operator");

        match op {
            QueryOp::Where(predicate) => {
                ensure_unshaped(shaped, op)?;
                let translated = PredicateTranslator::new(&mut resolver).translate(predicate)?;
                statement.add_filter(translated);
            }
            QueryOp::OrderBy { key, descending } => {
                ensure_unshaped(shaped, op)?;
                let column = resolver.require_field(key)?;
                statement.order_by = Some(column);
                statement.order_by_descending = *descending;
            }
            QueryOp::Select(Projection::Column(expr)) => {
                if projection.is_some() || client_projection {
                    return Err(Error::unsupported_operation(
                        "Select after another Select",
                    ));
                }
                let physical = resolver.require_field(expr)?;
                projection = Some(ColumnProjection {
                    logical: logical_name(expr),
                    physical,
                });
                shaped = true;
            }
            QueryOp::Select(Projection::Client) => {
                client_projection = true;
                shaped = true;
            }
            QueryOp::Take(count) => {
                shaped = true;
                if deferred.any() || counts_client_side {
                    deferred.take = Some(deferred.take.map_or(*count, |t| t.min(*count)));
                } else {
                    statement.limit(*count);
                }
            }
            QueryOp::Skip(count) => {
                shaped = true;
                // skip runs before take, so a Skip after a client-side Take
                // shortens the take by the same amount
                if let Some(take) = deferred.take {
                    deferred.take = Some(take.saturating_sub(*count));
                }
                deferred.skip = Some(deferred.skip.unwrap_or(0) + count);
            }
            QueryOp::Reverse => {
                shaped = true;
                if deferred.skip.is_some() || deferred.take.is_some() {
                    return Err(Error::unsupported_operation("Reverse after Skip or Take"));
                }
                deferred.reverse = !deferred.reverse;
            }
            QueryOp::Distinct => {
                if projection.is_none() || client_projection {
                    return Err(Error::unsupported_operation(
                        "Distinct over a whole record or row",
                    ));
                }
                if deferred.skip.is_some() || deferred.take.is_some() || deferred.reverse {
                    return Err(Error::unsupported_operation(
                        "Distinct after Skip, Take or Reverse",
                    ));
                }
                deferred.distinct = true;
            }
            QueryOp::First | QueryOp::FirstOrDefault | QueryOp::Any => {
                if !deferred.any() && !counts_client_side {
                    statement.limit(1);
                }
                terminal = match op {
                    QueryOp::Any => Terminal::Any,
                    QueryOp::First => Terminal::First { or_default: false },
                    _ => Terminal::First { or_default: true },
                };
            }
            QueryOp::Last | QueryOp::LastOrDefault => {
                terminal = Terminal::Last {
                    or_default: matches!(op, QueryOp::LastOrDefault),
                };
            }
            QueryOp::Count => {
                let pushable = !deferred.any()
                    && statement.top.is_none()
                    && !client_projection
                    && !counts_client_side;
                terminal = if pushable {
                    statement.set_aggregate(AggregateKind::Count, None);
                    Terminal::ServerAggregate(AggregateKind::Count)
                } else {
                    Terminal::ClientAggregate {
                        kind: AggregateKind::Count,
                        column: None,
                    }
                };
            }
            QueryOp::Sum(expr) | QueryOp::Average(expr) | QueryOp::Min(expr) | QueryOp::Max(expr) => {
                let kind = match op {
                    QueryOp::Sum(_) => AggregateKind::Sum,
                    QueryOp::Average(_) => AggregateKind::Average,
                    QueryOp::Min(_) => AggregateKind::Min,
                    _ => AggregateKind::Max,
                };
                let column = ColumnProjection {
                    logical: logical_name(expr),
                    physical: resolver.require_field(expr)?,
                };
                let transformed = column
                    .logical
                    .as_deref()
                    .is_some_and(|logical| args.transformation(logical).is_some());
                let pushable = !deferred.any()
                    && statement.top.is_none()
                    && !client_projection
                    && !transformed;
                terminal = if pushable {
                    statement.set_aggregate(kind, Some(&column.physical));
                    Terminal::ServerAggregate(kind)
                } else {
                    Terminal::ClientAggregate {
                        kind,
                        column: Some(column),
                    }
                };
            }
            QueryOp::ThenBy { .. }
            | QueryOp::Join
            | QueryOp::GroupBy
            | QueryOp::Union
            | QueryOp::Intersect
            | QueryOp::Except
            | QueryOp::Contains
            | QueryOp::DefaultIfEmpty
            | QueryOp::OfType
            | QueryOp::Single
            | QueryOp::SingleOrDefault => {
                return Err(Error::unsupported_operation(op.name()));
            }
        }
    }

    Ok(TranslatedQuery {
        statement,
        columns_used: resolver.into_columns_used(),
        projection,
        client_projection,
        deferred,
        terminal,
    })
}

fn reject_unsupported(model: &QueryModel) -> Result<()> {
    let unsupported = model.ops.iter().find(|op| {
        matches!(
            op,
            QueryOp::Join
                | QueryOp::GroupBy
                | QueryOp::Union
                | QueryOp::Intersect
                | QueryOp::Except
                | QueryOp::Contains
                | QueryOp::DefaultIfEmpty
                | QueryOp::OfType
                | QueryOp::Single
                | QueryOp::SingleOrDefault
                | QueryOp::ThenBy { .. }
        )
    });
    match unsupported {
        Some(op) => Err(Error::unsupported_operation(op.name())),
        None => Ok(()),
    }
}

fn ensure_unshaped(shaped: bool, op: &QueryOp) -> Result<()> {
    if shaped {
        return Err(Error::unsupported_operation(format!(
            "{} after Take, Skip, Reverse or Select",
            op.name()
        )));
    }
    Ok(())
}

fn logical_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Member { name, .. } => Some(name.clone()),
        Expr::Index {
            key: ColumnKey::Name(name),
            ..
        } => Some(name.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::SourceTable;
    use sheetq_expr::field;

    fn args() -> QueryArgs {
        QueryArgs::new(SourceTable::Worksheet("Sheet1".into()))
    }

    #[test]
    fn take_before_deferred_becomes_top() {
        let model = QueryModel::new().with(QueryOp::Take(3)).with(QueryOp::Skip(1));
        let out = translate(&model, &args()).unwrap();
        assert_eq!(out.statement.render(), "SELECT TOP 3 * FROM [Sheet1$]");
        assert_eq!(out.deferred.skip, Some(1));
        assert_eq!(out.deferred.take, None);
    }

    #[test]
    fn take_after_skip_stays_client_side() {
        let model = QueryModel::new().with(QueryOp::Skip(2)).with(QueryOp::Take(3));
        let out = translate(&model, &args()).unwrap();
        assert_eq!(out.statement.top, None);
        assert_eq!(
            out.deferred,
            DeferredOps {
                skip: Some(2),
                take: Some(3),
                ..DeferredOps::default()
            }
        );
        let model = QueryModel::new()
            .with(QueryOp::Skip(2))
            .with(QueryOp::Take(3))
            .with(QueryOp::Skip(1));
        let out = translate(&model, &args()).unwrap();
        assert_eq!(out.deferred.skip, Some(3));
        assert_eq!(out.deferred.take, Some(2));
    }

    #[test]
    fn skipping_empty_rows_keeps_counting_client_side() {
        let mut args = args();
        args.skip_empty_rows = true;

        let out = translate(&QueryModel::new().with(QueryOp::Count), &args).unwrap();
        assert_eq!(out.statement.render(), "SELECT * FROM [Sheet1$]");
        assert_eq!(
            out.terminal,
            Terminal::ClientAggregate {
                kind: AggregateKind::Count,
                column: None
            }
        );

        let model = QueryModel::new().with(QueryOp::Take(2)).with(QueryOp::First);
        let out = translate(&model, &args).unwrap();
        assert_eq!(out.statement.top, None);
        assert_eq!(out.deferred.take, Some(2));
    }

    #[test]
    fn first_pushes_top_one() {
        let model = QueryModel::new()
            .with(QueryOp::Where(field("EmployeeCount").gt(25)))
            .with(QueryOp::First);
        let out = translate(&model, &args()).unwrap();
        assert_eq!(out.statement.top, Some(1));
        assert_eq!(out.terminal, Terminal::First { or_default: false });
    }

    #[test]
    fn count_after_skip_falls_back_to_client() {
        let model = QueryModel::new().with(QueryOp::Skip(1)).with(QueryOp::Count);
        let out = translate(&model, &args()).unwrap();
        assert_eq!(out.statement.aggregate, None);
        assert_eq!(
            out.terminal,
            Terminal::ClientAggregate {
                kind: AggregateKind::Count,
                column: None
            }
        );
    }

    #[test]
    fn filters_after_shaping_are_rejected() {
        let model = QueryModel::new()
            .with(QueryOp::Take(1))
            .with(QueryOp::Where(field("Name").eq("A")));
        assert!(matches!(
            translate(&model, &args()),
            Err(Error::UnsupportedOperation(msg)) if msg.starts_with("Where")
        ));
    }

    #[test]
    fn terminal_must_be_last() {
        let model = QueryModel::new().with(QueryOp::Count).with(QueryOp::Take(1));
        assert!(matches!(
            translate(&model, &args()),
            Err(Error::UnsupportedOperation(_))
        ));
    }
}
