//! Query operator pipeline.
//!
//! A query is a linear sequence of operators applied to a worksheet source:
//! body clauses (`Where`, `OrderBy`) followed by result operators (`Take`,
//! `Count`, ...). The pipeline is data; translating it is the planner's job.

use crate::Expr;

/// Projection applied by a `Select` operator.
#[derive(Clone, Debug)]
pub enum Projection {
    /// Select a single field or column of the row.
    Column(Expr),
    /// Construct a different type from the materialized row. The mapping
    /// itself lives with the caller and runs after materialization.
    Client,
}

/// One operator of the pipeline, in source order.
#[derive(Clone, Debug)]
pub enum QueryOp {
    Where(Expr),
    OrderBy { key: Expr, descending: bool },
    ThenBy { key: Expr, descending: bool },
    Select(Projection),
    Take(usize),
    Skip(usize),
    Reverse,
    Distinct,
    First,
    FirstOrDefault,
    Last,
    LastOrDefault,
    Any,
    Count,
    Sum(Expr),
    Average(Expr),
    Min(Expr),
    Max(Expr),
    Join,
    GroupBy,
    Union,
    Intersect,
    Except,
    Contains,
    DefaultIfEmpty,
    OfType,
    Single,
    SingleOrDefault,
}

impl QueryOp {
    pub fn name(&self) -> &'static str {
        match self {
            QueryOp::Where(_) => "Where",
            QueryOp::OrderBy {
                descending: false, ..
            } => "OrderBy",
            QueryOp::OrderBy {
                descending: true, ..
            } => "OrderByDescending",
            QueryOp::ThenBy {
                descending: false, ..
            } => "ThenBy",
            QueryOp::ThenBy {
                descending: true, ..
            } => "ThenByDescending",
            QueryOp::Select(_) => "Select",
            QueryOp::Take(_) => "Take",
            QueryOp::Skip(_) => "Skip",
            QueryOp::Reverse => "Reverse",
            QueryOp::Distinct => "Distinct",
            QueryOp::First => "First",
            QueryOp::FirstOrDefault => "FirstOrDefault",
            QueryOp::Last => "Last",
            QueryOp::LastOrDefault => "LastOrDefault",
            QueryOp::Any => "Any",
            QueryOp::Count => "Count",
            QueryOp::Sum(_) => "Sum",
            QueryOp::Average(_) => "Average",
            QueryOp::Min(_) => "Min",
            QueryOp::Max(_) => "Max",
            QueryOp::Join => "Join",
            QueryOp::GroupBy => "GroupBy",
            QueryOp::Union => "Union",
            QueryOp::Intersect => "Intersect",
            QueryOp::Except => "Except",
            QueryOp::Contains => "Contains",
            QueryOp::DefaultIfEmpty => "DefaultIfEmpty",
            QueryOp::OfType => "OfType",
            QueryOp::Single => "Single",
            QueryOp::SingleOrDefault => "SingleOrDefault",
        }
    }

    /// Terminal operators end the pipeline with a scalar or a single element.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryOp::First
                | QueryOp::FirstOrDefault
                | QueryOp::Last
                | QueryOp::LastOrDefault
                | QueryOp::Any
                | QueryOp::Count
                | QueryOp::Sum(_)
                | QueryOp::Average(_)
                | QueryOp::Min(_)
                | QueryOp::Max(_)
        )
    }
}

/// The full operator pipeline handed to the orchestrator.
#[derive(Clone, Debug, Default)]
pub struct QueryModel {
    pub ops: Vec<QueryOp>,
}

impl QueryModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, op: QueryOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn push(&mut self, op: QueryOp) {
        self.ops.push(op);
    }
}
