//! Query translation for sheetq.
//!
//! This crate turns a [`QueryModel`](sheetq_expr::QueryModel) into a
//! parameterized [`SqlStatement`] plus a description of the work the
//! materializer still has to do on the client. Translation is a pure
//! function of the pipeline and the per-query [`QueryArgs`]; nothing here
//! touches a data source.
#![forbid(unsafe_code)]

pub mod args;
pub mod builder;
pub mod evaluator;
pub mod predicate;
pub mod resolver;
pub mod statement;
pub mod validation;

pub use args::{ColumnMapping, QueryArgs, SourceTable, StrictMapping, Transformation, TrimSpaces};
pub use builder::{ColumnProjection, DeferredOps, Terminal, TranslatedQuery, translate};
pub use evaluator::{evaluate, evaluate_cell};
pub use predicate::{PredicateTranslator, TranslatedPredicate};
pub use resolver::{ColumnResolver, positional_column};
pub use sheetq_aggregate::AggregateKind;
pub use statement::SqlStatement;
pub use validation::ensure_known_columns;
