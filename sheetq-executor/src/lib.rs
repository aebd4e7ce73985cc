//! Execution and result materialization for sheetq.
//!
//! [`execute`] takes a [`TranslatedQuery`](sheetq_plan::TranslatedQuery) and
//! an open [`Connection`](sheetq_source::Connection), runs the statement and
//! turns the driver's rows into one of three shapes:
//!
//! - typed records, for any type implementing [`Record`] (see [`record!`]);
//! - generic [`Row`]s with a shared name → index lookup;
//! - scalar [`CellValue`](sheetq_types::CellValue)s for projections and
//!   aggregates.
//!
//! Operators the statement could not express (distinct, reverse, skip and a
//! client-side take) are applied here, as are aggregates that could not be
//! pushed into the statement.
#![forbid(unsafe_code)]

pub mod executor;
pub mod logger;
pub mod materialize;
pub mod record;
pub mod row;

pub use executor::{
    ExecutionContext, ExecutorResult, MaterializedRows, QueryOutput, Rows, execute,
};
pub use logger::{LogLevel, MemoryLogger, NoopLogger, QueryLogger, TracingLogger, log_statement};
pub use materialize::{ColumnReader, Materialize, RecordLayout};
pub use record::{FieldAccessor, FieldTable, Record};
pub use row::{ColumnIndex, Row};

#[doc(hidden)]
pub mod __private {
    pub use sheetq_result::ConversionError;
    pub use sheetq_types::{CellCastError, CellValue, FromCell};
}
