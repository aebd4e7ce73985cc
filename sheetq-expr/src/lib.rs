pub mod expr;
pub use expr::*;

pub mod format;

pub mod query;
pub use query::{Projection, QueryModel, QueryOp};
