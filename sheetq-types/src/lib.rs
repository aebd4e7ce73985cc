//! Cell values exchanged between the query translator, the data drivers and
//! the result materializer.
//!
//! [`CellValue`] is the single runtime value type of the workspace: query
//! parameters are `CellValue`s, drivers return rows of `CellValue`s, and
//! record fields are populated from them through [`FromCell`].

pub mod cast;
pub mod cell;
pub mod dates;

pub use cast::{CellCastError, FromCell};
pub use cell::CellValue;
pub use dates::{excel_serial_to_datetime, parse_datetime};
