//! Error types and result definitions for sheetq.
//!
//! Every sheetq crate returns [`Result<T>`] and reports failures through the
//! single [`Error`] enum, so errors cross crate boundaries with `?` and callers
//! can match on the variant they care about.
//!
//! # Error Categories
//!
//! - **Query shape errors** ([`Error::UnsupportedOperation`],
//!   [`Error::UnsupportedExpression`]): the pipeline cannot be translated
//! - **Schema errors** ([`Error::UnknownColumn`], [`Error::StrictMapping`]):
//!   the query does not match the worksheet
//! - **Value errors** ([`Error::Conversion`]): a cell does not fit its field
//! - **Driver errors** ([`Error::DataSource`], [`Error::Io`], [`Error::Arrow`])
//! - **Internal errors** ([`Error::Internal`]): bugs or unexpected states

pub mod error;
pub mod result;

pub use error::{ConversionError, Error};
pub use result::Result;
