//! Logical field → physical column resolution.

use sheetq_expr::{ColumnKey, Expr};
use sheetq_result::{Error, Result};

use crate::args::ColumnMapping;

/// Column token used for position `index` of a headerless source.
pub fn positional_column(index: usize) -> String {
    format!("F{}", index + 1)
}

/// Resolves field references and remembers every physical column it handed
/// out, so the caller can check them against the live worksheet schema.
#[derive(Debug)]
pub struct ColumnResolver<'a> {
    mapping: &'a ColumnMapping,
    has_header: bool,
    used: Vec<String>,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(mapping: &'a ColumnMapping, has_header: bool) -> Self {
        Self {
            mapping,
            has_header,
            used: Vec::new(),
        }
    }

    /// Physical column for a logical name: the mapped name when a mapping
    /// exists, the logical name otherwise.
    pub fn physical_name(&mut self, logical: &str) -> String {
        let physical = self.mapping.physical(logical).unwrap_or(logical).to_string();
        self.record(&physical);
        physical
    }

    /// Resolve `expr` if it is a direct reference to a row column.
    ///
    /// Returns `Ok(None)` for anything that is not a field reference. Mixing
    /// the two indexer forms with the wrong header setting is an error.
    pub fn resolve_field(&mut self, expr: &Expr) -> Result<Option<String>> {
        match expr {
            Expr::Member { target, name } if matches!(target.as_ref(), Expr::Row) => {
                Ok(Some(self.physical_name(name)))
            }
            Expr::Index { target, key } if matches!(target.as_ref(), Expr::Row) => match key {
                ColumnKey::Name(name) if self.has_header => Ok(Some(self.physical_name(name))),
                ColumnKey::Name(name) => Err(Error::InvalidArgumentError(format!(
                    "column '{name}' cannot be addressed by name because the source has no header row; use a zero-based column index"
                ))),
                ColumnKey::Position(index) if !self.has_header => {
                    let token = positional_column(*index);
                    self.record(&token);
                    Ok(Some(token))
                }
                ColumnKey::Position(index) => Err(Error::InvalidArgumentError(format!(
                    "column index {index} cannot be used when the source has a header row; use the column name"
                ))),
            },
            _ => Ok(None),
        }
    }

    /// Like [`ColumnResolver::resolve_field`] but the expression must be a
    /// field reference.
    pub fn require_field(&mut self, expr: &Expr) -> Result<String> {
        self.resolve_field(expr)?
            .ok_or_else(|| Error::unsupported_expression(expr.kind()))
    }

    /// Physical columns referenced so far, in first-use order.
    pub fn columns_used(&self) -> &[String] {
        &self.used
    }

    pub fn into_columns_used(self) -> Vec<String> {
        self.used
    }

    fn record(&mut self, physical: &str) {
        if !self.used.iter().any(|c| c == physical) {
            self.used.push(physical.to_string());
        }
    }
}
