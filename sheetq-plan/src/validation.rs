//! Checks of translated column references against the live source schema.

use sheetq_result::{Error, Result};

/// Ensure every column in `used` is one of `available`.
///
/// Header text in spreadsheets is matched without regard to case, the same
/// way the drivers resolve bracketed identifiers.
pub fn ensure_known_columns(used: &[String], available: &[String]) -> Result<()> {
    for column in used {
        if !available.iter().any(|name| name.eq_ignore_ascii_case(column)) {
            return Err(Error::UnknownColumn {
                column: column.clone(),
                valid: available.to_vec(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn known_columns_pass_case_insensitively() {
        let available = names(&["Name", "CEO"]);
        ensure_known_columns(&names(&["name", "CEO"]), &available).unwrap();
    }

    #[test]
    fn unknown_column_reports_valid_names() {
        let available = names(&["Name", "CEO"]);
        let err = ensure_known_columns(&names(&["Boss"]), &available).unwrap_err();
        match err {
            Error::UnknownColumn { column, valid } => {
                assert_eq!(column, "Boss");
                assert_eq!(valid, available);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
