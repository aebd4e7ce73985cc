//! The rendered statement handed to the data driver.

use std::fmt;

use sheetq_aggregate::AggregateKind;
use sheetq_types::CellValue;

use crate::predicate::TranslatedPredicate;

/// Accumulated statement state.
///
/// Rendering is a pure function of the fields, so calling [`SqlStatement::render`]
/// repeatedly yields identical text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SqlStatement {
    /// Rendered aggregate clause such as `COUNT(*)` or `SUM([Sales])`.
    pub aggregate: Option<String>,
    /// Source token placed inside the `FROM` brackets.
    pub table: String,
    pub where_clause: Option<String>,
    pub parameters: Vec<CellValue>,
    pub order_by: Option<String>,
    pub order_by_descending: bool,
    pub top: Option<usize>,
}

impl SqlStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// AND a translated predicate onto the filter, keeping parameter order.
    pub fn add_filter(&mut self, predicate: TranslatedPredicate) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => format!("({existing} AND {})", predicate.sql),
            None => predicate.sql,
        });
        self.parameters.extend(predicate.params);
    }

    /// Lower the paging count, never raise it.
    pub fn limit(&mut self, count: usize) {
        self.top = Some(self.top.map_or(count, |top| top.min(count)));
    }

    pub fn set_aggregate(&mut self, kind: AggregateKind, column: Option<&str>) {
        self.aggregate = Some(kind.render(column));
        // single row result; ORDER BY is not rendered
        self.order_by = None;
        self.order_by_descending = false;
    }

    pub fn render(&self) -> String {
        let mut sql = String::from("SELECT ");
        match (&self.aggregate, self.top) {
            (Some(aggregate), _) => sql.push_str(aggregate),
            (None, Some(top)) => {
                sql.push_str("TOP ");
                sql.push_str(&top.to_string());
                sql.push_str(" *");
            }
            (None, None) => sql.push('*'),
        }
        sql.push_str(" FROM [");
        sql.push_str(&self.table);
        sql.push(']');
        if let Some(filter) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        if let (None, Some(column)) = (&self.aggregate, &self.order_by) {
            sql.push_str(" ORDER BY [");
            sql.push_str(column);
            sql.push_str(if self.order_by_descending { "] DESC" } else { "] ASC" });
        }
        sql
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predicate(sql: &str, params: Vec<CellValue>) -> TranslatedPredicate {
        TranslatedPredicate {
            sql: sql.into(),
            params,
        }
    }

    #[test]
    fn select_all() {
        assert_eq!(SqlStatement::new("Sheet1$").render(), "SELECT * FROM [Sheet1$]");
    }

    #[test]
    fn filters_combine_with_and() {
        let mut stmt = SqlStatement::new("Sheet1$");
        stmt.add_filter(predicate("([EmployeeCount] > ?)", vec![CellValue::Int(25)]));
        stmt.add_filter(predicate("([CEO] = ?)", vec!["Paul".into()]));
        assert_eq!(
            stmt.render(),
            "SELECT * FROM [Sheet1$] WHERE (([EmployeeCount] > ?) AND ([CEO] = ?))"
        );
        assert_eq!(stmt.parameters, vec![CellValue::Int(25), "Paul".into()]);
    }

    #[test]
    fn top_and_order() {
        let mut stmt = SqlStatement::new("Sheet1$");
        stmt.limit(5);
        stmt.limit(10);
        stmt.order_by = Some("StartDate".into());
        stmt.order_by_descending = true;
        assert_eq!(
            stmt.render(),
            "SELECT TOP 5 * FROM [Sheet1$] ORDER BY [StartDate] DESC"
        );
    }

    #[test]
    fn aggregates_drop_ordering() {
        let mut stmt = SqlStatement::new("Sheet1$");
        stmt.order_by = Some("Name".into());
        stmt.set_aggregate(AggregateKind::Average, Some("EmployeeCount"));
        assert_eq!(stmt.render(), "SELECT AVG([EmployeeCount]) FROM [Sheet1$]");
        stmt.set_aggregate(AggregateKind::Count, Some("EmployeeCount"));
        assert_eq!(stmt.to_string(), "SELECT COUNT(*) FROM [Sheet1$]");
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut stmt = SqlStatement::new("Sheet1$A1:D8");
        stmt.add_filter(predicate("([Name] LIKE ?)", vec!["%a%".into()]));
        stmt.order_by = Some("Name".into());
        assert_eq!(stmt.render(), stmt.render());
        assert_eq!(stmt.render(), stmt.to_string());
    }
}
