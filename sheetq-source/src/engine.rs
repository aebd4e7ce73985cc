//! Executes the statement grammar the planner renders over in-memory tables.
//!
//! Supported shape:
//!
//! ```text
//! SELECT <* | TOP n * | COUNT(*) | SUM([c]) | AVG([c]) | MIN([c]) | MAX([c])>
//!   FROM [<token>] [WHERE <condition>] [ORDER BY [c] ASC|DESC]
//! ```
//!
//! Conditions combine `=, <>, <, <=, >, >=, LIKE, NOT LIKE, IS NULL,
//! IS NOT NULL, AND, OR, NOT` over bracketed columns, literals and `?`
//! placeholders. Comparisons involving null are unknown, and unknown rows
//! are filtered out.

use std::cmp::Ordering;

use sheetq_aggregate::AggregateKind;
use sheetq_result::{Error, Result};
use sheetq_types::CellValue;
use sqlparser::ast::{
    BinaryOperator, Expr as SqlExpr, FunctionArg, FunctionArgExpr, FunctionArguments, Ident,
    ObjectNamePart, OrderByKind, Query, Select, SelectItem, SetExpr, Statement, TableFactor,
    TopQuantity, UnaryOperator, Value,
};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use crate::driver::ResultSet;
use crate::workbook::SheetTable;

/// Column name the driver reports for a computed aggregate.
pub const AGGREGATE_COLUMN: &str = "Expr1000";

/// Resolves a `FROM` token to table data.
pub trait TableProvider {
    fn table(&self, token: &str) -> Result<SheetTable>;
}

/// Parse `sql`, load its table from `provider` and run it.
pub fn execute(sql: &str, params: &[CellValue], provider: &dyn TableProvider) -> Result<ResultSet> {
    let plan = SelectPlan::parse(sql)?;
    debug!(table = %plan.table, "executing select");
    let table = provider.table(&plan.table)?;
    plan.run(table, params)
}

#[derive(Debug)]
enum Output {
    Rows,
    Aggregate {
        kind: AggregateKind,
        column: Option<String>,
    },
}

#[derive(Debug)]
struct SelectPlan {
    table: String,
    output: Output,
    filter: Option<SqlExpr>,
    order_by: Option<(String, bool)>,
    top: Option<usize>,
}

impl SelectPlan {
    fn parse(sql: &str) -> Result<Self> {
        let statements = Parser::parse_sql(&MsSqlDialect {}, sql).map_err(Error::data_source)?;
        let query = match statements.as_slice() {
            [Statement::Query(query)] => query,
            _ => return Err(unsupported("only a single SELECT statement is supported")),
        };
        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select.as_ref(),
            _ => return Err(unsupported("only plain SELECT queries are supported")),
        };
        Ok(Self {
            table: table_token(select)?,
            output: output(select)?,
            filter: select.selection.clone(),
            order_by: order_by(query)?,
            top: top(select)?,
        })
    }

    fn run(self, table: SheetTable, params: &[CellValue]) -> Result<ResultSet> {
        let condition = match &self.filter {
            Some(expr) => {
                let mut compiler = Compiler {
                    table: &table,
                    params,
                    next_param: 0,
                };
                let condition = compiler.condition(expr)?;
                if compiler.next_param != params.len() {
                    return Err(Error::data_source(format!(
                        "statement has {} placeholder(s) but {} parameter(s) were supplied",
                        compiler.next_param,
                        params.len()
                    )));
                }
                Some(condition)
            }
            None if !params.is_empty() => {
                return Err(Error::data_source(format!(
                    "statement has no placeholders but {} parameter(s) were supplied",
                    params.len()
                )));
            }
            None => None,
        };

        let SheetTable { columns, rows } = table;
        let mut rows: Vec<Vec<CellValue>> = rows
            .into_iter()
            .filter(|row| {
                condition
                    .as_ref()
                    .is_none_or(|condition| condition.eval(row) == Some(true))
            })
            .collect();

        match self.output {
            Output::Aggregate { kind, column } => {
                let index = column.as_deref().map(|name| column_index(&columns, name)).transpose()?;
                let mut acc = kind.accumulator();
                for row in &rows {
                    match index {
                        Some(idx) => acc.update(&row[idx])?,
                        None => acc.update(&CellValue::Null)?,
                    }
                }
                Ok(ResultSet::from_rows(
                    vec![AGGREGATE_COLUMN.to_string()],
                    vec![vec![acc.finalize()]],
                ))
            }
            Output::Rows => {
                if let Some((name, descending)) = &self.order_by {
                    let idx = column_index(&columns, name)?;
                    rows.sort_by(|a, b| {
                        let ordering = order_cells(&a[idx], &b[idx]);
                        if *descending { ordering.reverse() } else { ordering }
                    });
                }
                if let Some(top) = self.top {
                    rows.truncate(top);
                }
                Ok(ResultSet::from_rows(columns, rows))
            }
        }
    }
}

fn unsupported(message: impl Into<String>) -> Error {
    Error::data_source(message.into())
}

fn table_token(select: &Select) -> Result<String> {
    let [from] = select.from.as_slice() else {
        return Err(unsupported("SELECT requires exactly one table in FROM"));
    };
    if !from.joins.is_empty() {
        return Err(unsupported("JOIN clauses are not supported"));
    }
    match &from.relation {
        TableFactor::Table { name, .. } => match name.0.as_slice() {
            [ObjectNamePart::Identifier(ident)] => Ok(ident.value.clone()),
            _ => Err(unsupported(format!("invalid table name '{name}'"))),
        },
        _ => Err(unsupported("SELECT requires a plain table name in FROM")),
    }
}

fn output(select: &Select) -> Result<Output> {
    match select.projection.as_slice() {
        [SelectItem::Wildcard(_)] => Ok(Output::Rows),
        [SelectItem::UnnamedExpr(SqlExpr::Function(func))] => {
            let name = func.name.to_string();
            let kind = AggregateKind::from_sql_name(&name)
                .ok_or_else(|| unsupported(format!("unsupported function '{name}'")))?;
            let args = match &func.args {
                FunctionArguments::List(list) => list.args.as_slice(),
                _ => return Err(unsupported(format!("{name} requires one argument"))),
            };
            let column = match args {
                [FunctionArg::Unnamed(FunctionArgExpr::Wildcard)] => None,
                [FunctionArg::Unnamed(FunctionArgExpr::Expr(expr))] => Some(column_name(expr)?),
                _ => return Err(unsupported(format!("{name} requires one argument"))),
            };
            if column.is_none() && kind != AggregateKind::Count {
                return Err(unsupported(format!("{name}(*) is not supported")));
            }
            Ok(Output::Aggregate { kind, column })
        }
        _ => Err(unsupported("projection must be * or a single aggregate")),
    }
}

fn order_by(query: &Query) -> Result<Option<(String, bool)>> {
    let Some(order_by) = &query.order_by else {
        return Ok(None);
    };
    match &order_by.kind {
        OrderByKind::Expressions(exprs) => match exprs.as_slice() {
            [single] => Ok(Some((
                column_name(&single.expr)?,
                single.options.asc == Some(false),
            ))),
            _ => Err(unsupported("ORDER BY supports exactly one column")),
        },
        _ => Err(unsupported("ORDER BY ALL is not supported")),
    }
}

fn top(select: &Select) -> Result<Option<usize>> {
    let Some(top) = &select.top else {
        return Ok(None);
    };
    match &top.quantity {
        Some(TopQuantity::Constant(count)) => Ok(Some(*count as usize)),
        Some(TopQuantity::Expr(expr)) => match literal(expr)? {
            CellValue::Int(count) if count >= 0 => Ok(Some(count as usize)),
            other => Err(unsupported(format!("invalid TOP count '{other}'"))),
        },
        None => Err(unsupported("TOP requires a count")),
    }
}

fn column_name(expr: &SqlExpr) -> Result<String> {
    match expr {
        SqlExpr::Identifier(Ident { value, .. }) => Ok(value.clone()),
        SqlExpr::Nested(inner) => column_name(inner),
        other => Err(unsupported(format!("expected a column, found '{other}'"))),
    }
}

fn column_index(columns: &[String], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::data_source(format!("no value given for column '{name}'")))
}

fn literal(expr: &SqlExpr) -> Result<CellValue> {
    match expr {
        SqlExpr::Value(value) => match &value.value {
            Value::Number(text, _) => parse_number(text),
            Value::SingleQuotedString(text) => Ok(CellValue::Text(text.clone())),
            Value::Boolean(flag) => Ok(CellValue::Bool(*flag)),
            Value::Null => Ok(CellValue::Null),
            other => Err(unsupported(format!("unsupported literal '{other}'"))),
        },
        SqlExpr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match literal(expr)? {
            CellValue::Int(v) => Ok(CellValue::Int(-v)),
            CellValue::Float(v) => Ok(CellValue::Float(-v)),
            other => Err(unsupported(format!("cannot negate '{other}'"))),
        },
        SqlExpr::Nested(inner) => literal(inner),
        other => Err(unsupported(format!("unsupported literal '{other}'"))),
    }
}

fn parse_number(text: &str) -> Result<CellValue> {
    if let Ok(v) = text.parse::<i64>() {
        return Ok(CellValue::Int(v));
    }
    text.parse::<f64>()
        .map(CellValue::Float)
        .map_err(|err| unsupported(format!("invalid numeric literal '{text}': {err}")))
}

/// Sort order for `ORDER BY`: nulls first, then [`CellValue::compare`].
fn order_cells(a: &CellValue, b: &CellValue) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

#[derive(Debug)]
enum Operand {
    Column(usize),
    Value(CellValue),
}

impl Operand {
    fn value<'a>(&'a self, row: &'a [CellValue]) -> &'a CellValue {
        match self {
            Operand::Column(idx) => &row[*idx],
            Operand::Value(value) => value,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug)]
enum Condition {
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    Like {
        operand: Operand,
        pattern: Operand,
        negated: bool,
    },
    IsNull {
        operand: Operand,
        negated: bool,
    },
}

impl Condition {
    /// Three-valued evaluation; `None` is unknown.
    fn eval(&self, row: &[CellValue]) -> Option<bool> {
        match self {
            Condition::And(l, r) => match (l.eval(row), r.eval(row)) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            Condition::Or(l, r) => match (l.eval(row), r.eval(row)) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
            Condition::Not(inner) => inner.eval(row).map(|v| !v),
            Condition::Compare { left, op, right } => left
                .value(row)
                .compare(right.value(row))
                .map(|ordering| op.holds(ordering)),
            Condition::Like {
                operand,
                pattern,
                negated,
            } => {
                let value = operand.value(row);
                let pattern = pattern.value(row);
                if value.is_null() || pattern.is_null() {
                    return None;
                }
                Some(like_matches(&value.to_string(), &pattern.to_string()) != *negated)
            }
            Condition::IsNull { operand, negated } => {
                Some(operand.value(row).is_null() != *negated)
            }
        }
    }
}

/// Binds columns and placeholders left to right while lowering the parsed
/// `WHERE` expression.
struct Compiler<'a> {
    table: &'a SheetTable,
    params: &'a [CellValue],
    next_param: usize,
}

impl Compiler<'_> {
    fn condition(&mut self, expr: &SqlExpr) -> Result<Condition> {
        match expr {
            SqlExpr::Nested(inner) => self.condition(inner),
            SqlExpr::BinaryOp { left, op, right } => {
                let compare = match op {
                    BinaryOperator::And => {
                        let l = self.condition(left)?;
                        let r = self.condition(right)?;
                        return Ok(Condition::And(Box::new(l), Box::new(r)));
                    }
                    BinaryOperator::Or => {
                        let l = self.condition(left)?;
                        let r = self.condition(right)?;
                        return Ok(Condition::Or(Box::new(l), Box::new(r)));
                    }
                    BinaryOperator::Eq => CompareOp::Eq,
                    BinaryOperator::NotEq => CompareOp::NotEq,
                    BinaryOperator::Lt => CompareOp::Lt,
                    BinaryOperator::LtEq => CompareOp::LtEq,
                    BinaryOperator::Gt => CompareOp::Gt,
                    BinaryOperator::GtEq => CompareOp::GtEq,
                    other => {
                        return Err(unsupported(format!("unsupported operator '{other}'")));
                    }
                };
                let left = self.operand(left)?;
                let right = self.operand(right)?;
                Ok(Condition::Compare {
                    left,
                    op: compare,
                    right,
                })
            }
            SqlExpr::UnaryOp {
                op: UnaryOperator::Not,
                expr,
            } => Ok(Condition::Not(Box::new(self.condition(expr)?))),
            SqlExpr::IsNull(inner) => Ok(Condition::IsNull {
                operand: self.operand(inner)?,
                negated: false,
            }),
            SqlExpr::IsNotNull(inner) => Ok(Condition::IsNull {
                operand: self.operand(inner)?,
                negated: true,
            }),
            SqlExpr::Like {
                negated,
                expr,
                pattern,
                ..
            } => {
                let operand = self.operand(expr)?;
                let pattern = self.operand(pattern)?;
                Ok(Condition::Like {
                    operand,
                    pattern,
                    negated: *negated,
                })
            }
            other => Err(unsupported(format!("unsupported condition '{other}'"))),
        }
    }

    fn operand(&mut self, expr: &SqlExpr) -> Result<Operand> {
        match expr {
            SqlExpr::Identifier(ident) => {
                column_index(&self.table.columns, &ident.value).map(Operand::Column)
            }
            SqlExpr::Nested(inner) => self.operand(inner),
            SqlExpr::Value(value) if matches!(value.value, Value::Placeholder(_)) => {
                let param = self.params.get(self.next_param).cloned().ok_or_else(|| {
                    Error::data_source(format!(
                        "no value given for parameter {}",
                        self.next_param
                    ))
                })?;
                self.next_param += 1;
                Ok(Operand::Value(param))
            }
            other => literal(other).map(Operand::Value),
        }
    }
}

/// Case-insensitive `LIKE` with `%` and `_` wildcards.
pub fn like_matches(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
    let pattern: Vec<char> = pattern.chars().flat_map(char::to_lowercase).collect();

    // matched[j]: pattern[..j] matches the text consumed so far
    let mut matched = vec![false; pattern.len() + 1];
    matched[0] = true;
    for j in 1..=pattern.len() {
        matched[j] = matched[j - 1] && pattern[j - 1] == '%';
    }
    for ch in &text {
        let mut next = vec![false; pattern.len() + 1];
        for j in 1..=pattern.len() {
            next[j] = match pattern[j - 1] {
                '%' => next[j - 1] || matched[j],
                '_' => matched[j - 1],
                p => matched[j - 1] && p == *ch,
            };
        }
        matched = next;
    }
    matched[pattern.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneTable(SheetTable);

    impl TableProvider for OneTable {
        fn table(&self, token: &str) -> Result<SheetTable> {
            if token == "Sheet1$" {
                Ok(self.0.clone())
            } else {
                Err(Error::data_source(format!("missing '{token}'")))
            }
        }
    }

    fn provider() -> OneTable {
        let rows = vec![
            vec!["Name".into(), "Count".into()],
            vec!["ACME".into(), CellValue::Int(5)],
            vec!["omni".into(), CellValue::Int(30)],
            vec!["Initech".into(), CellValue::Null],
        ];
        OneTable(SheetTable::from_grid(rows, true))
    }

    fn run(sql: &str, params: &[CellValue]) -> Vec<Vec<CellValue>> {
        let set = execute(sql, params, &provider()).unwrap();
        set.rows.collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn wildcard_select_and_filters() {
        assert_eq!(run("SELECT * FROM [Sheet1$]", &[]).len(), 3);
        let rows = run(
            "SELECT * FROM [Sheet1$] WHERE ([Count] > ?)",
            &[CellValue::Int(10)],
        );
        assert_eq!(rows, vec![vec!["omni".into(), CellValue::Int(30)]]);
        let rows = run("SELECT * FROM [Sheet1$] WHERE ([Count] IS NULL)", &[]);
        assert_eq!(rows[0][0], CellValue::from("Initech"));
    }

    #[test]
    fn like_and_negation() {
        let rows = run(
            "SELECT * FROM [Sheet1$] WHERE ([Name] NOT LIKE ?)",
            &["%m%".into()],
        );
        assert_eq!(rows.len(), 1);
        assert!(like_matches("ACME", "a_m%"));
        assert!(!like_matches("ACME", "a_m"));
    }

    #[test]
    fn top_and_order() {
        let rows = run("SELECT TOP 2 * FROM [Sheet1$] ORDER BY [Count] DESC", &[]);
        assert_eq!(rows[0][1], CellValue::Int(30));
        assert_eq!(rows[1][1], CellValue::Int(5));
    }

    #[test]
    fn aggregates_return_one_cell() {
        let set = execute("SELECT SUM([Count]) FROM [Sheet1$]", &[], &provider()).unwrap();
        assert_eq!(set.columns, vec![AGGREGATE_COLUMN.to_string()]);
        let rows = set.rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows, vec![vec![CellValue::Int(35)]]);
        assert_eq!(
            run("SELECT COUNT(*) FROM [Sheet1$] WHERE ([Name] = ?)", &["acme".into()]),
            vec![vec![CellValue::Int(1)]]
        );
    }

    #[test]
    fn parameter_count_must_match() {
        assert!(execute("SELECT * FROM [Sheet1$] WHERE ([Count] > ?)", &[], &provider()).is_err());
        assert!(execute("SELECT * FROM [Sheet1$]", &[CellValue::Int(1)], &provider()).is_err());
    }

    #[test]
    fn unknown_columns_and_tables_fail() {
        assert!(matches!(
            execute("SELECT * FROM [Sheet1$] WHERE ([Boss] = ?)", &["x".into()], &provider()),
            Err(Error::DataSource(_))
        ));
        assert!(matches!(
            execute("SELECT * FROM [Other$]", &[], &provider()),
            Err(Error::DataSource(_))
        ));
    }
}
