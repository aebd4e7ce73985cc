//! Query expression tree.
#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use sheetq_types::CellValue;

/// A value produced while evaluating a subtree that does not reference the
/// row: either a plain cell value or a captured object whose members and
/// methods are reached by name.
#[derive(Clone, Debug)]
pub enum Value {
    Cell(CellValue),
    Object(Arc<dyn CapturedValue>),
}

impl Value {
    /// Reduce to a cell value, asking captured objects for their scalar view.
    pub fn into_cell(self) -> Option<CellValue> {
        match self {
            Value::Cell(cell) => Some(cell),
            Value::Object(object) => object.as_cell(),
        }
    }
}

impl From<CellValue> for Value {
    fn from(value: CellValue) -> Self {
        Value::Cell(value)
    }
}

/// A value closed over by the calling code (a local variable, a settings
/// object, ...).
///
/// Member reads and method calls are dispatched through this trait instead of
/// runtime reflection. Nested access works by returning [`Value::Object`]
/// from [`CapturedValue::member`].
pub trait CapturedValue: fmt::Debug + Send + Sync {
    /// Type name used in diagnostics.
    fn type_name(&self) -> &str;

    /// Read a member by name. `None` means the member does not exist.
    fn member(&self, name: &str) -> Option<Value>;

    /// Invoke a method by name. `None` means the method does not exist.
    fn call(&self, _method: &str, _args: &[CellValue]) -> Option<Value> {
        None
    }

    /// Scalar view of the whole object, if it has one.
    fn as_cell(&self) -> Option<CellValue> {
        None
    }
}

/// Column addressed through the row indexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnKey {
    /// `row["Name"]`
    Name(String),
    /// `row[0]`, only valid for sources without a header row.
    Position(usize),
}

/// Binary operators: comparisons and logical combinators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    And,
    Or,
}

impl BinaryOp {
    #[inline]
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Operator to use when the operands swap sides (`a < b` ⇔ `b > a`).
    pub fn mirrored(self) -> BinaryOp {
        match self {
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::GtEq => BinaryOp::LtEq,
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::LtEq => BinaryOp::GtEq,
            other => other,
        }
    }

    /// Logical complement (`NOT (a < b)` ⇔ `a >= b`, De Morgan for AND/OR).
    pub fn negated(self) -> BinaryOp {
        match self {
            BinaryOp::Eq => BinaryOp::NotEq,
            BinaryOp::NotEq => BinaryOp::Eq,
            BinaryOp::Gt => BinaryOp::LtEq,
            BinaryOp::GtEq => BinaryOp::Lt,
            BinaryOp::Lt => BinaryOp::GtEq,
            BinaryOp::LtEq => BinaryOp::Gt,
            BinaryOp::And => BinaryOp::Or,
            BinaryOp::Or => BinaryOp::And,
        }
    }
}

/// Methods an expression may call.
///
/// The first group is translated into predicates on columns; the second is
/// evaluated immediately on constant receivers. `Named` dispatches to a
/// [`CapturedValue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    IsNullOrEmpty,
    ToUpper,
    ToLower,
    Trim,
    TrimStart,
    TrimEnd,
    ToString,
    Replace,
    Substring,
    Named(String),
}

/// Constructors the evaluator can invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constructor {
    /// `Date(year, month, day)`
    Date,
    /// `DateTime(year, month, day, hour, minute, second)`
    DateTime,
}

/// Expression over the row being queried.
#[derive(Clone, Debug)]
pub enum Expr {
    /// Literal value.
    Constant(CellValue),
    /// Value captured from the calling scope.
    Captured(Arc<dyn CapturedValue>),
    /// The row/record parameter itself.
    Row,
    /// Member access. On [`Expr::Row`] this names a logical field.
    Member { target: Box<Expr>, name: String },
    /// Indexer access on the row.
    Index { target: Box<Expr>, key: ColumnKey },
    /// Method call; `target` is `None` for static calls such as
    /// `IsNullOrEmpty(x)`.
    Call {
        target: Option<Box<Expr>>,
        method: Method,
        args: Vec<Expr>,
    },
    /// Object construction.
    New {
        constructor: Constructor,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
}

/// Logical field of the queried row (`r => r.Name`).
pub fn field(name: impl Into<String>) -> Expr {
    Expr::Member {
        target: Box::new(Expr::Row),
        name: name.into(),
    }
}

/// Column of a generic row by name (`r => r["Name"]`).
pub fn column(name: impl Into<String>) -> Expr {
    Expr::Index {
        target: Box::new(Expr::Row),
        key: ColumnKey::Name(name.into()),
    }
}

/// Column of a headerless row by zero-based position (`r => r[0]`).
pub fn column_at(position: usize) -> Expr {
    Expr::Index {
        target: Box::new(Expr::Row),
        key: ColumnKey::Position(position),
    }
}

pub fn lit(value: impl Into<CellValue>) -> Expr {
    Expr::Constant(value.into())
}

pub fn captured<C: CapturedValue + 'static>(value: C) -> Expr {
    Expr::Captured(Arc::new(value))
}

/// `string.IsNullOrEmpty(expr)`
pub fn is_null_or_empty(expr: Expr) -> Expr {
    Expr::Call {
        target: None,
        method: Method::IsNullOrEmpty,
        args: vec![expr],
    }
}

/// `new Date(year, month, day)`
pub fn date(year: impl Into<Expr>, month: impl Into<Expr>, day: impl Into<Expr>) -> Expr {
    Expr::New {
        constructor: Constructor::Date,
        args: vec![year.into(), month.into(), day.into()],
    }
}

macro_rules! impl_from_for_expr {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(v: $t) -> Self {
                    Expr::Constant(v.into())
                }
            }
        )*
    };
}

impl_from_for_expr!(
    CellValue,
    bool,
    i32,
    i64,
    u32,
    f64,
    String,
    &str,
    NaiveDate,
    NaiveDateTime
);

impl Expr {
    fn binary(self, op: BinaryOp, other: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    fn method(self, method: Method, args: Vec<Expr>) -> Expr {
        Expr::Call {
            target: Some(Box::new(self)),
            method,
            args,
        }
    }

    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Eq, other)
    }

    pub fn not_eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::NotEq, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Gt, other)
    }

    pub fn gt_eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::GtEq, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Lt, other)
    }

    pub fn lt_eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::LtEq, other)
    }

    pub fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Or, other)
    }

    /// Wrap an expression in a logical NOT.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn member(self, name: impl Into<String>) -> Expr {
        Expr::Member {
            target: Box::new(self),
            name: name.into(),
        }
    }

    pub fn contains(self, value: impl Into<Expr>) -> Expr {
        self.method(Method::Contains, vec![value.into()])
    }

    pub fn starts_with(self, value: impl Into<Expr>) -> Expr {
        self.method(Method::StartsWith, vec![value.into()])
    }

    pub fn ends_with(self, value: impl Into<Expr>) -> Expr {
        self.method(Method::EndsWith, vec![value.into()])
    }

    pub fn equals(self, value: impl Into<Expr>) -> Expr {
        self.method(Method::Equals, vec![value.into()])
    }

    pub fn to_upper(self) -> Expr {
        self.method(Method::ToUpper, Vec::new())
    }

    pub fn to_lower(self) -> Expr {
        self.method(Method::ToLower, Vec::new())
    }

    pub fn trim(self) -> Expr {
        self.method(Method::Trim, Vec::new())
    }

    pub fn call(self, method: Method, args: Vec<Expr>) -> Expr {
        self.method(method, args)
    }

    /// `true` when the expression reads the row anywhere in its subtree.
    pub fn references_row(&self) -> bool {
        match self {
            Expr::Row => true,
            Expr::Constant(_) | Expr::Captured(_) => false,
            Expr::Member { target, .. } | Expr::Index { target, .. } => target.references_row(),
            Expr::Call { target, args, .. } => {
                target.as_ref().is_some_and(|t| t.references_row())
                    || args.iter().any(Expr::references_row)
            }
            Expr::New { args, .. } => args.iter().any(Expr::references_row),
            Expr::Binary { left, right, .. } => left.references_row() || right.references_row(),
            Expr::Not(inner) => inner.references_row(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_simple_exprs() {
        let expr = field("EmployeeCount").gt(25).and(field("CEO").eq("Paul"));
        match expr {
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Gt, .. }));
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Eq, .. }));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn operator_algebra() {
        assert_eq!(BinaryOp::Lt.mirrored(), BinaryOp::Gt);
        assert_eq!(BinaryOp::Eq.mirrored(), BinaryOp::Eq);
        assert_eq!(BinaryOp::Gt.negated(), BinaryOp::LtEq);
        assert_eq!(BinaryOp::And.negated(), BinaryOp::Or);
        for op in [BinaryOp::Eq, BinaryOp::Gt, BinaryOp::LtEq, BinaryOp::Or] {
            assert_eq!(op.negated().negated(), op);
        }
    }

    #[test]
    fn references_row_looks_through_calls() {
        assert!(field("Name").to_upper().references_row());
        assert!(!lit("paul").to_upper().references_row());
        assert!(!date(2008, 10, 9).references_row());
        assert!(is_null_or_empty(column("Name")).references_row());
    }
}
