//! Lightweight formatting helpers for expression enums.

use crate::{BinaryOp, Constructor, Expr, Method};

impl BinaryOp {
    /// Render the operator as it appears in a statement.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Contains => "Contains",
            Method::StartsWith => "StartsWith",
            Method::EndsWith => "EndsWith",
            Method::Equals => "Equals",
            Method::IsNullOrEmpty => "IsNullOrEmpty",
            Method::ToUpper => "ToUpper",
            Method::ToLower => "ToLower",
            Method::Trim => "Trim",
            Method::TrimStart => "TrimStart",
            Method::TrimEnd => "TrimEnd",
            Method::ToString => "ToString",
            Method::Replace => "Replace",
            Method::Substring => "Substring",
            Method::Named(name) => name,
        }
    }
}

impl Constructor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Constructor::Date => "Date",
            Constructor::DateTime => "DateTime",
        }
    }
}

impl Expr {
    /// Node kind, used to name the offending node in unsupported-expression
    /// errors.
    pub fn kind(&self) -> String {
        match self {
            Expr::Constant(_) => "constant".into(),
            Expr::Captured(value) => format!("captured {}", value.type_name()),
            Expr::Row => "row parameter".into(),
            Expr::Member { name, .. } => format!("member access '{name}'"),
            Expr::Index { .. } => "row indexer".into(),
            Expr::Call { method, .. } => format!("method call '{}'", method.as_str()),
            Expr::New { constructor, .. } => format!("constructor '{}'", constructor.as_str()),
            Expr::Binary { op, .. } => format!("binary '{}'", op.as_str()),
            Expr::Not(_) => "logical not".into(),
        }
    }
}
