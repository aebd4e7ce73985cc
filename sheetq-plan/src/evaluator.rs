//! Evaluation of expression subtrees that do not reference the row.
//!
//! The results become statement parameters, so every supported node must
//! reduce to a concrete value before the statement is rendered.

use chrono::NaiveDate;
use sheetq_expr::{Constructor, Expr, Method, Value};
use sheetq_result::{Error, Result};
use sheetq_types::{CellValue, FromCell};

/// Evaluate `expr` to a value.
pub fn evaluate(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Constant(value) => Ok(Value::Cell(value.clone())),
        Expr::Captured(object) => Ok(Value::Object(object.clone())),
        Expr::Member { target, name } => {
            if target.references_row() {
                return Err(Error::unsupported_expression(expr.kind()));
            }
            read_member(evaluate(target)?, name)
        }
        Expr::Call {
            target: Some(target),
            method,
            args,
        } => {
            if target.references_row() {
                return Err(Error::unsupported_expression(expr.kind()));
            }
            let receiver = evaluate(target)?;
            let args = evaluate_args(args)?;
            invoke(receiver, method, &args)
        }
        Expr::Call {
            target: None,
            method: Method::IsNullOrEmpty,
            args,
        } if args.len() == 1 => {
            let value = evaluate_cell(&args[0])?;
            let empty = match &value {
                CellValue::Null => true,
                CellValue::Text(s) => s.is_empty(),
                _ => false,
            };
            Ok(Value::Cell(CellValue::Bool(empty)))
        }
        Expr::New { constructor, args } => {
            let args = evaluate_args(args)?;
            construct(*constructor, &args).map(Value::Cell)
        }
        other => Err(Error::unsupported_expression(other.kind())),
    }
}

/// Evaluate `expr` and reduce the result to a cell value.
pub fn evaluate_cell(expr: &Expr) -> Result<CellValue> {
    match evaluate(expr)? {
        Value::Cell(cell) => Ok(cell),
        Value::Object(object) => object.as_cell().ok_or_else(|| {
            Error::unsupported_expression(format!(
                "captured {} has no scalar value",
                object.type_name()
            ))
        }),
    }
}

fn evaluate_args(args: &[Expr]) -> Result<Vec<CellValue>> {
    args.iter().map(evaluate_cell).collect()
}

fn read_member(receiver: Value, name: &str) -> Result<Value> {
    match receiver {
        Value::Object(object) => object.member(name).ok_or_else(|| {
            Error::unsupported_expression(format!(
                "member '{name}' on captured {}",
                object.type_name()
            ))
        }),
        Value::Cell(cell) => {
            let value = match (&cell, name) {
                (CellValue::Text(s), "Length") => CellValue::Int(s.chars().count() as i64),
                (CellValue::Date(d), "Year") => CellValue::Int(chrono::Datelike::year(d) as i64),
                (CellValue::Date(d), "Month") => CellValue::Int(chrono::Datelike::month(d) as i64),
                (CellValue::Date(d), "Day") => CellValue::Int(chrono::Datelike::day(d) as i64),
                (CellValue::Date(d), "Date") => CellValue::from(d.date()),
                _ => {
                    return Err(Error::unsupported_expression(format!(
                        "member '{name}' on {} value",
                        cell.type_name()
                    )));
                }
            };
            Ok(Value::Cell(value))
        }
    }
}

fn invoke(receiver: Value, method: &Method, args: &[CellValue]) -> Result<Value> {
    match receiver {
        Value::Object(object) => {
            if let Some(value) = object.call(method.as_str(), args) {
                return Ok(value);
            }
            match object.as_cell() {
                Some(cell) if !matches!(method, Method::Named(_)) => {
                    invoke_on_cell(&cell, method, args).map(Value::Cell)
                }
                _ => Err(Error::unsupported_expression(format!(
                    "method '{}' on captured {}",
                    method.as_str(),
                    object.type_name()
                ))),
            }
        }
        Value::Cell(cell) => invoke_on_cell(&cell, method, args).map(Value::Cell),
    }
}

fn invoke_on_cell(receiver: &CellValue, method: &Method, args: &[CellValue]) -> Result<CellValue> {
    if receiver.is_null() && !matches!(method, Method::ToString) {
        return Err(Error::InvalidArgumentError(format!(
            "cannot call '{}' on a null value",
            method.as_str()
        )));
    }
    let text = if receiver.is_null() {
        String::new()
    } else {
        receiver.to_string()
    };
    let value = match (method, args) {
        (Method::ToUpper, []) => CellValue::Text(text.to_uppercase()),
        (Method::ToLower, []) => CellValue::Text(text.to_lowercase()),
        (Method::Trim, []) => CellValue::Text(text.trim().to_string()),
        (Method::TrimStart, []) => CellValue::Text(text.trim_start().to_string()),
        (Method::TrimEnd, []) => CellValue::Text(text.trim_end().to_string()),
        (Method::ToString, []) => CellValue::Text(text),
        (Method::Replace, [from, to]) => {
            CellValue::Text(text.replace(&from.to_string(), &to.to_string()))
        }
        (Method::Substring, [start]) => {
            let start = arg_as::<usize>(start, method)?;
            CellValue::Text(text.chars().skip(start).collect())
        }
        (Method::Substring, [start, len]) => {
            let start = arg_as::<usize>(start, method)?;
            let len = arg_as::<usize>(len, method)?;
            CellValue::Text(text.chars().skip(start).take(len).collect())
        }
        (Method::Contains, [needle]) => CellValue::Bool(text.contains(&needle.to_string())),
        (Method::StartsWith, [prefix]) => CellValue::Bool(text.starts_with(&prefix.to_string())),
        (Method::EndsWith, [suffix]) => CellValue::Bool(text.ends_with(&suffix.to_string())),
        (Method::Equals, [other]) => CellValue::Bool(receiver == other),
        _ => {
            return Err(Error::unsupported_expression(format!(
                "method '{}' with {} argument(s) on {} value",
                method.as_str(),
                args.len(),
                receiver.type_name()
            )));
        }
    };
    Ok(value)
}

fn arg_as<T: FromCell>(value: &CellValue, method: &Method) -> Result<T> {
    T::from_cell(value).map_err(|err| {
        Error::InvalidArgumentError(format!(
            "invalid argument for '{}': {err}",
            method.as_str()
        ))
    })
}

fn construct(constructor: Constructor, args: &[CellValue]) -> Result<CellValue> {
    let parts = args
        .iter()
        .map(|arg| {
            i32::from_cell(arg).map_err(|err| {
                Error::InvalidArgumentError(format!(
                    "invalid argument for {}: {err}",
                    constructor.as_str()
                ))
            })
        })
        .collect::<Result<Vec<i32>>>()?;

    let invalid = || {
        Error::InvalidArgumentError(format!(
            "{} arguments {:?} do not form a valid value",
            constructor.as_str(),
            parts
        ))
    };

    match (constructor, parts.as_slice()) {
        (Constructor::Date, [y, m, d]) => {
            let date = NaiveDate::from_ymd_opt(*y, *m as u32, *d as u32).ok_or_else(invalid)?;
            Ok(CellValue::from(date))
        }
        (Constructor::DateTime, [y, m, d, h, mi, s]) => {
            let date = NaiveDate::from_ymd_opt(*y, *m as u32, *d as u32).ok_or_else(invalid)?;
            let datetime = date
                .and_hms_opt(*h as u32, *mi as u32, *s as u32)
                .ok_or_else(invalid)?;
            Ok(CellValue::Date(datetime))
        }
        _ => Err(Error::unsupported_expression(format!(
            "constructor '{}' with {} argument(s)",
            constructor.as_str(),
            parts.len()
        ))),
    }
}
