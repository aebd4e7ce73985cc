//! Boolean expression → parameterized filter fragment.

use sheetq_expr::{BinaryOp, Expr, Method};
use sheetq_result::{Error, Result};
use sheetq_types::CellValue;

use crate::evaluator::evaluate_cell;
use crate::resolver::ColumnResolver;

/// Filter fragment plus its parameters, in placeholder order.
#[derive(Clone, Debug, PartialEq)]
pub struct TranslatedPredicate {
    pub sql: String,
    pub params: Vec<CellValue>,
}

/// Walks a predicate tree and renders it as `(<left> <op> <right>)` groups.
///
/// Negation is pushed down to the leaves instead of being rendered, so the
/// output only uses comparison, `LIKE` and null-test operators.
pub struct PredicateTranslator<'r, 'a> {
    resolver: &'r mut ColumnResolver<'a>,
    params: Vec<CellValue>,
}

impl<'r, 'a> PredicateTranslator<'r, 'a> {
    pub fn new(resolver: &'r mut ColumnResolver<'a>) -> Self {
        Self {
            resolver,
            params: Vec::new(),
        }
    }

    pub fn translate(mut self, expr: &Expr) -> Result<TranslatedPredicate> {
        let sql = self.visit(expr, false)?;
        Ok(TranslatedPredicate {
            sql,
            params: self.params,
        })
    }

    fn visit(&mut self, expr: &Expr, negated: bool) -> Result<String> {
        match expr {
            Expr::Binary { op, left, right } if op.is_logical() => {
                let op = if negated { op.negated() } else { *op };
                let left = self.visit(left, negated)?;
                let right = self.visit(right, negated)?;
                Ok(format!("({left} {} {right})", op.as_str()))
            }
            Expr::Binary { op, left, right } => {
                let op = if negated { op.negated() } else { *op };
                self.comparison(op, left, right)
            }
            Expr::Not(inner) => self.visit(inner, !negated),
            Expr::Call {
                target: Some(target),
                method,
                args,
            } => self.string_method(target, method, args, negated),
            Expr::Call {
                target: None,
                method: Method::IsNullOrEmpty,
                args,
            } if args.len() == 1 => {
                let column = self.resolver.require_field(&args[0])?;
                Ok(if negated {
                    format!("(([{column}] <> '') AND ([{column}] IS NOT NULL))")
                } else {
                    format!("(([{column}] = '') OR ([{column}] IS NULL))")
                })
            }
            Expr::Member { .. } | Expr::Index { .. } => {
                let column = self.resolver.require_field(expr)?;
                self.params.push(CellValue::Bool(!negated));
                Ok(format!("([{column}] = ?)"))
            }
            other => Err(Error::unsupported_expression(other.kind())),
        }
    }

    fn comparison(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<String> {
        let left_column = self.resolver.resolve_field(left)?;
        let right_column = self.resolver.resolve_field(right)?;

        let (column, op, value_side) = match (left_column, right_column) {
            (Some(l), Some(r)) => return Ok(format!("([{l}] {} [{r}])", op.as_str())),
            (Some(column), None) => (column, op, right),
            (None, Some(column)) => (column, op.mirrored(), left),
            (None, None) => {
                if let Some(side) = [left, right].into_iter().find(|e| e.references_row()) {
                    return Err(Error::unsupported_expression(side.kind()));
                }
                return Err(Error::unsupported_expression(format!(
                    "comparison '{}' without a column reference",
                    op.as_str()
                )));
            }
        };

        let value = evaluate_cell(value_side)?;
        if value.is_null() {
            return match op {
                BinaryOp::Eq => Ok(format!("([{column}] IS NULL)")),
                BinaryOp::NotEq => Ok(format!("([{column}] IS NOT NULL)")),
                other => Err(Error::InvalidArgumentError(format!(
                    "column '{column}' cannot be compared with null using '{}'",
                    other.as_str()
                ))),
            };
        }
        self.params.push(value);
        Ok(format!("([{column}] {} ?)", op.as_str()))
    }

    fn string_method(
        &mut self,
        target: &Expr,
        method: &Method,
        args: &[Expr],
        negated: bool,
    ) -> Result<String> {
        let [arg] = args else {
            return Err(Error::unsupported_expression(format!(
                "method '{}' with {} argument(s) in a filter",
                method.as_str(),
                args.len()
            )));
        };
        let column = match method {
            Method::Contains | Method::StartsWith | Method::EndsWith | Method::Equals => {
                self.resolver.require_field(target)?
            }
            other => {
                return Err(Error::unsupported_expression(format!(
                    "method '{}' in a filter",
                    other.as_str()
                )));
            }
        };

        let value = evaluate_cell(arg)?;
        if value.is_null() {
            return Err(Error::InvalidArgumentError(format!(
                "'{}' on column '{column}' requires a non-null argument",
                method.as_str()
            )));
        }

        let (operator, param) = match method {
            Method::Contains => ("LIKE", CellValue::Text(format!("%{value}%"))),
            Method::StartsWith => ("LIKE", CellValue::Text(format!("{value}%"))),
            Method::EndsWith => ("LIKE", CellValue::Text(format!("%{value}"))),
            _ => ("=", value),
        };
        let operator = match (operator, negated) {
            ("LIKE", true) => "NOT LIKE",
            ("=", true) => "<>",
            (operator, _) => operator,
        };
        self.params.push(param);
        Ok(format!("([{column}] {operator} ?)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ColumnMapping;
    use sheetq_expr::{column, column_at, field, is_null_or_empty, lit};

    fn translate(expr: &Expr) -> Result<TranslatedPredicate> {
        let mapping = ColumnMapping::new();
        let mut resolver = ColumnResolver::new(&mapping, true);
        PredicateTranslator::new(&mut resolver).translate(expr)
    }

    #[test]
    fn equality_binds_one_parameter() {
        let out = translate(&field("Name").eq("ACME")).unwrap();
        assert_eq!(out.sql, "([Name] = ?)");
        assert_eq!(out.params, vec![CellValue::Text("ACME".into())]);
    }

    #[test]
    fn null_comparisons_render_null_tests() {
        let out = translate(&field("CEO").eq(CellValue::Null)).unwrap();
        assert_eq!(out.sql, "([CEO] IS NULL)");
        assert!(out.params.is_empty());

        let out = translate(&field("CEO").not_eq(CellValue::Null)).unwrap();
        assert_eq!(out.sql, "([CEO] IS NOT NULL)");

        let out = translate(&lit(CellValue::Null).eq(field("CEO"))).unwrap();
        assert_eq!(out.sql, "([CEO] IS NULL)");

        assert!(translate(&field("CEO").gt(CellValue::Null)).is_err());
    }

    #[test]
    fn column_moves_left_and_operator_mirrors() {
        let out = translate(&lit(25).lt(field("EmployeeCount"))).unwrap();
        assert_eq!(out.sql, "([EmployeeCount] > ?)");
        assert_eq!(out.params, vec![CellValue::Int(25)]);
    }

    #[test]
    fn logical_combinators_keep_parameter_order() {
        let expr = field("EmployeeCount")
            .gt_eq(10)
            .and(lit("Paul").eq(field("CEO")).or(field("Name").not_eq("Omni")));
        let out = translate(&expr).unwrap();
        assert_eq!(
            out.sql,
            "(([EmployeeCount] >= ?) AND (([CEO] = ?) OR ([Name] <> ?)))"
        );
        assert_eq!(
            out.params,
            vec![
                CellValue::Int(10),
                CellValue::Text("Paul".into()),
                CellValue::Text("Omni".into())
            ]
        );
    }

    #[test]
    fn string_methods_become_like_patterns() {
        let out = translate(&field("Name").contains("ex")).unwrap();
        assert_eq!(out.sql, "([Name] LIKE ?)");
        assert_eq!(out.params, vec![CellValue::Text("%ex%".into())]);

        let out = translate(&field("Name").starts_with("Ac")).unwrap();
        assert_eq!(out.params, vec![CellValue::Text("Ac%".into())]);

        let out = translate(&field("Name").ends_with("rp")).unwrap();
        assert_eq!(out.params, vec![CellValue::Text("%rp".into())]);

        let out = translate(&field("Name").equals("ACME")).unwrap();
        assert_eq!(out.sql, "([Name] = ?)");

        let out = translate(&field("Name").contains("ex").not()).unwrap();
        assert_eq!(out.sql, "([Name] NOT LIKE ?)");
    }

    #[test]
    fn is_null_or_empty_and_negation() {
        let out = translate(&is_null_or_empty(field("CEO"))).unwrap();
        assert_eq!(out.sql, "(([CEO] = '') OR ([CEO] IS NULL))");
        assert!(out.params.is_empty());

        let out = translate(&is_null_or_empty(field("CEO")).not()).unwrap();
        assert_eq!(out.sql, "(([CEO] <> '') AND ([CEO] IS NOT NULL))");
    }

    #[test]
    fn negation_is_pushed_to_leaves() {
        let expr = field("EmployeeCount").gt(10).and(field("Name").eq("A")).not();
        let out = translate(&expr).unwrap();
        assert_eq!(out.sql, "(([EmployeeCount] <= ?) OR ([Name] <> ?))");
    }

    #[test]
    fn boolean_fields_and_column_pairs() {
        let out = translate(&field("Active")).unwrap();
        assert_eq!(out.sql, "([Active] = ?)");
        assert_eq!(out.params, vec![CellValue::Bool(true)]);

        let out = translate(&field("Active").not()).unwrap();
        assert_eq!(out.params, vec![CellValue::Bool(false)]);

        let out = translate(&column("Low").lt(column("High"))).unwrap();
        assert_eq!(out.sql, "([Low] < [High])");
        assert!(out.params.is_empty());
    }

    #[test]
    fn headerless_positions() {
        let mapping = ColumnMapping::new();
        let mut resolver = ColumnResolver::new(&mapping, false);
        let out = PredicateTranslator::new(&mut resolver)
            .translate(&column_at(1).eq("Paul"))
            .unwrap();
        assert_eq!(out.sql, "([F2] = ?)");
    }

    #[test]
    fn unsupported_nodes_name_their_kind() {
        assert!(matches!(
            translate(&field("Name").to_upper().eq("ACME")),
            Err(Error::UnsupportedExpression(msg)) if msg.contains("ToUpper")
        ));
        assert!(matches!(
            translate(&lit(true)),
            Err(Error::UnsupportedExpression(msg)) if msg.contains("constant")
        ));
        assert!(matches!(
            translate(&lit(1).eq(2)),
            Err(Error::UnsupportedExpression(_))
        ));
    }
}
