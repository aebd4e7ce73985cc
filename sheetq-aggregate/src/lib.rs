//! Aggregate folding over cell values.
//!
//! Both the in-memory driver (for `SELECT SUM([c]) ...` statements) and the
//! materializer (for the client-side fallback) fold values through the same
//! [`AggregateAccumulator`], so a pushed-down aggregate and a client-side one
//! agree on typing and null handling.
#![forbid(unsafe_code)]

use std::cmp::Ordering;

use sheetq_result::{Error, Result};
use sheetq_types::CellValue;

pub type AggregateResult<T> = Result<T>;

/// Type of aggregate operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    /// Row count; nulls are counted.
    Count,
    Sum,
    Average,
    Min,
    Max,
}

impl AggregateKind {
    pub fn sql_name(self) -> &'static str {
        match self {
            AggregateKind::Count => "COUNT",
            AggregateKind::Sum => "SUM",
            AggregateKind::Average => "AVG",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
        }
    }

    /// Parse a SQL function name, ignoring case.
    pub fn from_sql_name(name: &str) -> Option<Self> {
        [
            AggregateKind::Count,
            AggregateKind::Sum,
            AggregateKind::Average,
            AggregateKind::Min,
            AggregateKind::Max,
        ]
        .into_iter()
        .find(|kind| kind.sql_name().eq_ignore_ascii_case(name))
    }

    /// Render the aggregate over `column`, or over all rows for `COUNT`.
    pub fn render(self, column: Option<&str>) -> String {
        match (self, column) {
            (AggregateKind::Count, _) | (_, None) => format!("{}(*)", self.sql_name()),
            (kind, Some(column)) => format!("{}([{column}])", kind.sql_name()),
        }
    }

    pub fn accumulator(self) -> AggregateAccumulator {
        match self {
            AggregateKind::Count => AggregateAccumulator::Count { value: 0 },
            AggregateKind::Sum => AggregateAccumulator::Sum { total: None },
            AggregateKind::Average => AggregateAccumulator::Average { sum: 0.0, count: 0 },
            AggregateKind::Min => AggregateAccumulator::Extreme {
                keep: Ordering::Less,
                value: None,
            },
            AggregateKind::Max => AggregateAccumulator::Extreme {
                keep: Ordering::Greater,
                value: None,
            },
        }
    }
}

/// Running total of a `SUM`; stays integral until a non-integer arrives.
#[derive(Clone, Debug, PartialEq)]
pub enum SumTotal {
    Int(i64),
    Float(f64),
}

/// Accumulator for incremental aggregate computation
#[derive(Clone, Debug, PartialEq)]
pub enum AggregateAccumulator {
    Count { value: i64 },
    Sum { total: Option<SumTotal> },
    Average { sum: f64, count: u64 },
    /// `keep` is the ordering a new value must have against the current one
    /// to replace it.
    Extreme {
        keep: Ordering,
        value: Option<CellValue>,
    },
}

impl AggregateAccumulator {
    /// Fold one value in.
    pub fn update(&mut self, value: &CellValue) -> AggregateResult<()> {
        match self {
            AggregateAccumulator::Count { value: count } => {
                *count = count.checked_add(1).ok_or_else(|| {
                    Error::InvalidArgumentError("COUNT result exceeds i64 range".into())
                })?;
            }
            _ if value.is_null() => {}
            AggregateAccumulator::Sum { total } => {
                let next = match (total.take(), value) {
                    (None, CellValue::Int(v)) => SumTotal::Int(*v),
                    (Some(SumTotal::Int(acc)), CellValue::Int(v)) => {
                        SumTotal::Int(acc.checked_add(*v).ok_or_else(|| {
                            Error::InvalidArgumentError("SUM aggregate result exceeds i64 range".into())
                        })?)
                    }
                    (acc, other) => {
                        let v = numeric(other, AggregateKind::Sum)?;
                        match acc {
                            None => SumTotal::Float(v),
                            Some(SumTotal::Int(acc)) => SumTotal::Float(acc as f64 + v),
                            Some(SumTotal::Float(acc)) => SumTotal::Float(acc + v),
                        }
                    }
                };
                *total = Some(next);
            }
            AggregateAccumulator::Average { sum, count } => {
                *sum += numeric(value, AggregateKind::Average)?;
                *count += 1;
            }
            AggregateAccumulator::Extreme { keep, value: current } => match current {
                None => *current = Some(value.clone()),
                Some(existing) => {
                    let ordering = value.compare(existing).ok_or_else(|| {
                        Error::InvalidArgumentError(format!(
                            "cannot compare {} value '{value}' with {} value '{existing}'",
                            value.type_name(),
                            existing.type_name()
                        ))
                    })?;
                    if ordering == *keep {
                        *current = Some(value.clone());
                    }
                }
            },
        }
        Ok(())
    }

    /// Final value. Aggregates other than `COUNT` over no values are null.
    pub fn finalize(self) -> CellValue {
        match self {
            AggregateAccumulator::Count { value } => CellValue::Int(value),
            AggregateAccumulator::Sum { total: None } => CellValue::Null,
            AggregateAccumulator::Sum {
                total: Some(SumTotal::Int(v)),
            } => CellValue::Int(v),
            AggregateAccumulator::Sum {
                total: Some(SumTotal::Float(v)),
            } => CellValue::Float(v),
            AggregateAccumulator::Average { count: 0, .. } => CellValue::Null,
            AggregateAccumulator::Average { sum, count } => CellValue::Float(sum / count as f64),
            AggregateAccumulator::Extreme { value, .. } => value.unwrap_or_default(),
        }
    }
}

fn numeric(value: &CellValue, kind: AggregateKind) -> AggregateResult<f64> {
    value.as_f64().ok_or_else(|| {
        Error::InvalidArgumentError(format!(
            "{} aggregate expected a numeric value, got {} '{value}'",
            kind.sql_name(),
            value.type_name()
        ))
    })
}

/// Fold `values` with a fresh accumulator for `kind`.
pub fn fold<'a, I>(kind: AggregateKind, values: I) -> AggregateResult<CellValue>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let mut acc = kind.accumulator();
    for value in values {
        acc.update(value)?;
    }
    Ok(acc.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[CellValue]) -> Vec<CellValue> {
        values.to_vec()
    }

    #[test]
    fn count_includes_nulls() {
        let values = cells(&[CellValue::Int(1), CellValue::Null]);
        assert_eq!(fold(AggregateKind::Count, &values).unwrap(), CellValue::Int(2));
    }

    #[test]
    fn sum_stays_integral_until_a_float_arrives() {
        let ints = cells(&[CellValue::Int(25), CellValue::Null, CellValue::Int(17)]);
        assert_eq!(fold(AggregateKind::Sum, &ints).unwrap(), CellValue::Int(42));

        let mixed = cells(&[CellValue::Int(1), CellValue::Float(0.5), "2".into()]);
        assert_eq!(fold(AggregateKind::Sum, &mixed).unwrap(), CellValue::Float(3.5));

        assert_eq!(fold(AggregateKind::Sum, &[]).unwrap(), CellValue::Null);
        assert!(fold(AggregateKind::Sum, &cells(&["many".into()])).is_err());
    }

    #[test]
    fn average_min_max() {
        let values = cells(&[CellValue::Int(10), CellValue::Int(20), CellValue::Null]);
        assert_eq!(fold(AggregateKind::Average, &values).unwrap(), CellValue::Float(15.0));
        assert_eq!(fold(AggregateKind::Min, &values).unwrap(), CellValue::Int(10));
        assert_eq!(fold(AggregateKind::Max, &values).unwrap(), CellValue::Int(20));

        let names = cells(&["beta".into(), "Alpha".into()]);
        assert_eq!(fold(AggregateKind::Min, &names).unwrap(), CellValue::from("Alpha"));
    }

    #[test]
    fn names_round_trip() {
        assert_eq!(AggregateKind::from_sql_name("avg"), Some(AggregateKind::Average));
        assert_eq!(AggregateKind::from_sql_name("median"), None);
        assert_eq!(AggregateKind::Sum.render(Some("Sales")), "SUM([Sales])");
        assert_eq!(AggregateKind::Count.render(Some("Sales")), "COUNT(*)");
    }
}
