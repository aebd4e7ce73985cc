//! Conversion of cells into native field types.

use chrono::{NaiveDate, NaiveDateTime};

use crate::cell::CellValue;
use crate::dates::{excel_serial_to_datetime, parse_datetime};

/// Error converting a [`CellValue`] into a concrete native type.
#[derive(Debug, Clone, PartialEq)]
pub enum CellCastError {
    /// The cell holds a kind of value the target type cannot represent.
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    /// Text that does not parse as the target type.
    Unparsable { expected: &'static str, text: String },
    /// Numeric value does not fit in the destination type.
    OutOfRange { target: &'static str, value: String },
}

impl std::fmt::Display for CellCastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellCastError::TypeMismatch { expected, got } => {
                write!(f, "expected {}, got {}", expected, got)
            }
            CellCastError::Unparsable { expected, text } => {
                write!(f, "'{}' is not a valid {}", text, expected)
            }
            CellCastError::OutOfRange { target, value } => {
                write!(f, "value {} out of range for {}", value, target)
            }
        }
    }
}

impl std::error::Error for CellCastError {}

/// Types a record field can be populated from.
pub trait FromCell: Sized {
    /// Name reported in conversion errors.
    const TYPE_NAME: &'static str;

    fn from_cell(value: &CellValue) -> Result<Self, CellCastError>;
}

impl FromCell for CellValue {
    const TYPE_NAME: &'static str = "cell";

    fn from_cell(value: &CellValue) -> Result<Self, CellCastError> {
        Ok(value.clone())
    }
}

impl FromCell for String {
    const TYPE_NAME: &'static str = "String";

    fn from_cell(value: &CellValue) -> Result<Self, CellCastError> {
        match value {
            CellValue::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }
}

impl FromCell for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_cell(value: &CellValue) -> Result<Self, CellCastError> {
        match value {
            CellValue::Bool(v) => Ok(*v),
            CellValue::Int(v) => Ok(*v != 0),
            CellValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(CellCastError::Unparsable {
                    expected: Self::TYPE_NAME,
                    text: s.clone(),
                }),
            },
            other => Err(CellCastError::TypeMismatch {
                expected: Self::TYPE_NAME,
                got: other.type_name(),
            }),
        }
    }
}

/// Whole floats inside the i64 range; `i64::MAX as f64` rounds up to 2^63,
/// so the upper bound is exclusive.
fn whole_f64_to_i64(v: f64) -> Option<i64> {
    let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
    (v.is_finite() && v.fract() == 0.0 && in_range).then_some(v as i64)
}

fn cell_to_i64(value: &CellValue, expected: &'static str) -> Result<i64, CellCastError> {
    match value {
        CellValue::Int(v) => Ok(*v),
        CellValue::Bool(v) => Ok(*v as i64),
        CellValue::Float(v) => whole_f64_to_i64(*v).ok_or_else(|| CellCastError::OutOfRange {
            target: expected,
            value: v.to_string(),
        }),
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if let Ok(v) = trimmed.parse::<i64>() {
                return Ok(v);
            }
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() && v.fract() == 0.0 => {
                    whole_f64_to_i64(v).ok_or_else(|| CellCastError::OutOfRange {
                        target: expected,
                        value: trimmed.to_string(),
                    })
                }
                _ => Err(CellCastError::Unparsable {
                    expected,
                    text: s.clone(),
                }),
            }
        }
        other => Err(CellCastError::TypeMismatch {
            expected,
            got: other.type_name(),
        }),
    }
}

macro_rules! impl_from_cell_for_int {
    ($($t:ty),*) => {
        $(
            impl FromCell for $t {
                const TYPE_NAME: &'static str = stringify!($t);

                fn from_cell(value: &CellValue) -> Result<Self, CellCastError> {
                    let wide = cell_to_i64(value, Self::TYPE_NAME)?;
                    <$t>::try_from(wide).map_err(|_| CellCastError::OutOfRange {
                        target: Self::TYPE_NAME,
                        value: wide.to_string(),
                    })
                }
            }
        )*
    };
}

impl_from_cell_for_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

macro_rules! impl_from_cell_for_float {
    ($($t:ty),*) => {
        $(
            impl FromCell for $t {
                const TYPE_NAME: &'static str = stringify!($t);

                fn from_cell(value: &CellValue) -> Result<Self, CellCastError> {
                    match value {
                        CellValue::Int(v) => Ok(*v as $t),
                        CellValue::Float(v) => Ok(*v as $t),
                        CellValue::Text(s) => s.trim().parse::<$t>().map_err(|_| {
                            CellCastError::Unparsable {
                                expected: Self::TYPE_NAME,
                                text: s.clone(),
                            }
                        }),
                        other => Err(CellCastError::TypeMismatch {
                            expected: Self::TYPE_NAME,
                            got: other.type_name(),
                        }),
                    }
                }
            }
        )*
    };
}

impl_from_cell_for_float!(f32, f64);

impl FromCell for NaiveDateTime {
    const TYPE_NAME: &'static str = "NaiveDateTime";

    fn from_cell(value: &CellValue) -> Result<Self, CellCastError> {
        match value {
            CellValue::Date(v) => Ok(*v),
            CellValue::Text(s) => parse_datetime(s).ok_or_else(|| CellCastError::Unparsable {
                expected: Self::TYPE_NAME,
                text: s.clone(),
            }),
            CellValue::Int(_) | CellValue::Float(_) => value
                .as_f64()
                .and_then(excel_serial_to_datetime)
                .ok_or_else(|| CellCastError::OutOfRange {
                    target: Self::TYPE_NAME,
                    value: value.to_string(),
                }),
            other => Err(CellCastError::TypeMismatch {
                expected: Self::TYPE_NAME,
                got: other.type_name(),
            }),
        }
    }
}

impl FromCell for NaiveDate {
    const TYPE_NAME: &'static str = "NaiveDate";

    fn from_cell(value: &CellValue) -> Result<Self, CellCastError> {
        NaiveDateTime::from_cell(value)
            .map(|v| v.date())
            .map_err(|err| match err {
                CellCastError::Unparsable { text, .. } => CellCastError::Unparsable {
                    expected: Self::TYPE_NAME,
                    text,
                },
                other => other,
            })
    }
}

impl<T: FromCell> FromCell for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_cell(value: &CellValue) -> Result<Self, CellCastError> {
        if value.is_blank() {
            return Ok(None);
        }
        T::from_cell(value).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_accept_integral_text_and_floats() {
        assert_eq!(i32::from_cell(&CellValue::Text(" 42 ".into())), Ok(42));
        assert_eq!(i64::from_cell(&CellValue::Float(7.0)), Ok(7));
        assert!(matches!(
            i32::from_cell(&CellValue::Float(7.5)),
            Err(CellCastError::OutOfRange { .. })
        ));
        assert!(matches!(
            u8::from_cell(&CellValue::Int(300)),
            Err(CellCastError::OutOfRange { target: "u8", .. })
        ));
        assert!(matches!(
            i64::from_cell(&CellValue::Text("many".into())),
            Err(CellCastError::Unparsable { expected: "i64", .. })
        ));
    }

    #[test]
    fn integers_reject_floats_outside_i64() {
        assert!(matches!(
            i64::from_cell(&CellValue::Float(1e20)),
            Err(CellCastError::OutOfRange { target: "i64", .. })
        ));
        assert!(matches!(
            i64::from_cell(&CellValue::Float(-1e20)),
            Err(CellCastError::OutOfRange { .. })
        ));
        assert!(matches!(
            i64::from_cell(&CellValue::Float(9_223_372_036_854_775_808.0)),
            Err(CellCastError::OutOfRange { .. })
        ));
        assert!(matches!(
            u64::from_cell(&CellValue::Text("1e20".into())),
            Err(CellCastError::OutOfRange { target: "u64", .. })
        ));
        assert_eq!(i64::from_cell(&CellValue::Float(-9.0e15)), Ok(-9_000_000_000_000_000));
        assert_eq!(i64::from_cell(&CellValue::Text("2.5e3".into())), Ok(2500));
    }

    #[test]
    fn option_maps_blank_to_none() {
        assert_eq!(Option::<i32>::from_cell(&CellValue::Null), Ok(None));
        assert_eq!(Option::<i32>::from_cell(&CellValue::Text("  ".into())), Ok(None));
        assert_eq!(Option::<i32>::from_cell(&CellValue::Int(3)), Ok(Some(3)));
    }

    #[test]
    fn dates_from_text_and_serials() {
        let expected = NaiveDate::from_ymd_opt(2008, 10, 9).unwrap();
        assert_eq!(NaiveDate::from_cell(&CellValue::Text("2008-10-09".into())), Ok(expected));
        assert_eq!(NaiveDate::from_cell(&CellValue::Int(39730)), Ok(expected));
        assert!(NaiveDate::from_cell(&CellValue::Bool(true)).is_err());
    }

    #[test]
    fn booleans_and_strings() {
        assert_eq!(bool::from_cell(&CellValue::Text("Yes".into())), Ok(true));
        assert_eq!(bool::from_cell(&CellValue::Int(0)), Ok(false));
        assert_eq!(String::from_cell(&CellValue::Int(12)), Ok("12".to_string()));
        assert_eq!(String::from_cell(&CellValue::Null), Ok(String::new()));
    }
}
