use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::dates::parse_datetime;

/// A single worksheet cell, query parameter or scalar result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDateTime),
}

macro_rules! impl_from_for_cell {
    ($variant:ident, $($t:ty),*) => {
        $(
            impl From<$t> for CellValue {
                fn from(v: $t) -> Self {
                    CellValue::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_cell!(Int, i8, i16, i32, i64, u8, u16, u32);
impl_from_for_cell!(Float, f32, f64);
impl_from_for_cell!(Bool, bool);
impl_from_for_cell!(Text, String, &str);
impl_from_for_cell!(Date, NaiveDateTime);

impl From<NaiveDate> for CellValue {
    fn from(v: NaiveDate) -> Self {
        CellValue::Date(v.and_time(NaiveTime::MIN))
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Null, Into::into)
    }
}

impl CellValue {
    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "bool",
            CellValue::Int(_) => "integer",
            CellValue::Float(_) => "float",
            CellValue::Text(_) => "text",
            CellValue::Date(_) => "date",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// `true` for nulls and for text that is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value. Text is parsed; booleans are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Infer a typed value from raw delimited text.
    ///
    /// Empty text is null; integers, decimals, booleans and recognised date
    /// forms are typed; anything else stays text.
    pub fn infer(text: &str) -> CellValue {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return CellValue::Int(v);
        }
        if looks_decimal(trimmed) {
            if let Ok(v) = trimmed.parse::<f64>() {
                return CellValue::Float(v);
            }
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        if let Some(date) = parse_datetime(trimmed) {
            return CellValue::Date(date);
        }
        CellValue::Text(text.to_string())
    }

    /// Compare two cells the way the spreadsheet driver does.
    ///
    /// Numbers compare numerically across integer/float, text compares
    /// case-insensitively, and mixed text/number or text/date pairs are
    /// compared after parsing the text side. Nulls and incompatible pairs are
    /// unordered.
    pub fn compare(&self, other: &CellValue) -> Option<Ordering> {
        use CellValue::*;
        match (self, other) {
            (Null, _) | (_, Null) => None,
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Text(a), Text(b)) => Some(compare_text(a, b)),
            (Date(a), Text(b)) => parse_datetime(b).map(|b| a.cmp(&b)),
            (Text(a), Date(b)) => parse_datetime(a).map(|a| a.cmp(b)),
            (Bool(a), Int(b)) => Some((*a as i64).cmp(b)),
            (Int(a), Bool(b)) => Some(a.cmp(&(*b as i64))),
            (Bool(_), _) | (_, Bool(_)) | (Date(_), _) | (_, Date(_)) => None,
            (a, b) => {
                let a = a.as_f64()?;
                let b = b.as_f64()?;
                a.partial_cmp(&b)
            }
        }
    }

    /// Equality under [`CellValue::compare`] semantics.
    pub fn loosely_equals(&self, other: &CellValue) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

fn looks_decimal(text: &str) -> bool {
    let mut digits = 0usize;
    for (idx, ch) in text.chars().enumerate() {
        match ch {
            '0'..='9' => digits += 1,
            '-' | '+' if idx == 0 => {}
            '.' | 'e' | 'E' | '-' | '+' => {}
            _ => return false,
        }
    }
    digits > 0
}

fn compare_text(a: &str, b: &str) -> Ordering {
    let lhs = a.chars().flat_map(char::to_lowercase);
    let rhs = b.chars().flat_map(char::to_lowercase);
    lhs.cmp(rhs)
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("NULL"),
            CellValue::Bool(v) => write!(f, "{v}"),
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(v) => f.write_str(v),
            CellValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_types_from_text() {
        assert_eq!(CellValue::infer(""), CellValue::Null);
        assert_eq!(CellValue::infer("25"), CellValue::Int(25));
        assert_eq!(CellValue::infer("2.5"), CellValue::Float(2.5));
        assert_eq!(CellValue::infer("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::infer("Paul"), CellValue::Text("Paul".into()));
        assert!(matches!(CellValue::infer("2008-10-09"), CellValue::Date(_)));
        assert_eq!(CellValue::infer("1-800-FLOWERS"), CellValue::Text("1-800-FLOWERS".into()));
    }

    #[test]
    fn compare_mixes_numeric_kinds() {
        assert_eq!(
            CellValue::Int(25).compare(&CellValue::Float(25.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            CellValue::Text("300".into()).compare(&CellValue::Int(25)),
            Some(Ordering::Greater)
        );
        assert_eq!(CellValue::Null.compare(&CellValue::Null), None);
        assert!(CellValue::Text("paul".into()).loosely_equals(&CellValue::Text("Paul".into())));
    }

    #[test]
    fn display_is_stable() {
        let date = NaiveDate::from_ymd_opt(2008, 10, 9).unwrap();
        assert_eq!(CellValue::from(date).to_string(), "2008-10-09 00:00:00");
        assert_eq!(CellValue::Null.to_string(), "NULL");
        assert_eq!(CellValue::from(Some(7)).to_string(), "7");
        assert_eq!(CellValue::from(None::<i32>), CellValue::Null);
    }
}
