use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];

/// Parse the textual date forms spreadsheets and CSV exports commonly use.
///
/// Dates without a time component resolve to midnight.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(text, format) {
            return Some(value);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(value) = NaiveDate::parse_from_str(text, format) {
            return Some(value.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Convert an Excel serial date (days since 1899-12-30, fractional part is
/// the time of day) into a timestamp.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let millis = (serial * 86_400_000.0).round();
    if millis >= i64::MAX as f64 {
        return None;
    }
    epoch.checked_add_signed(Duration::try_milliseconds(millis as i64)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_and_us_dates() {
        let expected = NaiveDate::from_ymd_opt(2008, 10, 9)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(parse_datetime("2008-10-09"), Some(expected));
        assert_eq!(parse_datetime("10/9/2008"), Some(expected));
        assert_eq!(parse_datetime(" 2008-10-09 00:00:00 "), Some(expected));
        assert_eq!(parse_datetime("not a date"), None);
    }

    #[test]
    fn converts_excel_serials() {
        let value = excel_serial_to_datetime(39730.5).unwrap();
        assert_eq!(value.to_string(), "2008-10-09 12:00:00");
        assert!(excel_serial_to_datetime(-1.0).is_none());
        assert!(excel_serial_to_datetime(1e300).is_none());
    }
}
