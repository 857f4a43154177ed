use chrono::NaiveDate;

/// A value bound to one column of one row. Key values and reference matching
/// always go through the text forms below.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Double(f64),
    Text(String),
    Date(NaiveDate),
    TextArray(Vec<String>),
}

impl SqlValue {
    /// Text rendering used for key lookups and reference matching. Null has
    /// no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Int(v) => Some(v.to_string()),
            SqlValue::Double(v) => Some(v.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Date(d) => Some(format_service_date(*d)),
            SqlValue::TextArray(items) => Some(items.join(",")),
        }
    }
}

// GTFS service dates are compact YYYYMMDD strings.
pub fn parse_service_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|e| format!("bad service date {s}: {e}"))
}

pub fn format_service_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parses HH:MM:SS into seconds from midnight. Hours may exceed 23 because
/// service past midnight is expressed as 24:xx:xx and later.
pub fn parse_time_of_day(s: &str) -> Result<i64, String> {
    let mut parts = s.split(':');
    let (Some(h), Some(m), Some(sec), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("bad time of day {s}: expected HH:MM:SS"));
    };
    let hours: i64 = h
        .parse()
        .map_err(|_| format!("bad hours in time of day {s}"))?;
    let minutes: i64 = m
        .parse()
        .map_err(|_| format!("bad minutes in time of day {s}"))?;
    let seconds: i64 = sec
        .parse()
        .map_err(|_| format!("bad seconds in time of day {s}"))?;
    if hours < 0 || minutes < 0 || minutes > 59 || seconds < 0 || seconds > 59 {
        return Err(format!("time of day {s} out of range"));
    }
    hours
        .checked_mul(3600)
        .and_then(|total| total.checked_add(minutes * 60 + seconds))
        .ok_or_else(|| format!("time of day {s} out of range"))
}

pub fn format_time_of_day(seconds: i64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}
