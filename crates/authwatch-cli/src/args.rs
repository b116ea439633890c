//! Custom value parsers for CLI arguments.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a key=value pair
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid key=value pair: {s}"))?;
    if key.is_empty() {
        return Err(format!("Empty key in: {s}"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse an RFC 3339 timestamp, `YYYY-MM-DD HH:MM:SS` (UTC) or `YYYY-MM-DD`
/// (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("Invalid timestamp: {s} (expected RFC 3339 or YYYY-MM-DD)"))
}

/// Parse a positive number of hours.
pub fn parse_hours(s: &str) -> Result<u32, String> {
    match s.trim().parse::<u32>() {
        Ok(0) => Err("Hours must be at least 1".to_string()),
        Ok(h) if h > 24 * 366 => Err(format!("Hours must be at most {}", 24 * 366)),
        Ok(h) => Ok(h),
        Err(_) => Err(format!("Invalid number of hours: {s}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("reason=bad password").unwrap(),
            ("reason".to_string(), "bad password".to_string())
        );
        assert_eq!(parse_key_value("k=a=b").unwrap().1, "a=b");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 3, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-06-03T10:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-06-03T12:30:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-06-03 10:30:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-06-03").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_hours("24").unwrap(), 24);
        assert!(parse_hours("0").is_err());
        assert!(parse_hours("-1").is_err());
        assert!(parse_hours("999999").is_err());
    }
}
