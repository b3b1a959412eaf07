use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Parse a `--date` value. Accepts RFC 3339, `YYYY-MM-DD HH:MM` (UTC) and
/// `YYYY-MM-DD` (noon UTC).
pub fn parse_when(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(ndt.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).ok_or_else(|| anyhow!("invalid noon"))?;
        return Ok(date.and_time(noon).and_utc());
    }

    Err(anyhow!(
        "Could not parse date '{input}'.\n\
         Hint: use YYYY-MM-DD, \"YYYY-MM-DD HH:MM\" (UTC) or RFC 3339."
    ))
}
