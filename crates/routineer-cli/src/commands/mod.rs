pub mod board;
pub mod exec;
pub mod routine;
pub mod summary;

use chrono::NaiveDate;

/// Parse a `YYYY-MM-DD` argument, defaulting to today's date.
pub fn parse_date_or_today(raw: Option<&str>) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match raw {
        Some(raw) => Ok(raw.parse::<NaiveDate>()?),
        None => Ok(chrono::Utc::now().date_naive()),
    }
}
