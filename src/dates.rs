use time::{macros::format_description, Date};

// `YYYY-MM-DD` on the wire, for both birth dates and session dates.
time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(raw: &str) -> Option<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_calendar_dates() {
        assert_eq!(parse_iso_date("1990-05-17"), Some(date!(1990 - 05 - 17)));
        assert_eq!(parse_iso_date("2024-02-29"), Some(date!(2024 - 02 - 29)));
    }

    #[test]
    fn rejects_other_shapes() {
        assert_eq!(parse_iso_date("17/05/1990"), None);
        assert_eq!(parse_iso_date("2023-02-29"), None);
        assert_eq!(parse_iso_date("1990-13-01"), None);
        assert_eq!(parse_iso_date(""), None);
    }
}
