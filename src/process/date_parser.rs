use chrono::NaiveDate;

const YEAR_FIRST: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const MONTH_FIRST: &[&str] = &["%m/%d/%Y", "%m-%d-%Y"];
const MONTH_FIRST_SHORT_YEAR: &[&str] = &["%m/%d/%y", "%m-%d-%y"];

/// Parse a ship date cell into a calendar date.
///
/// Exports carry either a bare date or a date followed by a time part
/// (`"2024-03-01 08:15:00"`, `"3/1/2024 8:15 AM"`, `"2024-03-01T08:15:00Z"`);
/// only the leading date token is considered.
pub fn parse_ship_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let token = s
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(s);

    // chrono's %Y accepts any digit count, so pick the layout from the shape
    // of the token rather than trying every format in turn.
    let segments: Vec<&str> = token.split(|c: char| c == '-' || c == '/').collect();
    if segments.len() != 3 {
        return None;
    }
    let formats = if segments[0].len() == 4 {
        YEAR_FIRST
    } else if segments[2].len() == 2 {
        MONTH_FIRST_SHORT_YEAR
    } else {
        MONTH_FIRST
    };

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_ship_date_formats() {
        assert_eq!(parse_ship_date("2024-03-01"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_ship_date("2024/03/01"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_ship_date("3/1/2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_ship_date("03-01-2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_ship_date("3/1/24"), Some(ymd(2024, 3, 1)));
    }

    #[test]
    fn test_parse_ship_date_with_time() {
        assert_eq!(
            parse_ship_date("2024-03-01 08:15:00"),
            Some(ymd(2024, 3, 1))
        );
        assert_eq!(parse_ship_date("3/1/2024 8:15 AM"), Some(ymd(2024, 3, 1)));
        assert_eq!(
            parse_ship_date("2024-03-01T08:15:00Z"),
            Some(ymd(2024, 3, 1))
        );
    }

    #[test]
    fn test_parse_ship_date_rejects_garbage() {
        assert_eq!(parse_ship_date(""), None);
        assert_eq!(parse_ship_date("next tuesday"), None);
        assert_eq!(parse_ship_date("2024-13-40"), None);
    }
}
