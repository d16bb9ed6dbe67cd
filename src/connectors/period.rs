//! Period-string reconciliation.
//!
//! Every source encodes sub-annual periods differently; all of them must land
//! on `YYYY-MM-01` (month-start convention for non-daily granularities).
//! Unrecognized encodings yield `None` and the caller drops that point.

/// Map a quarter digit to the first month of the quarter.
fn quarter_month(quarter: char) -> Option<&'static str> {
    match quarter {
        '1' => Some("01"),
        '2' => Some("04"),
        '3' => Some("07"),
        '4' => Some("10"),
        _ => None,
    }
}

fn valid_year(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

fn valid_month(s: &str) -> bool {
    s.len() == 2
        && s.bytes().all(|b| b.is_ascii_digit())
        && matches!(s.parse::<u32>(), Ok(1..=12))
}

/// Parse the calendar-period forms shared by ECB, DBnomics and OECD:
///
/// - `2024-01`  -> `2024-01-01` (monthly)
/// - `2024-Q1`  -> `2024-01-01` (quarterly; Q1/Q2/Q3/Q4 -> 01/04/07/10)
/// - `2024`     -> `2024-01-01` (annual)
/// - `2024-05-17` passes through unchanged (already a full date)
pub fn parse_calendar_period(period: &str) -> Option<String> {
    if let Some((year, quarter)) = period.split_once("-Q") {
        if !valid_year(year) || quarter.len() != 1 {
            return None;
        }
        let month = quarter_month(quarter.chars().next()?)?;
        return Some(format!("{year}-{month}-01"));
    }

    if period.len() == 7 && &period[4..5] == "-" {
        let (year, month) = (&period[..4], &period[5..7]);
        if valid_year(year) && valid_month(month) {
            return Some(format!("{period}-01"));
        }
        return None;
    }

    if valid_year(period) {
        return Some(format!("{period}-01-01"));
    }

    // Full YYYY-MM-DD date: pass through.
    if period.len() == 10
        && &period[4..5] == "-"
        && &period[7..8] == "-"
        && valid_year(&period[..4])
        && valid_month(&period[5..7])
    {
        return Some(period.to_string());
    }

    None
}

/// Parse e-Stat Dashboard period codes:
///
/// - `202411M00` -> `2024-11-01` (monthly, explicit month)
/// - `20243Q00`  -> `2024-07-01` (quarterly)
/// - `2024CY00`  -> `2024-01-01` (calendar year)
/// - `2024FY00`  -> `2024-04-01` (Japanese fiscal year, starts April)
pub fn parse_estat_period(period: &str) -> Option<String> {
    if period.len() < 6 {
        return None;
    }
    let year = &period[..4];
    if !valid_year(year) {
        return None;
    }

    if period.contains('M') {
        let month = &period[4..6];
        if !valid_month(month) {
            return None;
        }
        return Some(format!("{year}-{month}-01"));
    }

    if period.contains('Q') {
        let month = quarter_month(period.as_bytes()[4] as char)?;
        return Some(format!("{year}-{month}-01"));
    }

    if period.contains("CY") {
        return Some(format!("{year}-01-01"));
    }

    if period.contains("FY") {
        return Some(format!("{year}-04-01"));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_monthly() {
        assert_eq!(
            parse_calendar_period("2024-01").as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(
            parse_calendar_period("2024-12").as_deref(),
            Some("2024-12-01")
        );
    }

    #[test]
    fn calendar_quarterly() {
        assert_eq!(
            parse_calendar_period("2024-Q1").as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(
            parse_calendar_period("2024-Q2").as_deref(),
            Some("2024-04-01")
        );
        assert_eq!(
            parse_calendar_period("2024-Q3").as_deref(),
            Some("2024-07-01")
        );
        assert_eq!(
            parse_calendar_period("2024-Q4").as_deref(),
            Some("2024-10-01")
        );
    }

    #[test]
    fn calendar_annual_and_full_date() {
        assert_eq!(parse_calendar_period("2024").as_deref(), Some("2024-01-01"));
        assert_eq!(
            parse_calendar_period("2024-05-17").as_deref(),
            Some("2024-05-17")
        );
    }

    #[test]
    fn calendar_rejects_garbage() {
        assert_eq!(parse_calendar_period(""), None);
        assert_eq!(parse_calendar_period("2024-Q5"), None);
        assert_eq!(parse_calendar_period("24-01"), None);
        assert_eq!(parse_calendar_period("2024-13"), None);
        assert_eq!(parse_calendar_period("abcd"), None);
    }

    #[test]
    fn estat_monthly() {
        assert_eq!(
            parse_estat_period("202411M00").as_deref(),
            Some("2024-11-01")
        );
        assert_eq!(
            parse_estat_period("202401M00").as_deref(),
            Some("2024-01-01")
        );
    }

    #[test]
    fn estat_quarterly() {
        assert_eq!(parse_estat_period("20241Q00").as_deref(), Some("2024-01-01"));
        assert_eq!(parse_estat_period("20243Q00").as_deref(), Some("2024-07-01"));
        assert_eq!(parse_estat_period("20244Q00").as_deref(), Some("2024-10-01"));
    }

    #[test]
    fn estat_calendar_and_fiscal_year() {
        assert_eq!(parse_estat_period("2024CY00").as_deref(), Some("2024-01-01"));
        // Japanese fiscal year starts in April.
        assert_eq!(parse_estat_period("2024FY00").as_deref(), Some("2024-04-01"));
    }

    #[test]
    fn estat_rejects_garbage() {
        assert_eq!(parse_estat_period(""), None);
        assert_eq!(parse_estat_period("2024"), None);
        assert_eq!(parse_estat_period("abcd1Q00"), None);
        assert_eq!(parse_estat_period("202413M00"), None);
        assert_eq!(parse_estat_period("20249Q00"), None);
    }
}
