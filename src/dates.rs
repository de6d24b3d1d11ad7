//! Period-end dates for SDMX `TIME_PERIOD` values.

use chrono::{NaiveDate, Weekday};

use crate::model::{DataTable, TIME_PERIOD};

/// Dimensions that carry the frequency code, in lookup order.
const FREQUENCY_COLUMNS: [&str; 2] = ["FREQUENCY", "FREQ"];

/// Maps a `TIME_PERIOD` to the last calendar day of the period.
///
/// `frequency` is the SDMX frequency code (`A`, `S`, `Q`, `M`, `W`, `D`, `B`).
/// Without one, or for codes not listed, the period format decides.
///
/// ```
/// use chrono::NaiveDate;
/// use imfdata::period_end;
///
/// assert_eq!(period_end("2024", Some("A")), NaiveDate::from_ymd_opt(2024, 12, 31));
/// assert_eq!(period_end("2024-Q1", Some("Q")), NaiveDate::from_ymd_opt(2024, 3, 31));
/// assert_eq!(period_end("2025-08-19", Some("D")), NaiveDate::from_ymd_opt(2025, 8, 19));
/// ```
pub fn period_end(period: &str, frequency: Option<&str>) -> Option<NaiveDate> {
    let period = period.trim();
    match frequency.map(str::trim) {
        Some("A") => annual(period),
        Some("S") => semester(period),
        Some("Q") => quarter(period),
        Some("M") => month(period),
        Some("W") => week(period),
        Some("D") | Some("B") => day(period),
        _ => detect(period),
    }
}

fn detect(period: &str) -> Option<NaiveDate> {
    if period.contains("-M") {
        month(period)
    } else if period.contains("-Q") {
        quarter(period)
    } else if period.contains("-S") {
        semester(period)
    } else if period.contains("-W") {
        week(period)
    } else if period.len() == 4 {
        annual(period)
    } else if period.len() == 7 {
        month(period)
    } else {
        day(period)
    }
}

fn year(s: &str) -> Option<i32> {
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Splits `YYYY-<tag><n>` and returns the year and `n`.
fn tagged(period: &str, tag: char) -> Option<(i32, u32)> {
    let (y, rest) = period.split_once('-')?;
    let n = rest.strip_prefix(tag)?;
    if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((year(y)?, n.parse().ok()?))
}

fn annual(period: &str) -> Option<NaiveDate> {
    // Annual series sometimes come as `2024-A1`.
    let y = period.strip_suffix("-A1").unwrap_or(period);
    NaiveDate::from_ymd_opt(year(y)?, 12, 31)
}

fn semester(period: &str) -> Option<NaiveDate> {
    let (y, s) = tagged(period, 'S')?;
    match s {
        1 => NaiveDate::from_ymd_opt(y, 6, 30),
        2 => NaiveDate::from_ymd_opt(y, 12, 31),
        _ => None,
    }
}

fn quarter(period: &str) -> Option<NaiveDate> {
    let (y, q) = tagged(period, 'Q')?;
    if !(1..=4).contains(&q) {
        return None;
    }
    month_end(y, q * 3)
}

fn month(period: &str) -> Option<NaiveDate> {
    let (y, m) = tagged(period, 'M').or_else(|| {
        let (y, m) = period.split_once('-')?;
        if m.len() != 2 || !m.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some((year(y)?, m.parse().ok()?))
    })?;
    month_end(y, m)
}

fn week(period: &str) -> Option<NaiveDate> {
    let (y, w) = tagged(period, 'W')?;
    NaiveDate::from_isoywd_opt(y, w, Weekday::Sun)
}

fn day(period: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(period, "%Y-%m-%d").ok()
}

fn month_end(y: i32, m: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&m) {
        return None;
    }
    let next = if m == 12 {
        NaiveDate::from_ymd_opt(y + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(y, m + 1, 1)?
    };
    next.pred_opt()
}

/// Fills `date` on every row and appends the `date` column.
///
/// Rows whose period cannot be interpreted keep `date = None`.
pub(crate) fn convert_time_periods(table: &mut DataTable) {
    let mut unparsed = 0usize;
    for row in table.rows_mut() {
        let freq = FREQUENCY_COLUMNS
            .iter()
            .find_map(|c| row.dimension(c))
            .map(str::to_string);
        row.date = row
            .time_period()
            .and_then(|p| period_end(p, freq.as_deref()));
        if row.date.is_none() {
            unparsed += 1;
        }
    }
    if unparsed > 0 {
        log::warn!("{unparsed} {TIME_PERIOD} value(s) could not be converted to dates");
    }
    table.push_column("date");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Observation;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[rstest]
    #[case::annual("2024", Some("A"), ymd(2024, 12, 31))]
    #[case::annual_tagged("2024-A1", Some("A"), ymd(2024, 12, 31))]
    #[case::daily("2025-08-19", Some("D"), ymd(2025, 8, 19))]
    #[case::business_daily("2025-08-19", Some("B"), ymd(2025, 8, 19))]
    #[case::quarter_two("1960-Q2", Some("Q"), ymd(1960, 6, 30))]
    #[case::quarter_four("2023-Q4", Some("Q"), ymd(2023, 12, 31))]
    #[case::month_sdmx("1960-M04", Some("M"), ymd(1960, 4, 30))]
    #[case::month_iso("2024-02", Some("M"), ymd(2024, 2, 29))]
    #[case::month_non_leap("2023-M02", Some("M"), ymd(2023, 2, 28))]
    #[case::semester("2022-S1", Some("S"), ymd(2022, 6, 30))]
    #[case::week("2024-W01", Some("W"), ymd(2024, 1, 7))]
    #[case::detect_month("2020-M12", None, ymd(2020, 12, 31))]
    #[case::detect_quarter("2020-Q1", None, ymd(2020, 3, 31))]
    #[case::detect_year("1999", None, ymd(1999, 12, 31))]
    #[case::detect_day("2001-01-31", None, ymd(2001, 1, 31))]
    #[case::unknown_frequency_detects("2020-Q3", Some("Z"), ymd(2020, 9, 30))]
    fn converts_periods(
        #[case] period: &str,
        #[case] freq: Option<&str>,
        #[case] expected: Option<NaiveDate>,
    ) {
        assert_eq!(period_end(period, freq), expected);
    }

    fn row(freq: Option<(&str, &str)>, period: &str) -> Observation {
        let mut dimensions: Vec<(String, String)> = freq
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .into_iter()
            .collect();
        dimensions.push((TIME_PERIOD.to_string(), period.to_string()));
        Observation {
            dimensions,
            value: Some(1.0),
            attributes: Vec::new(),
            date: None,
        }
    }

    #[test]
    fn frequency_column_selects_the_rule() {
        let mut table = DataTable::new(
            vec!["FREQ".into(), TIME_PERIOD.into(), "value".into()],
            vec![
                // `-A1` is only understood through the annual rule.
                row(Some(("FREQ", "A")), "2024-A1"),
                row(None, "2024-A1"),
                row(Some(("FREQUENCY", "Q")), "2024-Q2"),
                // Frequency wins over the period's shape.
                row(Some(("FREQ", "M")), "2024-Q2"),
            ],
        );
        convert_time_periods(&mut table);
        convert_time_periods(&mut table);

        let dates: Vec<Option<NaiveDate>> = table.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![ymd(2024, 12, 31), None, ymd(2024, 6, 30), None]);
        assert_eq!(table.columns().iter().filter(|c| *c == "date").count(), 1);
        assert_eq!(table.column("date").unwrap()[0].as_deref(), Some("2024-12-31"));
    }

    #[rstest]
    #[case("2020-Q5", Some("Q"))]
    #[case("2020-M13", Some("M"))]
    #[case("20X0", Some("A"))]
    #[case("2020-S3", None)]
    #[case("not a period", None)]
    #[case("2020", Some("M"))]
    fn rejects_invalid_periods(#[case] period: &str, #[case] freq: Option<&str>) {
        assert_eq!(period_end(period, freq), None);
    }
}
