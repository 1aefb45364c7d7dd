use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Days since 0001-01-01 (proleptic Gregorian day 1), as a float day coordinate
pub fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn datetime_day_number(dt: NaiveDateTime) -> f64 {
    day_number(dt.date()) + dt.num_seconds_from_midnight() as f64 / 86400.0
}

/// Parse a CF time `units` string such as `"hours since 1979-01-01 00:00:00"`.
///
/// Returns the length of one unit in days and the day number of the reference time.
pub fn parse_time_units(units: &str) -> Result<(f64, f64), String> {
    let (unit, reference) = units
        .split_once(" since ")
        .ok_or_else(|| format!("not a time unit: {:?}", units))?;
    let days_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "days" | "day" | "d" => 1.0,
        "hours" | "hour" | "h" => 1.0 / 24.0,
        "minutes" | "minute" | "min" => 1.0 / 1440.0,
        "seconds" | "second" | "s" => 1.0 / 86400.0,
        other => return Err(format!("unsupported time unit {:?}", other)),
    };

    let reference = reference.trim().trim_end_matches('Z').replace('T', " ");
    let mut parts = reference.split_whitespace();
    let date = parts
        .next()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .ok_or_else(|| format!("bad reference date in {:?}", units))?;
    let time = match parts.next() {
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
            .map_err(|_| format!("bad reference time in {:?}", units))?,
        None => NaiveTime::default(),
    };
    Ok((days_per_unit, datetime_day_number(date.and_time(time))))
}

/// Convert raw time values in `units` to day numbers
pub fn decode_times(values: &[f64], units: &str) -> Result<Vec<f64>, String> {
    let (scale, reference) = parse_time_units(units)?;
    Ok(values.iter().map(|v| reference + v * scale).collect())
}

/// Valid-time window covered by a set of initialisations and a lead window.
///
/// Returns `[earliest init + first lead, latest init + last lead]` as day numbers.
pub fn valid_time_window(init_times: &[NaiveDate], lead_window: [f64; 2]) -> Option<[f64; 2]> {
    let first = init_times.iter().min()?;
    let last = init_times.iter().max()?;
    Some([day_number(*first) + lead_window[0], day_number(*last) + lead_window[1]])
}

/// Convert absolute day numbers to leads from the initialisation day `init_day`
pub fn to_lead_axis(times: &[f64], init_day: f64) -> Vec<f64> {
    times.iter().map(|t| t - init_day).collect()
}
