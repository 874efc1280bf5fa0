//! CF-convention time axes: `"<unit> since <reference date>"`

use crate::errors::{OceanPostError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use std::str::FromStr;

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const MS_PER_DAY: i64 = 86_400_000;

/// First day-of-year of each month in a 365 day year
const NOLEAP_MONTH_START: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Calendar named by the `calendar` attribute of a CF time coordinate
///
/// Only calendars whose dates all exist in the proleptic Gregorian calendar
/// can be decoded into [`NaiveDateTime`]. `all_leap`, `360_day` and `julian`
/// axes are rejected instead of being decoded onto the wrong dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CfCalendar {
    #[default]
    ProlepticGregorian,
    NoLeap,
}

impl FromStr for CfCalendar {
    type Err = OceanPostError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" => Ok(CfCalendar::ProlepticGregorian),
            "noleap" | "no_leap" | "365_day" => Ok(CfCalendar::NoLeap),
            other => Err(OceanPostError::TimeDecodeError(format!(
                "unsupported calendar '{other}', expected one of standard, gregorian, \
                 proleptic_gregorian, noleap, 365_day"
            ))),
        }
    }
}

/// Parsed `units` attribute of a CF time coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    /// Seconds per unit step
    pub seconds_per_unit: f64,
    /// Reference instant that value zero maps to
    pub reference: NaiveDateTime,
    pub calendar: CfCalendar,
}

impl CfTimeUnits {
    /// Parse `units` on the proleptic Gregorian calendar
    pub fn parse(units: &str) -> Result<Self> {
        Self::parse_with_calendar(units, None)
    }

    /// Parse `units` together with an optional `calendar` attribute
    pub fn parse_with_calendar(units: &str, calendar: Option<&str>) -> Result<Self> {
        let calendar = calendar.map(CfCalendar::from_str).transpose()?.unwrap_or_default();
        let (unit, reference) = units.trim().split_once(" since ").ok_or_else(|| {
            OceanPostError::TimeDecodeError(format!("expected '<unit> since <date>', got '{units}'"))
        })?;

        let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
            "days" | "day" | "d" => 86_400.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            other => {
                return Err(OceanPostError::TimeDecodeError(format!(
                    "unsupported time unit '{other}'"
                )))
            }
        };

        let reference = parse_reference(reference.trim())?;
        if calendar == CfCalendar::NoLeap && reference.month() == 2 && reference.day() == 29 {
            return Err(OceanPostError::TimeDecodeError(format!(
                "reference date {reference} does not exist in the noleap calendar"
            )));
        }

        Ok(Self {
            seconds_per_unit,
            reference,
            calendar,
        })
    }

    /// Instant corresponding to `value` units after the reference
    pub fn decode(&self, value: f64) -> Result<NaiveDateTime> {
        if !value.is_finite() {
            return Err(OceanPostError::TimeDecodeError(format!(
                "cannot decode non-finite time value {value}"
            )));
        }
        let millis = (value * self.seconds_per_unit * 1000.0).round() as i64;
        let decoded = match self.calendar {
            CfCalendar::ProlepticGregorian => TimeDelta::try_milliseconds(millis)
                .and_then(|delta| self.reference.checked_add_signed(delta)),
            CfCalendar::NoLeap => add_noleap(self.reference, millis),
        };
        decoded.ok_or_else(|| {
            OceanPostError::TimeDecodeError(format!("time value {value} is out of range"))
        })
    }
}

/// `reference + millis` counting every year as 365 days
fn add_noleap(reference: NaiveDateTime, millis: i64) -> Option<NaiveDateTime> {
    let time = reference.time();
    let ms_of_day = i64::from(time.num_seconds_from_midnight()) * 1000
        + i64::from(time.nanosecond() / 1_000_000);
    let total = millis.checked_add(ms_of_day)?;

    let doy = NOLEAP_MONTH_START[reference.month0() as usize] + i64::from(reference.day0());
    let days = doy.checked_add(total.div_euclid(MS_PER_DAY))?;
    let year = i32::try_from(i64::from(reference.year()) + days.div_euclid(365)).ok()?;
    let doy = days.rem_euclid(365);

    let month0 = NOLEAP_MONTH_START.iter().rposition(|&start| start <= doy)?;
    let day = doy - NOLEAP_MONTH_START[month0] + 1;
    let date = NaiveDate::from_ymd_opt(year, month0 as u32 + 1, day as u32)?;

    let ms = total.rem_euclid(MS_PER_DAY);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        (ms / 1000) as u32,
        (ms % 1000) as u32 * 1_000_000,
    )?;
    Some(date.and_time(time))
}

fn parse_reference(text: &str) -> Result<NaiveDateTime> {
    // Trailing time zone markers such as "UTC" or "Z" are ignored
    let text = text
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| OceanPostError::TimeDecodeError(format!("invalid reference date '{text}'")))
}

/// Decode numeric CF time values into datetimes
///
/// `calendar` is the coordinate's `calendar` attribute; `None` means
/// proleptic Gregorian.
pub fn decode_cf_times(
    values: &[f64],
    units: &str,
    calendar: Option<&str>,
) -> Result<Vec<NaiveDateTime>> {
    let units = CfTimeUnits::parse_with_calendar(units, calendar)?;
    values.iter().map(|&v| units.decode(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_days_since_reference() -> Result<()> {
        let times = decode_cf_times(&[0.0, 31.5, 365.0], "days since 2001-01-01 00:00:00", None)?;
        assert_eq!(times[0].year(), 2001);
        assert_eq!(times[1].month(), 2);
        assert_eq!(times[1].hour(), 12);
        assert_eq!(times[2].year(), 2002);
        Ok(())
    }

    #[test]
    fn accepts_date_only_references_and_hours() -> Result<()> {
        let units = CfTimeUnits::parse("hours since 1990-06-01")?;
        assert_eq!(units.seconds_per_unit, 3600.0);
        assert_eq!(units.decode(24.0)?.day(), 2);
        Ok(())
    }

    #[test]
    fn rejects_unknown_units() {
        assert!(CfTimeUnits::parse("fortnights since 2000-01-01").is_err());
        assert!(CfTimeUnits::parse("days").is_err());
    }

    #[test]
    fn noleap_years_have_365_days() -> Result<()> {
        let units = CfTimeUnits::parse_with_calendar("days since 2000-01-01", Some("noleap"))?;
        assert_eq!(units.decode(1460.0)?, NaiveDate::from_ymd_opt(2004, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        // day 59 is 1 March, there is no 29 February
        let march = units.decode(59.0)?;
        assert_eq!((march.month(), march.day()), (3, 1));
        let before = units.decode(-0.5)?;
        assert_eq!((before.year(), before.month(), before.day(), before.hour()), (1999, 12, 31, 12));

        let gregorian = CfTimeUnits::parse_with_calendar("days since 2000-01-01", Some("standard"))?;
        assert_eq!(gregorian.decode(1460.0)?.year(), 2003);
        Ok(())
    }

    #[test]
    fn rejects_calendars_without_gregorian_dates() {
        for name in ["360_day", "all_leap", "366_day", "julian"] {
            assert!(CfTimeUnits::parse_with_calendar("days since 2000-01-01", Some(name)).is_err());
        }
        assert!(CfTimeUnits::parse_with_calendar("days since 2000-02-29", Some("noleap")).is_err());
    }
}
