use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, Time, Weekday};

use crate::error::SchedulingError;

/// Settings key under which the tenant-wide business hours document is stored.
/// Exactly one active configuration exists per tenant.
pub const BUSINESS_HOURS_SETTING_KEY: &str = "business_hours";

/// Wire/storage form of the business hours document, as persisted in the
/// settings table. Times are "HH:MM", dates "YYYY-MM-DD", weekdays lowercase
/// English names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessHoursConfig {
    pub open_days: Vec<String>,
    pub opening_time: String,
    pub closing_time: String,
    pub slot_minutes: i64,
    #[serde(default)]
    pub holidays: Vec<HolidayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayConfig {
    pub date: String,
    pub label: String,
}

/// Parsed business hours, ready for the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessHours {
    pub open_days: HashSet<Weekday>,
    pub opening: Time,
    pub closing: Time,
    pub slot_minutes: i64,
    pub holidays: Vec<Holiday>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    pub date: Date,
    pub label: String,
}

impl Default for BusinessHours {
    /// The hardcoded fallback used when no configuration has been saved:
    /// Monday through Saturday, 08:00-20:00, 30-minute slots, no holidays.
    fn default() -> Self {
        Self {
            open_days: [
                Weekday::Monday,
                Weekday::Tuesday,
                Weekday::Wednesday,
                Weekday::Thursday,
                Weekday::Friday,
                Weekday::Saturday,
            ]
            .into_iter()
            .collect(),
            opening: time::macros::time!(8:00),
            closing: time::macros::time!(20:00),
            slot_minutes: 30,
            holidays: Vec::new(),
        }
    }
}

fn parse_weekday(name: &str) -> Result<Weekday, SchedulingError> {
    match name.to_ascii_lowercase().as_str() {
        "monday" => Ok(Weekday::Monday),
        "tuesday" => Ok(Weekday::Tuesday),
        "wednesday" => Ok(Weekday::Wednesday),
        "thursday" => Ok(Weekday::Thursday),
        "friday" => Ok(Weekday::Friday),
        "saturday" => Ok(Weekday::Saturday),
        "sunday" => Ok(Weekday::Sunday),
        other => Err(SchedulingError::InvalidConfiguration(format!(
            "unknown weekday: {other}"
        ))),
    }
}

fn parse_time_of_day(value: &str) -> Result<Time, SchedulingError> {
    let format = format_description!("[hour]:[minute]");
    Time::parse(value, &format).map_err(|e| {
        SchedulingError::InvalidConfiguration(format!("bad time of day {value:?}: {e}"))
    })
}

fn parse_date(value: &str) -> Result<Date, SchedulingError> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(value, &format)
        .map_err(|e| SchedulingError::InvalidConfiguration(format!("bad date {value:?}: {e}")))
}

impl TryFrom<BusinessHoursConfig> for BusinessHours {
    type Error = SchedulingError;

    fn try_from(config: BusinessHoursConfig) -> Result<Self, Self::Error> {
        let open_days = config
            .open_days
            .iter()
            .map(|d| parse_weekday(d))
            .collect::<Result<HashSet<_>, _>>()?;
        let opening = parse_time_of_day(&config.opening_time)?;
        let closing = parse_time_of_day(&config.closing_time)?;
        if opening >= closing {
            return Err(SchedulingError::InvalidConfiguration(format!(
                "opening time {} must be before closing time {}",
                config.opening_time, config.closing_time
            )));
        }
        if config.slot_minutes < 1 {
            return Err(SchedulingError::InvalidConfiguration(
                "slot granularity must be at least one minute".into(),
            ));
        }
        let holidays = config
            .holidays
            .into_iter()
            .map(|h| {
                Ok(Holiday {
                    date: parse_date(&h.date)?,
                    label: h.label,
                })
            })
            .collect::<Result<Vec<_>, SchedulingError>>()?;

        Ok(BusinessHours {
            open_days,
            opening,
            closing,
            slot_minutes: config.slot_minutes,
            holidays,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    fn sample_config() -> BusinessHoursConfig {
        BusinessHoursConfig {
            open_days: vec!["monday".into(), "Tuesday".into()],
            opening_time: "09:00".into(),
            closing_time: "17:30".into(),
            slot_minutes: 15,
            holidays: vec![HolidayConfig {
                date: "2025-12-25".into(),
                label: "Christmas".into(),
            }],
        }
    }

    #[test]
    fn parses_stored_document() {
        let hours = BusinessHours::try_from(sample_config()).unwrap();
        assert!(hours.open_days.contains(&Weekday::Tuesday));
        assert!(!hours.open_days.contains(&Weekday::Sunday));
        assert_eq!(hours.opening, time!(9:00));
        assert_eq!(hours.closing, time!(17:30));
        assert_eq!(hours.holidays[0].date, date!(2025 - 12 - 25));
    }

    #[test]
    fn rejects_inverted_hours() {
        let mut config = sample_config();
        config.opening_time = "18:00".into();
        assert!(matches!(
            BusinessHours::try_from(config),
            Err(SchedulingError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_garbage_weekday() {
        let mut config = sample_config();
        config.open_days.push("funday".into());
        assert!(BusinessHours::try_from(config).is_err());
    }

    #[test]
    fn default_is_monday_through_saturday() {
        let hours = BusinessHours::default();
        assert_eq!(hours.open_days.len(), 6);
        assert!(!hours.open_days.contains(&Weekday::Sunday));
        assert_eq!(hours.opening, time!(8:00));
        assert_eq!(hours.closing, time!(20:00));
        assert_eq!(hours.slot_minutes, 30);
    }
}
