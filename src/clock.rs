use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

/// Source of wall-clock time. Swappable so the main loop can be driven by a
/// fake clock in tests.
pub trait Clock {
    fn now(&self) -> Reading;
}

/// The system clock, in the local timezone
#[derive(Debug, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> Reading {
        Reading::new(&Local::now())
    }
}

/// Formatted time and date, as shown on screen. Rendering is skipped when
/// this hasn't changed, so it should never be more precise than a second.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Reading {
    pub time: String,
    pub date: String,
}

impl Reading {
    // https://docs.rs/chrono/latest/chrono/format/strftime/index.html
    const TIME_FORMAT: &'static str = "%H:%M:%S";
    const DATE_FORMAT: &'static str = "%d.%m.%Y";

    pub fn new<Tz>(now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            time: now.format(Self::TIME_FORMAT).to_string(),
            date: now.format(Self::DATE_FORMAT).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_reading_format() {
        let now = Utc.with_ymd_and_hms(2024, 5, 27, 14, 5, 32).unwrap();
        assert_eq!(
            Reading::new(&now),
            Reading {
                time: "14:05:32".into(),
                date: "27.05.2024".into(),
            }
        );
    }

    #[test]
    fn test_reading_uses_timezone() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = Utc
            .with_ymd_and_hms(2024, 12, 31, 23, 0, 0)
            .unwrap()
            .with_timezone(&offset);
        assert_eq!(
            Reading::new(&now),
            Reading {
                time: "01:00:00".into(),
                date: "01.01.2025".into(),
            }
        );
    }
}
