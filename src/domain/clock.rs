use crate::domain::models::DayOfWeek;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Source of "now" and of the local weekday the user's schedule refers to.
#[derive(Clone)]
pub struct Clock {
    now_provider: NowProvider,
    timezone: Tz,
}

impl Clock {
    pub fn system(timezone: Tz) -> Self {
        Self {
            now_provider: Arc::new(Utc::now),
            timezone,
        }
    }

    pub fn fixed(instant: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            now_provider: Arc::new(move || instant),
            timezone,
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn local_date(&self) -> NaiveDate {
        self.now().with_timezone(&self.timezone).date_naive()
    }

    pub fn today(&self) -> DayOfWeek {
        self.now().with_timezone(&self.timezone).weekday().into()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system(Tz::UTC)
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn today_follows_configured_timezone() {
        // 2026-02-18 is a Wednesday; 02:00 UTC is still Tuesday evening in New York.
        let instant = DateTime::parse_from_rfc3339("2026-02-18T02:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc);
        assert_eq!(Clock::fixed(instant, Tz::UTC).today(), DayOfWeek::Wednesday);
        assert_eq!(
            Clock::fixed(instant, chrono_tz::America::New_York).today(),
            DayOfWeek::Tuesday
        );
        assert_eq!(
            Clock::fixed(instant, chrono_tz::America::New_York).local_date(),
            NaiveDate::from_ymd_opt(2026, 2, 17).expect("valid date")
        );
    }
}
