use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::America::Toronto;
use chrono_tz::Tz;
use serde::Serialize;

/// Parliament keeps Ottawa time; statement times and activity dates are local.
pub fn ottawa_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&Toronto)
}

pub fn ottawa_today() -> NaiveDate {
    ottawa_now().date_naive()
}

pub fn ottawa_naive_now() -> NaiveDateTime {
    ottawa_now().naive_local()
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentDatetime {
    pub utc: String,
    pub local: String,
}

pub fn current_datetime() -> CurrentDatetime {
    let utc_now = Utc::now();
    CurrentDatetime {
        utc: utc_now.to_rfc3339(),
        local: utc_now.with_timezone(&Toronto).to_rfc3339(),
    }
}
