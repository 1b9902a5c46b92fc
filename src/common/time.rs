use chrono::{DateTime, Local};

pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Prefix of every project log line, e.g. `2024-09-28 22:35:22,005`.
pub fn log_timestamp(ts: &DateTime<Local>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S,%3f").to_string()
}

/// Summary line timestamp, e.g. `2024-09-28T22:35:22.005085`.
pub fn iso_timestamp(ts: &DateTime<Local>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::{iso_timestamp, log_timestamp};
    use chrono::{Local, NaiveDate};

    fn sample() -> chrono::DateTime<Local> {
        NaiveDate::from_ymd_opt(2024, 9, 28)
            .and_then(|date| date.and_hms_micro_opt(22, 35, 22, 5085))
            .and_then(|naive| naive.and_local_timezone(Local).single())
            .expect("valid local time")
    }

    #[test]
    fn log_timestamp_uses_comma_millis() {
        assert_eq!(log_timestamp(&sample()), "2024-09-28 22:35:22,005");
    }

    #[test]
    fn iso_timestamp_uses_micros() {
        assert_eq!(iso_timestamp(&sample()), "2024-09-28T22:35:22.005085");
    }
}
