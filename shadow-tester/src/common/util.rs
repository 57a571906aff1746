use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

/// First simulated calendar day when no saved profile says otherwise.
pub fn simulation_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 1).unwrap_or(NaiveDate::MIN)
}

/// Hour of day every simulated visit happens at.
pub const VISIT_HOUR: u32 = 18;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Evening visit time on `date`.
pub fn visit_time(date: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(VISIT_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc()
}

/// Calendar day `offset` days after `start`, saturating at the end of the
/// calendar.
pub fn day_after(start: NaiveDate, offset: u32) -> NaiveDate {
    start
        .checked_add_days(Days::new(u64::from(offset)))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn visits_happen_in_the_evening() {
        let at = visit_time(simulation_epoch());
        assert_eq!(at.hour(), VISIT_HOUR);
        assert_eq!(at.date_naive(), simulation_epoch());
    }

    #[test]
    fn day_after_walks_the_calendar() {
        assert_eq!(day_after(simulation_epoch(), 0), simulation_epoch());
        assert_eq!(
            day_after(simulation_epoch(), 31),
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
        );
    }
}
