use chrono::{DateTime, Duration, Utc};

/// Whether an entity last refreshed at `last` is due for another refresh.
///
/// Never-refreshed entities (`None`) are always due. Otherwise the entity is
/// due once `now` is strictly past `last + max_age_days`. A max age whose
/// deadline falls outside the representable range is never reached.
#[must_use]
pub fn is_due(last: Option<DateTime<Utc>>, max_age_days: i64, now: DateTime<Utc>) -> bool {
    let Some(last) = last else {
        return true;
    };
    Duration::try_days(max_age_days)
        .and_then(|age| last.checked_add_signed(age))
        .is_some_and(|deadline| now > deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn never_refreshed_is_due() {
        assert!(is_due(None, 7, at(1)));
    }

    #[test]
    fn fresh_entity_is_not_due() {
        assert!(!is_due(Some(at(1)), 7, at(5)));
    }

    #[test]
    fn exactly_at_boundary_is_not_due() {
        assert!(!is_due(Some(at(1)), 7, at(8)));
    }

    #[test]
    fn past_boundary_is_due() {
        assert!(is_due(Some(at(1)), 7, at(8) + Duration::seconds(1)));
    }

    #[test]
    fn huge_max_age_is_never_due() {
        assert!(!is_due(Some(at(1)), 1_000_000_000, at(1)));
        assert!(!is_due(Some(at(1)), i64::MAX, at(20)));
    }

    #[test]
    fn zero_max_age_is_due_immediately_after() {
        assert!(is_due(Some(at(1)), 0, at(1) + Duration::seconds(1)));
    }
}
