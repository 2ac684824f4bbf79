//! Day-streak calculation.
//!
//! Pure calendar math, no I/O. A streak is the count of consecutive
//! calendar days with at least one qualifying completed activity.

use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Result of folding a new activity date into a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    /// The streak after the update.
    pub streak: u32,
    /// Set when the new date predates the last recorded activity. The
    /// streak is left unchanged in that case; the caller decides what to
    /// do with the anomalous event.
    pub anomaly: bool,
}

/// Folds one new activity date into an existing streak.
///
/// - same day as the last activity: unchanged (same-day re-entry is
///   idempotent)
/// - exactly the next day: streak + 1
/// - later than that, or no prior activity: resets to 1
/// - earlier than the last activity: flagged as an anomaly, streak kept
pub fn apply(
    previous_streak: u32,
    last_activity: Option<NaiveDate>,
    new_activity: NaiveDate,
) -> StreakUpdate {
    let Some(last) = last_activity else {
        return StreakUpdate {
            streak: 1,
            anomaly: false,
        };
    };
    if new_activity < last {
        return StreakUpdate {
            streak: previous_streak,
            anomaly: true,
        };
    }
    let streak = if new_activity == last {
        previous_streak
    } else if Some(new_activity) == last.succ_opt() {
        previous_streak + 1
    } else {
        1
    };
    StreakUpdate {
        streak,
        anomaly: false,
    }
}

/// Computes the current streak from a set of historical activity dates.
///
/// The streak is the longest run of consecutive calendar days anchored at
/// the most recent date. If the most recent activity is earlier than
/// `today - 1 day` the streak is broken by absence and the result is 0,
/// even though history exists.
pub fn from_history(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(&most_recent) = dates.iter().next_back() else {
        return 0;
    };
    match today.pred_opt() {
        Some(yesterday) if most_recent < yesterday => return 0,
        None => return 0,
        _ => {}
    }

    let mut streak = 1;
    let mut cursor = most_recent;
    while let Some(prev) = cursor.pred_opt() {
        if !dates.contains(&prev) {
            break;
        }
        streak += 1;
        cursor = prev;
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn same_day_reentry_is_idempotent() {
        for streak in [0u32, 1, 3, 365] {
            let update = apply(streak, Some(d(2024, 1, 5)), d(2024, 1, 5));
            assert_eq!(update.streak, streak);
            assert!(!update.anomaly);
        }
    }

    #[test]
    fn next_day_extends_the_streak() {
        let update = apply(3, Some(d(2024, 1, 5)), d(2024, 1, 6));
        assert_eq!(update.streak, 4);
        assert!(!update.anomaly);
    }

    #[test]
    fn gap_resets_to_one() {
        let update = apply(4, Some(d(2024, 1, 6)), d(2024, 1, 9));
        assert_eq!(update.streak, 1);
        assert!(!update.anomaly);
    }

    #[test]
    fn no_prior_activity_starts_at_one() {
        assert_eq!(apply(0, None, d(2024, 1, 5)).streak, 1);
    }

    #[test]
    fn out_of_order_date_is_flagged_and_keeps_the_streak() {
        let update = apply(7, Some(d(2024, 1, 5)), d(2024, 1, 3));
        assert_eq!(update.streak, 7);
        assert!(update.anomaly);
    }

    #[test]
    fn extension_across_month_boundary() {
        let update = apply(2, Some(d(2024, 1, 31)), d(2024, 2, 1));
        assert_eq!(update.streak, 3);
    }

    #[test]
    fn history_anchored_at_most_recent_date() {
        let today = d(2024, 1, 10);
        let dates: BTreeSet<_> = [
            d(2024, 1, 10),
            d(2024, 1, 9),
            d(2024, 1, 8),
            // gap
            d(2024, 1, 5),
            d(2024, 1, 4),
        ]
        .into_iter()
        .collect();
        assert_eq!(from_history(&dates, today), 3);
    }

    #[test]
    fn history_ending_yesterday_still_counts() {
        let today = d(2024, 1, 10);
        let dates: BTreeSet<_> = [d(2024, 1, 9), d(2024, 1, 8)].into_iter().collect();
        assert_eq!(from_history(&dates, today), 2);
    }

    #[test]
    fn stale_history_is_broken_by_absence() {
        let today = d(2024, 1, 10);
        // Most recent activity two days ago: streak is 0 despite a long
        // consecutive run inside the history.
        let dates: BTreeSet<_> = [d(2024, 1, 8), d(2024, 1, 7), d(2024, 1, 6)]
            .into_iter()
            .collect();
        assert_eq!(from_history(&dates, today), 0);
    }

    #[test]
    fn empty_history_is_zero() {
        assert_eq!(from_history(&BTreeSet::new(), d(2024, 1, 10)), 0);
    }
}
