//! Streak engine.
//!
//! Pure evaluation of a target against its check-in ledger for a given
//! "today". Nothing here reads or writes storage; the same inputs always
//! produce the same [`Evaluation`], so it is safe to run on every read.
//!
//! ## Status rules
//!
//! ```text
//! every day in [start, end] checked in     -> SUCCESS
//! today > end (and some day missing)       -> FAILED
//! some day in [start, today) missing       -> FAILED
//! otherwise                                -> ACTIVE
//! ```

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::target::{Target, TargetStatus};

/// Derived streak figures for one target. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Streak {
    pub current_streak: u32,
    pub last_completed_date: Option<NaiveDate>,
    pub today_done: bool,
    pub completed_days: u32,
}

/// Result of evaluating a target on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub status: TargetStatus,
    pub streak: Streak,
}

/// Evaluate `target` against its ledger as of `today`.
///
/// Ledger dates outside the target window are ignored. The stored
/// `target.status` is not consulted; combine with [`TargetStatus::settle`]
/// to keep persisted terminal states.
pub fn evaluate(target: &Target, ledger: &BTreeSet<NaiveDate>, today: NaiveDate) -> Evaluation {
    let mut window = ledger.range(target.start_date..=target.end_date);
    let completed_days = u32::try_from(window.clone().count()).unwrap_or(u32::MAX);
    let last_completed_date = window.next_back().copied();
    let today_done = target.covers(today) && ledger.contains(&today);

    let status = status_on(target, ledger, completed_days, today);
    let current_streak = if status == TargetStatus::Failed {
        0
    } else {
        current_streak(target, ledger, today)
    };

    Evaluation {
        status,
        streak: Streak {
            current_streak,
            last_completed_date,
            today_done,
            completed_days,
        },
    }
}

fn status_on(
    target: &Target,
    ledger: &BTreeSet<NaiveDate>,
    completed_days: u32,
    today: NaiveDate,
) -> TargetStatus {
    if completed_days >= target.duration_in_days {
        return TargetStatus::Success;
    }
    if today > target.end_date {
        return TargetStatus::Failed;
    }
    if today > target.start_date {
        let yesterday = calendar::sub_days(today, 1);
        let expected = calendar::days_inclusive(target.start_date, yesterday);
        let done = ledger.range(target.start_date..=yesterday).count();
        if (done as u64) < u64::from(expected) {
            return TargetStatus::Failed;
        }
    }
    TargetStatus::Active
}

/// Consecutive checked-in days ending at the latest day that can count.
///
/// The walk starts at `min(today, end_date)`. While today is still open
/// (not yet checked in) it starts from yesterday instead, so an unbroken run
/// does not read as zero every morning.
fn current_streak(target: &Target, ledger: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    if today < target.start_date {
        return 0;
    }
    let mut day = today.min(target.end_date);
    if day == today && !ledger.contains(&today) {
        if day == target.start_date {
            return 0;
        }
        day = calendar::sub_days(day, 1);
    }

    let mut streak = 0;
    while day >= target.start_date && ledger.contains(&day) {
        streak += 1;
        if day == target.start_date {
            break;
        }
        day = calendar::sub_days(day, 1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn d(s: &str) -> NaiveDate {
        calendar::parse_date(s).unwrap()
    }

    fn target(start: &str, days: u32) -> Target {
        let start_date = d(start);
        Target {
            id: "t-1".into(),
            owner: "alice".into(),
            target_text: "read".into(),
            start_date,
            end_date: calendar::end_date(start_date, days).unwrap(),
            duration_in_days: days,
            status: TargetStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn ledger(days: &[&str]) -> BTreeSet<NaiveDate> {
        days.iter().map(|s| d(s)).collect()
    }

    #[test]
    fn missed_last_day_fails_after_window() {
        let eval = evaluate(
            &target("2024-01-01", 3),
            &ledger(&["2024-01-01", "2024-01-02"]),
            d("2024-01-04"),
        );
        assert_eq!(eval.status, TargetStatus::Failed);
        assert_eq!(eval.streak.current_streak, 0);
        assert_eq!(eval.streak.completed_days, 2);
        assert_eq!(eval.streak.last_completed_date, Some(d("2024-01-02")));
        assert!(!eval.streak.today_done);
    }

    #[test]
    fn full_window_succeeds_on_last_day() {
        let eval = evaluate(
            &target("2024-01-01", 3),
            &ledger(&["2024-01-01", "2024-01-02", "2024-01-03"]),
            d("2024-01-03"),
        );
        assert_eq!(eval.status, TargetStatus::Success);
        assert_eq!(eval.streak.completed_days, 3);
        assert_eq!(eval.streak.current_streak, 3);
        assert!(eval.streak.today_done);
    }

    #[test]
    fn success_is_stable_after_window() {
        let eval = evaluate(
            &target("2024-01-01", 3),
            &ledger(&["2024-01-01", "2024-01-02", "2024-01-03"]),
            d("2024-02-01"),
        );
        assert_eq!(eval.status, TargetStatus::Success);
        assert_eq!(eval.streak.current_streak, 3);
        assert!(!eval.streak.today_done);
    }

    #[test]
    fn missed_past_day_fails_regardless_of_later_check_ins() {
        let eval = evaluate(
            &target("2024-01-01", 5),
            &ledger(&["2024-01-01", "2024-01-02", "2024-01-04"]),
            d("2024-01-04"),
        );
        assert_eq!(eval.status, TargetStatus::Failed);
        assert_eq!(eval.streak.current_streak, 0);
        assert_eq!(eval.streak.completed_days, 3);
    }

    #[test]
    fn single_day_target_succeeds_on_check_in() {
        let t = target("2024-01-01", 1);
        let before = evaluate(&t, &BTreeSet::new(), d("2024-01-01"));
        assert_eq!(before.status, TargetStatus::Active);
        let after = evaluate(&t, &ledger(&["2024-01-01"]), d("2024-01-01"));
        assert_eq!(after.status, TargetStatus::Success);
        assert_eq!(after.streak.current_streak, 1);
    }

    #[test]
    fn fresh_target_is_active_with_zero_streak() {
        let eval = evaluate(&target("2024-01-01", 10), &BTreeSet::new(), d("2024-01-01"));
        assert_eq!(eval.status, TargetStatus::Active);
        assert_eq!(eval.streak, Streak::default());
    }

    #[test]
    fn future_target_is_active() {
        let eval = evaluate(&target("2024-03-01", 10), &BTreeSet::new(), d("2024-01-01"));
        assert_eq!(eval.status, TargetStatus::Active);
        assert_eq!(eval.streak.current_streak, 0);
    }

    #[test]
    fn open_day_keeps_yesterdays_streak() {
        let t = target("2024-01-01", 10);
        let l = ledger(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        let morning = evaluate(&t, &l, d("2024-01-04"));
        assert_eq!(morning.status, TargetStatus::Active);
        assert_eq!(morning.streak.current_streak, 3);
        assert!(!morning.streak.today_done);

        let mut l = l;
        l.insert(d("2024-01-04"));
        let evening = evaluate(&t, &l, d("2024-01-04"));
        assert_eq!(evening.streak.current_streak, 4);
        assert!(evening.streak.today_done);
    }

    #[test]
    fn ledger_outside_window_is_ignored() {
        let eval = evaluate(
            &target("2024-01-02", 2),
            &ledger(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"]),
            d("2024-01-03"),
        );
        assert_eq!(eval.status, TargetStatus::Success);
        assert_eq!(eval.streak.completed_days, 2);
        assert_eq!(eval.streak.last_completed_date, Some(d("2024-01-03")));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let t = target("2024-01-01", 5);
        let l = ledger(&["2024-01-01", "2024-01-02"]);
        let first = evaluate(&t, &l, d("2024-01-03"));
        for _ in 0..3 {
            assert_eq!(evaluate(&t, &l, d("2024-01-03")), first);
        }
    }
}
