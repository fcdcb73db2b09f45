//! Targets: fixed-duration commitments that are locked once created.
//!
//! A [`Target`] never changes after creation except for its [`TargetStatus`],
//! which only moves from `ACTIVE` to one of the two terminal values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar;
use crate::error::ValidationError;

/// Hard ceiling on a target's length, whatever the configuration says.
pub const MAX_DURATION_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetStatus {
    Active,
    Success,
    Failed,
}

impl TargetStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TargetStatus::Active)
    }

    /// Combine a persisted status with a freshly computed one.
    ///
    /// A terminal status that has been persisted always wins.
    pub fn settle(stored: TargetStatus, computed: TargetStatus) -> TargetStatus {
        if stored.is_terminal() {
            stored
        } else {
            computed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetStatus::Active => "ACTIVE",
            TargetStatus::Success => "SUCCESS",
            TargetStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(TargetStatus::Active),
            "SUCCESS" => Ok(TargetStatus::Success),
            "FAILED" => Ok(TargetStatus::Failed),
            other => Err(format!("unknown target status: {other}")),
        }
    }
}

/// A locked commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    /// Actor that created the target.
    pub owner: String,
    pub target_text: String,
    pub start_date: NaiveDate,
    /// Inclusive; always `start_date + duration_in_days - 1`.
    pub end_date: NaiveDate,
    pub duration_in_days: u32,
    pub status: TargetStatus,
    pub created_at: DateTime<Utc>,
}

impl Target {
    /// Whether `date` falls inside `[start_date, end_date]`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn with_status(&self, status: TargetStatus) -> Target {
        Target {
            status,
            ..self.clone()
        }
    }
}

/// Unvalidated creation request, as it arrives from a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDraft {
    pub target_text: String,
    /// `YYYY-MM-DD`
    pub start_date: String,
    pub duration_in_days: i64,
}

impl TargetDraft {
    pub fn new(
        target_text: impl Into<String>,
        start_date: impl Into<String>,
        duration_in_days: i64,
    ) -> Self {
        Self {
            target_text: target_text.into(),
            start_date: start_date.into(),
            duration_in_days,
        }
    }
}

/// Limits applied when a target is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPolicy {
    pub max_duration_days: u32,
    /// How many days before today a start date may lie.
    pub start_grace_days: u32,
    pub max_text_chars: usize,
}

impl Default for TargetPolicy {
    fn default() -> Self {
        Self {
            max_duration_days: MAX_DURATION_DAYS,
            start_grace_days: 0,
            max_text_chars: 500,
        }
    }
}

impl TargetPolicy {
    /// Validate a draft and lock it into a new [`Target`] owned by `owner`.
    pub fn lock(
        &self,
        draft: &TargetDraft,
        owner: &str,
        today: NaiveDate,
    ) -> Result<Target, ValidationError> {
        let target_text = draft.target_text.trim();
        if target_text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let len = target_text.chars().count();
        if len > self.max_text_chars {
            return Err(ValidationError::TextTooLong {
                len,
                max: self.max_text_chars,
            });
        }

        let max = self.max_duration_days.min(MAX_DURATION_DAYS);
        let duration_in_days = u32::try_from(draft.duration_in_days)
            .ok()
            .filter(|days| (1..=max).contains(days))
            .ok_or(ValidationError::DurationOutOfRange {
                value: draft.duration_in_days,
                max,
            })?;

        let start_date = calendar::parse_date(&draft.start_date)?;
        let earliest = calendar::sub_days(today, u64::from(self.start_grace_days));
        if start_date < earliest {
            return Err(ValidationError::StartInPast {
                start_date,
                earliest,
            });
        }

        let end_date = calendar::end_date(start_date, duration_in_days)
            .ok_or_else(|| ValidationError::UnparseableDate(draft.start_date.clone()))?;

        Ok(Target {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            target_text: target_text.to_string(),
            start_date,
            end_date,
            duration_in_days,
            status: TargetStatus::Active,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        calendar::parse_date(s).unwrap()
    }

    #[test]
    fn lock_computes_end_date_and_activates() {
        let target = TargetPolicy::default()
            .lock(&TargetDraft::new("  Run 5k  ", "2024-01-01", 3), "alice", d("2024-01-01"))
            .unwrap();
        assert_eq!(target.target_text, "Run 5k");
        assert_eq!(target.end_date, d("2024-01-03"));
        assert_eq!(target.status, TargetStatus::Active);
        assert_eq!(target.owner, "alice");
        assert!(Uuid::parse_str(&target.id).is_ok());
    }

    #[test]
    fn lock_rejects_bad_input() {
        let policy = TargetPolicy::default();
        let today = d("2024-01-10");
        let cases = [
            (TargetDraft::new("   ", "2024-01-10", 3), ValidationError::EmptyText),
            (
                TargetDraft::new("x", "2024-01-10", 0),
                ValidationError::DurationOutOfRange { value: 0, max: 365 },
            ),
            (
                TargetDraft::new("x", "2024-01-10", 366),
                ValidationError::DurationOutOfRange { value: 366, max: 365 },
            ),
            (
                TargetDraft::new("x", "2024-01-10", -4),
                ValidationError::DurationOutOfRange { value: -4, max: 365 },
            ),
            (
                TargetDraft::new("x", "tomorrow", 3),
                ValidationError::UnparseableDate("tomorrow".into()),
            ),
            (
                TargetDraft::new("x", "2024-01-09", 3),
                ValidationError::StartInPast {
                    start_date: d("2024-01-09"),
                    earliest: today,
                },
            ),
        ];
        for (draft, expected) in cases {
            assert_eq!(policy.lock(&draft, "alice", today), Err(expected));
        }
    }

    #[test]
    fn grace_allows_recent_start() {
        let policy = TargetPolicy {
            start_grace_days: 2,
            ..TargetPolicy::default()
        };
        let today = d("2024-01-10");
        assert!(policy.lock(&TargetDraft::new("x", "2024-01-08", 1), "a", today).is_ok());
        assert!(policy.lock(&TargetDraft::new("x", "2024-01-07", 1), "a", today).is_err());
    }

    #[test]
    fn configured_maximum_cannot_exceed_hard_ceiling() {
        let policy = TargetPolicy {
            max_duration_days: 1000,
            ..TargetPolicy::default()
        };
        let err = policy
            .lock(&TargetDraft::new("x", "2024-01-10", 400), "a", d("2024-01-10"))
            .unwrap_err();
        assert_eq!(err, ValidationError::DurationOutOfRange { value: 400, max: 365 });
    }

    #[test]
    fn text_limit_counts_characters() {
        let policy = TargetPolicy {
            max_text_chars: 3,
            ..TargetPolicy::default()
        };
        let today = d("2024-01-10");
        assert!(policy.lock(&TargetDraft::new("été", "2024-01-10", 1), "a", today).is_ok());
        assert_eq!(
            policy.lock(&TargetDraft::new("étés", "2024-01-10", 1), "a", today),
            Err(ValidationError::TextTooLong { len: 4, max: 3 })
        );
    }

    #[test]
    fn settle_keeps_terminal_status() {
        use TargetStatus::*;
        assert_eq!(TargetStatus::settle(Active, Failed), Failed);
        assert_eq!(TargetStatus::settle(Active, Active), Active);
        assert_eq!(TargetStatus::settle(Failed, Active), Failed);
        assert_eq!(TargetStatus::settle(Success, Failed), Success);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [TargetStatus::Active, TargetStatus::Success, TargetStatus::Failed] {
            assert_eq!(status.as_str().parse::<TargetStatus>(), Ok(status));
        }
        assert!("DONE".parse::<TargetStatus>().is_err());
    }
}
