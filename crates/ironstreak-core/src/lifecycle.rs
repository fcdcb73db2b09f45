//! Target lifecycle controller.
//!
//! [`TargetService`] is the only component that writes: it locks new targets,
//! appends check-ins, and persists terminal statuses the streak engine
//! observes. Every operation receives an already-authenticated actor and only
//! checks ownership.
//!
//! Status is derived on read. A stored status is a cache of the last terminal
//! transition observed; it is written back at most once per target.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::Clock;
use crate::error::{CoreError, Result};
use crate::storage::TargetStore;
use crate::streak::{self, Evaluation, Streak};
use crate::target::{Target, TargetDraft, TargetPolicy, TargetStatus};

/// Streak figures for one target as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakReport {
    pub target_id: String,
    pub status: TargetStatus,
    #[serde(flatten)]
    pub streak: Streak,
}

/// Result of a check-in, including the state after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInOutcome {
    pub success: bool,
    pub message: String,
    /// `false` when today had already been recorded.
    pub newly_recorded: bool,
    pub date: NaiveDate,
    pub status: TargetStatus,
    pub streak: Streak,
}

/// Totals from one eager evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub examined: usize,
    pub failed: usize,
    pub succeeded: usize,
}

/// Orchestrates creation and check-in over a [`TargetStore`].
pub struct TargetService<S, C> {
    store: S,
    clock: C,
    policy: TargetPolicy,
}

impl<S: TargetStore, C: Clock> TargetService<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self::with_policy(store, clock, TargetPolicy::default())
    }

    pub fn with_policy(store: S, clock: C, policy: TargetPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Validate and lock a new target for `actor`.
    ///
    /// # Errors
    /// [`CoreError::InvalidTarget`] for empty text, a duration outside the
    /// allowed window, or an unparseable or past start date.
    pub fn create_target(&self, actor: &str, draft: &TargetDraft) -> Result<Target> {
        let target = self.policy.lock(draft, actor, self.today())?;
        self.store.save_target(&target)?;
        tracing::info!(
            target_id = %target.id,
            owner = %target.owner,
            start_date = %target.start_date,
            end_date = %target.end_date,
            duration_in_days = target.duration_in_days,
            "target created"
        );
        Ok(target)
    }

    /// `actor`'s targets that are still running, oldest start first.
    ///
    /// Targets found finished on the way are persisted and left out.
    pub fn list_active_targets(&self, actor: &str) -> Result<Vec<Target>> {
        let today = self.today();
        let mut active = Vec::new();
        for target in self.store.list_active_targets_for_user(actor)? {
            let (target, _) = self.refresh(target, today)?;
            if target.status == TargetStatus::Active {
                active.push(target);
            }
        }
        Ok(active)
    }

    /// `actor`'s finished targets, newest first.
    pub fn list_target_history(&self, actor: &str) -> Result<Vec<Target>> {
        self.list_active_targets(actor)?;
        self.store.list_finished_targets_for_user(actor)
    }

    pub fn get_target(&self, actor: &str, target_id: &str) -> Result<Target> {
        let target = self.owned_target(actor, target_id)?;
        let (target, _) = self.refresh(target, self.today())?;
        Ok(target)
    }

    pub fn get_streak(&self, actor: &str, target_id: &str) -> Result<StreakReport> {
        let target = self.owned_target(actor, target_id)?;
        let (target, eval) = self.refresh(target, self.today())?;
        Ok(StreakReport {
            target_id: target.id,
            status: target.status,
            streak: eval.streak,
        })
    }

    /// Record today's check-in for `target_id`.
    ///
    /// Repeating the call on the same day is a no-op success, including after
    /// the check-in that completed the target.
    ///
    /// # Errors
    /// - [`CoreError::NotFound`] / [`CoreError::Forbidden`] for unknown or
    ///   foreign targets
    /// - [`CoreError::TerminalState`] when the target already finished
    /// - [`CoreError::OutOfRange`] when today lies outside the target window
    pub fn check_in_today(&self, actor: &str, target_id: &str) -> Result<CheckInOutcome> {
        let target = self.owned_target(actor, target_id)?;
        let today = self.today();
        let (target, eval) = self.refresh(target, today)?;

        if eval.streak.today_done && target.status != TargetStatus::Failed {
            tracing::debug!(target_id = %target.id, %today, "check-in replayed");
            return Ok(outcome(&target, eval, today, false));
        }
        if target.status.is_terminal() {
            return Err(CoreError::TerminalState {
                target_id: target.id,
                status: target.status,
            });
        }
        if !target.covers(today) {
            return Err(CoreError::OutOfRange {
                date: today,
                start_date: target.start_date,
                end_date: target.end_date,
            });
        }

        let newly_recorded = match self.store.append_check_in(&target.id, today) {
            Ok(()) => true,
            Err(CoreError::Duplicate { .. }) => {
                tracing::debug!(target_id = %target.id, %today, "check-in raced, already recorded");
                false
            }
            Err(e) => return Err(e),
        };
        if newly_recorded {
            tracing::info!(target_id = %target.id, owner = %target.owner, %today, "checked in");
        }

        let (target, eval) = self.refresh(target, today)?;
        Ok(outcome(&target, eval, today, newly_recorded))
    }

    /// Recompute every stored-active target and persist terminal statuses.
    ///
    /// Optional: reads reach the same statuses lazily. Targets that fail to
    /// load are logged and skipped so one bad row cannot stall the pass.
    pub fn sweep(&self) -> Result<SweepReport> {
        let today = self.today();
        let mut report = SweepReport::default();
        for target in self.store.list_all_active_targets()? {
            report.examined += 1;
            let target_id = target.id.clone();
            match self.refresh(target, today) {
                Ok((target, _)) => match target.status {
                    TargetStatus::Failed => report.failed += 1,
                    TargetStatus::Success => report.succeeded += 1,
                    TargetStatus::Active => {}
                },
                Err(e) => tracing::warn!(%target_id, error = %e, "sweep skipped target"),
            }
        }
        tracing::info!(
            %today,
            examined = report.examined,
            failed = report.failed,
            succeeded = report.succeeded,
            "sweep finished"
        );
        Ok(report)
    }

    fn owned_target(&self, actor: &str, target_id: &str) -> Result<Target> {
        let target = self
            .store
            .get_target(target_id)?
            .ok_or_else(|| CoreError::NotFound {
                target_id: target_id.to_string(),
            })?;
        if target.owner != actor {
            return Err(CoreError::Forbidden {
                target_id: target_id.to_string(),
                actor: actor.to_string(),
            });
        }
        Ok(target)
    }

    /// Evaluate `target` as of `today`, persisting a newly observed terminal
    /// status.
    fn refresh(&self, target: Target, today: NaiveDate) -> Result<(Target, Evaluation)> {
        let ledger: BTreeSet<NaiveDate> = self.store.list_check_ins(&target.id)?.into_iter().collect();
        let mut eval = streak::evaluate(&target, &ledger, today);
        let status = TargetStatus::settle(target.status, eval.status);
        if status == TargetStatus::Failed {
            eval.streak.current_streak = 0;
        }
        eval.status = status;

        if status != target.status {
            if self.store.record_status(&target.id, status)? {
                tracing::info!(target_id = %target.id, from = %target.status, to = %status, "status settled");
            } else {
                // Another writer settled it first; trust what is stored.
                let stored = self
                    .store
                    .get_target(&target.id)?
                    .map(|t| t.status)
                    .unwrap_or(status);
                tracing::warn!(target_id = %target.id, computed = %status, %stored, "status already settled");
                eval.status = stored;
                return Ok((target.with_status(stored), eval));
            }
        }
        Ok((target.with_status(status), eval))
    }
}

fn outcome(target: &Target, eval: Evaluation, date: NaiveDate, newly_recorded: bool) -> CheckInOutcome {
    let message = if !newly_recorded {
        "Already checked in for today"
    } else if target.status == TargetStatus::Success {
        "Checked in for today, target complete"
    } else {
        "Checked in for today"
    };
    CheckInOutcome {
        success: true,
        message: message.to_string(),
        newly_recorded,
        date,
        status: target.status,
        streak: eval.streak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{self, ManualClock};
    use crate::storage::TargetDb;
    use std::sync::Arc;

    fn d(s: &str) -> NaiveDate {
        calendar::parse_date(s).unwrap()
    }

    fn service(today: &str) -> (TargetService<TargetDb, Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(d(today)));
        let service = TargetService::new(TargetDb::open_memory().unwrap(), Arc::clone(&clock));
        (service, clock)
    }

    #[test]
    fn ownership_is_checked() {
        let (svc, _) = service("2024-01-01");
        let target = svc
            .create_target("alice", &TargetDraft::new("stretch", "2024-01-01", 3))
            .unwrap();

        assert!(matches!(
            svc.check_in_today("bob", &target.id),
            Err(CoreError::Forbidden { .. })
        ));
        assert!(matches!(
            svc.get_streak("bob", &target.id),
            Err(CoreError::Forbidden { .. })
        ));
        assert!(matches!(
            svc.check_in_today("alice", "no-such-target"),
            Err(CoreError::NotFound { .. })
        ));
        assert!(svc.store().list_check_ins(&target.id).unwrap().is_empty());
    }

    #[test]
    fn check_in_before_start_is_out_of_range() {
        let (svc, _) = service("2024-01-01");
        let target = svc
            .create_target("alice", &TargetDraft::new("stretch", "2024-01-05", 3))
            .unwrap();
        let err = svc.check_in_today("alice", &target.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::OutOfRange { date, start_date, .. }
                if date == d("2024-01-01") && start_date == d("2024-01-05")
        ));
    }

    #[test]
    fn completing_check_in_replays_as_success() {
        let (svc, _) = service("2024-01-01");
        let target = svc
            .create_target("alice", &TargetDraft::new("stretch", "2024-01-01", 1))
            .unwrap();

        let first = svc.check_in_today("alice", &target.id).unwrap();
        assert!(first.newly_recorded);
        assert_eq!(first.status, TargetStatus::Success);
        assert_eq!(first.message, "Checked in for today, target complete");

        let second = svc.check_in_today("alice", &target.id).unwrap();
        assert!(second.success);
        assert!(!second.newly_recorded);
        assert_eq!(second.message, "Already checked in for today");
        assert_eq!(svc.store().list_check_ins(&target.id).unwrap().len(), 1);
    }

    #[test]
    fn finished_target_rejects_later_check_in() {
        let (svc, clock) = service("2024-01-01");
        let target = svc
            .create_target("alice", &TargetDraft::new("stretch", "2024-01-01", 1))
            .unwrap();
        svc.check_in_today("alice", &target.id).unwrap();

        clock.advance(1);
        let err = svc.check_in_today("alice", &target.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::TerminalState { status: TargetStatus::Success, .. }
        ));
        assert_eq!(svc.store().list_check_ins(&target.id).unwrap().len(), 1);
    }

    #[test]
    fn read_persists_failure() {
        let (svc, clock) = service("2024-01-01");
        let target = svc
            .create_target("alice", &TargetDraft::new("stretch", "2024-01-01", 5))
            .unwrap();
        clock.advance(2);

        assert_eq!(
            svc.store().get_target(&target.id).unwrap().unwrap().status,
            TargetStatus::Active
        );
        let report = svc.get_streak("alice", &target.id).unwrap();
        assert_eq!(report.status, TargetStatus::Failed);
        assert_eq!(
            svc.store().get_target(&target.id).unwrap().unwrap().status,
            TargetStatus::Failed
        );
    }
}
