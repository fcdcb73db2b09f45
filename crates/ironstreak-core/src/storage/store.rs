//! Persistence seam for targets and the check-in ledger.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::Result;
use crate::target::{Target, TargetStatus};

/// Durable home of targets and their check-ins.
///
/// Implementations hold no business rules. The only constraint they enforce
/// is uniqueness of `(target_id, date)` in the ledger, and the "check then
/// insert" of [`append_check_in`](TargetStore::append_check_in) must be a
/// single atomic step.
pub trait TargetStore: Send + Sync {
    /// Persist a freshly locked target.
    fn save_target(&self, target: &Target) -> Result<()>;

    fn get_target(&self, id: &str) -> Result<Option<Target>>;

    /// Targets of `owner` whose stored status is still `ACTIVE`.
    fn list_active_targets_for_user(&self, owner: &str) -> Result<Vec<Target>>;

    /// Targets of `owner` with a terminal stored status, newest first.
    fn list_finished_targets_for_user(&self, owner: &str) -> Result<Vec<Target>>;

    /// Every stored-active target, for sweeps.
    fn list_all_active_targets(&self) -> Result<Vec<Target>>;

    /// Move a target from `ACTIVE` to `status`.
    ///
    /// Returns `false` when the stored status was no longer `ACTIVE`.
    fn record_status(&self, id: &str, status: TargetStatus) -> Result<bool>;

    /// Append a ledger row.
    ///
    /// # Errors
    /// [`CoreError::Duplicate`](crate::error::CoreError::Duplicate) when the
    /// row already exists.
    fn append_check_in(&self, target_id: &str, date: NaiveDate) -> Result<()>;

    /// Ledger dates for a target, ascending.
    fn list_check_ins(&self, target_id: &str) -> Result<Vec<NaiveDate>>;
}

impl<T: TargetStore + ?Sized> TargetStore for Arc<T> {
    fn save_target(&self, target: &Target) -> Result<()> {
        (**self).save_target(target)
    }

    fn get_target(&self, id: &str) -> Result<Option<Target>> {
        (**self).get_target(id)
    }

    fn list_active_targets_for_user(&self, owner: &str) -> Result<Vec<Target>> {
        (**self).list_active_targets_for_user(owner)
    }

    fn list_finished_targets_for_user(&self, owner: &str) -> Result<Vec<Target>> {
        (**self).list_finished_targets_for_user(owner)
    }

    fn list_all_active_targets(&self) -> Result<Vec<Target>> {
        (**self).list_all_active_targets()
    }

    fn record_status(&self, id: &str, status: TargetStatus) -> Result<bool> {
        (**self).record_status(id, status)
    }

    fn append_check_in(&self, target_id: &str, date: NaiveDate) -> Result<()> {
        (**self).append_check_in(target_id, date)
    }

    fn list_check_ins(&self, target_id: &str) -> Result<Vec<NaiveDate>> {
        (**self).list_check_ins(target_id)
    }
}
