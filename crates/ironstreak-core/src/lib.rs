//! # IronStreak Core Library
//!
//! Tracks targets: commitments with a fixed start date and duration that are
//! locked once created. A target is met by checking in once on every day of
//! its window; a single missed day fails it for good.
//!
//! The CLI is a thin layer over this library; every operation is available
//! here with an explicit, already-authenticated actor.
//!
//! ## Architecture
//!
//! - **Calendar**: resolves "today" in one canonical reference zone and does
//!   day arithmetic
//! - **Targets**: the locked commitment model and its creation policy
//! - **Storage**: SQLite target store and append-only check-in ledger, plus
//!   TOML configuration
//! - **Streak engine**: pure status/streak evaluation, run on every read
//! - **Lifecycle**: create, check-in, listing and sweep orchestration
//!
//! ## Key Components
//!
//! - [`TargetService`]: lifecycle controller
//! - [`TargetDb`]: SQLite implementation of [`TargetStore`]
//! - [`streak::evaluate`]: the streak engine
//! - [`Config`]: application configuration

pub mod calendar;
pub mod error;
pub mod lifecycle;
pub mod storage;
pub mod streak;
pub mod target;

pub use calendar::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use lifecycle::{CheckInOutcome, StreakReport, SweepReport, TargetService};
pub use storage::{Config, EvaluationMode, TargetDb, TargetStore};
pub use streak::{Evaluation, Streak};
pub use target::{Target, TargetDraft, TargetPolicy, TargetStatus};
