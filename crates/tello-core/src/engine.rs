//! Renewal decision engine.
//!
//! Collapses the skip/retry policy into one ordered decision procedure with
//! a closed set of outcomes, evaluated first-match-wins:
//!
//! 1. `force` set → [`Decision::Forced`]
//! 2. no cached due date → [`Decision::NeedsLiveCheck`]
//! 3. due date further out than the window → [`Decision::SkipNotDue`]
//! 4. real successful attempt already today → [`Decision::SkipAlreadyDone`]
//! 5. otherwise → [`Decision::NeedsRenewal`]
//!
//! The engine raises no domain errors for a well-formed invocation: store
//! corruption reads as absence and store write failures degrade to warnings
//! (fail-open: prefer an extra live check over silently never checking
//! again).

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::state::{DueDateStore, RunStateRecord, RunStateStore, StoreError};

/// What the current invocation should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// No cached due date exists; a live check must discover it.
    NeedsLiveCheck,

    /// The cached due date is further out than the renewal window.
    SkipNotDue {
        /// Whole civil days until the cached due date.
        days_until_due: i64,
    },

    /// A real attempt already succeeded today in the configured timezone.
    SkipAlreadyDone,

    /// The window is active and no successful real attempt happened today.
    NeedsRenewal {
        /// Whole civil days until the cached due date (negative when past).
        days_until_due: i64,
    },

    /// `force` bypassed every skip rule.
    Forced,
}

impl Decision {
    /// Whether the caller should proceed to an external attempt.
    #[must_use]
    pub const fn requires_attempt(&self) -> bool {
        matches!(
            self,
            Self::NeedsLiveCheck | Self::NeedsRenewal { .. } | Self::Forced
        )
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedsLiveCheck => write!(f, "needs_live_check"),
            Self::SkipNotDue { days_until_due } => {
                write!(f, "skip_not_due ({days_until_due} days until due)")
            },
            Self::SkipAlreadyDone => write!(f, "skip_already_done"),
            Self::NeedsRenewal { days_until_due } => {
                write!(f, "needs_renewal ({days_until_due} days until due)")
            },
            Self::Forced => write!(f, "forced"),
        }
    }
}

/// What the caller observed and did during one attempt.
#[derive(Debug, Clone, Copy)]
pub struct AttemptOutcome {
    /// Due date read from the live account, when the attempt got that far.
    pub observed_due_date: Option<NaiveDate>,

    /// Whether the attempt completed without error.
    pub success: bool,

    /// Whether the attempt performed no real mutation.
    pub dry_run: bool,
}

/// Decision logic plus exclusive ownership of the two record stores.
#[derive(Debug)]
pub struct RenewalEngine {
    state_folder: PathBuf,
    due_dates: DueDateStore,
    run_states: RunStateStore,
    timezone: Tz,
    days_before_renewal: i64,
    force: bool,
}

impl RenewalEngine {
    /// Create an engine over `state_folder`.
    #[must_use]
    pub fn new(state_folder: &Path, timezone: Tz, days_before_renewal: u32, force: bool) -> Self {
        Self {
            state_folder: state_folder.to_path_buf(),
            due_dates: DueDateStore::new(state_folder),
            run_states: RunStateStore::new(state_folder),
            timezone,
            days_before_renewal: i64::from(days_before_renewal),
            force,
        }
    }

    /// The folder holding the record files.
    #[must_use]
    pub fn state_folder(&self) -> &Path {
        &self.state_folder
    }

    /// Decide what this invocation should do.
    ///
    /// Pure given `now`: calling it twice without an intervening
    /// [`Self::record_outcome`] returns the same decision both times.
    #[must_use]
    pub fn decide(&self, now: DateTime<Utc>) -> Decision {
        if self.force {
            info!("force flag set, bypassing all skip logic");
            return Decision::Forced;
        }

        let Some(cached) = self.due_dates.read() else {
            debug!("no cached due date, live check required");
            return Decision::NeedsLiveCheck;
        };

        let today = self.civil_today(now);
        let days_until_due = (cached - today).num_days();
        debug!(%cached, %today, days_until_due, "evaluating renewal window");

        if days_until_due > self.days_before_renewal {
            return Decision::SkipNotDue { days_until_due };
        }

        if let Some(record) = self.run_states.read() {
            if record.success && !record.dry_run && self.civil_today(record.timestamp) == today {
                return Decision::SkipAlreadyDone;
            }
        }

        Decision::NeedsRenewal { days_until_due }
    }

    /// Whether `due_date` puts `now` inside the renewal window.
    ///
    /// Used after a live check discovers a date the cache did not have.
    #[must_use]
    pub fn within_window(&self, now: DateTime<Utc>, due_date: NaiveDate) -> bool {
        (due_date - self.civil_today(now)).num_days() <= self.days_before_renewal
    }

    /// Record the outcome of an attempt.
    ///
    /// Always replaces the run-state record. Updates the cached due date on
    /// any live observation that differs from (or first populates) the
    /// cache: observing the true date is truthful information regardless of
    /// `dry_run`; only the action taken is gated by it. Store write failures
    /// degrade to warnings and leave the decision for this invocation
    /// unaffected.
    pub fn record_outcome(&self, outcome: AttemptOutcome, now: DateTime<Utc>) {
        let record = RunStateRecord {
            timestamp: now,
            success: outcome.success,
            dry_run: outcome.dry_run,
        };
        if let Err(err) = self.run_states.write(&record) {
            warn!(error = %err, "failed to persist run state, continuing unpersisted");
        }

        if let Some(observed) = outcome.observed_due_date {
            let cached = self.due_dates.read();
            if cached != Some(observed) {
                info!(%observed, ?cached, "updating cached due date from live observation");
                if let Err(err) = self.due_dates.write(observed) {
                    warn!(error = %err, "failed to persist due date, continuing unpersisted");
                }
            }
        }
    }

    /// Explicitly invalidate both cached records.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    pub fn clear_cache(&self) -> Result<(), StoreError> {
        self.due_dates.clear()?;
        self.run_states.clear()
    }

    /// The cached due date, if any (corruption reads as absence).
    #[must_use]
    pub fn cached_due_date(&self) -> Option<NaiveDate> {
        self.due_dates.read()
    }

    /// The last recorded attempt, if any (corruption reads as absence).
    #[must_use]
    pub fn last_run(&self) -> Option<RunStateRecord> {
        self.run_states.read()
    }

    fn civil_today(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }
}
