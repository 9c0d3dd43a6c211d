//! Single-invocation orchestration.
//!
//! Ties together lock, decision, external client, and outcome recording for
//! one scheduled tick: acquire the state lock, ask the engine what to do,
//! drive the injected [`RenewalClient`] when an attempt is required, and
//! report the outcome back to the engine exactly once.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::engine::{AttemptOutcome, Decision, RenewalEngine};
use crate::state::{LockError, StateLock};

/// What a live check observed on the external account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// The renewal due date as shown by the external site.
    pub due_date: NaiveDate,
}

/// Failure reported by the external renewal client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The client could not be started at all.
    #[error("failed to launch renewal client: {detail}")]
    Launch {
        /// Launch failure detail.
        detail: String,
    },

    /// The client ran but reported failure.
    #[error("renewal client reported failure: {detail}")]
    Failed {
        /// Failure detail from the client.
        detail: String,
    },

    /// The client produced output this core could not interpret.
    #[error("could not parse renewal client output: {detail}")]
    Malformed {
        /// Parse failure detail.
        detail: String,
    },
}

/// Boundary to the out-of-scope browser-automation client.
///
/// `observe` logs in and reads the true renewal due date without mutating
/// anything; `renew` submits the renewal form and returns the refreshed due
/// date.
pub trait RenewalClient {
    /// Read the current due date from the live account.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the live check fails.
    fn observe(&self) -> Result<Observation, ClientError>;

    /// Submit the renewal and return the refreshed due date.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the renewal attempt fails.
    fn renew(&self) -> Result<Observation, ClientError>;
}

/// Outcome of one invocation, consumed by the CLI for exit codes and status
/// output.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// The decision taken at the start of the invocation.
    pub decision: Decision,

    /// Whether the external client was called at all.
    pub attempted: bool,

    /// Whether a real renewal was submitted and succeeded.
    pub renewed: bool,

    /// Whether the invocation as a whole succeeded (skips count).
    pub success: bool,

    /// Whether this invocation ran in dry-run mode.
    pub dry_run: bool,

    /// The due date known at the end of the invocation, if any.
    pub due_date: Option<NaiveDate>,

    /// Client failure detail, when the attempt failed.
    pub error: Option<String>,
}

impl RunReport {
    fn skipped(decision: Decision, due_date: Option<NaiveDate>, dry_run: bool) -> Self {
        Self {
            decision,
            attempted: false,
            renewed: false,
            success: true,
            dry_run,
            due_date,
            error: None,
        }
    }
}

/// Drives one renewal invocation end to end.
pub struct Renewer<'a> {
    engine: &'a RenewalEngine,
    client: &'a dyn RenewalClient,
    clock: &'a dyn Clock,
}

impl<'a> Renewer<'a> {
    /// Create a runner over an engine, a client, and a clock.
    #[must_use]
    pub fn new(
        engine: &'a RenewalEngine,
        client: &'a dyn RenewalClient,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            engine,
            client,
            clock,
        }
    }

    /// Run one invocation.
    ///
    /// The state lock is held from `decide()` through `record_outcome()`.
    /// Client failures are absorbed into the report as a failed attempt;
    /// only lock contention aborts the invocation.
    ///
    /// # Errors
    ///
    /// Returns a [`LockError`] when the state folder lock cannot be
    /// acquired.
    pub fn run(&self, dry_run: bool) -> Result<RunReport, LockError> {
        let _lock = StateLock::acquire(self.engine.state_folder())?;
        let now = self.clock.now_utc();
        let decision = self.engine.decide(now);
        info!(%decision, dry_run, "renewal decision");

        let report = match decision {
            Decision::SkipNotDue { .. } | Decision::SkipAlreadyDone => {
                RunReport::skipped(decision, self.engine.cached_due_date(), dry_run)
            },
            Decision::NeedsLiveCheck => self.discover_then_maybe_renew(decision, dry_run, now),
            Decision::NeedsRenewal { .. } | Decision::Forced => {
                self.attempt(decision, dry_run, now)
            },
        };
        Ok(report)
    }

    /// Live check to discover the due date, then renew in the same
    /// invocation when the discovered date puts today inside the window.
    fn discover_then_maybe_renew(
        &self,
        decision: Decision,
        dry_run: bool,
        now: chrono::DateTime<chrono::Utc>,
    ) -> RunReport {
        let observation = match self.client.observe() {
            Ok(observation) => observation,
            Err(err) => return self.failed(decision, dry_run, now, None, &err),
        };
        info!(due_date = %observation.due_date, "live check observed due date");

        if !dry_run && self.engine.within_window(now, observation.due_date) {
            match self.client.renew() {
                Ok(after) => self.renewed(decision, now, after),
                Err(err) => self.failed(decision, false, now, Some(observation.due_date), &err),
            }
        } else {
            // Observation only: a dry-run record, whatever the flag said.
            self.engine.record_outcome(
                AttemptOutcome {
                    observed_due_date: Some(observation.due_date),
                    success: true,
                    dry_run: true,
                },
                now,
            );
            RunReport {
                decision,
                attempted: true,
                renewed: false,
                success: true,
                dry_run: true,
                due_date: Some(observation.due_date),
                error: None,
            }
        }
    }

    /// A due renewal: observe only under `dry_run`, otherwise submit.
    fn attempt(
        &self,
        decision: Decision,
        dry_run: bool,
        now: chrono::DateTime<chrono::Utc>,
    ) -> RunReport {
        if dry_run {
            match self.client.observe() {
                Ok(observation) => {
                    self.engine.record_outcome(
                        AttemptOutcome {
                            observed_due_date: Some(observation.due_date),
                            success: true,
                            dry_run: true,
                        },
                        now,
                    );
                    RunReport {
                        decision,
                        attempted: true,
                        renewed: false,
                        success: true,
                        dry_run: true,
                        due_date: Some(observation.due_date),
                        error: None,
                    }
                },
                Err(err) => self.failed(decision, true, now, None, &err),
            }
        } else {
            match self.client.renew() {
                Ok(after) => self.renewed(decision, now, after),
                Err(err) => self.failed(decision, false, now, None, &err),
            }
        }
    }

    fn renewed(
        &self,
        decision: Decision,
        now: chrono::DateTime<chrono::Utc>,
        after: Observation,
    ) -> RunReport {
        info!(due_date = %after.due_date, "renewal submitted successfully");
        self.engine.record_outcome(
            AttemptOutcome {
                observed_due_date: Some(after.due_date),
                success: true,
                dry_run: false,
            },
            now,
        );
        RunReport {
            decision,
            attempted: true,
            renewed: true,
            success: true,
            dry_run: false,
            due_date: Some(after.due_date),
            error: None,
        }
    }

    fn failed(
        &self,
        decision: Decision,
        dry_run: bool,
        now: chrono::DateTime<chrono::Utc>,
        observed: Option<NaiveDate>,
        err: &ClientError,
    ) -> RunReport {
        warn!(error = %err, "renewal attempt failed");
        self.engine.record_outcome(
            AttemptOutcome {
                observed_due_date: observed,
                success: false,
                dry_run,
            },
            now,
        );
        RunReport {
            decision,
            attempted: true,
            renewed: false,
            success: false,
            dry_run,
            due_date: observed.or_else(|| self.engine.cached_due_date()),
            error: Some(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::path::Path;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::state::DueDateStore;

    struct FakeClient {
        due_date: NaiveDate,
        observe_calls: Cell<u32>,
        renew_calls: Cell<u32>,
        fail_renew: bool,
        log: RefCell<Vec<&'static str>>,
    }

    impl FakeClient {
        fn new(due_date: &str) -> Self {
            Self {
                due_date: due_date.parse().unwrap(),
                observe_calls: Cell::new(0),
                renew_calls: Cell::new(0),
                fail_renew: false,
                log: RefCell::new(Vec::new()),
            }
        }
    }

    impl RenewalClient for FakeClient {
        fn observe(&self) -> Result<Observation, ClientError> {
            self.observe_calls.set(self.observe_calls.get() + 1);
            self.log.borrow_mut().push("observe");
            Ok(Observation {
                due_date: self.due_date,
            })
        }

        fn renew(&self) -> Result<Observation, ClientError> {
            self.renew_calls.set(self.renew_calls.get() + 1);
            self.log.borrow_mut().push("renew");
            if self.fail_renew {
                return Err(ClientError::Failed {
                    detail: "portal rejected the renewal form".to_string(),
                });
            }
            Ok(Observation {
                due_date: self.due_date,
            })
        }
    }

    fn engine_in(dir: &Path, days: u32) -> RenewalEngine {
        RenewalEngine::new(dir, chrono_tz::UTC, days, false)
    }

    fn instant(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn skip_decisions_never_touch_the_client() {
        let temp = tempfile::tempdir().expect("tempdir");
        let engine = engine_in(temp.path(), 23);
        DueDateStore::new(temp.path())
            .write("2026-06-01".parse().unwrap())
            .expect("seed due date");
        let client = FakeClient::new("2026-06-01");
        let clock = FixedClock::new(instant("2025-11-22T09:00:00Z"));

        let report = Renewer::new(&engine, &client, &clock)
            .run(false)
            .expect("run");

        assert!(matches!(report.decision, Decision::SkipNotDue { .. }));
        assert!(report.success);
        assert!(!report.attempted);
        assert_eq!(client.observe_calls.get(), 0);
        assert_eq!(client.renew_calls.get(), 0);
    }

    #[test]
    fn empty_cache_discovers_then_renews_when_in_window() {
        let temp = tempfile::tempdir().expect("tempdir");
        let engine = engine_in(temp.path(), 23);
        let client = FakeClient::new("2025-12-14");
        let clock = FixedClock::new(instant("2025-11-22T09:00:00Z"));

        let report = Renewer::new(&engine, &client, &clock)
            .run(false)
            .expect("run");

        assert_eq!(report.decision, Decision::NeedsLiveCheck);
        assert!(report.renewed);
        assert_eq!(*client.log.borrow(), vec!["observe", "renew"]);
        assert_eq!(engine.cached_due_date(), Some("2025-12-14".parse().unwrap()));
        let last = engine.last_run().expect("run state recorded");
        assert!(last.success);
        assert!(!last.dry_run);
    }

    #[test]
    fn empty_cache_out_of_window_only_observes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let engine = engine_in(temp.path(), 23);
        let client = FakeClient::new("2026-06-01");
        let clock = FixedClock::new(instant("2025-11-22T09:00:00Z"));

        let report = Renewer::new(&engine, &client, &clock)
            .run(false)
            .expect("run");

        assert!(report.attempted);
        assert!(!report.renewed);
        assert!(report.dry_run);
        assert_eq!(client.renew_calls.get(), 0);
        assert_eq!(engine.cached_due_date(), Some("2026-06-01".parse().unwrap()));
        assert!(engine.last_run().expect("run state").dry_run);
    }

    #[test]
    fn dry_run_due_renewal_observes_instead_of_renewing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let engine = engine_in(temp.path(), 23);
        DueDateStore::new(temp.path())
            .write("2025-12-14".parse().unwrap())
            .expect("seed due date");
        let client = FakeClient::new("2025-12-14");
        let clock = FixedClock::new(instant("2025-11-22T09:00:00Z"));

        let report = Renewer::new(&engine, &client, &clock)
            .run(true)
            .expect("run");

        assert!(matches!(report.decision, Decision::NeedsRenewal { .. }));
        assert!(report.success);
        assert!(report.dry_run);
        assert_eq!(client.renew_calls.get(), 0);
        assert_eq!(client.observe_calls.get(), 1);
    }

    #[test]
    fn failed_renewal_is_recorded_and_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let engine = engine_in(temp.path(), 23);
        DueDateStore::new(temp.path())
            .write("2025-12-14".parse().unwrap())
            .expect("seed due date");
        let mut client = FakeClient::new("2025-12-14");
        client.fail_renew = true;
        let clock = FixedClock::new(instant("2025-11-22T09:00:00Z"));

        let report = Renewer::new(&engine, &client, &clock)
            .run(false)
            .expect("run");

        assert!(!report.success);
        assert!(report.error.is_some());
        let last = engine.last_run().expect("run state recorded");
        assert!(!last.success);
        assert!(!last.dry_run);
        // A failed run today must not suppress the next attempt.
        let clock = FixedClock::new(instant("2025-11-22T15:00:00Z"));
        let ok_client = FakeClient::new("2025-12-14");
        let retry = Renewer::new(&engine, &ok_client, &clock)
            .run(false)
            .expect("run");
        assert!(retry.renewed);
    }

    #[test]
    fn held_lock_aborts_with_already_running() {
        let temp = tempfile::tempdir().expect("tempdir");
        let engine = engine_in(temp.path(), 23);
        let client = FakeClient::new("2025-12-14");
        let clock = FixedClock::new(instant("2025-11-22T09:00:00Z"));
        let held = StateLock::acquire(temp.path()).expect("hold lock");

        let err = Renewer::new(&engine, &client, &clock)
            .run(false)
            .expect_err("must fail fast");
        assert!(matches!(err, LockError::AlreadyRunning { .. }), "got {err:?}");
        assert_eq!(client.observe_calls.get(), 0);
        drop(held);
    }
}
