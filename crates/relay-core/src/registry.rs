use crate::types::UserId;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Per-user job state.
///
/// `CancelRequested` still counts as occupied: the running loop has not yet
/// observed the request, so a new job must wait for its slot to be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Running,
    CancelRequested,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::CancelRequested => "cancel_requested",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JobRegistry
// ---------------------------------------------------------------------------

/// Tracks which users have a job in flight. At most one job per user.
///
/// The map is empty at process start and entries are never removed; an idle
/// user is simply an entry in `Idle` (or no entry at all).
#[derive(Debug, Default)]
pub struct JobRegistry {
    states: Mutex<HashMap<UserId, JobState>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically move `user` from `Idle` to `Running`.
    ///
    /// Returns `None` without touching the state if a job is already running
    /// (or still winding down after a cancel). The returned guard releases the
    /// slot when dropped.
    pub fn try_acquire(&self, user: UserId) -> Option<JobGuard<'_>> {
        let mut states = self.lock();
        let state = states.entry(user).or_default();
        if *state != JobState::Idle {
            return None;
        }
        *state = JobState::Running;
        Some(JobGuard {
            registry: self,
            user,
        })
    }

    /// Mark `user` idle. Idempotent.
    pub fn release(&self, user: UserId) {
        self.lock().insert(user, JobState::Idle);
    }

    /// True unless a job for `user` is running and has not been asked to stop.
    pub fn is_cancelled(&self, user: UserId) -> bool {
        self.state(user) != JobState::Running
    }

    /// Ask the running job of `user` to stop at its next poll.
    ///
    /// Returns `false` when there is nothing to cancel.
    pub fn request_cancel(&self, user: UserId) -> bool {
        let mut states = self.lock();
        match states.get_mut(&user) {
            Some(state) if *state == JobState::Running => {
                *state = JobState::CancelRequested;
                true
            }
            _ => false,
        }
    }

    pub fn state(&self, user: UserId) -> JobState {
        self.lock().get(&user).copied().unwrap_or_default()
    }

    pub fn active_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|s| **s != JobState::Idle)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, JobState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// JobGuard
// ---------------------------------------------------------------------------

/// Proof that the holder owns the user's job slot. Dropping it releases the
/// slot, on every exit path.
#[derive(Debug)]
pub struct JobGuard<'a> {
    registry: &'a JobRegistry,
    user: UserId,
}

impl JobGuard<'_> {
    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn is_cancelled(&self) -> bool {
        self.registry.is_cancelled(self.user)
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(self.user);
    }
}
