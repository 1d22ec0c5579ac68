use crate::types::{Tier, UserId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Upper bound on a single cooldown so `now + duration` can never overflow.
const MAX_COOLDOWN_SECS: i64 = 10 * 365 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Refused; `remaining_secs` is rounded up and always > 0.
    Wait { remaining_secs: u64 },
}

impl Admission {
    pub fn is_allowed(self) -> bool {
        self == Admission::Allowed
    }

    /// The user-facing refusal text, if any.
    pub fn message(self) -> Option<String> {
        match self {
            Admission::Allowed => None,
            Admission::Wait { remaining_secs } => Some(format!(
                "Please wait {remaining_secs} seconds before sending another link."
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// CooldownGate
// ---------------------------------------------------------------------------

/// Per-user earliest start time of the next rate-limited job.
///
/// Empty at process start. Entries are written on successful completion and
/// dropped lazily the first time a check finds them expired.
#[derive(Debug, Default)]
pub struct CooldownGate {
    until: Mutex<HashMap<UserId, DateTime<Utc>>>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, user: UserId, tier: Tier, exempt: bool) -> Admission {
        self.check_at(user, tier, exempt, Utc::now())
    }

    pub fn check_at(&self, user: UserId, tier: Tier, exempt: bool, now: DateTime<Utc>) -> Admission {
        if !tier.is_rate_limited() || exempt {
            return Admission::Allowed;
        }

        let mut until = self.lock();
        match until.get(&user) {
            Some(end) if now < *end => {
                let millis = (*end - now).num_milliseconds().max(1) as u64;
                Admission::Wait {
                    remaining_secs: millis.div_ceil(1000),
                }
            }
            Some(_) => {
                until.remove(&user);
                Admission::Allowed
            }
            None => Admission::Allowed,
        }
    }

    /// Start (or restart) the user's cooldown, overwriting any prior value.
    pub fn set(&self, user: UserId, secs: u64) {
        self.set_at(user, secs, Utc::now());
    }

    pub fn set_at(&self, user: UserId, secs: u64, now: DateTime<Utc>) {
        let secs = i64::try_from(secs)
            .unwrap_or(MAX_COOLDOWN_SECS)
            .min(MAX_COOLDOWN_SECS);
        self.lock().insert(user, now + Duration::seconds(secs));
    }

    pub fn cooldown_until(&self, user: UserId) -> Option<DateTime<Utc>> {
        self.lock().get(&user).copied()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, DateTime<Utc>>> {
        self.until.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U: UserId = UserId(7);

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-11T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn fresh_user_is_allowed() {
        let gate = CooldownGate::new();
        assert_eq!(gate.check_at(U, Tier::Free, false, t0()), Admission::Allowed);
    }

    #[test]
    fn premium_ignores_cooldown() {
        let gate = CooldownGate::new();
        gate.set_at(U, 300, t0());
        assert!(gate.check_at(U, Tier::Premium, false, t0()).is_allowed());
    }

    #[test]
    fn exempt_user_ignores_cooldown() {
        let gate = CooldownGate::new();
        gate.set_at(U, 300, t0());
        assert!(gate.check_at(U, Tier::Free, true, t0()).is_allowed());
    }

    #[test]
    fn free_user_waits_until_cooldown_elapses() {
        let gate = CooldownGate::new();
        gate.set_at(U, 45, t0());

        for elapsed in [0, 1, 30, 44] {
            let now = t0() + Duration::seconds(elapsed);
            match gate.check_at(U, Tier::Free, false, now) {
                Admission::Wait { remaining_secs } => {
                    assert!(remaining_secs > 0 && remaining_secs <= 45);
                    assert_eq!(remaining_secs, (45 - elapsed) as u64);
                }
                Admission::Allowed => panic!("allowed after {elapsed}s"),
            }
        }

        let after = t0() + Duration::seconds(45);
        assert!(gate.check_at(U, Tier::Free, false, after).is_allowed());
    }

    #[test]
    fn remaining_rounds_up_sub_second() {
        let gate = CooldownGate::new();
        gate.set_at(U, 10, t0());
        let now = t0() + Duration::milliseconds(9_500);
        assert_eq!(
            gate.check_at(U, Tier::Free, false, now),
            Admission::Wait { remaining_secs: 1 }
        );
    }

    #[test]
    fn expired_entry_is_removed() {
        let gate = CooldownGate::new();
        gate.set_at(U, 5, t0());
        assert!(gate.cooldown_until(U).is_some());
        gate.check_at(U, Tier::Free, false, t0() + Duration::seconds(6));
        assert!(gate.cooldown_until(U).is_none());
    }

    #[test]
    fn set_overwrites_previous_value() {
        let gate = CooldownGate::new();
        gate.set_at(U, 300, t0());
        gate.set_at(U, 45, t0());
        assert_eq!(gate.cooldown_until(U), Some(t0() + Duration::seconds(45)));
    }

    #[test]
    fn users_are_independent() {
        let gate = CooldownGate::new();
        gate.set_at(U, 300, t0());
        assert!(gate.check_at(UserId(8), Tier::Free, false, t0()).is_allowed());
    }

    #[test]
    fn wait_message_carries_seconds() {
        let msg = Admission::Wait { remaining_secs: 12 }.message().unwrap();
        assert_eq!(msg, "Please wait 12 seconds before sending another link.");
        assert!(Admission::Allowed.message().is_none());
    }

    #[test]
    fn huge_duration_does_not_overflow() {
        let gate = CooldownGate::new();
        gate.set_at(U, u64::MAX, t0());
        assert!(!gate.check_at(U, Tier::Free, false, t0()).is_allowed());
    }
}
