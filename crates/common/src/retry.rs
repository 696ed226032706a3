//! # Cooldown-Gated Retry Policy
//!
//! Manual refresh of a proposal hits the ledger directly, so retries
//! must be bounded and spaced out. Instead of ad hoc timers, the gate
//! exposes an explicit result type: a caller asks to begin an attempt
//! and either gets the go-ahead or a structured refusal carrying the
//! remaining cooldown.
//!
//! ## Invariants
//!
//! 1. `attempts <= max_attempts`
//! 2. Two attempts are never admitted less than `cooldown_secs` apart
//! 3. All arithmetic is saturating; no overflow possible
//! 4. No panic, no unwrap, no expect
//! 5. Deterministic: the clock is passed in by the caller (no SystemTime)

use parking_lot::Mutex;

// ════════════════════════════════════════════════════════════════════════════
// TYPES
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the retry gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of admitted attempts (including the first).
    pub max_attempts: u32,
    /// Minimum spacing between admitted attempts, in seconds.
    pub cooldown_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            cooldown_secs: 30,
        }
    }
}

/// Outcome of asking the gate for an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    /// Whether the attempt was admitted.
    pub success: bool,
    /// Refusal reason; empty when admitted.
    pub reason: String,
    /// Seconds until the next attempt may be admitted. Zero when admitted
    /// or when the gate is exhausted.
    pub time_left_secs: u64,
}

impl RetryOutcome {
    fn admitted() -> Self {
        Self {
            success: true,
            reason: String::new(),
            time_left_secs: 0,
        }
    }

    fn refused(reason: &str, time_left_secs: u64) -> Self {
        Self {
            success: false,
            reason: reason.to_string(),
            time_left_secs,
        }
    }
}

#[derive(Debug, Default)]
struct GateState {
    attempts: u32,
    last_attempt_secs: Option<u64>,
}

/// Gate serializing retry attempts against a cooldown window.
#[derive(Debug)]
pub struct RetryGate {
    policy: RetryPolicy,
    state: Mutex<GateState>,
}

// ════════════════════════════════════════════════════════════════════════════
// GATE
// ════════════════════════════════════════════════════════════════════════════

impl RetryGate {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Ask to begin an attempt at `now_secs` (unix seconds).
    ///
    /// Admission records the attempt. Refusals do not consume an attempt.
    pub fn try_begin(&self, now_secs: u64) -> RetryOutcome {
        let mut state = self.state.lock();

        if state.attempts >= self.policy.max_attempts {
            return RetryOutcome::refused("retry attempts exhausted", 0);
        }

        if let Some(last) = state.last_attempt_secs {
            let elapsed = now_secs.saturating_sub(last);
            if elapsed < self.policy.cooldown_secs {
                let left = self.policy.cooldown_secs.saturating_sub(elapsed);
                return RetryOutcome::refused("cooldown active", left);
            }
        }

        state.attempts = state.attempts.saturating_add(1);
        state.last_attempt_secs = Some(now_secs);
        RetryOutcome::admitted()
    }

    /// Reset the gate after a successful refresh.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.attempts = 0;
        state.last_attempt_secs = None;
    }

    /// Attempts admitted so far.
    pub fn attempts(&self) -> u32 {
        self.state.lock().attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(max_attempts: u32, cooldown_secs: u64) -> RetryGate {
        RetryGate::new(RetryPolicy {
            max_attempts,
            cooldown_secs,
        })
    }

    #[test]
    fn first_attempt_is_admitted() {
        let g = gate(3, 30);
        let out = g.try_begin(1000);
        assert!(out.success);
        assert_eq!(out.time_left_secs, 0);
        assert_eq!(g.attempts(), 1);
    }

    #[test]
    fn cooldown_refuses_with_time_left() {
        let g = gate(3, 30);
        assert!(g.try_begin(1000).success);
        let out = g.try_begin(1010);
        assert!(!out.success);
        assert_eq!(out.reason, "cooldown active");
        assert_eq!(out.time_left_secs, 20);
        // Refusal must not consume an attempt.
        assert_eq!(g.attempts(), 1);
    }

    #[test]
    fn attempt_admitted_after_cooldown() {
        let g = gate(3, 30);
        assert!(g.try_begin(1000).success);
        assert!(g.try_begin(1030).success);
        assert_eq!(g.attempts(), 2);
    }

    #[test]
    fn exhaustion_after_max_attempts() {
        let g = gate(2, 10);
        assert!(g.try_begin(0).success);
        assert!(g.try_begin(10).success);
        let out = g.try_begin(20);
        assert!(!out.success);
        assert_eq!(out.reason, "retry attempts exhausted");
        assert_eq!(out.time_left_secs, 0);
    }

    #[test]
    fn reset_reopens_the_gate() {
        let g = gate(1, 10);
        assert!(g.try_begin(0).success);
        assert!(!g.try_begin(100).success);
        g.reset();
        assert!(g.try_begin(200).success);
    }

    #[test]
    fn clock_going_backwards_does_not_panic() {
        let g = gate(3, 30);
        assert!(g.try_begin(1000).success);
        // now < last_attempt: elapsed saturates to 0, full cooldown left.
        let out = g.try_begin(500);
        assert!(!out.success);
        assert_eq!(out.time_left_secs, 30);
    }
}
