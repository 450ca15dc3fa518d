//! Transient-failure retry policy.
//!
//! Invoked only for transient failures (chunk corruption, storage write
//! failure past the first chunk). Terminal conditions never come through
//! here. The budget counts a failure *streak*: any successful append
//! resets it to the configured initial value.

/// Outcome of consuming one transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The caller may resend the chunk; `remaining` is the budget left.
    Retry { remaining: u32 },
    /// The budget was already zero; the session must fail.
    Exhausted,
}

/// Decides, on a transient failure, whether the client may retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    initial_budget: u32,
}

impl RetryPolicy {
    pub fn new(initial_budget: u32) -> Self {
        Self { initial_budget }
    }

    /// Budget a session starts with, and is reset to after a successful
    /// append.
    pub fn initial_budget(&self) -> u32 {
        self.initial_budget
    }

    /// Consumes one failure from `budget`. Decrements if any budget
    /// remains, otherwise signals exhaustion without touching it.
    pub fn consume(&self, budget: &mut u32) -> RetryDecision {
        if *budget > 0 {
            *budget -= 1;
            RetryDecision::Retry { remaining: *budget }
        } else {
            RetryDecision::Exhausted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_decrements_until_exhausted() {
        let policy = RetryPolicy::new(2);
        let mut budget = policy.initial_budget();

        assert_eq!(policy.consume(&mut budget), RetryDecision::Retry { remaining: 1 });
        assert_eq!(policy.consume(&mut budget), RetryDecision::Retry { remaining: 0 });
        assert_eq!(policy.consume(&mut budget), RetryDecision::Exhausted);
        // Budget never goes negative.
        assert_eq!(budget, 0);
    }

    #[test]
    fn zero_budget_fails_immediately() {
        let policy = RetryPolicy::new(0);
        let mut budget = policy.initial_budget();
        assert_eq!(policy.consume(&mut budget), RetryDecision::Exhausted);
    }
}
