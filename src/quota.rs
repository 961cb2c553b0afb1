//! Free-tier question quota.
//!
//! The rule lives here once and is handed to both enforcement points: the
//! `/api/user/questions` handler (and the store's conditional increment) and
//! the client-side [`QuestionLimits`](crate::client::limits::QuestionLimits).

use std::fmt;
use std::sync::Arc;

/// Questions a non-paying user (anonymous or registered) may ask.
pub const FREE_QUESTION_LIMIT: u32 = 3;

/// Counter and entitlement of one asker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuotaStatus {
    pub questions_count: u32,
    pub is_paid_user: bool,
}

impl QuotaStatus {
    pub fn free(questions_count: u32) -> Self {
        Self {
            questions_count,
            is_paid_user: false,
        }
    }

    pub fn paid(questions_count: u32) -> Self {
        Self {
            questions_count,
            is_paid_user: true,
        }
    }
}

/// Questions left before the limit applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Unlimited,
    Limited(u32),
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remaining::Unlimited => f.write_str("غير محدود"),
            Remaining::Limited(n) => write!(f, "{n}"),
        }
    }
}

/// Decides whether an asker may submit another question.
pub trait QuotaPolicy: Send + Sync {
    /// Number of questions a non-paying asker may submit.
    fn free_limit(&self) -> u32;

    fn can_submit(&self, status: QuotaStatus) -> bool {
        status.is_paid_user || status.questions_count < self.free_limit()
    }

    fn remaining(&self, status: QuotaStatus) -> Remaining {
        if status.is_paid_user {
            Remaining::Unlimited
        } else {
            Remaining::Limited(self.free_limit().saturating_sub(status.questions_count))
        }
    }
}

/// The production policy: [`FREE_QUESTION_LIMIT`] free questions, paid is unlimited.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeTierPolicy;

impl QuotaPolicy for FreeTierPolicy {
    fn free_limit(&self) -> u32 {
        FREE_QUESTION_LIMIT
    }
}

pub type SharedPolicy = Arc<dyn QuotaPolicy>;

pub fn default_policy() -> SharedPolicy {
    Arc::new(FreeTierPolicy)
}

/// `is_paid_user || questions_count < FREE_QUESTION_LIMIT`
pub fn can_submit(is_paid_user: bool, questions_count: u32) -> bool {
    FreeTierPolicy.can_submit(QuotaStatus {
        questions_count,
        is_paid_user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_users_are_never_limited() {
        for count in [0, 2, 3, 4, 50, u32::MAX] {
            assert!(can_submit(true, count), "paid user blocked at {count}");
        }
    }

    #[test]
    fn free_users_stop_at_the_limit() {
        for count in 0..10 {
            assert_eq!(can_submit(false, count), count < 3, "count={count}");
        }
    }

    #[test]
    fn remaining_never_goes_negative() {
        let policy = FreeTierPolicy;
        assert_eq!(policy.remaining(QuotaStatus::free(0)), Remaining::Limited(3));
        assert_eq!(policy.remaining(QuotaStatus::free(2)), Remaining::Limited(1));
        assert_eq!(policy.remaining(QuotaStatus::free(7)), Remaining::Limited(0));
        assert_eq!(policy.remaining(QuotaStatus::paid(7)), Remaining::Unlimited);
        assert_eq!(Remaining::Unlimited.to_string(), "غير محدود");
    }

    struct SingleQuestion;

    impl QuotaPolicy for SingleQuestion {
        fn free_limit(&self) -> u32 {
            1
        }
    }

    #[test]
    fn custom_policies_only_override_the_limit() {
        let policy: SharedPolicy = Arc::new(SingleQuestion);
        assert!(policy.can_submit(QuotaStatus::free(0)));
        assert!(!policy.can_submit(QuotaStatus::free(1)));
        assert!(policy.can_submit(QuotaStatus::paid(1)));
    }
}
