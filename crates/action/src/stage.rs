//! Stages of a permit deposit attempt.
//!
//! ```text
//! Idle -> CheckingAllowance -> [ApprovingOnChain ->] AwaitingSignature
//!      -> SubmittingDeposit -> AwaitingReceipt -> Refreshing -> Idle
//! ```
//!
//! Every stage other than `Idle` may drop to `Failed`; `Failed` only returns
//! to `Idle`.

use crate::FlowError;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    CheckingAllowance,
    ApprovingOnChain,
    AwaitingSignature,
    SubmittingDeposit,
    AwaitingReceipt,
    Refreshing,
    Failed,
}

impl Stage {
    /// Whether `next` may directly follow `self`.
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::CheckingAllowance)
                | (Self::CheckingAllowance, Self::ApprovingOnChain)
                | (Self::CheckingAllowance, Self::AwaitingSignature)
                | (Self::ApprovingOnChain, Self::AwaitingSignature)
                | (Self::AwaitingSignature, Self::SubmittingDeposit)
                | (Self::SubmittingDeposit, Self::AwaitingReceipt)
                | (Self::AwaitingReceipt, Self::Refreshing)
                | (Self::Refreshing, Self::Idle)
                | (Self::Failed, Self::Idle)
        ) || (matches!(next, Self::Failed) && !matches!(self, Self::Idle | Self::Failed))
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CheckingAllowance => "checking_allowance",
            Self::ApprovingOnChain => "approving_on_chain",
            Self::AwaitingSignature => "awaiting_signature",
            Self::SubmittingDeposit => "submitting_deposit",
            Self::AwaitingReceipt => "awaiting_receipt",
            Self::Refreshing => "refreshing",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stage plus the stages of the latest attempt, starting with the
/// stage it began from.
#[derive(Debug, Clone)]
pub struct StageTracker {
    current: Stage,
    history: Vec<Stage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self {
            current: Stage::Idle,
            history: vec![Stage::Idle],
        }
    }
}

impl StageTracker {
    pub const fn current(&self) -> Stage {
        self.current
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn advance(&mut self, next: Stage) -> Result<(), FlowError> {
        if !self.current.can_advance_to(next) {
            return Err(FlowError::InvalidTransition {
                from: self.current,
                to: next,
            });
        }

        info!(from = %self.current, to = %next, "Stage change");
        self.current = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Failed` unless nothing is running.
    pub fn fail(&mut self) {
        if self.current.can_advance_to(Stage::Failed) {
            self.current = Stage::Failed;
            self.history.push(Stage::Failed);
        }
    }

    /// Start a new attempt, leaving a previous failure behind.
    ///
    /// History of earlier attempts is dropped.
    pub fn begin(&mut self) -> Result<(), FlowError> {
        self.history.clear();
        self.history.push(self.current);

        if self.current == Stage::Failed {
            self.advance(Stage::Idle)?;
        }
        self.advance(Stage::CheckingAllowance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_with_approval() {
        let mut tracker = StageTracker::default();
        for stage in [
            Stage::CheckingAllowance,
            Stage::ApprovingOnChain,
            Stage::AwaitingSignature,
            Stage::SubmittingDeposit,
            Stage::AwaitingReceipt,
            Stage::Refreshing,
            Stage::Idle,
        ] {
            tracker.advance(stage).unwrap();
        }

        assert_eq!(tracker.current(), Stage::Idle);
        assert_eq!(tracker.history().len(), 8);
    }

    #[test]
    fn test_signing_requires_allowance_check() {
        let mut tracker = StageTracker::default();
        let err = tracker.advance(Stage::AwaitingSignature).unwrap_err();

        assert_eq!(
            err,
            FlowError::InvalidTransition {
                from: Stage::Idle,
                to: Stage::AwaitingSignature
            }
        );
        assert_eq!(tracker.current(), Stage::Idle);
    }

    #[test]
    fn test_no_submission_before_signature() {
        assert!(!Stage::ApprovingOnChain.can_advance_to(Stage::SubmittingDeposit));
        assert!(!Stage::CheckingAllowance.can_advance_to(Stage::SubmittingDeposit));
    }

    #[test]
    fn test_failure_edges() {
        assert!(Stage::AwaitingReceipt.can_advance_to(Stage::Failed));
        assert!(!Stage::Idle.can_advance_to(Stage::Failed));
        assert!(!Stage::Failed.can_advance_to(Stage::Failed));
        assert!(Stage::Failed.can_advance_to(Stage::Idle));
        assert!(!Stage::Failed.can_advance_to(Stage::CheckingAllowance));
    }

    #[test]
    fn test_begin_after_failure() {
        let mut tracker = StageTracker::default();
        tracker.begin().unwrap();
        tracker.fail();
        assert_eq!(tracker.current(), Stage::Failed);

        tracker.begin().unwrap();
        assert_eq!(tracker.current(), Stage::CheckingAllowance);
        assert_eq!(
            tracker.history(),
            &[Stage::Failed, Stage::Idle, Stage::CheckingAllowance]
        );
    }

    #[test]
    fn test_history_kept_per_attempt() {
        let mut tracker = StageTracker::default();

        for _ in 0..3 {
            tracker.begin().unwrap();
            for stage in [
                Stage::AwaitingSignature,
                Stage::SubmittingDeposit,
                Stage::AwaitingReceipt,
                Stage::Refreshing,
                Stage::Idle,
            ] {
                tracker.advance(stage).unwrap();
            }
        }

        assert_eq!(
            tracker.history(),
            &[
                Stage::Idle,
                Stage::CheckingAllowance,
                Stage::AwaitingSignature,
                Stage::SubmittingDeposit,
                Stage::AwaitingReceipt,
                Stage::Refreshing,
                Stage::Idle,
            ]
        );
    }

    #[test]
    fn test_fail_while_idle_is_a_no_op() {
        let mut tracker = StageTracker::default();
        tracker.fail();
        assert_eq!(tracker.current(), Stage::Idle);
        assert_eq!(tracker.history(), &[Stage::Idle]);
    }
}
