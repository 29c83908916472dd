use crate::stage::Stage;
use alloy_primitives::{TxHash, U256};
use client::WalletError;
use permit::PermitError;
use std::fmt;
use thiserror::Error;

/// Why a bank action or a permit deposit attempt stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("user rejected the request")]
    UserRejected,

    #[error("insufficient allowance: need {required}, have {available}")]
    InsufficientAllowance { required: U256, available: U256 },

    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("read failed: {0}")]
    ReadFailure(String),

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("transaction submission failed: {0}")]
    SubmissionError(String),

    #[error("signature failed: {0}")]
    SignatureError(String),

    #[error("receipt for {tx_hash} unavailable: {reason}")]
    ReceiptUnavailable { tx_hash: TxHash, reason: String },

    #[error("wallet is on chain {actual}, expected {expected}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("amount is zero")]
    ZeroAmount,

    #[error("another attempt is already in flight")]
    AttemptInFlight,

    #[error("invalid stage transition {from} -> {to}")]
    InvalidTransition { from: Stage, to: Stage },

    #[error(transparent)]
    Permit(#[from] PermitError),
}

/// Payload-free discriminant of [`FlowError`], used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UserRejected,
    InsufficientAllowance,
    InsufficientBalance,
    ReadFailure,
    Reverted,
    SubmissionError,
    SignatureError,
    ReceiptUnavailable,
    WrongChain,
    ZeroAmount,
    AttemptInFlight,
    InvalidTransition,
    Permit,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UserRejected => "user_rejected",
            Self::InsufficientAllowance => "insufficient_allowance",
            Self::InsufficientBalance => "insufficient_balance",
            Self::ReadFailure => "read_failure",
            Self::Reverted => "reverted",
            Self::SubmissionError => "submission_error",
            Self::SignatureError => "signature_error",
            Self::ReceiptUnavailable => "receipt_unavailable",
            Self::WrongChain => "wrong_chain",
            Self::ZeroAmount => "zero_amount",
            Self::AttemptInFlight => "attempt_in_flight",
            Self::InvalidTransition => "invalid_transition",
            Self::Permit => "permit",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FlowError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UserRejected => ErrorKind::UserRejected,
            Self::InsufficientAllowance { .. } => ErrorKind::InsufficientAllowance,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::ReadFailure(_) => ErrorKind::ReadFailure,
            Self::Reverted(_) => ErrorKind::Reverted,
            Self::SubmissionError(_) => ErrorKind::SubmissionError,
            Self::SignatureError(_) => ErrorKind::SignatureError,
            Self::ReceiptUnavailable { .. } => ErrorKind::ReceiptUnavailable,
            Self::WrongChain { .. } => ErrorKind::WrongChain,
            Self::ZeroAmount => ErrorKind::ZeroAmount,
            Self::AttemptInFlight => ErrorKind::AttemptInFlight,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Permit(_) => ErrorKind::Permit,
        }
    }

    /// Kind of the [`FlowError`] behind an action's report, if any.
    pub fn kind_of(report: &eyre::Report) -> Option<ErrorKind> {
        report.downcast_ref::<Self>().map(Self::kind)
    }
}

impl From<WalletError> for FlowError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Read(reason) => Self::ReadFailure(reason),
            WalletError::UserRejected => Self::UserRejected,
            WalletError::Signature(reason) => Self::SignatureError(reason),
            WalletError::Submission(reason) => Self::SubmissionError(reason),
            WalletError::Receipt { tx_hash, reason } => Self::ReceiptUnavailable { tx_hash, reason },
        }
    }
}
