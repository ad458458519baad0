//! Error taxonomy for a token launch
//!
//! Every failure is classified into a category so the binary can map it to
//! an exit code, and so log lines carry a stable label. `LaunchOutcome` is
//! the single result type the launch workflow hands back to its caller.

use thiserror::Error;

use crate::token_creator::LaunchReport;

/// High-level error categories for logs and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid or unreadable configuration
    Configuration,
    /// Missing or malformed secret key
    Wallet,
    /// Metadata file, upload or verification failure
    Metadata,
    /// RPC/network failure
    Rpc,
    /// Transaction building/submission failure
    Transaction,
}

impl ErrorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Wallet => "wallet",
            ErrorCategory::Metadata => "metadata",
            ErrorCategory::Rpc => "rpc",
            ErrorCategory::Transaction => "transaction",
        }
    }
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Wallet error: {message}")]
    Wallet { message: String },

    #[error("Metadata error: {message}")]
    Metadata { message: String, cause: Option<anyhow::Error> },

    #[error("RPC error: {message}")]
    Rpc { message: String, cause: Option<anyhow::Error> },

    #[error("Transaction error: {message}")]
    Transaction { message: String, cause: Option<anyhow::Error> },
}

impl LaunchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LaunchError::Configuration { .. } => ErrorCategory::Configuration,
            LaunchError::Wallet { .. } => ErrorCategory::Wallet,
            LaunchError::Metadata { .. } => ErrorCategory::Metadata,
            LaunchError::Rpc { .. } => ErrorCategory::Rpc,
            LaunchError::Transaction { .. } => ErrorCategory::Transaction,
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn wallet<S: Into<String>>(message: S) -> Self {
        Self::Wallet {
            message: message.into(),
        }
    }

    pub fn metadata<S: Into<String>>(message: S) -> Self {
        Self::Metadata {
            message: message.into(),
            cause: None,
        }
    }

    pub fn metadata_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Metadata {
            message: message.into(),
            cause: Some(source),
        }
    }

    pub fn rpc_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Rpc {
            message: message.into(),
            cause: Some(source),
        }
    }

    pub fn transaction<S: Into<String>>(message: S) -> Self {
        Self::Transaction {
            message: message.into(),
            cause: None,
        }
    }

    pub fn transaction_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Transaction {
            message: message.into(),
            cause: Some(source),
        }
    }

    /// Message plus the underlying error, for log lines and reports.
    pub fn detail(&self) -> String {
        let cause = match self {
            LaunchError::Metadata { cause, .. }
            | LaunchError::Rpc { cause, .. }
            | LaunchError::Transaction { cause, .. } => cause.as_ref(),
            _ => None,
        };
        match cause {
            Some(src) => format!("{}: {:#}", self, src),
            None => self.to_string(),
        }
    }
}

/// Extension trait to categorize anyhow errors coming out of the SDK adapters
pub trait ErrorContext {
    fn metadata_context<S: Into<String>>(self, message: S) -> LaunchError;

    fn rpc_context<S: Into<String>>(self, message: S) -> LaunchError;

    fn transaction_context<S: Into<String>>(self, message: S) -> LaunchError;
}

impl ErrorContext for anyhow::Error {
    fn metadata_context<S: Into<String>>(self, message: S) -> LaunchError {
        LaunchError::metadata_with_source(message, self)
    }

    fn rpc_context<S: Into<String>>(self, message: S) -> LaunchError {
        LaunchError::rpc_with_source(message, self)
    }

    fn transaction_context<S: Into<String>>(self, message: S) -> LaunchError {
        LaunchError::transaction_with_source(message, self)
    }
}

/// Best-effort steps that may fail without aborting the launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStep {
    /// create-mint + initialize-mint + create-metadata transaction
    CreateToken,
    /// associated token account lookup/creation
    TokenAccount,
    /// mint of the initial supply
    MintSupply,
}

impl LaunchStep {
    pub fn label(&self) -> &'static str {
        match self {
            LaunchStep::CreateToken => "create_token",
            LaunchStep::TokenAccount => "token_account",
            LaunchStep::MintSupply => "mint_supply",
        }
    }
}

#[derive(Debug)]
pub struct StepFailure {
    pub step: LaunchStep,
    pub error: LaunchError,
}

/// Result of one launch attempt.
#[derive(Debug)]
pub enum LaunchOutcome {
    /// Every step succeeded.
    Completed(LaunchReport),
    /// Aborted before any on-chain mutation was submitted.
    PreconditionFailed(LaunchError),
    /// At least one best-effort step failed; see `LaunchReport::failures`.
    PartiallyCompleted(LaunchReport),
}

impl LaunchOutcome {
    pub fn from_report(report: LaunchReport) -> Self {
        if report.failures.is_empty() {
            LaunchOutcome::Completed(report)
        } else {
            LaunchOutcome::PartiallyCompleted(report)
        }
    }

    pub fn report(&self) -> Option<&LaunchReport> {
        match self {
            LaunchOutcome::Completed(r) | LaunchOutcome::PartiallyCompleted(r) => Some(r),
            LaunchOutcome::PreconditionFailed(_) => None,
        }
    }

    /// 0 for (partial) completion, 2 for a failed precondition.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchOutcome::Completed(_) | LaunchOutcome::PartiallyCompleted(_) => 0,
            LaunchOutcome::PreconditionFailed(_) => 2,
        }
    }
}
