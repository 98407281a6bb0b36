use alloy_primitives::TxHash;
use alloy_transport::TransportError;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// EIP-1193 "User Rejected Request" provider error code.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Errors raised by wallet and contract interactions.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WaveError {
    #[error("no wallet provider detected, install a wallet or configure `rpc_url`")]
    NoWalletProvider,
    #[error("request rejected by the wallet: {0}")]
    UserRejected(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("transaction {0} reverted")]
    TransactionReverted(TxHash),
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl WaveError {
    pub fn network(err: impl fmt::Display) -> Self {
        Self::Network(err.to_string())
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState(reason.into())
    }

    /// Returns the fieldless kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoWalletProvider => ErrorKind::NoWalletProvider,
            Self::UserRejected(_) => ErrorKind::UserRejected,
            Self::Network(_) => ErrorKind::NetworkError,
            Self::TransactionReverted(_) => ErrorKind::TransactionReverted,
            Self::InvalidState(_) => ErrorKind::InvalidState,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected(_))
    }
}

impl From<TransportError> for WaveError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) if payload.code == USER_REJECTED_CODE => {
                Self::UserRejected(payload.message.to_string())
            }
            _ => Self::network(err),
        }
    }
}

impl From<alloy_contract::Error> for WaveError {
    fn from(err: alloy_contract::Error) -> Self {
        match err {
            alloy_contract::Error::TransportError(err) => err.into(),
            err => Self::network(err),
        }
    }
}

/// Fieldless mirror of [`WaveError`], for rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NoWalletProvider,
    UserRejected,
    NetworkError,
    TransactionReverted,
    InvalidState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoWalletProvider => "no wallet provider",
            Self::UserRejected => "rejected",
            Self::NetworkError => "network error",
            Self::TransactionReverted => "reverted",
            Self::InvalidState => "invalid state",
        })
    }
}

/// The error recorded on a failed lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&WaveError> for ErrorInfo {
    fn from(err: &WaveError) -> Self {
        Self { kind: err.kind(), message: err.to_string() }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Errors raised while loading [`WaveConfig`](crate::WaveConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Extract(#[from] Box<figment::Error>),
    #[error("failed to read ABI file {path}: {source}")]
    ReadAbi { path: PathBuf, source: std::io::Error },
    #[error("failed to parse ABI file {path}: {source}")]
    ParseAbi { path: PathBuf, source: serde_json::Error },
    #[error("ABI does not declare `{0}`")]
    MissingFunction(&'static str),
    #[error("ABI declares no `{expected}`, but `with_message` selects it")]
    WaveSignature { expected: &'static str },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}
