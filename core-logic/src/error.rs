//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidRpcUrl { url: String, reason: String },

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Credential and address validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("Invalid private key format: expected 0x-prefixed hex string")]
    InvalidKeyFormat,

    #[error("Private key has wrong length: expected 64 hex chars, got {length}")]
    InvalidKeyLength { length: usize },

    #[error("Invalid address: '{value}'")]
    InvalidAddress { value: String },

    #[error("Entry '{entry}' has no matching token contract")]
    UnpairedEntry { entry: String },
}

/// Network and RPC-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("No responsive RPC endpoint (tried {tried})")]
    NoResponsiveEndpoint { tried: usize },
}

/// Decimal precision lookup failed for a token.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("decimals() query for {token} via {endpoint} failed: {reason}")]
pub struct ContractQueryError {
    pub token: String,
    pub endpoint: String,
    pub reason: String,
}

/// Why a single transfer attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    Network,
    Nonce,
    InsufficientBalance,
    ConfirmationTimeout,
    Reverted,
    Other,
}

impl FailureReason {
    /// Maps provider error text onto a failure reason.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();

        const NONCE: [&str; 4] = [
            "nonce too low",
            "nonce too high",
            "already known",
            "replacement transaction underpriced",
        ];
        const BALANCE: [&str; 3] = [
            "insufficient funds",
            "exceeds balance",
            "insufficient balance",
        ];
        const TIMEOUT: [&str; 2] = ["timeout", "timed out"];
        const NETWORK: [&str; 8] = [
            "connection refused",
            "connection reset",
            "error sending request",
            "network error",
            "service unavailable",
            "too many requests",
            "429",
            "502",
        ];

        if NONCE.iter().any(|p| msg.contains(p)) {
            FailureReason::Nonce
        } else if BALANCE.iter().any(|p| msg.contains(p)) {
            FailureReason::InsufficientBalance
        } else if TIMEOUT.iter().any(|p| msg.contains(p)) {
            FailureReason::ConfirmationTimeout
        } else if NETWORK.iter().any(|p| msg.contains(p)) {
            FailureReason::Network
        } else {
            FailureReason::Other
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureReason::Network => "network",
            FailureReason::Nonce => "nonce",
            FailureReason::InsufficientBalance => "insufficient-balance",
            FailureReason::ConfirmationTimeout => "confirmation-timeout",
            FailureReason::Reverted => "reverted",
            FailureReason::Other => "other",
        };
        f.write_str(s)
    }
}

/// A single transfer attempt failed. Retrying is the caller's job.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("transfer failed ({reason}): {message}")]
pub struct TransferError {
    pub reason: FailureReason,
    pub message: String,
}

impl TransferError {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    /// Builds an error whose reason is derived from the message text.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            reason: FailureReason::classify(&message),
            message,
        }
    }
}

/// Errors that stop a dispatch invocation before any transfer is sent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Recipient list is empty")]
    EmptyRecipientList,

    #[error("No accounts configured for dispatch")]
    NoAccounts,

    #[error(transparent)]
    ContractQuery(#[from] ContractQueryError),

    #[error(transparent)]
    InvalidRange(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_nonce_errors() {
        assert_eq!(
            FailureReason::classify("(code: -32000, message: nonce too low)"),
            FailureReason::Nonce
        );
        assert_eq!(
            FailureReason::classify("Replacement transaction underpriced"),
            FailureReason::Nonce
        );
    }

    #[test]
    fn classify_balance_and_network() {
        assert_eq!(
            FailureReason::classify("insufficient funds for gas * price + value"),
            FailureReason::InsufficientBalance
        );
        assert_eq!(
            FailureReason::classify("ERC20: transfer amount exceeds balance"),
            FailureReason::InsufficientBalance
        );
        assert_eq!(
            FailureReason::classify("error sending request for url"),
            FailureReason::Network
        );
        assert_eq!(
            FailureReason::classify("Request TIMED OUT"),
            FailureReason::ConfirmationTimeout
        );
        assert_eq!(FailureReason::classify("weird"), FailureReason::Other);
    }

    #[test]
    fn dispatch_error_wraps_range_errors() {
        let err: DispatchError = ConfigError::InvalidValue {
            field: "amount".to_string(),
            reason: "no amount fits".to_string(),
        }
        .into();
        assert!(matches!(err, DispatchError::InvalidRange(_)));
        assert_eq!(err.to_string(), "Invalid value for 'amount': no amount fits");
    }

    #[test]
    fn transfer_error_from_message_sets_reason() {
        let err = TransferError::from_message("429 Too Many Requests");
        assert_eq!(err.reason, FailureReason::Network);
        assert!(err.to_string().contains("network"));
    }
}
