// ============================================================================
// PI-PAYMENTS - Error Types
// ============================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    // ==================== Wallet Errors ====================
    #[error("Invalid private seed format: {0}")]
    InvalidSeedFormat(String),

    #[error("Invalid account address: {0}")]
    InvalidAddress(String),

    // ==================== Payment Errors ====================
    #[error("Invalid payment data: {0}")]
    InvalidPaymentData(String),

    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: f64, available: f64 },

    #[error("Unknown payment: {0}")]
    UnknownPayment(String),

    // ==================== Remote Errors ====================
    #[error("Platform API rejected request (HTTP {status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Ledger server unreachable: {0}")]
    LedgerUnreachable(String),

    #[error("Transaction submission failed: {0}")]
    SubmissionFailed(String),

    // ==================== Ambient Errors ====================
    #[error("Network request failed: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Codec(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Codec(err.to_string())
    }
}
