// ============================================================================
// PI-PAYMENTS - Pi Network App-to-User Payments
// ============================================================================
// Client library for issuing app-to-user Pi payments against the Pi
// platform API and the Pi blockchain.
//
// Flow:
// - Connect with an API key, wallet private seed and network id
// - Create a payment (validated, balance-checked, held pending locally)
// - Submit it (signed native payment transaction, memo = payment id)
// - Complete it with the transaction hash, or cancel it
// ============================================================================

pub mod account;
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod horizon;
pub mod payment;
pub mod strkey;
pub mod transaction;

pub use account::PiAccount;
pub use api::PiApiClient;
pub use client::PiClient;
pub use config::{Network, PiConfig};
pub use error::PaymentError;
pub use horizon::{AccountInfo, Balance, HorizonClient};
pub use payment::{PaymentArgs, PaymentRecord, PaymentStatus, PendingPayments};
pub use transaction::{SignedTransaction, TransactionBuilder};

/// Re-export for convenience
pub type Result<T> = std::result::Result<T, PaymentError>;
