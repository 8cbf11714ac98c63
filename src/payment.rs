// ============================================================================
// PI-PAYMENTS - Payment Data Model & Pending Store
// ============================================================================
// Typed request/response schema for platform payments, plus the in-memory
// store of payments created but not yet submitted to the ledger.
// ============================================================================

use crate::error::PaymentError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ledger text memos are capped at 28 bytes.
pub const MAX_MEMO_BYTES: usize = 28;

// ============================================================================
// PAYMENT TYPES
// ============================================================================

/// Fields for creating a new app-to-user payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentArgs {
    /// Payment amount as a decimal string, e.g. "3.14"
    pub amount: String,

    /// Developer memo shown to the user (at most 28 bytes)
    pub memo: String,

    /// Opaque app-specific metadata
    pub metadata: serde_json::Value,

    /// Pi user id of the recipient
    pub uid: String,
}

impl PaymentArgs {
    /// Validate required fields, returning the parsed amount.
    ///
    /// Runs before any network call: a rejected payment has no side effects.
    pub fn validate(&self) -> Result<f64> {
        if self.amount.trim().is_empty() {
            return Err(PaymentError::InvalidPaymentData("missing amount".to_string()));
        }
        let amount: f64 = self.amount.trim().parse().map_err(|_| {
            PaymentError::InvalidPaymentData(format!("unparsable amount {:?}", self.amount))
        })?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(PaymentError::InvalidPaymentData(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        if self.memo.is_empty() {
            return Err(PaymentError::InvalidPaymentData("missing memo".to_string()));
        }
        if self.memo.len() > MAX_MEMO_BYTES {
            return Err(PaymentError::InvalidPaymentData(format!(
                "memo exceeds {} bytes",
                MAX_MEMO_BYTES
            )));
        }
        if self.metadata.is_null() {
            return Err(PaymentError::InvalidPaymentData("missing metadata".to_string()));
        }
        if self.uid.is_empty() {
            return Err(PaymentError::InvalidPaymentData("missing uid".to_string()));
        }
        Ok(amount)
    }
}

/// Local payment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Created,
    Submitted,
    Completed,
    Cancelled,
}

/// A payment record as returned by the platform API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Platform-assigned unique payment identifier
    pub identifier: String,

    /// Payment amount in Pi, as a decimal string (the ledger convention).
    /// The platform encodes amounts as JSON numbers; both shapes are accepted.
    #[serde(default, deserialize_with = "amount_from_wire")]
    pub amount: String,

    /// Developer memo
    #[serde(default)]
    pub memo: String,

    /// Opaque app-specific metadata
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// Recipient's Pi user id
    #[serde(default)]
    pub user_uid: String,

    /// Paying wallet address
    #[serde(default)]
    pub from_address: String,

    /// Destination wallet address
    #[serde(default)]
    pub to_address: String,

    /// Network the payment is declared on ("Pi Network" / "Pi Testnet")
    #[serde(default)]
    pub network: String,

    /// Creation timestamp, as reported by the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Local lifecycle state; not part of the wire format.
    #[serde(skip)]
    pub status: PaymentStatus,
}

impl PaymentRecord {
    /// Validate that the record carries everything transaction building
    /// needs, returning the parsed amount.
    pub fn validate_for_submission(&self) -> Result<f64> {
        if self.identifier.is_empty() {
            return Err(PaymentError::InvalidPaymentData(
                "payment has no identifier".to_string(),
            ));
        }
        if self.to_address.is_empty() {
            return Err(PaymentError::InvalidPaymentData(format!(
                "payment {} has no recipient address",
                self.identifier
            )));
        }
        if self.memo.is_empty() {
            return Err(PaymentError::InvalidPaymentData(format!(
                "payment {} has no memo",
                self.identifier
            )));
        }
        let amount: f64 = self.amount.trim().parse().map_err(|_| {
            PaymentError::InvalidPaymentData(format!(
                "payment {} has unparsable amount {:?}",
                self.identifier, self.amount
            ))
        })?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(PaymentError::InvalidPaymentData(format!(
                "payment {} has invalid amount {}",
                self.identifier, self.amount
            )));
        }
        Ok(amount)
    }
}

/// Accept an amount as either a JSON string or a JSON number, carrying it
/// forward as the string the ledger codec parses exactly.
fn amount_from_wire<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "invalid amount: {}",
            other
        ))),
    }
}

// ============================================================================
// PENDING PAYMENT STORE
// ============================================================================

/// In-memory store of created-but-not-submitted payments, keyed by identifier.
///
/// Entries are inserted only after a successful create response and removed
/// only after a successful ledger submission, so every held record is in the
/// Created state. The store is not persisted across restarts.
#[derive(Debug, Default)]
pub struct PendingPayments {
    records: HashMap<String, PaymentRecord>,
}

impl PendingPayments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created payment, keyed by its identifier.
    pub fn insert(&mut self, mut record: PaymentRecord) {
        record.status = PaymentStatus::Created;
        self.records.insert(record.identifier.clone(), record);
    }

    pub fn get(&self, identifier: &str) -> Option<&PaymentRecord> {
        self.records.get(identifier)
    }

    pub fn remove(&mut self, identifier: &str) -> Option<PaymentRecord> {
        self.records.remove(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.records.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_args() -> PaymentArgs {
        PaymentArgs {
            amount: "1".to_string(),
            memo: "test".to_string(),
            metadata: json!({}),
            uid: "U1".to_string(),
        }
    }

    #[test]
    fn test_valid_args_pass() {
        assert_eq!(valid_args().validate().unwrap(), 1.0);
    }

    #[test]
    fn test_each_missing_field_rejected() {
        let mut args = valid_args();
        args.amount = String::new();
        assert!(matches!(args.validate(), Err(PaymentError::InvalidPaymentData(_))));

        let mut args = valid_args();
        args.memo = String::new();
        assert!(matches!(args.validate(), Err(PaymentError::InvalidPaymentData(_))));

        let mut args = valid_args();
        args.metadata = serde_json::Value::Null;
        assert!(matches!(args.validate(), Err(PaymentError::InvalidPaymentData(_))));

        let mut args = valid_args();
        args.uid = String::new();
        assert!(matches!(args.validate(), Err(PaymentError::InvalidPaymentData(_))));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let mut args = valid_args();
        args.amount = "0".to_string();
        assert!(args.validate().is_err());

        args.amount = "-2".to_string();
        assert!(args.validate().is_err());

        args.amount = "one pi".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_oversized_memo_rejected() {
        let mut args = valid_args();
        args.memo = "m".repeat(MAX_MEMO_BYTES + 1);
        assert!(args.validate().is_err());

        args.memo = "m".repeat(MAX_MEMO_BYTES);
        assert!(args.validate().is_ok());
    }

    fn record(id: &str) -> PaymentRecord {
        PaymentRecord {
            identifier: id.to_string(),
            amount: "1".to_string(),
            memo: "test".to_string(),
            metadata: json!({}),
            user_uid: "U1".to_string(),
            from_address: "GFROM".to_string(),
            to_address: "GTO".to_string(),
            network: "Pi Testnet".to_string(),
            created_at: None,
            status: PaymentStatus::Created,
        }
    }

    #[test]
    fn test_submission_validation() {
        assert_eq!(record("abc123").validate_for_submission().unwrap(), 1.0);

        let mut r = record("abc123");
        r.to_address = String::new();
        assert!(r.validate_for_submission().is_err());

        let mut r = record("abc123");
        r.amount = "0".to_string();
        assert!(r.validate_for_submission().is_err());

        let mut r = record("abc123");
        r.amount = "one pi".to_string();
        assert!(r.validate_for_submission().is_err());

        let r = record("");
        assert!(r.validate_for_submission().is_err());
    }

    #[test]
    fn test_store_insert_get_remove() {
        let mut store = PendingPayments::new();
        assert!(store.is_empty());

        store.insert(record("abc123"));
        assert_eq!(store.len(), 1);
        assert!(store.contains("abc123"));
        assert_eq!(store.get("abc123").unwrap().status, PaymentStatus::Created);

        let removed = store.remove("abc123").unwrap();
        assert_eq!(removed.identifier, "abc123");
        assert!(store.is_empty());
        assert!(store.remove("abc123").is_none());
    }

    #[test]
    fn test_record_deserializes_platform_payload() {
        let payload = json!({
            "identifier": "abc123",
            "amount": 1.5,
            "memo": "test",
            "metadata": {"order": 42},
            "user_uid": "U1",
            "from_address": "GFROM",
            "to_address": "GTO",
            "network": "Pi Testnet",
            "created_at": "2024-01-01T00:00:00Z",
            "direction": "app_to_user"
        });

        let record: PaymentRecord = serde_json::from_value(payload).unwrap();
        assert_eq!(record.identifier, "abc123");
        assert_eq!(record.amount, "1.5");
        assert_eq!(record.status, PaymentStatus::Created);
    }

    #[test]
    fn test_amount_accepted_as_string_or_number() {
        let as_number: PaymentRecord =
            serde_json::from_value(json!({"identifier": "p1", "amount": 0.41})).unwrap();
        assert_eq!(as_number.amount, "0.41");

        let as_string: PaymentRecord =
            serde_json::from_value(json!({"identifier": "p2", "amount": "0.41"})).unwrap();
        assert_eq!(as_string.amount, "0.41");

        let missing: PaymentRecord =
            serde_json::from_value(json!({"identifier": "p3"})).unwrap();
        assert!(missing.amount.is_empty());
    }
}
