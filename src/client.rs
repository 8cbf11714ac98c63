// ============================================================================
// PI-PAYMENTS - Payment Lifecycle Controller
// ============================================================================
// The sole entry point for callers. Orchestrates the payment lifecycle:
//
//   create -> store -> submit -> complete
//                  \-> cancel (allowed before submit)
//
// Submission consumes the account's ledger sequence number, so building,
// signing and submitting happen under a single lock on the account context.
// Create/fetch/complete/cancel are independent remote calls and only take
// the lock long enough to read balances.
// ============================================================================

use crate::account::PiAccount;
use crate::api::PiApiClient;
use crate::config::{Network, PiConfig, DEFAULT_BASE_FEE};
use crate::error::PaymentError;
use crate::horizon::HorizonClient;
use crate::payment::{PaymentArgs, PaymentRecord, PaymentStatus, PendingPayments};
use crate::strkey::decode_public_key;
use crate::transaction::TransactionBuilder;
use crate::Result;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// High-level client for app-to-user Pi payments.
pub struct PiClient {
    config: PiConfig,
    api: PiApiClient,
    horizon: HorizonClient,
    account: Mutex<PiAccount>,
    pending: Mutex<PendingPayments>,
}

impl PiClient {
    /// Connect with a platform API key, a wallet private seed and a network
    /// identifier ("Pi Network" or "Pi Testnet"; anything else falls back to
    /// testnet with a warning).
    ///
    /// Returns an error rather than aborting on a bad seed or an unreachable
    /// ledger, so embedding applications can recover.
    pub async fn connect(
        api_key: &str,
        wallet_private_seed: &str,
        network_id: &str,
    ) -> Result<Self> {
        let network = Network::from_name(network_id);
        let config = PiConfig::for_network(network);
        let horizon = HorizonClient::new(&config)?;
        let account = PiAccount::load(wallet_private_seed, network, &horizon).await?;
        let api = PiApiClient::new(api_key, &config)?;

        info!(
            "Connected to {} as {}",
            network.name(),
            account.account_id()
        );

        Ok(Self {
            config,
            api,
            horizon,
            account: Mutex::new(account),
            pending: Mutex::new(PendingPayments::new()),
        })
    }

    /// Client configuration.
    pub fn config(&self) -> &PiConfig {
        &self.config
    }

    // ==================== Payment Lifecycle ====================

    /// Create an app-to-user payment and return its platform identifier.
    ///
    /// Validates the fields and the wallet's fee headroom before issuing any
    /// request; the balance is re-fetched before the final check so the gate
    /// does not rely on state cached at load time. On success the record is
    /// held in the pending store until it is submitted.
    pub async fn create_payment(&self, args: &PaymentArgs) -> Result<String> {
        let amount = args.validate()?;

        {
            let mut account = self.account.lock().await;
            // Cached check first: an obviously underfunded payment fails
            // without touching the network.
            account.check_headroom(amount)?;
            account.refresh(&self.horizon).await?;
            account.check_headroom(amount)?;
        }

        let record = self.api.create_payment(args).await?;
        if record.identifier.is_empty() {
            return Err(PaymentError::Codec(
                "create response carried no payment identifier".to_string(),
            ));
        }

        let identifier = record.identifier.clone();
        info!("Created payment {} for uid {}", identifier, args.uid);
        self.pending.lock().await.insert(record);

        Ok(identifier)
    }

    /// Submit a pending payment to the ledger, returning the transaction hash.
    ///
    /// The payment must be in the pending store, unless `pending_payment`
    /// supplies a record created elsewhere (e.g. taken from
    /// [`incomplete_payments`](Self::incomplete_payments)). On success the
    /// identifier is removed from the store; on any failure it stays, with
    /// unchanged fields, so the submission can be retried.
    pub async fn submit_payment(
        &self,
        identifier: &str,
        pending_payment: Option<PaymentRecord>,
    ) -> Result<String> {
        let (record, from_store) = {
            let store = self.pending.lock().await;
            match store.get(identifier) {
                Some(record) => (record.clone(), true),
                None => (
                    pending_payment
                        .ok_or_else(|| PaymentError::UnknownPayment(identifier.to_string()))?,
                    false,
                ),
            }
        };
        let amount = record.validate_for_submission()?;

        // The payment declares which network it belongs to; submit there.
        let target = if record.network.is_empty() {
            self.config.network
        } else {
            Network::from_name(&record.network)
        };
        let cross_horizon = self.submission_horizon(&record, target)?;
        let horizon = cross_horizon.as_ref().unwrap_or(&self.horizon);

        // On the payment's own network the wallet's base fee is current; on a
        // cross-network submit ask that ledger for its fee.
        let cross_fee = match cross_horizon.as_ref() {
            Some(horizon) => Some(match horizon.fee_stats().await {
                Ok(stats) => stats.last_ledger_base_fee.parse().unwrap_or_else(|_| {
                    warn!(
                        "Unparsable base fee from {}; using {}",
                        target.name(),
                        DEFAULT_BASE_FEE
                    );
                    DEFAULT_BASE_FEE
                }),
                Err(e) => {
                    warn!(
                        "Fee stats unavailable on {}: {}; using {}",
                        target.name(),
                        e,
                        DEFAULT_BASE_FEE
                    );
                    DEFAULT_BASE_FEE
                }
            }),
            None => None,
        };

        // Sequence-number critical section: hold the account for the whole
        // refresh -> build -> sign -> submit window.
        let mut account = self.account.lock().await;

        // A store record may have been cancelled or submitted elsewhere while
        // we waited for the lock; a second submit would double-spend.
        if from_store && !self.pending.lock().await.contains(identifier) {
            return Err(PaymentError::UnknownPayment(identifier.to_string()));
        }

        account.check_headroom(amount)?;
        // Refresh from the ledger the transaction goes to; the sequence
        // number and balance on the other network are stale for this submit.
        account.refresh(horizon).await?;
        account.check_headroom(amount)?;

        let signed = TransactionBuilder::new(account.info(), target.passphrase())
            .fee(cross_fee.unwrap_or_else(|| account.base_fee()))
            .timeout(self.config.tx_timeout_secs)
            .payment(&record.to_address, &record.amount)
            // The identifier memo is how the platform correlates the ledger
            // transaction back to this payment.
            .memo_text(&record.identifier)
            .build()
            .map_err(|e| PaymentError::SubmissionFailed(e.to_string()))?
            .sign(account.keypair())
            .map_err(|e| PaymentError::SubmissionFailed(e.to_string()))?;

        let response = horizon.submit_transaction(&signed.envelope_xdr).await?;
        drop(account);

        self.pending.lock().await.remove(identifier);
        info!("Submitted payment {} as tx {}", identifier, response.hash);

        Ok(response.hash)
    }

    /// Horizon endpoint a payment submits through. `None` means the record
    /// targets the client's own network and the shared client is used.
    fn submission_horizon(
        &self,
        record: &PaymentRecord,
        target: Network,
    ) -> Result<Option<HorizonClient>> {
        if target == self.config.network {
            return Ok(None);
        }
        warn!(
            "Payment {} declares {}, client is on {}; submitting to {}",
            record.identifier,
            record.network,
            self.config.network.name(),
            target.name()
        );
        Ok(Some(HorizonClient::new(&PiConfig::for_network(target))?))
    }

    /// Mark a payment complete with the ledger transaction id.
    pub async fn complete_payment(&self, identifier: &str, txid: &str) -> Result<PaymentRecord> {
        let mut record = self.api.complete_payment(identifier, txid).await?;
        record.status = PaymentStatus::Completed;
        self.pending.lock().await.remove(identifier);
        info!("Completed payment {} with tx {}", identifier, txid);
        Ok(record)
    }

    /// Cancel a payment. The platform is authoritative: the identifier does
    /// not have to be known locally.
    pub async fn cancel_payment(&self, identifier: &str) -> Result<PaymentRecord> {
        let mut record = self.api.cancel_payment(identifier).await?;
        record.status = PaymentStatus::Cancelled;
        self.pending.lock().await.remove(identifier);
        info!("Cancelled payment {}", identifier);
        Ok(record)
    }

    /// Fetch a payment record from the platform.
    pub async fn payment(&self, identifier: &str) -> Result<PaymentRecord> {
        self.api.payment(identifier).await
    }

    /// List server payments the platform still considers incomplete.
    pub async fn incomplete_payments(&self) -> Result<Vec<PaymentRecord>> {
        self.api.incomplete_payments().await
    }

    // ==================== Balances ====================

    /// The wallet's native balance from the cached account snapshot.
    pub async fn balance(&self) -> f64 {
        self.account.lock().await.native_balance()
    }

    /// Re-fetch the wallet account and return the fresh native balance.
    pub async fn refresh_balance(&self) -> Result<f64> {
        let mut account = self.account.lock().await;
        account.refresh(&self.horizon).await?;
        Ok(account.native_balance())
    }

    /// Native balance of an arbitrary account.
    pub async fn balance_of(&self, public_key: &str) -> Result<f64> {
        decode_public_key(public_key)?;
        self.horizon.native_balance_of(public_key).await
    }

    // ==================== Pending Store ====================

    /// Number of created-but-unsubmitted payments held locally.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Whether a payment is locally pending submission.
    pub async fn has_pending(&self, identifier: &str) -> bool {
        self.pending.lock().await.contains(identifier)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horizon::{AccountInfo, Balance};
    use crate::payment::PaymentStatus;
    use crate::strkey::encode_public_key;
    use serde_json::json;

    fn test_client(native_balance: &str) -> PiClient {
        let config = PiConfig::testnet();
        let info = AccountInfo {
            id: encode_public_key(&[1u8; 32]),
            sequence: "100".to_string(),
            balances: vec![Balance {
                asset_type: "native".to_string(),
                balance: native_balance.to_string(),
                asset_code: String::new(),
            }],
        };
        PiClient {
            api: PiApiClient::new("test-key", &config).unwrap(),
            horizon: HorizonClient::new(&config).unwrap(),
            account: Mutex::new(PiAccount::for_tests(Network::Testnet, 100, info)),
            pending: Mutex::new(PendingPayments::new()),
            config,
        }
    }

    fn pending_record(id: &str, amount: &str) -> PaymentRecord {
        PaymentRecord {
            identifier: id.to_string(),
            amount: amount.to_string(),
            memo: "test".to_string(),
            metadata: json!({}),
            user_uid: "U1".to_string(),
            from_address: encode_public_key(&[1u8; 32]),
            to_address: encode_public_key(&[2u8; 32]),
            network: "Pi Testnet".to_string(),
            created_at: None,
            status: PaymentStatus::Created,
        }
    }

    #[tokio::test]
    async fn test_create_payment_rejects_invalid_args() {
        let client = test_client("10");
        let args = PaymentArgs {
            amount: "1".to_string(),
            memo: String::new(),
            metadata: json!({}),
            uid: "U1".to_string(),
        };

        let err = client.create_payment(&args).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidPaymentData(_)));
        assert_eq!(client.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_payment_rejects_insufficient_balance() {
        // Balance 0.5 cannot cover amount 1 plus fee; fails on the cached
        // check, before any network request.
        let client = test_client("0.5");
        let args = PaymentArgs {
            amount: "1".to_string(),
            memo: "test".to_string(),
            metadata: json!({}),
            uid: "U1".to_string(),
        };

        let err = client.create_payment(&args).await.unwrap_err();
        assert!(matches!(err, PaymentError::InsufficientBalance { .. }));
        assert_eq!(client.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_submit_unknown_payment() {
        let client = test_client("10");
        let err = client.submit_payment("missing", None).await.unwrap_err();
        match err {
            PaymentError::UnknownPayment(id) => assert_eq!(id, "missing"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_insufficient_balance_keeps_record() {
        let client = test_client("0.5");
        client.pending.lock().await.insert(pending_record("abc123", "1"));

        let err = client.submit_payment("abc123", None).await.unwrap_err();
        assert!(matches!(err, PaymentError::InsufficientBalance { .. }));

        // Failed submit leaves the record in place, fields unchanged
        let store = client.pending.lock().await;
        let kept = store.get("abc123").unwrap();
        assert_eq!(kept.amount, "1");
        assert_eq!(kept.status, PaymentStatus::Created);
    }

    #[tokio::test]
    async fn test_submit_override_is_validated() {
        let client = test_client("10");
        let mut record = pending_record("abc123", "1");
        record.to_address = String::new();

        let err = client
            .submit_payment("abc123", Some(record))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidPaymentData(_)));
    }

    #[tokio::test]
    async fn test_submit_override_insufficient_balance() {
        // An override record bypasses the store but not the balance gate
        let client = test_client("0.5");
        let err = client
            .submit_payment("abc123", Some(pending_record("abc123", "1")))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn test_submit_of_concurrently_removed_record_is_rejected() {
        // Two submits of the same store record race for the account lock; the
        // loser must see the record gone and bail instead of paying again.
        let client = std::sync::Arc::new(test_client("10"));
        client.pending.lock().await.insert(pending_record("abc123", "1"));

        let account_guard = client.account.lock().await;

        let contender = {
            let client = client.clone();
            tokio::spawn(async move { client.submit_payment("abc123", None).await })
        };
        // Let the contender clone the record and block on the account lock
        tokio::task::yield_now().await;

        client.pending.lock().await.remove("abc123");
        drop(account_guard);

        let err = contender.await.unwrap().unwrap_err();
        assert!(matches!(err, PaymentError::UnknownPayment(_)));
    }

    #[tokio::test]
    async fn test_submission_horizon_selects_target_endpoint() {
        let client = test_client("10");
        let record = pending_record("abc123", "1");

        // Same network: reuse the shared client
        assert!(client
            .submission_horizon(&record, Network::Testnet)
            .unwrap()
            .is_none());

        // Cross-network: a dedicated client pointed at the target's ledger,
        // used for the refresh and the submit alike
        let cross = client
            .submission_horizon(&record, Network::Mainnet)
            .unwrap()
            .unwrap();
        assert_eq!(cross.base_url(), PiConfig::mainnet().horizon_url);
    }

    #[tokio::test]
    async fn test_balance_reads_cached_snapshot() {
        let client = test_client("12.5");
        assert_eq!(client.balance().await, 12.5);
    }

    #[tokio::test]
    async fn test_balance_of_rejects_bad_address() {
        let client = test_client("10");
        let err = client.balance_of("not-an-address").await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAddress(_)));
    }
}
