// ============================================================================
// PI-PAYMENTS - Horizon Ledger Client
// ============================================================================
// HTTP client for the Pi blockchain's Horizon servers.
// Covers the surface this crate needs: account lookup, fee stats and
// transaction submission.
// ============================================================================

use crate::config::PiConfig;
use crate::error::PaymentError;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// DATA TYPES
// ============================================================================

/// Account balance entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    /// Asset type: "native" for Pi, "credit_alphanum4/12" for issued assets
    pub asset_type: String,

    /// Balance amount as string (the ledger uses strings for precision)
    pub balance: String,

    /// Asset code (empty for native Pi)
    #[serde(default)]
    pub asset_code: String,
}

impl Balance {
    /// Check if this is the native asset
    pub fn is_native(&self) -> bool {
        self.asset_type == "native"
    }

    /// Get balance as f64
    pub fn amount(&self) -> f64 {
        self.balance.parse().unwrap_or(0.0)
    }
}

/// Ledger account information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Account public key (G... address)
    pub id: String,

    /// Current sequence number
    pub sequence: String,

    /// Account balances
    pub balances: Vec<Balance>,
}

impl AccountInfo {
    /// Native Pi balance. An account with no native entry holds zero,
    /// which is a valid state, not an error.
    pub fn native_balance(&self) -> f64 {
        self.balances
            .iter()
            .find(|b| b.is_native())
            .map(|b| b.amount())
            .unwrap_or(0.0)
    }
}

/// Fee stats response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeStats {
    pub last_ledger_base_fee: String,
}

/// Transaction submission result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub hash: String,
    #[serde(default)]
    pub ledger: u64,
}

/// Horizon error response (trimmed to what submission diagnostics need)
#[derive(Debug, Clone, Deserialize)]
struct HorizonErrorResponse {
    title: Option<String>,
    detail: Option<String>,
    extras: Option<HorizonErrorExtras>,
}

#[derive(Debug, Clone, Deserialize)]
struct HorizonErrorExtras {
    result_codes: Option<ResultCodes>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResultCodes {
    transaction: Option<String>,
    operations: Option<Vec<String>>,
}

// ============================================================================
// HORIZON CLIENT
// ============================================================================

/// Client for a Pi Horizon ledger server
pub struct HorizonClient {
    base_url: String,
    http: Client,
}

impl HorizonClient {
    /// Create a new Horizon client for the configured network.
    pub fn new(config: &PiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PaymentError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.horizon_url.clone(),
            http,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Load account information by address.
    pub async fn load_account(&self, address: &str) -> Result<AccountInfo> {
        let url = format!("{}/accounts/{}", self.base_url, address);

        debug!("Loading account: {}", address);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PaymentError::LedgerUnreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let account: AccountInfo = response.json().await?;
            Ok(account)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(PaymentError::LedgerUnreachable(format!(
                "account {}: HTTP {}: {}",
                address, status, body
            )))
        }
    }

    /// Native balance of an arbitrary account.
    pub async fn native_balance_of(&self, address: &str) -> Result<f64> {
        let account = self.load_account(address).await?;
        Ok(account.native_balance())
    }

    /// Fetch the network's current fee stats.
    pub async fn fee_stats(&self) -> Result<FeeStats> {
        let url = format!("{}/fee_stats", self.base_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PaymentError::LedgerUnreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(PaymentError::LedgerUnreachable(format!(
                "fee stats: HTTP {}: {}",
                status, body
            )))
        }
    }

    /// Submit a signed transaction envelope.
    ///
    /// Any failure maps to `SubmissionFailed` with the ledger's result codes
    /// preserved, so callers can retry without losing the rejection reason.
    pub async fn submit_transaction(&self, envelope_xdr: &str) -> Result<TransactionResponse> {
        let url = format!("{}/transactions", self.base_url);

        debug!("Submitting transaction");

        let response = self
            .http
            .post(&url)
            .form(&[("tx", envelope_xdr)])
            .send()
            .await
            .map_err(|e| PaymentError::SubmissionFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let tx: TransactionResponse = response
                .json()
                .await
                .map_err(|e| PaymentError::SubmissionFailed(e.to_string()))?;
            debug!("Transaction accepted: {}", tx.hash);
            return Ok(tx);
        }

        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<HorizonErrorResponse>(&body)
            .ok()
            .map(|err| describe_rejection(&err))
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

        warn!("Transaction rejected: {}", reason);
        Err(PaymentError::SubmissionFailed(reason))
    }
}

fn describe_rejection(err: &HorizonErrorResponse) -> String {
    if let Some(codes) = err.extras.as_ref().and_then(|e| e.result_codes.as_ref()) {
        return format!("tx: {:?}, ops: {:?}", codes.transaction, codes.operations);
    }
    err.detail
        .clone()
        .or_else(|| err.title.clone())
        .unwrap_or_else(|| "unknown rejection".to_string())
}
