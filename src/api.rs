// ============================================================================
// PI-PAYMENTS - Platform API Gateway
// ============================================================================
// Authenticated HTTP client for the Pi platform payments REST API.
// Every request carries `Authorization: Key <apiKey>`; bodies are encoded
// structurally, never spliced together as strings.
// ============================================================================

use crate::config::PiConfig;
use crate::error::PaymentError;
use crate::payment::{PaymentArgs, PaymentRecord};
use crate::Result;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// WIRE ENVELOPES
// ============================================================================

#[derive(Serialize)]
struct CreateEnvelope<'a> {
    payment: &'a PaymentArgs,
}

#[derive(Serialize)]
struct CompleteEnvelope<'a> {
    txid: &'a str,
}

#[derive(Deserialize)]
struct IncompleteEnvelope {
    incomplete_server_payments: Vec<PaymentRecord>,
}

// ============================================================================
// API CLIENT
// ============================================================================

/// Client for the Pi platform payments API.
pub struct PiApiClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl PiApiClient {
    /// Create a new API client authenticated with the given server API key.
    pub fn new(api_key: impl Into<String>, config: &PiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PaymentError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.api_base_url.clone(),
            api_key: api_key.into(),
            http,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("Authorization", format!("Key {}", self.api_key))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch a payment by identifier.
    pub async fn payment(&self, identifier: &str) -> Result<PaymentRecord> {
        let url = self.url(&format!("/v2/payments/{}", identifier));
        debug!("GET {}", url);

        let response = self.authed(self.http.get(&url)).send().await?;
        read_response(response).await
    }

    /// Create a payment, returning the full record the platform assigned.
    pub async fn create_payment(&self, args: &PaymentArgs) -> Result<PaymentRecord> {
        let url = self.url("/v2/payments");
        debug!("POST {}", url);

        let response = self
            .authed(self.http.post(&url))
            .json(&CreateEnvelope { payment: args })
            .send()
            .await?;
        read_response(response).await
    }

    /// Mark a payment complete with the ledger transaction id.
    pub async fn complete_payment(&self, identifier: &str, txid: &str) -> Result<PaymentRecord> {
        let url = self.url(&format!("/v2/payments/{}/complete", identifier));
        debug!("POST {}", url);

        let response = self
            .authed(self.http.post(&url))
            .json(&CompleteEnvelope { txid })
            .send()
            .await?;
        read_response(response).await
    }

    /// Cancel a payment. Cancellation is remote-authoritative: it does not
    /// require the payment to be known locally.
    pub async fn cancel_payment(&self, identifier: &str) -> Result<PaymentRecord> {
        let url = self.url(&format!("/v2/payments/{}/cancel", identifier));
        debug!("POST {}", url);

        let response = self.authed(self.http.post(&url)).send().await?;
        read_response(response).await
    }

    /// List server payments the platform still considers incomplete.
    pub async fn incomplete_payments(&self) -> Result<Vec<PaymentRecord>> {
        let url = self.url("/v2/payments/incomplete_server_payments");
        debug!("GET {}", url);

        let response = self.authed(self.http.get(&url)).send().await?;
        let envelope: IncompleteEnvelope = read_response(response).await?;
        Ok(envelope.incomplete_server_payments)
    }
}

/// Decode a platform response, preserving the remote message on rejection.
async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(PaymentError::RemoteRejected {
        status: status.as_u16(),
        message: extract_message(&body),
    })
}

/// Pull the platform's error message out of a rejection body, falling back
/// to the raw text when it is not the usual JSON shape.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error_message", "error", "message"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_envelope_wraps_payment() {
        let args = PaymentArgs {
            amount: "1".to_string(),
            memo: "test".to_string(),
            metadata: json!({"order": 7}),
            uid: "U1".to_string(),
        };
        let body = serde_json::to_value(CreateEnvelope { payment: &args }).unwrap();
        assert_eq!(body["payment"]["amount"], "1");
        assert_eq!(body["payment"]["uid"], "U1");
        assert_eq!(body["payment"]["metadata"]["order"], 7);
    }

    #[test]
    fn test_complete_envelope_is_structural() {
        let body = serde_json::to_value(CompleteEnvelope { txid: "deadbeef" }).unwrap();
        assert_eq!(body, json!({"txid": "deadbeef"}));
    }

    #[test]
    fn test_incomplete_envelope_unwraps_records() {
        let raw = json!({
            "incomplete_server_payments": [
                {"identifier": "p1", "amount": 1.0},
                {"identifier": "p2", "amount": 2.0}
            ]
        });
        let envelope: IncompleteEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(envelope.incomplete_server_payments.len(), 2);
        assert_eq!(envelope.incomplete_server_payments[1].identifier, "p2");
    }

    #[test]
    fn test_extract_message_variants() {
        assert_eq!(
            extract_message(r#"{"error_message": "payment not found"}"#),
            "payment not found"
        );
        assert_eq!(extract_message(r#"{"error": "unauthorized"}"#), "unauthorized");
        assert_eq!(extract_message("plain text failure"), "plain text failure");
    }

    #[test]
    fn test_url_join() {
        let api = PiApiClient::new("k", &PiConfig::testnet()).unwrap();
        assert_eq!(
            api.url("/v2/payments/abc123/cancel"),
            "https://api.minepi.com/v2/payments/abc123/cancel"
        );
    }
}
