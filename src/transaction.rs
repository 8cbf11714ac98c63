// ============================================================================
// PI-PAYMENTS - Transaction Builder
// ============================================================================
// Build and sign single-operation native payment transactions.
//
// A transaction consists of:
// - Source account and sequence number (consumed per submission)
// - Fee and time bounds
// - Text memo carrying the payment identifier (the correlation key the
//   platform uses to tie the ledger transaction back to the payment)
// - One native payment operation
// - An Ed25519 signature over the network-scoped transaction hash
// ============================================================================

use crate::config::STROOPS_PER_PI;
use crate::error::PaymentError;
use crate::horizon::AccountInfo;
use crate::payment::MAX_MEMO_BYTES;
use crate::strkey::decode_public_key;
use crate::Result;
use ed25519_dalek::{Keypair, Signer};
use sha2::{Digest, Sha256};

// ============================================================================
// TYPES
// ============================================================================

/// Transaction operation. Only native payments are supported; this crate is
/// not a general ledger SDK.
#[derive(Debug, Clone)]
enum Operation {
    Payment { destination: String, amount: String },
}

/// Transaction memo
#[derive(Debug, Clone, Default)]
enum Memo {
    #[default]
    None,
    Text(String),
}

/// Signed transaction ready for submission
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// Hex-encoded transaction hash
    pub hash: String,
    /// Base64-encoded envelope XDR
    pub envelope_xdr: String,
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builder for a signed payment transaction.
pub struct TransactionBuilder {
    source_account: String,
    sequence: u64,
    passphrase: String,
    fee: u32,
    operations: Vec<Operation>,
    memo: Memo,
    timeout_secs: u64,
}

impl TransactionBuilder {
    /// Start a transaction from the current account state. Consumes the next
    /// sequence number: building twice from the same snapshot produces a
    /// duplicate sequence the ledger will reject.
    pub fn new(source: &AccountInfo, passphrase: &str) -> Self {
        Self {
            source_account: source.id.clone(),
            sequence: source.sequence.parse::<u64>().unwrap_or(0) + 1,
            passphrase: passphrase.to_string(),
            fee: crate::config::DEFAULT_BASE_FEE,
            operations: Vec::new(),
            memo: Memo::None,
            timeout_secs: 30,
        }
    }

    /// Set fee per operation (in stroops)
    pub fn fee(mut self, fee: u32) -> Self {
        self.fee = fee;
        self
    }

    /// Set the submission timeout window
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    /// Set a text memo
    pub fn memo_text(mut self, text: &str) -> Self {
        self.memo = Memo::Text(text.to_string());
        self
    }

    /// Add a native payment operation
    pub fn payment(mut self, destination: &str, amount: &str) -> Self {
        self.operations.push(Operation::Payment {
            destination: destination.to_string(),
            amount: amount.to_string(),
        });
        self
    }

    /// Build the unsigned transaction.
    pub fn build(self) -> Result<UnsignedTransaction> {
        if self.operations.is_empty() {
            return Err(PaymentError::InvalidPaymentData(
                "transaction must have at least one operation".to_string(),
            ));
        }
        if let Memo::Text(text) = &self.memo {
            if text.len() > MAX_MEMO_BYTES {
                return Err(PaymentError::InvalidPaymentData(format!(
                    "memo exceeds {} bytes",
                    MAX_MEMO_BYTES
                )));
            }
        }

        let total_fee = self.fee * self.operations.len() as u32;
        let max_time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| PaymentError::InvalidPaymentData(e.to_string()))?
            .as_secs()
            + self.timeout_secs;

        Ok(UnsignedTransaction {
            source_account: self.source_account,
            sequence: self.sequence,
            passphrase: self.passphrase,
            fee: total_fee,
            min_time: 0,
            max_time,
            operations: self.operations,
            memo: self.memo,
        })
    }
}

// ============================================================================
// UNSIGNED TRANSACTION
// ============================================================================

/// Unsigned transaction ready for signing
pub struct UnsignedTransaction {
    source_account: String,
    sequence: u64,
    passphrase: String,
    fee: u32,
    min_time: u64,
    max_time: u64,
    operations: Vec<Operation>,
    memo: Memo,
}

impl UnsignedTransaction {
    /// Sign with the account keypair, producing the submission envelope.
    pub fn sign(self, keypair: &Keypair) -> Result<SignedTransaction> {
        let tx_xdr = self.to_xdr()?;

        // Transaction hash = sha256(sha256(passphrase) + ENVELOPE_TYPE_TX + tx)
        let network_id = Sha256::digest(self.passphrase.as_bytes());
        let mut payload = Vec::with_capacity(36 + tx_xdr.len());
        payload.extend_from_slice(&network_id);
        payload.extend_from_slice(&[0, 0, 0, 2]); // ENVELOPE_TYPE_TX = 2
        payload.extend_from_slice(&tx_xdr);
        let tx_hash = Sha256::digest(&payload);

        let signature = keypair.sign(&tx_hash);
        let envelope = build_envelope_xdr(
            &tx_xdr,
            keypair.public.as_bytes(),
            &signature.to_bytes(),
        );

        Ok(SignedTransaction {
            hash: hex::encode(tx_hash),
            envelope_xdr: base64_encode(&envelope),
        })
    }

    /// Encode the transaction body (without envelope).
    fn to_xdr(&self) -> Result<Vec<u8>> {
        let mut xdr = Vec::new();

        write_muxed_account(&mut xdr, &self.source_account)?;
        xdr.extend_from_slice(&self.fee.to_be_bytes());
        xdr.extend_from_slice(&self.sequence.to_be_bytes());

        // Preconditions: PRECOND_TIME = 1, then the time bounds
        xdr.extend_from_slice(&[0, 0, 0, 1]);
        xdr.extend_from_slice(&self.min_time.to_be_bytes());
        xdr.extend_from_slice(&self.max_time.to_be_bytes());

        self.write_memo(&mut xdr);

        xdr.extend_from_slice(&(self.operations.len() as u32).to_be_bytes());
        for op in &self.operations {
            write_operation(&mut xdr, op)?;
        }

        // Ext (reserved)
        xdr.extend_from_slice(&[0, 0, 0, 0]);

        Ok(xdr)
    }

    fn write_memo(&self, xdr: &mut Vec<u8>) {
        match &self.memo {
            Memo::None => {
                // MEMO_NONE = 0
                xdr.extend_from_slice(&[0, 0, 0, 0]);
            }
            Memo::Text(text) => {
                // MEMO_TEXT = 1, then a length-prefixed padded string
                xdr.extend_from_slice(&[0, 0, 0, 1]);
                let bytes = text.as_bytes();
                xdr.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                xdr.extend_from_slice(bytes);
                let padding = (4 - bytes.len() % 4) % 4;
                xdr.extend(std::iter::repeat(0).take(padding));
            }
        }
    }
}

// ============================================================================
// XDR HELPERS
// ============================================================================

fn write_muxed_account(xdr: &mut Vec<u8>, address: &str) -> Result<()> {
    let key_bytes = decode_public_key(address)?;
    // KEY_TYPE_ED25519 = 0
    xdr.extend_from_slice(&[0, 0, 0, 0]);
    xdr.extend_from_slice(&key_bytes);
    Ok(())
}

fn write_operation(xdr: &mut Vec<u8>, op: &Operation) -> Result<()> {
    // No per-operation source override
    xdr.extend_from_slice(&[0, 0, 0, 0]);

    match op {
        Operation::Payment { destination, amount } => {
            // PAYMENT = 1
            xdr.extend_from_slice(&[0, 0, 0, 1]);
            write_muxed_account(xdr, destination)?;
            // ASSET_TYPE_NATIVE = 0
            xdr.extend_from_slice(&[0, 0, 0, 0]);
            write_amount(xdr, amount)?;
        }
    }

    Ok(())
}

/// Write a decimal amount as stroops (7 decimal places).
fn write_amount(xdr: &mut Vec<u8>, amount: &str) -> Result<()> {
    let stroops = parse_stroops(amount)?;
    xdr.extend_from_slice(&stroops.to_be_bytes());
    Ok(())
}

/// Parse a decimal Pi amount into stroops without a float intermediate,
/// so amounts like "0.41" encode to exactly 4,100,000 stroops. A truncating
/// float path underpays by a stroop on such amounts, which breaks the
/// platform's memo+amount correlation.
fn parse_stroops(amount: &str) -> Result<i64> {
    let invalid =
        || PaymentError::InvalidPaymentData(format!("invalid amount: {}", amount));

    let text = amount.trim();
    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > 7 {
        return Err(PaymentError::InvalidPaymentData(format!(
            "amount {} has more than 7 decimal places",
            amount
        )));
    }
    // Digits only; this also rejects signs and exponent notation
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_part: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_part: i64 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| invalid())?
    };
    let frac_scale = 10i64.pow(7 - frac.len() as u32);

    let stroops = whole_part
        .checked_mul(STROOPS_PER_PI)
        .and_then(|w| w.checked_add(frac_part * frac_scale))
        .ok_or_else(invalid)?;
    if stroops <= 0 {
        return Err(invalid());
    }
    Ok(stroops)
}

fn build_envelope_xdr(tx_xdr: &[u8], public_key: &[u8], signature: &[u8]) -> Vec<u8> {
    let mut envelope = Vec::with_capacity(tx_xdr.len() + signature.len() + 16);

    // ENVELOPE_TYPE_TX = 2
    envelope.extend_from_slice(&[0, 0, 0, 2]);
    envelope.extend_from_slice(tx_xdr);

    // One decorated signature: hint (last 4 public key bytes) + signature
    envelope.extend_from_slice(&[0, 0, 0, 1]);
    envelope.extend_from_slice(&public_key[28..32]);
    envelope.extend_from_slice(&(signature.len() as u32).to_be_bytes());
    envelope.extend_from_slice(signature);
    let padding = (4 - signature.len() % 4) % 4;
    envelope.extend(std::iter::repeat(0).take(padding));

    envelope
}

fn base64_encode(data: &[u8]) -> String {
    use base64::{engine::general_purpose, Engine as _};
    general_purpose::STANDARD.encode(data)
}

// ============================================================================
// TESTS
// ============================================================================
