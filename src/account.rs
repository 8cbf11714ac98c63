// ============================================================================
// PI-PAYMENTS - Account Context
// ============================================================================
// Holds the paying wallet: derived keypair, network identity, cached account
// state and base fee. Loaded once at startup, explicitly refreshable so
// balance checks do not gate monetary actions on stale data.
// ============================================================================

use crate::config::{Network, DEFAULT_BASE_FEE, STROOPS_PER_PI};
use crate::error::PaymentError;
use crate::horizon::{AccountInfo, HorizonClient};
use crate::strkey::{decode_secret_seed, encode_public_key};
use crate::Result;
use ed25519_dalek::{Keypair, PublicKey, SecretKey};
use tracing::{debug, warn};

/// The paying wallet's ledger state and signing identity.
pub struct PiAccount {
    account_id: String,
    keypair: Keypair,
    network: Network,
    base_fee: u32,
    info: AccountInfo,
}

impl PiAccount {
    /// Load the wallet account from its private seed.
    ///
    /// Decodes and validates the seed (`InvalidSeedFormat` on any shape or
    /// checksum violation), derives the keypair, then fetches the account
    /// state and the network's recommended base fee (`LedgerUnreachable` if
    /// either fetch fails). Errors are returned, never fatal: the embedding
    /// application decides whether to abort.
    pub async fn load(
        wallet_private_seed: &str,
        network: Network,
        horizon: &HorizonClient,
    ) -> Result<Self> {
        let seed_bytes = decode_secret_seed(wallet_private_seed)?;
        let secret = SecretKey::from_bytes(&seed_bytes)
            .map_err(|e| PaymentError::InvalidSeedFormat(e.to_string()))?;
        let public = PublicKey::from(&secret);
        let keypair = Keypair { secret, public };
        let account_id = encode_public_key(public.as_bytes());

        let info = horizon.load_account(&account_id).await?;
        debug!(
            "Loaded account {} with native balance {}",
            account_id,
            info.native_balance()
        );

        let stats = horizon.fee_stats().await?;
        let base_fee = stats.last_ledger_base_fee.parse().unwrap_or_else(|_| {
            warn!(
                "Unparsable base fee {:?}, using default {}",
                stats.last_ledger_base_fee, DEFAULT_BASE_FEE
            );
            DEFAULT_BASE_FEE
        });

        Ok(Self {
            account_id,
            keypair,
            network,
            base_fee,
            info,
        })
    }

    /// Re-fetch account state from the ledger. Balances and the sequence
    /// number both move underneath us; callers refresh before any
    /// balance-gated action and before building a transaction.
    pub async fn refresh(&mut self, horizon: &HorizonClient) -> Result<()> {
        self.info = horizon.load_account(&self.account_id).await?;
        Ok(())
    }

    /// The wallet's G... address.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// The signing keypair.
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Network the account was loaded on.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Base fee per operation, in stroops.
    pub fn base_fee(&self) -> u32 {
        self.base_fee
    }

    /// Cached account snapshot (id, sequence, balances).
    pub fn info(&self) -> &AccountInfo {
        &self.info
    }

    /// Cached native balance; zero when the account holds no native entry.
    pub fn native_balance(&self) -> f64 {
        self.info.native_balance()
    }

    /// Fee headroom check: amount plus the per-operation fee must fit in
    /// the native balance. Uses the cached snapshot, no I/O.
    pub fn check_headroom(&self, amount: f64) -> Result<()> {
        let needed = amount + self.base_fee as f64 / STROOPS_PER_PI as f64;
        let available = self.native_balance();
        if needed > available {
            return Err(PaymentError::InsufficientBalance { needed, available });
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn for_tests(network: Network, base_fee: u32, info: AccountInfo) -> Self {
        let secret = SecretKey::from_bytes(&[11u8; 32]).unwrap();
        let public = PublicKey::from(&secret);
        Self {
            account_id: info.id.clone(),
            keypair: Keypair { secret, public },
            network,
            base_fee,
            info,
        }
    }
}
