//! [`CredentialVault`]: the credential management surface.

use tracing::{info, warn};

use crate::cipher::{CredentialCipher, EncryptionKey};
use crate::config::{CredentialPolicy, VaultConfig};
use crate::error::VaultError;
use crate::provider::ProviderTag;
use crate::secret::{ApiKey, TenantCredentials};
use crate::store::{CredentialRecord, CredentialStore};
use crate::tenant::TenantId;

/// Seals tenant API keys on the way into a [`CredentialStore`] and opens them
/// on the way out.
pub struct CredentialVault<S> {
    cipher: CredentialCipher,
    store: S,
    policy: CredentialPolicy,
}

impl<S: CredentialStore> CredentialVault<S> {
    pub fn new(key: &EncryptionKey, store: S, policy: CredentialPolicy) -> Self {
        Self {
            cipher: CredentialCipher::new(key),
            store,
            policy,
        }
    }

    pub fn from_config(config: &VaultConfig, store: S) -> Self {
        Self::new(&config.key, store, config.policy.clone())
    }

    pub fn policy(&self) -> &CredentialPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Encrypt and save `plaintext`, replacing any existing key for the
    /// provider.
    pub async fn store_credential(
        &self,
        tenant: &TenantId,
        provider: ProviderTag,
        plaintext: &str,
    ) -> Result<(), VaultError> {
        if !self.policy.allows(provider) {
            return Err(VaultError::UnsupportedProvider(provider));
        }
        let plaintext = plaintext.trim();
        if plaintext.chars().count() < self.policy.min_key_length {
            return Err(VaultError::InvalidCredential(format!(
                "API key must be at least {} characters",
                self.policy.min_key_length
            )));
        }

        let envelope = self.cipher.encrypt(plaintext)?;
        self.store
            .put(CredentialRecord {
                tenant: tenant.clone(),
                provider,
                envelope,
            })
            .await
            .map_err(store_error)?;

        info!(tenant = %tenant, provider = %provider, "Stored provider credential");
        Ok(())
    }

    /// Decrypt the tenant's key for `provider`, if one is stored.
    pub async fn fetch_credential(
        &self,
        tenant: &TenantId,
        provider: ProviderTag,
    ) -> Result<Option<ApiKey>, VaultError> {
        let Some(record) = self.store.get(tenant, provider).await.map_err(store_error)? else {
            return Ok(None);
        };
        self.open(&record).map(Some)
    }

    pub async fn delete_credential(&self, tenant: &TenantId, provider: ProviderTag) -> Result<(), VaultError> {
        self.store.delete(tenant, provider).await.map_err(store_error)?;
        info!(tenant = %tenant, provider = %provider, "Deleted provider credential");
        Ok(())
    }

    /// Providers the tenant has a key for. Nothing is decrypted.
    pub async fn configured_providers(&self, tenant: &TenantId) -> Result<Vec<ProviderTag>, VaultError> {
        let records = self.store.list(tenant).await.map_err(store_error)?;
        let mut providers: Vec<ProviderTag> = records.into_iter().map(|r| r.provider).collect();
        providers.sort();
        providers.dedup();
        Ok(providers)
    }

    /// Every stored key for the tenant, decrypted.
    ///
    /// A record that fails authentication fails the whole call rather than
    /// silently dropping that provider.
    pub async fn tenant_credentials(&self, tenant: &TenantId) -> Result<TenantCredentials, VaultError> {
        let records = self.store.list(tenant).await.map_err(store_error)?;
        let mut credentials = TenantCredentials::new(tenant.clone());
        for record in records.iter().filter(|r| &r.tenant == tenant) {
            credentials.insert(record.provider, self.open(record)?);
        }
        Ok(credentials)
    }

    fn open(&self, record: &CredentialRecord) -> Result<ApiKey, VaultError> {
        match self.cipher.decrypt(&record.envelope) {
            Ok(plaintext) => Ok(ApiKey::from(plaintext)),
            Err(err) => {
                warn!(
                    tenant = %record.tenant,
                    provider = %record.provider,
                    error = %err,
                    "Stored credential could not be decrypted"
                );
                Err(err)
            }
        }
    }
}

fn store_error<E: std::error::Error>(err: E) -> VaultError {
    VaultError::Store(err.to_string())
}
