use trogon_std::env::{ReadEnv, non_empty_var, parse_var_or};

use crate::cipher::EncryptionKey;
use crate::error::VaultError;
use crate::provider::ProviderTag;

const DEFAULT_MIN_KEY_LENGTH: usize = 10;

/// Which credentials tenants may store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPolicy {
    pub storable: Vec<ProviderTag>,
    pub min_key_length: usize,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            storable: vec![ProviderTag::Anthropic],
            min_key_length: DEFAULT_MIN_KEY_LENGTH,
        }
    }
}

impl CredentialPolicy {
    pub fn allows(&self, provider: ProviderTag) -> bool {
        self.storable.contains(&provider)
    }

    pub fn with_storable(mut self, storable: impl IntoIterator<Item = ProviderTag>) -> Self {
        self.storable = storable.into_iter().collect();
        self
    }

    pub fn with_min_key_length(mut self, min: usize) -> Self {
        self.min_key_length = min;
        self
    }
}

/// Vault configuration.
///
/// Resolved from environment variables:
/// - `ENCRYPTION_KEY`: 64 hex characters (required)
/// - `CREDENTIAL_PROVIDERS`: comma-separated storable providers (default: `anthropic`)
/// - `CREDENTIAL_MIN_KEY_LENGTH`: shortest accepted API key (default: 10)
#[derive(Debug)]
pub struct VaultConfig {
    pub key: EncryptionKey,
    pub policy: CredentialPolicy,
}

impl VaultConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Result<Self, VaultError> {
        let raw_key = non_empty_var(env, "ENCRYPTION_KEY")
            .ok_or_else(|| VaultError::Configuration("ENCRYPTION_KEY is not set".into()))?;
        let key = EncryptionKey::from_hex(&zeroize::Zeroizing::new(raw_key))?;

        let storable = match non_empty_var(env, "CREDENTIAL_PROVIDERS") {
            Some(list) => parse_provider_list(&list)?,
            None => CredentialPolicy::default().storable,
        };

        Ok(Self {
            key,
            policy: CredentialPolicy {
                storable,
                min_key_length: parse_var_or(env, "CREDENTIAL_MIN_KEY_LENGTH", DEFAULT_MIN_KEY_LENGTH),
            },
        })
    }

    pub fn with_policy(mut self, policy: CredentialPolicy) -> Self {
        self.policy = policy;
        self
    }
}

fn parse_provider_list(list: &str) -> Result<Vec<ProviderTag>, VaultError> {
    let mut providers = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let tag: ProviderTag = entry.parse().map_err(|err| {
            VaultError::Configuration(format!("CREDENTIAL_PROVIDERS: {err}"))
        })?;
        if !providers.contains(&tag) {
            providers.push(tag);
        }
    }
    Ok(providers)
}
