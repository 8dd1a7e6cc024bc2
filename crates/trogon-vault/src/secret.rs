//! Decrypted credential values.

use std::collections::HashMap;
use std::fmt;

use zeroize::Zeroizing;

use crate::provider::ProviderTag;
use crate::tenant::TenantId;

/// A plaintext provider API key.
///
/// Zeroized on drop; `Debug` prints `ApiKey(***)`. The only way to read the
/// value is [`ApiKey::expose`], which keeps call sites greppable.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(Zeroizing<String>);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Zeroizing<String>> for ApiKey {
    fn from(value: Zeroizing<String>) -> Self {
        Self(value)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// One tenant's decrypted provider keys, as handed to the model router.
#[derive(Clone)]
pub struct TenantCredentials {
    tenant: TenantId,
    keys: HashMap<ProviderTag, ApiKey>,
}

impl TenantCredentials {
    /// An empty credential set.
    pub fn new(tenant: TenantId) -> Self {
        Self {
            tenant,
            keys: HashMap::new(),
        }
    }

    pub fn with_key(mut self, provider: ProviderTag, key: ApiKey) -> Self {
        self.insert(provider, key);
        self
    }

    pub fn insert(&mut self, provider: ProviderTag, key: ApiKey) {
        self.keys.insert(provider, key);
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn get(&self, provider: ProviderTag) -> Option<&ApiKey> {
        self.keys.get(&provider)
    }

    /// Providers with a key, sorted.
    pub fn providers(&self) -> Vec<ProviderTag> {
        let mut providers: Vec<ProviderTag> = self.keys.keys().copied().collect();
        providers.sort();
        providers
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for TenantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantCredentials")
            .field("tenant", &self.tenant)
            .field("providers", &self.providers())
            .finish()
    }
}
