//! In-memory [`CredentialStore`] backend backed by `Arc<Mutex<HashMap>>`.
//!
//! Holds envelopes only, never plaintext. Nothing survives a restart.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::provider::ProviderTag;
use crate::store::{CredentialRecord, CredentialStore};
use crate::tenant::TenantId;

/// Error type for [`MemoryCredentialStore`].
#[derive(Debug)]
pub struct MemoryStoreError(String);

impl fmt::Display for MemoryStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "memory credential store error: {}", self.0)
    }
}

impl std::error::Error for MemoryStoreError {}

type Records = HashMap<(TenantId, ProviderTag), CredentialRecord>;

/// Thread-safe in-memory record store. `Clone` shares the same map.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<Mutex<Records>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all tenants.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("records", &self.len())
            .finish()
    }
}

impl CredentialStore for MemoryCredentialStore {
    type Error = MemoryStoreError;

    async fn put(&self, record: CredentialRecord) -> Result<(), Self::Error> {
        self.lock()
            .insert((record.tenant.clone(), record.provider), record);
        Ok(())
    }

    async fn get(
        &self,
        tenant: &TenantId,
        provider: ProviderTag,
    ) -> Result<Option<CredentialRecord>, Self::Error> {
        Ok(self.lock().get(&(tenant.clone(), provider)).cloned())
    }

    async fn delete(&self, tenant: &TenantId, provider: ProviderTag) -> Result<(), Self::Error> {
        self.lock().remove(&(tenant.clone(), provider));
        Ok(())
    }

    async fn list(&self, tenant: &TenantId) -> Result<Vec<CredentialRecord>, Self::Error> {
        let mut records: Vec<CredentialRecord> = self
            .lock()
            .values()
            .filter(|r| &r.tenant == tenant)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.provider);
        Ok(records)
    }
}
