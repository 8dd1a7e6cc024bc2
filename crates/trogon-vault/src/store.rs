//! [`CredentialStore`] trait: persistence for sealed credential records.

use crate::envelope::Envelope;
use crate::provider::ProviderTag;
use crate::tenant::TenantId;

/// One sealed credential. At most one exists per (tenant, provider).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub tenant: TenantId,
    pub provider: ProviderTag,
    pub envelope: Envelope,
}

/// Backends that persist [`CredentialRecord`]s.
///
/// Stores only ever see envelopes; encryption happens in
/// [`CredentialVault`](crate::CredentialVault) before `put`.
pub trait CredentialStore: Send + Sync {
    type Error: std::error::Error + Send + Sync;

    /// Insert or replace the record for `(record.tenant, record.provider)`.
    fn put(&self, record: CredentialRecord) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    fn get(
        &self,
        tenant: &TenantId,
        provider: ProviderTag,
    ) -> impl std::future::Future<Output = Result<Option<CredentialRecord>, Self::Error>> + Send;

    /// Remove the record. Removing a missing record is not an error.
    fn delete(
        &self,
        tenant: &TenantId,
        provider: ProviderTag,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    /// Every record held for `tenant`.
    fn list(
        &self,
        tenant: &TenantId,
    ) -> impl std::future::Future<Output = Result<Vec<CredentialRecord>, Self::Error>> + Send;
}
