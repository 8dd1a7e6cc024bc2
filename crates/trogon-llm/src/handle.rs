//! [`LanguageModel`] trait and the per-tenant [`ModelHandle`].

use trogon_vault::{ProviderTag, TenantId};

use crate::error::LlmError;
use crate::providers::ProviderModel;
use crate::reasoning::ReasoningModel;
use crate::types::{GenerateRequest, Generation, TokenStream};

/// Something that can answer a [`GenerateRequest`].
///
/// Implementations must be `Send + Sync` so handles can be shared across
/// tasks for the duration of a request.
pub trait LanguageModel: Send + Sync {
    /// The name sent to the provider.
    fn model_name(&self) -> &str;

    fn generate(
        &self,
        request: &GenerateRequest,
    ) -> impl std::future::Future<Output = Result<Generation, LlmError>> + Send;

    fn stream(
        &self,
        request: &GenerateRequest,
    ) -> impl std::future::Future<Output = Result<TokenStream, LlmError>> + Send;
}

enum Inner {
    Plain(ProviderModel),
    Reasoning(ReasoningModel<ProviderModel>),
}

/// A resolved model, bound to the tenant whose credential it carries.
///
/// Handles are built per request and never cached or shared between
/// tenants.
pub struct ModelHandle {
    tenant: TenantId,
    requested: String,
    inner: Inner,
}

impl ModelHandle {
    pub(crate) fn plain(tenant: TenantId, requested: impl Into<String>, model: ProviderModel) -> Self {
        Self {
            tenant,
            requested: requested.into(),
            inner: Inner::Plain(model),
        }
    }

    pub(crate) fn reasoning(tenant: TenantId, requested: impl Into<String>, model: ProviderModel) -> Self {
        Self {
            tenant,
            requested: requested.into(),
            inner: Inner::Reasoning(ReasoningModel::new(model)),
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// The identifier this handle was resolved from.
    pub fn requested_id(&self) -> &str {
        &self.requested
    }

    pub fn provider(&self) -> ProviderTag {
        match &self.inner {
            Inner::Plain(model) => model.provider(),
            Inner::Reasoning(model) => model.inner().provider(),
        }
    }

    pub fn is_reasoning(&self) -> bool {
        matches!(self.inner, Inner::Reasoning(_))
    }
}

impl LanguageModel for ModelHandle {
    fn model_name(&self) -> &str {
        match &self.inner {
            Inner::Plain(model) => model.model_name(),
            Inner::Reasoning(model) => model.model_name(),
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Generation, LlmError> {
        match &self.inner {
            Inner::Plain(model) => model.generate(request).await,
            Inner::Reasoning(model) => model.generate(request).await,
        }
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<TokenStream, LlmError> {
        match &self.inner {
            Inner::Plain(model) => model.stream(request).await,
            Inner::Reasoning(model) => model.stream(request).await,
        }
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("tenant", &self.tenant)
            .field("requested", &self.requested)
            .field("provider", &self.provider())
            .field("reasoning", &self.is_reasoning())
            .finish()
    }
}
