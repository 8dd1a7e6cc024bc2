use tracing::{debug, warn};
use trogon_vault::TenantCredentials;

use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::handle::ModelHandle;
use crate::model_id::ModelId;
use crate::providers::ProviderModel;

/// Resolves model identifiers to tenant-scoped [`ModelHandle`]s.
///
/// Built once at startup and shared by reference. The router holds no
/// credentials: each handle gets the key of the tenant it is resolved for,
/// and there is no fallback to a shared key.
#[derive(Debug, Clone)]
pub struct ModelRouter {
    config: RouterConfig,
    http: reqwest::Client,
}

impl ModelRouter {
    pub fn new(config: RouterConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn resolve(&self, model_id: &str, credentials: &TenantCredentials) -> Result<ModelHandle, RouterError> {
        let tenant = credentials.tenant();
        let id = ModelId::parse(model_id).inspect_err(|err| {
            warn!(tenant = %tenant, model = %model_id, error = %err, "Rejected model id");
        })?;

        let provider = id.provider();
        let Some(key) = credentials.get(provider) else {
            debug!(tenant = %tenant, provider = %provider, "No credential for provider");
            return Err(RouterError::MissingCredential { provider });
        };

        let model = ProviderModel::new(provider, id.native(), key.clone(), self.http.clone(), &self.config);
        debug!(
            tenant = %tenant,
            provider = %provider,
            model = %id.native(),
            reasoning = id.reasoning(),
            "Resolved model handle"
        );

        Ok(if id.reasoning() {
            ModelHandle::reasoning(tenant.clone(), model_id, model)
        } else {
            ModelHandle::plain(tenant.clone(), model_id, model)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::LanguageModel;
    use crate::types::{GenerateRequest, LlmMessage};
    use trogon_vault::{ApiKey, ProviderTag, TenantId};

    fn router() -> ModelRouter {
        ModelRouter::new(RouterConfig::default(), reqwest::Client::new())
    }

    fn creds(tenant: &str) -> TenantCredentials {
        TenantCredentials::new(TenantId::new(tenant).unwrap())
    }

    #[test]
    fn missing_credential_has_no_fallback() {
        let err = router().resolve("openai/gpt-4.1-mini", &creds("alice")).unwrap_err();
        assert_eq!(err, RouterError::MissingCredential { provider: ProviderTag::OpenAi });
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = router().resolve("unknown/x", &creds("alice")).unwrap_err();
        assert_eq!(err, RouterError::UnknownProvider { prefix: "unknown".into() });
    }

    #[test]
    fn credential_for_another_provider_does_not_help() {
        let c = creds("alice").with_key(ProviderTag::Anthropic, ApiKey::new("sk-ant-alice-key"));
        let err = router().resolve("google/gemini-2.5-pro", &c).unwrap_err();
        assert_eq!(err, RouterError::MissingCredential { provider: ProviderTag::Google });
    }

    #[test]
    fn thinking_model_resolves_to_reasoning_handle() {
        let c = creds("alice").with_key(ProviderTag::Anthropic, ApiKey::new("sk-ant-alice-key"));
        let handle = router().resolve("anthropic/claude-3.7-sonnet-thinking", &c).unwrap();
        assert!(handle.is_reasoning());
        assert_eq!(handle.model_name(), "claude-3.7-sonnet");
        assert_eq!(handle.requested_id(), "anthropic/claude-3.7-sonnet-thinking");
    }

    #[test]
    fn handles_carry_the_resolving_tenant() {
        let alice = creds("alice").with_key(ProviderTag::OpenAi, ApiKey::new("sk-alice-0000"));
        let bob = creds("bob").with_key(ProviderTag::OpenAi, ApiKey::new("sk-bob-00000"));
        let r = router();
        let a = r.resolve("openai/gpt-4o", &alice).unwrap();
        let b = r.resolve("openai/gpt-4o", &bob).unwrap();
        assert_eq!(a.tenant().as_str(), "alice");
        assert_eq!(b.tenant().as_str(), "bob");
        assert!(!a.is_reasoning());
    }

    #[tokio::test]
    async fn concurrent_tenants_each_send_their_own_key() {
        let server = httpmock::MockServer::start_async().await;
        let reply = serde_json::json!({
            "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}]
        });
        let alice_mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer sk-alice-0000");
                then.status(200).json_body(reply.clone());
            })
            .await;
        let bob_mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer sk-bob-00000");
                then.status(200).json_body(reply.clone());
            })
            .await;

        let config = RouterConfig::default()
            .with_base_url(ProviderTag::OpenAi, server.base_url())
            .with_retry_attempts(1);
        let r = ModelRouter::new(config, reqwest::Client::new());
        let alice = creds("alice").with_key(ProviderTag::OpenAi, ApiKey::new("sk-alice-0000"));
        let bob = creds("bob").with_key(ProviderTag::OpenAi, ApiKey::new("sk-bob-00000"));
        let a = r.resolve("openai/gpt-4o", &alice).unwrap();
        let b = r.resolve("openai/gpt-4o", &bob).unwrap();

        let request = GenerateRequest {
            messages: vec![LlmMessage::user("hi")],
            ..Default::default()
        };
        let (from_a, from_b) = tokio::join!(a.generate(&request), b.generate(&request));
        assert_eq!(from_a.unwrap().text, "ok");
        assert_eq!(from_b.unwrap().text, "ok");

        alice_mock.assert_hits_async(1).await;
        bob_mock.assert_hits_async(1).await;
    }

    #[test]
    fn handle_debug_never_prints_the_key() {
        let c = creds("alice").with_key(ProviderTag::OpenAi, ApiKey::new("sk-alice-secret"));
        let handle = router().resolve("openai/gpt-4o", &c).unwrap();
        assert!(!format!("{handle:?}").contains("sk-alice-secret"));
    }
}
