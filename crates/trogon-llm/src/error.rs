use trogon_vault::ProviderTag;

/// Failures resolving a model identifier to a handle. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("unknown model provider '{prefix}'")]
    UnknownProvider { prefix: String },

    #[error("invalid model id: {reason}")]
    InvalidModelId { reason: &'static str },

    #[error("no {provider} credential configured for this tenant")]
    MissingCredential { provider: ProviderTag },
}

impl RouterError {
    /// A message safe to show the tenant.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownProvider { prefix } => format!("Unknown model provider '{prefix}'"),
            Self::InvalidModelId { .. } => "Model id must look like provider/model".to_string(),
            Self::MissingCredential { provider } => {
                format!("No {provider} API key configured. Add your key in settings to use this model.")
            }
        }
    }
}

/// Failures talking to a provider.
///
/// Messages are built from the provider's own `error.message` field or the
/// transport error, truncated and with the tenant's key scrubbed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("{provider} API returned {status}: {message}")]
    Api {
        provider: ProviderTag,
        status: u16,
        message: String,
    },

    #[error("{provider} request failed: {message}")]
    Transport { provider: ProviderTag, message: String },

    #[error("{provider} response could not be decoded: {message}")]
    Decode { provider: ProviderTag, message: String },

    #[error("{provider} stream failed: {message}")]
    Stream { provider: ProviderTag, message: String },
}

impl LlmError {
    pub fn provider(&self) -> ProviderTag {
        match self {
            Self::Api { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Decode { provider, .. }
            | Self::Stream { provider, .. } => *provider,
        }
    }

    /// Status codes worth retrying: rate limiting and server faults.
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Api { status: 401 | 403, provider, .. } => {
                format!("{provider} rejected the configured API key")
            }
            Self::Api { status: 429, provider, .. } => format!("{provider} is rate limiting requests, try again shortly"),
            _ => format!("The {} model is unavailable right now", self.provider()),
        }
    }
}

const MAX_UPSTREAM_MESSAGE: usize = 300;

/// Reduce an upstream message to something safe to log and return.
pub(crate) fn sanitize_upstream(message: &str, secret: &str) -> String {
    let scrubbed = if secret.is_empty() {
        message.to_string()
    } else {
        message.replace(secret, "***")
    };
    let mut out: String = scrubbed.chars().take(MAX_UPSTREAM_MESSAGE).collect();
    if scrubbed.chars().count() > MAX_UPSTREAM_MESSAGE {
        out.push('…');
    }
    out
}
