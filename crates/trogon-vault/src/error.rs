use crate::provider::ProviderTag;

/// Errors produced by the credential vault.
///
/// No variant carries key material, plaintext or envelope text.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Missing or malformed vault configuration. Fatal at startup.
    #[error("vault configuration error: {0}")]
    Configuration(String),

    /// Tag verification failed, or the verified plaintext was not UTF-8.
    #[error("could not read stored credential")]
    Authentication,

    #[error("malformed credential envelope: {0}")]
    Format(&'static str),

    #[error("could not encrypt credential")]
    Encryption,

    #[error("provider '{0}' does not accept stored credentials")]
    UnsupportedProvider(ProviderTag),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("credential store error: {0}")]
    Store(String),
}

impl VaultError {
    /// A message safe to return to the tenant.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(_) | Self::Encryption | Self::Store(_) => {
                "Credential storage is unavailable".to_string()
            }
            Self::Authentication | Self::Format(_) => {
                "Could not read stored credential, please save your API key again".to_string()
            }
            Self::UnsupportedProvider(tag) => format!("Provider '{tag}' does not accept API keys"),
            Self::InvalidCredential(reason) => reason.clone(),
        }
    }
}
