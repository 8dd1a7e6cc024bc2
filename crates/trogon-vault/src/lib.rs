//! Credential vault for per-tenant AI-provider API keys.
//!
//! Tenants submit their own provider keys; the vault seals each one with
//! AES-256-GCM under a process-wide key and hands the opaque envelope to a
//! [`CredentialStore`] for persistence. Keys are only ever decrypted into
//! [`ApiKey`] values, which redact themselves in `Debug` output and zeroize on
//! drop.
//!
//! # Envelope format
//!
//! ```text
//! hex(nonce[12]) ":" hex(tag[16]) ":" hex(ciphertext)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use trogon_vault::{
//!     CredentialPolicy, CredentialVault, EncryptionKey, MemoryCredentialStore, ProviderTag,
//!     TenantId,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let key = EncryptionKey::from_hex(&"11".repeat(32)).unwrap();
//! let vault = CredentialVault::new(&key, MemoryCredentialStore::new(), CredentialPolicy::default());
//! let tenant = TenantId::new("user-42").unwrap();
//!
//! vault
//!     .store_credential(&tenant, ProviderTag::Anthropic, "sk-ant-realkey-123")
//!     .await
//!     .unwrap();
//!
//! let creds = vault.tenant_credentials(&tenant).await.unwrap();
//! assert_eq!(creds.get(ProviderTag::Anthropic).unwrap().expose(), "sk-ant-realkey-123");
//! # }
//! ```

pub mod backends;
pub mod cipher;
pub mod config;
pub mod envelope;
pub mod error;
pub mod provider;
pub mod secret;
pub mod service;
pub mod store;
pub mod tenant;

pub use backends::memory::{MemoryCredentialStore, MemoryStoreError};
pub use cipher::{CredentialCipher, EncryptionKey, KEY_LEN};
pub use config::{CredentialPolicy, VaultConfig};
pub use envelope::{Envelope, NONCE_LEN, TAG_LEN};
pub use error::VaultError;
pub use provider::{ProviderTag, UnknownProvider};
pub use secret::{ApiKey, TenantCredentials};
pub use service::CredentialVault;
pub use store::{CredentialRecord, CredentialStore};
pub use tenant::{TenantId, TenantIdError};
