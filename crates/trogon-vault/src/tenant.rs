//! Tenant identity value object.

use std::fmt;

/// Longest tenant id accepted.
pub const MAX_TENANT_ID_LEN: usize = 128;

/// Errors produced when constructing a [`TenantId`].
#[derive(Debug, Clone, PartialEq)]
pub enum TenantIdError {
    Empty,
    TooLong { len: usize },
    /// Whitespace, control characters and `/` are rejected.
    InvalidCharacter(char),
}

impl fmt::Display for TenantIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "tenant id must not be empty"),
            Self::TooLong { len } => {
                write!(f, "tenant id is {len} characters, maximum is {MAX_TENANT_ID_LEN}")
            }
            Self::InvalidCharacter(ch) => {
                write!(f, "tenant id contains invalid character: {:?}", ch)
            }
        }
    }
}

impl std::error::Error for TenantIdError {}

/// Identifies the tenant that owns a set of credentials.
///
/// Ids come from the upstream auth layer; the vault only checks that they are
/// usable as storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(s: impl Into<String>) -> Result<Self, TenantIdError> {
        let s: String = s.into();
        if s.is_empty() {
            return Err(TenantIdError::Empty);
        }
        let len = s.chars().count();
        if len > MAX_TENANT_ID_LEN {
            return Err(TenantIdError::TooLong { len });
        }
        if let Some(ch) = s.chars().find(|c| c.is_whitespace() || c.is_control() || *c == '/') {
            return Err(TenantIdError::InvalidCharacter(ch));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}
