//! Compound model identifiers: `provider/native-name[-thinking]`.

use std::fmt;

use trogon_vault::ProviderTag;

use crate::error::RouterError;

const THINKING_SUFFIX: &str = "-thinking";
const REASONING_MARKER: &str = "reasoning";

/// A parsed model identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelId {
    provider: ProviderTag,
    native: String,
    reasoning: bool,
}

impl ModelId {
    /// Split on the first `/`. The remainder may itself contain `/` and is
    /// passed to the provider verbatim once a `-thinking` suffix is removed.
    pub fn parse(id: &str) -> Result<Self, RouterError> {
        let Some((prefix, rest)) = id.split_once('/') else {
            if id.parse::<ProviderTag>().is_ok() {
                return Err(RouterError::InvalidModelId { reason: "missing model name" });
            }
            return Err(RouterError::UnknownProvider { prefix: id.to_string() });
        };

        let provider: ProviderTag = prefix.parse().map_err(|_| RouterError::UnknownProvider {
            prefix: prefix.to_string(),
        })?;

        let reasoning = rest.ends_with(THINKING_SUFFIX) || rest.contains(REASONING_MARKER);
        let native = rest.strip_suffix(THINKING_SUFFIX).unwrap_or(rest);
        if native.is_empty() {
            return Err(RouterError::InvalidModelId { reason: "missing model name" });
        }

        Ok(Self {
            provider,
            native: native.to_string(),
            reasoning,
        })
    }

    pub fn provider(&self) -> ProviderTag {
        self.provider
    }

    /// The name sent to the provider.
    pub fn native(&self) -> &str {
        &self.native
    }

    /// Whether reasoning extraction applies.
    pub fn reasoning(&self) -> bool {
        self.reasoning
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.native)?;
        if self.reasoning && !self.native.contains(REASONING_MARKER) {
            f.write_str(THINKING_SUFFIX)?;
        }
        Ok(())
    }
}
