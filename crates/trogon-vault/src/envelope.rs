//! Wire form of an encrypted credential.

use std::fmt;
use std::str::FromStr;

use crate::error::VaultError;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// A sealed credential: nonce, detached tag and ciphertext.
///
/// Serialises as `hex(nonce):hex(tag):hex(ciphertext)`. Parsing fails closed:
/// anything other than exactly three hex fields with the right nonce and tag
/// lengths is a [`VaultError::Format`].
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    nonce: [u8; NONCE_LEN],
    tag: [u8; TAG_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(nonce: [u8; NONCE_LEN], tag: [u8; TAG_LEN], ciphertext: Vec<u8>) -> Self {
        Self { nonce, tag, ciphertext }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn tag(&self) -> &[u8; TAG_LEN] {
        &self.tag
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    #[cfg(test)]
    pub(crate) fn ciphertext_mut(&mut self) -> &mut Vec<u8> {
        &mut self.ciphertext
    }

    #[cfg(test)]
    pub(crate) fn tag_mut(&mut self) -> &mut [u8; TAG_LEN] {
        &mut self.tag
    }
}

// Envelopes are opaque; Debug shows shape only.
impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(self.nonce),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext)
        )
    }
}

fn decode_fixed<const N: usize>(field: &str, wrong_len: &'static str) -> Result<[u8; N], VaultError> {
    let bytes = hex::decode(field).map_err(|_| VaultError::Format("field is not valid hex"))?;
    bytes.try_into().map_err(|_| VaultError::Format(wrong_len))
}

impl FromStr for Envelope {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        let [nonce, tag, ciphertext] = fields.as_slice() else {
            return Err(VaultError::Format("expected three ':'-separated fields"));
        };

        let nonce = decode_fixed::<NONCE_LEN>(nonce, "nonce must be 12 bytes")?;
        let tag = decode_fixed::<TAG_LEN>(tag, "tag must be 16 bytes")?;
        let ciphertext =
            hex::decode(ciphertext).map_err(|_| VaultError::Format("field is not valid hex"))?;

        Ok(Self { nonce, tag, ciphertext })
    }
}
