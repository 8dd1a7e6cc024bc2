//! [`CredentialStore`](crate::CredentialStore) backends.
//!
//! Durable persistence belongs to the surrounding user storage layer; this
//! crate only ships the in-memory backend used by tests and single-process
//! deployments.

pub mod memory;
