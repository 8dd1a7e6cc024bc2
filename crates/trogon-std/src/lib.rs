//! Thin abstractions over `std` for the sandbox crates.
//!
//! | Concern | Trait | Production | Test |
//! |---------|-------|------------|------|
//! | Env vars | [`ReadEnv`] | [`SystemEnv`] | [`InMemoryEnv`]* |
//!
//! *Available with `#[cfg(test)]` or the `"test-support"` feature.
//!
//! Every crate reads its configuration through [`ReadEnv`] so that tests never
//! touch the global process environment.

pub mod env;

pub use env::{ReadEnv, SystemEnv, non_empty_var, parse_var_or};

#[cfg(any(test, feature = "test-support"))]
pub use env::InMemoryEnv;
