#![cfg(any(test, feature = "test-support"))]

use std::collections::HashMap;
use std::env;
use std::sync::{Mutex, PoisonError};

use super::ReadEnv;

/// Won't touch the global process environment.
///
/// Backed by a `Mutex` so it can be shared with multi-threaded
/// `#[tokio::test]` runtimes; all methods take `&self`.
#[derive(Debug, Default)]
pub struct InMemoryEnv {
    vars: Mutex<HashMap<String, String>>,
}

impl InMemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an env pre-populated with `pairs`.
    pub fn with_vars<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = Self::new();
        for (k, v) in pairs {
            env.set(k, v);
        }
        env
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.vars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.vars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

impl ReadEnv for InMemoryEnv {
    fn var(&self, key: &str) -> Result<String, env::VarError> {
        self.vars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or(env::VarError::NotPresent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let env = InMemoryEnv::new();
        env.set("MONGODB_URI", "mongodb://localhost/app");
        assert_eq!(env.var("MONGODB_URI").unwrap(), "mongodb://localhost/app");
    }

    #[test]
    fn missing_is_not_present() {
        let env = InMemoryEnv::new();
        assert!(matches!(env.var("NOPE"), Err(env::VarError::NotPresent)));
    }

    #[test]
    fn remove_and_contains() {
        let env = InMemoryEnv::with_vars([("A", "1"), ("B", "2")]);
        assert!(env.contains("A"));
        env.remove("A");
        assert!(!env.contains("A"));
        assert!(env.contains("B"));
    }

    #[test]
    fn overwrite_replaces_value() {
        let env = InMemoryEnv::new();
        env.set("KEY", "v1");
        env.set("KEY", "v2");
        assert_eq!(env.var("KEY").unwrap(), "v2");
    }

    #[test]
    fn shareable_across_threads() {
        let env = std::sync::Arc::new(InMemoryEnv::new());
        let writer = env.clone();
        std::thread::spawn(move || writer.set("FROM_THREAD", "yes"))
            .join()
            .unwrap();
        assert_eq!(env.var("FROM_THREAD").unwrap(), "yes");
    }
}
