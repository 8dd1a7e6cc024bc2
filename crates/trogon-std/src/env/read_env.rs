use std::env;

/// Read access to environment variables.
///
/// Implementations are `Send + Sync` so a single env handle can be shared by
/// config loaders running on different tasks.
pub trait ReadEnv: Send + Sync {
    fn var(&self, key: &str) -> Result<String, env::VarError>;
}

impl<E: ReadEnv + ?Sized> ReadEnv for &E {
    fn var(&self, key: &str) -> Result<String, env::VarError> {
        (**self).var(key)
    }
}
