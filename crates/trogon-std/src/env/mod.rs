//! Environment variable access.
//!
//! ```
//! use trogon_std::env::{ReadEnv, SystemEnv, parse_var_or};
//!
//! fn pool_size<E: ReadEnv>(env: &E) -> u32 {
//!     parse_var_or(env, "MONGODB_MAX_POOL_SIZE", 10)
//! }
//!
//! let size = pool_size(&SystemEnv);
//! assert!(size > 0);
//! ```

mod in_memory;
mod parse;
mod read_env;
mod system;

#[cfg(any(test, feature = "test-support"))]
pub use in_memory::InMemoryEnv;
pub use parse::{non_empty_var, parse_var_or};
pub use read_env::ReadEnv;
pub use system::SystemEnv;
