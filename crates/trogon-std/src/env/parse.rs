use std::str::FromStr;

use super::ReadEnv;

/// Returns the value of `key` if it is set and not blank.
pub fn non_empty_var<E: ReadEnv + ?Sized>(env: &E, key: &str) -> Option<String> {
    env.var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parses `key` into `T`, falling back to `default` when the variable is
/// unset or does not parse.
pub fn parse_var_or<E, T>(env: &E, key: &str, default: T) -> T
where
    E: ReadEnv + ?Sized,
    T: FromStr,
{
    env.var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::InMemoryEnv;

    #[test]
    fn non_empty_var_skips_blank_values() {
        let env = InMemoryEnv::new();
        env.set("BLANK", "   ");
        env.set("SET", "value");

        assert_eq!(non_empty_var(&env, "BLANK"), None);
        assert_eq!(non_empty_var(&env, "MISSING"), None);
        assert_eq!(non_empty_var(&env, "SET").as_deref(), Some("value"));
    }

    #[test]
    fn parse_var_or_uses_default_on_garbage() {
        let env = InMemoryEnv::new();
        env.set("PORT", "not-a-number");
        assert_eq!(parse_var_or(&env, "PORT", 8080u16), 8080);
    }

    #[test]
    fn parse_var_or_trims_before_parsing() {
        let env = InMemoryEnv::new();
        env.set("PORT", " 9090 ");
        assert_eq!(parse_var_or(&env, "PORT", 8080u16), 9090);
    }
}
