//! Built-in callables
//!
//! Registered by the stock worker binary. Custom worker binaries add their
//! own callables on top of these.

use anyhow::Context;
use farmfuture_core::callable::Registry;
use farmfuture_core::domain::PackedWorkPackage;
use serde_json::{Map, Value, json};
use tracing::debug;

pub const ECHO: &str = "farmfuture.echo";
pub const FAIL: &str = "farmfuture.fail";
pub const CRASH: &str = "farmfuture.crash";
pub const ENV: &str = "farmfuture.env";
pub const APPLY_ENVIRONMENT: &str = "farmfuture.apply_environment";

/// Registers every built-in
pub fn register(registry: &mut Registry) -> &mut Registry {
    registry
        .register(ECHO, echo)
        .register(FAIL, fail)
        .register(CRASH, crash)
        .register(ENV, env)
        .register_preflight(APPLY_ENVIRONMENT, apply_environment)
}

/// Returns its arguments
fn echo(args: &[Value], kwargs: &Map<String, Value>) -> anyhow::Result<Value> {
    Ok(json!({ "args": args, "kwargs": kwargs }))
}

/// Always fails, with the `message` keyword argument if given
fn fail(_args: &[Value], kwargs: &Map<String, Value>) -> anyhow::Result<Value> {
    let message = kwargs
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("failure requested");
    anyhow::bail!("{}", message)
}

/// Kills the process without producing a result
fn crash(_args: &[Value], _kwargs: &Map<String, Value>) -> anyhow::Result<Value> {
    std::process::abort()
}

/// Reads the environment variable named by the first argument
fn env(args: &[Value], _kwargs: &Map<String, Value>) -> anyhow::Result<Value> {
    let name = args
        .first()
        .and_then(Value::as_str)
        .context("expected a variable name as first argument")?;
    Ok(std::env::var(name).map(Value::String).unwrap_or(Value::Null))
}

/// Exports the package's environment map into this process
fn apply_environment(package: &PackedWorkPackage) -> anyhow::Result<()> {
    for (key, value) in &package.environment {
        debug!("Setting {}", key);
        // SAFETY: the sandbox is single threaded while preflight runs;
        // no other thread reads the environment concurrently.
        unsafe { std::env::set_var(key, value) };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        register(&mut registry);
        registry
    }

    #[test]
    fn test_all_builtins_registered() {
        let registry = registry();
        assert_eq!(registry.names(), vec![CRASH, ECHO, ENV, FAIL]);
        assert!(registry.resolve_preflight(APPLY_ENVIRONMENT).is_ok());
    }

    #[test]
    fn test_echo_returns_arguments() {
        let mut kwargs = Map::new();
        kwargs.insert("k".to_string(), json!(true));
        let value = echo(&[json!(1), json!("two")], &kwargs).unwrap();
        assert_eq!(value, json!({"args": [1, "two"], "kwargs": {"k": true}}));
    }

    #[test]
    fn test_fail_uses_message() {
        let mut kwargs = Map::new();
        kwargs.insert("message".to_string(), json!("bad frame"));
        assert_eq!(fail(&[], &kwargs).unwrap_err().to_string(), "bad frame");
        assert_eq!(
            fail(&[], &Map::new()).unwrap_err().to_string(),
            "failure requested"
        );
    }

    #[test]
    fn test_env_requires_name() {
        assert!(env(&[], &Map::new()).is_err());
        assert_eq!(
            env(&[json!("FARMFUTURE_SURELY_UNSET_VARIABLE")], &Map::new()).unwrap(),
            Value::Null
        );
    }
}
