//! Stock worker binary with the built-in callables

use farmfuture_core::callable::Registry;
use farmfuture_worker::builtins;

fn main() -> anyhow::Result<()> {
    let mut registry = Registry::new();
    builtins::register(&mut registry);
    farmfuture_worker::main_with_registry(registry)
}
