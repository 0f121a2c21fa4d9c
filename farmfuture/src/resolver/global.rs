//! Process-wide resolver
//!
//! A process installs one resolver at startup and keeps the returned
//! guard alive for as long as futures may be outstanding. Dropping the
//! guard shuts the resolver down and waits for its thread.

use std::sync::OnceLock;
use tracing::warn;

use super::Resolver;

static GLOBAL: OnceLock<Resolver> = OnceLock::new();

/// Installs the process-wide resolver
///
/// Fails if one is already installed; a resolver that was shut down stays
/// installed and rejects every later submission.
pub fn install_global(resolver: Resolver) -> anyhow::Result<ResolverGuard> {
    GLOBAL
        .set(resolver.clone())
        .map_err(|_| anyhow::anyhow!("a global resolver is already installed"))?;

    Ok(ResolverGuard { resolver })
}

/// The process-wide resolver, if installed
pub fn global() -> Option<&'static Resolver> {
    GLOBAL.get()
}

/// Shuts the resolver down when dropped
#[must_use = "dropping the guard shuts the resolver down"]
pub struct ResolverGuard {
    resolver: Resolver,
}

impl ResolverGuard {
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }
}

impl Drop for ResolverGuard {
    fn drop(&mut self) {
        self.resolver.shutdown();
        if let Err(e) = self.resolver.join() {
            warn!("Resolver exited with error: {:#}", e);
        }
    }
}
