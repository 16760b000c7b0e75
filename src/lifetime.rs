//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior.
///
/// # Lifetime characteristics
///
/// - **Singleton**: one instance per provider, cached for the provider's
///   lifetime and shared across scopes
/// - **Scoped**: one instance per [`ActivationScope`](crate::ActivationScope),
///   cached for the scope's lifetime
/// - **Transient**: a fresh instance on every resolution, never cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Single instance per provider, cached until the provider is rebuilt.
    Singleton,
    /// Single instance per activation scope, dropped with the scope.
    Scoped,
    /// New instance per resolution, owned by the caller.
    Transient,
}
