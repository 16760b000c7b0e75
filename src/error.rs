//! Error types for the dependency injection container.

use std::fmt;

/// Dependency injection errors.
///
/// Every error carries the offending key rendered as text;
/// [`CannotResolveParameter`](DiError::CannotResolveParameter) and
/// [`Circular`](DiError::Circular) additionally carry the full chain of
/// keys leading to the failure. Structural errors are detected up front
/// when a key is first planned, so resolution either succeeds or fails
/// before any object is constructed; only errors raised inside user
/// factories surface mid-activation.
#[derive(Debug, Clone, PartialEq)]
pub enum DiError {
    /// A requested key has no registration, no viable alias, and is not
    /// the optional form of an unregistered key.
    CannotResolveType(String),
    /// A constructor parameter could not be satisfied: no type
    /// declaration, no alias candidate, no default.
    CannotResolveParameter {
        /// The parameter name.
        parameter: &'static str,
        /// The type that declares the parameter.
        owner: String,
        /// Keys on the planning stack, root first.
        chain: Vec<String>,
    },
    /// The planner revisited a key already on its stack (includes the
    /// full cycle path).
    Circular(Vec<String>),
    /// A factory was registered without an explicit key and without a
    /// return key.
    MissingType(String),
    /// A deferred (string) type reference could not be resolved against
    /// the declaring descriptor's bindings or the registration's
    /// captured bindings.
    FactoryMissingContext {
        /// The unresolved reference.
        reference: String,
        /// The type or factory owning the reference.
        owner: String,
    },
    /// A registration collided with an existing one and no override was
    /// requested.
    OverridingService(String),
    /// A downcast failed, or a concrete type was registered under a key
    /// it does not provide.
    TypeMismatch(String),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::CannotResolveType(key) => write!(f, "Cannot resolve type: {}", key),
            DiError::CannotResolveParameter {
                parameter,
                owner,
                chain,
            } => {
                write!(f, "Cannot resolve parameter '{}' of {}", parameter, owner)?;
                if !chain.is_empty() {
                    write!(f, " (chain: {})", chain.join(" -> "))?;
                }
                Ok(())
            }
            DiError::Circular(path) => {
                write!(f, "Circular dependency: {}", path.join(" -> "))
            }
            DiError::MissingType(what) => {
                write!(f, "Missing return type: {}", what)
            }
            DiError::FactoryMissingContext { reference, owner } => {
                write!(f, "Unresolved reference '{}' in {}", reference, owner)
            }
            DiError::OverridingService(key) => {
                write!(f, "Service already registered: {}", key)
            }
            DiError::TypeMismatch(what) => write!(f, "Type mismatch for: {}", what),
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for DI operations.
pub type DiResult<T> = Result<T, DiError>;
