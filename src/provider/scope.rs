//! Per-resolution activation scopes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{DiError, DiResult};
use crate::internal::{pop_ambient, push_ambient};
use crate::key::TypeKey;
use crate::registration::AnyArc;

use super::{downcast, downcast_trait, Provider};

/// Shared scoped-instance cache. Tracked scopes publish theirs through
/// the ambient slot so nested resolutions can join it.
pub(crate) type SharedScopedCache = Arc<Mutex<HashMap<TypeKey, Option<AnyArc>>>>;

/// Per-resolution context: owns the scoped-instance cache and the stack
/// of currently activating keys.
///
/// Scopes are created with [`Provider::create_scope`] (or implicitly,
/// one per root resolution). Within one scope every scoped key resolves
/// to the same instance; dropping the scope clears its cache. A scope is
/// deliberately not `Sync` — it belongs to a single resolution flow.
///
/// Factories receive the scope as their first argument and resolve their
/// own dependencies through [`get`](ActivationScope::get); the
/// activation stack makes re-entrant factory cycles fail with the same
/// circular-dependency error the planner reports for structural cycles.
pub struct ActivationScope {
    provider: Provider,
    scoped: SharedScopedCache,
    stack: RefCell<Vec<TypeKey>>,
    owns_cache: bool,
    installed_ambient: bool,
}

impl ActivationScope {
    pub(crate) fn isolated(provider: Provider) -> Self {
        Self {
            provider,
            scoped: Arc::new(Mutex::new(HashMap::new())),
            stack: RefCell::new(Vec::new()),
            owns_cache: true,
            installed_ambient: false,
        }
    }

    /// Tracking variant: joins the ambient scoped cache when one is live
    /// on this thread, otherwise installs its own as the ambient one.
    pub(crate) fn tracking(provider: Provider) -> Self {
        if let Some(cache) = crate::internal::ambient_scope() {
            return Self::joined(provider, cache);
        }
        let cache: SharedScopedCache = Arc::new(Mutex::new(HashMap::new()));
        push_ambient(cache.clone());
        Self {
            provider,
            scoped: cache,
            stack: RefCell::new(Vec::new()),
            owns_cache: true,
            installed_ambient: true,
        }
    }

    pub(crate) fn joined(provider: Provider, cache: SharedScopedCache) -> Self {
        Self {
            provider,
            scoped: cache,
            stack: RefCell::new(Vec::new()),
            owns_cache: false,
            installed_ambient: false,
        }
    }

    /// The provider this scope resolves against.
    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Resolves a concrete type within this scope.
    pub fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast::<T>(self.resolve(&TypeKey::of::<T>())?)
    }

    /// Resolves a trait object within this scope.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast_trait::<T>(self.resolve(&TypeKey::of::<T>())?)
    }

    /// Resolves the optional form of a concrete type within this scope.
    pub fn get_optional<T: Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        let key = TypeKey::optional(TypeKey::of::<T>());
        match self.provider.resolve_in_scope(&key, self)? {
            Some(value) => downcast::<T>(value).map(Some),
            None => Ok(None),
        }
    }

    /// Resolves an arbitrary key within this scope and downcasts.
    pub fn get_keyed<T: Send + Sync + 'static>(&self, key: &TypeKey) -> DiResult<Arc<T>> {
        downcast::<T>(self.resolve(key)?)
    }

    /// Resolves an arbitrary key within this scope.
    pub fn resolve(&self, key: &TypeKey) -> DiResult<AnyArc> {
        self.provider
            .resolve_in_scope(key, self)?
            .ok_or_else(|| DiError::CannotResolveType(key.to_string()))
    }

    /// The key currently being activated above this point, if any: the
    /// nearest parent for context-aware factories.
    pub fn activating_type(&self) -> Option<TypeKey> {
        self.stack.borrow().last().cloned()
    }

    pub(crate) fn enter(&self, key: &TypeKey) -> DiResult<()> {
        let mut stack = self.stack.borrow_mut();
        if stack.iter().any(|k| k == key) {
            let mut chain: Vec<String> = stack.iter().map(ToString::to_string).collect();
            chain.push(key.to_string());
            return Err(DiError::Circular(chain));
        }
        stack.push(key.clone());
        Ok(())
    }

    pub(crate) fn exit(&self) {
        self.stack.borrow_mut().pop();
    }

    pub(crate) fn scoped_get(&self, key: &TypeKey) -> Option<Option<AnyArc>> {
        self.scoped.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn scoped_store(&self, key: TypeKey, value: Option<AnyArc>) {
        self.scoped.lock().unwrap().insert(key, value);
    }
}

impl Drop for ActivationScope {
    fn drop(&mut self) {
        if self.installed_ambient {
            pop_ambient();
        }
        if self.owns_cache {
            // Scoped instances become eligible for collection with the
            // scope, even when the cache itself is still referenced.
            self.scoped.lock().unwrap().clear();
        }
    }
}
